use actix_web::{web, HttpRequest, HttpResponse};

use crate::api_json::AppState;
use crate::error::AppError;
use crate::models::NewRollCall;

pub async fn record_attendance_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewRollCall>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let roll_call = state.run_for(&req, move |store, tenant| store.record_roll_call(tenant, &new)).await?;
    Ok(HttpResponse::Ok().json(roll_call))
}
