use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::api_json::AppState;
use crate::error::AppError;
use crate::models::NewSchool;

/// Alta de un colegio. No requiere colegio resuelto.
pub async fn create_school_handler(
    state: web::Data<AppState>,
    body: web::Json<NewSchool>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let school = state.run(move |store| store.create_school(&new)).await?;
    Ok(HttpResponse::Created().json(school))
}

pub async fn health_handler(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    state.run(|store| store.migrate()).await?;
    Ok(HttpResponse::Ok().json(json!({"status": "ok"})))
}
