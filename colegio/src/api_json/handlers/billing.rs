use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Local;
use serde_json::json;

use crate::api_json::{AccessQuery, AppState};
use crate::billing::report_card_access;
use crate::error::AppError;
use crate::models::*;
use crate::reports;

pub async fn create_fiscal_year_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewFiscalYear>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let year = state.run_for(&req, move |store, tenant| store.create_fiscal_year(tenant, &new)).await?;
    Ok(HttpResponse::Created().json(year))
}

pub async fn create_concept_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewPaymentConcept>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let concept = state.run_for(&req, move |store, tenant| store.create_concept(tenant, &new)).await?;
    Ok(HttpResponse::Created().json(concept))
}

pub async fn create_receivable_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewReceivable>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let receivable = state.run_for(&req, move |store, tenant| store.create_receivable(tenant, &new)).await?;
    Ok(HttpResponse::Created().json(receivable))
}

pub async fn monthly_charges_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<MonthlyCharges>,
) -> Result<HttpResponse, AppError> {
    let charges = body.into_inner();
    let created = state
        .run_for(&req, move |store, tenant| store.generate_monthly_charges(tenant, &charges))
        .await?;
    Ok(HttpResponse::Ok().json(json!({"created": created})))
}

/// Cuentas por cobrar del estudiante, por fecha de vencimiento.
pub async fn student_receivables_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
) -> Result<HttpResponse, AppError> {
    let student_id = path.into_inner();
    let receivables = state
        .run_for(&req, move |store, tenant| {
            store.student(tenant, student_id)?;
            store.receivables_for_student(tenant, student_id)
        })
        .await?;
    Ok(HttpResponse::Ok().json(receivables))
}

pub async fn receivable_payments_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
) -> Result<HttpResponse, AppError> {
    let receivable_id = path.into_inner();
    let payments = state
        .run_for(&req, move |store, tenant| {
            store.receivable(tenant, receivable_id)?;
            store.payments_for_receivable(tenant, receivable_id)
        })
        .await?;
    Ok(HttpResponse::Ok().json(payments))
}

pub async fn post_payment_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewPayment>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let payment = state.run_for(&req, move |store, tenant| store.post_payment(tenant, &new)).await?;
    Ok(HttpResponse::Created().json(payment))
}

pub async fn update_payment_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
    body: web::Json<PaymentUpdate>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let update = body.into_inner();
    let payment = state
        .run_for(&req, move |store, tenant| store.update_payment(tenant, id, &update))
        .await?;
    Ok(HttpResponse::Ok().json(payment))
}

pub async fn delete_payment_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let receivable = state.run_for(&req, move |store, tenant| store.delete_payment(tenant, id)).await?;
    Ok(HttpResponse::Ok().json(receivable))
}

pub async fn report_card_access_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
    query: web::Query<AccessQuery>,
) -> Result<HttpResponse, AppError> {
    let student_id = path.into_inner();
    let AccessQuery { fiscal_year, trimester } = query.into_inner();
    let today = Local::now().date_naive();
    let access = state
        .run_for(&req, move |store, tenant| {
            report_card_access(store, tenant, student_id, fiscal_year, trimester, today)
        })
        .await?;
    Ok(HttpResponse::Ok().json(access))
}

pub async fn billing_report_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let name = path.into_inner();
    let today = Local::now().date_naive();
    let body = state
        .run_for(&req, move |store, tenant| match name.as_str() {
            "payments-by-year" => Ok(serde_json::to_value(reports::payments_by_year_report(store, tenant)?)?),
            "payment-methods" => Ok(serde_json::to_value(reports::payment_methods_report(store, tenant)?)?),
            "pending" => Ok(serde_json::to_value(reports::pending_report(store, tenant)?)?),
            "delinquent" => Ok(serde_json::to_value(reports::delinquent_report(store, tenant, today)?)?),
            other => Err(AppError::not_found(format!("report '{}'", other))),
        })
        .await?;
    Ok(HttpResponse::Ok().json(body))
}
