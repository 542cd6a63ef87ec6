use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Local;

use crate::api_json::{AppState, CertificateQuery, PortalQuery, ReportCardExport, ReportCardQuery};
use crate::billing::has_blocking_debt;
use crate::error::AppError;
use crate::models::Id;
use crate::report_card::{build_certificate, build_report_card, export_zip, CertificateKind, ReportCardBuilder};

pub async fn report_card_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ReportCardQuery>,
) -> Result<HttpResponse, AppError> {
    let q = query.into_inner();
    let card = state
        .run_for(&req, move |store, tenant| build_report_card(store, tenant, q.year, q.course, q.period, q.student))
        .await?;
    Ok(HttpResponse::Ok().json(card))
}

/// Exporta los boletines del curso (o de los estudiantes indicados) en un ZIP.
pub async fn export_report_cards_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ReportCardExport>,
) -> Result<HttpResponse, AppError> {
    let export = body.into_inner();
    let bytes = state
        .run_for(&req, move |store, tenant| {
            let builder = ReportCardBuilder::new(store, tenant, export.year_id, export.course_id)?;
            let ids: Vec<Id> = match export.student_ids {
                Some(ids) => ids,
                None => builder.student_ids()?,
            };
            let cards = ids
                .into_iter()
                .map(|id| builder.build(id, export.period_id))
                .collect::<Result<Vec<_>, _>>()?;
            export_zip(&cards)
        })
        .await?;
    Ok(HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename("boletines.zip".to_string())],
        })
        .body(bytes))
}

/// Boletín para el propio estudiante; se niega si tiene deuda vencida que bloquea.
pub async fn portal_report_card_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
    query: web::Query<PortalQuery>,
) -> Result<HttpResponse, AppError> {
    let student_id = path.into_inner();
    let period_id = query.period;
    let today = Local::now().date_naive();
    let card = state
        .run_for(&req, move |store, tenant| {
            store.student(tenant, student_id)?;
            if has_blocking_debt(store, tenant, student_id, today)? {
                return Err(AppError::Forbidden(
                    "report card unavailable: the student has overdue payments".to_string(),
                ));
            }
            let period = store.period(tenant, period_id)?;
            let enrollment = store
                .enrollment(tenant, student_id, period.year_id)?
                .ok_or_else(|| AppError::not_found("enrollment of the student for this year"))?;
            build_report_card(store, tenant, period.year_id, enrollment.course_id, period.id, student_id)
        })
        .await?;
    Ok(HttpResponse::Ok().json(card))
}

/// Certificado de estudio: `enrollment` (matrícula) o `grades` (notas del año).
pub async fn certificate_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(Id, String)>,
    query: web::Query<CertificateQuery>,
) -> Result<HttpResponse, AppError> {
    let (student_id, kind) = path.into_inner();
    let kind = CertificateKind::parse(&kind)
        .ok_or_else(|| AppError::validation(format!("unknown certificate kind: {}", kind)))?;
    let year_id = query.year;
    let today = Local::now().date_naive();
    let certificate = state
        .run_for(&req, move |store, tenant| build_certificate(store, tenant, kind, student_id, year_id, today))
        .await?;
    Ok(HttpResponse::Ok().json(certificate))
}
