use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::api_json::AppState;
use crate::error::AppError;
use crate::grading::{concept_letter, GradeBook};
use crate::models::*;

pub async fn create_achievement_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewAchievement>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let saved = state.run_for(&req, move |store, tenant| store.create_achievement(tenant, &new)).await?;
    Ok(HttpResponse::Created().json(saved))
}

pub async fn update_achievement_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
    body: web::Json<NewAchievement>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let new = body.into_inner();
    let saved = state
        .run_for(&req, move |store, tenant| store.update_achievement(tenant, id, &new))
        .await?;
    Ok(HttpResponse::Ok().json(saved))
}

pub async fn delete_achievement_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    state.run_for(&req, move |store, tenant| store.delete_achievement(tenant, id)).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_achievements_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(Id, Id)>,
) -> Result<HttpResponse, AppError> {
    let (offering_id, period_id) = path.into_inner();
    let body = state
        .run_for(&req, move |store, tenant| {
            store.offering(tenant, offering_id)?;
            let achievements = store.achievements_for(tenant, offering_id, period_id)?;
            let weight_total = store.achievement_weight_total(tenant, offering_id, period_id)?;
            Ok(json!({"achievements": achievements, "weight_total": weight_total}))
        })
        .await?;
    Ok(HttpResponse::Ok().json(body))
}

pub async fn save_grades_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
    body: web::Json<Vec<GradeEntry>>,
) -> Result<HttpResponse, AppError> {
    let achievement_id = path.into_inner();
    let entries = body.into_inner();
    let saved = state
        .run_for(&req, move |store, tenant| store.save_grades(tenant, achievement_id, &entries))
        .await?;
    Ok(HttpResponse::Ok().json(json!({"saved": saved})))
}

pub async fn list_grades_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
) -> Result<HttpResponse, AppError> {
    let achievement_id = path.into_inner();
    let grades = state
        .run_for(&req, move |store, tenant| {
            store.achievement(tenant, achievement_id)?;
            store.grades_for_achievement(tenant, achievement_id)
        })
        .await?;
    Ok(HttpResponse::Ok().json(grades))
}

pub async fn create_activity_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
    body: web::Json<NewActivity>,
) -> Result<HttpResponse, AppError> {
    let achievement_id = path.into_inner();
    let new = body.into_inner();
    let activity = state
        .run_for(&req, move |store, tenant| store.create_activity(tenant, achievement_id, &new))
        .await?;
    Ok(HttpResponse::Created().json(activity))
}

/// Captura de notas de una actividad; recalcula el logro de cada estudiante.
pub async fn save_activity_grades_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
    body: web::Json<Vec<GradeEntry>>,
) -> Result<HttpResponse, AppError> {
    let activity_id = path.into_inner();
    let entries = body.into_inner();
    let saved = state
        .run_for(&req, move |store, tenant| store.save_activity_grades(tenant, activity_id, &entries))
        .await?;
    Ok(HttpResponse::Ok().json(json!({"saved": saved})))
}

pub async fn save_behavioral_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(Id, Id)>,
    body: web::Json<Vec<BehavioralEntry>>,
) -> Result<HttpResponse, AppError> {
    let (offering_id, period_id) = path.into_inner();
    let entries = body.into_inner();
    let saved = state
        .run_for(&req, move |store, tenant| store.save_behavioral(tenant, offering_id, period_id, &entries))
        .await?;
    Ok(HttpResponse::Ok().json(json!({"saved": saved})))
}

pub async fn subject_average_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(Id, Id, Id)>,
) -> Result<HttpResponse, AppError> {
    let (student_id, offering_id, period_id) = path.into_inner();
    let body = state
        .run_for(&req, move |store, tenant| {
            store.student(tenant, student_id)?;
            store.offering(tenant, offering_id)?;
            let book = GradeBook::new(store);
            let achievement_average = book.achievement_average(tenant, student_id, offering_id, period_id)?;
            let average = book.subject_period_average(tenant, student_id, offering_id, period_id)?;
            Ok(json!({
                "student_id": student_id,
                "offering_id": offering_id,
                "period_id": period_id,
                "achievement_average": achievement_average,
                "average": average,
                "letter": concept_letter(average),
            }))
        })
        .await?;
    Ok(HttpResponse::Ok().json(body))
}

pub async fn period_ranking_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(Id, Id, Id)>,
) -> Result<HttpResponse, AppError> {
    let (year_id, course_id, period_id) = path.into_inner();
    let ranking = state
        .run_for(&req, move |store, tenant| {
            store.year(tenant, year_id)?;
            store.course(tenant, course_id)?;
            GradeBook::new(store).period_ranking(tenant, year_id, course_id, period_id)
        })
        .await?;
    Ok(HttpResponse::Ok().json(json!({"ranks": ranking.as_map(), "entries": ranking.entries})))
}

pub async fn annual_ranking_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(Id, Id)>,
) -> Result<HttpResponse, AppError> {
    let (year_id, course_id) = path.into_inner();
    let ranking = state
        .run_for(&req, move |store, tenant| {
            store.year(tenant, year_id)?;
            store.course(tenant, course_id)?;
            GradeBook::new(store).annual_ranking(tenant, year_id, course_id)
        })
        .await?;
    Ok(HttpResponse::Ok().json(json!({"ranks": ranking.as_map(), "entries": ranking.entries})))
}
