use actix_web::{web, HttpRequest, HttpResponse};

use crate::api_json::{AppState, CourseFilter, OfferingFilter};
use crate::error::AppError;
use crate::models::*;

pub async fn create_year_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewAcademicYear>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let year = state.run_for(&req, move |store, tenant| store.create_year(tenant, &new)).await?;
    Ok(HttpResponse::Created().json(year))
}

pub async fn list_years_handler(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let years = state.run_for(&req, |store, tenant| store.list_years(tenant)).await?;
    Ok(HttpResponse::Ok().json(years))
}

pub async fn create_period_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
    body: web::Json<NewPeriod>,
) -> Result<HttpResponse, AppError> {
    let year_id = path.into_inner();
    let new = body.into_inner();
    let period = state
        .run_for(&req, move |store, tenant| store.create_period(tenant, year_id, &new))
        .await?;
    Ok(HttpResponse::Created().json(period))
}

pub async fn list_periods_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Id>,
) -> Result<HttpResponse, AppError> {
    let year_id = path.into_inner();
    let periods = state
        .run_for(&req, move |store, tenant| {
            store.year(tenant, year_id)?;
            store.periods_for_year(tenant, year_id)
        })
        .await?;
    Ok(HttpResponse::Ok().json(periods))
}

pub async fn create_course_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewCourse>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let course = state.run_for(&req, move |store, tenant| store.create_course(tenant, &new)).await?;
    Ok(HttpResponse::Created().json(course))
}

pub async fn list_courses_handler(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let courses = state.run_for(&req, |store, tenant| store.list_courses(tenant)).await?;
    Ok(HttpResponse::Ok().json(courses))
}

pub async fn create_subject_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewSubject>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let subject = state.run_for(&req, move |store, tenant| store.create_subject(tenant, &new)).await?;
    Ok(HttpResponse::Created().json(subject))
}

pub async fn list_subjects_handler(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let subjects = state.run_for(&req, |store, tenant| store.list_subjects(tenant)).await?;
    Ok(HttpResponse::Ok().json(subjects))
}

pub async fn create_teacher_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewTeacher>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let teacher = state.run_for(&req, move |store, tenant| store.create_teacher(tenant, &new)).await?;
    Ok(HttpResponse::Created().json(teacher))
}

pub async fn list_teachers_handler(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let teachers = state.run_for(&req, |store, tenant| store.list_teachers(tenant)).await?;
    Ok(HttpResponse::Ok().json(teachers))
}

pub async fn create_student_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewStudent>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let student = state.run_for(&req, move |store, tenant| store.create_student(tenant, &new)).await?;
    Ok(HttpResponse::Created().json(student))
}

pub async fn list_students_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<CourseFilter>,
) -> Result<HttpResponse, AppError> {
    let course = query.course;
    let students = state.run_for(&req, move |store, tenant| store.list_students(tenant, course)).await?;
    Ok(HttpResponse::Ok().json(students))
}

pub async fn enroll_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewEnrollment>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let enrollment = state.run_for(&req, move |store, tenant| store.enroll(tenant, &new)).await?;
    Ok(HttpResponse::Created().json(enrollment))
}

/// Promoción masiva al año siguiente.
pub async fn promote_enrollments_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<EnrollmentPromotion>,
) -> Result<HttpResponse, AppError> {
    let promotion = body.into_inner();
    let outcome = state
        .run_for(&req, move |store, tenant| store.promote_enrollments(tenant, &promotion))
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

pub async fn create_offering_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewCourseOffering>,
) -> Result<HttpResponse, AppError> {
    let new = body.into_inner();
    let offering = state.run_for(&req, move |store, tenant| store.create_offering(tenant, &new)).await?;
    Ok(HttpResponse::Created().json(offering))
}

pub async fn list_offerings_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<OfferingFilter>,
) -> Result<HttpResponse, AppError> {
    let (year, course) = (query.year, query.course);
    let offerings = state
        .run_for(&req, move |store, tenant| store.list_offerings(tenant, year, course))
        .await?;
    Ok(HttpResponse::Ok().json(offerings))
}

pub async fn save_observation_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ReportObservation>,
) -> Result<HttpResponse, AppError> {
    let obs = body.into_inner();
    let saved = state.run_for(&req, move |store, tenant| store.upsert_observation(tenant, &obs)).await?;
    Ok(HttpResponse::Ok().json(saved))
}
