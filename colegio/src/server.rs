use actix_web::{middleware, web, App, HttpServer};
use tracing::info;

use crate::api_json::handlers::*;
use crate::api_json::AppState;
use crate::config::Config;

/// Registra todas las rutas bajo `/api`. Se usa tanto en `run_server` como en
/// los tests de integración.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health_handler))
            .route("/schools", web::post().to(create_school_handler))
            // estructura académica
            .route("/years", web::post().to(create_year_handler))
            .route("/years", web::get().to(list_years_handler))
            .route("/years/{id}/periods", web::post().to(create_period_handler))
            .route("/years/{id}/periods", web::get().to(list_periods_handler))
            .route("/courses", web::post().to(create_course_handler))
            .route("/courses", web::get().to(list_courses_handler))
            .route("/subjects", web::post().to(create_subject_handler))
            .route("/subjects", web::get().to(list_subjects_handler))
            .route("/teachers", web::post().to(create_teacher_handler))
            .route("/teachers", web::get().to(list_teachers_handler))
            .route("/students", web::post().to(create_student_handler))
            .route("/students", web::get().to(list_students_handler))
            .route("/enrollments", web::post().to(enroll_handler))
            .route("/enrollments/promotions", web::post().to(promote_enrollments_handler))
            .route("/offerings", web::post().to(create_offering_handler))
            .route("/offerings", web::get().to(list_offerings_handler))
            // notas
            .route("/achievements", web::post().to(create_achievement_handler))
            .route("/achievements/{id}", web::put().to(update_achievement_handler))
            .route("/achievements/{id}", web::delete().to(delete_achievement_handler))
            .route("/offerings/{id}/periods/{pid}/achievements", web::get().to(list_achievements_handler))
            .route("/achievements/{id}/grades", web::put().to(save_grades_handler))
            .route("/achievements/{id}/grades", web::get().to(list_grades_handler))
            .route("/achievements/{id}/activities", web::post().to(create_activity_handler))
            .route("/activities/{id}/grades", web::put().to(save_activity_grades_handler))
            .route("/offerings/{id}/periods/{pid}/behavioral", web::put().to(save_behavioral_handler))
            .route(
                "/students/{id}/offerings/{oid}/periods/{pid}/average",
                web::get().to(subject_average_handler),
            )
            .route("/rankings/{year}/{course}/periods/{pid}", web::get().to(period_ranking_handler))
            .route("/rankings/{year}/{course}/annual", web::get().to(annual_ranking_handler))
            .route("/observations", web::put().to(save_observation_handler))
            .route("/attendance", web::post().to(record_attendance_handler))
            // boletines
            .route("/report-cards", web::get().to(report_card_handler))
            .route("/report-cards/export", web::post().to(export_report_cards_handler))
            .route("/portal/students/{id}/report-card", web::get().to(portal_report_card_handler))
            .route("/students/{id}/certificates/{kind}", web::get().to(certificate_handler))
            // cartera
            .route("/billing/fiscal-years", web::post().to(create_fiscal_year_handler))
            .route("/billing/concepts", web::post().to(create_concept_handler))
            .route("/billing/receivables", web::post().to(create_receivable_handler))
            .route("/billing/receivables/{id}/payments", web::get().to(receivable_payments_handler))
            .route("/billing/students/{id}/receivables", web::get().to(student_receivables_handler))
            .route("/billing/charges/monthly", web::post().to(monthly_charges_handler))
            .route("/billing/payments", web::post().to(post_payment_handler))
            .route("/billing/payments/{id}", web::put().to(update_payment_handler))
            .route("/billing/payments/{id}", web::delete().to(delete_payment_handler))
            .route("/billing/students/{id}/access", web::get().to(report_card_access_handler))
            .route("/billing/reports/{name}", web::get().to(billing_report_handler)),
    );
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let state = web::Data::new(AppState::from_config(&config));
    info!(bind = %config.bind, db = %config.db_path.display(), workers = config.workers, "starting server");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(config.bind.as_str())?
    .run()
    .await
}
