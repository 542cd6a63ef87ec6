mod common;

use std::io::{Cursor, Read};

use colegio::error::AppError;
use colegio::models::*;
use colegio::report_card::{build_certificate, build_report_card, export_zip, CertificateKind, ReportCardBuilder};
use common::{day, dec, fixture};

#[test]
fn report_card_collects_grades_ranks_and_attendance() {
    let fx = fixture(2, &[("Matemáticas", "Ciencias"), ("Español", "Humanidades")]);
    let m = fx.achievement(0, 0, "Álgebra", "100", AchievementKind::Standard);
    let e = fx.achievement(1, 0, "Lectura", "100", AchievementKind::Standard);
    fx.grade(&m, 0, "4.8");
    fx.grade(&e, 0, "4.4");
    fx.grade(&m, 1, "3.0");

    let student = fx.students[0].id;
    let period = fx.periods[0].id;
    fx.store
        .record_roll_call(
            &fx.tenant,
            &NewRollCall {
                year_id: fx.year.id,
                course_id: fx.course.id,
                period_id: period,
                date: day("2025-02-10"),
                teacher_id: None,
                notes: None,
                entries: vec![
                    AttendanceEntryInput { student_id: student, status: Some(AttendanceStatus::Absent), note: None },
                    AttendanceEntryInput { student_id: fx.students[1].id, status: None, note: None },
                ],
            },
        )
        .unwrap();
    fx.store
        .record_roll_call(
            &fx.tenant,
            &NewRollCall {
                year_id: fx.year.id,
                course_id: fx.course.id,
                period_id: period,
                date: day("2025-02-11"),
                teacher_id: None,
                notes: None,
                entries: vec![AttendanceEntryInput { student_id: student, status: Some(AttendanceStatus::Late), note: None }],
            },
        )
        .unwrap();
    fx.store
        .upsert_observation(
            &fx.tenant,
            &ReportObservation { student_id: student, period_id: period, teacher_id: None, text: "Excelente trimestre".into() },
        )
        .unwrap();

    let card = build_report_card(&fx.store, &fx.tenant, fx.year.id, fx.course.id, period, student).unwrap();
    assert_eq!(card.areas.len(), 2);
    assert_eq!(card.areas[0].area, "Ciencias");
    let math = &card.areas[0].subjects[0];
    assert_eq!(math.subject, "Matemáticas");
    assert_eq!(math.teacher.as_deref(), Some("Gómez Lucía"));
    assert_eq!(math.average, Some(dec("4.80")));
    assert_eq!(math.letter, "S");
    assert_eq!(math.summary.periods.len(), 3);
    assert_eq!(math.summary.final_average, Some(dec("4.80")));

    assert_eq!(card.period_averages[0].average, Some(dec("4.60")));
    assert_eq!(card.period_averages[1].average, None);
    assert_eq!(card.annual_average, Some(dec("4.60")));
    assert_eq!(card.ranks[0].rank, Some(1));
    assert_eq!(card.ranks[0].ranked, 2);
    assert_eq!(card.annual_rank, Some(1));
    assert_eq!(card.attendance, AttendanceSummary { absences: 1, lates: 1 });
    assert_eq!(card.observation.as_deref(), Some("Excelente trimestre"));
}

#[test]
fn students_outside_the_course_get_not_found() {
    let fx = fixture(1, &[("Matemáticas", "Ciencias")]);
    let outsider = fx
        .store
        .create_student(
            &fx.tenant,
            &NewStudent {
                first_names: "Sin".into(),
                last_names: "Matrícula".into(),
                document_type: DocumentType::CivilRegistry,
                identification: "999".into(),
                birth_date: day("2014-01-01"),
                course_id: None,
                guardian: None,
            },
        )
        .unwrap();
    let err = build_report_card(&fx.store, &fx.tenant, fx.year.id, fx.course.id, fx.periods[0].id, outsider.id)
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn export_writes_one_json_file_per_student() {
    let fx = fixture(2, &[("Matemáticas", "Ciencias")]);
    let builder = ReportCardBuilder::new(&fx.store, &fx.tenant, fx.year.id, fx.course.id).unwrap();
    let cards: Vec<_> = builder
        .student_ids()
        .unwrap()
        .into_iter()
        .map(|id| builder.build(id, fx.periods[0].id).unwrap())
        .collect();
    let bytes = export_zip(&cards).unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 2);
    let mut names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
    names.sort();
    assert_eq!(names[0], "boletin_Apellido_0_Estudiante_0_1000_Periodo_1.json");

    let mut body = String::new();
    archive.by_name(&names[0]).unwrap().read_to_string(&mut body).unwrap();
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["student"]["first_names"], "Estudiante 0");
}

#[test]
fn students_with_the_same_name_get_distinct_files() {
    let fx = fixture(1, &[("Matemáticas", "Ciencias")]);
    let namesake = fx
        .store
        .create_student(
            &fx.tenant,
            &NewStudent {
                first_names: "Estudiante 0".into(),
                last_names: "Apellido 0".into(),
                document_type: DocumentType::IdentityCard,
                identification: "2000".into(),
                birth_date: day("2013-08-20"),
                course_id: None,
                guardian: None,
            },
        )
        .unwrap();
    fx.store
        .enroll(&fx.tenant, &NewEnrollment { student_id: namesake.id, year_id: fx.year.id, course_id: fx.course.id })
        .unwrap();

    let builder = ReportCardBuilder::new(&fx.store, &fx.tenant, fx.year.id, fx.course.id).unwrap();
    let cards: Vec<_> = builder
        .student_ids()
        .unwrap()
        .into_iter()
        .map(|id| builder.build(id, fx.periods[0].id).unwrap())
        .collect();
    let archive = zip::ZipArchive::new(Cursor::new(export_zip(&cards).unwrap())).unwrap();
    let mut names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "boletin_Apellido_0_Estudiante_0_1000_Periodo_1.json".to_string(),
            "boletin_Apellido_0_Estudiante_0_2000_Periodo_1.json".to_string(),
        ]
    );
}

#[test]
fn grades_certificate_averages_raw_grades_per_period() {
    let fx = fixture(1, &[("Matemáticas", "Ciencias"), ("Inglés", "Humanidades")]);
    let a1 = fx.achievement(0, 0, "Ecuaciones", "50", AchievementKind::Standard);
    let a2 = fx.achievement(0, 0, "Gráficas", "50", AchievementKind::Standard);
    let a3 = fx.achievement(0, 1, "Fracciones", "100", AchievementKind::Standard);
    let a4 = fx.achievement(1, 0, "Reading", "100", AchievementKind::Standard);
    fx.grade(&a1, 0, "4.0");
    fx.grade(&a2, 0, "4.5");
    fx.grade(&a3, 0, "3.0");
    fx.grade(&a4, 0, "5.0");

    let cert = build_certificate(
        &fx.store,
        &fx.tenant,
        CertificateKind::Grades,
        fx.students[0].id,
        fx.year.id,
        day("2025-11-30"),
    )
    .unwrap();
    assert_eq!(cert.document_label, "T.I.");
    assert_eq!(cert.course.as_deref(), Some("Sexto A"));
    assert_eq!(cert.subjects.len(), 2);

    let math = cert.subjects.iter().find(|s| s.subject == "Matemáticas").unwrap();
    assert_eq!(math.periods, vec![Some(dec("4.25")), Some(dec("3.00")), None]);
    assert_eq!(math.final_average, Some(dec("3.83")));
    assert_eq!(math.performance, "BÁSICO");
    let english = cert.subjects.iter().find(|s| s.subject == "Inglés").unwrap();
    assert_eq!(english.final_average, Some(dec("5.00")));
    assert_eq!(english.performance, "SUPERIOR");

    // 16.5 / 4 = 4.125, redondeo hacia arriba
    assert_eq!(cert.general_average, Some(dec("4.13")));
    assert_eq!(cert.approved, Some(true));
}

#[test]
fn enrollment_certificate_has_no_grades() {
    let fx = fixture(1, &[("Matemáticas", "Ciencias")]);
    let a1 = fx.achievement(0, 0, "Ecuaciones", "100", AchievementKind::Standard);
    fx.grade(&a1, 0, "2.0");

    let cert = build_certificate(
        &fx.store,
        &fx.tenant,
        CertificateKind::Enrollment,
        fx.students[0].id,
        fx.year.id,
        day("2025-03-01"),
    )
    .unwrap();
    assert!(cert.subjects.is_empty());
    assert_eq!(cert.general_average, None);
    assert_eq!(cert.approved, None);
    assert_eq!(cert.grade.as_deref(), Some("Sexto"));
    assert_eq!(cert.issued_on, day("2025-03-01"));
}

#[test]
fn grades_certificate_needs_a_course() {
    let fx = fixture(0, &[("Matemáticas", "Ciencias")]);
    let student = fx
        .store
        .create_student(
            &fx.tenant,
            &NewStudent {
                first_names: "Sin".into(),
                last_names: "Curso".into(),
                document_type: DocumentType::CivilRegistry,
                identification: "3000".into(),
                birth_date: day("2019-02-11"),
                course_id: None,
                guardian: None,
            },
        )
        .unwrap();
    let err = build_certificate(&fx.store, &fx.tenant, CertificateKind::Grades, student.id, fx.year.id, day("2025-06-01"))
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
