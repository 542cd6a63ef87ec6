mod common;

use std::collections::HashMap;

use colegio::error::AppError;
use colegio::grading::{GradeBook, RollupOutcome};
use colegio::models::*;
use common::{dec, fixture, school};

#[test]
fn subject_average_weights_achievements_and_blends_behavioral() {
    let fx = fixture(1, &[("Matemáticas", "Ciencias")]);
    let a = fx.achievement(0, 0, "Resuelve ecuaciones", "60", AchievementKind::Standard);
    let b = fx.achievement(0, 0, "Interpreta gráficas", "40", AchievementKind::Standard);
    fx.grade(&a, 0, "4.0");
    fx.grade(&b, 0, "3.0");

    let book = GradeBook::new(&fx.store);
    let student = fx.students[0].id;
    let (offering, period) = (fx.offerings[0].id, fx.periods[0].id);
    assert_eq!(book.subject_period_average(&fx.tenant, student, offering, period).unwrap(), Some(dec("3.60")));

    fx.store
        .save_behavioral(
            &fx.tenant,
            offering,
            period,
            &[BehavioralEntry {
                student_id: student,
                behavior: Some(dec("5.0")),
                responsibility: Some(dec("5.0")),
                self_evaluation: None,
            }],
        )
        .unwrap();
    assert_eq!(book.subject_period_average(&fx.tenant, student, offering, period).unwrap(), Some(dec("3.74")));
    assert_eq!(book.achievement_average(&fx.tenant, student, offering, period).unwrap(), Some(dec("3.60")));

    // fila vacía borra el registro de Saber Ser
    fx.store
        .save_behavioral(
            &fx.tenant,
            offering,
            period,
            &[BehavioralEntry { student_id: student, behavior: None, responsibility: None, self_evaluation: None }],
        )
        .unwrap();
    assert!(fx.store.behavioral_score(&fx.tenant, student, offering, period).unwrap().is_none());
    assert_eq!(book.subject_period_average(&fx.tenant, student, offering, period).unwrap(), Some(dec("3.60")));
}

#[test]
fn no_grades_means_no_average() {
    let fx = fixture(1, &[("Matemáticas", "Ciencias")]);
    fx.achievement(0, 0, "Logro", "100", AchievementKind::Standard);
    let book = GradeBook::new(&fx.store);
    let avg = book
        .subject_period_average(&fx.tenant, fx.students[0].id, fx.offerings[0].id, fx.periods[0].id)
        .unwrap();
    assert_eq!(avg, None);
    let overall = book
        .overall_period_average(&fx.tenant, fx.students[0].id, fx.year.id, fx.course.id, fx.periods[0].id)
        .unwrap();
    assert_eq!(overall, None);
}

#[test]
fn period_ranking_shares_ties_and_skips_ungraded_students() {
    let fx = fixture(4, &[("Matemáticas", "Ciencias")]);
    let a = fx.achievement(0, 0, "Logro único", "100", AchievementKind::Standard);
    fx.grade(&a, 0, "4.5");
    fx.grade(&a, 1, "4.5");
    fx.grade(&a, 2, "4.0");

    let book = GradeBook::new(&fx.store);
    let ranking = book.period_ranking(&fx.tenant, fx.year.id, fx.course.id, fx.periods[0].id).unwrap();
    let expected = HashMap::from([(fx.students[0].id, 1), (fx.students[1].id, 1), (fx.students[2].id, 3)]);
    assert_eq!(ranking.as_map(), expected);
    assert_eq!(ranking.rank_of(fx.students[3].id), None);

    // mismo estado, mismo resultado
    let again = book.period_ranking(&fx.tenant, fx.year.id, fx.course.id, fx.periods[0].id).unwrap();
    assert_eq!(again, ranking);
}

#[test]
fn overall_average_is_the_mean_of_graded_subjects() {
    let fx = fixture(1, &[("Matemáticas", "Ciencias"), ("Español", "Humanidades"), ("Artes", "Artes")]);
    let m = fx.achievement(0, 0, "Álgebra", "100", AchievementKind::Standard);
    let e = fx.achievement(1, 0, "Lectura", "100", AchievementKind::Standard);
    fx.achievement(2, 0, "Dibujo", "100", AchievementKind::Standard);
    fx.grade(&m, 0, "4.0");
    fx.grade(&e, 0, "3.5");

    let book = GradeBook::new(&fx.store);
    let overall = book
        .overall_period_average(&fx.tenant, fx.students[0].id, fx.year.id, fx.course.id, fx.periods[0].id)
        .unwrap();
    assert_eq!(overall, Some(dec("3.75")));
}

#[test]
fn annual_average_uses_the_first_three_periods() {
    let fx = fixture(2, &[("Matemáticas", "Ciencias")]);
    let p1 = fx.achievement(0, 0, "P1", "100", AchievementKind::Standard);
    let p2 = fx.achievement(0, 1, "P2", "100", AchievementKind::Standard);
    let p4 = fx.achievement(0, 3, "P4", "100", AchievementKind::Standard);
    fx.grade(&p1, 0, "4.0");
    fx.grade(&p2, 0, "3.0");
    fx.grade(&p4, 0, "1.0");

    let book = GradeBook::new(&fx.store);
    let annual = book.annual_average(&fx.tenant, fx.students[0].id, fx.year.id, fx.course.id).unwrap();
    assert_eq!(annual, Some(dec("3.50")));

    let ranking = book.annual_ranking(&fx.tenant, fx.year.id, fx.course.id).unwrap();
    assert_eq!(ranking.len(), 1);
    assert_eq!(ranking.rank_of(fx.students[0].id), Some(1));
}

#[test]
fn activity_grades_roll_up_into_the_achievement() {
    let fx = fixture(1, &[("Tecnología", "Tecnología")]);
    let practical = fx.achievement(0, 0, "Construye un circuito", "100", AchievementKind::Practical);
    let store = &fx.store;
    let t1 = store
        .create_activity(&fx.tenant, practical.id, &NewActivity { title: "Diseño".into(), weight: dec("70") })
        .unwrap();
    let t2 = store
        .create_activity(&fx.tenant, practical.id, &NewActivity { title: "Montaje".into(), weight: dec("30") })
        .unwrap();
    let student = fx.students[0].id;

    store
        .save_activity_grades(&fx.tenant, t1.id, &[GradeEntry { student_id: student, value: Some(dec("4.0")), notes: None }])
        .unwrap();
    // solo una actividad con nota: media simple
    let grades = store.grades_for_student(&fx.tenant, student, fx.offerings[0].id, fx.periods[0].id).unwrap();
    assert_eq!(grades.get(&practical.id), Some(&dec("4.00")));

    store
        .save_activity_grades(&fx.tenant, t2.id, &[GradeEntry { student_id: student, value: Some(dec("3.0")), notes: None }])
        .unwrap();
    let grades = store.grades_for_student(&fx.tenant, student, fx.offerings[0].id, fx.periods[0].id).unwrap();
    assert_eq!(grades.get(&practical.id), Some(&dec("3.70")));

    for act in [&t1, &t2] {
        store
            .save_activity_grades(&fx.tenant, act.id, &[GradeEntry { student_id: student, value: None, notes: None }])
            .unwrap();
    }
    let grades = store.grades_for_student(&fx.tenant, student, fx.offerings[0].id, fx.periods[0].id).unwrap();
    assert!(grades.is_empty());

    let book = GradeBook::new(store);
    assert_eq!(book.recompute_achievement(&fx.tenant, student, practical.id).unwrap(), RollupOutcome::Clear);
}

#[test]
fn activities_require_practical_achievements() {
    let fx = fixture(0, &[("Matemáticas", "Ciencias")]);
    let standard = fx.achievement(0, 0, "Logro", "100", AchievementKind::Standard);
    let err = fx
        .store
        .create_activity(&fx.tenant, standard.id, &NewActivity { title: "Taller".into(), weight: dec("50") })
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn achievement_weight_total_and_warning() {
    let fx = fixture(0, &[("Matemáticas", "Ciencias")]);
    let new = |title: &str, weight: &str| NewAchievement {
        offering_id: fx.offerings[0].id,
        period_id: fx.periods[0].id,
        title: title.to_string(),
        description: None,
        weight: dec(weight),
        kind: AchievementKind::Standard,
    };
    let first = fx.store.create_achievement(&fx.tenant, &new("Primero", "60")).unwrap();
    assert_eq!(first.weight_total, dec("60"));
    assert!(first.warning.is_some());

    let second = fx.store.create_achievement(&fx.tenant, &new("Segundo", "40")).unwrap();
    assert_eq!(second.weight_total, dec("100"));
    assert!(second.warning.is_none());

    // título repetido sin importar mayúsculas
    let dup = fx.store.create_achievement(&fx.tenant, &new("PRIMERO", "10")).unwrap_err();
    assert!(matches!(dup, AppError::Validation(_)));

    let too_heavy = fx.store.create_achievement(&fx.tenant, &new("Tercero", "120")).unwrap_err();
    assert!(matches!(too_heavy, AppError::Validation(_)));

    let updated = fx
        .store
        .update_achievement(&fx.tenant, first.achievement.id, &new("Primero", "50"))
        .unwrap();
    assert_eq!(updated.weight_total, dec("90"));
    assert!(updated.warning.is_some());
}

#[test]
fn achievement_period_must_belong_to_the_offering_year() {
    let fx = fixture(0, &[("Matemáticas", "Ciencias")]);
    let other_year = fx
        .store
        .create_year(
            &fx.tenant,
            &NewAcademicYear {
                name: "2026".into(),
                start_date: common::day("2026-01-26"),
                end_date: common::day("2026-11-27"),
                active: true,
            },
        )
        .unwrap();
    let foreign = fx
        .store
        .create_period(&fx.tenant, other_year.id, &NewPeriod { number: 1, name: "P1".into(), weight: dec("33") })
        .unwrap();
    let err = fx
        .store
        .create_achievement(
            &fx.tenant,
            &NewAchievement {
                offering_id: fx.offerings[0].id,
                period_id: foreign.id,
                title: "Logro".into(),
                description: None,
                weight: dec("100"),
                kind: AchievementKind::Standard,
            },
        )
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn grades_outside_the_scale_are_rejected_without_partial_writes() {
    let fx = fixture(2, &[("Matemáticas", "Ciencias")]);
    let a = fx.achievement(0, 0, "Logro", "100", AchievementKind::Standard);
    let err = fx
        .store
        .save_grades(
            &fx.tenant,
            a.id,
            &[
                GradeEntry { student_id: fx.students[0].id, value: Some(dec("4.0")), notes: None },
                GradeEntry { student_id: fx.students[1].id, value: Some(dec("5.5")), notes: None },
            ],
        )
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(fx.store.grades_for_achievement(&fx.tenant, a.id).unwrap().is_empty());
}

#[test]
fn schools_do_not_see_each_other() {
    let fx = fixture(1, &[("Matemáticas", "Ciencias")]);
    let other = school(&fx.store, "otro.test");
    let err = fx.store.student(&other, fx.students[0].id).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(fx.store.list_courses(&other).unwrap().is_empty());
    let book = GradeBook::new(&fx.store);
    let ranking = book.period_ranking(&other, fx.year.id, fx.course.id, fx.periods[0].id).unwrap();
    assert!(ranking.is_empty());
}

#[test]
fn achievements_with_activities_cannot_stop_being_practical() {
    let fx = fixture(1, &[("Tecnología", "Tecnología")]);
    let practical = fx.achievement(0, 0, "Construye un circuito", "100", AchievementKind::Practical);
    let store = &fx.store;
    let activity = store
        .create_activity(&fx.tenant, practical.id, &NewActivity { title: "Montaje".into(), weight: dec("100") })
        .unwrap();
    let student = fx.students[0].id;
    let capture = |value: &str| {
        store.save_activity_grades(
            &fx.tenant,
            activity.id,
            &[GradeEntry { student_id: student, value: Some(dec(value)), notes: None }],
        )
    };
    capture("4.0").unwrap();

    let as_standard = NewAchievement {
        offering_id: fx.offerings[0].id,
        period_id: fx.periods[0].id,
        title: "Construye un circuito".into(),
        description: None,
        weight: dec("100"),
        kind: AchievementKind::Standard,
    };
    let err = store.update_achievement(&fx.tenant, practical.id, &as_standard).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(store.achievement(&fx.tenant, practical.id).unwrap().kind, AchievementKind::Practical);

    // la nota del logro sigue a la actividad
    capture("1.0").unwrap();
    let grades = store.grades_for_student(&fx.tenant, student, fx.offerings[0].id, fx.periods[0].id).unwrap();
    assert_eq!(grades.get(&practical.id), Some(&dec("1.00")));
}

#[test]
fn practical_achievements_without_activities_may_change_kind() {
    let fx = fixture(0, &[("Tecnología", "Tecnología")]);
    let practical = fx.achievement(0, 0, "Proyecto", "100", AchievementKind::Practical);
    let saved = fx
        .store
        .update_achievement(
            &fx.tenant,
            practical.id,
            &NewAchievement {
                offering_id: fx.offerings[0].id,
                period_id: fx.periods[0].id,
                title: "Proyecto".into(),
                description: None,
                weight: dec("100"),
                kind: AchievementKind::Standard,
            },
        )
        .unwrap();
    assert_eq!(saved.achievement.kind, AchievementKind::Standard);
}

#[test]
fn annual_ranking_shares_ties_across_periods() {
    let fx = fixture(4, &[("Matemáticas", "Ciencias")]);
    let p1 = fx.achievement(0, 0, "P1", "100", AchievementKind::Standard);
    let p2 = fx.achievement(0, 1, "P2", "100", AchievementKind::Standard);
    // 3.50, 3.50, 3.00; el cuarto estudiante no tiene notas
    fx.grade(&p1, 0, "4.0");
    fx.grade(&p2, 0, "3.0");
    fx.grade(&p1, 1, "3.0");
    fx.grade(&p2, 1, "4.0");
    fx.grade(&p1, 2, "3.0");

    let book = GradeBook::new(&fx.store);
    let ranking = book.annual_ranking(&fx.tenant, fx.year.id, fx.course.id).unwrap();
    let expected = HashMap::from([(fx.students[0].id, 1), (fx.students[1].id, 1), (fx.students[2].id, 3)]);
    assert_eq!(ranking.as_map(), expected);
    assert_eq!(ranking.rank_of(fx.students[3].id), None);
    assert_eq!(ranking.entries[0].score, dec("3.50"));
    assert_eq!(ranking.entries[2].score, dec("3.00"));
}
