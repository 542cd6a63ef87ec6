#![allow(dead_code)]

use chrono::NaiveDate;
use colegio::models::*;
use colegio::store::Store;
use colegio::tenant::TenantContext;
use rust_decimal::Decimal;

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn school(store: &Store, domain: &str) -> TenantContext {
    store
        .create_school(&NewSchool { name: format!("Colegio {}", domain), domain: domain.to_string(), slogan: None })
        .unwrap();
    store.resolve_tenant(domain).unwrap()
}

/// Un colegio con un año de cuatro periodos, un curso, asignaturas ofertadas
/// y estudiantes matriculados.
pub struct Fixture {
    pub store: Store,
    pub tenant: TenantContext,
    pub year: AcademicYear,
    pub periods: Vec<Period>,
    pub course: Course,
    pub offerings: Vec<CourseOffering>,
    pub students: Vec<Student>,
}

pub fn fixture(students: usize, subjects: &[(&str, &str)]) -> Fixture {
    let store = Store::open_in_memory().unwrap();
    let tenant = school(&store, "demo.test");
    let year = store
        .create_year(
            &tenant,
            &NewAcademicYear {
                name: "2025".into(),
                start_date: day("2025-01-27"),
                end_date: day("2025-11-28"),
                active: true,
            },
        )
        .unwrap();
    let periods = (1..=4u8)
        .map(|n| {
            store
                .create_period(&tenant, year.id, &NewPeriod { number: n, name: format!("Periodo {}", n), weight: dec("25") })
                .unwrap()
        })
        .collect();
    let course = store
        .create_course(&tenant, &NewCourse { grade: "Sexto".into(), name: "A".into(), shift: None })
        .unwrap();
    let teacher = store
        .create_teacher(
            &tenant,
            &NewTeacher {
                first_names: "Lucía".into(),
                last_names: "Gómez".into(),
                identification: "T-1".into(),
                email: None,
            },
        )
        .unwrap();
    let offerings = subjects
        .iter()
        .map(|(name, area)| {
            let subject = store
                .create_subject(&tenant, &NewSubject { name: name.to_string(), area: Some(area.to_string()) })
                .unwrap();
            store
                .create_offering(
                    &tenant,
                    &NewCourseOffering {
                        year_id: year.id,
                        course_id: course.id,
                        subject_id: subject.id,
                        teacher_id: Some(teacher.id),
                        weekly_hours: 4,
                    },
                )
                .unwrap()
        })
        .collect();
    let students = (0..students)
        .map(|i| {
            let student = store
                .create_student(
                    &tenant,
                    &NewStudent {
                        first_names: format!("Estudiante {}", i),
                        last_names: format!("Apellido {}", i),
                        document_type: DocumentType::IdentityCard,
                        identification: format!("100{}", i),
                        birth_date: day("2013-05-10"),
                        course_id: None,
                        guardian: None,
                    },
                )
                .unwrap();
            store
                .enroll(&tenant, &NewEnrollment { student_id: student.id, year_id: year.id, course_id: course.id })
                .unwrap();
            store.student(&tenant, student.id).unwrap()
        })
        .collect();
    Fixture { store, tenant, year, periods, course, offerings, students }
}

impl Fixture {
    pub fn achievement(&self, offering: usize, period: usize, title: &str, weight: &str, kind: AchievementKind) -> Achievement {
        self.store
            .create_achievement(
                &self.tenant,
                &NewAchievement {
                    offering_id: self.offerings[offering].id,
                    period_id: self.periods[period].id,
                    title: title.to_string(),
                    description: None,
                    weight: dec(weight),
                    kind,
                },
            )
            .unwrap()
            .achievement
    }

    pub fn grade(&self, achievement: &Achievement, student: usize, value: &str) {
        self.store
            .save_grades(
                &self.tenant,
                achievement.id,
                &[GradeEntry { student_id: self.students[student].id, value: Some(dec(value)), notes: None }],
            )
            .unwrap();
    }
}
