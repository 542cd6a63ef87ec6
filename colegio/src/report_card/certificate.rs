// Datos de los certificados de estudio (matrícula y notas).
//
// Las notas del certificado son medias simples de las notas de logro, no los
// promedios ponderados del boletín.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::StudentHeader;
use crate::error::{AppError, AppResult};
use crate::grading::mean_rounded;
use crate::models::{Course, Id};
use crate::store::Store;
use crate::tenant::TenantContext;

/// Periodos que se muestran por asignatura.
const CERTIFICATE_PERIODS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateKind {
    /// Constancia de matrícula, sin notas.
    Enrollment,
    Grades,
}

impl CertificateKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "enrollment" => Some(CertificateKind::Enrollment),
            "grades" => Some(CertificateKind::Grades),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificateSubject {
    pub subject: String,
    pub weekly_hours: u32,
    pub periods: Vec<Option<Decimal>>,
    pub final_average: Option<Decimal>,
    pub performance: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudyCertificate {
    pub kind: CertificateKind,
    pub school: String,
    pub slogan: Option<String>,
    pub year: String,
    pub student: StudentHeader,
    pub document_label: &'static str,
    pub grade: Option<String>,
    pub course: Option<String>,
    pub issued_on: NaiveDate,
    pub subjects: Vec<CertificateSubject>,
    pub general_average: Option<Decimal>,
    /// `None` en la constancia de matrícula o sin notas.
    pub approved: Option<bool>,
}

/// Desempeño según la escala nacional.
pub fn performance_label(grade: Option<Decimal>) -> &'static str {
    let Some(grade) = grade else {
        return "";
    };
    if grade < Decimal::new(30, 1) {
        "BAJO"
    } else if grade < Decimal::new(40, 1) {
        "BÁSICO"
    } else if grade < Decimal::new(46, 1) {
        "ALTO"
    } else {
        "SUPERIOR"
    }
}

/// Aprueba el año con promedio general estrictamente mayor que 3.0.
pub fn is_approved(general_average: Decimal) -> bool {
    general_average > Decimal::new(30, 1)
}

/// El curso del año según la matrícula; sin matrícula se usa el curso actual.
fn course_for_year(store: &Store, tenant: &TenantContext, student_id: Id, course_id: Option<Id>, year_id: Id) -> AppResult<Option<Course>> {
    let course_id = match store.enrollment(tenant, student_id, year_id)? {
        Some(enrollment) => Some(enrollment.course_id),
        None => course_id,
    };
    course_id.map(|id| store.course(tenant, id)).transpose()
}

pub fn build_certificate(
    store: &Store,
    tenant: &TenantContext,
    kind: CertificateKind,
    student_id: Id,
    year_id: Id,
    issued_on: NaiveDate,
) -> AppResult<StudyCertificate> {
    let school = store.school(tenant)?;
    let year = store.year(tenant, year_id)?;
    let student = store.student(tenant, student_id)?;
    let course = course_for_year(store, tenant, student.id, student.course_id, year.id)?;

    let mut subjects = Vec::new();
    let mut general_average = None;
    if kind == CertificateKind::Grades {
        let course = course
            .as_ref()
            .ok_or_else(|| AppError::validation("the student has no course for this academic year"))?;
        let grades = store.student_grades_for_year(tenant, student.id, year.id)?;

        let mut by_offering: HashMap<Id, Vec<(u8, Decimal)>> = HashMap::new();
        for (offering_id, number, value) in &grades {
            by_offering.entry(*offering_id).or_default().push((*number, *value));
        }
        let names: HashMap<Id, String> = store.list_subjects(tenant)?.into_iter().map(|s| (s.id, s.name)).collect();

        for offering in store.offerings_for_course(tenant, year.id, course.id)? {
            let rows = by_offering.get(&offering.id).map(Vec::as_slice).unwrap_or(&[]);
            let periods = (1..=CERTIFICATE_PERIODS)
                .map(|n| {
                    let values: Vec<Decimal> = rows.iter().filter(|(p, _)| *p == n).map(|(_, v)| *v).collect();
                    mean_rounded(&values)
                })
                .collect();
            let all: Vec<Decimal> = rows.iter().map(|(_, v)| *v).collect();
            let final_average = mean_rounded(&all);
            subjects.push(CertificateSubject {
                subject: names.get(&offering.subject_id).cloned().unwrap_or_default(),
                weekly_hours: offering.weekly_hours,
                periods,
                final_average,
                performance: performance_label(final_average),
            });
        }

        let values: Vec<Decimal> = grades.iter().map(|(_, _, v)| *v).collect();
        general_average = mean_rounded(&values);
        debug!(student_id, year_id, grades = values.len(), "certificate grades");
    }

    Ok(StudyCertificate {
        kind,
        school: school.name,
        slogan: school.slogan,
        year: year.name,
        document_label: student.document_type.label(),
        student: StudentHeader::from(&student),
        grade: course.as_ref().map(|c| c.grade.clone()),
        course: course.as_ref().map(|c| format!("{} {}", c.grade, c.name)),
        issued_on,
        subjects,
        general_average,
        approved: general_average.map(is_approved),
    })
}
