// Boletín de calificaciones de un estudiante para un periodo.

pub mod certificate;
pub mod export;

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::grading::{concept_letter, mean_rounded, GradeBook, Ranking};
use crate::models::*;
use crate::store::Store;
use crate::tenant::TenantContext;

pub use certificate::{build_certificate, performance_label, CertificateKind, StudyCertificate};
pub use export::{export_zip, report_card_file_name};

/// Área para asignaturas sin área asignada.
const NO_AREA: &str = "Sin área";

#[derive(Debug, Clone, Serialize)]
pub struct ReportCard {
    pub school: String,
    pub slogan: Option<String>,
    pub year: String,
    pub course: String,
    pub period: PeriodHeader,
    pub student: StudentHeader,
    pub areas: Vec<AreaBlock>,
    pub period_averages: Vec<PeriodScore>,
    pub annual_average: Option<Decimal>,
    pub annual_letter: &'static str,
    pub ranks: Vec<PeriodRank>,
    pub annual_rank: Option<u32>,
    pub attendance: AttendanceSummary,
    pub observation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodHeader {
    pub id: Id,
    pub number: u8,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentHeader {
    pub id: Id,
    pub first_names: String,
    pub last_names: String,
    pub document_type: DocumentType,
    pub identification: String,
}

impl From<&Student> for StudentHeader {
    fn from(student: &Student) -> Self {
        StudentHeader {
            id: student.id,
            first_names: student.first_names.clone(),
            last_names: student.last_names.clone(),
            document_type: student.document_type,
            identification: student.identification.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaBlock {
    pub area: String,
    pub subjects: Vec<SubjectRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AchievementLine {
    pub title: String,
    pub description: Option<String>,
    pub weight: Decimal,
    pub grade: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectRow {
    pub subject: String,
    pub teacher: Option<String>,
    pub weekly_hours: u32,
    pub achievements: Vec<AchievementLine>,
    pub behavioral: Option<Decimal>,
    /// Promedio solo de logros.
    pub achievement_average: Option<Decimal>,
    /// Nota con la mezcla 90/10.
    pub average: Option<Decimal>,
    pub letter: &'static str,
    pub summary: SubjectSummary,
}

/// Resumen de la asignatura en los tres periodos del año.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectSummary {
    pub periods: Vec<Option<Decimal>>,
    pub final_average: Option<Decimal>,
    pub letter: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodScore {
    pub number: u8,
    pub average: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodRank {
    pub number: u8,
    pub rank: Option<u32>,
    pub ranked: usize,
}

/// Contexto de (año, curso) compartido por todos los boletines del curso:
/// ofertas, periodos y rankings se calculan una vez.
pub struct ReportCardBuilder<'a> {
    store: &'a Store,
    tenant: TenantContext,
    school: School,
    year: AcademicYear,
    course: Course,
    offerings: Vec<CourseOffering>,
    annual_periods: Vec<Period>,
    subjects: HashMap<Id, Subject>,
    teachers: HashMap<Id, Teacher>,
    period_rankings: Vec<(u8, Ranking)>,
    annual_ranking: Ranking,
}

impl<'a> ReportCardBuilder<'a> {
    pub fn new(store: &'a Store, tenant: &TenantContext, year_id: Id, course_id: Id) -> AppResult<Self> {
        let school = store.school(tenant)?;
        let year = store.year(tenant, year_id)?;
        let course = store.course(tenant, course_id)?;
        let book = GradeBook::new(store);
        let offerings = store.offerings_for_course(tenant, year_id, course_id)?;
        let annual_periods = book.annual_periods(tenant, year_id)?;

        let subjects = store.list_subjects(tenant)?.into_iter().map(|s| (s.id, s)).collect();
        let teachers = store.list_teachers(tenant)?.into_iter().map(|t| (t.id, t)).collect();

        let mut period_rankings = Vec::with_capacity(annual_periods.len());
        for period in &annual_periods {
            period_rankings.push((period.number, book.period_ranking(tenant, year_id, course_id, period.id)?));
        }
        let annual_ranking = book.annual_ranking(tenant, year_id, course_id)?;

        Ok(ReportCardBuilder {
            store,
            tenant: *tenant,
            school,
            year,
            course,
            offerings,
            annual_periods,
            subjects,
            teachers,
            period_rankings,
            annual_ranking,
        })
    }

    pub fn build(&self, student_id: Id, period_id: Id) -> AppResult<ReportCard> {
        let tenant = &self.tenant;
        let student = self.store.student(tenant, student_id)?;
        if !self.store.is_enrolled(tenant, student.id, self.year.id, self.course.id)? {
            return Err(AppError::not_found("enrollment of the student in this course"));
        }
        let period = self.store.period(tenant, period_id)?;
        if period.year_id != self.year.id {
            return Err(AppError::validation("the period does not belong to the academic year"));
        }

        let book = GradeBook::new(self.store);
        let mut areas: BTreeMap<String, Vec<SubjectRow>> = BTreeMap::new();
        for offering in &self.offerings {
            let row = self.subject_row(&book, &student, offering, &period)?;
            let area = self
                .subjects
                .get(&offering.subject_id)
                .and_then(|s| s.area.clone())
                .unwrap_or_else(|| NO_AREA.to_string());
            areas.entry(area).or_default().push(row);
        }

        let mut period_averages = Vec::with_capacity(self.annual_periods.len());
        for p in &self.annual_periods {
            let average = book.overall_period_average(tenant, student.id, self.year.id, self.course.id, p.id)?;
            period_averages.push(PeriodScore { number: p.number, average });
        }
        let annual_average = mean_rounded(&period_averages.iter().filter_map(|p| p.average).collect::<Vec<_>>());

        let ranks = self
            .period_rankings
            .iter()
            .map(|(number, ranking)| PeriodRank { number: *number, rank: ranking.rank_of(student.id), ranked: ranking.len() })
            .collect();

        let attendance = self.store.attendance_summary(tenant, student.id, self.year.id, self.course.id, period.id)?;
        let observation = self.store.observation(tenant, student.id, period.id)?.map(|o| o.text);

        Ok(ReportCard {
            school: self.school.name.clone(),
            slogan: self.school.slogan.clone(),
            year: self.year.name.clone(),
            course: format!("{} {}", self.course.grade, self.course.name),
            period: PeriodHeader { id: period.id, number: period.number, name: period.name.clone() },
            student: StudentHeader::from(&student),
            areas: areas.into_iter().map(|(area, subjects)| AreaBlock { area, subjects }).collect(),
            period_averages,
            annual_average,
            annual_letter: concept_letter(annual_average),
            ranks,
            annual_rank: self.annual_ranking.rank_of(student.id),
            attendance,
            observation,
        })
    }

    fn subject_row(
        &self,
        book: &GradeBook<'_>,
        student: &Student,
        offering: &CourseOffering,
        period: &Period,
    ) -> AppResult<SubjectRow> {
        let tenant = &self.tenant;
        let achievements = self.store.achievements_for(tenant, offering.id, period.id)?;
        let grades = self.store.grades_for_student(tenant, student.id, offering.id, period.id)?;
        let lines = achievements
            .into_iter()
            .map(|a| AchievementLine {
                grade: grades.get(&a.id).copied(),
                title: a.title,
                description: a.description,
                weight: a.weight,
            })
            .collect();

        let behavioral = self
            .store
            .behavioral_score(tenant, student.id, offering.id, period.id)?
            .and_then(|s| s.value());
        let achievement_average = book.achievement_average(tenant, student.id, offering.id, period.id)?;
        let average = book.subject_period_average(tenant, student.id, offering.id, period.id)?;

        let mut periods = Vec::with_capacity(self.annual_periods.len());
        for p in &self.annual_periods {
            periods.push(book.subject_period_average(tenant, student.id, offering.id, p.id)?);
        }
        let final_average = mean_rounded(&periods.iter().flatten().copied().collect::<Vec<_>>());

        Ok(SubjectRow {
            subject: self
                .subjects
                .get(&offering.subject_id)
                .map(|s| s.name.clone())
                .unwrap_or_default(),
            teacher: offering.teacher_id.and_then(|id| self.teachers.get(&id)).map(Teacher::display_name),
            weekly_hours: offering.weekly_hours,
            achievements: lines,
            behavioral,
            achievement_average,
            average,
            letter: concept_letter(average),
            summary: SubjectSummary { periods, final_average, letter: concept_letter(final_average) },
        })
    }

    pub fn student_ids(&self) -> AppResult<Vec<Id>> {
        Ok(self
            .store
            .enrolled_students(&self.tenant, self.year.id, self.course.id)?
            .into_iter()
            .map(|s| s.id)
            .collect())
    }
}

/// Boletín de un solo estudiante.
pub fn build_report_card(
    store: &Store,
    tenant: &TenantContext,
    year_id: Id,
    course_id: Id,
    period_id: Id,
    student_id: Id,
) -> AppResult<ReportCard> {
    ReportCardBuilder::new(store, tenant, year_id, course_id)?.build(student_id, period_id)
}
