use rust_decimal::Decimal;
use tracing::debug;

use super::{competition_ranking, mean_rounded, subject_period_average, Ranking, RollupOutcome};
use crate::error::AppResult;
use crate::models::{CourseOffering, Id, Period};
use crate::store::Store;
use crate::tenant::TenantContext;

/// Número de periodos que cuentan para el promedio anual.
pub const ANNUAL_PERIODS: usize = 3;

/// Calculadores de notas sobre los datos persistidos. Nada se cachea: cada
/// llamada lee el estado actual.
pub struct GradeBook<'a> {
    store: &'a Store,
}

impl<'a> GradeBook<'a> {
    pub fn new(store: &'a Store) -> Self {
        GradeBook { store }
    }

    /// Promedio de logros de una asignatura en el periodo, sin "Saber Ser".
    pub fn achievement_average(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        offering_id: Id,
        period_id: Id,
    ) -> AppResult<Option<Decimal>> {
        self.average(tenant, student_id, offering_id, period_id, false)
    }

    pub fn subject_period_average(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        offering_id: Id,
        period_id: Id,
    ) -> AppResult<Option<Decimal>> {
        self.average(tenant, student_id, offering_id, period_id, true)
    }

    fn average(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        offering_id: Id,
        period_id: Id,
        with_behavioral: bool,
    ) -> AppResult<Option<Decimal>> {
        let achievements = self.store.achievements_for(tenant, offering_id, period_id)?;
        if achievements.is_empty() {
            return Ok(None);
        }
        let weights: Vec<(Id, Decimal)> = achievements.iter().map(|a| (a.id, a.weight)).collect();
        let grades = self.store.grades_for_student(tenant, student_id, offering_id, period_id)?;
        let behavioral = if with_behavioral {
            self.store
                .behavioral_score(tenant, student_id, offering_id, period_id)?
                .and_then(|s| s.value())
        } else {
            None
        };
        Ok(subject_period_average(&weights, |id| grades.get(&id).copied(), behavioral))
    }

    fn overall_over(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        offerings: &[CourseOffering],
        period_id: Id,
    ) -> AppResult<Option<Decimal>> {
        let mut averages = Vec::with_capacity(offerings.len());
        for offering in offerings {
            if let Some(avg) = self.subject_period_average(tenant, student_id, offering.id, period_id)? {
                averages.push(avg);
            }
        }
        Ok(mean_rounded(&averages))
    }

    /// Promedio general del periodo: media de las asignaturas con nota.
    pub fn overall_period_average(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        year_id: Id,
        course_id: Id,
        period_id: Id,
    ) -> AppResult<Option<Decimal>> {
        let offerings = self.store.offerings_for_course(tenant, year_id, course_id)?;
        self.overall_over(tenant, student_id, &offerings, period_id)
    }

    /// Los tres primeros periodos del año, por número.
    pub fn annual_periods(&self, tenant: &TenantContext, year_id: Id) -> AppResult<Vec<Period>> {
        let mut periods = self.store.periods_for_year(tenant, year_id)?;
        periods.truncate(ANNUAL_PERIODS);
        Ok(periods)
    }

    pub fn annual_average(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        year_id: Id,
        course_id: Id,
    ) -> AppResult<Option<Decimal>> {
        let offerings = self.store.offerings_for_course(tenant, year_id, course_id)?;
        let periods = self.annual_periods(tenant, year_id)?;
        self.annual_over(tenant, student_id, &offerings, &periods)
    }

    fn annual_over(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        offerings: &[CourseOffering],
        periods: &[Period],
    ) -> AppResult<Option<Decimal>> {
        let mut overall = Vec::with_capacity(periods.len());
        for period in periods {
            if let Some(avg) = self.overall_over(tenant, student_id, offerings, period.id)? {
                overall.push(avg);
            }
        }
        Ok(mean_rounded(&overall))
    }

    /// Puestos del curso en un periodo. Quedan fuera los estudiantes sin notas.
    pub fn period_ranking(
        &self,
        tenant: &TenantContext,
        year_id: Id,
        course_id: Id,
        period_id: Id,
    ) -> AppResult<Ranking> {
        let students = self.store.enrolled_students(tenant, year_id, course_id)?;
        let offerings = self.store.offerings_for_course(tenant, year_id, course_id)?;
        let mut scores = Vec::with_capacity(students.len());
        for student in &students {
            if let Some(avg) = self.overall_over(tenant, student.id, &offerings, period_id)? {
                scores.push((student.id, avg));
            }
        }
        debug!(year_id, course_id, period_id, ranked = scores.len(), enrolled = students.len(), "period ranking");
        Ok(competition_ranking(scores))
    }

    pub fn annual_ranking(&self, tenant: &TenantContext, year_id: Id, course_id: Id) -> AppResult<Ranking> {
        let students = self.store.enrolled_students(tenant, year_id, course_id)?;
        let offerings = self.store.offerings_for_course(tenant, year_id, course_id)?;
        let periods = self.annual_periods(tenant, year_id)?;
        let mut scores = Vec::with_capacity(students.len());
        for student in &students {
            if let Some(avg) = self.annual_over(tenant, student.id, &offerings, &periods)? {
                scores.push((student.id, avg));
            }
        }
        debug!(year_id, course_id, ranked = scores.len(), "annual ranking");
        Ok(competition_ranking(scores))
    }

    /// Vuelve a consolidar las actividades del logro en la nota del estudiante.
    pub fn recompute_achievement(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        achievement_id: Id,
    ) -> AppResult<RollupOutcome> {
        self.store.apply_activity_rollup(tenant, student_id, achievement_id)
    }
}
