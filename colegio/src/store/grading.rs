// Logros, actividades, notas y "Saber Ser".

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{dec_text, decimal_at, opt_dec_text, opt_decimal_at, Store};
use crate::error::{AppError, AppResult};
use crate::grading::{rollup_activities, RollupOutcome};
use crate::models::*;
use crate::tenant::TenantContext;
use crate::validation;

fn map_achievement(row: &Row<'_>) -> rusqlite::Result<Achievement> {
    let kind: String = row.get(6)?;
    let kind = AchievementKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(6, Type::Text, format!("unknown achievement kind {}", kind).into())
    })?;
    Ok(Achievement {
        id: row.get(0)?,
        offering_id: row.get(1)?,
        period_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        weight: decimal_at(row, 5)?,
        kind,
    })
}

fn map_activity(row: &Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity { id: row.get(0)?, achievement_id: row.get(1)?, title: row.get(2)?, weight: decimal_at(row, 3)? })
}

fn map_behavioral(row: &Row<'_>) -> rusqlite::Result<BehavioralScore> {
    Ok(BehavioralScore {
        student_id: row.get(0)?,
        offering_id: row.get(1)?,
        period_id: row.get(2)?,
        behavior: opt_decimal_at(row, 3)?,
        responsibility: opt_decimal_at(row, 4)?,
        self_evaluation: opt_decimal_at(row, 5)?,
    })
}

const ACHIEVEMENT_COLUMNS: &str = "id, offering_id, period_id, title, description, weight, kind";

impl Store {
    // --- logros ---

    fn check_achievement(&self, tenant: &TenantContext, new: &NewAchievement, existing: Option<Id>) -> AppResult<()> {
        validation::required("title", &new.title)?;
        validation::percent_weight(new.weight)?;
        let offering = self.offering(tenant, new.offering_id)?;
        let period = self.period(tenant, new.period_id)?;
        if period.year_id != offering.year_id {
            return Err(AppError::validation("the period does not belong to the offering's academic year"));
        }
        let dup: Option<Id> = self
            .conn
            .query_row(
                "SELECT id FROM achievements
                 WHERE offering_id = ?1 AND period_id = ?2 AND title = ?3 AND (?4 IS NULL OR id <> ?4)",
                params![new.offering_id, new.period_id, new.title.trim(), existing],
                |r| r.get(0),
            )
            .optional()?;
        if dup.is_some() {
            return Err(AppError::validation(format!(
                "an achievement titled '{}' already exists for this subject and period",
                new.title.trim()
            )));
        }
        Ok(())
    }

    fn achievement_saved(&self, tenant: &TenantContext, id: Id) -> AppResult<AchievementSaved> {
        let achievement = self.achievement(tenant, id)?;
        let weight_total = self.achievement_weight_total(tenant, achievement.offering_id, achievement.period_id)?;
        let warning = if weight_total != Decimal::ONE_HUNDRED {
            warn!(
                offering_id = achievement.offering_id,
                period_id = achievement.period_id,
                %weight_total,
                "achievement weights do not sum to 100"
            );
            Some(format!("achievement weights for this subject and period sum to {}%, not 100%", weight_total))
        } else {
            None
        };
        Ok(AchievementSaved { achievement, weight_total, warning })
    }

    pub fn create_achievement(&self, tenant: &TenantContext, new: &NewAchievement) -> AppResult<AchievementSaved> {
        self.check_achievement(tenant, new, None)?;
        self.conn.execute(
            "INSERT INTO achievements (school_id, offering_id, period_id, title, description, weight, kind)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                tenant.school_id(),
                new.offering_id,
                new.period_id,
                new.title.trim(),
                new.description,
                dec_text(new.weight),
                new.kind.as_str()
            ],
        )?;
        self.achievement_saved(tenant, self.conn.last_insert_rowid())
    }

    pub fn update_achievement(&self, tenant: &TenantContext, id: Id, new: &NewAchievement) -> AppResult<AchievementSaved> {
        let current = self.achievement(tenant, id)?;
        self.check_achievement(tenant, new, Some(id))?;
        // un logro con actividades debe seguir siendo práctico
        if current.kind == AchievementKind::Practical
            && new.kind != AchievementKind::Practical
            && !self.activities_for(tenant, id)?.is_empty()
        {
            return Err(AppError::validation(
                "an achievement with activities must stay practical; delete its activities first",
            ));
        }
        self.conn.execute(
            "UPDATE achievements SET offering_id = ?1, period_id = ?2, title = ?3, description = ?4,
                                     weight = ?5, kind = ?6
             WHERE id = ?7 AND school_id = ?8",
            params![
                new.offering_id,
                new.period_id,
                new.title.trim(),
                new.description,
                dec_text(new.weight),
                new.kind.as_str(),
                id,
                tenant.school_id()
            ],
        )?;
        self.achievement_saved(tenant, id)
    }

    pub fn delete_achievement(&self, tenant: &TenantContext, id: Id) -> AppResult<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM achievements WHERE id = ?1 AND school_id = ?2", params![id, tenant.school_id()])?;
        if deleted == 0 {
            return Err(AppError::not_found("achievement"));
        }
        Ok(())
    }

    pub fn achievement(&self, tenant: &TenantContext, id: Id) -> AppResult<Achievement> {
        let sql = format!("SELECT {} FROM achievements WHERE id = ?1 AND school_id = ?2", ACHIEVEMENT_COLUMNS);
        self.conn
            .query_row(&sql, params![id, tenant.school_id()], map_achievement)
            .optional()?
            .ok_or_else(|| AppError::not_found("achievement"))
    }

    pub fn achievements_for(&self, tenant: &TenantContext, offering_id: Id, period_id: Id) -> AppResult<Vec<Achievement>> {
        let sql = format!(
            "SELECT {} FROM achievements WHERE offering_id = ?1 AND period_id = ?2 AND school_id = ?3 ORDER BY id",
            ACHIEVEMENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![offering_id, period_id, tenant.school_id()], map_achievement)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn achievement_weight_total(&self, tenant: &TenantContext, offering_id: Id, period_id: Id) -> AppResult<Decimal> {
        Ok(self
            .achievements_for(tenant, offering_id, period_id)?
            .iter()
            .map(|a| a.weight)
            .sum())
    }

    // --- actividades ---

    pub fn create_activity(&self, tenant: &TenantContext, achievement_id: Id, new: &NewActivity) -> AppResult<Activity> {
        validation::required("activity title", &new.title)?;
        validation::percent_weight(new.weight)?;
        let achievement = self.achievement(tenant, achievement_id)?;
        if achievement.kind != AchievementKind::Practical {
            return Err(AppError::validation("activities can only be added to practical achievements"));
        }
        self.conn.execute(
            "INSERT INTO activities (school_id, achievement_id, title, weight) VALUES (?1, ?2, ?3, ?4)",
            params![tenant.school_id(), achievement_id, new.title.trim(), dec_text(new.weight)],
        )?;
        self.activity(tenant, self.conn.last_insert_rowid())
    }

    pub fn activity(&self, tenant: &TenantContext, id: Id) -> AppResult<Activity> {
        self.conn
            .query_row(
                "SELECT id, achievement_id, title, weight FROM activities WHERE id = ?1 AND school_id = ?2",
                params![id, tenant.school_id()],
                map_activity,
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("activity"))
    }

    pub fn activities_for(&self, tenant: &TenantContext, achievement_id: Id) -> AppResult<Vec<Activity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, achievement_id, title, weight FROM activities
             WHERE achievement_id = ?1 AND school_id = ?2 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![achievement_id, tenant.school_id()], map_activity)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // --- notas de logro ---

    fn upsert_grade(&self, tenant: &TenantContext, student_id: Id, achievement_id: Id, value: Decimal, notes: Option<&str>) -> AppResult<()> {
        self.conn.execute(
            "INSERT INTO grades (school_id, student_id, achievement_id, value, notes, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (student_id, achievement_id)
             DO UPDATE SET value = excluded.value, notes = excluded.notes, recorded_at = excluded.recorded_at",
            params![
                tenant.school_id(),
                student_id,
                achievement_id,
                dec_text(value),
                notes,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn delete_grade(&self, tenant: &TenantContext, student_id: Id, achievement_id: Id) -> AppResult<()> {
        self.conn.execute(
            "DELETE FROM grades WHERE student_id = ?1 AND achievement_id = ?2 AND school_id = ?3",
            params![student_id, achievement_id, tenant.school_id()],
        )?;
        Ok(())
    }

    /// Captura por lotes de las notas de un logro. Una fila sin valor borra la nota.
    /// Devuelve cuántas filas se guardaron o borraron.
    pub fn save_grades(&self, tenant: &TenantContext, achievement_id: Id, entries: &[GradeEntry]) -> AppResult<usize> {
        self.ensure_owned(tenant, "achievements", achievement_id)?;
        for entry in entries {
            validation::optional_grade(entry.value)?;
        }
        let tx = self.conn.unchecked_transaction()?;
        for entry in entries {
            self.ensure_owned(tenant, "students", entry.student_id)?;
            match entry.value {
                Some(value) => self.upsert_grade(tenant, entry.student_id, achievement_id, value, entry.notes.as_deref())?,
                None => self.delete_grade(tenant, entry.student_id, achievement_id)?,
            }
        }
        tx.commit()?;
        debug!(achievement_id, rows = entries.len(), "grades saved");
        Ok(entries.len())
    }

    pub fn grades_for_achievement(&self, tenant: &TenantContext, achievement_id: Id) -> AppResult<Vec<Grade>> {
        let mut stmt = self.conn.prepare(
            "SELECT student_id, achievement_id, value, notes FROM grades
             WHERE achievement_id = ?1 AND school_id = ?2 ORDER BY student_id",
        )?;
        let rows = stmt.query_map(params![achievement_id, tenant.school_id()], |r| {
            Ok(Grade { student_id: r.get(0)?, achievement_id: r.get(1)?, value: decimal_at(r, 2)?, notes: r.get(3)? })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Notas de un estudiante por logro para (oferta, periodo).
    pub fn grades_for_student(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        offering_id: Id,
        period_id: Id,
    ) -> AppResult<HashMap<Id, Decimal>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.achievement_id, g.value FROM grades g
             JOIN achievements a ON a.id = g.achievement_id
             WHERE g.student_id = ?1 AND a.offering_id = ?2 AND a.period_id = ?3 AND g.school_id = ?4",
        )?;
        let rows = stmt.query_map(params![student_id, offering_id, period_id, tenant.school_id()], |r| {
            Ok((r.get::<_, Id>(0)?, decimal_at(r, 1)?))
        })?;
        Ok(rows.collect::<Result<HashMap<_, _>, _>>()?)
    }

    /// Todas las notas de logro del estudiante en el año: `(oferta, número de periodo, nota)`.
    pub fn student_grades_for_year(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        year_id: Id,
    ) -> AppResult<Vec<(Id, u8, Decimal)>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.offering_id, p.number, g.value FROM grades g
             JOIN achievements a ON a.id = g.achievement_id
             JOIN periods p ON p.id = a.period_id
             WHERE g.student_id = ?1 AND p.year_id = ?2 AND g.school_id = ?3
             ORDER BY a.offering_id, p.number",
        )?;
        let rows = stmt.query_map(params![student_id, year_id, tenant.school_id()], |r| {
            Ok((r.get::<_, Id>(0)?, r.get::<_, u8>(1)?, decimal_at(r, 2)?))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // --- notas de actividad ---

    pub fn activity_grades_for_student(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        achievement_id: Id,
    ) -> AppResult<HashMap<Id, Decimal>> {
        let mut stmt = self.conn.prepare(
            "SELECT ag.activity_id, ag.value FROM activity_grades ag
             JOIN activities act ON act.id = ag.activity_id
             WHERE ag.student_id = ?1 AND act.achievement_id = ?2 AND ag.school_id = ?3",
        )?;
        let rows = stmt.query_map(params![student_id, achievement_id, tenant.school_id()], |r| {
            Ok((r.get::<_, Id>(0)?, decimal_at(r, 1)?))
        })?;
        Ok(rows.collect::<Result<HashMap<_, _>, _>>()?)
    }

    /// Recalcula la nota del logro a partir de las actividades del estudiante.
    pub fn apply_activity_rollup(&self, tenant: &TenantContext, student_id: Id, achievement_id: Id) -> AppResult<RollupOutcome> {
        let achievement = self.achievement(tenant, achievement_id)?;
        let activities = self.activities_for(tenant, achievement_id)?;
        let grades = self.activity_grades_for_student(tenant, student_id, achievement_id)?;
        let outcome = rollup_activities(achievement.kind, &activities, &grades);
        match outcome {
            RollupOutcome::Unchanged => {}
            RollupOutcome::Clear => self.delete_grade(tenant, student_id, achievement_id)?,
            RollupOutcome::Set(value) => self.upsert_grade(tenant, student_id, achievement_id, value, None)?,
        }
        debug!(student_id, achievement_id, ?outcome, "activity roll-up applied");
        Ok(outcome)
    }

    /// Captura por lotes de una actividad; recalcula el logro de cada estudiante
    /// tocado dentro de la misma transacción.
    pub fn save_activity_grades(&self, tenant: &TenantContext, activity_id: Id, entries: &[GradeEntry]) -> AppResult<usize> {
        let activity = self.activity(tenant, activity_id)?;
        let achievement = self.achievement(tenant, activity.achievement_id)?;
        if achievement.kind != AchievementKind::Practical {
            return Err(AppError::validation("activity grades can only be captured for practical achievements"));
        }
        for entry in entries {
            validation::optional_grade(entry.value)?;
        }
        let tx = self.conn.unchecked_transaction()?;
        let mut touched: HashSet<Id> = HashSet::new();
        for entry in entries {
            self.ensure_owned(tenant, "students", entry.student_id)?;
            match entry.value {
                Some(value) => {
                    self.conn.execute(
                        "INSERT INTO activity_grades (school_id, student_id, activity_id, value)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT (student_id, activity_id) DO UPDATE SET value = excluded.value",
                        params![tenant.school_id(), entry.student_id, activity_id, dec_text(value)],
                    )?;
                }
                None => {
                    self.conn.execute(
                        "DELETE FROM activity_grades WHERE student_id = ?1 AND activity_id = ?2 AND school_id = ?3",
                        params![entry.student_id, activity_id, tenant.school_id()],
                    )?;
                }
            }
            touched.insert(entry.student_id);
        }
        for student_id in &touched {
            self.apply_activity_rollup(tenant, *student_id, activity.achievement_id)?;
        }
        tx.commit()?;
        Ok(entries.len())
    }

    // --- Saber Ser ---

    /// Captura por lotes; una fila con las tres sub-notas vacías borra el registro.
    pub fn save_behavioral(
        &self,
        tenant: &TenantContext,
        offering_id: Id,
        period_id: Id,
        entries: &[BehavioralEntry],
    ) -> AppResult<usize> {
        self.ensure_owned(tenant, "offerings", offering_id)?;
        self.ensure_owned(tenant, "periods", period_id)?;
        for entry in entries {
            validation::optional_grade(entry.behavior)?;
            validation::optional_grade(entry.responsibility)?;
            validation::optional_grade(entry.self_evaluation)?;
        }
        let tx = self.conn.unchecked_transaction()?;
        for entry in entries {
            self.ensure_owned(tenant, "students", entry.student_id)?;
            if entry.is_empty() {
                self.conn.execute(
                    "DELETE FROM behavioral_scores
                     WHERE student_id = ?1 AND offering_id = ?2 AND period_id = ?3 AND school_id = ?4",
                    params![entry.student_id, offering_id, period_id, tenant.school_id()],
                )?;
                continue;
            }
            self.conn.execute(
                "INSERT INTO behavioral_scores
                    (school_id, student_id, offering_id, period_id, behavior, responsibility, self_evaluation)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (student_id, offering_id, period_id)
                 DO UPDATE SET behavior = excluded.behavior, responsibility = excluded.responsibility,
                               self_evaluation = excluded.self_evaluation",
                params![
                    tenant.school_id(),
                    entry.student_id,
                    offering_id,
                    period_id,
                    opt_dec_text(entry.behavior),
                    opt_dec_text(entry.responsibility),
                    opt_dec_text(entry.self_evaluation)
                ],
            )?;
        }
        tx.commit()?;
        Ok(entries.len())
    }

    pub fn behavioral_score(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        offering_id: Id,
        period_id: Id,
    ) -> AppResult<Option<BehavioralScore>> {
        Ok(self
            .conn
            .query_row(
                "SELECT student_id, offering_id, period_id, behavior, responsibility, self_evaluation
                 FROM behavioral_scores
                 WHERE student_id = ?1 AND offering_id = ?2 AND period_id = ?3 AND school_id = ?4",
                params![student_id, offering_id, period_id, tenant.school_id()],
                map_behavioral,
            )
            .optional()?)
    }
}
