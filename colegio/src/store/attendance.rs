use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use super::Store;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::tenant::TenantContext;

fn map_roll_call(row: &Row<'_>) -> rusqlite::Result<RollCall> {
    Ok(RollCall {
        id: row.get(0)?,
        year_id: row.get(1)?,
        course_id: row.get(2)?,
        period_id: row.get(3)?,
        date: row.get(4)?,
        teacher_id: row.get(5)?,
        notes: row.get(6)?,
    })
}

impl Store {
    pub fn roll_call(&self, tenant: &TenantContext, course_id: Id, date: NaiveDate) -> AppResult<Option<RollCall>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, year_id, course_id, period_id, date, teacher_id, notes FROM roll_calls
                 WHERE course_id = ?1 AND date = ?2 AND school_id = ?3",
                params![course_id, date, tenant.school_id()],
                map_roll_call,
            )
            .optional()?)
    }

    /// Toma de asistencia de un curso en una fecha: obtiene o crea la planilla
    /// y registra el estado de cada estudiante. Filas sin estado se omiten.
    pub fn record_roll_call(&self, tenant: &TenantContext, new: &NewRollCall) -> AppResult<RollCall> {
        self.ensure_owned(tenant, "courses", new.course_id)?;
        let period = self.period(tenant, new.period_id)?;
        if period.year_id != new.year_id {
            return Err(AppError::validation("the period does not belong to the academic year"));
        }
        if let Some(teacher_id) = new.teacher_id {
            self.ensure_owned(tenant, "teachers", teacher_id)?;
        }

        let tx = self.conn.unchecked_transaction()?;
        let roll_call_id = match self.roll_call(tenant, new.course_id, new.date)? {
            Some(existing) => {
                self.conn.execute(
                    "UPDATE roll_calls SET teacher_id = COALESCE(?1, teacher_id), notes = COALESCE(?2, notes)
                     WHERE id = ?3",
                    params![new.teacher_id, new.notes, existing.id],
                )?;
                existing.id
            }
            None => {
                self.conn.execute(
                    "INSERT INTO roll_calls (school_id, year_id, course_id, period_id, date, teacher_id, notes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        tenant.school_id(),
                        new.year_id,
                        new.course_id,
                        new.period_id,
                        new.date,
                        new.teacher_id,
                        new.notes
                    ],
                )?;
                self.conn.last_insert_rowid()
            }
        };

        let mut recorded = 0usize;
        for entry in &new.entries {
            let Some(status) = entry.status else { continue };
            self.ensure_owned(tenant, "students", entry.student_id)?;
            self.conn.execute(
                "INSERT INTO attendance_entries (school_id, roll_call_id, student_id, status, note)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (roll_call_id, student_id) DO UPDATE SET status = excluded.status, note = excluded.note",
                params![tenant.school_id(), roll_call_id, entry.student_id, status.code(), entry.note],
            )?;
            recorded += 1;
        }
        tx.commit()?;
        info!(course_id = new.course_id, date = %new.date, recorded, "roll call saved");

        self.roll_call(tenant, new.course_id, new.date)?
            .ok_or_else(|| AppError::not_found("roll call"))
    }

    /// Fallas (A) y retardos (T) de un estudiante en un periodo.
    pub fn attendance_summary(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        year_id: Id,
        course_id: Id,
        period_id: Id,
    ) -> AppResult<AttendanceSummary> {
        let mut stmt = self.conn.prepare(
            "SELECT e.status, COUNT(*) FROM attendance_entries e
             JOIN roll_calls r ON r.id = e.roll_call_id
             WHERE e.student_id = ?1 AND r.year_id = ?2 AND r.course_id = ?3 AND r.period_id = ?4
               AND e.school_id = ?5
             GROUP BY e.status",
        )?;
        let rows = stmt.query_map(params![student_id, year_id, course_id, period_id, tenant.school_id()], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, u32>(1)?))
        })?;
        let mut summary = AttendanceSummary::default();
        for row in rows {
            let (status, count) = row?;
            match status.as_str() {
                "A" => summary.absences = count,
                "T" => summary.lates = count,
                _ => {}
            }
        }
        Ok(summary)
    }
}
