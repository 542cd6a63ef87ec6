// Estructura académica: años, periodos, cursos, asignaturas, docentes,
// estudiantes, matrículas, ofertas y observaciones del boletín.

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use super::{dec_text, decimal_at, Store};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::tenant::TenantContext;
use crate::validation;

const STUDENT_COLUMNS: &str =
    "s.id, s.first_names, s.last_names, s.document_type, s.identification, s.birth_date, s.course_id, s.guardian";

fn map_year(row: &Row<'_>) -> rusqlite::Result<AcademicYear> {
    Ok(AcademicYear {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        active: row.get(4)?,
    })
}

fn map_period(row: &Row<'_>) -> rusqlite::Result<Period> {
    Ok(Period {
        id: row.get(0)?,
        year_id: row.get(1)?,
        number: row.get(2)?,
        name: row.get(3)?,
        weight: decimal_at(row, 4)?,
    })
}

fn map_course(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course { id: row.get(0)?, grade: row.get(1)?, name: row.get(2)?, shift: row.get(3)? })
}

fn map_subject(row: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject { id: row.get(0)?, name: row.get(1)?, area: row.get(2)? })
}

fn map_teacher(row: &Row<'_>) -> rusqlite::Result<Teacher> {
    Ok(Teacher {
        id: row.get(0)?,
        first_names: row.get(1)?,
        last_names: row.get(2)?,
        identification: row.get(3)?,
        email: row.get(4)?,
    })
}

fn map_student(row: &Row<'_>) -> rusqlite::Result<Student> {
    let code: String = row.get(3)?;
    let document_type = DocumentType::from_code(&code).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, format!("unknown document type {}", code).into())
    })?;
    Ok(Student {
        id: row.get(0)?,
        first_names: row.get(1)?,
        last_names: row.get(2)?,
        document_type,
        identification: row.get(4)?,
        birth_date: row.get(5)?,
        course_id: row.get(6)?,
        guardian: row.get(7)?,
    })
}

fn map_enrollment(row: &Row<'_>) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        id: row.get(0)?,
        student_id: row.get(1)?,
        year_id: row.get(2)?,
        course_id: row.get(3)?,
        active: row.get(4)?,
    })
}

fn map_offering(row: &Row<'_>) -> rusqlite::Result<CourseOffering> {
    Ok(CourseOffering {
        id: row.get(0)?,
        year_id: row.get(1)?,
        course_id: row.get(2)?,
        subject_id: row.get(3)?,
        teacher_id: row.get(4)?,
        weekly_hours: row.get(5)?,
    })
}

impl Store {
    // --- años lectivos y periodos ---

    pub fn create_year(&self, tenant: &TenantContext, new: &NewAcademicYear) -> AppResult<AcademicYear> {
        validation::required("year name", &new.name)?;
        validation::date_range(new.start_date, new.end_date)?;
        let name = new.name.trim();
        let dup: Option<Id> = self
            .conn
            .query_row(
                "SELECT id FROM academic_years WHERE school_id = ?1 AND name = ?2",
                params![tenant.school_id(), name],
                |r| r.get(0),
            )
            .optional()?;
        if dup.is_some() {
            return Err(AppError::validation(format!("academic year '{}' already exists", name)));
        }
        self.conn.execute(
            "INSERT INTO academic_years (school_id, name, start_date, end_date, active) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![tenant.school_id(), name, new.start_date, new.end_date, new.active],
        )?;
        self.year(tenant, self.conn.last_insert_rowid())
    }

    pub fn year(&self, tenant: &TenantContext, id: Id) -> AppResult<AcademicYear> {
        self.conn
            .query_row(
                "SELECT id, name, start_date, end_date, active FROM academic_years WHERE id = ?1 AND school_id = ?2",
                params![id, tenant.school_id()],
                map_year,
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("academic year"))
    }

    pub fn list_years(&self, tenant: &TenantContext) -> AppResult<Vec<AcademicYear>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, start_date, end_date, active FROM academic_years
             WHERE school_id = ?1 ORDER BY start_date DESC",
        )?;
        let rows = stmt.query_map(params![tenant.school_id()], map_year)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn create_period(&self, tenant: &TenantContext, year_id: Id, new: &NewPeriod) -> AppResult<Period> {
        self.ensure_owned(tenant, "academic_years", year_id)?;
        validation::required("period name", &new.name)?;
        validation::period(new.number, new.weight)?;
        let dup: Option<Id> = self
            .conn
            .query_row(
                "SELECT id FROM periods WHERE year_id = ?1 AND number = ?2",
                params![year_id, new.number],
                |r| r.get(0),
            )
            .optional()?;
        if dup.is_some() {
            return Err(AppError::validation(format!("period {} already exists for this year", new.number)));
        }
        self.conn.execute(
            "INSERT INTO periods (school_id, year_id, number, name, weight) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![tenant.school_id(), year_id, new.number, new.name.trim(), dec_text(new.weight)],
        )?;
        self.period(tenant, self.conn.last_insert_rowid())
    }

    pub fn period(&self, tenant: &TenantContext, id: Id) -> AppResult<Period> {
        self.conn
            .query_row(
                "SELECT id, year_id, number, name, weight FROM periods WHERE id = ?1 AND school_id = ?2",
                params![id, tenant.school_id()],
                map_period,
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("period"))
    }

    /// Periodos del año ordenados por número.
    pub fn periods_for_year(&self, tenant: &TenantContext, year_id: Id) -> AppResult<Vec<Period>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, year_id, number, name, weight FROM periods
             WHERE year_id = ?1 AND school_id = ?2 ORDER BY number",
        )?;
        let rows = stmt.query_map(params![year_id, tenant.school_id()], map_period)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // --- cursos, asignaturas, docentes ---

    pub fn create_course(&self, tenant: &TenantContext, new: &NewCourse) -> AppResult<Course> {
        validation::required("grade", &new.grade)?;
        validation::required("course name", &new.name)?;
        let dup: Option<Id> = self
            .conn
            .query_row(
                "SELECT id FROM courses WHERE school_id = ?1 AND grade = ?2 AND name = ?3",
                params![tenant.school_id(), new.grade.trim(), new.name.trim()],
                |r| r.get(0),
            )
            .optional()?;
        if dup.is_some() {
            return Err(AppError::validation(format!("course {} {} already exists", new.grade, new.name)));
        }
        self.conn.execute(
            "INSERT INTO courses (school_id, grade, name, shift) VALUES (?1, ?2, ?3, ?4)",
            params![tenant.school_id(), new.grade.trim(), new.name.trim(), new.shift],
        )?;
        self.course(tenant, self.conn.last_insert_rowid())
    }

    pub fn course(&self, tenant: &TenantContext, id: Id) -> AppResult<Course> {
        self.conn
            .query_row(
                "SELECT id, grade, name, shift FROM courses WHERE id = ?1 AND school_id = ?2",
                params![id, tenant.school_id()],
                map_course,
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("course"))
    }

    pub fn list_courses(&self, tenant: &TenantContext) -> AppResult<Vec<Course>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, grade, name, shift FROM courses WHERE school_id = ?1 ORDER BY grade, name")?;
        let rows = stmt.query_map(params![tenant.school_id()], map_course)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn create_subject(&self, tenant: &TenantContext, new: &NewSubject) -> AppResult<Subject> {
        validation::required("subject name", &new.name)?;
        let name = new.name.trim();
        let dup: Option<Id> = self
            .conn
            .query_row(
                "SELECT id FROM subjects WHERE school_id = ?1 AND name = ?2",
                params![tenant.school_id(), name],
                |r| r.get(0),
            )
            .optional()?;
        if dup.is_some() {
            return Err(AppError::validation(format!("subject '{}' already exists", name)));
        }
        self.conn.execute(
            "INSERT INTO subjects (school_id, name, area) VALUES (?1, ?2, ?3)",
            params![tenant.school_id(), name, new.area],
        )?;
        self.subject(tenant, self.conn.last_insert_rowid())
    }

    pub fn subject(&self, tenant: &TenantContext, id: Id) -> AppResult<Subject> {
        self.conn
            .query_row(
                "SELECT id, name, area FROM subjects WHERE id = ?1 AND school_id = ?2",
                params![id, tenant.school_id()],
                map_subject,
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("subject"))
    }

    pub fn list_subjects(&self, tenant: &TenantContext) -> AppResult<Vec<Subject>> {
        let mut stmt =
            self.conn.prepare("SELECT id, name, area FROM subjects WHERE school_id = ?1 ORDER BY name")?;
        let rows = stmt.query_map(params![tenant.school_id()], map_subject)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn create_teacher(&self, tenant: &TenantContext, new: &NewTeacher) -> AppResult<Teacher> {
        validation::required("first names", &new.first_names)?;
        validation::required("last names", &new.last_names)?;
        validation::required("identification", &new.identification)?;
        let dup: Option<Id> = self
            .conn
            .query_row(
                "SELECT id FROM teachers WHERE school_id = ?1 AND identification = ?2",
                params![tenant.school_id(), new.identification.trim()],
                |r| r.get(0),
            )
            .optional()?;
        if dup.is_some() {
            return Err(AppError::validation("a teacher with this identification already exists"));
        }
        self.conn.execute(
            "INSERT INTO teachers (school_id, first_names, last_names, identification, email)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                tenant.school_id(),
                new.first_names.trim(),
                new.last_names.trim(),
                new.identification.trim(),
                new.email
            ],
        )?;
        self.teacher(tenant, self.conn.last_insert_rowid())
    }

    pub fn teacher(&self, tenant: &TenantContext, id: Id) -> AppResult<Teacher> {
        self.conn
            .query_row(
                "SELECT id, first_names, last_names, identification, email FROM teachers
                 WHERE id = ?1 AND school_id = ?2",
                params![id, tenant.school_id()],
                map_teacher,
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("teacher"))
    }

    pub fn list_teachers(&self, tenant: &TenantContext) -> AppResult<Vec<Teacher>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, first_names, last_names, identification, email FROM teachers
             WHERE school_id = ?1 ORDER BY last_names, first_names",
        )?;
        let rows = stmt.query_map(params![tenant.school_id()], map_teacher)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // --- estudiantes y matrículas ---

    pub fn create_student(&self, tenant: &TenantContext, new: &NewStudent) -> AppResult<Student> {
        validation::required("first names", &new.first_names)?;
        validation::required("last names", &new.last_names)?;
        validation::required("identification", &new.identification)?;
        if let Some(course_id) = new.course_id {
            self.ensure_owned(tenant, "courses", course_id)?;
        }
        let dup: Option<Id> = self
            .conn
            .query_row(
                "SELECT id FROM students WHERE school_id = ?1 AND identification = ?2",
                params![tenant.school_id(), new.identification.trim()],
                |r| r.get(0),
            )
            .optional()?;
        if dup.is_some() {
            return Err(AppError::validation("a student with this identification already exists"));
        }
        self.conn.execute(
            "INSERT INTO students (school_id, first_names, last_names, document_type, identification,
                                   birth_date, course_id, guardian)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tenant.school_id(),
                new.first_names.trim(),
                new.last_names.trim(),
                new.document_type.code(),
                new.identification.trim(),
                new.birth_date,
                new.course_id,
                new.guardian
            ],
        )?;
        self.student(tenant, self.conn.last_insert_rowid())
    }

    pub fn student(&self, tenant: &TenantContext, id: Id) -> AppResult<Student> {
        let sql = format!("SELECT {} FROM students s WHERE s.id = ?1 AND s.school_id = ?2", STUDENT_COLUMNS);
        self.conn
            .query_row(&sql, params![id, tenant.school_id()], map_student)
            .optional()?
            .ok_or_else(|| AppError::not_found("student"))
    }

    pub fn list_students(&self, tenant: &TenantContext, course_id: Option<Id>) -> AppResult<Vec<Student>> {
        let sql = format!(
            "SELECT {} FROM students s WHERE s.school_id = ?1 AND (?2 IS NULL OR s.course_id = ?2)
             ORDER BY s.last_names, s.first_names",
            STUDENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![tenant.school_id(), course_id], map_student)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Matricula al estudiante; un estudiante tiene una sola matrícula por año.
    pub fn enroll(&self, tenant: &TenantContext, new: &NewEnrollment) -> AppResult<Enrollment> {
        self.ensure_owned(tenant, "students", new.student_id)?;
        self.ensure_owned(tenant, "academic_years", new.year_id)?;
        self.ensure_owned(tenant, "courses", new.course_id)?;
        if self.enrollment(tenant, new.student_id, new.year_id)?.is_some() {
            return Err(AppError::validation("student is already enrolled for this year"));
        }
        self.conn.execute(
            "INSERT INTO enrollments (school_id, student_id, year_id, course_id, active) VALUES (?1, ?2, ?3, ?4, 1)",
            params![tenant.school_id(), new.student_id, new.year_id, new.course_id],
        )?;
        let id = self.conn.last_insert_rowid();
        self.conn.execute(
            "UPDATE students SET course_id = ?1 WHERE id = ?2 AND school_id = ?3",
            params![new.course_id, new.student_id, tenant.school_id()],
        )?;
        Ok(Enrollment {
            id,
            student_id: new.student_id,
            year_id: new.year_id,
            course_id: new.course_id,
            active: true,
        })
    }

    /// Pasa a los estudiantes seleccionados al (año, curso) destino en una sola
    /// transacción. La matrícula de origen queda inactiva.
    pub fn promote_enrollments(&self, tenant: &TenantContext, promotion: &EnrollmentPromotion) -> AppResult<PromotionOutcome> {
        if promotion.student_ids.is_empty() {
            return Err(AppError::validation("no students selected for promotion"));
        }
        self.ensure_owned(tenant, "academic_years", promotion.from_year_id)?;
        self.ensure_owned(tenant, "courses", promotion.from_course_id)?;
        self.ensure_owned(tenant, "academic_years", promotion.to_year_id)?;
        self.ensure_owned(tenant, "courses", promotion.to_course_id)?;
        if promotion.from_year_id == promotion.to_year_id {
            return Err(AppError::validation("the target academic year must differ from the source year"));
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut outcome = PromotionOutcome::default();
        for &student_id in &promotion.student_ids {
            self.ensure_owned(tenant, "students", student_id)?;
            if self.enrollment(tenant, student_id, promotion.to_year_id)?.is_some()
                || !self.is_enrolled(tenant, student_id, promotion.from_year_id, promotion.from_course_id)?
            {
                outcome.skipped += 1;
                continue;
            }
            self.conn.execute(
                "UPDATE enrollments SET active = 0 WHERE student_id = ?1 AND year_id = ?2 AND school_id = ?3",
                params![student_id, promotion.from_year_id, tenant.school_id()],
            )?;
            self.conn.execute(
                "INSERT INTO enrollments (school_id, student_id, year_id, course_id, active) VALUES (?1, ?2, ?3, ?4, 1)",
                params![tenant.school_id(), student_id, promotion.to_year_id, promotion.to_course_id],
            )?;
            self.conn.execute(
                "UPDATE students SET course_id = ?1 WHERE id = ?2 AND school_id = ?3",
                params![promotion.to_course_id, student_id, tenant.school_id()],
            )?;
            outcome.created += 1;
        }
        tx.commit()?;
        info!(
            from_year = promotion.from_year_id,
            to_year = promotion.to_year_id,
            created = outcome.created,
            skipped = outcome.skipped,
            "enrollments promoted"
        );
        Ok(outcome)
    }

    pub fn enrollment(&self, tenant: &TenantContext, student_id: Id, year_id: Id) -> AppResult<Option<Enrollment>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, student_id, year_id, course_id, active FROM enrollments
                 WHERE student_id = ?1 AND year_id = ?2 AND school_id = ?3",
                params![student_id, year_id, tenant.school_id()],
                map_enrollment,
            )
            .optional()?)
    }

    /// Estudiantes con matrícula activa en (año, curso), por apellidos.
    pub fn enrolled_students(&self, tenant: &TenantContext, year_id: Id, course_id: Id) -> AppResult<Vec<Student>> {
        let sql = format!(
            "SELECT {} FROM students s
             JOIN enrollments e ON e.student_id = s.id
             WHERE e.school_id = ?1 AND e.year_id = ?2 AND e.course_id = ?3 AND e.active = 1
             ORDER BY s.last_names, s.first_names",
            STUDENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![tenant.school_id(), year_id, course_id], map_student)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn is_enrolled(&self, tenant: &TenantContext, student_id: Id, year_id: Id, course_id: Id) -> AppResult<bool> {
        Ok(self
            .enrollment(tenant, student_id, year_id)?
            .map(|e| e.active && e.course_id == course_id)
            .unwrap_or(false))
    }

    // --- ofertas ---

    pub fn create_offering(&self, tenant: &TenantContext, new: &NewCourseOffering) -> AppResult<CourseOffering> {
        self.ensure_owned(tenant, "academic_years", new.year_id)?;
        self.ensure_owned(tenant, "courses", new.course_id)?;
        self.ensure_owned(tenant, "subjects", new.subject_id)?;
        if let Some(teacher_id) = new.teacher_id {
            self.ensure_owned(tenant, "teachers", teacher_id)?;
        }
        let dup: Option<Id> = self
            .conn
            .query_row(
                "SELECT id FROM offerings WHERE year_id = ?1 AND course_id = ?2 AND subject_id = ?3",
                params![new.year_id, new.course_id, new.subject_id],
                |r| r.get(0),
            )
            .optional()?;
        if dup.is_some() {
            return Err(AppError::validation("this subject is already offered to the course for the year"));
        }
        self.conn.execute(
            "INSERT INTO offerings (school_id, year_id, course_id, subject_id, teacher_id, weekly_hours)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tenant.school_id(),
                new.year_id,
                new.course_id,
                new.subject_id,
                new.teacher_id,
                new.weekly_hours
            ],
        )?;
        self.offering(tenant, self.conn.last_insert_rowid())
    }

    pub fn offering(&self, tenant: &TenantContext, id: Id) -> AppResult<CourseOffering> {
        self.conn
            .query_row(
                "SELECT id, year_id, course_id, subject_id, teacher_id, weekly_hours FROM offerings
                 WHERE id = ?1 AND school_id = ?2",
                params![id, tenant.school_id()],
                map_offering,
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("offering"))
    }

    /// Ofertas filtradas opcionalmente por año y curso, en orden de asignatura.
    pub fn list_offerings(
        &self,
        tenant: &TenantContext,
        year_id: Option<Id>,
        course_id: Option<Id>,
    ) -> AppResult<Vec<CourseOffering>> {
        let mut stmt = self.conn.prepare(
            "SELECT o.id, o.year_id, o.course_id, o.subject_id, o.teacher_id, o.weekly_hours
             FROM offerings o JOIN subjects sub ON sub.id = o.subject_id
             WHERE o.school_id = ?1 AND (?2 IS NULL OR o.year_id = ?2) AND (?3 IS NULL OR o.course_id = ?3)
             ORDER BY sub.area, sub.name",
        )?;
        let rows = stmt.query_map(params![tenant.school_id(), year_id, course_id], map_offering)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn offerings_for_course(&self, tenant: &TenantContext, year_id: Id, course_id: Id) -> AppResult<Vec<CourseOffering>> {
        self.list_offerings(tenant, Some(year_id), Some(course_id))
    }

    // --- observaciones del boletín ---

    pub fn upsert_observation(&self, tenant: &TenantContext, obs: &ReportObservation) -> AppResult<ReportObservation> {
        validation::required("observation text", &obs.text)?;
        self.ensure_owned(tenant, "students", obs.student_id)?;
        self.ensure_owned(tenant, "periods", obs.period_id)?;
        if let Some(teacher_id) = obs.teacher_id {
            self.ensure_owned(tenant, "teachers", teacher_id)?;
        }
        self.conn.execute(
            "INSERT INTO report_observations (school_id, student_id, period_id, teacher_id, text, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (student_id, period_id)
             DO UPDATE SET teacher_id = excluded.teacher_id, text = excluded.text, updated_at = excluded.updated_at",
            params![
                tenant.school_id(),
                obs.student_id,
                obs.period_id,
                obs.teacher_id,
                obs.text.trim(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(ReportObservation { text: obs.text.trim().to_string(), ..obs.clone() })
    }

    pub fn observation(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        period_id: Id,
    ) -> AppResult<Option<ReportObservation>> {
        Ok(self
            .conn
            .query_row(
                "SELECT student_id, period_id, teacher_id, text FROM report_observations
                 WHERE student_id = ?1 AND period_id = ?2 AND school_id = ?3",
                params![student_id, period_id, tenant.school_id()],
                |r| {
                    Ok(ReportObservation {
                        student_id: r.get(0)?,
                        period_id: r.get(1)?,
                        teacher_id: r.get(2)?,
                        text: r.get(3)?,
                    })
                },
            )
            .optional()?)
    }
}
