// Acceso a datos sobre SQLite.
//
// Cada operación recibe un `TenantContext` y filtra por `school_id`. El Store
// envuelve una sola conexión; la capa HTTP abre una conexión corta por trabajo.

mod academic;
mod attendance;
mod billing;
mod grading;
pub mod schema;

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{Id, NewSchool, School};
use crate::tenant::{normalize_host, TenantContext};

pub use billing::{PaymentRow, PendingReceivable};

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Abre (o crea) la base en `path`, creando el directorio si hace falta.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Store { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> AppResult<()> {
        self.conn.execute_batch(schema::SCHEMA)?;
        debug!("schema ready");
        Ok(())
    }

    // --- colegios ---

    pub fn create_school(&self, new: &NewSchool) -> AppResult<School> {
        let name = new.name.trim();
        let domain = normalize_host(&new.domain);
        if name.is_empty() {
            return Err(AppError::validation("school name is required"));
        }
        if domain.is_empty() {
            return Err(AppError::validation("school domain is required"));
        }
        let exists: Option<Id> = self
            .conn
            .query_row("SELECT id FROM schools WHERE domain = ?1", params![domain], |r| r.get(0))
            .optional()?;
        if exists.is_some() {
            return Err(AppError::validation(format!("domain '{}' is already registered", domain)));
        }
        self.conn.execute(
            "INSERT INTO schools (name, domain, slogan) VALUES (?1, ?2, ?3)",
            params![name, domain, new.slogan],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(school_id = id, %domain, "school created");
        Ok(School { id, name: name.to_string(), domain, slogan: new.slogan.clone() })
    }

    pub fn school(&self, tenant: &TenantContext) -> AppResult<School> {
        self.conn
            .query_row(
                "SELECT id, name, domain, slogan FROM schools WHERE id = ?1",
                params![tenant.school_id()],
                map_school,
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("school"))
    }

    /// Resuelve el colegio a partir del valor de la cabecera `Host`.
    pub fn resolve_tenant(&self, host: &str) -> AppResult<TenantContext> {
        let domain = normalize_host(host);
        let id: Option<Id> = self
            .conn
            .query_row("SELECT id FROM schools WHERE domain = ?1", params![domain], |r| r.get(0))
            .optional()?;
        match id {
            Some(id) => Ok(TenantContext::new(id)),
            None => Err(AppError::UnknownTenant(domain)),
        }
    }

    /// Verifica que la fila `id` de `table` pertenezca al colegio.
    fn ensure_owned(&self, tenant: &TenantContext, table: &'static str, id: Id) -> AppResult<()> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1 AND school_id = ?2", table);
        let found: Option<i64> = self
            .conn
            .query_row(&sql, params![id, tenant.school_id()], |r| r.get(0))
            .optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(AppError::not_found(entity_name(table))),
        }
    }
}

fn entity_name(table: &'static str) -> &'static str {
    match table {
        "academic_years" => "academic year",
        "periods" => "period",
        "courses" => "course",
        "subjects" => "subject",
        "teachers" => "teacher",
        "students" => "student",
        "enrollments" => "enrollment",
        "offerings" => "offering",
        "achievements" => "achievement",
        "activities" => "activity",
        "fiscal_years" => "fiscal year",
        "payment_concepts" => "payment concept",
        "receivables" => "receivable",
        "payments" => "payment",
        "roll_calls" => "roll call",
        other => other,
    }
}

fn map_school(row: &Row<'_>) -> rusqlite::Result<School> {
    Ok(School { id: row.get(0)?, name: row.get(1)?, domain: row.get(2)?, slogan: row.get(3)? })
}

// Decimales guardados como TEXT

pub(crate) fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(raw.trim())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn opt_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        Decimal::from_str(s.trim())
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn dec_text(value: Decimal) -> String {
    value.to_string()
}

pub(crate) fn opt_dec_text(value: Option<Decimal>) -> Option<String> {
    value.map(dec_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_resolution_by_domain() {
        let store = Store::open_in_memory().unwrap();
        let school = store
            .create_school(&NewSchool { name: "San José".into(), domain: "sanjose.edu.co".into(), slogan: None })
            .unwrap();
        let tenant = store.resolve_tenant("SanJose.edu.co:8080").unwrap();
        assert_eq!(tenant.school_id(), school.id);
        assert!(matches!(store.resolve_tenant("otro.edu.co"), Err(AppError::UnknownTenant(_))));
    }

    #[test]
    fn duplicate_domain_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let new = NewSchool { name: "A".into(), domain: "a.test".into(), slogan: None };
        store.create_school(&new).unwrap();
        assert!(matches!(store.create_school(&new), Err(AppError::Validation(_))));
    }
}
