// Capa JSON de la API: estado compartido y ejecución de trabajos sobre la base.
//
// Todo acceso a SQLite corre en el pool bloqueante de tokio, detrás de un
// semáforo, con una conexión propia por trabajo.

pub mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::HttpRequest;
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::Id;
use crate::store::Store;
use crate::tenant::TenantContext;

#[derive(Clone)]
pub struct AppState {
    db_path: PathBuf,
    jobs: Arc<Semaphore>,
}

impl AppState {
    pub fn new(db_path: impl Into<PathBuf>, workers: usize) -> Self {
        AppState { db_path: db_path.into(), jobs: Arc::new(Semaphore::new(std::cmp::max(1, workers))) }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.db_path.clone(), config.workers)
    }

    /// Ejecuta `job` con una conexión nueva en un hilo bloqueante.
    pub async fn run<T, F>(&self, job: F) -> AppResult<T>
    where
        F: FnOnce(&Store) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .jobs
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("failed to acquire semaphore".to_string()))?;
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let store = Store::open(&path)?;
            job(&store)
        })
        .await
        .map_err(|e| AppError::Internal(format!("task join error: {}", e)))?
    }

    /// Igual que `run`, resolviendo antes el colegio desde la cabecera `Host`.
    pub async fn run_for<T, F>(&self, req: &HttpRequest, job: F) -> AppResult<T>
    where
        F: FnOnce(&Store, &TenantContext) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let host = req.connection_info().host().to_string();
        self.run(move |store| {
            let tenant = store.resolve_tenant(&host)?;
            job(store, &tenant)
        })
        .await
    }
}

// --- parámetros de consulta compartidos ---

#[derive(Debug, Deserialize)]
pub struct OfferingFilter {
    pub year: Option<Id>,
    pub course: Option<Id>,
}

#[derive(Debug, Deserialize)]
pub struct CourseFilter {
    pub course: Option<Id>,
}

#[derive(Debug, Deserialize)]
pub struct ReportCardQuery {
    pub year: Id,
    pub course: Id,
    pub period: Id,
    pub student: Id,
}

#[derive(Debug, Deserialize)]
pub struct ReportCardExport {
    pub year_id: Id,
    pub course_id: Id,
    pub period_id: Id,
    /// Sin lista se exporta todo el curso.
    #[serde(default)]
    pub student_ids: Option<Vec<Id>>,
}

#[derive(Debug, Deserialize)]
pub struct CertificateQuery {
    pub year: Id,
}

#[derive(Debug, Deserialize)]
pub struct PortalQuery {
    pub period: Id,
}

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub fiscal_year: Id,
    pub trimester: u8,
}
