use std::env;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::AppError;

const DEFAULT_DB_PATH: &str = "data/colegio.db";
const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Configuración del proceso, leída del entorno (y de `.env` si existe).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind: String,
    pub workers: usize,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `load` pero con una función de búsqueda inyectable (para tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = resolve_db_path(&lookup)?;

        let bind = lookup("COLEGIO_BIND").unwrap_or_else(|| {
            info!("COLEGIO_BIND not set, using default: {DEFAULT_BIND}");
            DEFAULT_BIND.to_string()
        });

        let workers = match lookup("COLEGIO_WORKERS") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                warn!("Invalid COLEGIO_WORKERS value: {e}");
                AppError::Config(format!("COLEGIO_WORKERS must be a positive integer: {}", raw))
            })?,
            None => num_cpus::get(),
        };

        Ok(Config { db_path, bind, workers: workers.max(1) })
    }
}

// COLEGIO_DB_URL tiene prioridad; acepta sqlite:// y file://
fn resolve_db_path<F>(lookup: &F) -> Result<PathBuf, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("COLEGIO_DB_URL") {
        if let Some(path) = url.strip_prefix("sqlite://") {
            return Ok(PathBuf::from(path));
        }
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        return Err(AppError::Config(format!("COLEGIO_DB_URL uses unsupported scheme: {}", url)));
    }

    match lookup("COLEGIO_DB_PATH") {
        Some(p) => Ok(PathBuf::from(p)),
        None => {
            info!("COLEGIO_DB_PATH not set, using default: {DEFAULT_DB_PATH}");
            Ok(PathBuf::from(DEFAULT_DB_PATH))
        }
    }
}
