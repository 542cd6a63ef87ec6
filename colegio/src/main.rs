// --- Sistema de Gestión Escolar - Archivo principal ---

use colegio::config::Config;
use colegio::run_server;
use colegio::store::Store;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    // crea el archivo y el esquema antes de aceptar peticiones
    if let Err(e) = Store::open(&config.db_path) {
        error!(db = %config.db_path.display(), "failed to open database: {}", e);
        return Err(std::io::Error::other(e.to_string()));
    }

    info!("=== Sistema de Gestión Escolar (API) === http://{}", config.bind);
    run_server(config).await
}
