// Biblioteca raíz del crate `colegio`: administración escolar con el cálculo
// de notas y puestos como núcleo.
pub mod api_json;
pub mod billing;
pub mod config;
pub mod error;
pub mod grading;
pub mod models;
pub mod report_card;
pub mod reports;
pub mod server;
pub mod store;
pub mod tenant;
pub mod validation;

/// Ejecuta el servidor HTTP (reexport para facilitar uso desde `main`)
pub use server::run_server;
