pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::commands::AppState;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::services::clock::SystemClock;

const DATABASE_FILE: &str = "studyplan.sqlite";

/// Opens (or creates) the planner store under `data_dir`, installs logging into
/// `data_dir/logs` and wires every service against the local wall clock.
pub fn bootstrap(data_dir: &Path) -> AppResult<AppState> {
    std::fs::create_dir_all(data_dir)?;
    crate::utils::logger::init_logging(&data_dir.join("logs"))?;

    let pool = DbPool::new(data_dir.join(DATABASE_FILE))?;
    info!(target: "app::db", path = %pool.path().display(), "planner store opened");

    Ok(AppState::new(pool, Arc::new(SystemClock)))
}
