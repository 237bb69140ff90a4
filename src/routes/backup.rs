//! Backup routes.

use crate::handlers::backup::{create_backup, delete_backup, get_backup, list_backups};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn backup_routes(state: AppState) -> Router {
    Router::new()
        .route("/projects/:project_uuid/backups", get(list_backups).post(create_backup))
        .route("/backups/:backup_uuid", get(get_backup).delete(delete_backup))
        .with_state(state)
}
