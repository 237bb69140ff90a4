//! Backup handlers.

use crate::error::AppError;
use crate::extractors::CurrentActor;
use crate::response::{accepted, success_many, success_one, success_one_ok};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_backups(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(project_uuid): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let backups = state.backups.list(project_uuid, &actor).await?;
    Ok(success_many(backups))
}

pub async fn create_backup(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(project_uuid): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let backup = state.backups.create(project_uuid, &actor).await?;
    Ok(success_one(backup))
}

pub async fn get_backup(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(backup_uuid): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let backup = state.backups.get_by_uuid(backup_uuid, &actor).await?;
    Ok(success_one_ok(backup))
}

pub async fn delete_backup(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(backup_uuid): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.backups.delete(backup_uuid, &actor).await?;
    Ok(accepted())
}
