//! Tenant database administration handlers.

use crate::error::AppError;
use crate::extractors::CurrentActor;
use crate::repositories::{ColumnDefinition, IndexDefinition};
use crate::response::{
    no_content, success_many, success_many_created, success_many_with_total, success_one, success_one_ok,
};
use crate::service::{CreateTableRequest, RowQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct SchemaParam {
    pub schema: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
    pub name: String,
}

fn non_negative(name: &str, value: &str) -> Result<u32, AppError> {
    value
        .parse()
        .map_err(|_| AppError::Validation(format!("{} must be a non-negative integer", name)))
}

/// `limit`, `offset` and `schema` are paging/scope; every other parameter is an exact-match filter.
fn row_query(params: HashMap<String, String>) -> Result<(Option<String>, RowQuery), AppError> {
    let mut query = RowQuery::default();
    let mut schema = None;
    for (key, value) in params {
        match key.as_str() {
            "limit" => query.limit = Some(non_negative("limit", &value)?),
            "offset" => query.offset = Some(non_negative("offset", &value)?),
            "schema" => schema = Some(value),
            _ => query.filters.push((key, Value::String(value))),
        }
    }
    query.filters.sort_by(|a, b| a.0.cmp(&b.0));
    Ok((schema, query))
}

fn rows_body(value: Value) -> Result<Vec<serde_json::Map<String, Value>>, AppError> {
    let items = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => return Err(AppError::Validation("body must be a JSON object or array of objects".into())),
    };
    items
        .into_iter()
        .map(|v| match v {
            Value::Object(m) => Ok(m),
            _ => Err(AppError::Validation("each row must be a JSON object".into())),
        })
        .collect()
}

pub async fn database_stats(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(project_uuid): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.admin.stats(project_uuid, &actor).await?;
    Ok(success_one_ok(stats))
}

pub async fn list_tables(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(project_uuid): Path<Uuid>,
    Query(params): Query<SchemaParam>,
) -> Result<impl IntoResponse, AppError> {
    let tables = state
        .admin
        .list_tables(project_uuid, &actor, params.schema.as_deref())
        .await?;
    Ok(success_many(tables))
}

pub async fn create_table(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(project_uuid): Path<Uuid>,
    Query(params): Query<SchemaParam>,
    Json(body): Json<CreateTableRequest>,
) -> Result<impl IntoResponse, AppError> {
    let table = state
        .admin
        .create_table(project_uuid, &actor, params.schema.as_deref(), &body)
        .await?;
    Ok(success_one(table))
}

pub async fn rename_table(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, table)): Path<(Uuid, String)>,
    Query(params): Query<SchemaParam>,
    Json(body): Json<RenameBody>,
) -> Result<impl IntoResponse, AppError> {
    let table = state
        .admin
        .rename_table(project_uuid, &actor, params.schema.as_deref(), &table, &body.name)
        .await?;
    Ok(success_one_ok(table))
}

pub async fn drop_table(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, table)): Path<(Uuid, String)>,
    Query(params): Query<SchemaParam>,
) -> Result<impl IntoResponse, AppError> {
    state
        .admin
        .drop_table(project_uuid, &actor, params.schema.as_deref(), &table)
        .await?;
    Ok(no_content())
}

pub async fn list_columns(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, table)): Path<(Uuid, String)>,
    Query(params): Query<SchemaParam>,
) -> Result<impl IntoResponse, AppError> {
    let columns = state
        .admin
        .list_columns(project_uuid, &actor, params.schema.as_deref(), &table)
        .await?;
    Ok(success_many(columns))
}

pub async fn add_columns(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, table)): Path<(Uuid, String)>,
    Query(params): Query<SchemaParam>,
    Json(body): Json<Vec<ColumnDefinition>>,
) -> Result<impl IntoResponse, AppError> {
    let columns = state
        .admin
        .add_columns(project_uuid, &actor, params.schema.as_deref(), &table, &body)
        .await?;
    Ok(success_many_created(columns))
}

pub async fn rename_column(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, table, column)): Path<(Uuid, String, String)>,
    Query(params): Query<SchemaParam>,
    Json(body): Json<RenameBody>,
) -> Result<impl IntoResponse, AppError> {
    let columns = state
        .admin
        .rename_column(project_uuid, &actor, params.schema.as_deref(), &table, &column, &body.name)
        .await?;
    Ok(success_many(columns))
}

pub async fn drop_column(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, table, column)): Path<(Uuid, String, String)>,
    Query(params): Query<SchemaParam>,
) -> Result<impl IntoResponse, AppError> {
    state
        .admin
        .drop_column(project_uuid, &actor, params.schema.as_deref(), &table, &column)
        .await?;
    Ok(no_content())
}

pub async fn list_indexes(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, table)): Path<(Uuid, String)>,
    Query(params): Query<SchemaParam>,
) -> Result<impl IntoResponse, AppError> {
    let indexes = state
        .admin
        .list_indexes(project_uuid, &actor, params.schema.as_deref(), &table)
        .await?;
    Ok(success_many(indexes))
}

pub async fn create_index(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, table)): Path<(Uuid, String)>,
    Query(params): Query<SchemaParam>,
    Json(body): Json<IndexDefinition>,
) -> Result<impl IntoResponse, AppError> {
    let index = state
        .admin
        .create_index(project_uuid, &actor, params.schema.as_deref(), &table, &body)
        .await?;
    Ok(success_one(index))
}

pub async fn drop_index(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, index)): Path<(Uuid, String)>,
    Query(params): Query<SchemaParam>,
) -> Result<impl IntoResponse, AppError> {
    state
        .admin
        .drop_index(project_uuid, &actor, params.schema.as_deref(), &index)
        .await?;
    Ok(no_content())
}

pub async fn list_functions(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, schema)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    let functions = state.admin.list_functions(project_uuid, &actor, &schema).await?;
    Ok(success_many(functions))
}

pub async fn get_function(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, schema, name)): Path<(Uuid, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let function = state.admin.get_function(project_uuid, &actor, &schema, &name).await?;
    Ok(success_one_ok(function))
}

pub async fn list_rows(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, table)): Path<(Uuid, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let (schema, query) = row_query(params)?;
    let page = state
        .admin
        .list_rows(project_uuid, &actor, schema.as_deref(), &table, &query)
        .await?;
    Ok(success_many_with_total(page.rows, page.total))
}

pub async fn insert_rows(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((project_uuid, table)): Path<(Uuid, String)>,
    Query(params): Query<SchemaParam>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let rows = rows_body(body)?;
    let inserted = state
        .admin
        .insert_rows(project_uuid, &actor, params.schema.as_deref(), &table, &rows)
        .await?;
    Ok(success_many_created(inserted))
}
