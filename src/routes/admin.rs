//! Tenant database administration routes, all scoped by project.

use crate::handlers::admin::{
    add_columns, create_index, create_table, database_stats, drop_column, drop_index, drop_table, get_function,
    insert_rows, list_columns, list_functions, list_indexes, list_rows, list_tables, rename_column, rename_table,
};
use crate::state::AppState;
use axum::{
    routing::{delete, get, patch},
    Router,
};

pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/projects/:project_uuid/stats", get(database_stats))
        .route("/projects/:project_uuid/tables", get(list_tables).post(create_table))
        .route(
            "/projects/:project_uuid/tables/:table",
            patch(rename_table).delete(drop_table),
        )
        .route(
            "/projects/:project_uuid/tables/:table/columns",
            get(list_columns).post(add_columns),
        )
        .route(
            "/projects/:project_uuid/tables/:table/columns/:column",
            patch(rename_column).delete(drop_column),
        )
        .route(
            "/projects/:project_uuid/tables/:table/indexes",
            get(list_indexes).post(create_index),
        )
        .route("/projects/:project_uuid/indexes/:index", delete(drop_index))
        .route(
            "/projects/:project_uuid/tables/:table/rows",
            get(list_rows).post(insert_rows),
        )
        .route("/projects/:project_uuid/functions/:schema", get(list_functions))
        .route("/projects/:project_uuid/functions/:schema/:name", get(get_function))
        .with_state(state)
}
