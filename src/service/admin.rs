//! Administrative operations on a project's tenant database.
//!
//! Every call resolves the project, checks policy and validates input before a tenant
//! connection is opened.

use super::RequestValidator;
use crate::auth::Actor;
use crate::catalog::ProjectCatalog;
use crate::error::AppError;
use crate::policy::{Action, ProjectPolicy};
use crate::repositories::{
    ColumnDefinition, ColumnInfo, DatabaseStats, FunctionInfo, IndexDefinition, IndexInfo, TableInfo,
    DEFAULT_ROW_LIMIT,
};
use crate::tenant::ClientService;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_SCHEMA: &str = "public";

#[derive(Clone, Debug, Deserialize)]
pub struct CreateTableRequest {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

/// Exact-match filters plus paging for row browsing.
#[derive(Clone, Debug, Default)]
pub struct RowQuery {
    pub filters: Vec<(String, Value)>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RowPage {
    pub rows: Vec<Value>,
    pub total: i64,
}

#[derive(Clone)]
pub struct DatabaseAdminService {
    projects: Arc<dyn ProjectCatalog>,
    policy: ProjectPolicy,
    clients: ClientService,
}

impl DatabaseAdminService {
    pub fn new(projects: Arc<dyn ProjectCatalog>, policy: ProjectPolicy, clients: ClientService) -> Self {
        DatabaseAdminService {
            projects,
            policy,
            clients,
        }
    }

    pub fn clients(&self) -> &ClientService {
        &self.clients
    }

    /// Resolve the tenant database for a project if `actor` may perform `action` on it.
    async fn authorize(
        &self,
        project_uuid: Uuid,
        actor: &Actor,
        action: Action,
        denied: &'static str,
    ) -> Result<String, AppError> {
        let project = self.projects.get_by_uuid(project_uuid).await?;
        if !self.policy.allows(action, project.organization_uuid, actor).await {
            tracing::debug!(project = %project_uuid, actor = %actor.uuid, ?action, "admin operation denied");
            return Err(AppError::Forbidden(denied));
        }
        Ok(project.db_name)
    }

    fn schema(schema: Option<&str>) -> Result<&str, AppError> {
        let schema = schema.unwrap_or(DEFAULT_SCHEMA);
        RequestValidator::identifier("schema", schema)?;
        Ok(schema)
    }

    pub async fn stats(&self, project_uuid: Uuid, actor: &Actor) -> Result<DatabaseStats, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Access, "database_stats.error.forbidden")
            .await?;
        let (stats, _) = self.clients.get_stats_repo(&db, None).await?;
        stats.all().await
    }

    pub async fn list_tables(&self, project_uuid: Uuid, actor: &Actor, schema: Option<&str>) -> Result<Vec<TableInfo>, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Access, "table.error.listForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        let (tables, _) = self.clients.get_table_repo(&db, None).await?;
        tables.list(schema).await
    }

    pub async fn create_table(
        &self,
        project_uuid: Uuid,
        actor: &Actor,
        schema: Option<&str>,
        request: &CreateTableRequest,
    ) -> Result<TableInfo, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Create, "table.error.createForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        RequestValidator::identifier("table name", &request.name)?;
        RequestValidator::columns(&request.columns)?;

        let (tables, _) = self.clients.get_table_repo(&db, None).await?;
        if tables.exists(schema, &request.name).await? {
            return Err(AppError::BadRequest("table.error.alreadyExists"));
        }
        let table = tables.create(schema, &request.name, &request.columns).await?;
        tracing::info!(project = %project_uuid, table = %request.name, "table created");
        Ok(table)
    }

    pub async fn rename_table(
        &self,
        project_uuid: Uuid,
        actor: &Actor,
        schema: Option<&str>,
        table: &str,
        new_name: &str,
    ) -> Result<TableInfo, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Update, "table.error.updateForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        RequestValidator::identifier("table name", table)?;
        RequestValidator::identifier("new table name", new_name)?;

        let (tables, _) = self.clients.get_table_repo(&db, None).await?;
        if !tables.exists(schema, table).await? {
            return Err(AppError::NotFound("table.error.notFound"));
        }
        if tables.exists(schema, new_name).await? {
            return Err(AppError::BadRequest("table.error.alreadyExists"));
        }
        tables.rename(schema, table, new_name).await
    }

    pub async fn drop_table(&self, project_uuid: Uuid, actor: &Actor, schema: Option<&str>, table: &str) -> Result<(), AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Create, "table.error.deleteForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        RequestValidator::identifier("table name", table)?;

        let (tables, _) = self.clients.get_table_repo(&db, None).await?;
        if !tables.exists(schema, table).await? {
            return Err(AppError::NotFound("table.error.notFound"));
        }
        tables.drop(schema, table).await?;
        tracing::info!(project = %project_uuid, %table, "table dropped");
        Ok(())
    }

    pub async fn list_columns(
        &self,
        project_uuid: Uuid,
        actor: &Actor,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<ColumnInfo>, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Access, "table.error.listForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        RequestValidator::identifier("table name", table)?;

        let (tables, conn) = self.clients.get_table_repo(&db, None).await?;
        if !tables.exists(schema, table).await? {
            return Err(AppError::NotFound("table.error.notFound"));
        }
        let (columns, _) = self.clients.get_column_repo(&db, Some(conn)).await?;
        columns.list(schema, table).await
    }

    /// Add columns in one transaction. Fails without changes when any of them already exists.
    pub async fn add_columns(
        &self,
        project_uuid: Uuid,
        actor: &Actor,
        schema: Option<&str>,
        table: &str,
        definitions: &[ColumnDefinition],
    ) -> Result<Vec<ColumnInfo>, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Create, "column.error.createForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        RequestValidator::identifier("table name", table)?;
        RequestValidator::columns(definitions)?;

        let (tables, conn) = self.clients.get_table_repo(&db, None).await?;
        if !tables.exists(schema, table).await? {
            return Err(AppError::NotFound("table.error.notFound"));
        }
        let (columns, _) = self.clients.get_column_repo(&db, Some(conn)).await?;
        let names: Vec<String> = definitions.iter().map(|c| c.name.clone()).collect();
        if columns.has_any(schema, table, &names).await? {
            return Err(AppError::BadRequest("column.error.someAlreadyExist"));
        }
        columns.add(schema, table, definitions).await
    }

    pub async fn rename_column(
        &self,
        project_uuid: Uuid,
        actor: &Actor,
        schema: Option<&str>,
        table: &str,
        column: &str,
        new_name: &str,
    ) -> Result<Vec<ColumnInfo>, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Update, "column.error.updateForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        RequestValidator::identifier("table name", table)?;
        RequestValidator::identifier("column name", column)?;
        RequestValidator::identifier("new column name", new_name)?;

        let (columns, _) = self.clients.get_column_repo(&db, None).await?;
        if !columns.has(schema, table, column).await? {
            return Err(AppError::NotFound("column.error.notFound"));
        }
        if columns.has(schema, table, new_name).await? {
            return Err(AppError::BadRequest("column.error.someAlreadyExist"));
        }
        columns.rename(schema, table, column, new_name).await?;
        columns.list(schema, table).await
    }

    pub async fn drop_column(
        &self,
        project_uuid: Uuid,
        actor: &Actor,
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> Result<(), AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Create, "column.error.deleteForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        RequestValidator::identifier("table name", table)?;
        RequestValidator::identifier("column name", column)?;

        let (columns, _) = self.clients.get_column_repo(&db, None).await?;
        if !columns.has(schema, table, column).await? {
            return Err(AppError::NotFound("column.error.notFound"));
        }
        columns.drop(schema, table, column).await
    }

    pub async fn list_indexes(
        &self,
        project_uuid: Uuid,
        actor: &Actor,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<IndexInfo>, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Access, "table.error.listForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        RequestValidator::identifier("table name", table)?;

        let (tables, conn) = self.clients.get_table_repo(&db, None).await?;
        if !tables.exists(schema, table).await? {
            return Err(AppError::NotFound("table.error.notFound"));
        }
        let (indexes, _) = self.clients.get_index_repo(&db, Some(conn)).await?;
        indexes.list(schema, table).await
    }

    pub async fn create_index(
        &self,
        project_uuid: Uuid,
        actor: &Actor,
        schema: Option<&str>,
        table: &str,
        definition: &IndexDefinition,
    ) -> Result<IndexInfo, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Create, "index.error.createForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        RequestValidator::identifier("table name", table)?;
        RequestValidator::index(definition)?;

        let (indexes, conn) = self.clients.get_index_repo(&db, None).await?;
        if indexes.has(schema, &definition.name).await? {
            return Err(AppError::BadRequest("index.error.alreadyExists"));
        }
        let (columns, _) = self.clients.get_column_repo(&db, Some(conn)).await?;
        if !columns.has_all(schema, table, &definition.columns).await? {
            return Err(AppError::NotFound("column.error.notFound"));
        }
        indexes.create(schema, table, definition).await
    }

    pub async fn drop_index(&self, project_uuid: Uuid, actor: &Actor, schema: Option<&str>, index: &str) -> Result<(), AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Create, "index.error.deleteForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        RequestValidator::identifier("index name", index)?;

        let (indexes, _) = self.clients.get_index_repo(&db, None).await?;
        if !indexes.has(schema, index).await? {
            return Err(AppError::NotFound("index.error.notFound"));
        }
        indexes.drop(schema, index).await
    }

    pub async fn list_functions(&self, project_uuid: Uuid, actor: &Actor, schema: &str) -> Result<Vec<FunctionInfo>, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Access, "function.error.listForbidden")
            .await?;
        RequestValidator::identifier("schema", schema)?;
        let (functions, _) = self.clients.get_function_repo(&db, None).await?;
        functions.list(schema).await
    }

    pub async fn get_function(
        &self,
        project_uuid: Uuid,
        actor: &Actor,
        schema: &str,
        name: &str,
    ) -> Result<FunctionInfo, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Access, "function.error.listForbidden")
            .await?;
        RequestValidator::identifier("schema", schema)?;
        RequestValidator::identifier("function name", name)?;
        let (functions, _) = self.clients.get_function_repo(&db, None).await?;
        functions.get(schema, name).await
    }

    pub async fn list_rows(
        &self,
        project_uuid: Uuid,
        actor: &Actor,
        schema: Option<&str>,
        table: &str,
        query: &RowQuery,
    ) -> Result<RowPage, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Access, "row.error.listForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        RequestValidator::identifier("table name", table)?;

        let (rows, _) = self.clients.get_row_repo(&db, None).await?;
        let total = rows.count(schema, table, &query.filters).await?;
        let page = rows
            .list(
                schema,
                table,
                &query.filters,
                query.limit.unwrap_or(DEFAULT_ROW_LIMIT),
                query.offset.unwrap_or(0),
            )
            .await?;
        Ok(RowPage { rows: page, total })
    }

    pub async fn insert_rows(
        &self,
        project_uuid: Uuid,
        actor: &Actor,
        schema: Option<&str>,
        table: &str,
        rows: &[Map<String, Value>],
    ) -> Result<Vec<Value>, AppError> {
        let db = self
            .authorize(project_uuid, actor, Action::Create, "row.error.createForbidden")
            .await?;
        let schema = Self::schema(schema)?;
        RequestValidator::identifier("table name", table)?;

        let (repo, _) = self.clients.get_row_repo(&db, None).await?;
        let inserted = repo.insert_many(schema, table, rows).await?;
        tracing::info!(project = %project_uuid, %table, count = inserted.len(), "rows inserted");
        Ok(inserted)
    }
}
