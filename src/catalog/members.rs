//! Organization membership lookups used by the project policy.

use crate::error::{storage, AppError};
use crate::store::catalog_table;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use sqlx::PgPool;
use uuid::Uuid;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn is_organization_member(&self, organization_uuid: Uuid, user_uuid: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone, Debug)]
pub struct PgMembershipStore {
    pool: PgPool,
    table: String,
}

impl PgMembershipStore {
    pub fn new(pool: PgPool, schema: &str) -> Self {
        PgMembershipStore {
            pool,
            table: catalog_table(schema, "organization_members"),
        }
    }
}

#[async_trait]
impl MembershipStore for PgMembershipStore {
    async fn is_organization_member(&self, organization_uuid: Uuid, user_uuid: Uuid) -> Result<bool, AppError> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE organization_uuid = $1 AND user_uuid = $2)",
            self.table
        );
        sqlx::query_scalar::<_, bool>(&sql)
            .bind(organization_uuid)
            .bind(user_uuid)
            .fetch_one(&self.pool)
            .await
            .map_err(storage("fetch", "PgMembershipStore::is_organization_member"))
    }
}
