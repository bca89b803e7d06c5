//! Per-user capability grants.

use async_trait::async_trait;
use forum_core::permissions::Permissions;
use forum_core::types::DbId;

use super::PgDb;
use crate::error::StoreError;
use crate::store::PermissionStore;

#[async_trait]
impl PermissionStore for PgDb {
    async fn get_all_for_user(&self, user_id: DbId) -> Result<Permissions, StoreError> {
        let codes = self
            .timed(
                sqlx::query_scalar::<_, String>(
                    "SELECT permissions.code FROM permissions
                     INNER JOIN users_permissions ON users_permissions.permission_id = permissions.id
                     WHERE users_permissions.user_id = $1",
                )
                .bind(user_id)
                .fetch_all(self.pool()),
            )
            .await?;
        Ok(codes.into_iter().collect())
    }

    async fn add_for_user(&self, user_id: DbId, codes: &[&str]) -> Result<(), StoreError> {
        let codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        self.timed(
            sqlx::query(
                "INSERT INTO users_permissions (user_id, permission_id)
                 SELECT $1, permissions.id FROM permissions WHERE permissions.code = ANY($2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(codes)
            .execute(self.pool()),
        )
        .await?;
        Ok(())
    }
}
