//! Repository for the `users` table.

use sqlx::PgPool;
use trialgate_core::types::DbId;

use crate::models::user::User;

const COLUMNS: &str = "id, organization_id, email, display_name, role, created_at";

pub struct UserRepo;

impl UserRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
