use chrono::Utc;
use sqlx::MySqlPool;

use crate::error::AppError;

/// Best-effort delivery of a message to a portal user.
pub trait Notifier {
    async fn notify(&self, user_id: u64, message: &str) -> Result<(), AppError>;
}

/// Writes notifications to the table the portal's inbox and real-time channel
/// read from.
#[derive(Clone)]
pub struct DbNotifier {
    pool: MySqlPool,
}

impl DbNotifier {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl Notifier for DbNotifier {
    async fn notify(&self, user_id: u64, message: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, message, is_read, created_at)
            VALUES (?, ?, FALSE, ?)
            "#,
        )
        .bind(user_id)
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
