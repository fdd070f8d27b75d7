use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::Expr,
};
use uuid::Uuid;

use super::now;
use crate::entities::notification;
use crate::error::AppResult;
use crate::realtime::{ChangeHub, Table};

pub struct NotificationRepository<'a> {
    db: &'a DatabaseConnection,
    changes: &'a ChangeHub,
}

impl<'a> NotificationRepository<'a> {
    pub fn new(db: &'a DatabaseConnection, changes: &'a ChangeHub) -> Self {
        Self { db, changes }
    }

    pub async fn get_notifications(&self, user_id: Uuid) -> AppResult<Vec<notification::Model>> {
        Ok(notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .all(self.db)
            .await?)
    }

    pub async fn send_notification(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
    ) -> AppResult<notification::Model> {
        let notification = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            title: Set(title.to_string()),
            message: Set(message.to_string()),
            is_read: Set(false),
            created_at: Set(now()),
        }
        .insert(self.db)
        .await?;

        self.changes.inserted(Table::Notifications, notification.id);
        Ok(notification)
    }

    /// Flag every unread notification of the user as read.
    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db)
            .await?;

        if result.rows_affected > 0 {
            // Bulk update: the event carries the owning user id
            self.changes.updated(Table::Notifications, user_id);
        }
        Ok(result.rows_affected)
    }

    /// Send a notification without failing the caller.
    pub async fn notify_best_effort(&self, user_id: Uuid, title: &str, message: &str) {
        if let Err(err) = self.send_notification(user_id, title, message).await {
            tracing::warn!(%user_id, error = %err, "failed to send notification");
        }
    }

    pub async fn mark_read_best_effort(&self, user_id: Uuid) {
        if let Err(err) = self.mark_all_read(user_id).await {
            tracing::warn!(%user_id, error = %err, "failed to mark notifications read");
        }
    }
}
