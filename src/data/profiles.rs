use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::now;
use crate::entities::{Role, profile, user_role};
use crate::error::{AppError, AppResult};
use crate::realtime::{ChangeHub, Table};

/// Self-service profile edits. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub country_code: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserWithRole {
    #[serde(flatten)]
    pub profile: profile::Model,
    pub role: Option<Role>,
}

pub struct ProfileRepository<'a> {
    db: &'a DatabaseConnection,
    changes: &'a ChangeHub,
}

impl<'a> ProfileRepository<'a> {
    pub fn new(db: &'a DatabaseConnection, changes: &'a ChangeHub) -> Self {
        Self { db, changes }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<Option<profile::Model>> {
        Ok(profile::Entity::find_by_id(user_id).one(self.db).await?)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        edits: ProfileChanges,
    ) -> AppResult<profile::Model> {
        let profile = self
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

        let mut active: profile::ActiveModel = profile.into();
        if let Some(full_name) = edits.full_name {
            active.full_name = Set(full_name);
        }
        if let Some(phone) = edits.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(country_code) = edits.country_code {
            active.country_code = Set(Some(country_code));
        }
        if let Some(avatar_url) = edits.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        active.updated_at = Set(now());

        let updated = active.update(self.db).await?;
        self.changes.updated(Table::Profiles, user_id);
        Ok(updated)
    }

    /// The user's role, if one was recorded.
    pub async fn get_role(&self, user_id: Uuid) -> AppResult<Option<Role>> {
        Ok(user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .one(self.db)
            .await?
            .map(|r| r.role))
    }

    /// Every profile with its role, newest first.
    pub async fn get_all_users(&self) -> AppResult<Vec<UserWithRole>> {
        let rows = profile::Entity::find()
            .find_also_related(user_role::Entity)
            .order_by_desc(profile::Column::CreatedAt)
            .all(self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(profile, role)| UserWithRole {
                profile,
                role: role.map(|r| r.role),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::{seed_user, test_db};

    #[tokio::test]
    async fn test_update_profile_touches_only_given_fields() {
        let db = test_db().await;
        let changes = ChangeHub::new(16);
        let user = seed_user(&db, "Old Name", Role::Shipper).await;
        let repo = ProfileRepository::new(&db, &changes);

        let updated = repo
            .update_profile(
                user,
                ProfileChanges {
                    full_name: Some("New Name".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.full_name, "New Name");
        assert_eq!(updated.phone.as_deref(), Some("0500000000"));
    }

    #[tokio::test]
    async fn test_update_missing_profile_is_not_found() {
        let db = test_db().await;
        let changes = ChangeHub::new(16);

        let result = ProfileRepository::new(&db, &changes)
            .update_profile(Uuid::new_v4(), ProfileChanges::default())
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_role_lookup_and_user_listing() {
        let db = test_db().await;
        let changes = ChangeHub::new(16);
        let driver = seed_user(&db, "Driver", Role::Driver).await;
        seed_user(&db, "Shipper", Role::Shipper).await;
        let repo = ProfileRepository::new(&db, &changes);

        assert_eq!(repo.get_role(driver).await.unwrap(), Some(Role::Driver));
        assert_eq!(repo.get_role(Uuid::new_v4()).await.unwrap(), None);

        let users = repo.get_all_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.role.is_some()));
    }
}
