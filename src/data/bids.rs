use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::now;
use crate::entities::load_bid;
use crate::error::AppResult;
use crate::realtime::{ChangeHub, Table};

/// Driver price offers on loads.
///
/// Bids are recorded and listed only; nothing here awards a bid or changes
/// the load it belongs to.
pub struct BidRepository<'a> {
    db: &'a DatabaseConnection,
    changes: &'a ChangeHub,
}

impl<'a> BidRepository<'a> {
    pub fn new(db: &'a DatabaseConnection, changes: &'a ChangeHub) -> Self {
        Self { db, changes }
    }

    /// Record a bid. A driver may bid on the same load more than once.
    pub async fn submit_bid(
        &self,
        load_id: Uuid,
        driver_id: Uuid,
        price: f64,
        message: Option<String>,
    ) -> AppResult<load_bid::Model> {
        let bid = load_bid::ActiveModel {
            id: Set(Uuid::new_v4()),
            load_id: Set(load_id),
            driver_id: Set(driver_id),
            price: Set(price),
            message: Set(message.filter(|m| !m.trim().is_empty())),
            status: Set("pending".to_string()),
            created_at: Set(now()),
        }
        .insert(self.db)
        .await?;

        self.changes.inserted(Table::LoadBids, bid.id);
        Ok(bid)
    }

    pub async fn get_bids_for_load(&self, load_id: Uuid) -> AppResult<Vec<load_bid::Model>> {
        Ok(load_bid::Entity::find()
            .filter(load_bid::Column::LoadId.eq(load_id))
            .order_by_desc(load_bid::Column::CreatedAt)
            .all(self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loads::{LoadRepository, PostLoad};
    use crate::data::test_support::{seed_user, test_db};
    use crate::entities::{LoadStatus, Role};
    use crate::error::AppError;

    #[tokio::test]
    async fn test_repeat_bids_are_kept_and_load_untouched() {
        let db = test_db().await;
        let changes = ChangeHub::new(16);
        let shipper = seed_user(&db, "Shipper", Role::Shipper).await;
        let driver = seed_user(&db, "Driver", Role::Driver).await;
        let load = LoadRepository::new(&db, &changes)
            .post_load(
                PostLoad {
                    origin: "Riyadh".to_string(),
                    destination: "Tabuk".to_string(),
                    ..Default::default()
                },
                shipper,
            )
            .await
            .unwrap();
        let bids = BidRepository::new(&db, &changes);

        bids.submit_bid(load.id, driver, 900.0, Some("Can load today".to_string()))
            .await
            .unwrap();
        bids.submit_bid(load.id, driver, 850.0, Some("  ".to_string()))
            .await
            .unwrap();

        let listed = bids.get_bids_for_load(load.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|b| b.status == "pending"));
        assert!(listed.iter().any(|b| b.message.is_none()));

        let stored = LoadRepository::new(&db, &changes)
            .find_load(load.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, LoadStatus::Available);
    }

    #[tokio::test]
    async fn test_bid_on_missing_load_is_store_error() {
        let db = test_db().await;
        let changes = ChangeHub::new(16);
        let driver = seed_user(&db, "Driver", Role::Driver).await;

        let result = BidRepository::new(&db, &changes)
            .submit_bid(Uuid::new_v4(), driver, 100.0, None)
            .await;

        assert!(matches!(result, Err(AppError::Store(_))));
    }
}
