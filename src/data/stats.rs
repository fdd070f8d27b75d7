use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{LoadStatus, Role, load, profile, user_role};
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriverStats {
    pub active_loads: u64,
    pub completed_trips: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShipperStats {
    pub active_loads: u64,
    pub completed_trips: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_drivers: u64,
    pub total_shippers: u64,
    pub active_loads: u64,
    pub completed_trips: u64,
}

/// Dashboard counters. Every figure is a count-only query; no rows are
/// materialized and an empty table counts as zero.
pub struct StatsRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> StatsRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_driver_stats(&self, user_id: Uuid) -> AppResult<DriverStats> {
        let active_loads = load::Entity::find()
            .filter(load::Column::DriverId.eq(user_id))
            .filter(load::Column::Status.eq(LoadStatus::InProgress))
            .count(self.db)
            .await?;
        let completed_trips = load::Entity::find()
            .filter(load::Column::DriverId.eq(user_id))
            .filter(load::Column::Status.eq(LoadStatus::Completed))
            .count(self.db)
            .await?;

        Ok(DriverStats {
            active_loads,
            completed_trips,
        })
    }

    pub async fn get_shipper_stats(&self, user_id: Uuid) -> AppResult<ShipperStats> {
        let active_loads = load::Entity::find()
            .filter(load::Column::OwnerId.eq(user_id))
            .filter(load::Column::Status.is_in(LoadStatus::active()))
            .count(self.db)
            .await?;
        let completed_trips = load::Entity::find()
            .filter(load::Column::OwnerId.eq(user_id))
            .filter(load::Column::Status.eq(LoadStatus::Completed))
            .count(self.db)
            .await?;

        Ok(ShipperStats {
            active_loads,
            completed_trips,
        })
    }

    pub async fn get_admin_stats(&self) -> AppResult<AdminStats> {
        let total_users = profile::Entity::find().count(self.db).await?;
        let total_drivers = self.count_role(Role::Driver).await?;
        let total_shippers = self.count_role(Role::Shipper).await?;
        let active_loads = load::Entity::find()
            .filter(load::Column::Status.is_in(LoadStatus::active()))
            .count(self.db)
            .await?;
        let completed_trips = load::Entity::find()
            .filter(load::Column::Status.eq(LoadStatus::Completed))
            .count(self.db)
            .await?;

        Ok(AdminStats {
            total_users,
            total_drivers,
            total_shippers,
            active_loads,
            completed_trips,
        })
    }

    async fn count_role(&self, role: Role) -> AppResult<u64> {
        Ok(user_role::Entity::find()
            .filter(user_role::Column::Role.eq(role))
            .count(self.db)
            .await?)
    }
}
