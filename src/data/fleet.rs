use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProfileSummary, now};
use crate::entities::{TruckType, driver_details, profile, sub_driver, truck};
use crate::error::AppResult;
use crate::realtime::{ChangeHub, Table};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTruck {
    pub plate_number: String,
    pub brand: Option<String>,
    pub model_year: Option<String>,
    pub truck_type: Option<TruckType>,
    pub capacity: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSubDriver {
    pub driver_name: String,
    pub driver_phone: Option<String>,
    pub id_number: Option<String>,
    pub license_number: Option<String>,
    pub assigned_truck_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverWithProfile {
    #[serde(flatten)]
    pub details: driver_details::Model,
    pub profile: Option<ProfileSummary>,
}

/// Trucks, sub-drivers and driver listings for carriers.
pub struct FleetRepository<'a> {
    db: &'a DatabaseConnection,
    changes: &'a ChangeHub,
}

impl<'a> FleetRepository<'a> {
    pub fn new(db: &'a DatabaseConnection, changes: &'a ChangeHub) -> Self {
        Self { db, changes }
    }

    pub async fn add_truck(&self, input: NewTruck, owner_id: Uuid) -> AppResult<truck::Model> {
        let truck = truck::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            plate_number: Set(input.plate_number),
            brand: Set(input.brand),
            model_year: Set(input.model_year),
            truck_type: Set(input.truck_type),
            capacity: Set(input.capacity),
            created_at: Set(now()),
        }
        .insert(self.db)
        .await?;

        self.changes.inserted(Table::Trucks, truck.id);
        Ok(truck)
    }

    pub async fn get_trucks(&self, owner_id: Uuid) -> AppResult<Vec<truck::Model>> {
        Ok(truck::Entity::find()
            .filter(truck::Column::OwnerId.eq(owner_id))
            .order_by_desc(truck::Column::CreatedAt)
            .all(self.db)
            .await?)
    }

    /// Delete one of the owner's trucks; returns rows removed.
    pub async fn delete_truck(&self, truck_id: Uuid, owner_id: Uuid) -> AppResult<u64> {
        let result = truck::Entity::delete_many()
            .filter(truck::Column::Id.eq(truck_id))
            .filter(truck::Column::OwnerId.eq(owner_id))
            .exec(self.db)
            .await?;

        if result.rows_affected > 0 {
            self.changes.deleted(Table::Trucks, truck_id);
        }
        Ok(result.rows_affected)
    }

    pub async fn add_sub_driver(
        &self,
        input: NewSubDriver,
        carrier_id: Uuid,
    ) -> AppResult<sub_driver::Model> {
        let sub_driver = sub_driver::ActiveModel {
            id: Set(Uuid::new_v4()),
            carrier_id: Set(carrier_id),
            driver_name: Set(input.driver_name),
            driver_phone: Set(input.driver_phone),
            id_number: Set(input.id_number),
            license_number: Set(input.license_number),
            assigned_truck_id: Set(input.assigned_truck_id),
            created_at: Set(now()),
        }
        .insert(self.db)
        .await?;

        self.changes.inserted(Table::SubDrivers, sub_driver.id);
        Ok(sub_driver)
    }

    pub async fn get_sub_drivers(&self, carrier_id: Uuid) -> AppResult<Vec<sub_driver::Model>> {
        Ok(sub_driver::Entity::find()
            .filter(sub_driver::Column::CarrierId.eq(carrier_id))
            .order_by_desc(sub_driver::Column::CreatedAt)
            .all(self.db)
            .await?)
    }

    pub async fn get_all_sub_drivers(&self) -> AppResult<Vec<sub_driver::Model>> {
        Ok(sub_driver::Entity::find()
            .order_by_desc(sub_driver::Column::CreatedAt)
            .all(self.db)
            .await?)
    }

    pub async fn delete_sub_driver(&self, sub_driver_id: Uuid, carrier_id: Uuid) -> AppResult<u64> {
        let result = sub_driver::Entity::delete_many()
            .filter(sub_driver::Column::Id.eq(sub_driver_id))
            .filter(sub_driver::Column::CarrierId.eq(carrier_id))
            .exec(self.db)
            .await?;

        if result.rows_affected > 0 {
            self.changes.deleted(Table::SubDrivers, sub_driver_id);
        }
        Ok(result.rows_affected)
    }

    pub async fn get_driver_details(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<driver_details::Model>> {
        Ok(driver_details::Entity::find()
            .filter(driver_details::Column::UserId.eq(user_id))
            .one(self.db)
            .await?)
    }

    /// Registered drivers with their public profile fields.
    pub async fn get_all_drivers(&self) -> AppResult<Vec<DriverWithProfile>> {
        let rows = driver_details::Entity::find()
            .find_also_related(profile::Entity)
            .order_by_desc(driver_details::Column::CreatedAt)
            .all(self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(details, profile)| DriverWithProfile {
                details,
                profile: profile.map(ProfileSummary::from),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::{seed_user, test_db};
    use crate::entities::Role;

    #[tokio::test]
    async fn test_trucks_are_scoped_to_owner() {
        let db = test_db().await;
        let changes = ChangeHub::new(16);
        let carrier = seed_user(&db, "Carrier", Role::Driver).await;
        let stranger = seed_user(&db, "Stranger", Role::Driver).await;
        let fleet = FleetRepository::new(&db, &changes);

        let truck = fleet
            .add_truck(
                NewTruck {
                    plate_number: "ABC 1234".to_string(),
                    truck_type: Some(TruckType::Flatbed),
                    ..Default::default()
                },
                carrier,
            )
            .await
            .unwrap();

        assert_eq!(fleet.get_trucks(carrier).await.unwrap().len(), 1);
        assert!(fleet.get_trucks(stranger).await.unwrap().is_empty());

        assert_eq!(fleet.delete_truck(truck.id, stranger).await.unwrap(), 0);
        assert_eq!(fleet.delete_truck(truck.id, carrier).await.unwrap(), 1);
        assert!(fleet.get_trucks(carrier).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sub_driver_survives_truck_removal() {
        let db = test_db().await;
        let changes = ChangeHub::new(16);
        let carrier = seed_user(&db, "Carrier", Role::Driver).await;
        let fleet = FleetRepository::new(&db, &changes);
        let truck = fleet
            .add_truck(
                NewTruck {
                    plate_number: "XYZ 42".to_string(),
                    ..Default::default()
                },
                carrier,
            )
            .await
            .unwrap();

        fleet
            .add_sub_driver(
                NewSubDriver {
                    driver_name: "Saleh".to_string(),
                    assigned_truck_id: Some(truck.id),
                    ..Default::default()
                },
                carrier,
            )
            .await
            .unwrap();
        fleet.delete_truck(truck.id, carrier).await.unwrap();

        let drivers = fleet.get_sub_drivers(carrier).await.unwrap();
        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0].assigned_truck_id, None);
        assert_eq!(fleet.get_all_sub_drivers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_drivers_expand_profile() {
        let db = test_db().await;
        let changes = ChangeHub::new(16);
        let driver = seed_user(&db, "Fahad", Role::Driver).await;
        driver_details::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(driver),
            license_number: Set(Some("L-1".to_string())),
            truck_type: Set(Some(TruckType::Lorry)),
            is_available: Set(true),
            created_at: Set(now()),
        }
        .insert(&db)
        .await
        .unwrap();

        let drivers = FleetRepository::new(&db, &changes)
            .get_all_drivers()
            .await
            .unwrap();

        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0].profile.as_ref().unwrap().full_name, "Fahad");
    }
}
