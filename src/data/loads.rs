use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProfileSummary, now};
use crate::entities::{BodyType, LoadStatus, TruckType, load, profile};
use crate::error::{AppError, AppResult};
use crate::realtime::{ChangeHub, Table};
use crate::utils::geo::route_distance_km;
use crate::utils::numeric::NumericInput;

/// Fields a shipper fills in when posting a load.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostLoad {
    #[serde(rename = "type")]
    pub load_type: Option<String>,
    pub package_type: Option<String>,
    pub origin: String,
    pub destination: String,
    pub origin_lat: Option<f64>,
    pub origin_lng: Option<f64>,
    pub dest_lat: Option<f64>,
    pub dest_lng: Option<f64>,
    pub pickup_date: Option<NaiveDate>,
    #[serde(default)]
    pub weight: NumericInput,
    #[serde(default)]
    pub price: NumericInput,
    pub distance: Option<f64>,
    pub estimated_time: Option<String>,
    pub description: Option<String>,
    pub truck_type_required: Option<TruckType>,
    pub truck_size: Option<String>,
    pub body_type: Option<BodyType>,
    pub receiver_name: Option<String>,
    pub receiver_phone: Option<String>,
    pub receiver_address: Option<String>,
    /// Accepted for compatibility; new loads always start as available.
    pub status: Option<LoadStatus>,
}

/// A load with its owner's public profile expanded.
#[derive(Debug, Clone, Serialize)]
pub struct LoadWithOwner {
    #[serde(flatten)]
    pub load: load::Model,
    pub owner: Option<ProfileSummary>,
}

impl From<(load::Model, Option<profile::Model>)> for LoadWithOwner {
    fn from((load, owner): (load::Model, Option<profile::Model>)) -> Self {
        Self {
            load,
            owner: owner.map(ProfileSummary::from),
        }
    }
}

pub struct LoadRepository<'a> {
    db: &'a DatabaseConnection,
    changes: &'a ChangeHub,
}

impl<'a> LoadRepository<'a> {
    pub fn new(db: &'a DatabaseConnection, changes: &'a ChangeHub) -> Self {
        Self { db, changes }
    }

    /// Insert a new load owned by `owner_id`.
    ///
    /// Status is forced to available with no driver. Missing distance is
    /// derived from the coordinates when all four are present.
    pub async fn post_load(&self, input: PostLoad, owner_id: Uuid) -> AppResult<load::Model> {
        let distance = input.distance.or_else(|| {
            route_distance_km(
                input.origin_lat,
                input.origin_lng,
                input.dest_lat,
                input.dest_lng,
            )
        });

        let new_load = load::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            driver_id: Set(None),
            load_type: Set(input
                .load_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "general".to_string())),
            package_type: Set(input.package_type),
            origin: Set(input.origin),
            destination: Set(input.destination),
            origin_lat: Set(input.origin_lat),
            origin_lng: Set(input.origin_lng),
            dest_lat: Set(input.dest_lat),
            dest_lng: Set(input.dest_lng),
            pickup_date: Set(input.pickup_date),
            weight: Set(input.weight.coerce()),
            price: Set(input.price.coerce()),
            distance: Set(distance),
            estimated_time: Set(input.estimated_time),
            description: Set(input.description.unwrap_or_default()),
            truck_type_required: Set(input.truck_type_required),
            truck_size: Set(input.truck_size),
            body_type: Set(input.body_type),
            receiver_name: Set(input.receiver_name),
            receiver_phone: Set(input.receiver_phone),
            receiver_address: Set(input.receiver_address),
            status: Set(LoadStatus::Available),
            created_at: Set(now()),
            updated_at: Set(now()),
        };

        let load = new_load.insert(self.db).await?;
        self.changes.inserted(Table::Loads, load.id);
        Ok(load)
    }

    pub async fn find_load(&self, load_id: Uuid) -> AppResult<Option<load::Model>> {
        Ok(load::Entity::find_by_id(load_id).one(self.db).await?)
    }

    /// All available loads with owner profiles, newest first.
    pub async fn get_available_loads(&self) -> AppResult<Vec<LoadWithOwner>> {
        let rows = load::Entity::find()
            .find_also_related(profile::Entity)
            .filter(load::Column::Status.eq(LoadStatus::Available))
            .order_by_desc(load::Column::CreatedAt)
            .all(self.db)
            .await?;

        Ok(rows.into_iter().map(LoadWithOwner::from).collect())
    }

    /// Up to five other available loads from the same owner.
    pub async fn get_other_loads_by_owner(
        &self,
        owner_id: Uuid,
        current_load_id: Uuid,
    ) -> AppResult<Vec<load::Model>> {
        Ok(load::Entity::find()
            .filter(load::Column::OwnerId.eq(owner_id))
            .filter(load::Column::Id.ne(current_load_id))
            .filter(load::Column::Status.eq(LoadStatus::Available))
            .order_by_desc(load::Column::CreatedAt)
            .limit(5)
            .all(self.db)
            .await?)
    }

    /// Loads the user either owns or is driving, newest first.
    pub async fn get_user_loads(&self, user_id: Uuid) -> AppResult<Vec<load::Model>> {
        Ok(load::Entity::find()
            .filter(
                Condition::any()
                    .add(load::Column::OwnerId.eq(user_id))
                    .add(load::Column::DriverId.eq(user_id)),
            )
            .order_by_desc(load::Column::CreatedAt)
            .all(self.db)
            .await?)
    }

    pub async fn get_all_loads(&self) -> AppResult<Vec<LoadWithOwner>> {
        let rows = load::Entity::find()
            .find_also_related(profile::Entity)
            .order_by_desc(load::Column::CreatedAt)
            .all(self.db)
            .await?;

        Ok(rows.into_iter().map(LoadWithOwner::from).collect())
    }

    /// Assign an available load to `driver_id`.
    ///
    /// The update only matches while the load is still available, so of two
    /// racing drivers exactly one wins; the other gets `Conflict`.
    pub async fn accept_load(&self, load_id: Uuid, driver_id: Uuid) -> AppResult<()> {
        let result = load::Entity::update_many()
            .col_expr(load::Column::Status, Expr::value(LoadStatus::InProgress))
            .col_expr(load::Column::DriverId, Expr::value(Some(driver_id)))
            .col_expr(load::Column::UpdatedAt, Expr::value(now()))
            .filter(load::Column::Id.eq(load_id))
            .filter(load::Column::Status.eq(LoadStatus::Available))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(self
                .transition_refused(load_id, "Load is no longer available")
                .await);
        }

        tracing::info!(%load_id, %driver_id, "load accepted");
        self.changes.updated(Table::Loads, load_id);
        Ok(())
    }

    /// Put a load back on the board with no driver.
    pub async fn cancel_load_assignment(&self, load_id: Uuid) -> AppResult<()> {
        let result = load::Entity::update_many()
            .col_expr(load::Column::Status, Expr::value(LoadStatus::Available))
            .col_expr(load::Column::DriverId, Expr::value(Option::<Uuid>::None))
            .col_expr(load::Column::UpdatedAt, Expr::value(now()))
            .filter(load::Column::Id.eq(load_id))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Load not found".to_string()));
        }

        self.changes.updated(Table::Loads, load_id);
        Ok(())
    }

    /// Mark an in-progress load delivered by its assigned driver.
    pub async fn complete_load(&self, load_id: Uuid, driver_id: Uuid) -> AppResult<()> {
        let result = load::Entity::update_many()
            .col_expr(load::Column::Status, Expr::value(LoadStatus::Completed))
            .col_expr(load::Column::UpdatedAt, Expr::value(now()))
            .filter(load::Column::Id.eq(load_id))
            .filter(load::Column::DriverId.eq(driver_id))
            .filter(load::Column::Status.eq(LoadStatus::InProgress))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(self
                .transition_refused(load_id, "Load is not in progress for this driver")
                .await);
        }

        self.changes.updated(Table::Loads, load_id);
        Ok(())
    }

    /// Withdraw an available load from the board.
    pub async fn cancel_load(&self, load_id: Uuid) -> AppResult<()> {
        let result = load::Entity::update_many()
            .col_expr(load::Column::Status, Expr::value(LoadStatus::Cancelled))
            .col_expr(load::Column::UpdatedAt, Expr::value(now()))
            .filter(load::Column::Id.eq(load_id))
            .filter(load::Column::Status.eq(LoadStatus::Available))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(self
                .transition_refused(load_id, "Only available loads can be cancelled")
                .await);
        }

        self.changes.updated(Table::Loads, load_id);
        Ok(())
    }

    /// Hard delete. Deleting a missing load is a no-op; returns rows removed.
    pub async fn delete_load(&self, load_id: Uuid) -> AppResult<u64> {
        let result = load::Entity::delete_by_id(load_id).exec(self.db).await?;

        if result.rows_affected > 0 {
            self.changes.deleted(Table::Loads, load_id);
        }
        Ok(result.rows_affected)
    }

    async fn transition_refused(&self, load_id: Uuid, reason: &str) -> AppError {
        match self.find_load(load_id).await {
            Ok(Some(_)) => AppError::Conflict(reason.to_string()),
            Ok(None) => AppError::NotFound("Load not found".to_string()),
            Err(err) => err,
        }
    }
}
