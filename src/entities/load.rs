use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::truck::TruckType;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl LoadStatus {
    /// Whether a load in this status must carry a driver.
    pub fn requires_driver(self) -> bool {
        matches!(self, LoadStatus::InProgress | LoadStatus::Completed)
    }

    /// Statuses counted as "active" on dashboards.
    pub fn active() -> [LoadStatus; 2] {
        [LoadStatus::Available, LoadStatus::InProgress]
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    #[sea_orm(string_value = "flatbed")]
    Flatbed,
    #[sea_orm(string_value = "curtain")]
    Curtain,
    #[sea_orm(string_value = "box")]
    BoxVan,
    #[sea_orm(string_value = "refrigerated")]
    Refrigerated,
    #[sea_orm(string_value = "lowboy")]
    Lowboy,
    #[sea_orm(string_value = "tank")]
    Tank,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub driver_id: Option<Uuid>,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub load_type: String,
    pub package_type: Option<String>,
    pub origin: String,
    pub destination: String,
    pub origin_lat: Option<f64>,
    pub origin_lng: Option<f64>,
    pub dest_lat: Option<f64>,
    pub dest_lng: Option<f64>,
    pub pickup_date: Option<Date>,
    pub weight: f64,
    pub price: f64,
    pub distance: Option<f64>,
    pub estimated_time: Option<String>,
    pub description: String,
    pub truck_type_required: Option<TruckType>,
    pub truck_size: Option<String>,
    pub body_type: Option<BodyType>,
    pub receiver_name: Option<String>,
    pub receiver_phone: Option<String>,
    pub receiver_address: Option<String>,
    pub status: LoadStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::OwnerId",
        to = "super::profile::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::DriverId",
        to = "super::profile::Column::Id",
        on_delete = "SetNull"
    )]
    Driver,
    #[sea_orm(has_many = "super::load_bid::Entity")]
    Bids,
}

// Expanding a load with `find_also_related(profile::Entity)` yields its owner.
impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::load_bid::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bids.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
