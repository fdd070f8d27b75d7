use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A driver working under a carrier account without a login of their own.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sub_drivers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub carrier_id: Uuid,
    pub driver_name: String,
    pub driver_phone: Option<String>,
    pub id_number: Option<String>,
    pub license_number: Option<String>,
    pub assigned_truck_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::CarrierId",
        to = "super::profile::Column::Id",
        on_delete = "Cascade"
    )]
    Carrier,
    #[sea_orm(
        belongs_to = "super::truck::Entity",
        from = "Column::AssignedTruckId",
        to = "super::truck::Column::Id",
        on_delete = "SetNull"
    )]
    AssignedTruck,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Carrier.def()
    }
}

impl Related<super::truck::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssignedTruck.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
