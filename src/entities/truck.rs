use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum TruckType {
    #[sea_orm(string_value = "trella")]
    Trella,
    #[sea_orm(string_value = "lorry")]
    Lorry,
    #[sea_orm(string_value = "dyna")]
    Dyna,
    #[sea_orm(string_value = "pickup")]
    Pickup,
    #[sea_orm(string_value = "refrigerated")]
    Refrigerated,
    #[sea_orm(string_value = "tanker")]
    Tanker,
    #[sea_orm(string_value = "flatbed")]
    Flatbed,
    #[sea_orm(string_value = "container")]
    Container,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trucks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub plate_number: String,
    pub brand: Option<String>,
    pub model_year: Option<String>,
    pub truck_type: Option<TruckType>,
    pub capacity: Option<String>,
    pub created_at: DateTimeWithTimeZone,
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
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
