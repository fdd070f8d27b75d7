use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_accounts::Profiles;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Loads::Table)
                    .if_not_exists()
                    .col(uuid(Loads::Id).primary_key())
                    .col(uuid(Loads::OwnerId).not_null())
                    .col(uuid_null(Loads::DriverId))
                    .col(string_len(Loads::Type, 50).not_null().default("general"))
                    .col(string_len_null(Loads::PackageType, 50))
                    .col(string_len(Loads::Origin, 255).not_null())
                    .col(string_len(Loads::Destination, 255).not_null())
                    .col(double_null(Loads::OriginLat))
                    .col(double_null(Loads::OriginLng))
                    .col(double_null(Loads::DestLat))
                    .col(double_null(Loads::DestLng))
                    .col(date_null(Loads::PickupDate))
                    .col(double(Loads::Weight).not_null().default(0.0))
                    .col(double(Loads::Price).not_null().default(0.0))
                    .col(double_null(Loads::Distance))
                    .col(string_len_null(Loads::EstimatedTime, 50))
                    .col(text(Loads::Description).not_null().default(""))
                    .col(string_len_null(Loads::TruckTypeRequired, 20))
                    .col(string_len_null(Loads::TruckSize, 50))
                    .col(string_len_null(Loads::BodyType, 20))
                    .col(string_len_null(Loads::ReceiverName, 150))
                    .col(string_len_null(Loads::ReceiverPhone, 32))
                    .col(text_null(Loads::ReceiverAddress))
                    .col(string_len(Loads::Status, 20).not_null().default("available"))
                    .col(
                        timestamp_with_time_zone(Loads::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Loads::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loads_owner")
                            .from(Loads::Table, Loads::OwnerId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loads_driver")
                            .from(Loads::Table, Loads::DriverId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_loads_status_created_at")
                    .table(Loads::Table)
                    .col(Loads::Status)
                    .col(Loads::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LoadBids::Table)
                    .if_not_exists()
                    .col(uuid(LoadBids::Id).primary_key())
                    .col(uuid(LoadBids::LoadId).not_null())
                    .col(uuid(LoadBids::DriverId).not_null())
                    .col(double(LoadBids::Price).not_null())
                    .col(text_null(LoadBids::Message))
                    .col(string_len(LoadBids::Status, 20).not_null().default("pending"))
                    .col(
                        timestamp_with_time_zone(LoadBids::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_load_bids_load")
                            .from(LoadBids::Table, LoadBids::LoadId)
                            .to(Loads::Table, Loads::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_load_bids_driver")
                            .from(LoadBids::Table, LoadBids::DriverId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoadBids::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Loads::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Loads {
    Table,
    Id,
    OwnerId,
    DriverId,
    Type,
    PackageType,
    Origin,
    Destination,
    OriginLat,
    OriginLng,
    DestLat,
    DestLng,
    PickupDate,
    Weight,
    Price,
    Distance,
    EstimatedTime,
    Description,
    TruckTypeRequired,
    TruckSize,
    BodyType,
    ReceiverName,
    ReceiverPhone,
    ReceiverAddress,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LoadBids {
    Table,
    Id,
    LoadId,
    DriverId,
    Price,
    Message,
    Status,
    CreatedAt,
}
