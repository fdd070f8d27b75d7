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
                    .table(Trucks::Table)
                    .if_not_exists()
                    .col(uuid(Trucks::Id).primary_key())
                    .col(uuid(Trucks::OwnerId).not_null())
                    .col(string_len(Trucks::PlateNumber, 32).not_null())
                    .col(string_len_null(Trucks::Brand, 100))
                    .col(string_len_null(Trucks::ModelYear, 8))
                    .col(string_len_null(Trucks::TruckType, 20))
                    .col(string_len_null(Trucks::Capacity, 50))
                    .col(
                        timestamp_with_time_zone(Trucks::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trucks_owner")
                            .from(Trucks::Table, Trucks::OwnerId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubDrivers::Table)
                    .if_not_exists()
                    .col(uuid(SubDrivers::Id).primary_key())
                    .col(uuid(SubDrivers::CarrierId).not_null())
                    .col(string_len(SubDrivers::DriverName, 150).not_null())
                    .col(string_len_null(SubDrivers::DriverPhone, 32))
                    .col(string_len_null(SubDrivers::IdNumber, 50))
                    .col(string_len_null(SubDrivers::LicenseNumber, 50))
                    .col(uuid_null(SubDrivers::AssignedTruckId))
                    .col(
                        timestamp_with_time_zone(SubDrivers::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sub_drivers_carrier")
                            .from(SubDrivers::Table, SubDrivers::CarrierId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sub_drivers_truck")
                            .from(SubDrivers::Table, SubDrivers::AssignedTruckId)
                            .to(Trucks::Table, Trucks::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DriverDetails::Table)
                    .if_not_exists()
                    .col(uuid(DriverDetails::Id).primary_key())
                    .col(uuid(DriverDetails::UserId).not_null().unique_key())
                    .col(string_len_null(DriverDetails::LicenseNumber, 50))
                    .col(string_len_null(DriverDetails::TruckType, 20))
                    .col(boolean(DriverDetails::IsAvailable).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(DriverDetails::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_driver_details_profile")
                            .from(DriverDetails::Table, DriverDetails::UserId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DriverDetails::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubDrivers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Trucks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Trucks {
    Table,
    Id,
    OwnerId,
    PlateNumber,
    Brand,
    ModelYear,
    TruckType,
    Capacity,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SubDrivers {
    Table,
    Id,
    CarrierId,
    DriverName,
    DriverPhone,
    IdNumber,
    LicenseNumber,
    AssignedTruckId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DriverDetails {
    Table,
    Id,
    UserId,
    LicenseNumber,
    TruckType,
    IsAvailable,
    CreatedAt,
}
