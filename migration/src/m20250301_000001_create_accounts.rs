use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(uuid(Profiles::Id).primary_key())
                    .col(string_len(Profiles::FullName, 150).not_null())
                    .col(string_len_null(Profiles::Email, 255))
                    .col(string_len_null(Profiles::Phone, 32))
                    .col(string_len_null(Profiles::CountryCode, 8))
                    .col(text_null(Profiles::AvatarUrl))
                    .col(
                        timestamp_with_time_zone(Profiles::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Profiles::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Credentials::Table)
                    .if_not_exists()
                    .col(uuid(Credentials::UserId).primary_key())
                    .col(string_len(Credentials::Email, 255).not_null().unique_key())
                    .col(string_len(Credentials::PasswordHash, 255).not_null())
                    .col(
                        timestamp_with_time_zone(Credentials::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credentials_profile")
                            .from(Credentials::Table, Credentials::UserId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserRoles::Table)
                    .if_not_exists()
                    .col(uuid(UserRoles::Id).primary_key())
                    .col(uuid(UserRoles::UserId).not_null().unique_key())
                    .col(string_len(UserRoles::Role, 16).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_roles_profile")
                            .from(UserRoles::Table, UserRoles::UserId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserRoles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Credentials::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Profiles {
    Table,
    Id,
    FullName,
    Email,
    Phone,
    CountryCode,
    AvatarUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Credentials {
    Table,
    UserId,
    Email,
    PasswordHash,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum UserRoles {
    Table,
    Id,
    UserId,
    Role,
}
