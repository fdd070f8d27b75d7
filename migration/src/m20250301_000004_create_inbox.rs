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
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(uuid(Notifications::Id).primary_key())
                    .col(uuid(Notifications::UserId).not_null())
                    .col(string_len(Notifications::Title, 255).not_null())
                    .col(text(Notifications::Message).not_null())
                    .col(boolean(Notifications::IsRead).not_null().default(false))
                    .col(
                        timestamp_with_time_zone(Notifications::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_profile")
                            .from(Notifications::Table, Notifications::UserId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SupportTickets::Table)
                    .if_not_exists()
                    .col(uuid(SupportTickets::Id).primary_key())
                    .col(uuid(SupportTickets::UserId).not_null())
                    .col(string_len(SupportTickets::Subject, 255).not_null())
                    .col(text(SupportTickets::Message).not_null())
                    .col(string_len(SupportTickets::Status, 20).not_null().default("open"))
                    .col(string_len(SupportTickets::Priority, 20).not_null().default("normal"))
                    .col(uuid_null(SupportTickets::AssignedTo))
                    .col(
                        timestamp_with_time_zone(SupportTickets::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(SupportTickets::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_support_tickets_profile")
                            .from(SupportTickets::Table, SupportTickets::UserId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SupportTickets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Title,
    Message,
    IsRead,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SupportTickets {
    Table,
    Id,
    UserId,
    Subject,
    Message,
    Status,
    Priority,
    AssignedTo,
    CreatedAt,
    UpdatedAt,
}
