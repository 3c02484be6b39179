//! Create reservations table
//!
//! Durable mirror of the slot calendar, keyed by booking. Held rows carry an
//! expiry; committed rows do not.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reservations::BookingId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Reservations::ServiceOfferingId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reservations::EventDate).date().not_null())
                    .col(ColumnDef::new(Reservations::StartTime).time().not_null())
                    .col(
                        ColumnDef::new(Reservations::DurationMinutes)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::State)
                            .string()
                            .not_null()
                            .default("held"),
                    )
                    .col(ColumnDef::new(Reservations::ExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Reservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_event_date")
                    .table(Reservations::Table)
                    .col(Reservations::EventDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reservations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Reservations {
    Table,
    BookingId,
    ServiceOfferingId,
    EventDate,
    StartTime,
    DurationMinutes,
    State,
    ExpiresAt,
    CreatedAt,
}
