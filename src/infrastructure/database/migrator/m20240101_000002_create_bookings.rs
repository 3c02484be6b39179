//! Create bookings table
//!
//! One row per booking with its status/payment pair and an optimistic-lock
//! `version` column.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_services::Services;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bookings::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Bookings::ServiceOfferingId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::ServiceName).string().not_null())
                    .col(ColumnDef::new(Bookings::CustomerName).string().not_null())
                    .col(ColumnDef::new(Bookings::CustomerEmail).string().not_null())
                    .col(ColumnDef::new(Bookings::CustomerPhone).string().not_null())
                    .col(ColumnDef::new(Bookings::EventDate).date().not_null())
                    .col(ColumnDef::new(Bookings::StartTime).time().not_null())
                    .col(
                        ColumnDef::new(Bookings::DurationMinutes)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::Location).string().not_null())
                    .col(ColumnDef::new(Bookings::EventType).string())
                    .col(ColumnDef::new(Bookings::GuestCount).integer())
                    .col(ColumnDef::new(Bookings::SpecialRequests).text())
                    .col(
                        ColumnDef::new(Bookings::TotalAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::Currency)
                            .string()
                            .not_null()
                            .default("INR"),
                    )
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Bookings::PaymentStatus)
                            .string()
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(ColumnDef::new(Bookings::PaymentReference).string())
                    .col(ColumnDef::new(Bookings::CancelReason).string())
                    .col(ColumnDef::new(Bookings::ActiveIntentId).uuid())
                    .col(ColumnDef::new(Bookings::Notes).text())
                    .col(
                        ColumnDef::new(Bookings::HoldExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_service")
                            .from(Bookings::Table, Bookings::ServiceOfferingId)
                            .to(Services::Table, Services::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_status")
                    .table(Bookings::Table)
                    .col(Bookings::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_event_date")
                    .table(Bookings::Table)
                    .col(Bookings::EventDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Bookings {
    Table,
    Id,
    ServiceOfferingId,
    ServiceName,
    CustomerName,
    CustomerEmail,
    CustomerPhone,
    EventDate,
    StartTime,
    DurationMinutes,
    Location,
    EventType,
    GuestCount,
    SpecialRequests,
    TotalAmount,
    Currency,
    Status,
    PaymentStatus,
    PaymentReference,
    CancelReason,
    ActiveIntentId,
    Notes,
    HoldExpiresAt,
    Version,
    CreatedAt,
    UpdatedAt,
}
