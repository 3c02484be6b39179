//! Create payment_intents table
//!
//! Gateway orders raised for a booking. Callbacks are matched by order id,
//! webhooks by payment id.

use sea_orm_migration::prelude::*;

use super::m20240101_000002_create_bookings::Bookings;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentIntents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentIntents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentIntents::BookingId).uuid().not_null())
                    .col(
                        ColumnDef::new(PaymentIntents::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentIntents::Currency).string().not_null())
                    .col(
                        ColumnDef::new(PaymentIntents::GatewayOrderId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PaymentIntents::GatewayPaymentId).string())
                    .col(
                        ColumnDef::new(PaymentIntents::Status)
                            .string()
                            .not_null()
                            .default("created"),
                    )
                    .col(ColumnDef::new(PaymentIntents::RefundId).string())
                    .col(
                        ColumnDef::new(PaymentIntents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_intents_booking")
                            .from(PaymentIntents::Table, PaymentIntents::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_intents_booking")
                    .table(PaymentIntents::Table)
                    .col(PaymentIntents::BookingId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_intents_payment")
                    .table(PaymentIntents::Table)
                    .col(PaymentIntents::GatewayPaymentId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentIntents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum PaymentIntents {
    Table,
    Id,
    BookingId,
    Amount,
    Currency,
    GatewayOrderId,
    GatewayPaymentId,
    Status,
    RefundId,
    CreatedAt,
    UpdatedAt,
}
