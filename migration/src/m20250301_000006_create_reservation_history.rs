use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000005_create_reservations::{Reservation, ReservationStatus};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReservationHistory::Table)
                    .if_not_exists()
                    .col(uuid(ReservationHistory::Id).primary_key())
                    .col(uuid(ReservationHistory::ReservationId).not_null())
                    .col(ColumnDef::new(ReservationHistory::PreviousStatus).custom(ReservationStatus::Enum).null())
                    .col(
                        ColumnDef::new(ReservationHistory::NewStatus)
                            .custom(ReservationStatus::Enum)
                            .not_null(),
                    )
                    .col(text_null(ReservationHistory::Note))
                    .col(
                        timestamp_with_time_zone(ReservationHistory::ChangedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_history_reservation")
                            .from(ReservationHistory::Table, ReservationHistory::ReservationId)
                            .to(Reservation::Table, Reservation::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReservationHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ReservationHistory {
    Table,
    Id,
    ReservationId,
    PreviousStatus,
    NewStatus,
    Note,
    ChangedAt,
}
