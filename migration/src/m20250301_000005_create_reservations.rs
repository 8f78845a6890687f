use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250301_000001_create_restaurants::Restaurant;
use super::m20250301_000002_create_customers::Customer;
use super::m20250301_000003_create_restaurant_tables::RestaurantTable;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(ReservationStatus::Enum)
                    .values([
                        ReservationStatus::Pendiente,
                        ReservationStatus::Confirmado,
                        ReservationStatus::Cancelado,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reservation::Table)
                    .if_not_exists()
                    .col(uuid(Reservation::Id).primary_key())
                    .col(string_len(Reservation::Code, 16).not_null().unique_key())
                    .col(uuid(Reservation::RestaurantId).not_null())
                    .col(uuid(Reservation::CustomerId).not_null())
                    .col(uuid_null(Reservation::TableId))
                    .col(date(Reservation::Date).not_null())
                    .col(time(Reservation::Time).not_null())
                    .col(integer(Reservation::PartySize).not_null())
                    .col(
                        ColumnDef::new(Reservation::Status)
                            .custom(ReservationStatus::Enum)
                            .not_null()
                            .default("PENDIENTE"),
                    )
                    .col(timestamp_with_time_zone_null(Reservation::SessionExpiresAt))
                    .col(text_null(Reservation::SpecialRequests))
                    .col(timestamp_with_time_zone_null(Reservation::ConfirmedAt))
                    .col(timestamp_with_time_zone_null(Reservation::CancelledAt))
                    .col(
                        timestamp_with_time_zone(Reservation::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Reservation::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_restaurant")
                            .from(Reservation::Table, Reservation::RestaurantId)
                            .to(Restaurant::Table, Restaurant::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_customer")
                            .from(Reservation::Table, Reservation::CustomerId)
                            .to(Customer::Table, Customer::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_table")
                            .from(Reservation::Table, Reservation::TableId)
                            .to(RestaurantTable::Table, RestaurantTable::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // The pending queue filters by status and date range
        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_status_date")
                    .table(Reservation::Table)
                    .col(Reservation::Status)
                    .col(Reservation::Date)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reservation::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(ReservationStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Reservation {
    Table,
    Id,
    Code,
    RestaurantId,
    CustomerId,
    TableId,
    Date,
    Time,
    PartySize,
    Status,
    SessionExpiresAt,
    SpecialRequests,
    ConfirmedAt,
    CancelledAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum ReservationStatus {
    #[sea_orm(iden = "reservation_status")]
    Enum,
    #[sea_orm(iden = "PENDIENTE")]
    Pendiente,
    #[sea_orm(iden = "CONFIRMADO")]
    Confirmado,
    #[sea_orm(iden = "CANCELADO")]
    Cancelado,
}
