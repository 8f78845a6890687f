use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_restaurants::Restaurant;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Service::Table)
                    .if_not_exists()
                    .col(uuid(Service::Id).primary_key())
                    .col(uuid(Service::RestaurantId).not_null())
                    .col(string_len(Service::Name, 100).not_null())
                    .col(string_len(Service::DayType, 20).not_null())
                    .col(string_len(Service::Season, 20).not_null().default("todo_el_ano"))
                    .col(time(Service::StartTime).not_null())
                    .col(time(Service::EndTime).not_null())
                    .col(string_len(Service::SlotMode, 10).not_null().default("auto"))
                    .col(integer(Service::SlotIntervalMinutes).not_null().default(30))
                    .col(json_binary_null(Service::TimeSlots))
                    .col(json_binary_null(Service::TableIds))
                    .col(boolean(Service::Active).not_null().default(true))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_restaurant")
                            .from(Service::Table, Service::RestaurantId)
                            .to(Restaurant::Table, Restaurant::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One service per restaurant, day type and start time
        manager
            .create_index(
                Index::create()
                    .name("idx_service_restaurant_day_start")
                    .table(Service::Table)
                    .col(Service::RestaurantId)
                    .col(Service::DayType)
                    .col(Service::StartTime)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Service::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Service {
    Table,
    Id,
    RestaurantId,
    Name,
    DayType,
    Season,
    StartTime,
    EndTime,
    SlotMode,
    SlotIntervalMinutes,
    TimeSlots,
    TableIds,
    Active,
}
