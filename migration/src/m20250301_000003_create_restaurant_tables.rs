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
                    .table(RestaurantTable::Table)
                    .if_not_exists()
                    .col(uuid(RestaurantTable::Id).primary_key())
                    .col(uuid(RestaurantTable::RestaurantId).not_null())
                    .col(string_len(RestaurantTable::Name, 50).not_null())
                    .col(integer(RestaurantTable::Capacity).not_null())
                    .col(double(RestaurantTable::PosX).not_null().default(0.0))
                    .col(double(RestaurantTable::PosY).not_null().default(0.0))
                    .col(double(RestaurantTable::Width).not_null().default(60.0))
                    .col(double(RestaurantTable::Height).not_null().default(60.0))
                    .col(string_len(RestaurantTable::Shape, 10).not_null().default("rect"))
                    .col(boolean(RestaurantTable::Reservable).not_null().default(true))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_restaurant_table_restaurant")
                            .from(RestaurantTable::Table, RestaurantTable::RestaurantId)
                            .to(Restaurant::Table, Restaurant::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_restaurant_table_name")
                    .table(RestaurantTable::Table)
                    .col(RestaurantTable::RestaurantId)
                    .col(RestaurantTable::Name)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RestaurantTable::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum RestaurantTable {
    Table,
    Id,
    RestaurantId,
    Name,
    Capacity,
    PosX,
    PosY,
    Width,
    Height,
    Shape,
    Reservable,
}
