use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Restaurant::Table)
                    .if_not_exists()
                    .col(uuid(Restaurant::Id).primary_key())
                    .col(string_len(Restaurant::Name, 150).not_null())
                    .col(string_len(Restaurant::Phone, 30).not_null())
                    .col(string_len(Restaurant::Email, 255).not_null())
                    .col(string_len_null(Restaurant::Address, 255))
                    .col(
                        string_len(Restaurant::Timezone, 64)
                            .not_null()
                            .default("Europe/Madrid"),
                    )
                    .col(boolean(Restaurant::Active).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(Restaurant::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Restaurant::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Restaurant {
    Table,
    Id,
    Name,
    Phone,
    Email,
    Address,
    Timezone,
    Active,
    CreatedAt,
}
