pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_restaurants;
mod m20250301_000002_create_customers;
mod m20250301_000003_create_restaurant_tables;
mod m20250301_000004_create_services;
mod m20250301_000005_create_reservations;
mod m20250301_000006_create_reservation_history;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_restaurants::Migration),
            Box::new(m20250301_000002_create_customers::Migration),
            Box::new(m20250301_000003_create_restaurant_tables::Migration),
            Box::new(m20250301_000004_create_services::Migration),
            Box::new(m20250301_000005_create_reservations::Migration),
            Box::new(m20250301_000006_create_reservation_history::Migration),
        ]
    }
}
