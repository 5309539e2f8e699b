pub use sea_orm_migration::prelude::*;

mod m20261018_000001_create_enum_types;
mod m20261018_000002_create_customers_and_orders;
mod m20261018_000003_create_rewards_segments_plans;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261018_000001_create_enum_types::Migration),
            Box::new(m20261018_000002_create_customers_and_orders::Migration),
            Box::new(m20261018_000003_create_rewards_segments_plans::Migration),
        ]
    }
}
