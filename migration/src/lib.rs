pub use sea_orm_migration::prelude::*;

mod m20241001_000001_create_tables;
mod m20241015_000001_add_claimed_rewards_to_tasks;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241001_000001_create_tables::Migration),
            Box::new(m20241015_000001_add_claimed_rewards_to_tasks::Migration),
        ]
    }
}
