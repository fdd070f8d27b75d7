pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_accounts;
mod m20250301_000002_create_loads;
mod m20250301_000003_create_fleet;
mod m20250301_000004_create_inbox;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_accounts::Migration),
            Box::new(m20250301_000002_create_loads::Migration),
            Box::new(m20250301_000003_create_fleet::Migration),
            Box::new(m20250301_000004_create_inbox::Migration),
        ]
    }
}
