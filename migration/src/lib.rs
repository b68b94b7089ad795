pub use sea_orm_migration::prelude::*;

mod m20250114_093000_create_schema_and_base_db_setup;
mod m20250114_094500_base_migration;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250114_093000_create_schema_and_base_db_setup::Migration),
            Box::new(m20250114_094500_base_migration::Migration),
        ]
    }
}
