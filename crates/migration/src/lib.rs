pub use sea_orm_migration::prelude::*;

mod m20260601_120000_families;
mod m20260601_121500_members;
mod m20260608_100000_transactions;
mod m20260615_110000_budget_limits;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260601_120000_families::Migration),
            Box::new(m20260601_121500_members::Migration),
            Box::new(m20260608_100000_transactions::Migration),
            Box::new(m20260615_110000_budget_limits::Migration),
        ]
    }
}
