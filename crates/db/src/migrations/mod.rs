//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_user_table;
mod m20250101_000002_create_notice_type_table;
mod m20250101_000003_create_notice_setting_table;
mod m20250101_000004_create_notice_table;
mod m20250101_000005_create_observation_table;
mod m20250101_000006_create_notice_queue_batch_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_user_table::Migration),
            Box::new(m20250101_000002_create_notice_type_table::Migration),
            Box::new(m20250101_000003_create_notice_setting_table::Migration),
            Box::new(m20250101_000004_create_notice_table::Migration),
            Box::new(m20250101_000005_create_observation_table::Migration),
            Box::new(m20250101_000006_create_notice_queue_batch_table::Migration),
        ]
    }
}
