//! OpenTelemetry instruments for migration runs
//!
//! Instruments are created on the global meter provider; installing an
//! exporter is up to the application.

use crate::migration::MigrationDirection;
use once_cell::sync::Lazy;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
    KeyValue,
};
use std::time::Duration;

pub static METRICS: Lazy<MigrationMetrics> = Lazy::new(MigrationMetrics::init);

pub struct MigrationMetrics {
    pub migrations_total: Counter<u64>,
    pub migration_duration: Histogram<f64>,
}

impl MigrationMetrics {
    pub fn init() -> Self {
        let meter = global::meter("any-migrate");

        let migrations_total = meter
            .u64_counter("any_migrate_migrations_total")
            .with_description("Migrations run, by direction and outcome")
            .build();

        let migration_duration = meter
            .f64_histogram("any_migrate_migration_duration_seconds")
            .with_description("Time spent driving one migration through its states")
            .build();

        Self {
            migrations_total,
            migration_duration,
        }
    }

    /// Record one finished migration; `outcome` is `completed` or the failed state name
    pub fn record_migration(
        &self,
        direction: MigrationDirection,
        outcome: &'static str,
        elapsed: Duration,
    ) {
        self.migrations_total.add(
            1,
            &[
                KeyValue::new("direction", direction.as_str()),
                KeyValue::new("outcome", outcome),
            ],
        );
        self.migration_duration.record(
            elapsed.as_secs_f64(),
            &[KeyValue::new("direction", direction.as_str())],
        );
    }
}
