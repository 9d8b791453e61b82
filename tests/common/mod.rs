#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use dairy_forecast::{
    config::AppConfig,
    db::{self, DbPool},
    ml::Observation,
};
use tempfile::TempDir;

/// SQLite database in a temporary directory, migrated and ready to use.
pub struct TestDb {
    pub pool: Arc<DbPool>,
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("forecast_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", path.display()),
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        Self {
            pool: Arc::new(pool),
            _dir: dir,
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// One observation per consecutive day starting at `start`.
pub fn daily(product_id: &str, start: NaiveDate, values: &[f64]) -> Vec<Observation> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| Observation::new(product_id, start + Duration::days(i as i64), *v))
        .collect()
}
