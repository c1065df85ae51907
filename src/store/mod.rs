//! Rent roll row store
//!
//! A single persisted table of unit records. Rows are bulk-loaded once at
//! startup and read concurrently afterwards.

use crate::models::{NewUnitRecord, SummaryStatistics, UnitRecord};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

pub mod guard;
pub mod sqlite;

pub use sqlite::SqliteRentRollStore;

/// Numeric columns that threshold queries may filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdField {
    BilledAmount,
}

impl ThresholdField {
    pub fn column(&self) -> &'static str {
        match self {
            ThresholdField::BilledAmount => "autobill",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    GreaterThan,
    LessThan,
}

impl Comparator {
    pub fn operator(&self) -> &'static str {
        match self {
            Comparator::GreaterThan => ">",
            Comparator::LessThan => "<",
        }
    }
}

/// Trait for rent roll persistence.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait RentRollStore: Send + Sync {
    /// Resolves once the schema and indexes exist.
    async fn ready(&self) -> Result<()>;

    async fn insert(&self, record: &NewUnitRecord) -> Result<i64>;

    async fn find_all(&self, limit: u32) -> Result<Vec<UnitRecord>>;

    async fn find_by_status(&self, status: &str) -> Result<Vec<UnitRecord>>;

    async fn find_by_unit(&self, unit: &str) -> Result<Vec<UnitRecord>>;

    async fn find_by_threshold(
        &self,
        field: ThresholdField,
        comparator: Comparator,
        value: f64,
    ) -> Result<Vec<UnitRecord>>;

    /// Substring match of `/<year>` against `lease_ends`. Not calendar
    /// aware: any date string containing `/2025` matches year 2025.
    async fn find_lease_expiring_in_year(&self, year: i32) -> Result<Vec<UnitRecord>>;

    async fn summary_statistics(&self) -> Result<SummaryStatistics>;

    async fn unit_count(&self) -> Result<i64>;

    /// Read-only escape hatch for literal SQL.
    async fn execute_raw(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>>;
}
