//! Core data models for the rent roll query service

use crate::error::QueryServiceError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Unit Status =================
//

/// Known rent roll status codes. Other codes are stored as-is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnitStatus {
    #[serde(rename = "O")]
    Occupied,
    #[serde(rename = "VU")]
    VacantUnrented,
    #[serde(rename = "VD")]
    VacantDeposit,
}

impl UnitStatus {
    pub fn code(&self) -> &'static str {
        match self {
            UnitStatus::Occupied => "O",
            UnitStatus::VacantUnrented => "VU",
            UnitStatus::VacantDeposit => "VD",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

//
// ================= Unit Records =================
//

/// One stored rent roll row.
///
/// Serialized with the table's column names so typed results and raw SQL
/// results share one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UnitRecord {
    pub id: i64,
    pub unit: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub unit_type: Option<String>,
    #[serde(rename = "sq_ft")]
    #[sqlx(rename = "sq_ft")]
    pub square_feet: i64,
    #[serde(rename = "autobill")]
    #[sqlx(rename = "autobill")]
    pub billed_amount: f64,
    pub deposit: f64,
    #[serde(rename = "moved_in")]
    #[sqlx(rename = "moved_in")]
    pub moved_in_date: Option<String>,
    #[serde(rename = "lease_ends")]
    #[sqlx(rename = "lease_ends")]
    pub lease_end_date: Option<String>,
    pub status: String,
}

/// A row waiting to be inserted (no id yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUnitRecord {
    pub unit: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub unit_type: Option<String>,
    #[serde(rename = "sq_ft", default)]
    pub square_feet: i64,
    #[serde(rename = "autobill")]
    pub billed_amount: f64,
    pub deposit: f64,
    #[serde(rename = "moved_in", default)]
    pub moved_in_date: Option<String>,
    #[serde(rename = "lease_ends", default)]
    pub lease_end_date: Option<String>,
    pub status: String,
}

impl NewUnitRecord {
    /// Reject rows with missing identifiers or negative amounts.
    pub fn validate(&self) -> Result<()> {
        if self.unit.trim().is_empty() {
            return Err(QueryServiceError::ConstraintViolation(
                "unit is required".to_string(),
            ));
        }

        if self.status.trim().is_empty() {
            return Err(QueryServiceError::ConstraintViolation(format!(
                "status is required (unit {})",
                self.unit
            )));
        }

        let negative = [
            ("sq_ft", self.square_feet as f64),
            ("autobill", self.billed_amount),
            ("deposit", self.deposit),
        ]
        .into_iter()
        .find(|(_, value)| value.is_nan() || *value < 0.0);

        if let Some((field, value)) = negative {
            return Err(QueryServiceError::ConstraintViolation(format!(
                "{} must be non-negative (unit {}, got {})",
                field, self.unit, value
            )));
        }

        Ok(())
    }
}

//
// ================= Statistics =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SummaryStatistics {
    pub total_units: i64,
    pub occupied_units: i64,
    pub vacant_units: i64,
    pub total_potential_rent: f64,
    pub total_actual_rent: f64,
    /// None when no unit is occupied
    pub avg_occupied_rent: Option<f64>,
}

impl SummaryStatistics {
    /// Occupied share of all units, in percent.
    pub fn occupancy_rate(&self) -> Option<f64> {
        if self.total_units == 0 {
            None
        } else {
            Some(self.occupied_units as f64 / self.total_units as f64 * 100.0)
        }
    }
}

//
// ================= Financial Rates =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    pub category: String,
    /// Percent
    pub rate: f64,
    /// Percent, mortgage quotes only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apr: Option<f64>,
    pub as_of: String,
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    NaturalLanguage,
    Sql,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryMode::NaturalLanguage => "natural_language",
            QueryMode::Sql => "sql",
        };
        write!(f, "{}", s)
    }
}

/// Payload accepted by every tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub query_type: QueryMode,
    pub query: String,
    /// Bound parameters for `sql` mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<serde_json::Value>,
}

impl ToolRequest {
    pub fn new(query_type: QueryMode, query: impl Into<String>) -> Self {
        Self {
            query_type,
            query: query.into(),
            params: Vec::new(),
        }
    }
}

//
// ================= Routing =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryDomain {
    Financial,
    RentRoll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedResponse {
    pub domain: QueryDomain,
    pub data: serde_json::Value,
}
