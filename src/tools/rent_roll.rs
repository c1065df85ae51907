//! Rent roll query tool
//!
//! Natural-language questions are classified into a `QueryIntent` and run
//! against the store; `sql` requests go straight to the raw read-only path.

use super::Tool;
use crate::classifier::{IntentClassifier, QueryIntent, RENT_ROLL_EXAMPLES};
use crate::models::{QueryMode, ToolRequest};
use crate::store::{Comparator, RentRollStore, ThresholdField};
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Rows included with the help response
const SAMPLE_ROWS: u32 = 5;

pub struct RentRollTool {
    store: Arc<dyn RentRollStore>,
}

impl RentRollTool {
    pub const NAME: &'static str = "rent_roll_query";

    pub fn new(store: Arc<dyn RentRollStore>) -> Self {
        Self { store }
    }

    /// Run an already-classified intent
    pub async fn execute(&self, intent: QueryIntent) -> Result<Value> {
        let rows = match intent {
            QueryIntent::StatusFilter { status } => {
                self.store.find_by_status(status.code()).await?
            }
            QueryIntent::UnitLookup { unit } => self.store.find_by_unit(&unit).await?,
            QueryIntent::RentAbove { amount } => {
                self.store
                    .find_by_threshold(ThresholdField::BilledAmount, Comparator::GreaterThan, amount)
                    .await?
            }
            QueryIntent::RentBelow { amount } => {
                self.store
                    .find_by_threshold(ThresholdField::BilledAmount, Comparator::LessThan, amount)
                    .await?
            }
            QueryIntent::LeaseExpiring { year } => {
                self.store.find_lease_expiring_in_year(year).await?
            }
            QueryIntent::SummaryStats => {
                let stats = self.store.summary_statistics().await?;
                return Ok(serde_json::to_value(stats)?);
            }
            QueryIntent::RawSql { sql, params } => {
                let rows = self.store.execute_raw(&sql, &params).await?;
                return Ok(Value::Array(rows));
            }
            QueryIntent::Unrecognized { message } => {
                let sample = self.store.find_all(SAMPLE_ROWS).await?;
                return Ok(json!({
                    "message": message,
                    "examples": RENT_ROLL_EXAMPLES,
                    "sample_results": sample,
                }));
            }
        };

        Ok(serde_json::to_value(rows)?)
    }
}

#[async_trait::async_trait]
impl Tool for RentRollTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Query the rent roll database with natural language or SQL"
    }

    async fn invoke(&self, request: &ToolRequest) -> Result<Value> {
        let intent = match request.query_type {
            QueryMode::Sql => QueryIntent::RawSql {
                sql: request.query.clone(),
                params: request.params.clone(),
            },
            QueryMode::NaturalLanguage => IntentClassifier::classify(&request.query),
        };

        info!(
            intent = intent.label(),
            query = %request.query,
            "Classified rent roll query"
        );

        self.execute(intent).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryServiceError;
    use crate::models::{NewUnitRecord, UnitStatus};
    use crate::store::SqliteRentRollStore;

    fn unit(unit: &str, status: &str, rent: f64) -> NewUnitRecord {
        NewUnitRecord {
            unit: unit.to_string(),
            name: None,
            unit_type: None,
            square_feet: 800,
            billed_amount: rent,
            deposit: 250.0,
            moved_in_date: None,
            lease_end_date: Some("12/31/2025".to_string()),
            status: status.to_string(),
        }
    }

    async fn tool_with_units(count: usize) -> RentRollTool {
        let store = SqliteRentRollStore::in_memory().await.unwrap();
        for i in 0..count {
            let status = if i % 2 == 0 { "O" } else { "VU" };
            store
                .insert(&unit(&format!("{}", 100 + i), status, 1000.0 + i as f64 * 100.0))
                .await
                .unwrap();
        }
        RentRollTool::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_natural_language_status_query() {
        let tool = tool_with_units(4).await;
        let result = tool
            .invoke(&ToolRequest::new(QueryMode::NaturalLanguage, "Show me all vacant units"))
            .await
            .unwrap();

        let rows = result.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r["status"] == "VU"));
    }

    #[tokio::test]
    async fn test_execute_summary_and_unit_lookup() {
        let tool = tool_with_units(3).await;

        let stats = tool.execute(QueryIntent::SummaryStats).await.unwrap();
        assert_eq!(stats["total_units"], 3);
        assert_eq!(stats["occupied_units"], 2);

        let rows = tool
            .execute(QueryIntent::UnitLookup {
                unit: "101".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["unit"], "101");
        assert_eq!(rows[0]["autobill"], 1100.0);

        let rows = tool
            .execute(QueryIntent::StatusFilter {
                status: UnitStatus::VacantDeposit,
            })
            .await
            .unwrap();
        assert!(rows.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_returns_help_and_bounded_sample() {
        let tool = tool_with_units(8).await;
        let result = tool
            .invoke(&ToolRequest::new(QueryMode::NaturalLanguage, "hello"))
            .await
            .unwrap();

        assert!(result["message"].as_str().unwrap().contains("wasn't specific enough"));
        assert!(!result["examples"].as_array().unwrap().is_empty());
        assert_eq!(result["sample_results"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_sql_mode_with_params() {
        let tool = tool_with_units(4).await;
        let mut request = ToolRequest::new(
            QueryMode::Sql,
            "SELECT unit FROM rent_roll WHERE autobill > ? ORDER BY unit",
        );
        request.params = vec![json!(1150)];

        let result = tool.invoke(&request).await.unwrap();
        assert_eq!(result, json!([{"unit": "102"}, {"unit": "103"}]));
    }

    #[tokio::test]
    async fn test_sql_mode_rejects_writes() {
        let tool = tool_with_units(1).await;
        let err = tool
            .invoke(&ToolRequest::new(QueryMode::Sql, "DROP TABLE rent_roll"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryServiceError::QueryError(_)));
    }
}
