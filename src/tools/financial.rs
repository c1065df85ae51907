//! Financial data tool
//!
//! Answers mortgage and interest rate questions from the cached rate
//! service.

use super::Tool;
use crate::classifier::{FinancialClassifier, FinancialIntent, FINANCIAL_EXAMPLES, FINANCIAL_HELP};
use crate::error::QueryServiceError;
use crate::models::{QueryMode, RateQuote, ToolRequest};
use crate::rates::FinancialDataService;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub struct FinancialDataTool {
    rates: Arc<FinancialDataService>,
}

impl FinancialDataTool {
    pub const NAME: &'static str = "financial_data_query";

    pub fn new(rates: Arc<FinancialDataService>) -> Self {
        Self { rates }
    }

    pub async fn execute(&self, intent: FinancialIntent) -> Value {
        match intent {
            FinancialIntent::MortgageRates => {
                let mortgage = self.rates.get_mortgage_rates().await;
                json!({
                    "type": "mortgage_rates",
                    "summary": format!(
                        "Current 30-year fixed mortgage rate: {}, 15-year fixed: {}",
                        rate_at(&mortgage, 0),
                        rate_at(&mortgage, 1)
                    ),
                    "data": mortgage,
                })
            }
            FinancialIntent::InterestRates => {
                let interest = self.rates.get_interest_rates().await;
                json!({
                    "type": "interest_rates",
                    "summary": format!(
                        "Current Federal Funds Rate: {}, Prime Rate: {}",
                        rate_at(&interest, 0),
                        rate_at(&interest, 1)
                    ),
                    "data": interest,
                })
            }
            FinancialIntent::AllRates => {
                let (mortgage, interest) = tokio::join!(
                    self.rates.get_mortgage_rates(),
                    self.rates.get_interest_rates()
                );
                json!({
                    "type": "all_rates",
                    "summary": format!(
                        "Current 30-year mortgage: {}, Federal Funds Rate: {}",
                        rate_at(&mortgage, 0),
                        rate_at(&interest, 0)
                    ),
                    "mortgage_rates": mortgage,
                    "interest_rates": interest,
                })
            }
            FinancialIntent::Help => json!({
                "message": FINANCIAL_HELP,
                "examples": FINANCIAL_EXAMPLES,
            }),
        }
    }
}

fn rate_at(quotes: &[RateQuote], index: usize) -> String {
    quotes
        .get(index)
        .map(|quote| format!("{}%", quote.rate))
        .unwrap_or_else(|| "n/a".to_string())
}

#[async_trait::async_trait]
impl Tool for FinancialDataTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Query current mortgage and interest rates"
    }

    async fn invoke(&self, request: &ToolRequest) -> Result<Value> {
        if request.query_type != QueryMode::NaturalLanguage {
            return Err(QueryServiceError::InvalidPayload(
                "Invalid query_type. Use \"natural_language\"".to_string(),
            ));
        }

        let intent = FinancialClassifier::classify(&request.query);
        info!(?intent, query = %request.query, "Classified financial query");

        Ok(self.execute(intent).await)
    }
}
