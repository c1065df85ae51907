//! Top-level question router
//!
//! Decides which tool answers a free-text question. Financial questions
//! that name a rate family go to the financial tool; everything else,
//! including `sql` mode, goes to the rent roll tool. A question that only
//! mentions "rate" goes to the financial tool when the rent roll
//! classifier has nothing better for it.

use crate::classifier::{FinancialClassifier, FinancialIntent, IntentClassifier};
use crate::models::{QueryDomain, QueryMode, RoutedResponse, ToolRequest};
use crate::tools::{FinancialDataTool, RentRollTool, ToolRegistry};
use crate::Result;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct QueryRouter {
    registry: Arc<ToolRegistry>,
}

impl QueryRouter {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Pick the domain for a question without running it
    pub fn domain_for(question: &str, mode: QueryMode) -> QueryDomain {
        if mode == QueryMode::Sql {
            return QueryDomain::RentRoll;
        }

        match FinancialClassifier::classify(question) {
            intent if intent.is_specific() => QueryDomain::Financial,
            FinancialIntent::AllRates if !IntentClassifier::classify(question).is_recognized() => {
                QueryDomain::Financial
            }
            _ => QueryDomain::RentRoll,
        }
    }

    pub async fn route(&self, question: &str, mode: QueryMode) -> Result<RoutedResponse> {
        let domain = Self::domain_for(question, mode);
        let tool = match domain {
            QueryDomain::Financial => FinancialDataTool::NAME,
            QueryDomain::RentRoll => RentRollTool::NAME,
        };

        info!(?domain, tool, "Routing question");

        let payload = serde_json::to_value(ToolRequest::new(mode, question))?;
        let data = self.registry.invoke(tool, payload).await?;

        Ok(RoutedResponse { domain, data })
    }
}
