//! Tool trait and registry
//!
//! A tool is a named query handler. The registry is built once at startup
//! and shared read-only across requests, so concurrent invocations of
//! different tools never contend on registry state.

use crate::error::QueryServiceError;
use crate::models::ToolRequest;
use crate::rates::FinancialDataService;
use crate::store::RentRollStore;
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

pub mod financial;
pub mod rent_roll;

pub use financial::FinancialDataTool;
pub use rent_roll::RentRollTool;

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn invoke(&self, request: &ToolRequest) -> Result<Value>;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

/// Tool registry for looking up and invoking tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A second tool under the same name is rejected.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name();
        if self.tools.contains_key(name) {
            return Err(QueryServiceError::DuplicateTool(name.to_string()));
        }

        info!(tool = name, "Registered tool");
        self.tools.insert(name.to_string(), tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tools, sorted by name
    pub fn list(&self) -> Vec<ToolDescriptor> {
        let mut tools: Vec<_> = self
            .tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Decode `payload` and run the named tool.
    pub async fn invoke(&self, name: &str, payload: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| QueryServiceError::UnknownTool(name.to_string()))?;

        let request: ToolRequest = serde_json::from_value(payload)
            .map_err(|e| QueryServiceError::InvalidPayload(e.to_string()))?;

        let invocation_id = Uuid::new_v4();
        let start = Instant::now();

        info!(
            %invocation_id,
            tool = name,
            query_type = %request.query_type,
            "Invoking tool"
        );

        match tool.invoke(&request).await {
            Ok(result) => {
                info!(
                    %invocation_id,
                    tool = name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Tool completed"
                );
                Ok(result)
            }
            Err(error) => {
                warn!(
                    %invocation_id,
                    tool = name,
                    error = %error,
                    "Tool execution failed"
                );
                Err(QueryServiceError::tool_failure(name, error))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with the rent roll and financial data tools.
pub fn create_default_registry(
    store: Arc<dyn RentRollStore>,
    rates: Arc<FinancialDataService>,
) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(RentRollTool::new(store)))?;
    registry.register(Arc::new(FinancialDataTool::new(rates)))?;

    Ok(registry)
}
