//! Rent Roll Query Service
//!
//! Answers plain-English and SQL questions about a property rent roll:
//! - Keyword/regex classification into parameterized store queries
//! - A single SQLite table of unit records
//! - A TTL-cached financial rate provider (mortgage and interest rates)
//! - Named tools behind a registry, exposed over HTTP
//!
//! FLOW:
//! QUESTION → ROUTER → TOOL → CLASSIFY → STORE / RATES → JSON

pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod rates;
pub mod router;
pub mod store;
pub mod tools;

pub use error::{QueryServiceError, Result};

// Re-export common types
pub use classifier::{FinancialClassifier, FinancialIntent, IntentClassifier, QueryIntent};
pub use models::*;
pub use router::QueryRouter;
