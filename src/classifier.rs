//! Query Classifiers
//!
//! Maps free-text questions onto a fixed set of parameterized queries:
//! - `IntentClassifier`: rent roll intents (status filter, unit lookup,
//!   rent thresholds, lease expiry, summary statistics)
//! - `FinancialClassifier`: mortgage and interest rate questions
//!
//! Both are first-match-wins over case-insensitive substring and regex
//! checks. No tokenization, stemming, or synonym expansion.

use crate::models::UnitStatus;
use chrono::{Datelike, Local};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Help text returned when no rent roll intent matches
pub const RENT_ROLL_HELP: &str = "Your query wasn't specific enough. Try asking about vacant units, occupied units, specific unit numbers, rent ranges, or lease expirations.";

pub const RENT_ROLL_EXAMPLES: &[&str] = &[
    "Show me all vacant units",
    "What is the occupancy rate?",
    "Show me unit 110",
    "Show me units with rent above 1500",
    "Which leases are expiring soon?",
];

pub const FINANCIAL_HELP: &str = "Please ask about mortgage rates or interest rates.";

pub const FINANCIAL_EXAMPLES: &[&str] = &[
    "What are current mortgage rates?",
    "What is the federal funds rate?",
    "Show me all current rates",
];

/// Static keyword lists, checked in this order
const VACANCY_KEYWORDS: &[&str] = &["vacant", "empty", "unoccupied"];
const OCCUPANCY_KEYWORDS: &[&str] = &["occupied", "rented"];
const SUMMARY_KEYWORDS: &[&str] = &["summary", "statistics", "overview", "report", "occupancy"];
const LEASE_EXPIRY_KEYWORDS: &[&str] = &["lease end", "expiring", "expiration", "ending soon"];

const MORTGAGE_KEYWORDS: &[&str] = &["mortgage", "home loan", "house loan"];
const INTEREST_KEYWORDS: &[&str] = &["interest", "fed", "federal reserve", "prime rate"];

lazy_static! {
    static ref UNIT_PATTERN: Regex =
        Regex::new(r"(?i)(?:unit|apartment)\s+(\d+)").expect("unit pattern");
    static ref RENT_ABOVE_PATTERN: Regex = Regex::new(
        r"(?i)rent\s+(?:above|over|more than|greater than|exceeding)\s+\$?(\d[\d,]*(?:\.\d+)?)"
    )
    .expect("rent above pattern");
    static ref RENT_BELOW_PATTERN: Regex = Regex::new(
        r"(?i)rent\s+(?:below|under|less than|lower than)\s+\$?(\d[\d,]*(?:\.\d+)?)"
    )
    .expect("rent below pattern");
}

//
// ================= Rent Roll Intents =================
//

/// The classified, parameterized form of a rent roll question
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum QueryIntent {
    StatusFilter { status: UnitStatus },
    UnitLookup { unit: String },
    RentAbove { amount: f64 },
    RentBelow { amount: f64 },
    LeaseExpiring { year: i32 },
    SummaryStats,
    RawSql { sql: String, params: Vec<Value> },
    /// Nothing matched; answered with help text and sample rows
    Unrecognized { message: &'static str },
}

impl QueryIntent {
    pub fn label(&self) -> &'static str {
        match self {
            QueryIntent::StatusFilter { .. } => "status_filter",
            QueryIntent::UnitLookup { .. } => "unit_lookup",
            QueryIntent::RentAbove { .. } => "rent_above",
            QueryIntent::RentBelow { .. } => "rent_below",
            QueryIntent::LeaseExpiring { .. } => "lease_expiring",
            QueryIntent::SummaryStats => "summary_stats",
            QueryIntent::RawSql { .. } => "raw_sql",
            QueryIntent::Unrecognized { .. } => "unrecognized",
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, QueryIntent::Unrecognized { .. })
    }
}

/// Rent roll intent classifier
pub struct IntentClassifier;

impl IntentClassifier {
    /// Classify against the current calendar year
    pub fn classify(question: &str) -> QueryIntent {
        Self::classify_for_year(question, Local::now().year())
    }

    /// Classify with an explicit year for lease-expiry questions
    pub fn classify_for_year(question: &str, current_year: i32) -> QueryIntent {
        let text = question.to_lowercase();

        if contains_any(&text, VACANCY_KEYWORDS) {
            return QueryIntent::StatusFilter {
                status: UnitStatus::VacantUnrented,
            };
        }

        if contains_any(&text, OCCUPANCY_KEYWORDS) {
            return QueryIntent::StatusFilter {
                status: UnitStatus::Occupied,
            };
        }

        if contains_any(&text, SUMMARY_KEYWORDS) {
            return QueryIntent::SummaryStats;
        }

        if let Some(caps) = UNIT_PATTERN.captures(&text) {
            return QueryIntent::UnitLookup {
                unit: caps[1].to_string(),
            };
        }

        if let Some(amount) = capture_amount(&RENT_ABOVE_PATTERN, &text) {
            return QueryIntent::RentAbove { amount };
        }

        if let Some(amount) = capture_amount(&RENT_BELOW_PATTERN, &text) {
            return QueryIntent::RentBelow { amount };
        }

        if contains_any(&text, LEASE_EXPIRY_KEYWORDS) {
            return QueryIntent::LeaseExpiring { year: current_year };
        }

        QueryIntent::Unrecognized {
            message: RENT_ROLL_HELP,
        }
    }
}

//
// ================= Financial Intents =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialIntent {
    MortgageRates,
    InterestRates,
    /// Mentions "rate" without naming a rate family
    AllRates,
    Help,
}

impl FinancialIntent {
    /// Specific enough to take over a question at the top level
    pub fn is_specific(&self) -> bool {
        matches!(self, FinancialIntent::MortgageRates | FinancialIntent::InterestRates)
    }
}

/// Financial domain classifier
pub struct FinancialClassifier;

impl FinancialClassifier {
    pub fn classify(question: &str) -> FinancialIntent {
        let text = question.to_lowercase();

        if contains_any(&text, MORTGAGE_KEYWORDS) {
            FinancialIntent::MortgageRates
        } else if contains_any(&text, INTEREST_KEYWORDS) {
            FinancialIntent::InterestRates
        } else if text.contains("rate") {
            FinancialIntent::AllRates
        } else {
            FinancialIntent::Help
        }
    }
}

/// Fast path keyword detection
fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}

fn capture_amount(pattern: &Regex, text: &str) -> Option<f64> {
    let caps = pattern.captures(text)?;
    caps[1].replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(question: &str) -> QueryIntent {
        IntentClassifier::classify_for_year(question, 2025)
    }

    #[test]
    fn test_status_filters() {
        let vacant = QueryIntent::StatusFilter {
            status: UnitStatus::VacantUnrented,
        };
        for q in ["Show me all vacant units", "Which units are EMPTY?", "list unoccupied apartments"] {
            assert_eq!(classify(q), vacant, "{}", q);
        }

        let occupied = QueryIntent::StatusFilter {
            status: UnitStatus::Occupied,
        };
        for q in ["Show occupied units", "which units are rented"] {
            assert_eq!(classify(q), occupied, "{}", q);
        }
    }

    #[test]
    fn test_vacancy_takes_priority_over_occupancy() {
        assert_eq!(
            classify("show vacant and occupied units"),
            QueryIntent::StatusFilter {
                status: UnitStatus::VacantUnrented
            }
        );
        // "unoccupied" also contains "occupied"; rule 1 wins
        assert_eq!(
            classify("unoccupied units"),
            QueryIntent::StatusFilter {
                status: UnitStatus::VacantUnrented
            }
        );
    }

    #[test]
    fn test_summary_keywords() {
        for q in [
            "Give me a summary",
            "rent roll statistics",
            "property overview",
            "monthly report",
            "What is the occupancy rate?",
        ] {
            assert_eq!(classify(q), QueryIntent::SummaryStats, "{}", q);
        }
    }

    #[test]
    fn test_summary_beats_unit_lookup() {
        assert_eq!(classify("report for unit 110"), QueryIntent::SummaryStats);
    }

    #[test]
    fn test_unit_lookup() {
        assert_eq!(
            classify("Show me unit 110"),
            QueryIntent::UnitLookup {
                unit: "110".to_string()
            }
        );
        assert_eq!(
            classify("who lives in Apartment   204?"),
            QueryIntent::UnitLookup {
                unit: "204".to_string()
            }
        );
    }

    #[test]
    fn test_rent_thresholds() {
        assert_eq!(
            classify("Show me units with rent above 1500"),
            QueryIntent::RentAbove { amount: 1500.0 }
        );
        assert_eq!(
            classify("rent greater than $1,250"),
            QueryIntent::RentAbove { amount: 1250.0 }
        );
        assert_eq!(
            classify("units with rent exceeding 2000"),
            QueryIntent::RentAbove { amount: 2000.0 }
        );
        assert_eq!(
            classify("rent lower than 900"),
            QueryIntent::RentBelow { amount: 900.0 }
        );
        assert_eq!(
            classify("Rent Under 1000.50"),
            QueryIntent::RentBelow { amount: 1000.5 }
        );
    }

    #[test]
    fn test_lease_expiry_uses_given_year() {
        for q in ["Which leases are expiring soon?", "lease end dates", "upcoming expiration", "leases ending soon"] {
            assert_eq!(classify(q), QueryIntent::LeaseExpiring { year: 2025 }, "{}", q);
        }
    }

    #[test]
    fn test_unrecognized() {
        let intent = classify("hello");
        assert!(!intent.is_recognized());
        assert_eq!(intent.label(), "unrecognized");
        assert_eq!(
            intent,
            QueryIntent::Unrecognized {
                message: RENT_ROLL_HELP
            }
        );
        // No threshold number means no threshold intent
        assert!(!classify("rent above average").is_recognized());
    }

    #[test]
    fn test_financial_classifier() {
        assert_eq!(
            FinancialClassifier::classify("What are current mortgage rates?"),
            FinancialIntent::MortgageRates
        );
        assert_eq!(
            FinancialClassifier::classify("home loan pricing"),
            FinancialIntent::MortgageRates
        );
        assert_eq!(
            FinancialClassifier::classify("What is the federal funds rate?"),
            FinancialIntent::InterestRates
        );
        assert_eq!(
            FinancialClassifier::classify("current prime rate"),
            FinancialIntent::InterestRates
        );
        assert_eq!(
            FinancialClassifier::classify("Show me all current rates"),
            FinancialIntent::AllRates
        );
        assert_eq!(FinancialClassifier::classify("hello"), FinancialIntent::Help);
    }

    #[test]
    fn test_mortgage_precedes_interest() {
        assert_eq!(
            FinancialClassifier::classify("mortgage interest"),
            FinancialIntent::MortgageRates
        );
        assert!(FinancialIntent::MortgageRates.is_specific());
        assert!(!FinancialIntent::AllRates.is_specific());
    }
}
