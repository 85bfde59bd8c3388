//! Structured quote estimates returned alongside chat replies

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A structured quotation the model produced for a project request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuoteEstimate {
    #[serde(default)]
    pub client_name: String,

    #[serde(default)]
    pub project_name: String,

    /// Phase -> activities in that phase
    #[serde(default)]
    pub scope_of_work: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub timeline: String,

    /// Line item -> price
    #[serde(default)]
    pub pricing: BTreeMap<String, f64>,

    /// Sum of pricing line items
    #[serde(default)]
    pub total: f64,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub payment_terms: Option<String>,
}

impl QuoteEstimate {
    /// Parse a quote from a JSON payload. The total is filled in from
    /// the pricing line items when the model omits it.
    pub fn from_json(payload: &str) -> Result<Self> {
        let mut quote: QuoteEstimate = serde_json::from_str(payload)?;
        if quote.total == 0.0 && !quote.pricing.is_empty() {
            quote.total = quote.pricing.values().sum();
        }
        if quote.client_name.is_empty() && quote.project_name.is_empty() && quote.pricing.is_empty()
        {
            return Err(CoreError::Validation(
                "quote payload carries no client, project, or pricing".into(),
            ));
        }
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_total_from_pricing() {
        let payload = r#"{
            "client_name": "Acme",
            "project_name": "Acme Website",
            "timeline": "3 to 4 weeks",
            "pricing": {"Research": 10000.0, "UI Design": 15000.0}
        }"#;

        let quote = QuoteEstimate::from_json(payload).unwrap();
        assert_eq!(quote.total, 25000.0);
    }

    #[test]
    fn test_quote_explicit_total_kept() {
        let payload = r#"{"client_name": "Acme", "pricing": {"Design": 5000.0}, "total": 4500.0}"#;
        let quote = QuoteEstimate::from_json(payload).unwrap();
        assert_eq!(quote.total, 4500.0);
    }

    #[test]
    fn test_empty_quote_rejected() {
        assert!(QuoteEstimate::from_json("{}").is_err());
        assert!(QuoteEstimate::from_json("not json").is_err());
    }
}
