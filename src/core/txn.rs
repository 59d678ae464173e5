use chrono::naive::NaiveDate;
use serde::{Deserialize, Serialize};

const CATEGORY_SEPARATOR: &str = ", ";

/// A transaction ingested for a linked institution, keyed by the
/// provider-assigned `transaction_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub date: NaiveDate,
    pub name: String,
    pub amount: f64,
    pub account_id: String,
    pub category: Vec<String>,
    pub institution_id: String,
}

impl Transaction {
    pub fn from_upstream(tx: plaid_link::Transaction, institution_id: &str) -> Self {
        Self {
            transaction_id: tx.transaction_id,
            date: tx.date,
            name: tx.name,
            amount: tx.amount,
            account_id: tx.account_id,
            category: tx.category,
            institution_id: institution_id.to_string(),
        }
    }

    /// Categories flattened into the single column they are stored in.
    pub fn flat_category(&self) -> Option<String> {
        if self.category.is_empty() {
            return None;
        }

        Some(self.category.join(CATEGORY_SEPARATOR))
    }

    pub fn split_category(flat: Option<&str>) -> Vec<String> {
        match flat {
            Some(s) if !s.is_empty() => s.split(CATEGORY_SEPARATOR).map(String::from).collect(),
            _ => vec![],
        }
    }
}
