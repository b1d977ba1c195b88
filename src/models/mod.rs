// Canonical transaction shape shared by the store, the API and the sync pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Debit => "DEBIT",
            EntryType::Credit => "CREDIT",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBIT" => Ok(EntryType::Debit),
            "CREDIT" => Ok(EntryType::Credit),
            other => Err(format!("unknown entry type: {}", other)),
        }
    }
}

/// One normalized transaction, independent of the provider it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTransaction {
    /// Unix timestamp in milliseconds
    pub date: i64,
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub entry_type: EntryType,
    pub account_name: String,
    pub category_name: String,
    pub category_type: Option<String>,
    pub category_icon: Option<String>,
}

impl CanonicalTransaction {
    /// A positive CREDIT on the master account is money leaving it.
    pub fn is_expense(&self) -> bool {
        self.entry_type == EntryType::Credit && self.amount > Decimal::ZERO
    }
}

/// A transaction as persisted in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTransaction {
    pub id: i64,
    /// Insertion time, Unix milliseconds
    pub created_at: i64,
    #[serde(flatten)]
    pub transaction: CanonicalTransaction,
}

/// Expense total for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category_name: String,
    pub category_icon: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub count: usize,
}
