use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::EntryType;

/// Provider transaction in ledger form: one or more journal entries, one of
/// which is flagged as the master (account-affecting) leg.
///
/// Every field the normalizer validates is optional here, so a record with a
/// missing field still deserializes and is dropped later with a reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    /// Unix timestamp in milliseconds
    pub transaction_date: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source_description: Option<String>,
    #[serde(default)]
    pub journal_list: Vec<JournalEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    #[serde(default)]
    pub master: bool,
    #[serde(default)]
    pub entry_type: Option<EntryType>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub account: Option<LedgerAccount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAccount {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl LedgerAccount {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: None,
            icon: None,
        }
    }
}
