use thiserror::Error;
use tracing::warn;

use crate::ingest::models::{JournalEntry, RawTransaction};
use crate::models::CanonicalTransaction;

const NO_DESCRIPTION: &str = "No Description";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("no master journal entry")]
    MissingMaster,

    #[error("{0} master journal entries")]
    MultipleMasters(usize),

    #[error("no counter journal entry")]
    MissingCounter,

    #[error("{leg} entry is missing {field}")]
    MissingField {
        leg: &'static str,
        field: &'static str,
    },
}

/// Convert a raw ledger-form record into the canonical shape, or `None` if
/// the record does not resolve to exactly one master leg and a counter leg.
pub fn normalize(raw: &RawTransaction) -> Option<CanonicalTransaction> {
    try_normalize(raw).ok()
}

pub fn try_normalize(raw: &RawTransaction) -> Result<CanonicalTransaction, NormalizeError> {
    let masters = raw.journal_list.iter().filter(|e| e.master).count();
    let master = match masters {
        0 => return Err(NormalizeError::MissingMaster),
        1 => raw
            .journal_list
            .iter()
            .find(|e| e.master)
            .ok_or(NormalizeError::MissingMaster)?,
        n => return Err(NormalizeError::MultipleMasters(n)),
    };
    let counter = raw
        .journal_list
        .iter()
        .find(|e| !e.master)
        .ok_or(NormalizeError::MissingCounter)?;

    let entry_type = master.entry_type.ok_or(NormalizeError::MissingField {
        leg: "master",
        field: "entryType",
    })?;
    let amount = master.amount.ok_or(NormalizeError::MissingField {
        leg: "master",
        field: "amount",
    })?;
    let account_name = leg_account_name(master, "master")?;

    let category = counter.account.as_ref();
    let category_name = leg_account_name(counter, "counter")?;

    Ok(CanonicalTransaction {
        date: raw.transaction_date,
        title: title_of(raw),
        amount,
        entry_type,
        account_name,
        category_name,
        category_type: category.and_then(|a| a.kind.clone()),
        category_icon: category.and_then(|a| a.icon.clone()),
    })
}

/// Normalize a batch, logging and dropping the records that fail.
pub fn normalize_batch(raws: &[RawTransaction]) -> Vec<CanonicalTransaction> {
    raws.iter()
        .filter_map(|raw| match try_normalize(raw) {
            Ok(transaction) => Some(transaction),
            Err(e) => {
                warn!(
                    "Dropping transaction at {} ({:?}): {}",
                    raw.transaction_date, raw.title, e
                );
                None
            }
        })
        .collect()
}

fn leg_account_name(entry: &JournalEntry, leg: &'static str) -> Result<String, NormalizeError> {
    entry
        .account
        .as_ref()
        .and_then(|a| a.name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or(NormalizeError::MissingField {
            leg,
            field: "account.name",
        })
}

fn title_of(raw: &RawTransaction) -> String {
    [raw.title.as_deref(), raw.source_description.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or(NO_DESCRIPTION)
        .to_string()
}
