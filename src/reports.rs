// Expense aggregation over stored transactions

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::models::{CategoryTotal, StoredTransaction};

/// Sum expenses per category, largest total first (ties by name).
pub fn expenses_by_category(rows: &[StoredTransaction]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, CategoryTotal> = HashMap::new();

    for row in rows.iter().filter(|r| r.transaction.is_expense()) {
        let tx = &row.transaction;
        let entry = totals.entry(tx.category_name.as_str()).or_insert_with(|| CategoryTotal {
            category_name: tx.category_name.clone(),
            category_icon: tx.category_icon.clone(),
            total: Decimal::ZERO,
            count: 0,
        });
        entry.total += tx.amount;
        entry.count += 1;
    }

    let mut totals: Vec<CategoryTotal> = totals.into_values().collect();
    totals.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category_name.cmp(&b.category_name))
    });
    totals
}
