use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::tools::Tool;

/// receipt shown after a loan is created; computed locally, never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub days: u32,
    pub rent_total: Money,
    pub repos_total: Money,
    pub items: Vec<ReceiptLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub name: String,
    pub category: String,
    pub reposition_value: Money,
}

/// billable days between two dates, never less than one
///
/// Reversed dates also yield one day; callers must reject them before billing.
pub fn rental_days(reservation_date: NaiveDate, return_date: NaiveDate) -> u32 {
    let days = (return_date - reservation_date).num_days();
    days.clamp(1, u32::MAX as i64) as u32
}

/// rent and reposition totals for a prospective loan
pub fn compute_receipt(
    reservation_date: NaiveDate,
    return_date: NaiveDate,
    daily_rate: Money,
    selected_tools: &[Tool],
) -> Receipt {
    let days = rental_days(reservation_date, return_date);
    let items: Vec<ReceiptLine> = selected_tools
        .iter()
        .map(|tool| ReceiptLine {
            name: tool.name.clone(),
            category: tool.category.clone(),
            reposition_value: tool.reposition_value,
        })
        .collect();

    Receipt {
        days,
        rent_total: daily_rate.times_days(days),
        repos_total: items.iter().map(|line| line.reposition_value).sum(),
        items,
    }
}
