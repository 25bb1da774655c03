use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{LoanId, LoanStatus, StatusFilter, ToolId};

/// read-only snapshot of a loan as returned by the loan service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: LoanId,
    #[serde(default)]
    pub rut_user: String,
    pub reservation_date: NaiveDate,
    /// agreed return date
    pub return_date: NaiveDate,
    /// actual return date; absent while the tools are still out
    #[serde(default)]
    pub late_return_date: Option<NaiveDate>,
    #[serde(default)]
    pub total: Money,
    #[serde(default)]
    pub late_fine: Money,
    #[serde(default)]
    pub late_fine_paid: bool,
    #[serde(default)]
    pub damage_penalty: Money,
    #[serde(default)]
    pub damage_penalty_paid: bool,
    #[serde(default)]
    pub items: Vec<LoanItem>,
}

/// one tool line of a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanItem {
    pub tool_id: ToolId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub tool_name_snapshot: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

impl LoanItem {
    pub fn new(tool_id: ToolId, tool_name: impl Into<String>) -> Self {
        Self {
            tool_id,
            quantity: 1,
            tool_name_snapshot: Some(tool_name.into()),
        }
    }
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.late_return_date.is_none()
    }

    /// overdue means still out after the agreed date; returning on the date itself is on time
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && self.return_date < today
    }

    pub fn has_unpaid_late_fine(&self) -> bool {
        self.late_fine.is_positive() && !self.late_fine_paid
    }

    pub fn has_unpaid_damage_penalty(&self) -> bool {
        self.damage_penalty.is_positive() && !self.damage_penalty_paid
    }

    pub fn has_debt(&self) -> bool {
        self.has_unpaid_late_fine() || self.has_unpaid_damage_penalty()
    }

    /// sum of unpaid fine and penalty
    pub fn outstanding_debt(&self) -> Money {
        let mut debt = Money::ZERO;
        if self.has_unpaid_late_fine() {
            debt += self.late_fine;
        }
        if self.has_unpaid_damage_penalty() {
            debt += self.damage_penalty;
        }
        debt
    }

    pub fn tool_ids(&self) -> impl Iterator<Item = ToolId> + '_ {
        self.items.iter().map(|item| item.tool_id)
    }

    pub fn contains_tool(&self, tool_id: ToolId) -> bool {
        self.items.iter().any(|item| item.tool_id == tool_id)
    }

    pub fn status(&self, today: NaiveDate) -> LoanStatus {
        classify(self, today)
    }
}

/// derive the status flags of a loan as of `today`
pub fn classify(loan: &Loan, today: NaiveDate) -> LoanStatus {
    let active = loan.is_active();
    LoanStatus {
        active,
        overdue: loan.is_overdue(today),
        with_debt: loan.has_debt(),
        finished: !active,
    }
}

/// classify using the calendar date of an injected time provider
pub fn classify_at(loan: &Loan, time_provider: &SafeTimeProvider) -> LoanStatus {
    classify(loan, time_provider.now().date_naive())
}

/// loans matching a status filter, order preserved
pub fn filter_loans<'a>(loans: &'a [Loan], filter: StatusFilter, today: NaiveDate) -> Vec<&'a Loan> {
    loans
        .iter()
        .filter(|loan| filter.matches(&classify(loan, today)))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::{active_loan, date};
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use hourglass_rs::TimeSource;

    #[test]
    fn test_returned_loan_is_finished() {
        let mut loan = active_loan(1, "12345678-9", date(2024, 1, 1), date(2024, 1, 5));
        loan.late_return_date = Some(date(2024, 1, 9));

        let status = classify(&loan, date(2024, 2, 1));
        assert!(!status.active);
        assert!(status.finished);
        assert!(!status.overdue);
    }

    #[test]
    fn test_overdue_is_strictly_after_agreed_date() {
        let loan = active_loan(1, "12345678-9", date(2024, 1, 1), date(2024, 1, 5));

        assert!(!classify(&loan, date(2024, 1, 4)).overdue);
        assert!(!classify(&loan, date(2024, 1, 5)).overdue);
        assert!(classify(&loan, date(2024, 1, 6)).overdue);
        assert!(classify(&loan, date(2024, 1, 6)).active);
    }

    #[test]
    fn test_unpaid_fine_means_debt() {
        let mut loan = active_loan(1, "12345678-9", date(2024, 1, 1), date(2024, 1, 5));
        loan.late_return_date = Some(date(2024, 1, 7));
        loan.late_fine = Money::from_major(5_000);

        assert!(classify(&loan, date(2024, 1, 8)).with_debt);

        loan.late_fine_paid = true;
        assert!(!classify(&loan, date(2024, 1, 8)).with_debt);
    }

    #[test]
    fn test_paid_flag_without_amount_is_not_debt() {
        let mut loan = active_loan(1, "12345678-9", date(2024, 1, 1), date(2024, 1, 5));
        loan.damage_penalty = Money::ZERO;
        loan.damage_penalty_paid = false;
        assert!(!loan.has_debt());

        loan.damage_penalty = Money::from_major(12_000);
        assert!(loan.has_debt());
        assert_eq!(loan.outstanding_debt(), Money::from_major(12_000));
    }

    #[test]
    fn test_finished_with_debt_combines() {
        let mut loan = active_loan(1, "12345678-9", date(2024, 1, 1), date(2024, 1, 5));
        loan.late_return_date = Some(date(2024, 1, 10));
        loan.late_fine = Money::from_major(5_000);
        loan.damage_penalty = Money::from_major(3_000);
        loan.damage_penalty_paid = true;

        let status = classify(&loan, date(2024, 1, 10));
        assert!(status.finished && status.with_debt);
        assert_eq!(loan.outstanding_debt(), Money::from_major(5_000));
    }

    #[test]
    fn test_classify_with_time_provider() {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 0).unwrap()
        ));
        let control = time.test_control().unwrap();
        let loan = active_loan(1, "12345678-9", date(2024, 1, 1), date(2024, 1, 5));

        assert!(!classify_at(&loan, &time).overdue);

        control.advance(Duration::minutes(2));
        assert!(classify_at(&loan, &time).overdue);
    }

    #[test]
    fn test_deserialize_backend_snapshot() {
        let json = r#"{
            "id": 7,
            "rutUser": "11111111-1",
            "reservationDate": "2024-03-01",
            "returnDate": "2024-03-04",
            "lateReturnDate": null,
            "total": 7500,
            "lateFine": 0,
            "damagePenalty": 0,
            "amountOfTools": 1,
            "items": [{"id": 3, "toolId": 12, "toolNameSnapshot": "Sierra"}]
        }"#;
        let loan: Loan = serde_json::from_str(json).unwrap();

        assert_eq!(loan.id, 7);
        assert!(loan.is_active());
        assert!(!loan.late_fine_paid);
        assert_eq!(loan.total, Money::from_major(7_500));
        assert_eq!(loan.items[0].quantity, 1);
        assert_eq!(loan.items[0].tool_name_snapshot.as_deref(), Some("Sierra"));
    }

    #[test]
    fn test_filter_loans_by_status() {
        let today = date(2024, 2, 1);
        let on_time = active_loan(1, "1-9", date(2024, 1, 30), date(2024, 2, 3));
        let late = active_loan(2, "1-9", date(2024, 1, 1), date(2024, 1, 10));
        let mut closed = active_loan(3, "1-9", date(2024, 1, 1), date(2024, 1, 3));
        closed.late_return_date = Some(date(2024, 1, 3));
        let loans = vec![on_time, late, closed];

        let ids = |filter| -> Vec<LoanId> {
            filter_loans(&loans, filter, today).iter().map(|l| l.id).collect()
        };
        assert_eq!(ids(StatusFilter::All), vec![1, 2, 3]);
        assert_eq!(ids(StatusFilter::Active), vec![1, 2]);
        assert_eq!(ids(StatusFilter::Overdue), vec![2]);
        assert_eq!(ids(StatusFilter::Finished), vec![3]);
        assert!(ids(StatusFilter::Debt).is_empty());
    }
}
