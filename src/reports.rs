use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::decimal::Money;
use crate::loan::Loan;
use crate::types::{LoanId, ToolId};

/// reporting period; both ends inclusive and optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveLoanState {
    /// still within the agreed period
    Vigente,
    Atrasado,
}

impl fmt::Display for ActiveLoanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveLoanState::Vigente => write!(f, "Vigente"),
            ActiveLoanState::Atrasado => write!(f, "Atrasado"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveLoanRow<'a> {
    pub loan: &'a Loan,
    pub status: ActiveLoanState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueClient {
    pub rut_user: String,
    pub overdue_loans: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    pub tool_id: ToolId,
    pub times: u32,
}

/// whether a borrower may take new loans
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRestriction {
    pub overdue_loans: Vec<LoanId>,
    pub loans_with_debt: Vec<LoanId>,
    pub outstanding_debt: Money,
}

impl AccountRestriction {
    pub fn is_restricted(&self) -> bool {
        !self.overdue_loans.is_empty() || !self.loans_with_debt.is_empty()
    }
}

/// active loans reserved in range, labelled on time or overdue
pub fn active_loan_report<'a>(loans: &'a [Loan], range: DateRange, today: NaiveDate) -> Vec<ActiveLoanRow<'a>> {
    loans
        .iter()
        .filter(|loan| loan.is_active() && range.contains(loan.reservation_date))
        .map(|loan| ActiveLoanRow {
            loan,
            status: if loan.is_overdue(today) {
                ActiveLoanState::Atrasado
            } else {
                ActiveLoanState::Vigente
            },
        })
        .collect()
}

/// borrowers with overdue loans, most overdue loans first
pub fn overdue_clients(loans: &[Loan], range: DateRange, today: NaiveDate) -> Vec<OverdueClient> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for loan in loans {
        if loan.is_overdue(today) && range.contains(loan.reservation_date) && !loan.rut_user.is_empty() {
            *counts.entry(loan.rut_user.as_str()).or_default() += 1;
        }
    }

    let mut rows: Vec<OverdueClient> = counts
        .into_iter()
        .map(|(rut_user, overdue_loans)| OverdueClient {
            rut_user: rut_user.to_string(),
            overdue_loans,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.overdue_loans
            .cmp(&a.overdue_loans)
            .then_with(|| a.rut_user.cmp(&b.rut_user))
    });
    rows
}

/// most lent tools over loans reserved in range; `limit` is at least one
pub fn top_tools(loans: &[Loan], range: DateRange, limit: usize) -> Vec<RankingRow> {
    let mut counts: HashMap<ToolId, u32> = HashMap::new();
    for loan in loans.iter().filter(|loan| range.contains(loan.reservation_date)) {
        for tool_id in loan.tool_ids() {
            *counts.entry(tool_id).or_default() += 1;
        }
    }

    let mut rows: Vec<RankingRow> = counts
        .into_iter()
        .map(|(tool_id, times)| RankingRow { tool_id, times })
        .collect();
    rows.sort_by(|a, b| b.times.cmp(&a.times).then_with(|| a.tool_id.cmp(&b.tool_id)));
    rows.truncate(limit.max(1));
    rows
}

pub fn loans_with_debt(loans: &[Loan]) -> Vec<&Loan> {
    loans.iter().filter(|loan| loan.has_debt()).collect()
}

/// restriction status computed from one borrower's loans
pub fn account_restriction(loans: &[Loan], today: NaiveDate) -> AccountRestriction {
    AccountRestriction {
        overdue_loans: loans.iter().filter(|l| l.is_overdue(today)).map(|l| l.id).collect(),
        loans_with_debt: loans.iter().filter(|l| l.has_debt()).map(|l| l.id).collect(),
        outstanding_debt: loans.iter().map(Loan::outstanding_debt).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::fixtures::{active_loan, date};
    use crate::loan::LoanItem;

    fn book() -> Vec<Loan> {
        let mut returned = active_loan(4, "22222222-2", date(2024, 1, 2), date(2024, 1, 4));
        returned.late_return_date = Some(date(2024, 1, 6));
        returned.late_fine = Money::from_major(2_000);
        returned.items = vec![LoanItem::new(1, "Taladro")];

        vec![
            active_loan(1, "33333333-3", date(2024, 1, 1), date(2024, 1, 3)),
            active_loan(2, "11111111-1", date(2024, 1, 5), date(2024, 1, 8)),
            active_loan(3, "33333333-3", date(2024, 1, 10), date(2024, 1, 20)),
            returned,
            active_loan(5, "44444444-4", date(2024, 1, 2), date(2024, 1, 9)),
        ]
    }

    #[test]
    fn test_date_range_inclusive() {
        let range = DateRange::new(Some(date(2024, 1, 2)), Some(date(2024, 1, 5)));
        assert!(range.contains(date(2024, 1, 2)));
        assert!(range.contains(date(2024, 1, 5)));
        assert!(!range.contains(date(2024, 1, 6)));
        assert!(DateRange::unbounded().contains(date(1999, 1, 1)));
    }

    #[test]
    fn test_active_loan_report_labels() {
        let loans = book();
        let rows = active_loan_report(&loans, DateRange::unbounded(), date(2024, 1, 8));

        let summary: Vec<(LoanId, ActiveLoanState)> = rows.iter().map(|r| (r.loan.id, r.status)).collect();
        assert_eq!(
            summary,
            vec![
                (1, ActiveLoanState::Atrasado),
                (2, ActiveLoanState::Vigente),
                (3, ActiveLoanState::Vigente),
                (5, ActiveLoanState::Vigente),
            ]
        );
        assert_eq!(ActiveLoanState::Atrasado.to_string(), "Atrasado");
    }

    #[test]
    fn test_overdue_clients_sorted() {
        let mut loans = book();
        loans.push(active_loan(6, "11111111-1", date(2024, 1, 1), date(2024, 1, 2)));
        loans.push(active_loan(7, "33333333-3", date(2024, 1, 3), date(2024, 1, 4)));

        let rows = overdue_clients(&loans, DateRange::unbounded(), date(2024, 1, 10));
        assert_eq!(
            rows,
            vec![
                OverdueClient { rut_user: "11111111-1".to_string(), overdue_loans: 2 },
                OverdueClient { rut_user: "33333333-3".to_string(), overdue_loans: 2 },
                OverdueClient { rut_user: "44444444-4".to_string(), overdue_loans: 1 },
            ]
        );
    }

    #[test]
    fn test_overdue_clients_respects_range() {
        let loans = book();
        let range = DateRange::new(Some(date(2024, 1, 2)), None);
        let rows = overdue_clients(&loans, range, date(2024, 1, 10));
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.rut_user != "33333333-3"));
    }

    #[test]
    fn test_top_tools_ranking() {
        let loans = book();
        let rows = top_tools(&loans, DateRange::unbounded(), 10);
        assert_eq!(rows[0], RankingRow { tool_id: 1, times: 5 });
        assert_eq!(rows[1], RankingRow { tool_id: 2, times: 4 });

        assert_eq!(top_tools(&loans, DateRange::unbounded(), 0).len(), 1);
    }

    #[test]
    fn test_debt_and_restriction() {
        let loans = book();
        let debtors: Vec<LoanId> = loans_with_debt(&loans).iter().map(|l| l.id).collect();
        assert_eq!(debtors, vec![4]);

        let restriction = account_restriction(&loans[3..4], date(2024, 1, 7));
        assert!(restriction.is_restricted());
        assert_eq!(restriction.outstanding_debt, Money::from_major(2_000));

        let clean = account_restriction(&loans[1..2], date(2024, 1, 7));
        assert!(!clean.is_restricted());
    }
}
