use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::loan::Loan;
use crate::types::ToolId;

/// body of `POST /loan/{id}/return`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub actual_return_date: NaiveDate,
    pub fine_per_day: Money,
    pub damaged: Vec<ToolId>,
    pub irreparable: Vec<ToolId>,
    pub damaged_costs: BTreeMap<ToolId, Money>,
}

/// body of `POST /loan/{id}/pay-fines`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayFinesRequest {
    pub pay_late_fine: bool,
    pub pay_damage_penalty: bool,
}

impl PayFinesRequest {
    /// keep only the flags that settle an unpaid, positive amount on this loan
    pub fn for_loan(loan: &Loan, pay_late_fine: bool, pay_damage_penalty: bool) -> Result<Self> {
        let request = Self {
            pay_late_fine: pay_late_fine && loan.has_unpaid_late_fine(),
            pay_damage_penalty: pay_damage_penalty && loan.has_unpaid_damage_penalty(),
        };

        if request.is_empty() {
            return Err(RentalError::NothingToPay { loan_id: loan.id });
        }
        Ok(request)
    }

    pub fn is_empty(&self) -> bool {
        !self.pay_late_fine && !self.pay_damage_penalty
    }

    /// amount this request settles on the given loan
    pub fn amount_for(&self, loan: &Loan) -> Money {
        let mut amount = Money::ZERO;
        if self.pay_late_fine && loan.has_unpaid_late_fine() {
            amount += loan.late_fine;
        }
        if self.pay_damage_penalty && loan.has_unpaid_damage_penalty() {
            amount += loan.damage_penalty;
        }
        amount
    }
}

/// one requested tool of a new loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanLine {
    pub tool_id: ToolId,
    pub quantity: u32,
}

impl LoanLine {
    pub fn single(tool_id: ToolId) -> Self {
        Self { tool_id, quantity: 1 }
    }
}

/// loan creation: `rutUser`, dates and the item list; the backend validates again
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanRequest {
    pub rut_user: String,
    pub reservation_date: NaiveDate,
    pub return_date: NaiveDate,
    pub items: Vec<LoanLine>,
}

impl CreateLoanRequest {
    pub fn new(
        rut_user: &str,
        reservation_date: NaiveDate,
        return_date: NaiveDate,
        items: Vec<LoanLine>,
    ) -> Result<Self> {
        let rut_user = normalize_rut(rut_user);
        if rut_user.is_empty() {
            return Err(RentalError::MissingField { field: "rutUser".to_string() });
        }

        if return_date < reservation_date {
            return Err(RentalError::ReturnBeforeReservation {
                reservation_date,
                return_date,
            });
        }

        if items.is_empty() {
            return Err(RentalError::NoToolsSelected);
        }

        let mut seen = HashSet::new();
        for line in &items {
            if !seen.insert(line.tool_id) {
                return Err(RentalError::DuplicateTool { tool_id: line.tool_id });
            }
            if line.quantity != 1 {
                return Err(RentalError::InvalidQuantity {
                    tool_id: line.tool_id,
                    quantity: line.quantity,
                });
            }
        }

        Ok(Self {
            rut_user,
            reservation_date,
            return_date,
            items,
        })
    }

    /// one line per tool id, quantity one
    pub fn for_tools(
        rut_user: &str,
        reservation_date: NaiveDate,
        return_date: NaiveDate,
        tool_ids: impl IntoIterator<Item = ToolId>,
    ) -> Result<Self> {
        let items = tool_ids.into_iter().map(LoanLine::single).collect();
        Self::new(rut_user, reservation_date, return_date, items)
    }
}

/// canonical RUT form: no dots or spaces, upper-case, dash before the check digit
pub fn normalize_rut(rut: &str) -> String {
    let raw: String = rut
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();

    if raw.contains('-') || raw.chars().count() < 2 {
        return raw;
    }

    let split = raw.len() - raw.chars().last().map(char::len_utf8).unwrap_or(0);
    format!("{}-{}", &raw[..split], &raw[split..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::fixtures::{active_loan, date};

    #[test]
    fn test_create_request_rejects_reversed_dates() {
        let err = CreateLoanRequest::for_tools("12345678-9", date(2024, 1, 5), date(2024, 1, 4), [1]).unwrap_err();
        assert_eq!(
            err,
            RentalError::ReturnBeforeReservation {
                reservation_date: date(2024, 1, 5),
                return_date: date(2024, 1, 4),
            }
        );
    }

    #[test]
    fn test_create_request_rules() {
        let d = date(2024, 1, 1);
        assert_eq!(
            CreateLoanRequest::for_tools("12345678-9", d, d, Vec::<ToolId>::new()).unwrap_err(),
            RentalError::NoToolsSelected
        );
        assert_eq!(
            CreateLoanRequest::for_tools("12345678-9", d, d, [3, 4, 3]).unwrap_err(),
            RentalError::DuplicateTool { tool_id: 3 }
        );
        assert_eq!(
            CreateLoanRequest::new("12345678-9", d, d, vec![LoanLine { tool_id: 8, quantity: 2 }]).unwrap_err(),
            RentalError::InvalidQuantity { tool_id: 8, quantity: 2 }
        );
        assert!(matches!(
            CreateLoanRequest::for_tools("  ", d, d, [1]),
            Err(RentalError::MissingField { .. })
        ));
    }

    #[test]
    fn test_create_request_payload() {
        let request = CreateLoanRequest::for_tools("12.345.678-k", date(2024, 1, 1), date(2024, 1, 3), [5, 9]).unwrap();
        assert_eq!(request.rut_user, "12345678-K");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["rutUser"], "12345678-K");
        assert_eq!(json["reservationDate"], "2024-01-01");
        assert_eq!(json["returnDate"], "2024-01-03");
        assert_eq!(json["items"][1]["toolId"], 9);
        assert_eq!(json["items"][1]["quantity"], 1);
    }

    #[test]
    fn test_normalize_rut() {
        assert_eq!(normalize_rut("12.345.678-9"), "12345678-9");
        assert_eq!(normalize_rut("123456789"), "12345678-9");
        assert_eq!(normalize_rut("7654321k"), "7654321-K");
        assert_eq!(normalize_rut("1"), "1");
        assert_eq!(normalize_rut(""), "");
    }

    #[test]
    fn test_pay_fines_masks_settled_amounts() {
        let mut loan = active_loan(4, "1-9", date(2024, 1, 1), date(2024, 1, 2));
        loan.late_return_date = Some(date(2024, 1, 6));
        loan.late_fine = Money::from_major(4_000);
        loan.damage_penalty = Money::from_major(9_000);
        loan.damage_penalty_paid = true;

        let request = PayFinesRequest::for_loan(&loan, true, true).unwrap();
        assert!(request.pay_late_fine);
        assert!(!request.pay_damage_penalty);
        assert_eq!(request.amount_for(&loan), Money::from_major(4_000));
    }

    #[test]
    fn test_pay_fines_nothing_selected() {
        let mut loan = active_loan(4, "1-9", date(2024, 1, 1), date(2024, 1, 2));
        loan.late_fine = Money::from_major(4_000);

        assert_eq!(
            PayFinesRequest::for_loan(&loan, false, true).unwrap_err(),
            RentalError::NothingToPay { loan_id: 4 }
        );
    }

    #[test]
    fn test_pay_fines_json() {
        let request = PayFinesRequest { pay_late_fine: true, pay_damage_penalty: false };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"payLateFine":true,"payDamagePenalty":false}"#
        );
    }
}
