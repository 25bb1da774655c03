use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::loan::Loan;
use crate::returns::ValidatedReturn;
use crate::tools::Tool;
use crate::types::{LoanId, ToolCondition, ToolId, ToolState};

/// penalty configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// fine charged per day past the agreed return date; negative values act as zero
    pub fine_per_day: Money,
}

impl PenaltyConfig {
    pub fn new(fine_per_day: Money) -> Self {
        Self { fine_per_day }
    }

    /// the per-day fine actually applied
    pub fn effective_fine_per_day(&self) -> Money {
        self.fine_per_day.non_negative()
    }
}

/// previews what the loan service will charge when a loan comes back
pub struct PenaltyEngine {
    pub config: PenaltyConfig,
}

impl PenaltyEngine {
    pub fn new(config: PenaltyConfig) -> Self {
        Self { config }
    }

    /// days between the agreed and the actual return date, zero when on time
    pub fn late_days(&self, agreed_return_date: NaiveDate, actual_return_date: NaiveDate) -> u32 {
        let days = (actual_return_date - agreed_return_date).num_days();
        days.clamp(0, u32::MAX as i64) as u32
    }

    pub fn calculate_late_fine(&self, agreed_return_date: NaiveDate, actual_return_date: NaiveDate) -> LateFine {
        let late_days = self.late_days(agreed_return_date, actual_return_date);
        let fine_per_day = self.config.effective_fine_per_day();

        LateFine {
            late_days,
            fine_per_day,
            amount: fine_per_day.times_days(late_days),
        }
    }

    /// full return preview for a loan still out
    ///
    /// Irreparable tools are charged their reposition value and written off,
    /// damaged tools are charged their repair cost and sent to repair, the
    /// rest go back on the shelf. Every loan item must appear in `tools`.
    pub fn assess(
        &self,
        loan: &Loan,
        selection: &ValidatedReturn,
        actual_return_date: NaiveDate,
        tools: &[Tool],
    ) -> Result<ReturnAssessment> {
        selection.ensure_belongs_to(loan)?;

        let by_id: HashMap<ToolId, &Tool> = tools.iter().map(|tool| (tool.id, tool)).collect();
        let mut damage_penalty = Money::ZERO;
        let mut dispositions = Vec::with_capacity(loan.items.len());

        for tool_id in loan.tool_ids() {
            let tool = by_id.get(&tool_id).ok_or_else(|| RentalError::InvalidTool {
                message: format!("tool {} not found in inventory", tool_id),
            })?;

            let condition = selection.condition_of(tool_id);
            let (charge, next_state) = match condition {
                ToolCondition::Irreparable => (tool.reposition_value.non_negative(), ToolState::Decommissioned),
                ToolCondition::Damaged => (selection.repair_cost(tool_id).non_negative(), ToolState::InRepair),
                ToolCondition::Ok => (Money::ZERO, ToolState::Available),
            };

            damage_penalty += charge;
            dispositions.push(ToolDisposition {
                tool_id,
                condition,
                charge,
                next_state,
            });
        }

        let late = self.calculate_late_fine(loan.return_date, actual_return_date);

        Ok(ReturnAssessment {
            loan_id: loan.id,
            actual_return_date,
            late_days: late.late_days,
            late_fine: late.amount,
            damage_penalty,
            dispositions,
        })
    }
}

/// late fine calculation result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateFine {
    pub late_days: u32,
    pub fine_per_day: Money,
    pub amount: Money,
}

/// what happens to one tool of the returned loan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDisposition {
    pub tool_id: ToolId,
    pub condition: ToolCondition,
    pub charge: Money,
    pub next_state: ToolState,
}

/// preview of a return
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnAssessment {
    pub loan_id: LoanId,
    pub actual_return_date: NaiveDate,
    pub late_days: u32,
    pub late_fine: Money,
    pub damage_penalty: Money,
    /// in loan item order
    pub dispositions: Vec<ToolDisposition>,
}

impl ReturnAssessment {
    pub fn total_charges(&self) -> Money {
        self.late_fine + self.damage_penalty
    }

    /// the loan as the service should report it once the return goes through
    pub fn apply_to(&self, loan: &Loan) -> Loan {
        let mut returned = loan.clone();
        returned.late_return_date = Some(self.actual_return_date);
        returned.late_fine = self.late_fine;
        returned.damage_penalty = self.damage_penalty;
        if self.late_fine.is_positive() {
            returned.late_fine_paid = false;
        }
        if self.damage_penalty.is_positive() {
            returned.damage_penalty_paid = false;
        }
        returned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::fixtures::{active_loan, date};
    use crate::returns::{validate_return, ReturnSelection};

    fn inventory() -> Vec<Tool> {
        vec![
            Tool::new(1, "Taladro", "Eléctricas", Money::from_major(40_000)),
            Tool::new(2, "Martillo", "Manuales", Money::from_major(8_000)),
        ]
    }

    fn engine(fine: i64) -> PenaltyEngine {
        PenaltyEngine::new(PenaltyConfig::new(Money::from_major(fine)))
    }

    #[test]
    fn test_on_time_return_has_no_fine() {
        let loan = active_loan(1, "1-9", date(2024, 1, 1), date(2024, 1, 5));
        let result = engine(1_000)
            .assess(&loan, &ValidatedReturn::default(), date(2024, 1, 5), &inventory())
            .unwrap();

        assert_eq!(result.late_days, 0);
        assert_eq!(result.late_fine, Money::ZERO);
        assert_eq!(result.damage_penalty, Money::ZERO);
        assert!(result.dispositions.iter().all(|d| d.next_state == ToolState::Available));
    }

    #[test]
    fn test_early_return_is_not_negative() {
        let fine = engine(1_000).calculate_late_fine(date(2024, 1, 10), date(2024, 1, 7));
        assert_eq!(fine.late_days, 0);
        assert_eq!(fine.amount, Money::ZERO);
    }

    #[test]
    fn test_late_fine_per_day() {
        let fine = engine(1_500).calculate_late_fine(date(2024, 1, 5), date(2024, 1, 9));
        assert_eq!(fine.late_days, 4);
        assert_eq!(fine.amount, Money::from_major(6_000));
    }

    #[test]
    fn test_negative_fine_rate_acts_as_zero() {
        let fine = engine(-200).calculate_late_fine(date(2024, 1, 5), date(2024, 1, 9));
        assert_eq!(fine.fine_per_day, Money::ZERO);
        assert_eq!(fine.amount, Money::ZERO);
    }

    #[test]
    fn test_damage_penalty_and_dispositions() {
        let loan = active_loan(3, "1-9", date(2024, 1, 1), date(2024, 1, 5));
        let mut selection = ReturnSelection::from_states([
            (1, ToolCondition::Irreparable),
            (2, ToolCondition::Damaged),
        ]);
        selection.set_repair_cost(2, Money::from_major(3_000));
        let validated = validate_return(&selection).unwrap();

        let result = engine(1_000)
            .assess(&loan, &validated, date(2024, 1, 7), &inventory())
            .unwrap();

        assert_eq!(result.late_days, 2);
        assert_eq!(result.late_fine, Money::from_major(2_000));
        assert_eq!(result.damage_penalty, Money::from_major(43_000));
        assert_eq!(result.total_charges(), Money::from_major(45_000));

        assert_eq!(result.dispositions[0].next_state, ToolState::Decommissioned);
        assert_eq!(result.dispositions[0].charge, Money::from_major(40_000));
        assert_eq!(result.dispositions[1].next_state, ToolState::InRepair);
        assert_eq!(result.dispositions[1].charge, Money::from_major(3_000));
    }

    #[test]
    fn test_missing_inventory_record() {
        let loan = active_loan(3, "1-9", date(2024, 1, 1), date(2024, 1, 5));
        let tools = vec![Tool::new(1, "Taladro", "Eléctricas", Money::from_major(40_000))];

        let err = engine(0)
            .assess(&loan, &ValidatedReturn::default(), date(2024, 1, 5), &tools)
            .unwrap_err();
        assert!(matches!(err, RentalError::InvalidTool { .. }));
    }

    #[test]
    fn test_assess_rejects_returned_loan() {
        let mut loan = active_loan(3, "1-9", date(2024, 1, 1), date(2024, 1, 5));
        loan.late_return_date = Some(date(2024, 1, 5));

        assert_eq!(
            engine(0)
                .assess(&loan, &ValidatedReturn::default(), date(2024, 1, 6), &inventory())
                .unwrap_err(),
            RentalError::LoanAlreadyReturned { loan_id: 3 }
        );
    }

    #[test]
    fn test_apply_to_closes_loan() {
        let loan = active_loan(3, "1-9", date(2024, 1, 1), date(2024, 1, 5));
        let result = engine(500)
            .assess(&loan, &ValidatedReturn::default(), date(2024, 1, 8), &inventory())
            .unwrap();

        let returned = result.apply_to(&loan);
        assert!(!returned.is_active());
        assert_eq!(returned.late_fine, Money::from_major(1_500));
        assert!(returned.has_unpaid_late_fine());
        assert!(!returned.has_unpaid_damage_penalty());
    }
}
