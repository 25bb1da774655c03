use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::loan::Loan;
use crate::requests::ReturnRequest;
use crate::types::{ToolCondition, ToolId};

/// per-tool marks collected from the return form; damaged and irreparable are
/// independent sets, so only `validate_return` keeps them disjoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnSelection {
    damaged: BTreeSet<ToolId>,
    irreparable: BTreeSet<ToolId>,
    repair_costs: BTreeMap<ToolId, Money>,
}

impl ReturnSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// build from a condition per tool; `Ok` entries carry no mark
    pub fn from_states(states: impl IntoIterator<Item = (ToolId, ToolCondition)>) -> Self {
        let mut selection = Self::new();
        for (tool_id, condition) in states {
            selection.set_condition(tool_id, condition);
        }
        selection
    }

    /// set one tool's condition exclusively, as the form's checkboxes do;
    /// leaving `Damaged` drops the recorded repair cost
    pub fn set_condition(&mut self, tool_id: ToolId, condition: ToolCondition) {
        self.damaged.remove(&tool_id);
        self.irreparable.remove(&tool_id);
        match condition {
            ToolCondition::Ok => {
                self.repair_costs.remove(&tool_id);
            }
            ToolCondition::Damaged => {
                self.damaged.insert(tool_id);
            }
            ToolCondition::Irreparable => {
                self.repair_costs.remove(&tool_id);
                self.irreparable.insert(tool_id);
            }
        }
    }

    /// add a damaged mark without touching other marks
    pub fn mark_damaged(&mut self, tool_id: ToolId) {
        self.damaged.insert(tool_id);
    }

    /// add an irreparable mark without touching other marks
    pub fn mark_irreparable(&mut self, tool_id: ToolId) {
        self.irreparable.insert(tool_id);
    }

    pub fn set_repair_cost(&mut self, tool_id: ToolId, cost: Money) {
        self.repair_costs.insert(tool_id, cost);
    }

    pub fn clear(&mut self) {
        self.damaged.clear();
        self.irreparable.clear();
        self.repair_costs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.damaged.is_empty() && self.irreparable.is_empty()
    }
}

/// a selection that passed validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedReturn {
    /// ascending tool ids
    pub damaged: Vec<ToolId>,
    /// repair cost for every damaged id
    pub damaged_costs: BTreeMap<ToolId, Money>,
    /// ascending tool ids
    pub irreparable: Vec<ToolId>,
}

impl ValidatedReturn {
    pub fn condition_of(&self, tool_id: ToolId) -> ToolCondition {
        if self.irreparable.binary_search(&tool_id).is_ok() {
            ToolCondition::Irreparable
        } else if self.damaged.binary_search(&tool_id).is_ok() {
            ToolCondition::Damaged
        } else {
            ToolCondition::Ok
        }
    }

    pub fn repair_cost(&self, tool_id: ToolId) -> Money {
        self.damaged_costs.get(&tool_id).copied().unwrap_or(Money::ZERO)
    }

    pub fn total_repair_cost(&self) -> Money {
        self.damaged_costs.values().sum()
    }

    /// the loan must still be out and every marked tool must be one of its items
    pub fn ensure_belongs_to(&self, loan: &Loan) -> Result<()> {
        if !loan.is_active() {
            return Err(RentalError::LoanAlreadyReturned { loan_id: loan.id });
        }

        let unknown = self
            .damaged
            .iter()
            .chain(self.irreparable.iter())
            .find(|tool_id| !loan.contains_tool(**tool_id));

        match unknown {
            Some(tool_id) => Err(RentalError::UnknownTool {
                loan_id: loan.id,
                tool_id: *tool_id,
            }),
            None => Ok(()),
        }
    }

    /// return payload; a negative per-day fine is sent as zero
    pub fn into_request(self, actual_return_date: NaiveDate, fine_per_day: Money) -> ReturnRequest {
        ReturnRequest {
            actual_return_date,
            fine_per_day: fine_per_day.non_negative(),
            damaged: self.damaged,
            irreparable: self.irreparable,
            damaged_costs: self.damaged_costs,
        }
    }
}

/// check a return selection before it is sent
pub fn validate_return(selection: &ReturnSelection) -> Result<ValidatedReturn> {
    let conflicts: Vec<ToolId> = selection
        .damaged
        .intersection(&selection.irreparable)
        .copied()
        .collect();

    if !conflicts.is_empty() {
        warn!(tool_ids = ?conflicts, "return selection marks tools both damaged and irreparable");
        return Err(RentalError::ConflictingCondition { tool_ids: conflicts });
    }

    let mut damaged_costs = BTreeMap::new();
    for tool_id in &selection.damaged {
        let cost = selection.repair_costs.get(tool_id).copied().unwrap_or(Money::ZERO);
        if cost.is_negative() {
            return Err(RentalError::NegativeRepairCost {
                tool_id: *tool_id,
                cost,
            });
        }
        damaged_costs.insert(*tool_id, cost);
    }

    let validated = ValidatedReturn {
        damaged: selection.damaged.iter().copied().collect(),
        damaged_costs,
        irreparable: selection.irreparable.iter().copied().collect(),
    };

    debug!(
        damaged = validated.damaged.len(),
        irreparable = validated.irreparable.len(),
        repair_total = %validated.total_repair_cost(),
        "return selection validated"
    );

    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::fixtures::{active_loan, date};

    #[test]
    fn test_damaged_and_irreparable_partition() {
        let mut selection = ReturnSelection::from_states([
            (1, ToolCondition::Damaged),
            (2, ToolCondition::Irreparable),
        ]);
        selection.set_repair_cost(1, Money::from_major(3_000));

        let validated = validate_return(&selection).unwrap();
        assert_eq!(validated.damaged, vec![1]);
        assert_eq!(validated.repair_cost(1), Money::from_major(3_000));
        assert_eq!(validated.irreparable, vec![2]);
    }

    #[test]
    fn test_force_marked_conflict_names_tool() {
        let mut selection = ReturnSelection::from_states([(1, ToolCondition::Damaged)]);
        selection.mark_irreparable(1);

        assert_eq!(
            validate_return(&selection).unwrap_err(),
            RentalError::ConflictingCondition { tool_ids: vec![1] }
        );
    }

    #[test]
    fn test_conflict_lists_every_tool() {
        let mut selection = ReturnSelection::new();
        for id in [7, 3, 5] {
            selection.mark_damaged(id);
        }
        selection.mark_irreparable(7);
        selection.mark_irreparable(3);

        assert_eq!(
            validate_return(&selection).unwrap_err(),
            RentalError::ConflictingCondition { tool_ids: vec![3, 7] }
        );
    }

    #[test]
    fn test_missing_cost_defaults_to_zero() {
        let selection = ReturnSelection::from_states([(4, ToolCondition::Damaged), (5, ToolCondition::Ok)]);

        let validated = validate_return(&selection).unwrap();
        assert_eq!(validated.damaged_costs.get(&4), Some(&Money::ZERO));
        assert_eq!(validated.condition_of(5), ToolCondition::Ok);
    }

    #[test]
    fn test_negative_cost_rejected() {
        let mut selection = ReturnSelection::from_states([(4, ToolCondition::Damaged)]);
        selection.set_repair_cost(4, Money::from_major(-500));

        assert_eq!(
            validate_return(&selection).unwrap_err(),
            RentalError::NegativeRepairCost {
                tool_id: 4,
                cost: Money::from_major(-500),
            }
        );
    }

    #[test]
    fn test_switching_condition_drops_cost() {
        let mut selection = ReturnSelection::new();
        selection.set_condition(2, ToolCondition::Damaged);
        selection.set_repair_cost(2, Money::from_major(8_000));
        selection.set_condition(2, ToolCondition::Irreparable);

        let validated = validate_return(&selection).unwrap();
        assert!(validated.damaged.is_empty());
        assert!(validated.damaged_costs.is_empty());
        assert_eq!(validated.condition_of(2), ToolCondition::Irreparable);
    }

    #[test]
    fn test_cost_on_ok_tool_ignored() {
        let mut selection = ReturnSelection::new();
        selection.set_repair_cost(9, Money::from_major(1_000));

        let validated = validate_return(&selection).unwrap();
        assert!(validated.damaged_costs.is_empty());
        assert_eq!(validated.total_repair_cost(), Money::ZERO);
    }

    #[test]
    fn test_ensure_belongs_to_loan() {
        let loan = active_loan(10, "1-9", date(2024, 1, 1), date(2024, 1, 4));
        let selection = ReturnSelection::from_states([(2, ToolCondition::Damaged), (99, ToolCondition::Irreparable)]);
        let validated = validate_return(&selection).unwrap();

        assert_eq!(
            validated.ensure_belongs_to(&loan).unwrap_err(),
            RentalError::UnknownTool { loan_id: 10, tool_id: 99 }
        );

        let mut closed = loan.clone();
        closed.late_return_date = Some(date(2024, 1, 4));
        assert_eq!(
            ValidatedReturn::default().ensure_belongs_to(&closed).unwrap_err(),
            RentalError::LoanAlreadyReturned { loan_id: 10 }
        );
    }

    #[test]
    fn test_into_request_payload() {
        let mut selection = ReturnSelection::from_states([(1, ToolCondition::Damaged), (2, ToolCondition::Irreparable)]);
        selection.set_repair_cost(1, Money::from_major(3_000));
        let request = validate_return(&selection)
            .unwrap()
            .into_request(date(2024, 1, 8), Money::from_major(-100));

        assert_eq!(request.fine_per_day, Money::ZERO);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["actualReturnDate"], "2024-01-08");
        assert_eq!(json["damaged"], serde_json::json!([1]));
        assert_eq!(json["irreparable"], serde_json::json!([2]));
        assert_eq!(json["damagedCosts"]["1"], 3000);
    }
}
