use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::RentalError;

/// backend identifier for a loan
pub type LoanId = i64;

/// backend identifier for a tool record (one stock bucket)
pub type ToolId = i64;

/// inventory state of a tool bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolState {
    /// on the shelf, can be lent
    #[serde(rename = "Disponible")]
    Available,
    /// currently lent out
    #[serde(rename = "Prestada")]
    Lent,
    /// returned damaged, awaiting repair
    #[serde(rename = "En reparación")]
    InRepair,
    /// written off
    #[serde(rename = "Dada de baja")]
    Decommissioned,
}

impl ToolState {
    pub const ALL: [ToolState; 4] = [
        ToolState::Available,
        ToolState::Lent,
        ToolState::InRepair,
        ToolState::Decommissioned,
    ];

    /// label used on the wire and in kardex movement types
    pub fn label(&self) -> &'static str {
        match self {
            ToolState::Available => "Disponible",
            ToolState::Lent => "Prestada",
            ToolState::InRepair => "En reparación",
            ToolState::Decommissioned => "Dada de baja",
        }
    }

    pub fn is_lendable(&self) -> bool {
        matches!(self, ToolState::Available)
    }
}

impl fmt::Display for ToolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ToolState {
    type Err = RentalError;

    /// case-insensitive, matching how the inventory service compares states
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ToolState::ALL
            .iter()
            .copied()
            .find(|state| state.label().to_lowercase() == wanted)
            .ok_or_else(|| RentalError::InvalidTool {
                message: format!("invalid state: {}", s),
            })
    }
}

/// condition of a returned tool, chosen per tool on the return form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCondition {
    #[default]
    Ok,
    Damaged,
    Irreparable,
}

/// derived status flags of a loan; flags are independent and may combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoanStatus {
    pub active: bool,
    pub overdue: bool,
    pub with_debt: bool,
    pub finished: bool,
}

impl LoanStatus {
    /// chip labels in display order
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.active {
            labels.push("Activo");
        }
        if self.overdue {
            labels.push("Atrasado");
        }
        if self.with_debt {
            labels.push("Con deuda");
        }
        if self.finished {
            labels.push("Finalizado");
        }
        labels
    }
}

/// status filter offered on the loan list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Finished,
    Overdue,
    Debt,
}

impl StatusFilter {
    pub fn matches(&self, status: &LoanStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => status.active,
            StatusFilter::Finished => status.finished,
            StatusFilter::Overdue => status.overdue,
            StatusFilter::Debt => status.with_debt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_state_wire_names() {
        assert_eq!(serde_json::to_string(&ToolState::InRepair).unwrap(), "\"En reparación\"");
        let state: ToolState = serde_json::from_str("\"Dada de baja\"").unwrap();
        assert_eq!(state, ToolState::Decommissioned);
    }

    #[test]
    fn test_tool_state_parse_ignores_case() {
        assert_eq!("disponible".parse::<ToolState>().unwrap(), ToolState::Available);
        assert_eq!(" PRESTADA ".parse::<ToolState>().unwrap(), ToolState::Lent);
        assert!("perdida".parse::<ToolState>().is_err());
    }

    #[test]
    fn test_condition_defaults_to_ok() {
        assert_eq!(ToolCondition::default(), ToolCondition::Ok);
        let c: ToolCondition = serde_json::from_str("\"irreparable\"").unwrap();
        assert_eq!(c, ToolCondition::Irreparable);
    }

    #[test]
    fn test_status_labels_combine() {
        let status = LoanStatus {
            active: false,
            overdue: false,
            with_debt: true,
            finished: true,
        };
        assert_eq!(status.labels(), vec!["Con deuda", "Finalizado"]);
    }

    #[test]
    fn test_status_filter() {
        let status = LoanStatus {
            active: true,
            overdue: true,
            with_debt: false,
            finished: false,
        };
        assert!(StatusFilter::All.matches(&status));
        assert!(StatusFilter::Overdue.matches(&status));
        assert!(!StatusFilter::Finished.matches(&status));
        assert!(!StatusFilter::Debt.matches(&status));
    }
}
