use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::types::{ToolId, ToolState};

/// one inventory bucket: a (name, category, state) with a stock count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: ToolId,
    pub name: String,
    pub category: String,
    /// stock count
    #[serde(default)]
    pub amount: u32,
    #[serde(default)]
    pub reposition_value: Money,
    pub initial_state: ToolState,
    #[serde(default)]
    pub available: bool,
}

impl Tool {
    pub fn new(id: ToolId, name: &str, category: &str, reposition_value: Money) -> Self {
        Self {
            id,
            name: name.to_string(),
            category: category.to_string(),
            amount: 1,
            reposition_value,
            initial_state: ToolState::Available,
            available: true,
        }
    }

    /// label used in pickers, e.g. `Taladro (Eléctricas)`
    pub fn display_label(&self) -> String {
        if self.category.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.category)
        }
    }

    pub fn in_stock(&self) -> bool {
        self.initial_state.is_lendable() && self.amount > 0
    }
}

/// display row for tools sharing a name and category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolGroup {
    /// id of the last record folded in; admin actions target it
    pub id: ToolId,
    pub name: String,
    pub category: String,
    pub amount: u32,
    pub reposition_value: Money,
}

/// group tools by (name, category), summing stock, in first-seen order
pub fn group_by_name_category(tools: &[Tool]) -> Vec<ToolGroup> {
    let mut groups: IndexMap<(&str, &str), ToolGroup> = IndexMap::new();

    for tool in tools {
        let group = groups
            .entry((tool.name.as_str(), tool.category.as_str()))
            .or_insert_with(|| ToolGroup {
                id: tool.id,
                name: tool.name.clone(),
                category: tool.category.clone(),
                amount: 0,
                reposition_value: tool.reposition_value,
            });
        group.amount += tool.amount;
        group.reposition_value = tool.reposition_value;
        group.id = tool.id;
    }

    groups.into_values().collect()
}

/// tools in the given state
pub fn filter_by_state(tools: &[Tool], state: ToolState) -> Vec<&Tool> {
    tools.iter().filter(|t| t.initial_state == state).collect()
}

/// tool-creation form, checked before it is sent to the inventory service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTool {
    pub name: String,
    pub category: String,
    pub initial_state: ToolState,
    pub reposition_value: Money,
    pub amount: u32,
}

impl NewTool {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RentalError::MissingField { field: "name".to_string() });
        }
        if self.category.trim().is_empty() {
            return Err(RentalError::MissingField { field: "category".to_string() });
        }
        if !self.reposition_value.is_positive() {
            return Err(RentalError::InvalidTool {
                message: "reposition value must be > 0".to_string(),
            });
        }
        if self.amount == 0 {
            return Err(RentalError::InvalidTool {
                message: "amount must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
