use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::ToolId;

/// one inventory movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KardexEntry {
    pub id: i64,
    pub tool_id: ToolId,
    #[serde(default)]
    pub tool_name_snapshot: String,
    #[serde(default)]
    pub tool_category_snapshot: String,
    #[serde(default)]
    pub rut_user: String,
    /// free-form label, e.g. `Ingreso` or `Cambio de estado: Prestada`
    #[serde(rename = "type")]
    pub movement_type: String,
    pub movement_date: NaiveDate,
    #[serde(default)]
    pub stock: i32,
}

/// kardex search form; blank text fields do not filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KardexQuery {
    pub tool_id: Option<ToolId>,
    pub rut_user: Option<String>,
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl KardexQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(mut self, tool_id: ToolId) -> Self {
        self.tool_id = Some(tool_id);
        self
    }

    pub fn rut_user(mut self, rut_user: impl Into<String>) -> Self {
        self.rut_user = Some(rut_user.into());
        self
    }

    pub fn movement_type(mut self, movement_type: impl Into<String>) -> Self {
        self.movement_type = Some(movement_type.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// inclusive on both ends; either bound may be open
    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn matches(&self, entry: &KardexEntry) -> bool {
        if self.tool_id.is_some_and(|id| id != entry.tool_id) {
            return false;
        }
        if let Some(rut) = non_blank(&self.rut_user) {
            if rut != entry.rut_user {
                return false;
            }
        }
        if let Some(kind) = non_blank(&self.movement_type) {
            if kind.to_lowercase() != entry.movement_type.to_lowercase() {
                return false;
            }
        }
        if let Some(name) = non_blank(&self.name) {
            if !contains_ignore_case(&entry.tool_name_snapshot, name) {
                return false;
            }
        }
        if let Some(category) = non_blank(&self.category) {
            if !contains_ignore_case(&entry.tool_category_snapshot, category) {
                return false;
            }
        }
        if self.start.is_some_and(|start| entry.movement_date < start) {
            return false;
        }
        if self.end.is_some_and(|end| entry.movement_date > end) {
            return false;
        }
        true
    }

    /// matching entries, newest movement first
    pub fn apply<'a>(&self, entries: &'a [KardexEntry]) -> Vec<&'a KardexEntry> {
        let mut hits: Vec<&KardexEntry> = entries.iter().filter(|e| self.matches(e)).collect();
        hits.sort_by(|a, b| b.movement_date.cmp(&a.movement_date));
        hits
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
