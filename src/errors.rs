use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{LoanId, ToolId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RentalError {
    #[error("a tool cannot be both damaged and irreparable: {tool_ids:?}")]
    ConflictingCondition {
        tool_ids: Vec<ToolId>,
    },

    #[error("repair cost for tool {tool_id} cannot be negative: {cost}")]
    NegativeRepairCost {
        tool_id: ToolId,
        cost: Money,
    },

    #[error("return date {return_date} cannot be before reservation date {reservation_date}")]
    ReturnBeforeReservation {
        reservation_date: NaiveDate,
        return_date: NaiveDate,
    },

    #[error("at least one tool must be selected")]
    NoToolsSelected,

    #[error("tool repeated in the same loan: {tool_id}")]
    DuplicateTool {
        tool_id: ToolId,
    },

    #[error("only one unit per tool is allowed: tool {tool_id}, quantity {quantity}")]
    InvalidQuantity {
        tool_id: ToolId,
        quantity: u32,
    },

    #[error("{field} is required")]
    MissingField {
        field: String,
    },

    #[error("tool {tool_id} is not part of loan {loan_id}")]
    UnknownTool {
        loan_id: LoanId,
        tool_id: ToolId,
    },

    #[error("loan {loan_id} is already returned")]
    LoanAlreadyReturned {
        loan_id: LoanId,
    },

    #[error("loan {loan_id} has no unpaid fine or penalty selected")]
    NothingToPay {
        loan_id: LoanId,
    },

    #[error("user already has {limit} active loans")]
    ActiveLoanLimit {
        limit: u32,
    },

    #[error("account {rut_user} is restricted: overdue loans or unpaid fines")]
    AccountRestricted {
        rut_user: String,
    },

    #[error("invalid tool: {message}")]
    InvalidTool {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("loan {loan_id} not found")]
    LoanNotFound {
        loan_id: LoanId,
    },

    #[error("not authenticated")]
    Unauthorized,

    #[error("backend error: {message}")]
    Backend {
        message: String,
    },
}

impl RentalError {
    /// errors raised by client-side checks, as opposed to failures passed through from the backend
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            RentalError::Backend { .. } | RentalError::Unauthorized | RentalError::LoanNotFound { .. }
        )
    }

    pub fn backend(message: impl Into<String>) -> Self {
        RentalError::Backend {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RentalError>;
