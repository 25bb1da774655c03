use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{LoanId, ToolId, ToolState};

/// everything the rental desk reports about the flows it runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // loan creation
    LoanCreated {
        loan_id: LoanId,
        rut_user: String,
        tool_ids: Vec<ToolId>,
        days: u32,
        rent_total: Money,
        repos_total: Money,
        timestamp: DateTime<Utc>,
    },
    LoanRejected {
        rut_user: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // returns
    LoanReturned {
        loan_id: LoanId,
        actual_return_date: NaiveDate,
        late_days: u32,
        late_fine: Money,
        damage_penalty: Money,
        timestamp: DateTime<Utc>,
    },
    /// state the return is expected to leave the tool in, taken from the local
    /// preview; the backend's inventory is the record of what actually happened
    ToolStateChanged {
        loan_id: LoanId,
        tool_id: ToolId,
        new_state: ToolState,
        charge: Money,
        timestamp: DateTime<Utc>,
    },
    ReturnRejected {
        loan_id: LoanId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // fines
    FinesPaid {
        loan_id: LoanId,
        amount: Money,
        late_fine: bool,
        damage_penalty: bool,
        timestamp: DateTime<Utc>,
    },

    BackendCallFailed {
        operation: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::LoanCreated { timestamp, .. }
            | Event::LoanRejected { timestamp, .. }
            | Event::LoanReturned { timestamp, .. }
            | Event::ToolStateChanged { timestamp, .. }
            | Event::ReturnRejected { timestamp, .. }
            | Event::FinesPaid { timestamp, .. }
            | Event::BackendCallFailed { timestamp, .. } => *timestamp,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
