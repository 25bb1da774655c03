use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::kardex::KardexEntry;
use crate::loan::{Loan, LoanItem};
use crate::penalty::{PenaltyConfig, PenaltyEngine};
use crate::receipt::rental_days;
use crate::requests::{CreateLoanRequest, PayFinesRequest, ReturnRequest};
use crate::returns::ValidatedReturn;
use crate::session::Credentials;
use crate::tools::{NewTool, Tool};
use crate::types::{LoanId, ToolCondition, ToolId, ToolState};

/// the loan, inventory and kardex services as the client consumes them
///
/// Failures are passed through unchanged; callers decide whether to retry.
pub trait RentalBackend {
    /// current per-day rental price
    fn daily_rate(&self, credentials: &Credentials) -> Result<Money>;

    /// every inventory bucket
    fn tools(&self, credentials: &Credentials) -> Result<Vec<Tool>>;

    /// buckets that can be lent right now
    fn available_tools(&self, credentials: &Credentials) -> Result<Vec<Tool>> {
        Ok(self
            .tools(credentials)?
            .into_iter()
            .filter(|tool| tool.in_stock())
            .collect())
    }

    /// all loans of one borrower
    fn loans(&self, credentials: &Credentials, rut_user: &str) -> Result<Vec<Loan>>;

    /// loans still out, for one borrower or everyone
    fn active_loans(&self, credentials: &Credentials, rut_user: Option<&str>) -> Result<Vec<Loan>>;

    fn kardex(&self, credentials: &Credentials) -> Result<Vec<KardexEntry>>;

    fn create_loan(&mut self, credentials: &Credentials, request: &CreateLoanRequest) -> Result<Loan>;

    fn return_loan(&mut self, credentials: &Credentials, loan_id: LoanId, request: &ReturnRequest) -> Result<Loan>;

    fn pay_fines(&mut self, credentials: &Credentials, loan_id: LoanId, request: &PayFinesRequest) -> Result<Loan>;
}

/// in-memory backend for testing
#[derive(Debug, Clone)]
pub struct MockBackend {
    daily_rate: Money,
    max_active_loans: usize,
    accepted_token: Option<String>,
    tools: Vec<Tool>,
    loans: Vec<Loan>,
    kardex: Vec<KardexEntry>,
    next_tool_id: ToolId,
    next_loan_id: LoanId,
    next_kardex_id: i64,
    fail_next: RefCell<Option<String>>,
}

impl MockBackend {
    pub fn new(daily_rate: Money) -> Self {
        Self {
            daily_rate,
            max_active_loans: 5,
            accepted_token: None,
            tools: Vec::new(),
            loans: Vec::new(),
            kardex: Vec::new(),
            next_tool_id: 1,
            next_loan_id: 1,
            next_kardex_id: 1,
            fail_next: RefCell::new(None),
        }
    }

    /// reject calls whose bearer token differs
    pub fn require_token(mut self, token: impl Into<String>) -> Self {
        self.accepted_token = Some(token.into());
        self
    }

    pub fn set_daily_rate(&mut self, daily_rate: Money) {
        self.daily_rate = daily_rate;
    }

    /// make the next call fail with a backend error
    pub fn fail_next_call(&mut self, message: impl Into<String>) {
        self.fail_next.replace(Some(message.into()));
    }

    /// register stock the way the inventory service does: same (name, category, state) merges
    pub fn add_tool(&mut self, tool: &NewTool, rut_user: &str, date: NaiveDate) -> Result<Tool> {
        tool.validate()?;

        let id = match self.find_bucket(&tool.name, &tool.category, tool.initial_state) {
            Some(index) => {
                let bucket = &mut self.tools[index];
                bucket.amount += tool.amount;
                bucket.reposition_value = tool.reposition_value;
                bucket.id
            }
            None => {
                let id = self.next_tool_id;
                self.next_tool_id += 1;
                self.tools.push(Tool {
                    id,
                    name: tool.name.clone(),
                    category: tool.category.clone(),
                    amount: tool.amount,
                    reposition_value: tool.reposition_value,
                    initial_state: tool.initial_state,
                    available: tool.initial_state == ToolState::Available,
                });
                id
            }
        };

        self.record_movement(id, rut_user, "Ingreso".to_string(), date, tool.amount as i32);
        self.tool(id).cloned()
    }

    /// seed a loan as-is
    pub fn insert_loan(&mut self, loan: Loan) {
        self.next_loan_id = self.next_loan_id.max(loan.id + 1);
        self.loans.push(loan);
    }

    pub fn loan(&self, loan_id: LoanId) -> Option<&Loan> {
        self.loans.iter().find(|loan| loan.id == loan_id)
    }

    pub fn tool(&self, tool_id: ToolId) -> Result<&Tool> {
        self.tools
            .iter()
            .find(|tool| tool.id == tool_id)
            .ok_or_else(|| RentalError::backend(format!("Tool not found (id={})", tool_id)))
    }

    pub fn movements(&self) -> &[KardexEntry] {
        &self.kardex
    }

    fn check(&self, credentials: &Credentials) -> Result<()> {
        if let Some(message) = self.fail_next.borrow_mut().take() {
            return Err(RentalError::backend(message));
        }
        match &self.accepted_token {
            Some(token) if token != credentials.token() => Err(RentalError::Unauthorized),
            _ => Ok(()),
        }
    }

    fn find_bucket(&self, name: &str, category: &str, state: ToolState) -> Option<usize> {
        self.tools
            .iter()
            .position(|t| t.name == name && t.category == category && t.initial_state == state)
    }

    fn bucket_key(&self, tool_id: ToolId) -> Result<(String, String)> {
        let tool = self.tool(tool_id)?;
        Ok((tool.name.clone(), tool.category.clone()))
    }

    /// move one unit from a bucket to the (name, category) bucket of `state`
    fn move_unit(&mut self, from: usize, state: ToolState, rut_user: &str, date: NaiveDate) -> Result<ToolId> {
        if self.tools[from].amount == 0 {
            return Err(RentalError::backend("No stock available"));
        }
        self.tools[from].amount -= 1;
        let (name, category, reposition_value) = {
            let source = &self.tools[from];
            (source.name.clone(), source.category.clone(), source.reposition_value)
        };

        let target = match self.find_bucket(&name, &category, state) {
            Some(index) => index,
            None => {
                let id = self.next_tool_id;
                self.next_tool_id += 1;
                self.tools.push(Tool {
                    id,
                    name,
                    category,
                    amount: 0,
                    reposition_value,
                    initial_state: state,
                    available: state == ToolState::Available,
                });
                self.tools.len() - 1
            }
        };

        self.tools[target].amount += 1;
        let (id, stock) = (self.tools[target].id, self.tools[target].amount);
        self.record_movement(id, rut_user, format!("Cambio de estado: {}", state), date, stock as i32);
        Ok(id)
    }

    fn record_movement(&mut self, tool_id: ToolId, rut_user: &str, movement_type: String, date: NaiveDate, stock: i32) {
        let (name, category) = match self.bucket_key(tool_id) {
            Ok(key) => key,
            Err(_) => return,
        };
        self.kardex.push(KardexEntry {
            id: self.next_kardex_id,
            tool_id,
            tool_name_snapshot: name,
            tool_category_snapshot: category,
            rut_user: rut_user.to_string(),
            movement_type,
            movement_date: date,
            stock,
        });
        self.next_kardex_id += 1;
    }

    fn loan_index(&self, loan_id: LoanId) -> Result<usize> {
        self.loans
            .iter()
            .position(|loan| loan.id == loan_id)
            .ok_or(RentalError::LoanNotFound { loan_id })
    }
}

impl RentalBackend for MockBackend {
    fn daily_rate(&self, credentials: &Credentials) -> Result<Money> {
        self.check(credentials)?;
        Ok(self.daily_rate)
    }

    fn tools(&self, credentials: &Credentials) -> Result<Vec<Tool>> {
        self.check(credentials)?;
        Ok(self.tools.clone())
    }

    fn loans(&self, credentials: &Credentials, rut_user: &str) -> Result<Vec<Loan>> {
        self.check(credentials)?;
        Ok(self.loans.iter().filter(|l| l.rut_user == rut_user).cloned().collect())
    }

    fn active_loans(&self, credentials: &Credentials, rut_user: Option<&str>) -> Result<Vec<Loan>> {
        self.check(credentials)?;
        Ok(self
            .loans
            .iter()
            .filter(|l| l.is_active() && rut_user.map_or(true, |rut| l.rut_user == rut))
            .cloned()
            .collect())
    }

    fn kardex(&self, credentials: &Credentials) -> Result<Vec<KardexEntry>> {
        self.check(credentials)?;
        Ok(self.kardex.clone())
    }

    fn create_loan(&mut self, credentials: &Credentials, request: &CreateLoanRequest) -> Result<Loan> {
        self.check(credentials)?;

        if request.return_date < request.reservation_date {
            return Err(RentalError::backend("Return date cannot be before reservation date."));
        }
        if request.items.is_empty() {
            return Err(RentalError::backend("At least one item is required."));
        }

        let active = self
            .loans
            .iter()
            .filter(|l| l.is_active() && l.rut_user == request.rut_user)
            .count();
        if active >= self.max_active_loans {
            return Err(RentalError::backend(format!(
                "User already has {} active loans.",
                self.max_active_loans
            )));
        }

        let mut lent_keys = HashSet::new();
        for loan in self.loans.iter().filter(|l| l.is_active() && l.rut_user == request.rut_user) {
            for tool_id in loan.tool_ids() {
                if let Ok(key) = self.bucket_key(tool_id) {
                    lent_keys.insert(key);
                }
            }
        }

        let mut seen = HashSet::new();
        for line in &request.items {
            if !seen.insert(line.tool_id) {
                return Err(RentalError::backend(format!("Tool repeated in the same loan: {}", line.tool_id)));
            }
            if line.quantity != 1 {
                return Err(RentalError::backend("Only one unit per tool is allowed."));
            }

            let tool = self.tool(line.tool_id)?;
            if tool.initial_state != ToolState::Available {
                return Err(RentalError::backend(format!("Tool id={} is not 'Disponible'.", tool.id)));
            }
            if tool.amount < line.quantity {
                return Err(RentalError::backend(format!(
                    "Not enough stock for tool id={}. Available: {}",
                    tool.id, tool.amount
                )));
            }
            if lent_keys.contains(&(tool.name.clone(), tool.category.clone())) {
                return Err(RentalError::backend(format!(
                    "User already has an active loan of this tool ({} - {}).",
                    tool.name, tool.category
                )));
            }
        }

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let index = self
                .tools
                .iter()
                .position(|t| t.id == line.tool_id)
                .ok_or_else(|| RentalError::backend(format!("Tool not found (id={})", line.tool_id)))?;
            let name = self.tools[index].name.clone();
            self.move_unit(index, ToolState::Lent, &request.rut_user, request.reservation_date)?;
            items.push(LoanItem::new(line.tool_id, name));
        }

        let days = rental_days(request.reservation_date, request.return_date);
        let loan = Loan {
            id: self.next_loan_id,
            rut_user: request.rut_user.clone(),
            reservation_date: request.reservation_date,
            return_date: request.return_date,
            late_return_date: None,
            total: self.daily_rate.times_days(days),
            late_fine: Money::ZERO,
            late_fine_paid: false,
            damage_penalty: Money::ZERO,
            damage_penalty_paid: false,
            items,
        };
        self.next_loan_id += 1;

        info!(loan_id = loan.id, rut_user = %loan.rut_user, total = %loan.total, "mock backend created loan");
        self.loans.push(loan.clone());
        Ok(loan)
    }

    fn return_loan(&mut self, credentials: &Credentials, loan_id: LoanId, request: &ReturnRequest) -> Result<Loan> {
        self.check(credentials)?;
        let index = self.loan_index(loan_id)?;
        let loan = self.loans[index].clone();

        if !loan.is_active() {
            return Err(RentalError::backend("Loan is already returned (closed)."));
        }

        let damaged: HashSet<ToolId> = request.damaged.iter().copied().collect();
        let irreparable: HashSet<ToolId> = request.irreparable.iter().copied().collect();
        let mut overlap: Vec<ToolId> = damaged.intersection(&irreparable).copied().collect();
        if !overlap.is_empty() {
            overlap.sort_unstable();
            return Err(RentalError::backend(format!(
                "A tool cannot be both damaged and irreparable: {:?}",
                overlap
            )));
        }

        let mut validated = ValidatedReturn {
            damaged: damaged.iter().copied().collect(),
            damaged_costs: Default::default(),
            irreparable: irreparable.iter().copied().collect(),
        };
        validated.damaged.sort_unstable();
        validated.irreparable.sort_unstable();
        for tool_id in &validated.damaged {
            let cost = request.damaged_costs.get(tool_id).copied().unwrap_or(Money::ZERO);
            validated.damaged_costs.insert(*tool_id, cost.non_negative());
        }

        let engine = PenaltyEngine::new(PenaltyConfig::new(request.fine_per_day));
        let assessment = engine
            .assess(&loan, &validated, request.actual_return_date, &self.tools)
            .map_err(|e| RentalError::backend(e.to_string()))?;

        for disposition in &assessment.dispositions {
            let (name, category) = self.bucket_key(disposition.tool_id)?;
            let lent = self
                .find_bucket(&name, &category, ToolState::Lent)
                .ok_or_else(|| RentalError::backend(format!("No lent unit of {} - {}", name, category)))?;
            self.move_unit(lent, disposition.next_state, &loan.rut_user, request.actual_return_date)?;
            if disposition.condition != ToolCondition::Ok {
                debug!(tool_id = disposition.tool_id, charge = %disposition.charge, "mock backend charged tool");
            }
        }

        let returned = assessment.apply_to(&loan);
        info!(
            loan_id,
            late_fine = %returned.late_fine,
            damage_penalty = %returned.damage_penalty,
            "mock backend closed loan"
        );
        self.loans[index] = returned.clone();
        Ok(returned)
    }

    fn pay_fines(&mut self, credentials: &Credentials, loan_id: LoanId, request: &PayFinesRequest) -> Result<Loan> {
        self.check(credentials)?;
        let index = self.loan_index(loan_id)?;
        let loan = &mut self.loans[index];

        if request.pay_late_fine && loan.late_fine.is_positive() {
            loan.late_fine_paid = true;
        }
        if request.pay_damage_penalty && loan.damage_penalty.is_positive() {
            loan.damage_penalty_paid = true;
        }
        Ok(loan.clone())
    }
}
