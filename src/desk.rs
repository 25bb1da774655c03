use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info, warn};

use crate::backend::RentalBackend;
use crate::config::RentalConfig;
use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::events::{Event, EventStore};
use crate::kardex::{KardexEntry, KardexQuery};
use crate::loan::{filter_loans, Loan};
use crate::penalty::{PenaltyConfig, PenaltyEngine, ReturnAssessment};
use crate::receipt::{compute_receipt, Receipt};
use crate::reports::account_restriction;
use crate::requests::{CreateLoanRequest, PayFinesRequest};
use crate::returns::{validate_return, ReturnSelection};
use crate::session::{Credentials, TokenProvider, Viewer};
use crate::tools::Tool;
use crate::types::StatusFilter;

/// runs the loan flows against a backend and records what happened
pub struct RentalDesk<B: RentalBackend, T: TokenProvider> {
    pub config: RentalConfig,
    pub events: EventStore,
    backend: B,
    tokens: T,
}

impl<B: RentalBackend, T: TokenProvider> RentalDesk<B, T> {
    pub fn new(config: RentalConfig, backend: B, tokens: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            events: EventStore::new(),
            backend,
            tokens,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn credentials(&self, time_provider: &SafeTimeProvider) -> Result<Credentials> {
        Credentials::acquire(&self.tokens, time_provider, self.config.api.token_min_validity())
    }

    /// run one backend call, recording a failure event if it does not go through
    fn call<R>(
        &mut self,
        operation: &str,
        time_provider: &SafeTimeProvider,
        f: impl FnOnce(&mut B, &Credentials) -> Result<R>,
    ) -> Result<R> {
        let result = self
            .credentials(time_provider)
            .and_then(|credentials| f(&mut self.backend, &credentials));

        if let Err(err) = &result {
            warn!(operation, error = %err, "backend call failed");
            self.events.emit(Event::BackendCallFailed {
                operation: operation.to_string(),
                message: err.to_string(),
                timestamp: time_provider.now(),
            });
        }
        result
    }

    /// receipt preview at the configured daily rate, before anything is sent
    pub fn preview_receipt(&self, reservation_date: NaiveDate, return_date: NaiveDate, tools: &[Tool]) -> Receipt {
        compute_receipt(reservation_date, return_date, self.config.pricing.daily_rate, tools)
    }

    /// tools the loan form may offer
    pub fn available_tools(&mut self, time_provider: &SafeTimeProvider) -> Result<Vec<Tool>> {
        self.call("available_tools", time_provider, |backend, credentials| {
            backend.available_tools(credentials)
        })
    }

    /// create a loan for `rut_user` and build its receipt
    pub fn create_loan(
        &mut self,
        rut_user: &str,
        reservation_date: NaiveDate,
        return_date: NaiveDate,
        tools: &[Tool],
        time_provider: &SafeTimeProvider,
    ) -> Result<(Loan, Receipt)> {
        let request = CreateLoanRequest::for_tools(
            rut_user,
            reservation_date,
            return_date,
            tools.iter().map(|tool| tool.id),
        )
        .map_err(|err| self.reject_loan(rut_user, err, time_provider))?;

        let today = time_provider.now().date_naive();
        let loans = self.call("loans", time_provider, |backend, credentials| {
            backend.loans(credentials, &request.rut_user)
        })?;

        if account_restriction(&loans, today).is_restricted() {
            let err = RentalError::AccountRestricted {
                rut_user: request.rut_user.clone(),
            };
            return Err(self.reject_loan(&request.rut_user, err, time_provider));
        }

        let limit = self.config.limits.max_active_loans;
        if loans.iter().filter(|loan| loan.is_active()).count() >= limit as usize {
            let err = RentalError::ActiveLoanLimit { limit };
            return Err(self.reject_loan(&request.rut_user, err, time_provider));
        }

        let daily_rate = self.call("daily_rate", time_provider, |backend, credentials| {
            backend.daily_rate(credentials)
        })?;
        let loan = self.call("create_loan", time_provider, |backend, credentials| {
            backend.create_loan(credentials, &request)
        })?;

        let receipt = compute_receipt(reservation_date, return_date, daily_rate, tools);
        info!(
            loan_id = loan.id,
            rut_user = %loan.rut_user,
            days = receipt.days,
            rent_total = %receipt.rent_total,
            repos_total = %receipt.repos_total,
            "loan created"
        );
        self.events.emit(Event::LoanCreated {
            loan_id: loan.id,
            rut_user: loan.rut_user.clone(),
            tool_ids: loan.tool_ids().collect(),
            days: receipt.days,
            rent_total: receipt.rent_total,
            repos_total: receipt.repos_total,
            timestamp: time_provider.now(),
        });

        Ok((loan, receipt))
    }

    fn reject_loan(&mut self, rut_user: &str, err: RentalError, time_provider: &SafeTimeProvider) -> RentalError {
        warn!(rut_user, error = %err, "loan rejected");
        self.events.emit(Event::LoanRejected {
            rut_user: rut_user.to_string(),
            reason: err.to_string(),
            timestamp: time_provider.now(),
        });
        err
    }

    /// what the return will cost, computed locally
    pub fn preview_return(
        &self,
        loan: &Loan,
        selection: &ReturnSelection,
        actual_return_date: NaiveDate,
        fine_per_day: Option<Money>,
        tools: &[Tool],
    ) -> Result<ReturnAssessment> {
        let validated = validate_return(selection)?;
        self.penalty_engine(fine_per_day)
            .assess(loan, &validated, actual_return_date, tools)
    }

    fn penalty_engine(&self, fine_per_day: Option<Money>) -> PenaltyEngine {
        let config = match fine_per_day {
            Some(fine) => PenaltyConfig::new(fine),
            None => self.config.penalty_config(),
        };
        PenaltyEngine::new(config)
    }

    /// close a loan; `fine_per_day` defaults to the configured fine
    pub fn return_loan(
        &mut self,
        loan: &Loan,
        selection: &ReturnSelection,
        actual_return_date: NaiveDate,
        fine_per_day: Option<Money>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        let validated = validate_return(selection)
            .and_then(|validated| validated.ensure_belongs_to(loan).map(|_| validated))
            .map_err(|err| {
                warn!(loan_id = loan.id, error = %err, "return rejected");
                self.events.emit(Event::ReturnRejected {
                    loan_id: loan.id,
                    reason: err.to_string(),
                    timestamp: time_provider.now(),
                });
                err
            })?;

        let preview = self
            .call("tools", time_provider, |backend, credentials| backend.tools(credentials))
            .and_then(|tools| {
                self.penalty_engine(fine_per_day)
                    .assess(loan, &validated, actual_return_date, &tools)
            });
        let preview = match preview {
            Ok(assessment) => Some(assessment),
            Err(err) => {
                debug!(loan_id = loan.id, error = %err, "no local return preview");
                None
            }
        };

        let fine = fine_per_day.unwrap_or(self.config.pricing.fine_per_day);
        let request = validated.into_request(actual_return_date, fine);
        let returned = self.call("return_loan", time_provider, |backend, credentials| {
            backend.return_loan(credentials, loan.id, &request)
        })?;

        let now = time_provider.now();
        if let Some(preview) = &preview {
            if preview.total_charges() != returned.late_fine + returned.damage_penalty {
                warn!(
                    loan_id = loan.id,
                    expected = %preview.total_charges(),
                    charged = %(returned.late_fine + returned.damage_penalty),
                    "backend charges differ from preview"
                );
            }
            for disposition in &preview.dispositions {
                self.events.emit(Event::ToolStateChanged {
                    loan_id: loan.id,
                    tool_id: disposition.tool_id,
                    new_state: disposition.next_state,
                    charge: disposition.charge,
                    timestamp: now,
                });
            }
        }

        info!(
            loan_id = returned.id,
            late_fine = %returned.late_fine,
            damage_penalty = %returned.damage_penalty,
            "loan returned"
        );
        self.events.emit(Event::LoanReturned {
            loan_id: returned.id,
            actual_return_date,
            late_days: preview.as_ref().map_or(0, |p| p.late_days),
            late_fine: returned.late_fine,
            damage_penalty: returned.damage_penalty,
            timestamp: now,
        });

        Ok(returned)
    }

    /// settle the selected unpaid amounts of a loan
    pub fn pay_fines(
        &mut self,
        loan: &Loan,
        pay_late_fine: bool,
        pay_damage_penalty: bool,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        let request = PayFinesRequest::for_loan(loan, pay_late_fine, pay_damage_penalty)?;
        let amount = request.amount_for(loan);

        let paid = self.call("pay_fines", time_provider, |backend, credentials| {
            backend.pay_fines(credentials, loan.id, &request)
        })?;

        info!(loan_id = loan.id, amount = %amount, "fines paid");
        self.events.emit(Event::FinesPaid {
            loan_id: loan.id,
            amount,
            late_fine: request.pay_late_fine,
            damage_penalty: request.pay_damage_penalty,
            timestamp: time_provider.now(),
        });
        Ok(paid)
    }

    /// active loans the viewer may see; admins may narrow by RUT
    pub fn active_loans(
        &mut self,
        viewer: &Viewer,
        rut_filter: Option<&str>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<Loan>> {
        let scope = viewer.scope_rut(rut_filter)?;
        self.call("active_loans", time_provider, |backend, credentials| {
            backend.active_loans(credentials, scope.as_deref())
        })
    }

    /// the viewer's own loans through a status filter
    pub fn my_loans(
        &mut self,
        viewer: &Viewer,
        filter: StatusFilter,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<Loan>> {
        let rut = viewer.own_rut()?.to_string();
        let loans = self.call("loans", time_provider, |backend, credentials| {
            backend.loans(credentials, &rut)
        })?;
        let today = time_provider.now().date_naive();
        Ok(filter_loans(&loans, filter, today).into_iter().cloned().collect())
    }

    pub fn kardex(&mut self, query: &KardexQuery, time_provider: &SafeTimeProvider) -> Result<Vec<KardexEntry>> {
        let entries = self.call("kardex", time_provider, |backend, credentials| backend.kardex(credentials))?;
        Ok(query.apply(&entries).into_iter().cloned().collect())
    }
}
