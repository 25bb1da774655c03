pub mod backend;
pub mod config;
pub mod decimal;
pub mod desk;
pub mod errors;
pub mod events;
pub mod kardex;
pub mod loan;
pub mod penalty;
pub mod receipt;
pub mod reports;
pub mod requests;
pub mod returns;
pub mod session;
pub mod tools;
pub mod types;

// re-export key types
pub use backend::{MockBackend, RentalBackend};
pub use config::{ApiConfig, PricingConfig, RentalConfig, RentalLimits};
pub use decimal::Money;
pub use desk::RentalDesk;
pub use errors::{RentalError, Result};
pub use events::{Event, EventStore};
pub use kardex::{KardexEntry, KardexQuery};
pub use loan::{classify, classify_at, filter_loans, Loan, LoanItem};
pub use penalty::{PenaltyConfig, PenaltyEngine, ReturnAssessment, ToolDisposition};
pub use receipt::{compute_receipt, rental_days, Receipt, ReceiptLine};
pub use reports::{
    account_restriction, active_loan_report, loans_with_debt, overdue_clients, top_tools,
    AccountRestriction, ActiveLoanState, DateRange, OverdueClient, RankingRow,
};
pub use requests::{normalize_rut, CreateLoanRequest, LoanLine, PayFinesRequest, ReturnRequest};
pub use returns::{validate_return, ReturnSelection, ValidatedReturn};
pub use session::{Credentials, ScreenLifetime, StaticToken, Ticket, TokenProvider, Viewer};
pub use tools::{group_by_name_category, NewTool, Tool, ToolGroup};
pub use types::{LoanId, LoanStatus, StatusFilter, ToolCondition, ToolId, ToolState};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
