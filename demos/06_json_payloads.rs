/// json payloads - the bodies sent to the loan service
use chrono::NaiveDate;
use toolrent_rs::{CreateLoanRequest, Loan, Money, PayFinesRequest, RentalConfig, ReturnSelection, ToolCondition};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("toolrent_rs=debug"))
        .init();

    let config = RentalConfig::from_json_str(r#"{"pricing": {"daily_rate": 3000, "fine_per_day": 1000}}"#)?;
    println!("config: {}\n", serde_json::to_string(&config)?);

    let reservation = NaiveDate::from_ymd_opt(2024, 5, 2).ok_or("bad date")?;
    let agreed = NaiveDate::from_ymd_opt(2024, 5, 6).ok_or("bad date")?;

    let create = CreateLoanRequest::for_tools("7.654.321-k", reservation, agreed, [4, 9])?;
    println!("create loan:\n{}\n", serde_json::to_string_pretty(&create)?);

    let mut selection = ReturnSelection::from_states([(9, ToolCondition::Damaged)]);
    selection.set_repair_cost(9, Money::from_major(4_500));
    let actual = NaiveDate::from_ymd_opt(2024, 5, 8).ok_or("bad date")?;
    let ret = toolrent_rs::validate_return(&selection)?.into_request(actual, config.pricing.fine_per_day);
    println!("return loan:\n{}\n", serde_json::to_string_pretty(&ret)?);

    let loan: Loan = serde_json::from_str(
        r#"{"id": 3, "reservationDate": "2024-05-02", "returnDate": "2024-05-06", "lateReturnDate": "2024-05-08",
            "lateFine": 2000, "damagePenalty": 4500, "damagePenaltyPaid": true}"#,
    )?;
    let pay = PayFinesRequest::for_loan(&loan, true, true)?;
    println!("pay fines ({}):\n{}", pay.amount_for(&loan).format_clp(), serde_json::to_string(&pay)?);

    Ok(())
}
