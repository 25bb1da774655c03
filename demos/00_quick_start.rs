/// quick start - price a loan and check its status
use chrono::NaiveDate;
use toolrent_rs::{classify, compute_receipt, Money, Tool};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let reservation: NaiveDate = "2024-01-01".parse()?;
    let agreed_return: NaiveDate = "2024-01-03".parse()?;

    let tools = vec![
        Tool::new(1, "Taladro", "Eléctricas", Money::from_major(10_000)),
        Tool::new(2, "Martillo", "Manuales", Money::from_major(5_000)),
    ];

    let receipt = compute_receipt(reservation, agreed_return, Money::from_major(2_500), &tools);
    println!("days: {}", receipt.days);
    println!("rent: {}", receipt.rent_total.format_clp());
    println!("reposition: {}", receipt.repos_total.format_clp());

    let loan: toolrent_rs::Loan = serde_json::from_str(
        r#"{"id": 1, "reservationDate": "2024-01-01", "returnDate": "2024-01-03", "lateFine": 5000}"#,
    )?;
    let status = classify(&loan, "2024-01-04".parse()?);
    println!("status on 2024-01-04: {:?}", status.labels());

    Ok(())
}
