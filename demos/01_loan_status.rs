/// loan status - classify and filter a borrower's loans
use chrono::NaiveDate;
use toolrent_rs::{filter_loans, Loan, RentalLimits, StatusFilter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== loan status example ===\n");

    let loans: Vec<Loan> = serde_json::from_str(
        r#"[
            {"id": 1, "rutUser": "12345678-9", "reservationDate": "2024-03-01", "returnDate": "2024-03-10"},
            {"id": 2, "rutUser": "12345678-9", "reservationDate": "2024-02-01", "returnDate": "2024-02-05"},
            {"id": 3, "rutUser": "12345678-9", "reservationDate": "2024-01-01", "returnDate": "2024-01-04",
             "lateReturnDate": "2024-01-07", "lateFine": 3000, "lateFinePaid": false},
            {"id": 4, "rutUser": "12345678-9", "reservationDate": "2024-01-10", "returnDate": "2024-01-12",
             "lateReturnDate": "2024-01-12", "damagePenalty": 8000, "damagePenaltyPaid": true}
        ]"#,
    )?;

    let today = NaiveDate::from_ymd_opt(2024, 3, 5).ok_or("bad date")?;
    println!("today: {}\n", today);

    for loan in &loans {
        let status = loan.status(today);
        println!(
            "loan {}: {:<30} debt {}",
            loan.id,
            status.labels().join(", "),
            loan.outstanding_debt().format_clp()
        );
    }

    for filter in [StatusFilter::Active, StatusFilter::Overdue, StatusFilter::Debt, StatusFilter::Finished] {
        let ids: Vec<i64> = filter_loans(&loans, filter, today).iter().map(|l| l.id).collect();
        println!("{:?}: {:?}", filter, ids);
    }

    let limits = RentalLimits {
        page_size: 3,
        ..RentalLimits::default()
    };
    println!("\n{} pages of {}", limits.page_count(loans.len()), limits.page_size);
    for page in 0..limits.page_count(loans.len()) {
        let ids: Vec<i64> = limits.page(&loans, page).iter().map(|l| l.id).collect();
        println!("  page {}: {:?}", page + 1, ids);
    }

    Ok(())
}
