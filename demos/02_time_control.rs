/// time control - watch a loan turn overdue with controlled time
use chrono::{Duration, TimeZone, Utc};
use toolrent_rs::{classify_at, Loan, SafeTimeProvider, TimeSource};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== time control example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let loan: Loan = serde_json::from_str(
        r#"{"id": 7, "rutUser": "1-9", "reservationDate": "2024-01-01", "returnDate": "2024-01-03"}"#,
    )?;

    for _ in 0..4 {
        let status = classify_at(&loan, &time);
        println!(
            "{}: overdue={} labels={:?}",
            time.now().format("%Y-%m-%d"),
            status.overdue,
            status.labels()
        );
        controller.advance(Duration::days(1));
    }

    Ok(())
}
