/// desk lifecycle - create, return and pay a loan against the mock backend
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use toolrent_rs::{
    MockBackend, Money, NewTool, RentalConfig, RentalDesk, ReturnSelection, SafeTimeProvider, StaticToken,
    TimeSource, ToolCondition, ToolState,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== desk lifecycle example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();
    let today = || time.now().date_naive();

    let config = RentalConfig::default();
    let mut backend = MockBackend::new(config.pricing.daily_rate);
    for (name, repo) in [("Taladro", 40_000), ("Sierra", 30_000)] {
        backend.add_tool(
            &NewTool {
                name: name.to_string(),
                category: "Eléctricas".to_string(),
                initial_state: ToolState::Available,
                reposition_value: Money::from_major(repo),
                amount: 3,
            },
            "11111111-1",
            today(),
        )?;
    }

    let mut desk = RentalDesk::new(config, backend, StaticToken::new("demo-token"))?;

    // create
    let tools = desk.available_tools(&time)?;
    let agreed: NaiveDate = today() + Duration::days(3);
    let (loan, receipt) = desk.create_loan("12.345.678-9", today(), agreed, &tools, &time)?;
    println!("loan {} for {}: {} days, rent {}", loan.id, loan.rut_user, receipt.days, receipt.rent_total.format_clp());

    // come back two days late with a broken saw
    controller.advance(Duration::days(5));
    let mut selection = ReturnSelection::new();
    selection.set_condition(tools[1].id, ToolCondition::Damaged);
    selection.set_repair_cost(tools[1].id, Money::from_major(6_000));

    let returned = desk.return_loan(&loan, &selection, today(), Some(Money::from_major(1_500)), &time)?;
    println!(
        "returned on {}: late fine {}, damage {}",
        today(),
        returned.late_fine.format_clp(),
        returned.damage_penalty.format_clp()
    );

    // pay everything
    let paid = desk.pay_fines(&returned, true, true, &time)?;
    println!("debt after payment: {}", paid.outstanding_debt().format_clp());

    println!("\nevents:");
    for event in desk.events.take_events() {
        println!("  {:?}", event);
    }

    Ok(())
}
