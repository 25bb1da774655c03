/// return processing - validate a return form and preview the charges
use chrono::NaiveDate;
use toolrent_rs::{
    validate_return, Loan, Money, PenaltyConfig, PenaltyEngine, ReturnSelection, Tool, ToolCondition,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== return processing example ===\n");

    let loan: Loan = serde_json::from_str(
        r#"{"id": 12, "rutUser": "1-9", "reservationDate": "2024-01-01", "returnDate": "2024-01-04",
            "items": [{"toolId": 1, "toolNameSnapshot": "Taladro"},
                      {"toolId": 2, "toolNameSnapshot": "Sierra"},
                      {"toolId": 3, "toolNameSnapshot": "Lijadora"}]}"#,
    )?;
    let tools = vec![
        Tool::new(1, "Taladro", "Eléctricas", Money::from_major(40_000)),
        Tool::new(2, "Sierra", "Eléctricas", Money::from_major(30_000)),
        Tool::new(3, "Lijadora", "Eléctricas", Money::from_major(25_000)),
    ];

    // a conflicting form is refused before anything is sent
    let mut selection = ReturnSelection::from_states([(1, ToolCondition::Damaged)]);
    selection.mark_irreparable(1);
    match validate_return(&selection) {
        Ok(_) => println!("unexpected: conflicting form accepted"),
        Err(err) => println!("rejected: {}", err),
    }

    let mut selection = ReturnSelection::from_states([
        (1, ToolCondition::Damaged),
        (2, ToolCondition::Irreparable),
        (3, ToolCondition::Ok),
    ]);
    selection.set_repair_cost(1, Money::from_major(3_000));
    let validated = validate_return(&selection)?;

    let actual_return = NaiveDate::from_ymd_opt(2024, 1, 7).ok_or("bad date")?;
    let engine = PenaltyEngine::new(PenaltyConfig::new(Money::from_major(1_000)));
    let assessment = engine.assess(&loan, &validated, actual_return, &tools)?;

    println!("\nlate days: {}", assessment.late_days);
    println!("late fine: {}", assessment.late_fine.format_clp());
    println!("damage penalty: {}", assessment.damage_penalty.format_clp());
    for disposition in &assessment.dispositions {
        println!(
            "  tool {} -> {} ({})",
            disposition.tool_id,
            disposition.next_state,
            disposition.charge.format_clp()
        );
    }

    let request = validated.into_request(actual_return, Money::from_major(1_000));
    println!("\npayload: {}", serde_json::to_string_pretty(&request)?);

    Ok(())
}
