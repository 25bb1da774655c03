/// reports - overdue clients, tool ranking, kardex search and grouped inventory
use chrono::NaiveDate;
use toolrent_rs::{
    active_loan_report, group_by_name_category, overdue_clients, top_tools, DateRange, KardexEntry, KardexQuery,
    Loan, Tool,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== reports example ===\n");

    let loans: Vec<Loan> = serde_json::from_str(
        r#"[
            {"id": 1, "rutUser": "11111111-1", "reservationDate": "2024-04-01", "returnDate": "2024-04-03",
             "items": [{"toolId": 1}, {"toolId": 2}]},
            {"id": 2, "rutUser": "22222222-2", "reservationDate": "2024-04-02", "returnDate": "2024-04-20",
             "items": [{"toolId": 1}]},
            {"id": 3, "rutUser": "11111111-1", "reservationDate": "2024-04-04", "returnDate": "2024-04-06",
             "items": [{"toolId": 3}]},
            {"id": 4, "rutUser": "33333333-3", "reservationDate": "2024-03-20", "returnDate": "2024-03-22",
             "lateReturnDate": "2024-03-22", "items": [{"toolId": 1}]}
        ]"#,
    )?;
    let today = NaiveDate::from_ymd_opt(2024, 4, 10).ok_or("bad date")?;
    let april = DateRange::new(NaiveDate::from_ymd_opt(2024, 4, 1), NaiveDate::from_ymd_opt(2024, 4, 30));

    println!("active loans in april:");
    for row in active_loan_report(&loans, april, today) {
        println!("  loan {} ({}) {}", row.loan.id, row.loan.rut_user, row.status);
    }

    println!("\noverdue clients:");
    for client in overdue_clients(&loans, april, today) {
        println!("  {} -> {}", client.rut_user, client.overdue_loans);
    }

    println!("\ntop tools (all time):");
    for row in top_tools(&loans, DateRange::unbounded(), 3) {
        println!("  tool {} lent {} times", row.tool_id, row.times);
    }

    let kardex: Vec<KardexEntry> = serde_json::from_str(
        r#"[
            {"id": 1, "toolId": 1, "toolNameSnapshot": "Taladro", "toolCategorySnapshot": "Eléctricas",
             "rutUser": "99999999-9", "type": "Ingreso", "movementDate": "2024-03-01", "stock": 4},
            {"id": 2, "toolId": 5, "toolNameSnapshot": "Taladro", "toolCategorySnapshot": "Eléctricas",
             "rutUser": "11111111-1", "type": "Cambio de estado: Prestada", "movementDate": "2024-04-01", "stock": 1}
        ]"#,
    )?;
    println!("\nkardex for 'tala':");
    for entry in KardexQuery::new().name("tala").apply(&kardex) {
        println!("  {} {} stock={}", entry.movement_date, entry.movement_type, entry.stock);
    }

    let inventory: Vec<Tool> = serde_json::from_str(
        r#"[
            {"id": 1, "name": "Taladro", "category": "Eléctricas", "amount": 3, "repositionValue": 40000, "initialState": "Disponible"},
            {"id": 5, "name": "Taladro", "category": "Eléctricas", "amount": 1, "repositionValue": 40000, "initialState": "Prestada"},
            {"id": 2, "name": "Martillo", "category": "Manuales", "amount": 6, "repositionValue": 8000, "initialState": "Disponible"}
        ]"#,
    )?;
    println!("\ninventory by name and category:");
    for group in group_by_name_category(&inventory) {
        println!("  {} ({}): {} units", group.name, group.category, group.amount);
    }

    Ok(())
}
