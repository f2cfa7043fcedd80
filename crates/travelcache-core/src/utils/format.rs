use chrono::Duration;

/// Format a duration as "{h} h, {m} m", dropping any leftover seconds.
pub fn format_hours_minutes(duration: Duration) -> String {
    let total_minutes = duration.num_minutes();
    format!("{} h, {} m", total_minutes / 60, total_minutes % 60)
}

/// Format a euro amount with two decimals: "€12.50"
pub fn format_euros(amount: f64) -> String {
    format!("€{:.2}", amount)
}

/// Format a CO2 quantity in kilograms with one decimal: "12.3 kg"
pub fn format_co2(kg: f64) -> String {
    format!("{:.1} kg", kg)
}
