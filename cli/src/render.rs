//! Plain-text output.

use expensegrove_fx::table::PREVIEW_LEN;
use expensegrove_fx::{ExchangeRateService, RateRow, RatesTable, SortConfig};

const NAME_WIDTH: usize = 28;

/// Print the filtered, sorted table.
pub fn print_table(
    service: &ExchangeRateService,
    table: &RatesTable,
    search: &str,
    sort: SortConfig,
) {
    let heading = format!("{} {}", table.amount(), table.source());
    println!("{:<6}{:<width$}{:>14}  {}", "CODE", "NAME", "RATE", heading, width = NAME_WIDTH);

    let rows = table.view(search, sort);
    for row in &rows {
        println!(
            "{:<6}{:<width$}{:>14.4}  {}",
            row.code.code(),
            truncate(&row.name, NAME_WIDTH - 1),
            row.rate,
            converted_cell(service, row),
            width = NAME_WIDTH
        );
    }

    if rows.is_empty() && !search.is_empty() {
        println!("No currencies match \"{}\"", search);
    }
}

/// Print the short list of the first few other currencies.
pub fn print_preview(service: &ExchangeRateService, table: &RatesTable) {
    let preview = table.preview(PREVIEW_LEN);
    if preview.is_empty() {
        return;
    }

    println!();
    println!("{} {} is worth:", table.amount(), table.source());
    for row in preview {
        println!("  {:<6}{}", row.code.code(), converted_cell(service, row));
    }
}

/// Print a one-line summary of the store after a refresh.
pub fn print_refresh(service: &ExchangeRateService) {
    let stats = service.store().stats();
    let updated = stats
        .updated_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    println!(
        "Rates refreshed: {} currencies, generation {}, updated {}",
        stats.rate_count, stats.generation, updated
    );
}

fn converted_cell(service: &ExchangeRateService, row: &RateRow) -> String {
    match row.converted {
        Some(_) if row.failed => "unavailable".to_string(),
        Some(value) => service.format(value, Some(row.code.code())),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
