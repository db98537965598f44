use alerter::Alert;
use analytics::{DailyPrice, PriceSuggestion, Summary};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use rust_decimal::Decimal;

const NOT_AVAILABLE: &str = "N/A";

/// `$12.34`, or `N/A` when there is no value.
pub fn money(value: Option<Decimal>) -> String {
    value
        .map(|v| format!("${:.2}", v.round_dp(2)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// A signed percentage with one decimal, or `N/A`.
pub fn signed_pct(value: Option<Decimal>) -> String {
    match value {
        Some(v) => {
            let v = v.round_dp(1);
            let sign = if v.is_sign_negative() || v.is_zero() { "" } else { "+" };
            format!("{sign}{v:.1}%")
        }
        None => NOT_AVAILABLE.to_string(),
    }
}

fn pct(value: Option<Decimal>) -> String {
    value
        .map(|v| format!("{:.1}%", v.round_dp(1)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Headline figures of a summary.
pub fn summary_table(summary: &Summary) -> Table {
    let mut t = table(vec!["Metric", "Value"]);
    t.add_row(vec!["Window".to_string(), summary.window.to_string()]);
    t.add_row(vec!["Products".to_string(), summary.products_analyzed.to_string()]);
    t.add_row(vec![
        "Avg Margin".to_string(),
        format!("{} (over {})", pct(summary.average_margin), summary.margin_count),
    ]);
    t.add_row(vec!["Avg Diff vs Competitors".to_string(), signed_pct(summary.average_percent_diff)]);
    t.add_row(vec!["Winning Position".to_string(), pct(summary.winning_share_pct)]);
    let p = &summary.positions;
    t.add_row(vec![
        "Lowest / Competitive / Higher / No Data".to_string(),
        format!("{} / {} / {} / {}", p.lowest, p.competitive, p.higher, p.no_data),
    ]);
    t
}

/// The product performance table.
pub fn positions_table(summary: &Summary) -> Table {
    let mut t = table(vec![
        "Product", "SKU", "Your Price", "Comp Min", "Comp Avg", "Comp Max", "Diff %", "Margin %",
        "Position",
    ]);
    for row in &summary.rows {
        let p = &row.position;
        t.add_row(vec![
            Cell::new(&row.name),
            Cell::new(&row.sku),
            Cell::new(money(p.own_price)),
            Cell::new(money(p.competitor_min)),
            Cell::new(money(p.competitor_avg)),
            Cell::new(money(p.competitor_max)),
            Cell::new(signed_pct(p.percent_diff)),
            Cell::new(row.margin.to_string()),
            Cell::new(p.position.label()),
        ]);
    }
    t
}

/// Margin histogram bands, with the N/A products last.
pub fn margin_distribution_table(summary: &Summary) -> Table {
    let dist = &summary.margin_distribution;
    let mut t = table(vec!["Margin Band", "Products"]);
    for band in &dist.bands {
        t.add_row(vec![band.label(), band.count.to_string()]);
    }
    t.add_row(vec![NOT_AVAILABLE.to_string(), dist.undefined.to_string()]);
    t
}

pub fn categories_table(summary: &Summary) -> Table {
    let mut t = table(vec!["Category", "Products", "Avg Margin", "Lowest", "Competitive", "Higher", "No Data"]);
    for (name, c) in &summary.categories {
        t.add_row(vec![
            name.clone(),
            c.products.to_string(),
            pct(c.average_margin),
            c.positions.lowest.to_string(),
            c.positions.competitive.to_string(),
            c.positions.higher.to_string(),
            c.positions.no_data.to_string(),
        ]);
    }
    t
}

pub fn alerts_table(alerts: &[Alert]) -> Table {
    let mut t = table(vec!["Severity", "SKU", "Source", "Message"]);
    for alert in alerts {
        t.add_row(vec![
            alert.severity.to_string(),
            alert.sku.clone(),
            alert.source.as_ref().map(|s| s.to_string()).unwrap_or_default(),
            alert.message.clone(),
        ]);
    }
    t
}

pub fn suggestions_table(suggestions: &[PriceSuggestion]) -> Table {
    let mut t = table(vec!["Rule", "SKU", "Current", "Suggested", "Change", "Margin", "Limited By"]);
    for s in suggestions {
        t.add_row(vec![
            format!("#{}", s.rule_id),
            s.sku.clone(),
            money(Some(s.current_price)),
            money(Some(s.suggested_price)),
            signed_pct(s.change_pct),
            s.margin.to_string(),
            format!("{:?}", s.bound),
        ]);
    }
    t
}

pub fn history_table(points: &[DailyPrice]) -> Table {
    let mut t = table(vec!["Date", "Source", "Avg Price", "Samples"]);
    for point in points {
        t.add_row(vec![
            point.date.to_string(),
            point.source.to_string(),
            money(Some(point.average)),
            point.samples.to_string(),
        ]);
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn missing_values_render_as_na() {
        assert_eq!(money(None), "N/A");
        assert_eq!(signed_pct(None), "N/A");
        assert_eq!(pct(None), "N/A");
    }

    #[test]
    fn formats_money_and_percentages() {
        assert_eq!(money(Some(dec!(299.99))), "$299.99");
        assert_eq!(money(Some(dec!(110))), "$110.00");
        assert_eq!(signed_pct(Some(dec!(-9.0909))), "-9.1%");
        assert_eq!(signed_pct(Some(dec!(4.25))), "+4.2%");
        assert_eq!(signed_pct(Some(dec!(0))), "0.0%");
    }
}
