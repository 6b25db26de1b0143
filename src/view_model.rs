//! Chart-ready views of the query results: labelled series, titles, colours and number
//! formatting. Ordering always follows the aggregate it was built from.

use std::fmt::Write as _;

use crate::filter::{MallFilter, YearFilter};
use crate::query::{
    Breakdown, MallCategoryQuantity, MallExtremes, MallGenderCounts, MallsReport, SalesReport,
    SalesTimeline, SummaryCards,
};

/// Categorical palette cycled over the entries of a chart.
pub const PALETTE: [&str; 6] = [
    "#1879F4", "#FFED8F", "#2ED381", "#EC3636", "#32E0C4", "#FBA408",
];
pub const MALL_SALES_COLOR: &str = "#1879F4";
/// Highlight for the most recent year in the yearly sales chart.
pub const LATEST_YEAR_COLOR: &str = "#008B8B";
pub const NO_DATA: &str = "No data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Line,
    /// Parts of a whole (drawn as a donut in the original dashboard).
    Share,
    /// One bar per series inside each category.
    GroupedBar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesView {
    pub name: String,
    pub values: Vec<f64>,
    /// One colour per value (hex).
    pub colors: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    /// File stem used when exporting.
    pub slug: &'static str,
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<SeriesView>,
}

impl ChartView {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() || self.series.iter().all(|s| s.values.is_empty())
    }

    pub fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold(0.0, f64::max)
    }

    /// Bar annotations: SI short form, or percent of the total for share charts.
    pub fn value_labels(&self, series: usize) -> Vec<String> {
        let Some(s) = self.series.get(series) else {
            return Vec::new();
        };
        match self.kind {
            ChartKind::Share => {
                let total: f64 = s.values.iter().sum();
                s.values
                    .iter()
                    .map(|v| format_percent(*v, total))
                    .collect()
            }
            _ => s.values.iter().map(|v| format_si(*v, 4)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub title: String,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

/// Everything the Sales page draws.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesPage {
    pub filter_label: String,
    pub cards: Vec<CardView>,
    pub timeline: ChartView,
    pub gender: ChartView,
    pub category: ChartView,
    pub payment: ChartView,
    pub malls: ChartView,
}

impl SalesPage {
    pub fn from_report(report: &SalesReport) -> Self {
        Self {
            filter_label: report.year.label(),
            cards: summary_cards_view(&report.cards),
            timeline: timeline_chart(&report.timeline),
            gender: gender_chart(&report.gender, report.year),
            category: category_chart(&report.category, report.year),
            payment: payment_chart(&report.payment, report.year),
            malls: mall_sales_chart(&report.malls, report.year),
        }
    }

    pub fn charts(&self) -> Vec<&ChartView> {
        vec![
            &self.timeline,
            &self.gender,
            &self.category,
            &self.payment,
            &self.malls,
        ]
    }
}

/// Everything the Malls page draws.
#[derive(Debug, Clone, PartialEq)]
pub struct MallsPage {
    pub cards: Vec<CardView>,
    pub gender: ChartView,
    pub category: ChartView,
    pub category_table: TableView,
}

impl MallsPage {
    pub fn from_report(report: &MallsReport) -> Self {
        Self {
            cards: extremes_cards_view(report.extremes.as_ref()),
            gender: gender_by_mall_chart(&report.gender, &report.malls),
            category: category_by_mall_chart(&report.category, &report.malls),
            category_table: category_by_mall_table(&report.category, &report.malls),
        }
    }

    pub fn charts(&self) -> Vec<&ChartView> {
        vec![&self.gender, &self.category]
    }
}

// ---- number formatting ----

/// Rounds to a whole number and groups thousands with commas: `1234567.8` -> `1,234,568`.
pub fn format_thousands(v: f64) -> String {
    let rounded = v.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// SI short form with `digits` significant digits, trailing zeros trimmed: `1234567` -> `1.235M`.
pub fn format_si(v: f64, digits: usize) -> String {
    const PREFIXES: [&str; 5] = ["", "k", "M", "G", "T"];
    if v == 0.0 || !v.is_finite() {
        return "0".to_string();
    }
    let digits = digits.max(1) as i32;
    let mut idx = ((v.abs().log10() / 3.0).floor() as i32).clamp(0, 4) as usize;
    let mut scaled = v / 1000f64.powi(idx as i32);

    let decimals = |s: f64| (digits - 1 - s.abs().log10().floor() as i32).max(0) as usize;
    let mut text = format!("{:.*}", decimals(scaled), scaled);
    // Rounding can carry into the next prefix (999.96 -> 1000.0).
    if text.trim_start_matches('-').parse::<f64>().unwrap_or(0.0) >= 1000.0 && idx < 4 {
        idx += 1;
        scaled = v / 1000f64.powi(idx as i32);
        text = format!("{:.*}", decimals(scaled), scaled);
    }

    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("{}{}", text, PREFIXES[idx])
}

pub fn format_percent(v: f64, total: f64) -> String {
    if total == 0.0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", v / total * 100.0)
}

// ---- titles ----

fn year_suffix(year: YearFilter, joiner: &str) -> String {
    match year {
        YearFilter::All => String::new(),
        YearFilter::Year(y) => format!(" {} {}", joiner, y),
    }
}

pub fn timeline_title(timeline: &SalesTimeline) -> String {
    match timeline {
        SalesTimeline::Yearly(_) => "Total Sales Per Year".to_string(),
        SalesTimeline::Monthly { year, .. } => format!("Total Sales Per Month via Year {}", year),
    }
}

pub fn gender_title(year: YearFilter) -> String {
    format!("Total Sales Per Gender{}", year_suffix(year, "via Year"))
}

pub fn category_title(year: YearFilter) -> String {
    format!("Sold Quantity Per Category{}", year_suffix(year, "via Year"))
}

pub fn payment_title(year: YearFilter) -> String {
    match year {
        YearFilter::All => "Popularity of Each Payment Methods".to_string(),
        YearFilter::Year(y) => format!("Popularity of Payment Methods via Year {}", y),
    }
}

pub fn mall_sales_title(year: YearFilter) -> String {
    match year {
        YearFilter::All => "Total Sales For Each Shopping Malls".to_string(),
        YearFilter::Year(y) => format!("Total Sales For Shopping Malls In Year {}", y),
    }
}

/// One or two selected malls are named; otherwise "Each Mall".
fn mall_scope(malls: &MallFilter) -> String {
    if (1..=2).contains(&malls.len()) {
        malls.malls().join(", ")
    } else {
        "Each Mall".to_string()
    }
}

pub fn gender_by_mall_title(malls: &MallFilter) -> String {
    format!("Counts of Gender per {}", mall_scope(malls))
}

pub fn category_by_mall_title(malls: &MallFilter) -> String {
    format!("Quantity Sold Per Each Category In {}", mall_scope(malls))
}

// ---- builders ----

fn palette_colors(n: usize) -> Vec<&'static str> {
    (0..n).map(|i| PALETTE[i % PALETTE.len()]).collect()
}

fn single_series<V: Copy + Into<f64>>(
    slug: &'static str,
    title: String,
    kind: ChartKind,
    (x_label, y_label): (&str, &str),
    breakdown: &Breakdown<V>,
    colors: Vec<&'static str>,
) -> ChartView {
    ChartView {
        slug,
        title,
        kind,
        x_label: x_label.to_string(),
        y_label: y_label.to_string(),
        categories: breakdown.labels().into_iter().map(str::to_string).collect(),
        series: vec![SeriesView {
            name: y_label.to_string(),
            values: breakdown.values().into_iter().map(Into::into).collect(),
            colors,
        }],
    }
}

pub fn summary_cards_view(cards: &SummaryCards) -> Vec<CardView> {
    vec![
        CardView {
            label: "Sales",
            value: format_thousands(cards.total_sales),
        },
        CardView {
            label: "Volumes",
            value: format_thousands(cards.total_quantity as f64),
        },
        CardView {
            label: "Customers",
            value: format_thousands(cards.customers as f64),
        },
    ]
}

pub fn extremes_cards_view(extremes: Option<&MallExtremes>) -> Vec<CardView> {
    let (top, bottom) = match extremes {
        Some(e) => (e.top.clone(), e.bottom.clone()),
        None => (NO_DATA.to_string(), NO_DATA.to_string()),
    };
    vec![
        CardView {
            label: "Top Mall in Sales",
            value: top,
        },
        CardView {
            label: "Lowest Mall in Sales",
            value: bottom,
        },
    ]
}

pub fn timeline_chart(timeline: &SalesTimeline) -> ChartView {
    let title = timeline_title(timeline);
    match timeline {
        SalesTimeline::Yearly(sales) => {
            let n = sales.len();
            let colors = (0..n)
                .map(|i| {
                    if i + 1 == n {
                        LATEST_YEAR_COLOR
                    } else {
                        MALL_SALES_COLOR
                    }
                })
                .collect();
            single_series(
                "sales_per_year",
                title,
                ChartKind::Bar,
                ("Year", "Total Price in Liras"),
                sales,
                colors,
            )
        }
        SalesTimeline::Monthly { year, sales } => {
            let x_label = format!("Months of {}", year);
            single_series(
                "sales_per_month",
                title,
                ChartKind::Line,
                (x_label.as_str(), "Total Price in Liras"),
                sales,
                palette_colors(sales.len()),
            )
        }
    }
}

pub fn gender_chart(sales: &Breakdown<f64>, year: YearFilter) -> ChartView {
    single_series(
        "sales_per_gender",
        gender_title(year),
        ChartKind::Share,
        ("Gender", "Total Sales"),
        sales,
        palette_colors(sales.len()),
    )
}

pub fn category_chart(quantity: &Breakdown<i64>, year: YearFilter) -> ChartView {
    let as_float = Breakdown::new(
        quantity
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), *v as f64))
            .collect(),
    );
    single_series(
        "quantity_per_category",
        category_title(year),
        ChartKind::HorizontalBar,
        ("Category", "Quantity Sold"),
        &as_float,
        palette_colors(quantity.len()),
    )
}

pub fn payment_chart(counts: &Breakdown<u64>, year: YearFilter) -> ChartView {
    let as_float = Breakdown::new(
        counts
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), *v as f64))
            .collect(),
    );
    single_series(
        "payment_methods",
        payment_title(year),
        ChartKind::Bar,
        ("Payment Method", "Frequency"),
        &as_float,
        palette_colors(counts.len()),
    )
}

pub fn mall_sales_chart(sales: &Breakdown<f64>, year: YearFilter) -> ChartView {
    single_series(
        "sales_per_mall",
        mall_sales_title(year),
        ChartKind::HorizontalBar,
        ("Shopping Mall", "Total Sales In Liras"),
        sales,
        vec![MALL_SALES_COLOR; sales.len()],
    )
}

pub fn gender_by_mall_chart(rows: &[MallGenderCounts], malls: &MallFilter) -> ChartView {
    let n = rows.len();
    ChartView {
        slug: "gender_per_mall",
        title: gender_by_mall_title(malls),
        kind: ChartKind::GroupedBar,
        x_label: "Mall".to_string(),
        y_label: "Counts".to_string(),
        categories: rows.iter().map(|r| r.mall.clone()).collect(),
        series: vec![
            SeriesView {
                name: "Female".to_string(),
                values: rows.iter().map(|r| r.female as f64).collect(),
                colors: vec![PALETTE[0]; n],
            },
            SeriesView {
                name: "Male".to_string(),
                values: rows.iter().map(|r| r.male as f64).collect(),
                colors: vec![PALETTE[1]; n],
            },
        ],
    }
}

/// Malls along the x axis, one series per category; both in order of first appearance
/// in the quantity-sorted rows.
pub fn category_by_mall_chart(rows: &[MallCategoryQuantity], malls: &MallFilter) -> ChartView {
    let mut mall_names: Vec<String> = Vec::new();
    let mut categories: Vec<String> = Vec::new();
    for row in rows {
        if !mall_names.contains(&row.mall) {
            mall_names.push(row.mall.clone());
        }
        if !categories.contains(&row.category) {
            categories.push(row.category.clone());
        }
    }

    let series = categories
        .iter()
        .enumerate()
        .map(|(i, category)| {
            let values = mall_names
                .iter()
                .map(|mall| {
                    rows.iter()
                        .find(|r| &r.mall == mall && &r.category == category)
                        .map(|r| r.quantity as f64)
                        .unwrap_or(0.0)
                })
                .collect();
            SeriesView {
                name: category.clone(),
                values,
                colors: vec![PALETTE[i % PALETTE.len()]; mall_names.len()],
            }
        })
        .collect();

    ChartView {
        slug: "category_per_mall",
        title: category_by_mall_title(malls),
        kind: ChartKind::GroupedBar,
        x_label: "Mall".to_string(),
        y_label: "Quantity".to_string(),
        categories: mall_names,
        series,
    }
}

pub fn category_by_mall_table(rows: &[MallCategoryQuantity], malls: &MallFilter) -> TableView {
    TableView {
        title: category_by_mall_title(malls),
        headers: vec!["Mall", "Category", "Quantity"],
        rows: rows
            .iter()
            .map(|r| {
                vec![
                    r.mall.clone(),
                    r.category.clone(),
                    format_thousands(r.quantity as f64),
                ]
            })
            .collect(),
    }
}

/// Plain-text rendering of both pages, for `--summary`.
pub fn summary_text(sales: &SalesPage, malls: &MallsPage) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Sales ({}) ==", sales.filter_label);
    write_cards(&mut out, &sales.cards);
    for chart in sales.charts() {
        write_chart(&mut out, chart);
    }
    let _ = writeln!(out, "\n== Shopping Malls ==");
    write_cards(&mut out, &malls.cards);
    write_chart(&mut out, &malls.gender);
    let _ = writeln!(out, "\n{}", malls.category_table.title);
    for row in &malls.category_table.rows {
        let _ = writeln!(out, "  {}", row.join(" | "));
    }
    out
}

fn write_cards(out: &mut String, cards: &[CardView]) {
    for card in cards {
        let _ = writeln!(out, "{}: {}", card.label, card.value);
    }
}

fn write_chart(out: &mut String, chart: &ChartView) {
    let _ = writeln!(out, "\n{}", chart.title);
    if chart.is_empty() {
        let _ = writeln!(out, "  {}", NO_DATA);
        return;
    }
    for (i, category) in chart.categories.iter().enumerate() {
        let values: Vec<String> = chart
            .series
            .iter()
            .map(|s| {
                let v = s.values.get(i).copied().unwrap_or(0.0);
                if chart.series.len() > 1 {
                    format!("{}={}", s.name, format_thousands(v))
                } else {
                    format_thousands(v)
                }
            })
            .collect();
        let _ = writeln!(out, "  {}: {}", category, values.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separators() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.4), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(1_234_567.8), "1,234,568");
        assert_eq!(format_thousands(-2_500.0), "-2,500");
    }

    #[test]
    fn si_short_form() {
        assert_eq!(format_si(0.0, 4), "0");
        assert_eq!(format_si(950.0, 4), "950");
        assert_eq!(format_si(1_500.0, 4), "1.5k");
        assert_eq!(format_si(12_340.0, 4), "12.34k");
        assert_eq!(format_si(1_234_567.0, 4), "1.235M");
        assert_eq!(format_si(2_000_000.0, 3), "2M");
        assert_eq!(format_si(999_999.0, 3), "1M");
    }

    #[test]
    fn titles_follow_filter() {
        assert_eq!(gender_title(YearFilter::All), "Total Sales Per Gender");
        assert_eq!(
            gender_title(YearFilter::Year(2022)),
            "Total Sales Per Gender via Year 2022"
        );
        assert_eq!(
            category_title(YearFilter::Year(2021)),
            "Sold Quantity Per Category via Year 2021"
        );
        assert_eq!(
            mall_sales_title(YearFilter::Year(2023)),
            "Total Sales For Shopping Malls In Year 2023"
        );
        assert_eq!(
            payment_title(YearFilter::All),
            "Popularity of Each Payment Methods"
        );
    }

    #[test]
    fn mall_titles_name_at_most_two_malls() {
        assert_eq!(
            gender_by_mall_title(&MallFilter::default()),
            "Counts of Gender per Each Mall"
        );
        assert_eq!(
            gender_by_mall_title(&MallFilter::new(["Kanyon", "Zorlu"])),
            "Counts of Gender per Kanyon, Zorlu"
        );
        assert_eq!(
            category_by_mall_title(&MallFilter::new(["A", "B", "C"])),
            "Quantity Sold Per Each Category In Each Mall"
        );
    }

    #[test]
    fn yearly_chart_highlights_latest_year() {
        let timeline = SalesTimeline::Yearly(Breakdown::new(vec![
            ("2021".to_string(), 10.0),
            ("2022".to_string(), 20.0),
            ("2023".to_string(), 5.0),
        ]));
        let chart = timeline_chart(&timeline);
        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(chart.categories, vec!["2021", "2022", "2023"]);
        assert_eq!(
            chart.series[0].colors,
            vec![MALL_SALES_COLOR, MALL_SALES_COLOR, LATEST_YEAR_COLOR]
        );
    }

    #[test]
    fn builders_keep_query_order() {
        let sales = Breakdown::new(vec![("B".to_string(), 5.0), ("A".to_string(), 9.0)]);
        let chart = mall_sales_chart(&sales, YearFilter::All);
        assert_eq!(chart.categories, vec!["B", "A"]);
        assert_eq!(chart.series[0].values, vec![5.0, 9.0]);
    }

    #[test]
    fn share_labels_are_percentages() {
        let sales = Breakdown::new(vec![
            ("Female".to_string(), 75.0),
            ("Male".to_string(), 25.0),
        ]);
        let chart = gender_chart(&sales, YearFilter::All);
        assert_eq!(chart.value_labels(0), vec!["75.0%", "25.0%"]);
    }

    #[test]
    fn no_data_cards_for_empty_extremes() {
        let cards = extremes_cards_view(None);
        assert_eq!(cards[0].value, NO_DATA);
        assert_eq!(cards[1].value, NO_DATA);
    }

    #[test]
    fn category_chart_pivots_rows_by_mall() {
        let rows = vec![
            MallCategoryQuantity {
                mall: "A".to_string(),
                category: "Books".to_string(),
                quantity: 5,
            },
            MallCategoryQuantity {
                mall: "B".to_string(),
                category: "Toys".to_string(),
                quantity: 3,
            },
            MallCategoryQuantity {
                mall: "A".to_string(),
                category: "Toys".to_string(),
                quantity: 1,
            },
        ];
        let chart = category_by_mall_chart(&rows, &MallFilter::default());
        assert_eq!(chart.categories, vec!["A", "B"]);
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].name, "Books");
        assert_eq!(chart.series[0].values, vec![5.0, 0.0]);
        assert_eq!(chart.series[1].values, vec![1.0, 3.0]);
    }
}
