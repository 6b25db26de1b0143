mod common;

use shopdash::{
    export_dashboard, render_summary, App, AppEvent, ChartExportFormat, ExportSettings,
    LoadOptions, MallFilter, Page, YearFilter,
};
use std::fs;
use std::sync::mpsc::channel;
use tempfile::TempDir;

fn export_settings(dir: &TempDir, format: ChartExportFormat) -> ExportSettings {
    ExportSettings {
        directory: dir.path().join("charts"),
        format,
        size: (800, 500),
    }
}

#[test]
fn summary_over_everything() {
    let dataset = common::fixture_dataset();
    let text = render_summary(&dataset, YearFilter::All, &MallFilter::default()).unwrap();

    assert!(text.contains("== Sales (All Years) =="));
    assert!(text.contains("Sales: 2,555"));
    assert!(text.contains("Volumes: 19"));
    assert!(text.contains("Customers: 7"));
    assert!(text.contains("Total Sales Per Year"));
    assert!(text.contains("Popularity of Each Payment Methods"));
    assert!(text.contains("Top Mall in Sales: Mall of Istanbul"));
    assert!(text.contains("Lowest Mall in Sales: Kanyon"));
    assert!(text.contains("Counts of Gender per Each Mall"));
}

#[test]
fn summary_follows_filters() {
    let dataset = common::fixture_dataset();
    let malls = MallFilter::new(["Kanyon"]);
    let text = render_summary(&dataset, YearFilter::Year(2021), &malls).unwrap();

    assert!(text.contains("== Sales (2021) =="));
    assert!(text.contains("Total Sales Per Month via Year 2021"));
    assert!(text.contains("Jan: 200"));
    assert!(text.contains("Feb: 530"));
    assert!(text.contains("Total Sales Per Gender via Year 2021"));
    assert!(text.contains("Counts of Gender per Kanyon"));
    assert!(text.contains("Top Mall in Sales: Kanyon"));
}

#[test]
fn summary_for_unknown_year_reports_no_data() {
    let dataset = common::fixture_dataset();
    let text = render_summary(&dataset, YearFilter::Year(1999), &MallFilter::default()).unwrap();

    assert!(text.contains("Sales: 0"));
    assert!(text.contains("No data"));
}

#[test]
fn export_dashboard_writes_every_chart() {
    let dataset = common::fixture_dataset();
    let dir = TempDir::new().unwrap();
    let settings = export_settings(&dir, ChartExportFormat::Eps);

    let written =
        export_dashboard(&dataset, YearFilter::All, &MallFilter::default(), &settings).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "sales_per_year.eps",
            "sales_per_gender.eps",
            "quantity_per_category.eps",
            "payment_methods.eps",
            "sales_per_mall.eps",
            "gender_per_mall.eps",
            "category_per_mall.eps",
        ]
    );
    for path in &written {
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("%!PS-Adobe-3.0 EPSF-3.0"));
    }
}

#[test]
fn export_dashboard_writes_png_by_default() {
    let dataset = common::fixture_dataset();
    let dir = TempDir::new().unwrap();
    let settings = export_settings(&dir, ChartExportFormat::default());

    let written =
        export_dashboard(&dataset, YearFilter::Year(2021), &MallFilter::default(), &settings)
            .unwrap();
    assert_eq!(written.len(), 7);
    assert!(written[0].ends_with("sales_per_month.png"));
    for path in &written {
        assert!(fs::metadata(path).unwrap().len() > 0);
    }
}

#[test]
fn export_dashboard_skips_empty_charts() {
    let dataset = common::fixture_dataset();
    let dir = TempDir::new().unwrap();
    let settings = export_settings(&dir, ChartExportFormat::Eps);

    // No sales in 1999; the mall charts still have data
    let written =
        export_dashboard(&dataset, YearFilter::Year(1999), &MallFilter::default(), &settings)
            .unwrap();
    assert_eq!(written.len(), 2);

    let err = export_dashboard(
        &dataset,
        YearFilter::Year(1999),
        &MallFilter::new(["Nowhere"]),
        &settings,
    )
    .unwrap_err();
    assert!(err.to_string().contains("No data to export"));
}

#[test]
fn app_loads_and_applies_filters_through_events() {
    let (_dir, path) = common::fixture_csv();
    let (tx, _rx) = channel();
    let mut app = App::new(tx);

    assert!(app
        .event(&AppEvent::Open(path.clone(), LoadOptions::new()))
        .is_none());
    assert_eq!(app.path(), Some(path.as_path()));
    assert_eq!(app.dataset().unwrap().height(), 8);
    assert_eq!(app.sales_view().unwrap().cards[0].value, "2,555");

    app.event(&AppEvent::SelectYear(YearFilter::Year(2022)));
    let sales = app.sales_view().unwrap();
    assert_eq!(sales.filter_label, "2022");
    assert_eq!(sales.cards[0].value, "1,600");
    assert_eq!(sales.payment.title, "Popularity of Payment Methods via Year 2022");

    app.event(&AppEvent::SelectMalls(MallFilter::new(["Metrocity"])));
    let malls = app.malls_view().unwrap();
    assert_eq!(malls.cards[0].value, "Metrocity");
    assert_eq!(malls.gender.title, "Counts of Gender per Metrocity");
    // The year filter does not reach the Malls page
    assert_eq!(app.year(), YearFilter::Year(2022));
    assert_eq!(app.page(), Page::Sales);
}
