#![allow(dead_code)]

use chrono::NaiveDate;
use polars::prelude::*;
use shopdash::{Dataset, LoadOptions};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// (invoice, customer, gender, age, category, quantity, price, payment, (y, m, d), mall)
type Row = (
    &'static str,
    &'static str,
    &'static str,
    i64,
    &'static str,
    i64,
    f64,
    &'static str,
    (i32, u32, u32),
    &'static str,
);

/// Eight transactions over three years and three malls. Customer C1 buys twice.
pub const ROWS: [Row; 8] = [
    ("I1", "C1", "Female", 30, "Clothing", 2, 100.0, "Cash", (2021, 1, 5), "Kanyon"),
    ("I2", "C2", "Male", 40, "Shoes", 1, 500.0, "Credit Card", (2021, 3, 15), "Mall of Istanbul"),
    ("I3", "C3", "Female", 25, "Books", 3, 10.0, "Cash", (2021, 3, 20), "Kanyon"),
    ("I4", "C4", "Female", 35, "Clothing", 1, 300.0, "Debit Card", (2022, 2, 2), "Metrocity"),
    ("I5", "C5", "Male", 50, "Toys", 4, 25.0, "Cash", (2022, 6, 11), "Kanyon"),
    ("I6", "C6", "Female", 22, "Shoes", 2, 600.0, "Credit Card", (2022, 6, 30), "Mall of Istanbul"),
    ("I7", "C7", "Male", 61, "Books", 5, 15.0, "Credit Card", (2023, 2, 1), "Metrocity"),
    ("I8", "C1", "Female", 44, "Clothing", 1, 150.0, "Cash", (2023, 3, 3), "Metrocity"),
];

/// Raw frame in the source column order, dates as `DD/MM/YYYY` strings.
pub fn raw_frame() -> DataFrame {
    let date = |(y, m, d): (i32, u32, u32)| {
        NaiveDate::from_ymd_opt(y, m, d)
            .expect("valid fixture date")
            .format("%d/%m/%Y")
            .to_string()
    };
    df!(
        "invoice_no" => ROWS.iter().map(|r| r.0).collect::<Vec<_>>(),
        "customer_id" => ROWS.iter().map(|r| r.1).collect::<Vec<_>>(),
        "gender" => ROWS.iter().map(|r| r.2).collect::<Vec<_>>(),
        "age" => ROWS.iter().map(|r| r.3).collect::<Vec<_>>(),
        "category" => ROWS.iter().map(|r| r.4).collect::<Vec<_>>(),
        "quantity" => ROWS.iter().map(|r| r.5).collect::<Vec<_>>(),
        "price" => ROWS.iter().map(|r| r.6).collect::<Vec<_>>(),
        "payment_method" => ROWS.iter().map(|r| r.7).collect::<Vec<_>>(),
        "invoice_date" => ROWS.iter().map(|r| date(r.8)).collect::<Vec<_>>(),
        "shopping_mall" => ROWS.iter().map(|r| r.9).collect::<Vec<_>>()
    )
    .unwrap()
}

pub fn write_csv(path: &Path, df: &mut DataFrame, separator: u8) {
    let mut file = File::create(path).unwrap();
    CsvWriter::new(&mut file)
        .with_separator(separator)
        .finish(df)
        .unwrap();
}

/// Writes the fixture CSV into a fresh temp dir. Keep the `TempDir` alive while using the path.
pub fn fixture_csv() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("customer_shopping_data.csv");
    write_csv(&path, &mut raw_frame(), b',');
    (dir, path)
}

pub fn fixture_dataset() -> Dataset {
    let (_dir, path) = fixture_csv();
    Dataset::load(&path, &LoadOptions::new()).unwrap()
}
