//! Load the transactions CSV once into an immutable, cleaned DataFrame.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;

use crate::filter::{Selection, Subset};

pub const INVOICE_NO: &str = "invoice_no";
pub const CUSTOMER_ID: &str = "customer_id";
pub const AGE: &str = "age";
pub const GENDER: &str = "gender";
pub const INVOICE_DATE: &str = "invoice_date";
pub const CATEGORY: &str = "category";
pub const SHOPPING_MALL: &str = "shopping_mall";
pub const PAYMENT_METHOD: &str = "payment_method";
pub const QUANTITY: &str = "quantity";
pub const PRICE: &str = "price";
pub const TOTAL_PRICE: &str = "total_price";

/// Date format of the raw `invoice_date` field (day/month/year).
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Column order of the loaded table.
pub const CANONICAL_COLUMNS: [&str; 10] = [
    CUSTOMER_ID,
    AGE,
    GENDER,
    INVOICE_DATE,
    CATEGORY,
    SHOPPING_MALL,
    PAYMENT_METHOD,
    QUANTITY,
    PRICE,
    TOTAL_PRICE,
];

/// Columns the raw source must provide. `invoice_no` may be present and is dropped.
const REQUIRED_COLUMNS: [&str; 9] = [
    CUSTOMER_ID,
    AGE,
    GENDER,
    INVOICE_DATE,
    CATEGORY,
    SHOPPING_MALL,
    PAYMENT_METHOD,
    QUANTITY,
    PRICE,
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}

/// The cleaned transactions table. Built once; every query reads it through a [`Subset`].
#[derive(Debug, Clone)]
pub struct Dataset {
    df: DataFrame,
    years: Vec<i32>,
    malls: Vec<String>,
}

impl Dataset {
    /// Reads the CSV at `path`. Any I/O, parse, date or numeric failure is fatal.
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self> {
        if !path.exists() {
            return Err(eyre!("Dataset not found at {}", path.display()));
        }

        let mut read_options = CsvReadOptions::default().with_has_header(true);
        if let Some(delimiter) = options.delimiter {
            read_options = read_options.map_parse_options(|opts| opts.with_separator(delimiter));
        }
        let raw = read_options
            .try_into_reader_with_file_path(Some(path.into()))?
            .finish()
            .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;

        let dataset = Self::from_frame(raw)?;
        tracing::info!(
            path = %path.display(),
            rows = dataset.height(),
            years = ?dataset.years,
            malls = dataset.malls.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Cleans a raw frame: parses dates, derives `total_price`, drops `invoice_no`
    /// and fixes the column order.
    pub fn from_frame(raw: DataFrame) -> Result<Self> {
        for name in REQUIRED_COLUMNS {
            if raw.column(name).is_err() {
                return Err(eyre!("Missing required column '{}'", name));
            }
        }

        let date_options = StrptimeOptions {
            format: Some(DATE_FORMAT.into()),
            strict: true,
            ..Default::default()
        };

        let df = raw
            .lazy()
            .with_columns([
                col(INVOICE_DATE).str().to_date(date_options),
                col(AGE).strict_cast(DataType::Int64),
                col(QUANTITY).strict_cast(DataType::Int64),
                col(PRICE).strict_cast(DataType::Float64),
                col(CUSTOMER_ID).strict_cast(DataType::String),
            ])
            .with_column(
                (col(QUANTITY).cast(DataType::Float64) * col(PRICE)).alias(TOTAL_PRICE),
            )
            .select(CANONICAL_COLUMNS.iter().map(|c| col(*c)).collect::<Vec<_>>())
            .collect()
            .map_err(|e| eyre!("Failed to prepare dataset: {}", e))?;

        for column in df.get_columns() {
            let nulls = column.null_count();
            if nulls > 0 {
                return Err(eyre!(
                    "Column '{}' has {} missing or malformed values",
                    column.name(),
                    nulls
                ));
            }
        }

        let years = df
            .clone()
            .lazy()
            .select([col(INVOICE_DATE).dt().year().cast(DataType::Int32)])
            .collect()?;
        let years: BTreeSet<i32> = years
            .column(INVOICE_DATE)?
            .i32()?
            .into_iter()
            .flatten()
            .collect();

        let mut malls: Vec<String> = Vec::new();
        for mall in df.column(SHOPPING_MALL)?.str()?.into_iter().flatten() {
            if !malls.iter().any(|m| m == mall) {
                malls.push(mall.to_string());
            }
        }

        Ok(Self {
            df,
            years: years.into_iter().collect(),
            malls,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Distinct invoice years, ascending.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Distinct mall names in order of first appearance.
    pub fn malls(&self) -> &[String] {
        &self.malls
    }

    /// Resolves a filter selection to the matching rows. The base table is untouched.
    pub fn subset(&self, selection: &impl Selection) -> Result<Subset> {
        let df = match selection.predicate() {
            Some(predicate) => self.df.clone().lazy().filter(predicate).collect()?,
            None => self.df.clone(),
        };
        tracing::debug!(
            filter = %selection.describe(),
            rows = df.height(),
            "resolved subset"
        );
        Ok(Subset::new(df))
    }
}
