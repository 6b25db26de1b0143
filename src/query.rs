//! Aggregates behind every dashboard view.
//!
//! Each public operation takes the immutable [`Dataset`] and a filter selection,
//! resolves the selection to a [`Subset`] once and aggregates over it. Empty subsets
//! give empty aggregates (zero sums, no entries); only polars execution errors are
//! returned as `Err`.

use color_eyre::Result;
use polars::prelude::*;
use std::time::Instant;

use crate::dataset::{
    Dataset, CATEGORY, CUSTOMER_ID, GENDER, INVOICE_DATE, PAYMENT_METHOD, QUANTITY,
    SHOPPING_MALL, TOTAL_PRICE,
};
use crate::filter::{MallFilter, Subset, YearFilter};

/// Month labels assigned positionally to monthly sales.
pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const KEY: &str = "key";
const VALUE: &str = "value";
const FEMALE: &str = "female";
const MALE: &str = "male";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub const ALL: [Self; 2] = [Self::Female, Self::Male];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
        }
    }
}

/// Ordered (label, value) pairs of one grouping dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown<V> {
    pub entries: Vec<(String, V)>,
}

impl<V> Default for Breakdown<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V: Copy> Breakdown<V> {
    pub fn new(entries: Vec<(String, V)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn values(&self) -> Vec<V> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn get(&self, label: &str) -> Option<V> {
        self.entries
            .iter()
            .find(|(k, _)| k == label)
            .map(|(_, v)| *v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SummaryCards {
    pub total_sales: f64,
    pub total_quantity: i64,
    pub customers: u64,
}

/// Sales over time: per year for the unfiltered view, per month for a single year.
#[derive(Debug, Clone, PartialEq)]
pub enum SalesTimeline {
    Yearly(Breakdown<f64>),
    /// Labels come from [`MONTH_NAMES`] by position, not by calendar month: a year whose
    /// first sale is in March still starts at "Jan".
    Monthly { year: i32, sales: Breakdown<f64> },
}

impl SalesTimeline {
    pub fn sales(&self) -> &Breakdown<f64> {
        match self {
            Self::Yearly(sales) => sales,
            Self::Monthly { sales, .. } => sales,
        }
    }
}

/// Best and worst selling mall of a subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MallExtremes {
    pub top: String,
    pub bottom: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MallGenderCounts {
    pub mall: String,
    pub female: u64,
    pub male: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MallCategoryQuantity {
    pub mall: String,
    pub category: String,
    pub quantity: i64,
}

// ---- Sales page ----

pub fn summary_cards(table: &Dataset, year: YearFilter) -> Result<SummaryCards> {
    summary_in(&table.subset(&year)?)
}

pub fn sales_over_time(table: &Dataset, year: YearFilter) -> Result<SalesTimeline> {
    timeline_in(&table.subset(&year)?, year)
}

pub fn sales_by_gender(table: &Dataset, year: YearFilter) -> Result<Breakdown<f64>> {
    gender_sales_in(&table.subset(&year)?)
}

pub fn quantity_by_category(table: &Dataset, year: YearFilter) -> Result<Breakdown<i64>> {
    category_quantity_in(&table.subset(&year)?)
}

pub fn payment_method_popularity(table: &Dataset, year: YearFilter) -> Result<Breakdown<u64>> {
    payment_counts_in(&table.subset(&year)?)
}

pub fn sales_by_mall(table: &Dataset, year: YearFilter) -> Result<Breakdown<f64>> {
    mall_sales_in(&table.subset(&year)?)
}

// ---- Malls page ----

/// `None` when no rows match the selection.
pub fn top_and_bottom_mall(table: &Dataset, malls: &MallFilter) -> Result<Option<MallExtremes>> {
    extremes_in(&table.subset(malls)?)
}

pub fn gender_counts_by_mall(
    table: &Dataset,
    malls: &MallFilter,
) -> Result<Vec<MallGenderCounts>> {
    gender_counts_in(&table.subset(malls)?)
}

pub fn category_quantity_by_mall(
    table: &Dataset,
    malls: &MallFilter,
) -> Result<Vec<MallCategoryQuantity>> {
    mall_category_in(&table.subset(malls)?)
}

/// Every aggregate of the Sales page over one resolved subset.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesReport {
    pub year: YearFilter,
    pub cards: SummaryCards,
    pub timeline: SalesTimeline,
    pub gender: Breakdown<f64>,
    pub category: Breakdown<i64>,
    pub payment: Breakdown<u64>,
    pub malls: Breakdown<f64>,
}

impl SalesReport {
    pub fn compute(table: &Dataset, year: YearFilter) -> Result<Self> {
        let start = Instant::now();
        let subset = table.subset(&year)?;
        let report = Self {
            year,
            cards: summary_in(&subset)?,
            timeline: timeline_in(&subset, year)?,
            gender: gender_sales_in(&subset)?,
            category: category_quantity_in(&subset)?,
            payment: payment_counts_in(&subset)?,
            malls: mall_sales_in(&subset)?,
        };
        tracing::debug!(
            year = %year.label(),
            rows = subset.height(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "computed sales report"
        );
        Ok(report)
    }
}

/// Every aggregate of the Malls page over one resolved subset.
#[derive(Debug, Clone, PartialEq)]
pub struct MallsReport {
    pub malls: MallFilter,
    pub extremes: Option<MallExtremes>,
    pub gender: Vec<MallGenderCounts>,
    pub category: Vec<MallCategoryQuantity>,
}

impl MallsReport {
    pub fn compute(table: &Dataset, malls: &MallFilter) -> Result<Self> {
        let start = Instant::now();
        let subset = table.subset(malls)?;
        let report = Self {
            malls: malls.clone(),
            extremes: extremes_in(&subset)?,
            gender: gender_counts_in(&subset)?,
            category: mall_category_in(&subset)?,
        };
        tracing::debug!(
            malls = malls.len(),
            rows = subset.height(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "computed malls report"
        );
        Ok(report)
    }
}

// ---- aggregates over a resolved subset ----

fn summary_in(subset: &Subset) -> Result<SummaryCards> {
    let df = subset
        .lazy()
        .select([
            col(TOTAL_PRICE).sum().cast(DataType::Float64).alias(TOTAL_PRICE),
            col(QUANTITY).sum().cast(DataType::Int64).alias(QUANTITY),
            col(CUSTOMER_ID)
                .n_unique()
                .cast(DataType::UInt64)
                .alias(CUSTOMER_ID),
        ])
        .collect()?;

    Ok(SummaryCards {
        total_sales: floats(&df, TOTAL_PRICE)?.first().copied().unwrap_or(0.0),
        total_quantity: integers(&df, QUANTITY)?.first().copied().unwrap_or(0),
        customers: counts(&df, CUSTOMER_ID)?.first().copied().unwrap_or(0),
    })
}

fn timeline_in(subset: &Subset, year: YearFilter) -> Result<SalesTimeline> {
    let period = match year {
        YearFilter::All => col(INVOICE_DATE).dt().year(),
        YearFilter::Year(_) => col(INVOICE_DATE).dt().month(),
    };
    let df = subset
        .lazy()
        .group_by([period.cast(DataType::Int32).alias(KEY)])
        .agg([col(TOTAL_PRICE).sum().alias(VALUE)])
        .sort_by_exprs([col(KEY)], SortMultipleOptions::default())
        .collect()?;

    let periods = integers(&df, KEY)?;
    let sales = floats(&df, VALUE)?;

    Ok(match year {
        YearFilter::All => SalesTimeline::Yearly(Breakdown::new(
            periods
                .iter()
                .map(|y| y.to_string())
                .zip(sales)
                .collect(),
        )),
        YearFilter::Year(y) => SalesTimeline::Monthly {
            year: y,
            sales: Breakdown::new(
                MONTH_NAMES
                    .iter()
                    .map(|m| m.to_string())
                    .zip(sales)
                    .collect(),
            ),
        },
    })
}

fn gender_sales_in(subset: &Subset) -> Result<Breakdown<f64>> {
    let df = subset
        .lazy()
        .group_by([col(GENDER).alias(KEY)])
        .agg([col(TOTAL_PRICE).sum().alias(VALUE)])
        .sort_by_exprs([col(KEY)], SortMultipleOptions::default())
        .collect()?;
    Ok(Breakdown::new(
        strings(&df, KEY)?.into_iter().zip(floats(&df, VALUE)?).collect(),
    ))
}

fn category_quantity_in(subset: &Subset) -> Result<Breakdown<i64>> {
    let df = subset
        .lazy()
        .group_by([col(CATEGORY).alias(KEY)])
        .agg([col(QUANTITY).sum().alias(VALUE)])
        .sort_by_exprs(
            [col(VALUE), col(KEY)],
            SortMultipleOptions::default().with_order_descending_multi([false, false]),
        )
        .collect()?;
    Ok(Breakdown::new(
        strings(&df, KEY)?
            .into_iter()
            .zip(integers(&df, VALUE)?)
            .collect(),
    ))
}

/// Counting order: most frequent first, ties in order of first appearance.
fn payment_counts_in(subset: &Subset) -> Result<Breakdown<u64>> {
    let df = subset
        .lazy()
        .group_by_stable([col(PAYMENT_METHOD).alias(KEY)])
        .agg([len().alias(VALUE)])
        .sort_by_exprs(
            [col(VALUE)],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .collect()?;
    Ok(Breakdown::new(
        strings(&df, KEY)?.into_iter().zip(counts(&df, VALUE)?).collect(),
    ))
}

fn mall_sales_in(subset: &Subset) -> Result<Breakdown<f64>> {
    let df = subset
        .lazy()
        .group_by([col(SHOPPING_MALL).alias(KEY)])
        .agg([col(TOTAL_PRICE).sum().alias(VALUE)])
        .sort_by_exprs(
            [col(VALUE), col(KEY)],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;
    Ok(Breakdown::new(
        strings(&df, KEY)?.into_iter().zip(floats(&df, VALUE)?).collect(),
    ))
}

/// Ties resolve to the alphabetically first mall, matching the order of [`sales_by_mall`].
fn extremes_in(subset: &Subset) -> Result<Option<MallExtremes>> {
    let df = subset
        .lazy()
        .group_by([col(SHOPPING_MALL).alias(KEY)])
        .agg([col(TOTAL_PRICE).sum().alias(VALUE)])
        .sort_by_exprs([col(KEY)], SortMultipleOptions::default())
        .collect()?;
    let totals: Vec<(String, f64)> = strings(&df, KEY)?
        .into_iter()
        .zip(floats(&df, VALUE)?)
        .collect();

    let Some(first) = totals.first() else {
        return Ok(None);
    };
    let mut top = first;
    let mut bottom = first;
    for entry in &totals[1..] {
        if entry.1 > top.1 {
            top = entry;
        }
        if entry.1 < bottom.1 {
            bottom = entry;
        }
    }
    Ok(Some(MallExtremes {
        top: top.0.clone(),
        bottom: bottom.0.clone(),
    }))
}

fn gender_counts_in(subset: &Subset) -> Result<Vec<MallGenderCounts>> {
    let df = subset
        .lazy()
        .group_by([col(SHOPPING_MALL).alias(KEY)])
        .agg([
            col(GENDER)
                .eq(lit(Gender::Female.as_str()))
                .sum()
                .alias(FEMALE),
            col(GENDER).eq(lit(Gender::Male.as_str())).sum().alias(MALE),
        ])
        .sort_by_exprs(
            [col(FEMALE), col(KEY)],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;

    let malls = strings(&df, KEY)?;
    let female = counts(&df, FEMALE)?;
    let male = counts(&df, MALE)?;
    Ok(malls
        .into_iter()
        .zip(female.into_iter().zip(male))
        .map(|(mall, (female, male))| MallGenderCounts { mall, female, male })
        .collect())
}

fn mall_category_in(subset: &Subset) -> Result<Vec<MallCategoryQuantity>> {
    let df = subset
        .lazy()
        .group_by([col(SHOPPING_MALL), col(CATEGORY)])
        .agg([col(QUANTITY).sum().alias(VALUE)])
        .sort_by_exprs(
            [col(VALUE), col(SHOPPING_MALL), col(CATEGORY)],
            SortMultipleOptions::default().with_order_descending_multi([true, false, false]),
        )
        .collect()?;

    let malls = strings(&df, SHOPPING_MALL)?;
    let categories = strings(&df, CATEGORY)?;
    let quantities = integers(&df, VALUE)?;
    Ok(malls
        .into_iter()
        .zip(categories.into_iter().zip(quantities))
        .map(|(mall, (category, quantity))| MallCategoryQuantity {
            mall,
            category,
            quantity,
        })
        .collect())
}

// ---- column extraction ----

fn strings(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

fn floats(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().map(|v| v.unwrap_or(0.0)).collect())
}

fn integers(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().map(|v| v.unwrap_or(0)).collect())
}

fn counts(df: &DataFrame, name: &str) -> Result<Vec<u64>> {
    let column = df.column(name)?.cast(&DataType::UInt64)?;
    Ok(column.u64()?.into_iter().map(|v| v.unwrap_or(0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AGE, INVOICE_NO, PRICE};

    /// Two-row table: mall A sells 100 to a woman, mall B sells 50 to a man.
    fn two_mall_table() -> Dataset {
        let raw = df!(
            INVOICE_NO => &["I1", "I2"],
            CUSTOMER_ID => &["C1", "C2"],
            GENDER => &["Female", "Male"],
            AGE => &[28_i64, 45],
            CATEGORY => &["Clothing", "Shoes"],
            QUANTITY => &[2_i64, 1],
            PRICE => &[50.0_f64, 50.0],
            PAYMENT_METHOD => &["Cash", "Credit Card"],
            INVOICE_DATE => &["10/10/2022", "11/10/2022"],
            SHOPPING_MALL => &["A", "B"]
        )
        .unwrap();
        Dataset::from_frame(raw).unwrap()
    }

    #[test]
    fn mall_sales_descending() {
        let table = two_mall_table();
        let malls = sales_by_mall(&table, YearFilter::All).unwrap();
        assert_eq!(
            malls.entries,
            vec![("A".to_string(), 100.0), ("B".to_string(), 50.0)]
        );
    }

    #[test]
    fn summary_over_whole_table() {
        let table = two_mall_table();
        let cards = summary_cards(&table, YearFilter::All).unwrap();
        assert_eq!(cards.total_sales, 150.0);
        assert_eq!(cards.total_quantity, 3);
        assert_eq!(cards.customers, 2);
    }

    #[test]
    fn gender_counts_keep_zero_entries() {
        let table = two_mall_table();
        let rows = gender_counts_by_mall(&table, &MallFilter::new(["A"])).unwrap();
        assert_eq!(
            rows,
            vec![MallGenderCounts {
                mall: "A".to_string(),
                female: 1,
                male: 0,
            }]
        );
    }

    #[test]
    fn unknown_filters_give_empty_aggregates() {
        let table = two_mall_table();
        let cards = summary_cards(&table, YearFilter::Year(1990)).unwrap();
        assert_eq!(cards, SummaryCards::default());
        assert!(sales_by_gender(&table, YearFilter::Year(1990))
            .unwrap()
            .is_empty());
        assert!(sales_over_time(&table, YearFilter::Year(1990))
            .unwrap()
            .sales()
            .is_empty());

        let nowhere = MallFilter::new(["NonexistentMall"]);
        assert_eq!(top_and_bottom_mall(&table, &nowhere).unwrap(), None);
        assert!(gender_counts_by_mall(&table, &nowhere).unwrap().is_empty());
        assert!(category_quantity_by_mall(&table, &nowhere)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn extremes_tie_resolves_to_lowest_name() {
        let raw = df!(
            CUSTOMER_ID => &["C1", "C2", "C3"],
            GENDER => &["Female", "Male", "Female"],
            AGE => &[28_i64, 45, 33],
            CATEGORY => &["Toys", "Toys", "Toys"],
            QUANTITY => &[1_i64, 1, 1],
            PRICE => &[10.0_f64, 10.0, 10.0],
            PAYMENT_METHOD => &["Cash", "Cash", "Cash"],
            INVOICE_DATE => &["01/01/2022", "02/01/2022", "03/01/2022"],
            SHOPPING_MALL => &["Zorlu", "Kanyon", "Cevahir"]
        )
        .unwrap();
        let table = Dataset::from_frame(raw).unwrap();
        let extremes = top_and_bottom_mall(&table, &MallFilter::default())
            .unwrap()
            .unwrap();
        assert_eq!(extremes.top, "Cevahir");
        assert_eq!(extremes.bottom, "Cevahir");

        // The top card agrees with the first bar of the mall sales chart
        let malls = sales_by_mall(&table, YearFilter::All).unwrap();
        assert_eq!(malls.labels()[0], extremes.top);
    }
}
