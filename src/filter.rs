//! Filter selections and the row subset they resolve to.

use polars::prelude::*;

use crate::dataset::{INVOICE_DATE, SHOPPING_MALL};

/// A user-chosen constraint on which rows an aggregate covers.
pub trait Selection {
    /// Row predicate, or `None` when every row is selected.
    fn predicate(&self) -> Option<Expr>;

    /// Short description for logs and the debug line.
    fn describe(&self) -> String;
}

/// Year filter of the Sales page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearFilter {
    #[default]
    All,
    Year(i32),
}

impl YearFilter {
    pub fn year(self) -> Option<i32> {
        match self {
            Self::All => None,
            Self::Year(y) => Some(y),
        }
    }

    /// Menu label: "All Years" or the year itself.
    pub fn label(self) -> String {
        match self {
            Self::All => "All Years".to_string(),
            Self::Year(y) => y.to_string(),
        }
    }

    /// Steps through `All` followed by each year in `years`, wrapping at either end.
    pub fn cycle(self, years: &[i32], forward: bool) -> Self {
        let options: Vec<Self> = std::iter::once(Self::All)
            .chain(years.iter().map(|y| Self::Year(*y)))
            .collect();
        let current = options.iter().position(|o| *o == self).unwrap_or(0);
        let n = options.len();
        let next = if forward {
            (current + 1) % n
        } else {
            (current + n - 1) % n
        };
        options[next]
    }
}

impl Selection for YearFilter {
    fn predicate(&self) -> Option<Expr> {
        self.year()
            .map(|y| col(INVOICE_DATE).dt().year().eq(lit(y)))
    }

    fn describe(&self) -> String {
        format!("year={}", self.label())
    }
}

/// Mall filter of the Malls page: an ordered set of mall names, empty meaning all malls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MallFilter {
    malls: Vec<String>,
}

impl MallFilter {
    /// Builds a filter, dropping duplicate names and keeping first occurrences in order.
    pub fn new<I, S>(malls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::default();
        for mall in malls {
            let mall = mall.into();
            if !filter.contains(&mall) {
                filter.malls.push(mall);
            }
        }
        filter
    }

    pub fn malls(&self) -> &[String] {
        &self.malls
    }

    pub fn is_empty(&self) -> bool {
        self.malls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.malls.len()
    }

    pub fn contains(&self, mall: &str) -> bool {
        self.malls.iter().any(|m| m == mall)
    }

    /// Returns a new filter with `mall` added if absent, removed if present.
    pub fn toggled(&self, mall: &str) -> Self {
        if self.contains(mall) {
            Self {
                malls: self.malls.iter().filter(|m| *m != mall).cloned().collect(),
            }
        } else {
            let mut malls = self.malls.clone();
            malls.push(mall.to_string());
            Self { malls }
        }
    }
}

impl Selection for MallFilter {
    fn predicate(&self) -> Option<Expr> {
        self.malls
            .iter()
            .map(|m| col(SHOPPING_MALL).eq(lit(m.as_str())))
            .reduce(|acc, e| acc.or(e))
    }

    fn describe(&self) -> String {
        if self.malls.is_empty() {
            "malls=all".to_string()
        } else {
            format!("malls={}", self.malls.join("|"))
        }
    }
}

/// Rows of the table matching one selection, resolved once and shared by every aggregate.
#[derive(Debug, Clone)]
pub struct Subset {
    df: DataFrame,
}

impl Subset {
    pub(crate) fn new(df: DataFrame) -> Self {
        Self { df }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn lazy(&self) -> LazyFrame {
        self.df.clone().lazy()
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }
}
