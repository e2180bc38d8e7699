use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;

use crate::models::Row;

const PLAN_HEADING: &str = "plan";
const COLUMN_GAP: &str = r"\s{2,}|\t";
const AMOUNT: &str = r"^(?:[$£€₹]|rs\.?|inr|usd)?\s*\d[\d,]*(?:\.\d+)?\s*%?$";

/// A benefits table recovered from section text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenefitsTable {
    pub headings: Row,
    pub plans: Vec<Row>,
    /// True when the first row looked like data and the headings were generated.
    pub synthetic_headings: bool,
}

impl BenefitsTable {
    /// Builds a table from parsed rows. Returns `None` when fewer than two rows
    /// were recovered, which means the table was not recognised.
    pub fn from_rows(rows: Vec<Row>) -> Result<Option<Self>> {
        if rows.len() < 2 {
            return Ok(None);
        }

        let mut rows = rows.into_iter();
        let Some(first) = rows.next() else {
            return Ok(None);
        };

        let table = if looks_like_data_row(&first)? {
            let width = std::iter::once(&first)
                .chain(rows.as_slice())
                .map(Vec::len)
                .max()
                .unwrap_or(0);
            let mut plans = vec![first];
            plans.extend(rows);
            Self {
                headings: synthetic_headings(width),
                plans,
                synthetic_headings: true,
            }
        } else {
            Self {
                headings: first,
                plans: rows.collect(),
                synthetic_headings: false,
            }
        };

        Ok(Some(table))
    }

    pub fn candidates(&self) -> Vec<&str> {
        self.plans
            .iter()
            .filter_map(|row| row.first())
            .map(String::as_str)
            .collect()
    }
}

/// Splits section text into rows, treating two or more consecutive whitespace
/// characters as a column boundary. Blank lines are skipped.
pub fn parse_rows(section: &str) -> Result<Vec<Row>> {
    let gap = cached_regex(&COLUMN_GAP_REGEX, COLUMN_GAP)?;

    Ok(section
        .lines()
        .map(|line| split_cells(gap, line))
        .filter(|cells| !cells.is_empty())
        .collect())
}

fn split_cells(gap: &Regex, line: &str) -> Row {
    gap.split(line)
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

static COLUMN_GAP_REGEX: OnceLock<Regex> = OnceLock::new();
static AMOUNT_REGEX: OnceLock<Regex> = OnceLock::new();

/// Compiles `pattern` on first use and keeps it in `cell`.
fn cached_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> Result<&'static Regex> {
    if let Some(regex) = cell.get() {
        return Ok(regex);
    }
    let regex = Regex::new(pattern)?;
    Ok(cell.get_or_init(|| regex))
}

fn looks_like_data_row(row: &Row) -> Result<bool> {
    if row.len() < 2 {
        return Ok(false);
    }
    let amount = cached_regex(&AMOUNT_REGEX, AMOUNT)?;
    Ok(row
        .iter()
        .skip(1)
        .any(|cell| amount.is_match(&cell.to_lowercase())))
}

fn synthetic_headings(width: usize) -> Row {
    std::iter::once(PLAN_HEADING.to_string())
        .chain((1..width.max(1)).map(|i| format!("column{i}")))
        .collect()
}
