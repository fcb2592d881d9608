//! Date and number comparators parsed from filter arguments
//!
//! Both use the grammar `[<|>|=]<value>`. Without an operator the comparison
//! is equality. Date equality compares only as much of the timestamp as the
//! literal spells out, so `=2023` matches any time in 2023 and `2023-05`
//! any time in May 2023.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ComparatorError {
    #[error("Invalid comparison '{0}': expected [<|>|=] followed by a value")]
    MissingValue(String),

    #[error("Invalid comparison operator '{0}': expected one of <, >, =")]
    InvalidOperator(String),

    #[error("Invalid date '{0}': expected YYYY, YYYY-MM, YYYY-MM-DD or an ISO timestamp")]
    InvalidDate(String),

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    Less,
    Greater,
    #[default]
    Equal,
}

/// Splits `arg` at its first digit into an operator and a value literal
fn split_operator(arg: &str) -> Result<(Operator, &str), ComparatorError> {
    let start = arg
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| ComparatorError::MissingValue(arg.to_string()))?;

    let op = match arg[..start].trim() {
        "" | "=" => Operator::Equal,
        "<" => Operator::Less,
        ">" => Operator::Greater,
        other => return Err(ComparatorError::InvalidOperator(other.to_string())),
    };

    Ok((op, arg[start..].trim()))
}

/// Parses a full or partial date literal as a UTC instant.
///
/// Partial literals resolve to the start of the period they name.
pub fn parse_date_literal(literal: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(literal) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(literal, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    let date = match literal.split('-').collect::<Vec<_>>().as_slice() {
        [y, m, d] if y.len() == 4 => {
            NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
        }
        [y, m] if y.len() == 4 => NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, 1),
        [y] if y.len() == 4 => NaiveDate::from_ymd_opt(y.parse().ok()?, 1, 1),
        _ => None,
    }?;

    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Compares timestamps against a parsed date literal
#[derive(Debug, Clone, PartialEq)]
pub struct DateComparator {
    op: Operator,
    date: DateTime<Utc>,
    precision: usize,
}

impl DateComparator {
    pub fn operator(&self) -> Operator {
        self.op
    }

    pub fn matches(&self, timestamp: &DateTime<Utc>) -> bool {
        match self.op {
            Operator::Less => *timestamp < self.date,
            Operator::Greater => *timestamp > self.date,
            Operator::Equal => {
                let rendered = timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true);
                let prefix = rendered.get(..self.precision).unwrap_or(&rendered);
                parse_date_literal(prefix) == Some(self.date)
            }
        }
    }
}

impl FromStr for DateComparator {
    type Err = ComparatorError;

    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        let (op, literal) = split_operator(arg)?;
        let date = parse_date_literal(literal)
            .ok_or_else(|| ComparatorError::InvalidDate(literal.to_string()))?;

        Ok(Self {
            op,
            date,
            precision: literal.len(),
        })
    }
}

/// Compares integers against a parsed number
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberComparator {
    op: Operator,
    value: i64,
}

impl NumberComparator {
    pub fn matches(&self, n: i64) -> bool {
        match self.op {
            Operator::Less => n < self.value,
            Operator::Greater => n > self.value,
            Operator::Equal => n == self.value,
        }
    }
}

impl FromStr for NumberComparator {
    type Err = ComparatorError;

    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        let (op, literal) = split_operator(arg)?;
        let value = literal
            .parse()
            .map_err(|_| ComparatorError::InvalidNumber(literal.to_string()))?;

        Ok(Self { op, value })
    }
}
