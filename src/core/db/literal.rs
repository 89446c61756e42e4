/// SQL Literal Encoding Module
///
/// Engine-neutral building blocks for turning values into SQL literal text.
/// Drivers combine these with their own quoting rules.

use crate::core::{DbalError, Result};
use std::fmt::Write;

/// Wildcard placement for LIKE patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeMode {
    /// `%value`
    EndsWith,
    /// `%value%`
    Contains,
    /// `value%`
    StartsWith,
}

impl LikeMode {
    /// The tri-state mode number: -1, 0 or 1.
    pub fn as_i8(self) -> i8 {
        match self {
            LikeMode::EndsWith => -1,
            LikeMode::Contains => 0,
            LikeMode::StartsWith => 1,
        }
    }

    pub fn from_i8(mode: i8) -> Self {
        match mode {
            m if m < 0 => LikeMode::EndsWith,
            0 => LikeMode::Contains,
            _ => LikeMode::StartsWith,
        }
    }

    fn leading_wildcard(self) -> bool {
        self.as_i8() <= 0
    }

    fn trailing_wildcard(self) -> bool {
        self.as_i8() >= 0
    }
}

/// A calendar interval rendered in ISO-8601 duration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interval {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Interval {
    /// Renders `P{y}Y{m}M{d}DT{h}H{i}M{s}S`, every component included.
    pub fn to_iso8601(&self) -> String {
        format!(
            "P{}Y{}M{}DT{}H{}M{}S",
            self.years, self.months, self.days, self.hours, self.minutes, self.seconds
        )
    }
}

impl TryFrom<chrono::Duration> for Interval {
    type Error = DbalError;

    /// Splits a non-negative duration into days, hours, minutes and whole seconds.
    fn try_from(duration: chrono::Duration) -> Result<Self> {
        if duration < chrono::Duration::zero() {
            return Err(DbalError::InvalidArgument(
                "Negative durations cannot be expressed as an interval literal".to_string(),
            ));
        }
        let total = duration.num_seconds();
        let days = u32::try_from(total / 86_400)
            .map_err(|_| DbalError::InvalidArgument("Interval is too large".to_string()))?;
        Ok(Interval {
            days,
            hours: ((total % 86_400) / 3600) as u32,
            minutes: ((total % 3600) / 60) as u32,
            seconds: (total % 60) as u32,
            ..Interval::default()
        })
    }
}

/// Doubles single quotes, the standard SQL string escape.
pub fn escape_quotes(value: &str) -> String {
    value.replace('\'', "''")
}

/// Backslash-escapes the LIKE metacharacters `\`, `%` and `_`.
pub fn escape_like_metacharacters(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Wraps an already escaped pattern body in quotes and wildcards, adding the
/// `ESCAPE '\'` clause.
pub fn wrap_like_pattern(escaped: &str, mode: LikeMode) -> String {
    format!(
        "'{}{}{}' ESCAPE '\\'",
        if mode.leading_wildcard() { "%" } else { "" },
        escaped,
        if mode.trailing_wildcard() { "%" } else { "" },
    )
}

/// Appends LIMIT/OFFSET clauses.
///
/// An offset without a limit uses `no_limit` as the limit sentinel, for
/// engines that refuse OFFSET without LIMIT.
pub fn append_limit_clauses(
    sql: &str,
    limit: Option<u64>,
    offset: Option<u64>,
    no_limit: Option<&str>,
) -> String {
    let mut out = sql.to_string();
    if let (None, Some(offset), Some(sentinel)) = (limit, offset, no_limit) {
        let _ = write!(out, " LIMIT {} OFFSET {}", sentinel, offset);
        return out;
    }
    if let Some(limit) = limit {
        let _ = write!(out, " LIMIT {}", limit);
    }
    if let Some(offset) = offset {
        let _ = write!(out, " OFFSET {}", offset);
    }
    out
}
