//! Validated cron expressions.

use std::{fmt, str::FromStr};

use {
    chrono::{DateTime, Utc},
    chrono_tz::Tz,
    cron::Schedule,
    serde::{Serialize, Serializer},
    thiserror::Error,
};

/// Raised when a cron expression cannot be parsed.
#[derive(Debug, Clone, Error)]
#[error("invalid cron expression '{expression}': {reason}")]
pub struct ExpressionError {
    expression: String,
    reason: String,
}

impl ExpressionError {
    #[must_use]
    pub fn new(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

/// A cron expression with seconds (6 fields, or 7 with a year), keeping the
/// text exactly as the caller wrote it.
#[derive(Clone)]
pub struct CronExpression {
    source: String,
    schedule: Schedule,
}

impl CronExpression {
    pub fn parse(expression: &str) -> Result<Self, ExpressionError> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(ExpressionError::new(expression, "expression is empty"));
        }
        let schedule = Schedule::from_str(trimmed)
            .map_err(|e| ExpressionError::new(expression, e.to_string()))?;
        Ok(Self {
            source: expression.to_string(),
            schedule,
        })
    }

    /// Parse a classic 5-field UNIX expression (minute resolution) by pinning
    /// seconds to zero and leaving the year open. Numeric days of the week
    /// follow UNIX numbering: 0 and 7 are Sunday, 6 is Saturday.
    pub fn parse_unix(expression: &str) -> Result<Self, ExpressionError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let [minute, hour, day, month, weekday] = fields.as_slice() else {
            return Self::parse(expression);
        };
        let weekday =
            unix_weekdays(weekday).map_err(|reason| ExpressionError::new(expression, reason))?;
        let padded = format!("0 {minute} {hour} {day} {month} {weekday} *");
        let schedule = Schedule::from_str(&padded)
            .map_err(|e| ExpressionError::new(expression, e.to_string()))?;
        Ok(Self {
            source: expression.to_string(),
            schedule,
        })
    }

    pub fn is_valid(expression: &str) -> bool {
        Self::parse(expression).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Next fire time strictly after `after`, evaluated in `tz` when given.
    pub fn next_after(&self, after: &DateTime<Utc>, tz: Option<&Tz>) -> Option<DateTime<Utc>> {
        match tz {
            Some(tz) => self
                .schedule
                .after(&after.with_timezone(tz))
                .next()
                .map(|dt| dt.with_timezone(&Utc)),
            None => self.schedule.after(after).next(),
        }
    }
}

/// Rewrite a UNIX day-of-week field (Sunday = 0 or 7) into the 1-7,
/// Sunday = 1 numbering the parser expects. Named days pass through.
fn unix_weekdays(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }
    let items = field
        .split(',')
        .map(|item| -> Result<String, String> {
            if item.chars().any(|c| c.is_ascii_alphabetic()) {
                return Ok(item.to_string());
            }
            let mut days: Vec<u32> = unix_weekday_values(item)
                .ok_or_else(|| format!("invalid day of week '{item}'"))?
                .map(|v| v % 7 + 1)
                .collect();
            days.sort_unstable();
            days.dedup();
            Ok(days.iter().map(u32::to_string).collect::<Vec<_>>().join(","))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items.join(","))
}

/// UNIX weekday numbers selected by one list item (`n`, `a-b`, `*/s`,
/// `a/s`, `a-b/s`).
fn unix_weekday_values(item: &str) -> Option<impl Iterator<Item = u32>> {
    let (base, step) = match item.split_once('/') {
        Some((base, step)) => (base, Some(step.parse::<usize>().ok().filter(|s| *s > 0)?)),
        None => (item, None),
    };
    let (from, to) = match (base, base.split_once('-')) {
        ("*", _) => (0, 6),
        (_, Some((from, to))) => (from.parse::<u32>().ok()?, to.parse::<u32>().ok()?),
        (single, None) => {
            let day = single.parse::<u32>().ok()?;
            (day, if step.is_some() { day.max(6) } else { day })
        },
    };
    if from > to || to > 7 {
        return None;
    }
    Some((from..=to).step_by(step.unwrap_or(1)))
}

impl FromStr for CronExpression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl fmt::Debug for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronExpression").field(&self.source).finish()
    }
}

impl PartialEq for CronExpression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for CronExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}
