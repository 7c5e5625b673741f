//! Scheduling patterns: one or more cron expressions joined by `|`.
//!
//! Each alternative is a classic 5-field UNIX expression with minute
//! resolution, or a 6/7-field expression with seconds. A pattern fires
//! whenever any alternative does.

use std::{fmt, str::FromStr};

use {
    chrono::{DateTime, Utc},
    chrono_tz::Tz,
    cronrepo_core::CronExpression,
    serde::{Serialize, Serializer},
};

use super::error::InvalidPatternError;

#[derive(Clone)]
pub struct SchedulingPattern {
    source: String,
    alternatives: Vec<CronExpression>,
}

impl SchedulingPattern {
    pub fn parse(pattern: &str) -> Result<Self, InvalidPatternError> {
        if pattern.trim().is_empty() {
            return Err(InvalidPatternError::new(pattern, "pattern is empty"));
        }
        let alternatives = pattern
            .split('|')
            .map(|alt| {
                if alt.trim().is_empty() {
                    return Err(InvalidPatternError::new(pattern, "empty alternative"));
                }
                CronExpression::parse_unix(alt)
                    .map_err(|e| InvalidPatternError::new(pattern, e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: pattern.to_string(),
            alternatives,
        })
    }

    pub fn is_valid(pattern: &str) -> bool {
        Self::parse(pattern).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn alternatives(&self) -> &[CronExpression] {
        &self.alternatives
    }

    /// Earliest fire time of any alternative strictly after `after`.
    pub fn next_after(&self, after: &DateTime<Utc>, tz: Option<&Tz>) -> Option<DateTime<Utc>> {
        self.alternatives
            .iter()
            .filter_map(|alt| alt.next_after(after, tz))
            .min()
    }
}

impl FromStr for SchedulingPattern {
    type Err = InvalidPatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SchedulingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl fmt::Debug for SchedulingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchedulingPattern").field(&self.source).finish()
    }
}

impl PartialEq for SchedulingPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for SchedulingPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}
