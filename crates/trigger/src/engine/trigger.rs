//! Triggers decide when a job fires.

use {
    chrono::{DateTime, Duration, Utc},
    chrono_tz::Tz,
    cronrepo_core::CronExpression,
    serde::Serialize,
};

use super::key::{JobKey, TriggerKey};

/// How late a simple trigger's start may be and still fire.
const MISFIRE_THRESHOLD_MS: i64 = 60_000;

/// Fires whenever a cron expression matches.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronTrigger {
    key: TriggerKey,
    job_key: JobKey,
    expression: CronExpression,
    #[serde(skip_serializing_if = "Option::is_none")]
    timezone: Option<Tz>,
}

impl CronTrigger {
    pub fn new(key: TriggerKey, job_key: JobKey, expression: CronExpression) -> Self {
        Self {
            key,
            job_key,
            expression,
            timezone: None,
        }
    }

    #[must_use]
    pub fn in_timezone(mut self, timezone: Option<Tz>) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn expression(&self) -> &CronExpression {
        &self.expression
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }
}

/// Fires at `start_at`, then every `interval_ms`, `repeat_count` more times
/// (forever when `None`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleTrigger {
    key: TriggerKey,
    job_key: JobKey,
    start_at: DateTime<Utc>,
    interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat_count: Option<u32>,
}

impl SimpleTrigger {
    pub fn new(
        key: TriggerKey,
        job_key: JobKey,
        start_at: DateTime<Utc>,
        interval_ms: u64,
        repeat_count: Option<u32>,
    ) -> Self {
        Self {
            key,
            job_key,
            start_at,
            interval_ms,
            repeat_count,
        }
    }

    /// Fire exactly once at `at`.
    pub fn once(key: TriggerKey, job_key: JobKey, at: DateTime<Utc>) -> Self {
        Self::new(key, job_key, at, 0, Some(0))
    }

    pub fn start_at(&self) -> DateTime<Utc> {
        self.start_at
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn repeat_count(&self) -> Option<u32> {
        self.repeat_count
    }

    fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if after < self.start_at {
            return Some(self.start_at);
        }
        if self.interval_ms == 0 {
            return None;
        }
        let elapsed = u64::try_from((after - self.start_at).num_milliseconds()).ok()?;
        let index = elapsed / self.interval_ms + 1;
        if self.repeat_count.is_some_and(|limit| index > u64::from(limit)) {
            return None;
        }
        let offset = i64::try_from(index.checked_mul(self.interval_ms)?).ok()?;
        self.start_at
            .checked_add_signed(Duration::milliseconds(offset))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Trigger {
    Cron(CronTrigger),
    Simple(SimpleTrigger),
}

impl Trigger {
    pub fn key(&self) -> &TriggerKey {
        match self {
            Self::Cron(t) => &t.key,
            Self::Simple(t) => &t.key,
        }
    }

    pub fn job_key(&self) -> &JobKey {
        match self {
            Self::Cron(t) => &t.job_key,
            Self::Simple(t) => &t.job_key,
        }
    }

    pub(crate) fn set_job_key(&mut self, job_key: JobKey) {
        match self {
            Self::Cron(t) => t.job_key = job_key,
            Self::Simple(t) => t.job_key = job_key,
        }
    }

    pub fn as_cron(&self) -> Option<&CronTrigger> {
        match self {
            Self::Cron(t) => Some(t),
            Self::Simple(_) => None,
        }
    }

    /// First fire time when scheduled at `now`. A simple trigger whose start
    /// lies less than a minute in the past still fires at its start time.
    pub fn first_fire_time(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Simple(t) if now - t.start_at <= Duration::milliseconds(MISFIRE_THRESHOLD_MS) => {
                Some(t.start_at)
            },
            _ => self.next_fire_after(now),
        }
    }

    /// Fire time to keep when the scheduler resumes at `now` with `pending`
    /// outstanding. A fire time missed by less than a minute still fires.
    pub fn resume_fire_time(&self, pending: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if now - pending <= Duration::milliseconds(MISFIRE_THRESHOLD_MS) {
            Some(pending)
        } else {
            self.next_fire_after(now)
        }
    }

    /// First fire time strictly after `after`, `None` once exhausted.
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Cron(t) => t.expression.next_after(&after, t.timezone.as_ref()),
            Self::Simple(t) => t.next_fire_after(after),
        }
    }
}

impl From<CronTrigger> for Trigger {
    fn from(trigger: CronTrigger) -> Self {
        Self::Cron(trigger)
    }
}

impl From<SimpleTrigger> for Trigger {
    fn from(trigger: SimpleTrigger) -> Self {
        Self::Simple(trigger)
    }
}
