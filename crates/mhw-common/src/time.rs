//! Time axis of a gridded series.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MhwError, MhwResult};

/// Ordered timestamps of a series. Spacing may be regular or irregular,
/// but timestamps must be strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeAxis(Vec<DateTime<Utc>>);

impl TimeAxis {
    /// Create a time axis, rejecting unordered or duplicate timestamps.
    pub fn new(times: Vec<DateTime<Utc>>) -> MhwResult<Self> {
        let axis = Self(times);
        axis.validate()?;
        Ok(axis)
    }

    /// A regular axis of `count` steps starting at `start`.
    pub fn regular(start: DateTime<Utc>, step: Duration, count: usize) -> Self {
        Self((0..count).map(|i| start + step * i as i32).collect())
    }

    /// Parse ISO 8601 timestamps (`2020-01-01T00:00:00Z`, no zone, or date only).
    pub fn from_iso8601<S: AsRef<str>>(values: &[S]) -> MhwResult<Self> {
        let times = values
            .iter()
            .map(|s| parse_iso8601(s.as_ref()))
            .collect::<MhwResult<Vec<_>>>()?;
        Self::new(times)
    }

    /// Check the ordering contract.
    pub fn validate(&self) -> MhwResult<()> {
        if let Some(w) = self.0.windows(2).find(|w| w[1] <= w[0]) {
            return Err(MhwError::invalid_input(format!(
                "time axis must be strictly increasing: {} is followed by {}",
                w[0], w[1]
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[DateTime<Utc>] {
        &self.0
    }

    pub fn first(&self) -> Option<DateTime<Utc>> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.0.last().copied()
    }

    /// The common step, if every interval is the same.
    pub fn regular_step(&self) -> Option<Duration> {
        let step = *self.0.get(1)? - self.0[0];
        self.0.windows(2).all(|w| w[1] - w[0] == step).then_some(step)
    }
}

fn parse_iso8601(s: &str) -> MhwResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Some(ndt) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(MhwError::invalid_input(format!("invalid timestamp: {}", s)))
}
