//! Checkpoint state and cutoff resolution.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CheckpointError;

/// The durable checkpoint record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// When the last fully successful run finished. `None` before the first one.
    #[serde(rename = "last_run_iso", default)]
    pub last_run: Option<DateTime<Utc>>,
}

impl CheckpointState {
    /// State for a vault that has never been processed.
    #[must_use]
    pub fn first_run() -> Self {
        Self::default()
    }

    /// Whether no run has completed yet.
    #[must_use]
    pub fn is_first_run(&self) -> bool {
        self.last_run.is_none()
    }

    /// Move the checkpoint forward to `now`.
    ///
    /// The stored value never moves backwards; if the clock reports a time
    /// earlier than the recorded one, the recorded one is kept.
    pub fn advance(&mut self, now: DateTime<Utc>) {
        match self.last_run {
            Some(previous) if previous > now => {
                log::warn!(
                    "Clock is behind the stored checkpoint ({} > {}), keeping it",
                    previous.to_rfc3339(),
                    now.to_rfc3339()
                );
            }
            _ => self.last_run = Some(now),
        }
    }
}

/// Where a resolved cutoff came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffSource {
    /// Passed by the caller for this run (`--since`).
    Override,
    /// `since_iso` from the configuration.
    Config,
    /// The stored checkpoint.
    Checkpoint,
    /// First run with nothing configured: "now".
    Default,
}

/// The minimum modification time a note must exceed to be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoff {
    /// The resolved instant.
    pub at: DateTime<Utc>,
    /// Which input it was taken from.
    pub source: CutoffSource,
}

/// Resolve the cutoff in strict priority order.
///
/// caller override > configured override > checkpoint > `now`.
///
/// Empty strings are treated as absent. The first-run default is `now`, so
/// nothing is processed retroactively unless a historical cutoff is given.
///
/// # Errors
///
/// Returns [`CheckpointError::InvalidTimestamp`] if the chosen override does
/// not parse.
pub fn resolve_cutoff(
    override_since: Option<&str>,
    config_since: Option<&str>,
    state: &CheckpointState,
    now: DateTime<Utc>,
) -> Result<Cutoff, CheckpointError> {
    fn non_empty(s: Option<&str>) -> Option<&str> {
        s.map(str::trim).filter(|s| !s.is_empty())
    }

    if let Some(s) = non_empty(override_since) {
        return Ok(Cutoff {
            at: parse_timestamp(s)?,
            source: CutoffSource::Override,
        });
    }

    if let Some(s) = non_empty(config_since) {
        return Ok(Cutoff {
            at: parse_timestamp(s)?,
            source: CutoffSource::Config,
        });
    }

    if let Some(at) = state.last_run {
        return Ok(Cutoff {
            at,
            source: CutoffSource::Checkpoint,
        });
    }

    Ok(Cutoff {
        at: now,
        source: CutoffSource::Default,
    })
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// A trailing `Z` is normalized to `+00:00`. Date-times without an offset and
/// bare `YYYY-MM-DD` dates are interpreted as UTC (dates at midnight).
///
/// # Errors
///
/// Returns [`CheckpointError::InvalidTimestamp`] if no supported form matches.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, CheckpointError> {
    let trimmed = input.trim();
    let normalized = match trimmed.strip_suffix('Z').or_else(|| trimmed.strip_suffix('z')) {
        Some(head) => format!("{head}+00:00"),
        None => trimmed.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(CheckpointError::InvalidTimestamp(input.to_string()))
}
