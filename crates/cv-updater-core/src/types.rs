use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::error::{Result, UpdaterError};

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// A named periodic task. Each kind owns one tracker key and one event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Keep the logged-in session warm.
    Refresh,
    /// Bump every listing's expiry date.
    Update,
}

impl ActionKind {
    /// Stream registration order. Ties in the merged schedule follow it.
    pub fn all() -> &'static [ActionKind] {
        &[ActionKind::Refresh, ActionKind::Update]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Refresh => "REFRESH",
            ActionKind::Update => "UPDATE",
        }
    }

    /// Key under which the last success is persisted.
    ///
    /// The names predate the kinds and are kept so existing databases
    /// stay readable.
    pub fn tracker_key(self) -> &'static str {
        match self {
            ActionKind::Refresh => "login",
            ActionKind::Update => "last",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// IntervalSpec
// ---------------------------------------------------------------------------

/// Base interval plus a uniformly drawn drift in `[min_drift, max_drift]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSpec {
    #[serde(rename = "base_secs", with = "duration_secs")]
    pub base: Duration,
    #[serde(rename = "min_drift_secs", with = "duration_secs")]
    pub min_drift: Duration,
    #[serde(rename = "max_drift_secs", with = "duration_secs")]
    pub max_drift: Duration,
}

impl IntervalSpec {
    pub const fn from_secs(base: u64, min_drift: u64, max_drift: u64) -> Self {
        Self {
            base: Duration::from_secs(base),
            min_drift: Duration::from_secs(min_drift),
            max_drift: Duration::from_secs(max_drift),
        }
    }

    /// Session refresh: hourly, 10–60s of drift.
    pub const fn default_refresh() -> Self {
        Self::from_secs(3600, 10, 60)
    }

    /// Listing bump: weekly, 10–60s of drift.
    pub const fn default_update() -> Self {
        Self::from_secs(7 * 24 * 3600, 10, 60)
    }

    pub fn validate(&self, kind: ActionKind) -> Result<()> {
        let invalid = |reason: &str| UpdaterError::InvalidInterval {
            kind,
            reason: reason.to_string(),
        };
        if self.base.is_zero() {
            return Err(invalid("base must be positive"));
        }
        if self.max_drift <= self.min_drift {
            return Err(invalid("max_drift must exceed min_drift"));
        }
        let upper = self
            .base
            .checked_add(self.max_drift)
            .ok_or_else(|| invalid("interval overflows"))?;
        if TimeDelta::from_std(upper).is_err() || upper.as_micros() > i64::MAX as u128 {
            return Err(invalid("interval out of range"));
        }
        Ok(())
    }

    /// Smallest gap this interval can produce (`base + min_drift`).
    pub fn min_gap(&self) -> Duration {
        self.base.saturating_add(self.min_drift)
    }

    /// Largest gap this interval can produce (`base + max_drift`).
    pub fn max_gap(&self) -> Duration {
        self.base.saturating_add(self.max_drift)
    }

    /// Draw one gap uniformly from `[base + min_drift, base + max_drift]`.
    ///
    /// Microsecond resolution. Callers must have validated the spec.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> TimeDelta {
        let lo = self.min_gap().as_micros() as i64;
        let hi = self.max_gap().as_micros() as i64;
        TimeDelta::microseconds(rng.gen_range(lo..=hi))
    }
}

// ---------------------------------------------------------------------------
// ScheduleEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub when: DateTime<Utc>,
    pub what: ActionKind,
}

// ---------------------------------------------------------------------------
// Epoch seconds
// ---------------------------------------------------------------------------

/// Seconds since the epoch with sub-second precision, as persisted.
pub fn to_epoch_secs(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

/// Inverse of [`to_epoch_secs`], rounded to the microsecond.
///
/// Non-finite or out-of-range values collapse to the epoch.
pub fn from_epoch_secs(secs: f64) -> DateTime<Utc> {
    if !secs.is_finite() {
        return DateTime::UNIX_EPOCH;
    }
    DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64)
        .unwrap_or(DateTime::UNIX_EPOCH)
}

// ---------------------------------------------------------------------------
// Serde helpers for Duration (serialized as seconds: u64)
// ---------------------------------------------------------------------------

mod duration_secs {
    use super::*;

    pub fn serialize<S>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D>(d: D) -> std::result::Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn defaults_are_valid() {
        IntervalSpec::default_refresh()
            .validate(ActionKind::Refresh)
            .unwrap();
        IntervalSpec::default_update()
            .validate(ActionKind::Update)
            .unwrap();
    }

    #[test]
    fn zero_base_is_rejected() {
        let spec = IntervalSpec::from_secs(0, 10, 60);
        assert!(matches!(
            spec.validate(ActionKind::Refresh),
            Err(UpdaterError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn drift_window_must_be_non_empty() {
        for (min, max) in [(60, 60), (60, 10)] {
            let spec = IntervalSpec::from_secs(3600, min, max);
            assert!(
                spec.validate(ActionKind::Update).is_err(),
                "min={min} max={max} should be rejected"
            );
        }
    }

    #[test]
    fn samples_stay_inside_drift_window() {
        let spec = IntervalSpec::from_secs(100, 5, 7);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let gap = spec.sample(&mut rng);
            assert!(gap >= TimeDelta::seconds(105), "gap {gap} too small");
            assert!(gap <= TimeDelta::seconds(107), "gap {gap} too large");
        }
    }

    #[test]
    fn epoch_seconds_keep_microseconds() {
        let ts = DateTime::from_timestamp_micros(1_700_000_000_123_456).unwrap();
        assert_eq!(from_epoch_secs(to_epoch_secs(ts)), ts);
        assert_eq!(from_epoch_secs(0.0), DateTime::UNIX_EPOCH);
        assert_eq!(from_epoch_secs(f64::NAN), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn tracker_keys_match_persisted_names() {
        assert_eq!(ActionKind::Refresh.tracker_key(), "login");
        assert_eq!(ActionKind::Update.tracker_key(), "last");
    }

    #[test]
    fn interval_spec_yaml_uses_seconds() {
        let yaml = serde_yaml::to_string(&IntervalSpec::default_refresh()).unwrap();
        assert!(yaml.contains("base_secs: 3600"), "{yaml}");
        let parsed: IntervalSpec = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, IntervalSpec::default_refresh());
    }
}
