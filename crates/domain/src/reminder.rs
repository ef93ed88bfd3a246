use crate::proposal::Proposal;
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;
use thiserror::Error;

const VOTED: &str = "voted";

/// Largest accepted offset or snooze, one year
pub const MAX_HOURS: f64 = 8760.0;

/// Offsets in hours relative to a `Proposal`s start and end, defining
/// when reminders should fire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderOffsets {
    /// Fires at `start + h`
    pub from_start: Vec<f64>,
    /// Fires at `end - h`
    pub before_end: Vec<f64>,
}

impl ReminderOffsets {
    pub fn new(from_start: Vec<f64>, before_end: Vec<f64>) -> Self {
        Self {
            from_start,
            before_end,
        }
    }
}

impl Display for ReminderOffsets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_list = |hours: &[f64]| {
            if hours.is_empty() {
                "-".to_string()
            } else {
                hours.iter().map(|h| format_hours(*h)).join(",")
            }
        };
        write!(
            f,
            "from start: {} / before end: {}",
            fmt_list(&self.from_start),
            fmt_list(&self.before_end)
        )
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidHoursError {
    #[error("`{0}` is not a valid number of hours")]
    Malformed(String),
    #[error("Hours must be zero or positive, got: `{0}`")]
    Negative(String),
    #[error("Hours must be at most 8760, got: `{0}`")]
    TooLarge(String),
}

/// Parses a comma separated list of hours like `0, 1.5, 24 # comment`.
/// Anything after a `#` is ignored and a lone `-` means an empty list.
pub fn parse_hours_list(value: &str) -> Result<Vec<f64>, InvalidHoursError> {
    let value = value.split('#').next().unwrap_or_default().trim();
    if value == "-" {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(parse_hours)
        .collect()
}

pub fn parse_hours(value: &str) -> Result<f64, InvalidHoursError> {
    let hours = value
        .parse::<f64>()
        .ok()
        .filter(|h| h.is_finite())
        .ok_or_else(|| InvalidHoursError::Malformed(value.to_string()))?;
    if hours < 0.0 {
        return Err(InvalidHoursError::Negative(value.to_string()));
    }
    if hours > MAX_HOURS {
        return Err(InvalidHoursError::TooLarge(value.to_string()));
    }
    Ok(hours)
}

/// Whole hours are shown without decimals, e.g. `1` instead of `1.0`
pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{}", hours as i64)
    } else {
        format!("{}", hours)
    }
}

/// `None` when the hours do not fit in a `Duration`
pub fn hours_to_duration(hours: f64) -> Option<Duration> {
    let millis = (hours * 3_600_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(Duration::milliseconds(millis as i64))
}

/// Per subscriber, per proposal scheduling status.
///
/// Persisted as `null` (not scheduled yet, or scheduled from offsets which are
/// recomputed on restart), the literal `"voted"`, or an RFC 3339 instant for
/// a snoozed reminder.
#[derive(Debug, Clone, PartialEq)]
pub enum ReminderState {
    NotYetScheduled,
    Scheduled { fire_times: Vec<DateTime<Utc>> },
    Voted,
    SnoozedUntil(DateTime<Utc>),
}

impl ReminderState {
    pub fn is_voted(&self) -> bool {
        matches!(self, Self::Voted)
    }
}

impl Serialize for ReminderState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::NotYetScheduled | Self::Scheduled { .. } => serializer.serialize_none(),
            Self::Voted => serializer.serialize_str(VOTED),
            Self::SnoozedUntil(at) => serializer.serialize_str(&at.to_rfc3339()),
        }
    }
}

impl<'de> Deserialize<'de> for ReminderState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref() {
            None => Ok(Self::NotYetScheduled),
            Some(VOTED) => Ok(Self::Voted),
            Some(instant) => DateTime::parse_from_rfc3339(instant)
                .map(|at| Self::SnoozedUntil(at.with_timezone(&Utc)))
                .map_err(|_| D::Error::custom(format!("Malformed reminder state: {}", instant))),
        }
    }
}

/// Which offset produced a reminder. The notifier renders different
/// messages for each.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReminderTrigger {
    FromStart { hours: f64 },
    BeforeEnd { hours: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedReminder {
    pub fire_at: DateTime<Utc>,
    pub trigger: ReminderTrigger,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderPlan {
    /// Reminders that are in the future and should get a job each
    pub upcoming: Vec<PlannedReminder>,
    /// Reminders whose fire time was already `<= now` and are dropped
    pub skipped: Vec<PlannedReminder>,
}

impl ReminderPlan {
    pub fn fire_times(&self) -> Vec<DateTime<Utc>> {
        self.upcoming.iter().map(|r| r.fire_at).collect()
    }
}

/// Computes `{start + h : from_start} ∪ {end - h : before_end}` for the proposal.
/// Offsets resolving to the same instant each keep their own entry. Offsets
/// whose fire time is not representable are left out of the plan.
pub fn plan_reminders(
    proposal: &Proposal,
    offsets: &ReminderOffsets,
    now: DateTime<Utc>,
) -> ReminderPlan {
    let from_start = offsets.from_start.iter().filter_map(|h| {
        let fire_at = hours_to_duration(*h).and_then(|d| proposal.start.checked_add_signed(d))?;
        Some(PlannedReminder {
            fire_at,
            trigger: ReminderTrigger::FromStart { hours: *h },
        })
    });
    let before_end = offsets.before_end.iter().filter_map(|h| {
        let fire_at = hours_to_duration(*h).and_then(|d| proposal.end.checked_sub_signed(d))?;
        Some(PlannedReminder {
            fire_at,
            trigger: ReminderTrigger::BeforeEnd { hours: *h },
        })
    });

    let (upcoming, skipped) = from_start
        .chain(before_end)
        .partition(|reminder| reminder.fire_at > now);

    ReminderPlan { upcoming, skipped }
}
