use std::fmt::Display;

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Process start time truncated to whole seconds. A user whose acknowledgement is older
/// must complete a fresh handshake before any mutating action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BootEpoch(DateTime<Utc>);

impl BootEpoch {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self(started_at.trunc_subsecs(0))
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|parsed| Self::new(parsed.with_timezone(&Utc)))
    }

    /// At least one second past `previous`, so an acknowledgement of an earlier boot never
    /// satisfies the new one.
    pub fn after(self, previous: Option<BootEpoch>) -> Self {
        match previous {
            Some(previous) if self <= previous => Self(previous.0 + Duration::seconds(1)),
            _ => self,
        }
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn is_acknowledged(&self, acknowledged_at: DateTime<Utc>) -> bool {
        acknowledged_at >= self.0
    }
}

impl Display for BootEpoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
