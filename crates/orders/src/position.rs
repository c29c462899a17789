use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockflow_core::DomainError;

/// Position of an entry in the order log.
///
/// Strictly increasing per log; assigned by the log on append, never by
/// producers. The two-part `ms-seq` shape matches Redis stream ids so one
/// cursor representation works for every backend; the in-memory log keeps
/// `ms = 0` and counts `seq` up from 1.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LogPosition {
    pub ms: u64,
    pub seq: u64,
}

impl LogPosition {
    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// The position strictly before every appended entry. Reading after
    /// `start()` yields the log from its head.
    pub fn start() -> Self {
        Self { ms: 0, seq: 0 }
    }
}

impl core::fmt::Display for LogPosition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

impl FromStr for LogPosition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ms, seq) = s
            .split_once('-')
            .ok_or_else(|| DomainError::invalid_id(format!("LogPosition: missing '-' in '{s}'")))?;
        let ms = ms
            .parse::<u64>()
            .map_err(|e| DomainError::invalid_id(format!("LogPosition: {e}")))?;
        let seq = seq
            .parse::<u64>()
            .map_err(|e| DomainError::invalid_id(format!("LogPosition: {e}")))?;
        Ok(Self { ms, seq })
    }
}
