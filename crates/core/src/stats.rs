use serde::{Deserialize, Serialize};

use crate::error::ErrorInfo;

/// Lifecycle state of an import session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Created,
    Running,
    Paused,
    Completed,
    Failed,
    Stopped,
}

impl ImportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportStatus::Completed | ImportStatus::Failed | ImportStatus::Stopped
        )
    }

    pub fn as_u8(self) -> u8 {
        match self {
            ImportStatus::Created => 0,
            ImportStatus::Running => 1,
            ImportStatus::Paused => 2,
            ImportStatus::Completed => 3,
            ImportStatus::Failed => 4,
            ImportStatus::Stopped => 5,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(ImportStatus::Created),
            1 => Some(ImportStatus::Running),
            2 => Some(ImportStatus::Paused),
            3 => Some(ImportStatus::Completed),
            4 => Some(ImportStatus::Failed),
            5 => Some(ImportStatus::Stopped),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ImportStatus::Created => "created",
            ImportStatus::Running => "running",
            ImportStatus::Paused => "paused",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
            ImportStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Record accounting for one import session.
///
/// `total_files` stays `None` until the source reports its size, either up
/// front (countable sources) or at exhaustion (streaming sources).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub total_files: Option<u64>,
    pub processed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub total_time_in_ms: u64,
}

impl ImportStats {
    /// Records accounted for so far.
    pub fn accounted(&self) -> u64 {
        self.processed + self.failed + self.skipped
    }
}

/// The message pushed to a client after every batch and on every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub session_id: String,
    pub status: ImportStatus,
    pub cursor: u64,
    pub stats: ImportStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_serialize_camel_case_with_null_total() {
        let stats = ImportStats {
            processed: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalFiles"], serde_json::Value::Null);
        assert_eq!(json["processed"], 3);
        assert_eq!(json["totalTimeInMs"], 0);
    }

    #[test]
    fn status_u8_roundtrip_and_terminal() {
        for status in [
            ImportStatus::Created,
            ImportStatus::Running,
            ImportStatus::Paused,
            ImportStatus::Completed,
            ImportStatus::Failed,
            ImportStatus::Stopped,
        ] {
            assert_eq!(ImportStatus::from_u8(status.as_u8()), Some(status));
        }
        assert!(ImportStatus::Stopped.is_terminal());
        assert!(!ImportStatus::Paused.is_terminal());
        assert_eq!(ImportStatus::from_u8(42), None);
    }
}
