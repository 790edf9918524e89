//! Policy variants selected by the snapshot's task id.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::TaskId;

/// Control policy for one snapshot.
///
/// | task | limits | look-ahead | default range rule |
/// |---|---|---|---|
/// | 1 | band | no | echo |
/// | 2 | safety | no | echo |
/// | 3 | safety | yes | echo |
/// | 4 | safety | yes | compensation |
/// | other | band | no | echo |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPolicy {
    BandOnly,
    SafetyLimits,
    SafetySpreading,
    /// Safety limits and look-ahead, plus a range-control-factor
    /// correction whenever spreading is detected.
    SpreadingCompensation,
}

impl TaskPolicy {
    /// Policy for a recognized task id.
    pub fn lookup(task: &TaskId) -> Option<Self> {
        match task.number()? {
            1 => Some(TaskPolicy::BandOnly),
            2 => Some(TaskPolicy::SafetyLimits),
            3 => Some(TaskPolicy::SafetySpreading),
            4 => Some(TaskPolicy::SpreadingCompensation),
            _ => None,
        }
    }

    /// Policy for any task id; unrecognized ids fall back to band-only.
    pub fn from_task_id(task: &TaskId) -> Self {
        Self::lookup(task).unwrap_or_else(|| {
            debug!(task = %task, "unrecognized task, using band limits");
            TaskPolicy::BandOnly
        })
    }

    pub fn uses_safety_limits(self) -> bool {
        !matches!(self, TaskPolicy::BandOnly)
    }

    pub fn detects_spreading(self) -> bool {
        matches!(
            self,
            TaskPolicy::SafetySpreading | TaskPolicy::SpreadingCompensation
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskPolicy::BandOnly => "band_only",
            TaskPolicy::SafetyLimits => "safety_limits",
            TaskPolicy::SafetySpreading => "safety_spreading",
            TaskPolicy::SpreadingCompensation => "spreading_compensation",
        }
    }
}
