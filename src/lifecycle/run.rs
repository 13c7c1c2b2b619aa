//! Run status state machine
//!
//! `active → {completed, cancelled}` — both terminal, one-way. Progress
//! (`completed` stops) only ever moves between 0 and `total_stops`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Active,
    Completed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Active => "active",
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(RunStatus::Active),
            "completed" => Some(RunStatus::Completed),
            "cancelled" => Some(RunStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Active)
    }

    pub fn can_transition(&self, to: RunStatus) -> bool {
        match (self, to) {
            (a, b) if *a == b => true,
            (RunStatus::Active, RunStatus::Completed | RunStatus::Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_transitions_are_one_way() {
        assert!(RunStatus::Active.can_transition(RunStatus::Completed));
        assert!(RunStatus::Active.can_transition(RunStatus::Cancelled));
        assert!(!RunStatus::Completed.can_transition(RunStatus::Active));
        assert!(!RunStatus::Cancelled.can_transition(RunStatus::Active));
        assert!(!RunStatus::Completed.can_transition(RunStatus::Cancelled));
    }
}
