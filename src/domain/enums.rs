use serde::{Deserialize, Serialize};

/// Lifecycle status of a task or subtask.
///
/// `Overdue` is a derived state: queries compute it from `status` plus
/// `due_date`, see [`crate::domain::Task::effective_status`]. It can still be
/// set explicitly, but the next overdue refresh realigns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
    Archived,
    Overdue,
}

impl Status {
    /// Parse a status from loose user input ("ip", "doing", "late", ...).
    pub fn from_input(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "pending" | "p" | "todo" | "to-do" => Some(Self::Pending),
            "in progress" | "inprogress" | "progress" | "ip" | "doing" => Some(Self::InProgress),
            "done" | "completed" | "complete" | "d" => Some(Self::Done),
            "archived" | "archive" | "a" => Some(Self::Archived),
            "overdue" | "late" | "o" => Some(Self::Overdue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
            Self::Archived => "Archived",
            Self::Overdue => "Overdue",
        }
    }

    /// Statuses that can still become overdue.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

/// Task priority, ordered Low < Medium < High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Parse a priority from loose user input ("h", "med", ...).
    pub fn from_input(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "low" | "l" => Some(Self::Low),
            "medium" | "med" | "m" => Some(Self::Medium),
            "high" | "h" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}
