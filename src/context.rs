//! Notification Context
//!
//! Per-operation outcomes surfaced to the UI layer (toasts).

use std::fmt;

/// Operation a notification refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Reorder,
    Move,
    Create,
    Update,
    Delete,
    Refresh,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Reorder => "reorder",
            Operation::Move => "move",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Refresh => "refresh",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success { op: Operation, message: String },
    Error { op: Operation, message: String },
}

impl Notification {
    pub fn success(op: Operation) -> Self {
        Notification::Success {
            op,
            message: format!("{} saved", op),
        }
    }

    pub fn error(op: Operation, err: impl fmt::Display) -> Self {
        Notification::Error {
            op,
            message: format!("{} failed: {}", op, err),
        }
    }

    pub fn op(&self) -> Operation {
        match self {
            Notification::Success { op, .. } | Notification::Error { op, .. } => *op,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notification::Error { .. })
    }
}
