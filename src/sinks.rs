//! One-way observer interfaces for status and chat display
//!
//! The assistant reports human-readable state and chat lines through these
//! sinks. They are best-effort: nothing about turn correctness depends on
//! them, and no return value is consumed.

use crate::context::Role;

/// Receives human-readable assistant state updates
pub trait StatusSink: Send + Sync {
    /// Replace the current status line
    fn set(&self, status: &str);
}

/// Receives chat lines as they are exchanged
pub trait ChatLogSink: Send + Sync {
    /// Append one chat line
    fn append(&self, role: Role, text: &str);
}

/// Status sink that records to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceStatus;

impl StatusSink for TraceStatus {
    fn set(&self, status: &str) {
        tracing::info!(status, "status");
    }
}

/// Chat log sink that records to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceChatLog;

impl ChatLogSink for TraceChatLog {
    fn append(&self, role: Role, text: &str) {
        tracing::info!(%role, text, "chat");
    }
}
