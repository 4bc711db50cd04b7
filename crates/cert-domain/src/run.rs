//! Estado de un run y su log agregado.
//!
//! Transiciones válidas de `RunStatus`:
//! - `Pending -> Running`
//! - `Pending -> Canceled`
//! - `Running -> Succeeded | Failed | Canceled`
//!
//! Los estados terminales (`Succeeded`, `Failed`, `Canceled`) no admiten
//! ninguna transición posterior.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed | RunStatus::Canceled)
    }

    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        use RunStatus::*;
        matches!((self, next),
                 (Pending, Running) | (Pending, Canceled) | (Running, Succeeded) | (Running, Failed) | (Running, Canceled))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RunStatus::Pending),
            "running" => Some(RunStatus::Running),
            "succeeded" => Some(RunStatus::Succeeded),
            "failed" => Some(RunStatus::Failed),
            "canceled" => Some(RunStatus::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunTrigger {
    Manual,
    Scheduled,
    Webhook,
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunTrigger::Manual => "manual",
            RunTrigger::Scheduled => "scheduled",
            RunTrigger::Webhook => "webhook",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(RunTrigger::Manual),
            "scheduled" => Some(RunTrigger::Scheduled),
            "webhook" => Some(RunTrigger::Webhook),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Entrada del log de un nodo. Append-only durante el run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub time: DateTime<Utc>,
    pub level: LogLevel,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogRecord {
    pub fn new(level: LogLevel, content: impl Into<String>, error: Option<String>) -> Self {
        Self { time: Utc::now(),
               level,
               content: content.into(),
               error }
    }
}

/// Log agregado de un nodo dentro de un run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRunLog {
    pub node_id: String,
    pub node_name: String,
    pub records: Vec<LogRecord>,
}

impl WorkflowRunLog {
    pub fn has_errors(&self) -> bool {
        self.records.iter().any(|r| r.level == LogLevel::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: String,
    pub workflow_id: String,
    pub status: RunStatus,
    pub trigger: RunTrigger,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub logs: Vec<WorkflowRunLog>,
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    pub fn new(workflow_id: &str, trigger: RunTrigger) -> Self {
        Self { id: String::new(),
               workflow_id: workflow_id.to_string(),
               status: RunStatus::Pending,
               trigger,
               started_at: None,
               ended_at: None,
               logs: Vec::new(),
               error: None,
               created_at: None,
               updated_at: None }
    }

    /// Aplica una transición de estado y sella `started_at` / `ended_at`.
    pub fn transition(&mut self, next: RunStatus, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidRunTransition { from: self.status, to: next });
        }
        if next == RunStatus::Running {
            self.started_at = Some(now);
        }
        if next.is_terminal() {
            self.ended_at = Some(now);
        }
        self.status = next;
        Ok(())
    }
}
