//! JSONL audit logging for agent-policy
//!
//! Records every check decision to a JSONL file for later analysis.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::output::AuditRecord;
use crate::rules::{Action, RuleKind};

/// An audit log entry
#[derive(Debug, Serialize)]
pub struct AuditEntry {
    /// Timestamp of the decision
    pub timestamp: DateTime<Utc>,

    pub kind: RuleKind,

    /// Path, env key or command that was checked
    pub target: String,

    /// Action that decided the check (`allow` when no rule matched)
    pub action: Action,

    /// Policy reference of the deciding rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,

    pub blocked: bool,

    /// Command arrived behind a recognized wrapper
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub wrapped: bool,
}

impl AuditEntry {
    /// Stamp a check's audit record with the current time
    pub fn new(record: AuditRecord) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: record.kind,
            target: record.target,
            action: record.action,
            policy: record.policy,
            blocked: record.blocked,
            wrapped: record.wrapped,
        }
    }
}

/// Audit logger
#[derive(Default)]
pub struct AuditLogger {
    writer: Option<BufWriter<File>>,
}

impl AuditLogger {
    /// Create a logger appending to `path`. `None`, or a path that cannot be
    /// opened, gives a disabled logger.
    pub fn new(path: Option<&Path>) -> Self {
        let writer = path.and_then(|p| {
            if let Some(parent) = p.parent() {
                let _ = std::fs::create_dir_all(parent);
            }

            OpenOptions::new()
                .create(true)
                .append(true)
                .open(p)
                .ok()
                .map(BufWriter::new)
        });

        Self { writer }
    }

    /// Log an audit entry
    pub fn log(&mut self, entry: &AuditEntry) -> Result<(), std::io::Error> {
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(entry)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Log the record of a single check
    pub fn log_record(&mut self, record: AuditRecord) -> Result<(), std::io::Error> {
        self.log(&AuditEntry::new(record))
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }
}
