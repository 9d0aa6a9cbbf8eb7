//! Label printer sink.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use autoprint_sdk::objects::SinkOutcome;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{SinkError, bounded};
use crate::config::PrinterConfig;

/// One label to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelJob {
    pub winner: String,
    pub item: String,
    pub price: Option<String>,
}

impl LabelJob {
    pub fn test_job() -> Self {
        Self {
            winner: "Test User".to_string(),
            item: "Test Print".to_string(),
            price: None,
        }
    }
}

/// The physical printer, behind whatever driver renders the label.
#[async_trait]
pub trait LabelPrinter: Send + Sync {
    async fn print(&self, job: &LabelJob) -> Result<(), SinkError>;
}

/// Minimum spacing between accepted print jobs.
///
/// Check and update happen under one lock, so of two concurrent jobs inside
/// the window exactly one is accepted.
#[derive(Debug)]
pub struct CooldownGate {
    cooldown: Duration,
    last_accepted: Mutex<Option<Instant>>,
}

impl CooldownGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: Mutex::new(None),
        }
    }

    /// Returns `true` and records the job if the cooldown has elapsed.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut last = match self.last_accepted.lock() {
            Ok(last) => last,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(prev) = *last {
            if now.saturating_duration_since(prev) < self.cooldown {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

pub struct PrinterSink {
    printer: Arc<dyn LabelPrinter>,
    gate: CooldownGate,
    timeout: Duration,
}

impl PrinterSink {
    pub fn new(printer: Arc<dyn LabelPrinter>, cooldown: Duration, timeout: Duration) -> Self {
        Self {
            printer,
            gate: CooldownGate::new(cooldown),
            timeout,
        }
    }

    pub fn from_config(config: &PrinterConfig) -> Self {
        Self::new(
            Arc::new(CommandPrinter::new(&config.program, config.args.clone())),
            config.cooldown,
            config.timeout,
        )
    }

    pub async fn deliver(&self, job: LabelJob) -> SinkOutcome {
        if !self.gate.try_acquire() {
            info!(winner = %job.winner, item = %job.item, "Print dropped, printer cooling down");
            return SinkOutcome::CooldownDropped;
        }
        let outcome = bounded(self.timeout, self.printer.print(&job)).await;
        match &outcome {
            SinkOutcome::Delivered => {
                info!(winner = %job.winner, item = %job.item, price = ?job.price, "Label printed")
            }
            other => warn!(winner = %job.winner, item = %job.item, outcome = ?other, "Print failed"),
        }
        outcome
    }

    /// Print the fixed test label. Subject to the cooldown like any job.
    pub async fn test_print(&self) -> SinkOutcome {
        self.deliver(LabelJob::test_job()).await
    }
}

/// Prints by running an external program with the job as arguments.
#[derive(Debug, Clone)]
pub struct CommandPrinter {
    program: String,
    args: Vec<String>,
}

impl CommandPrinter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl LabelPrinter for CommandPrinter {
    async fn print(&self, job: &LabelJob) -> Result<(), SinkError> {
        debug!(program = %self.program, winner = %job.winner, "Spawning printer");
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(&job.winner)
            .arg(&job.item)
            .arg(job.price.as_deref().unwrap_or(""))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(SinkError::PrinterExit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
