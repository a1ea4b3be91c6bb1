use std::time::{Duration, Instant};

/// Where a step ended up in a saga run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    Executed,
    /// The step's predicate excluded it from the run.
    Skipped,
    /// The step failed and aborted the saga.
    Failed,
    /// An optional step failed and the saga carried on without it.
    OptionalFailed,
    Compensated,
    CompensationFailed,
}

impl StepStatus {
    /// One-character marker used by [`SagaAuditLog::summary`].
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Executed => "✓",
            Self::Skipped => "-",
            Self::Failed => "✗",
            Self::OptionalFailed => "~",
            Self::Compensated => "↩",
            Self::CompensationFailed => "⚠",
        }
    }
}

/// One step's entry in the audit log.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: &'static str,
    pub status: StepStatus,
    /// `execute` calls made, retries included. Zero for skipped steps.
    pub attempts: u32,
    /// Latest message from `execute` or `compensate`.
    pub message: Option<String>,
    pub started_at: Instant,
    /// Set once execution (and later compensation) settles.
    pub finished_at: Option<Instant>,
    /// What compensating this step would undo; only set for executed steps.
    pub compensation: Option<String>,
}

impl StepRecord {
    /// Time from start until the step last settled.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.finished_at
            .map(|finished| finished.duration_since(self.started_at))
    }
}

/// Per-step trace of a saga run, in execution order.
#[derive(Debug, Default, Clone)]
pub struct SagaAuditLog {
    records: Vec<StepRecord>,
}

impl SagaAuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a record for a step about to execute and returns its position.
    pub(crate) fn begin(&mut self, name: &'static str) -> usize {
        self.records.push(StepRecord {
            name,
            status: StepStatus::Executed,
            attempts: 0,
            message: None,
            started_at: Instant::now(),
            finished_at: None,
            compensation: None,
        });
        self.records.len() - 1
    }

    pub(crate) fn skip(&mut self, name: &'static str) {
        let index = self.begin(name);
        let record = &mut self.records[index];
        record.status = StepStatus::Skipped;
        record.finished_at = Some(record.started_at);
    }

    pub(crate) fn attempt(&mut self, index: usize) {
        self.records[index].attempts += 1;
    }

    pub(crate) fn executed(&mut self, index: usize, message: &str, compensation: String) {
        self.settle(index, StepStatus::Executed, message);
        self.records[index].compensation = Some(compensation);
    }

    pub(crate) fn failed(&mut self, index: usize, message: &str, aborted: bool) {
        let status = if aborted {
            StepStatus::Failed
        } else {
            StepStatus::OptionalFailed
        };
        self.settle(index, status, message);
    }

    /// Records the outcome of compensating the step at `index`.
    pub(crate) fn compensated(&mut self, index: usize, succeeded: bool, message: &str) {
        let status = if succeeded {
            StepStatus::Compensated
        } else {
            StepStatus::CompensationFailed
        };
        self.settle(index, status, message);
    }

    fn settle(&mut self, index: usize, status: StepStatus, message: &str) {
        let record = &mut self.records[index];
        record.status = status;
        record.message = Some(message.to_string());
        record.finished_at = Some(Instant::now());
    }

    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Names of the steps that ended with `status`, in log order.
    #[must_use]
    pub fn steps_with_status(&self, status: StepStatus) -> Vec<&'static str> {
        self.records
            .iter()
            .filter(|record| record.status == status)
            .map(|record| record.name)
            .collect()
    }

    /// One line per step: status marker, name, and the attempt count when the
    /// step was retried.
    #[must_use]
    pub fn summary(&self) -> String {
        self.records
            .iter()
            .map(|record| match record.attempts {
                0 | 1 => format!("{} {}", record.status.symbol(), record.name),
                attempts => format!(
                    "{} {} ({attempts} attempts)",
                    record.status.symbol(),
                    record.name
                ),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
