use serde::Serialize;

use super::snapshot::ReportSnapshot;

/// Where the report view currently is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ReportPhase {
    #[default]
    Idle,
    Loading {
        generation: u64,
    },
    Ready {
        generation: u64,
        snapshot: ReportSnapshot,
    },
    Failed {
        generation: u64,
        message: String,
    },
}

/// Handle for one in-flight generation. Only the most recently issued
/// ticket can land a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket(u64);

/// View state for report generation: `Idle -> Loading -> Ready | Failed`.
///
/// Starting a new generation supersedes any request still in flight; a
/// superseded request's result is dropped when it arrives.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportState {
    #[serde(skip)]
    latest: u64,
    #[serde(flatten)]
    phase: ReportPhase,
}

impl ReportState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a generation. Any current snapshot is discarded.
    pub fn begin(&mut self) -> GenerationTicket {
        self.latest += 1;
        if let ReportPhase::Loading { generation } = self.phase {
            log::debug!("Generation {generation} superseded by {}", self.latest);
        }
        self.phase = ReportPhase::Loading {
            generation: self.latest,
        };
        GenerationTicket(self.latest)
    }

    /// Land a finished snapshot. Returns false if the ticket is stale.
    pub fn succeed(&mut self, ticket: GenerationTicket, snapshot: ReportSnapshot) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.phase = ReportPhase::Ready {
            generation: ticket.0,
            snapshot,
        };
        true
    }

    /// Land a failure. Returns false if the ticket is stale.
    pub fn fail(&mut self, ticket: GenerationTicket, message: impl Into<String>) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.phase = ReportPhase::Failed {
            generation: ticket.0,
            message: message.into(),
        };
        true
    }

    /// Dismiss the report, discarding any snapshot or pending result.
    pub fn close(&mut self) {
        self.phase = ReportPhase::Idle;
    }

    pub fn phase(&self) -> &ReportPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, ReportPhase::Loading { .. })
    }

    pub fn snapshot(&self) -> Option<&ReportSnapshot> {
        match &self.phase {
            ReportPhase::Ready { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            ReportPhase::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    fn accepts(&self, ticket: GenerationTicket) -> bool {
        let current = matches!(
            self.phase,
            ReportPhase::Loading { generation } if generation == ticket.0
        );
        if !current {
            log::debug!("Discarding result of stale generation {}", ticket.0);
        }
        current
    }
}
