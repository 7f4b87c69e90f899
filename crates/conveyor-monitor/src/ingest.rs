use chrono::{DateTime, Utc};
use conveyor_core::{decode_server_message, ProcessHistory, ProtocolError, ServerMessage, SystemSnapshot};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// A `system_update` replaced the stored snapshot.
    Accepted,
    Ignored { kind: String },
    /// Malformed input; the previous snapshot is kept.
    Rejected(ProtocolError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: u64,
    pub ignored: u64,
    pub rejected: u64,
}

/// Holds the latest accepted snapshot plus the rolling process history.
#[derive(Debug, Default)]
pub struct SnapshotIngestor {
    latest: Option<SystemSnapshot>,
    history: ProcessHistory,
    stats: IngestStats,
    last_update_at: Option<DateTime<Utc>>,
}

impl SnapshotIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, text: &str) -> IngestOutcome {
        self.ingest_at(text, Utc::now())
    }

    pub fn ingest_at(&mut self, text: &str, received_at: DateTime<Utc>) -> IngestOutcome {
        match decode_server_message(text) {
            Ok(ServerMessage::SystemUpdate(snapshot)) => {
                if let Some(flow) = &snapshot.process_flow {
                    self.history.absorb(&flow.recent_operations);
                }
                self.latest = Some(*snapshot);
                self.stats.accepted += 1;
                self.last_update_at = Some(received_at);
                debug!("snapshot_accepted: total={}", self.stats.accepted);
                IngestOutcome::Accepted
            }
            Ok(ServerMessage::Other { kind }) => {
                self.stats.ignored += 1;
                debug!("message_ignored: type={kind}");
                IngestOutcome::Ignored { kind }
            }
            Err(err) => {
                self.stats.rejected += 1;
                warn!("message_rejected: {err}");
                IngestOutcome::Rejected(err)
            }
        }
    }

    pub fn latest(&self) -> Option<&SystemSnapshot> {
        self.latest.as_ref()
    }

    pub fn history(&self) -> &ProcessHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn last_update_at(&self) -> Option<DateTime<Utc>> {
        self.last_update_at
    }
}
