pub mod config;
pub mod dispatch;
pub mod ingest;
pub mod link;
pub mod logging;
pub mod state;
pub mod transport;

pub use config::{Args, MonitorConfig};
pub use dispatch::{send_command, CommandSink, DispatchError};
pub use ingest::{IngestOutcome, SnapshotIngestor};
pub use link::{ConnectionManager, LinkError, LinkEvent, LinkState, ReconnectPolicy};
pub use state::{MonitorState, SimulationStatus};
pub use transport::{Transport, TransportEvent, TransportLink, WsTransport};
