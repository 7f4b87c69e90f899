use crate::link::{ConnectionManager, LinkError};
use crate::transport::Transport;
use conveyor_core::{ClientCommand, ProtocolError};
use thiserror::Error;
use tracing::{debug, warn};

/// Anything that can carry one serialized command frame.
pub trait CommandSink {
    fn is_open(&self) -> bool;
    fn send_text(&mut self, text: String) -> Result<(), LinkError>;
}

impl<T: Transport> CommandSink for ConnectionManager<T> {
    fn is_open(&self) -> bool {
        ConnectionManager::is_open(self)
    }

    fn send_text(&mut self, text: String) -> Result<(), LinkError> {
        ConnectionManager::send_text(self, text)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("backend not connected")]
    Disconnected,
    #[error(transparent)]
    Encode(#[from] ProtocolError),
    #[error("command not delivered: {0}")]
    Link(LinkError),
}

/// Writes exactly one frame when the sink is open, nothing otherwise.
pub fn send_command<S>(sink: &mut S, command: &ClientCommand) -> Result<(), DispatchError>
where
    S: CommandSink + ?Sized,
{
    if !sink.is_open() {
        warn!("command_dropped: type={} reason=disconnected", command.kind());
        return Err(DispatchError::Disconnected);
    }
    let text = command.encode()?;
    sink.send_text(text).map_err(|err| match err {
        LinkError::NotConnected | LinkError::TornDown => DispatchError::Disconnected,
        other => DispatchError::Link(other),
    })?;
    debug!("command_sent: type={}", command.kind());
    Ok(())
}
