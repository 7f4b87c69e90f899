use crate::snapshot::SystemSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const SYSTEM_UPDATE: &str = "system_update";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("message is not valid json: {0}")]
    Json(String),
    #[error("envelope rejected: {0}")]
    Envelope(String),
    #[error("system_update payload rejected: {0}")]
    Snapshot(String),
    #[error("command encode failed: {0}")]
    Encode(String),
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    SystemUpdate(Box<SystemSnapshot>),
    /// Any other envelope type. Syntactically fine, carries no state change.
    Other { kind: String },
}

pub fn decode_server_message(text: &str) -> Result<ServerMessage, ProtocolError> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| ProtocolError::Json(err.to_string()))?;
    let envelope: RawEnvelope =
        serde_json::from_value(value).map_err(|err| ProtocolError::Envelope(err.to_string()))?;
    if envelope.kind != SYSTEM_UPDATE {
        return Ok(ServerMessage::Other {
            kind: envelope.kind,
        });
    }
    let snapshot = serde_json::from_value::<SystemSnapshot>(envelope.data)
        .map_err(|err| ProtocolError::Snapshot(err.to_string()))?;
    Ok(ServerMessage::SystemUpdate(Box::new(snapshot)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    StartSimulation,
    StopSimulation,
    ResetSystem,
    /// Seconds between simulation operations.
    UpdateSpeed { speed: f64 },
}

impl ClientCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientCommand::StartSimulation => "start_simulation",
            ClientCommand::StopSimulation => "stop_simulation",
            ClientCommand::ResetSystem => "reset_system",
            ClientCommand::UpdateSpeed { .. } => "update_speed",
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        if let ClientCommand::UpdateSpeed { speed } = self {
            if !speed.is_finite() || *speed <= 0.0 {
                return Err(ProtocolError::Encode(format!(
                    "speed must be a positive number of seconds, got {speed}"
                )));
            }
        }
        serde_json::to_string(self).map_err(|err| ProtocolError::Encode(err.to_string()))
    }
}
