//! Connection lifecycle: `disconnected -> connecting -> connected -> disconnected`.
//!
//! [`ConnectionManager`] owns the single transport slot and the reconnect timer.
//! Every close (clean, error-induced, or a connect that never opened) schedules
//! exactly one reconnect after the policy delay. [`ConnectionManager::teardown`]
//! cancels the timer and drops the slot; a timer that already fired is checked
//! again before it is acted on.

use crate::transport::{Outbound, Transport, TransportEvent, TransportLink};
use conveyor_core::ConnectivityStatus;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    Fixed(Duration),
    /// Doubles per consecutive failure up to `max`; reset once a connection opens.
    Exponential { initial: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            ReconnectPolicy::Fixed(delay) => delay,
            ReconnectPolicy::Exponential { initial, max } => {
                let factor = 2u32.saturating_pow(failures);
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected { retry_in: Duration },
    Reconnecting { attempt: u64 },
    Message(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("link is not connected")]
    NotConnected,
    #[error("link has been torn down")]
    TornDown,
    #[error("outbound queue is full")]
    QueueFull,
    #[error("outbound queue is closed")]
    Closed,
}

pub struct ConnectionManager<T: Transport> {
    transport: T,
    policy: ReconnectPolicy,
    state: LinkState,
    link: Option<TransportLink>,
    reconnect_at: Option<Instant>,
    torn_down: bool,
    attempts: u64,
    failures: u32,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: T, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            policy,
            state: LinkState::Disconnected,
            link: None,
            reconnect_at: None,
            torn_down: false,
            attempts: 0,
            failures: 0,
        }
    }

    /// Opens a connection unless one is already pending or live. Returns whether
    /// a new attempt was started.
    pub fn connect(&mut self) -> bool {
        if self.torn_down || self.link.is_some() {
            return false;
        }
        self.reconnect_at = None;
        self.attempts += 1;
        self.state = LinkState::Connecting;
        self.link = Some(self.transport.open());
        debug!("link_connect: attempt={}", self.attempts);
        true
    }

    /// Waits for the next lifecycle change or inbound message.
    ///
    /// Cancel safe: the reconnect deadline lives in `self`, so dropping this
    /// future inside `select!` loses nothing.
    pub async fn next_event(&mut self) -> LinkEvent {
        loop {
            if self.torn_down {
                return std::future::pending().await;
            }
            if let Some(link) = &mut self.link {
                let event = link.events.recv().await;
                if let Some(out) = self.apply(event) {
                    return out;
                }
                continue;
            }
            match self.reconnect_at {
                Some(deadline) => {
                    tokio::time::sleep_until(deadline).await;
                    if let Some(out) = self.fire_reconnect() {
                        return out;
                    }
                }
                None => return std::future::pending().await,
            }
        }
    }

    fn apply(&mut self, event: Option<TransportEvent>) -> Option<LinkEvent> {
        match event {
            Some(TransportEvent::Opened) => {
                self.state = LinkState::Connected;
                self.failures = 0;
                info!("link_connected: attempt={}", self.attempts);
                Some(LinkEvent::Connected)
            }
            Some(TransportEvent::Message(text)) => Some(LinkEvent::Message(text)),
            Some(TransportEvent::Error(err)) => {
                warn!("link_transport_error: {err}");
                None
            }
            Some(TransportEvent::Closed) | None => {
                self.link = None;
                self.state = LinkState::Disconnected;
                if self.torn_down {
                    return None;
                }
                let retry_in = self.policy.delay(self.failures);
                self.failures = self.failures.saturating_add(1);
                self.reconnect_at = Some(Instant::now() + retry_in);
                info!("link_closed: retry_in_ms={}", retry_in.as_millis());
                Some(LinkEvent::Disconnected { retry_in })
            }
        }
    }

    fn fire_reconnect(&mut self) -> Option<LinkEvent> {
        self.reconnect_at = None;
        if self.torn_down {
            debug!("link_reconnect_abandoned");
            return None;
        }
        if !self.connect() {
            return None;
        }
        info!("link_reconnect: attempt={}", self.attempts);
        Some(LinkEvent::Reconnecting {
            attempt: self.attempts,
        })
    }

    /// Queues one text frame. Never blocks.
    pub fn send_text(&mut self, text: String) -> Result<(), LinkError> {
        if self.torn_down {
            return Err(LinkError::TornDown);
        }
        let link = match (&self.link, self.state) {
            (Some(link), LinkState::Connected) => link,
            _ => return Err(LinkError::NotConnected),
        };
        link.outbound
            .try_send(Outbound::Text(text))
            .map_err(|err| match err {
                TrySendError::Full(_) => LinkError::QueueFull,
                TrySendError::Closed(_) => LinkError::Closed,
            })
    }

    /// Closes the live connection and suppresses every pending or in-flight
    /// reconnect. Idempotent.
    pub fn teardown(&mut self) {
        drop(self.detach());
    }

    /// Tears down, then waits up to `grace` for the live connection to finish
    /// its close handshake.
    pub async fn shutdown(&mut self, grace: Duration) {
        let Some(mut link) = self.detach() else {
            return;
        };
        let drained = tokio::time::timeout(grace, async {
            while let Some(event) = link.events.recv().await {
                if event == TransportEvent::Closed {
                    break;
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!("link_shutdown_timeout: grace_ms={}", grace.as_millis());
        }
    }

    fn detach(&mut self) -> Option<TransportLink> {
        if self.torn_down {
            return None;
        }
        self.torn_down = true;
        self.reconnect_at = None;
        self.state = LinkState::Disconnected;
        debug!("link_teardown");
        let link = self.link.take()?;
        let _ = link.outbound.try_send(Outbound::Close);
        Some(link)
    }

    pub fn status(&self) -> ConnectivityStatus {
        match self.state {
            LinkState::Connected => ConnectivityStatus::Connected,
            LinkState::Disconnected | LinkState::Connecting => ConnectivityStatus::Disconnected,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        !self.torn_down && self.state == LinkState::Connected && self.link.is_some()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_at.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }
}

impl<T: Transport> Drop for ConnectionManager<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}
