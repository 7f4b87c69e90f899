//! Socket seam. A [`Transport`] opens one connection per call and reports its
//! lifecycle as a stream of [`TransportEvent`]s; the caller writes through the
//! paired outbound queue.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

pub const EVENT_QUEUE_CAPACITY: usize = 256;
pub const OUTBOUND_QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    /// Reported for logging only; a `Closed` always follows a fatal error.
    Error(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// Handle to a single connection attempt.
#[derive(Debug)]
pub struct TransportLink {
    pub events: mpsc::Receiver<TransportEvent>,
    pub outbound: mpsc::Sender<Outbound>,
}

pub trait Transport {
    fn open(&mut self) -> TransportLink;
}

#[derive(Debug, Clone)]
pub struct WsTransport {
    url: Url,
}

impl WsTransport {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Transport for WsTransport {
    /// Must be called from within a tokio runtime.
    fn open(&mut self) -> TransportLink {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let url = self.url.clone();
        tokio::spawn(async move {
            ws_pump(url, event_tx, out_rx).await;
        });
        TransportLink {
            events: event_rx,
            outbound: out_tx,
        }
    }
}

async fn ws_pump(
    url: Url,
    events: mpsc::Sender<TransportEvent>,
    mut outbound: mpsc::Receiver<Outbound>,
) {
    let (mut ws, _) = match connect_async(url.as_str()).await {
        Ok(value) => value,
        Err(err) => {
            let _ = events.send(TransportEvent::Error(err.to_string())).await;
            let _ = events.send(TransportEvent::Closed).await;
            return;
        }
    };
    if events.send(TransportEvent::Opened).await.is_err() {
        let _ = ws.close(None).await;
        return;
    }
    debug!("ws_open: {url}");

    loop {
        tokio::select! {
            incoming = ws.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if events.send(TransportEvent::Message(text)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        let _ = events.send(TransportEvent::Error(err.to_string())).await;
                        break;
                    }
                }
            }
            command = outbound.recv() => {
                match command {
                    Some(Outbound::Text(text)) => {
                        if let Err(err) = ws.send(Message::Text(text)).await {
                            warn!("ws_send_error: {err}");
                            let _ = events.send(TransportEvent::Error(err.to_string())).await;
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = ws.close(None).await;
                        break;
                    }
                }
            }
        }
    }

    let _ = events.send(TransportEvent::Closed).await;
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Far end of a fake connection, held by the test.
    pub(crate) struct FakeRemote {
        pub events: mpsc::Sender<TransportEvent>,
        pub outbound: mpsc::Receiver<Outbound>,
    }

    impl FakeRemote {
        pub fn emit(&self, event: TransportEvent) {
            self.events.try_send(event).expect("fake event queue");
        }

        pub fn written(&mut self) -> Vec<Outbound> {
            let mut out = Vec::new();
            while let Ok(item) = self.outbound.try_recv() {
                out.push(item);
            }
            out
        }
    }

    #[derive(Default)]
    struct Inner {
        opened: usize,
        remotes: VecDeque<FakeRemote>,
    }

    #[derive(Clone, Default)]
    pub(crate) struct FakeTransport {
        inner: Arc<Mutex<Inner>>,
    }

    impl FakeTransport {
        pub fn opened(&self) -> usize {
            self.inner.lock().expect("fake lock").opened
        }

        pub fn accept(&self) -> FakeRemote {
            self.inner
                .lock()
                .expect("fake lock")
                .remotes
                .pop_front()
                .expect("no pending connection")
        }
    }

    impl Transport for FakeTransport {
        fn open(&mut self) -> TransportLink {
            let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
            let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
            let mut inner = self.inner.lock().expect("fake lock");
            inner.opened += 1;
            inner.remotes.push_back(FakeRemote {
                events: event_tx,
                outbound: out_rx,
            });
            TransportLink {
                events: event_rx,
                outbound: out_tx,
            }
        }
    }
}
