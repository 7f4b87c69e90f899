use conveyor_core::{ClientCommand, ConnectivityStatus, RunState};
use conveyor_monitor::{
    ConnectionManager, DispatchError, LinkEvent, MonitorState, ReconnectPolicy, WsTransport,
};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

const UPDATE: &str = r#"{
  "type": "system_update",
  "data": {
    "buffer_lanes": {
      "oven1": [{"id": "L1", "capacity": 14, "current": 2, "vehicles": ["C4", "C4"]}],
      "oven2": [{"id": "L5", "capacity": 16, "current": 0, "vehicles": []}]
    },
    "conveyer": {"current_color": "C4", "total_picks": 2, "color_changes": 1, "recent_sequence": ["C1", "C4"]},
    "kpis": {"throughput": 2, "targetJPH": 900, "colorChangeovers": 1, "bufferUtilization": 1.5,
             "ovenEfficiency": 94.2, "totalVehicles": 2, "overflowPenalties": 0}
  }
}"#;

async fn next(link: &mut ConnectionManager<WsTransport>) -> LinkEvent {
    timeout(WAIT, link.next_event())
        .await
        .expect("link event in time")
}

#[tokio::test]
async fn updates_and_commands_flow_over_websocket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (seen_tx, mut seen_rx) = mpsc::channel::<String>(8);

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        ws.send(Message::Text("{\"type\":\"hello\"}".to_string()))
            .await
            .expect("send hello");
        ws.send(Message::Text("garbage".to_string()))
            .await
            .expect("send garbage");
        ws.send(Message::Text(UPDATE.to_string()))
            .await
            .expect("send update");
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                let _ = seen_tx.send(text).await;
            }
        }
    });

    let url = Url::parse(&format!("ws://{addr}/ws")).expect("url");
    let mut link = ConnectionManager::new(WsTransport::new(url), ReconnectPolicy::default());
    let mut state = MonitorState::new();
    assert!(link.connect());

    let event = next(&mut link).await;
    assert_eq!(event, LinkEvent::Connected);
    state.apply_link_event(event);
    assert_eq!(state.connectivity(), ConnectivityStatus::Connected);

    for _ in 0..3 {
        let event = next(&mut link).await;
        assert!(matches!(event, LinkEvent::Message(_)));
        state.apply_link_event(event);
    }
    assert_eq!(state.connectivity(), ConnectivityStatus::Connected);
    let stats = state.ingestor().stats();
    assert_eq!((stats.accepted, stats.ignored, stats.rejected), (1, 1, 1));
    let view = state.view();
    assert_eq!(view.conveyor.current_label, "C4");
    assert_eq!(view.ovens[0].lanes[0].occupancy, "2/14");

    state
        .send_command(&mut link, ClientCommand::StartSimulation)
        .expect("start sent");
    assert_eq!(state.simulation().requested(), RunState::Running);
    let seen = timeout(WAIT, seen_rx.recv())
        .await
        .expect("server saw command in time")
        .expect("command text");
    assert_eq!(seen, r#"{"type":"start_simulation"}"#);

    link.teardown();
    timeout(WAIT, server)
        .await
        .expect("server finished")
        .expect("server task");
    assert_eq!(
        state.send_command(&mut link, ClientCommand::StopSimulation),
        Err(DispatchError::Disconnected)
    );
}

#[tokio::test]
async fn refused_connection_schedules_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let url = Url::parse(&format!("ws://{addr}/ws")).expect("url");
    let delay = Duration::from_millis(50);
    let mut link = ConnectionManager::new(WsTransport::new(url), ReconnectPolicy::Fixed(delay));
    link.connect();

    assert_eq!(
        next(&mut link).await,
        LinkEvent::Disconnected { retry_in: delay }
    );
    assert_eq!(next(&mut link).await, LinkEvent::Reconnecting { attempt: 2 });
    assert_eq!(
        next(&mut link).await,
        LinkEvent::Disconnected { retry_in: delay }
    );
    assert_eq!(link.status(), ConnectivityStatus::Disconnected);
    link.teardown();
}

#[tokio::test]
async fn server_close_reports_disconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        let _ = ws.close(None).await;
    });

    let url = Url::parse(&format!("ws://{addr}/ws")).expect("url");
    let mut link = ConnectionManager::new(WsTransport::new(url), ReconnectPolicy::default());
    let mut state = MonitorState::new();
    link.connect();

    let event = next(&mut link).await;
    assert_eq!(event, LinkEvent::Connected);
    state.apply_link_event(event);

    let event = next(&mut link).await;
    assert_eq!(
        event,
        LinkEvent::Disconnected {
            retry_in: Duration::from_millis(3000)
        }
    );
    state.apply_link_event(event);
    assert_eq!(state.connectivity(), ConnectivityStatus::Disconnected);
    assert!(link.reconnect_pending());
    link.teardown();
}

#[tokio::test]
async fn shutdown_sends_close_frame_before_returning() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        let mut saw_close = false;
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(_) = message {
                saw_close = true;
            }
        }
        saw_close
    });

    let url = Url::parse(&format!("ws://{addr}/ws")).expect("url");
    let mut link = ConnectionManager::new(WsTransport::new(url), ReconnectPolicy::default());
    link.connect();
    assert_eq!(next(&mut link).await, LinkEvent::Connected);

    link.shutdown(WAIT).await;
    assert!(link.is_torn_down());
    let saw_close = timeout(WAIT, server)
        .await
        .expect("server finished")
        .expect("server task");
    assert!(saw_close);
}
