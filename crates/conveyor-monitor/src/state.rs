use crate::dispatch::{self, CommandSink, DispatchError};
use crate::ingest::{IngestOutcome, SnapshotIngestor};
use crate::link::LinkEvent;
use conveyor_core::view::{derive_controls, derive_process_flow, derive_view};
use conveyor_core::{
    ClientCommand, ConnectivityStatus, ControlsView, DashboardView, ProcessEventView, RunState,
};
use std::time::Duration;

pub const DEFAULT_SPEED_SECS: f64 = 1.0;
pub const MIN_SPEED_SECS: f64 = 0.25;
pub const MAX_SPEED_SECS: f64 = 5.0;

/// Requested run state (set optimistically on send) next to the state the
/// server has been observed in. Updates stream while the server runs, so an
/// update after a start confirms `Running`. Nothing on the wire confirms a
/// stop (a late frame means the opposite); `Stopped` is only confirmed by
/// losing the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimulationStatus {
    requested: RunState,
    confirmed: Option<RunState>,
}

impl SimulationStatus {
    pub fn requested(&self) -> RunState {
        self.requested
    }

    pub fn confirmed(&self) -> Option<RunState> {
        self.confirmed
    }

    /// A start that no update has confirmed yet.
    pub fn is_pending(&self) -> bool {
        self.requested.is_running() && self.confirmed != Some(RunState::Running)
    }

    fn request(&mut self, run: RunState) {
        if self.requested != run {
            self.confirmed = None;
        }
        self.requested = run;
    }

    fn observe_update(&mut self) {
        if self.requested.is_running() {
            self.confirmed = Some(RunState::Running);
        }
    }

    /// The simulation stops server-side when its client goes away.
    fn stopped() -> Self {
        Self {
            requested: RunState::Stopped,
            confirmed: Some(RunState::Stopped),
        }
    }
}

#[derive(Debug)]
pub struct MonitorState {
    connectivity: ConnectivityStatus,
    simulation: SimulationStatus,
    ingestor: SnapshotIngestor,
    speed_secs: f64,
    reconnect_attempt: u64,
    status_note: Option<String>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            connectivity: ConnectivityStatus::Disconnected,
            simulation: SimulationStatus::default(),
            ingestor: SnapshotIngestor::new(),
            speed_secs: DEFAULT_SPEED_SECS,
            reconnect_attempt: 0,
            status_note: None,
        }
    }
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => {
                self.connectivity = ConnectivityStatus::Connected;
                self.status_note = Some("connected".to_string());
            }
            LinkEvent::Disconnected { retry_in } => {
                self.connectivity = ConnectivityStatus::Disconnected;
                self.simulation = SimulationStatus::stopped();
                self.status_note = Some(format!("disconnected; retrying in {}", secs(retry_in)));
            }
            LinkEvent::Reconnecting { attempt } => {
                self.reconnect_attempt = attempt;
                self.status_note = Some(format!("reconnecting (attempt {attempt})"));
            }
            LinkEvent::Message(text) => match self.ingestor.ingest(&text) {
                IngestOutcome::Accepted => self.simulation.observe_update(),
                IngestOutcome::Ignored { .. } => {}
                IngestOutcome::Rejected(err) => {
                    self.status_note = Some(format!("dropped message: {err}"));
                }
            },
        }
    }

    /// Sends `command` and applies its optimistic local effect. A disconnected
    /// sink writes nothing and flips connectivity to disconnected.
    pub fn send_command<S>(&mut self, sink: &mut S, command: ClientCommand) -> Result<(), DispatchError>
    where
        S: CommandSink + ?Sized,
    {
        match dispatch::send_command(sink, &command) {
            Ok(()) => {
                match command {
                    ClientCommand::StartSimulation => self.simulation.request(RunState::Running),
                    ClientCommand::StopSimulation => self.simulation.request(RunState::Stopped),
                    ClientCommand::ResetSystem => self.ingestor.clear_history(),
                    ClientCommand::UpdateSpeed { speed } => self.speed_secs = speed,
                }
                self.status_note = Some(format!("sent {}", command.kind()));
                Ok(())
            }
            Err(DispatchError::Disconnected) => {
                self.connectivity = ConnectivityStatus::Disconnected;
                self.status_note = Some(format!("{} not sent: backend not connected", command.kind()));
                Err(DispatchError::Disconnected)
            }
            Err(err) => {
                self.status_note = Some(format!("{} not sent: {err}", command.kind()));
                Err(err)
            }
        }
    }

    /// Speed after a relative step, clamped to the supported range.
    pub fn stepped_speed(&self, delta: f64) -> f64 {
        (self.speed_secs + delta).clamp(MIN_SPEED_SECS, MAX_SPEED_SECS)
    }

    pub fn connectivity(&self) -> ConnectivityStatus {
        self.connectivity
    }

    pub fn simulation(&self) -> SimulationStatus {
        self.simulation
    }

    pub fn ingestor(&self) -> &SnapshotIngestor {
        &self.ingestor
    }

    pub fn speed_secs(&self) -> f64 {
        self.speed_secs
    }

    pub fn reconnect_attempt(&self) -> u64 {
        self.reconnect_attempt
    }

    pub fn status_note(&self) -> Option<&str> {
        self.status_note.as_deref()
    }

    pub fn view(&self) -> DashboardView {
        derive_view(self.ingestor.latest())
    }

    pub fn controls(&self) -> ControlsView {
        derive_controls(self.connectivity, self.simulation.requested())
    }

    pub fn process_flow(&self) -> Vec<ProcessEventView> {
        derive_process_flow(self.ingestor.history())
    }
}

fn secs(duration: Duration) -> String {
    format!("{:.1}s", duration.as_secs_f64())
}
