pub mod color;
pub mod history;
pub mod protocol;
pub mod snapshot;
pub mod status;
pub mod view;

pub use color::{ColorCode, ColorInfo, Rgb};
pub use history::ProcessHistory;
pub use protocol::{decode_server_message, ClientCommand, ProtocolError, ServerMessage};
pub use snapshot::{
    BufferLane, BufferLanes, ConveyorState, KpiSet, LaneStatus, ProcessEvent, ProcessStep,
    SystemSnapshot,
};
pub use status::{ConnectivityStatus, RunState};
pub use view::{
    derive_controls, derive_process_flow, derive_view, ControlsView, DashboardView, ProcessEventView,
};
