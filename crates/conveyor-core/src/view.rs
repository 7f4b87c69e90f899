//! Display-ready projection of a snapshot.
//!
//! Everything here is a pure function of its inputs so the presentation layer can
//! be exercised without a live connection. When no snapshot has been accepted yet
//! the default topology is rendered instead.

use crate::color::{self, ColorCode, ColorInfo};
use crate::history::ProcessHistory;
use crate::snapshot::{BufferLane, KpiSet, LaneStatus, ProcessStep, SystemSnapshot};
use crate::status::{ConnectivityStatus, RunState};

pub const PROCESS_FLOW_LIMIT: usize = 10;
pub const EMPTY_SEQUENCE_MESSAGE: &str =
    "No cars processed yet. Start simulation to see the sequence.";
pub const DISCONNECTED_BANNER: &str =
    "Backend not connected. Make sure the simulation server is running on port 8000.";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub kpis: Vec<KpiCard>,
    pub conveyor: ConveyorView,
    pub ovens: Vec<OvenView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KpiCard {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleView {
    pub code: String,
    pub color: ColorInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConveyorView {
    pub current_label: String,
    pub current_color: ColorInfo,
    pub color_changes: u64,
    pub total_picks: u64,
    /// Oldest first; the last entry is the most recent pick.
    pub sequence: Vec<VehicleView>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OvenView {
    pub number: u8,
    pub title: String,
    pub lane_range: String,
    pub lanes: Vec<LaneView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaneView {
    pub id: String,
    /// Literal `current/capacity` as reported upstream.
    pub occupancy: String,
    pub fill_ratio: f64,
    pub status: LaneStatus,
    pub vehicles: Vec<VehicleView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlsView {
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub reset_enabled: bool,
    pub speed_enabled: bool,
    pub banner: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessEventView {
    pub step: ProcessStep,
    pub label: String,
    pub time: Option<String>,
    pub color: Option<VehicleView>,
}

pub fn derive_view(snapshot: Option<&SystemSnapshot>) -> DashboardView {
    match snapshot {
        Some(snapshot) => project(snapshot),
        None => project(&SystemSnapshot::default()),
    }
}

fn project(snapshot: &SystemSnapshot) -> DashboardView {
    let oven1 = &snapshot.buffer_lanes.oven1;
    let oven2 = &snapshot.buffer_lanes.oven2;
    DashboardView {
        kpis: kpi_cards(&snapshot.kpis),
        conveyor: conveyor_view(snapshot),
        ovens: vec![
            oven_view(1, 1, oven1),
            oven_view(2, oven1.len() + 1, oven2),
        ],
    }
}

fn kpi_cards(kpis: &KpiSet) -> Vec<KpiCard> {
    vec![
        KpiCard {
            label: "Throughput",
            value: format_number(kpis.throughput),
        },
        KpiCard {
            label: "Target JPH",
            value: format_number(kpis.target_jph),
        },
        KpiCard {
            label: "Efficiency",
            value: format!("{}%", format_number(kpis.oven_efficiency)),
        },
        KpiCard {
            label: "Changeovers",
            value: format_number(kpis.color_changeovers),
        },
        KpiCard {
            label: "Buffer Usage",
            value: format!("{}%", format_number(kpis.buffer_utilization)),
        },
        KpiCard {
            label: "Overflow",
            value: format_number(kpis.overflow_penalties),
        },
        KpiCard {
            label: "Total Vehicles",
            value: format_number(kpis.total_vehicles),
        },
    ]
}

fn conveyor_view(snapshot: &SystemSnapshot) -> ConveyorView {
    let conveyor = &snapshot.conveyor;
    let sequence: Vec<VehicleView> = conveyor.recent_sequence.iter().map(vehicle).collect();
    let caption = if sequence.is_empty() {
        None
    } else {
        Some(format!("Showing last {} cars", sequence.len()))
    };
    ConveyorView {
        current_label: conveyor
            .current_color
            .as_ref()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "None".to_string()),
        current_color: color::resolve_current(conveyor.current_color.as_ref()),
        color_changes: conveyor.color_changes,
        total_picks: conveyor.total_picks,
        sequence,
        caption,
    }
}

fn oven_view(number: u8, first_lane: usize, lanes: &[BufferLane]) -> OvenView {
    let lane_range = match lanes.len() {
        0 => "No lanes".to_string(),
        1 => format!("Lane {first_lane}"),
        count => format!("Lanes {}-{}", first_lane, first_lane + count - 1),
    };
    OvenView {
        number,
        title: format!("Oven {number}"),
        lane_range,
        lanes: lanes.iter().map(lane_view).collect(),
    }
}

fn lane_view(lane: &BufferLane) -> LaneView {
    LaneView {
        id: lane.id.clone(),
        occupancy: format!("{}/{}", lane.current, lane.capacity),
        fill_ratio: lane.fill_ratio(),
        status: lane.effective_status(),
        vehicles: lane.vehicles.iter().map(vehicle).collect(),
    }
}

fn vehicle(code: &ColorCode) -> VehicleView {
    VehicleView {
        code: code.to_string(),
        color: color::resolve(code),
    }
}

pub fn derive_controls(connectivity: ConnectivityStatus, run: RunState) -> ControlsView {
    let connected = connectivity.is_connected();
    ControlsView {
        start_enabled: connected && !run.is_running(),
        stop_enabled: connected && run.is_running(),
        reset_enabled: connected,
        speed_enabled: connected,
        banner: if connected {
            None
        } else {
            Some(DISCONNECTED_BANNER)
        },
    }
}

pub fn derive_process_flow(history: &ProcessHistory) -> Vec<ProcessEventView> {
    history
        .newest(PROCESS_FLOW_LIMIT)
        .iter()
        .map(|event| ProcessEventView {
            step: event.step.clone(),
            label: event.step.label(),
            time: event
                .timestamp
                .map(|stamp| stamp.format("%H:%M:%S").to_string()),
            color: event.details.color.as_ref().map(vehicle),
        })
        .collect()
}

/// Integers print without a fractional part, everything else as-is (`94.2`).
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{NO_COLOR, UNKNOWN_COLOR};
    use crate::snapshot::{ProcessDetails, ProcessEvent};
    use chrono::{TimeZone, Utc};

    fn busy_snapshot() -> SystemSnapshot {
        let mut snapshot = SystemSnapshot::default();
        snapshot.buffer_lanes.oven1[0].current = 3;
        snapshot.buffer_lanes.oven1[0].vehicles =
            vec!["C1".into(), "C1".into(), "C99".into()];
        snapshot.buffer_lanes.oven2[4].current = 15;
        snapshot.conveyor.current_color = Some("C2".into());
        snapshot.conveyor.recent_sequence = vec!["C2".into(), "C7".into(), "C2".into()];
        snapshot.conveyor.color_changes = 4;
        snapshot.conveyor.total_picks = 9;
        snapshot.kpis.throughput = 9.0;
        snapshot.kpis.buffer_utilization = 13.0;
        snapshot
    }

    #[test]
    fn no_snapshot_renders_documented_default() {
        let view = derive_view(None);
        assert_eq!(view, derive_view(Some(&SystemSnapshot::default())));

        assert_eq!(view.ovens.len(), 2);
        assert_eq!(view.ovens[0].lane_range, "Lanes 1-4");
        assert_eq!(view.ovens[1].lane_range, "Lanes 5-9");
        assert!(view.ovens[0]
            .lanes
            .iter()
            .all(|lane| lane.occupancy == "0/14" && lane.vehicles.is_empty()));
        assert!(view.ovens[1]
            .lanes
            .iter()
            .all(|lane| lane.occupancy == "0/16" && lane.fill_ratio == 0.0));

        let value = |label: &str| {
            view.kpis
                .iter()
                .find(|card| card.label == label)
                .map(|card| card.value.clone())
        };
        assert_eq!(value("Target JPH").as_deref(), Some("900"));
        assert_eq!(value("Efficiency").as_deref(), Some("94.2%"));
        assert_eq!(value("Throughput").as_deref(), Some("0"));
        assert_eq!(value("Overflow").as_deref(), Some("0"));

        assert_eq!(view.conveyor.current_label, "None");
        assert_eq!(view.conveyor.current_color, NO_COLOR);
        assert!(view.conveyor.sequence.is_empty());
        assert_eq!(view.conveyor.caption, None);
    }

    #[test]
    fn derive_is_referentially_transparent() {
        let snapshot = busy_snapshot();
        assert_eq!(derive_view(Some(&snapshot)), derive_view(Some(&snapshot)));
        assert_eq!(derive_view(None), derive_view(None));
    }

    #[test]
    fn lanes_show_reported_counts_and_fallback_colors() {
        let view = derive_view(Some(&busy_snapshot()));
        let lane = &view.ovens[0].lanes[0];
        assert_eq!(lane.occupancy, "3/14");
        assert_eq!(lane.vehicles.len(), 3);
        assert_eq!(lane.vehicles[0].color.name, "Red");
        assert_eq!(lane.vehicles[2].code, "C99");
        assert_eq!(lane.vehicles[2].color, UNKNOWN_COLOR);

        let crowded = &view.ovens[1].lanes[4];
        assert_eq!(crowded.occupancy, "15/16");
        assert!(crowded.vehicles.is_empty());
        assert_eq!(crowded.status, LaneStatus::Critical);
        assert!((crowded.fill_ratio - 15.0 / 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn caption_tracks_sequence_length() {
        let mut snapshot = busy_snapshot();
        let view = derive_view(Some(&snapshot));
        assert_eq!(view.conveyor.caption.as_deref(), Some("Showing last 3 cars"));
        assert_eq!(view.conveyor.current_label, "C2");
        assert_eq!(view.conveyor.current_color.name, "Green");

        snapshot.conveyor.recent_sequence = (0..20).map(|_| ColorCode::from("C1")).collect();
        let view = derive_view(Some(&snapshot));
        assert_eq!(view.conveyor.sequence.len(), 20);
        assert_eq!(
            view.conveyor.caption.as_deref(),
            Some("Showing last 20 cars")
        );
    }

    #[test]
    fn lane_ranges_follow_topology() {
        let mut snapshot = SystemSnapshot::default();
        snapshot.buffer_lanes.oven1.truncate(1);
        snapshot.buffer_lanes.oven2.clear();
        let view = derive_view(Some(&snapshot));
        assert_eq!(view.ovens[0].lane_range, "Lane 1");
        assert_eq!(view.ovens[1].lane_range, "No lanes");
    }

    #[test]
    fn controls_reflect_connectivity_and_run_state() {
        let offline = derive_controls(ConnectivityStatus::Disconnected, RunState::Running);
        assert!(!offline.start_enabled && !offline.stop_enabled && !offline.reset_enabled);
        assert!(!offline.speed_enabled);
        assert_eq!(offline.banner, Some(DISCONNECTED_BANNER));

        let idle = derive_controls(ConnectivityStatus::Connected, RunState::Stopped);
        assert!(idle.start_enabled && !idle.stop_enabled && idle.reset_enabled);
        assert!(idle.speed_enabled);
        assert_eq!(idle.banner, None);

        let running = derive_controls(ConnectivityStatus::Connected, RunState::Running);
        assert!(!running.start_enabled && running.stop_enabled && running.reset_enabled);
        assert!(running.speed_enabled, "speed can change mid-run");
    }

    #[test]
    fn process_flow_shows_ten_newest_entries() {
        let events: Vec<ProcessEvent> = (0..12)
            .map(|idx| ProcessEvent {
                step: if idx % 2 == 0 {
                    ProcessStep::ConveyorPickup
                } else {
                    ProcessStep::ColorChange
                },
                timestamp: Utc.with_ymd_and_hms(2026, 2, 7, 21, 0, idx).single(),
                details: ProcessDetails {
                    color: Some(ColorCode::from("C3")),
                    ..ProcessDetails::default()
                },
            })
            .collect();
        let mut history = ProcessHistory::new();
        history.absorb(&events);

        let flow = derive_process_flow(&history);
        assert_eq!(flow.len(), 10);
        assert_eq!(flow[0].label, "COLOR CHANGE");
        assert_eq!(flow[0].time.as_deref(), Some("21:00:11"));
        assert_eq!(
            flow[0].color.as_ref().map(|c| c.color.name),
            Some("Blue")
        );
    }

    #[test]
    fn numbers_drop_trailing_zero_fraction() {
        assert_eq!(format_number(900.0), "900");
        assert_eq!(format_number(94.2), "94.2");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(f64::NAN), "NaN");
    }
}
