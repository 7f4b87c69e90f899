//! Wire model of a full simulation snapshot.
//!
//! Every `system_update` carries one [`SystemSnapshot`]. Snapshots are never merged:
//! the newest one replaces the previous one wholesale.

use crate::color::ColorCode;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const OVEN1_LANES: usize = 4;
pub const OVEN1_LANE_CAPACITY: u32 = 14;
pub const OVEN2_LANES: usize = 5;
pub const OVEN2_LANE_CAPACITY: u32 = 16;
pub const DEFAULT_TARGET_JPH: f64 = 900.0;
pub const DEFAULT_OVEN_EFFICIENCY: f64 = 94.2;

const LANE_CRITICAL_RATIO: f64 = 0.9;
const LANE_WARNING_RATIO: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub buffer_lanes: BufferLanes,
    #[serde(rename = "conveyer", alias = "conveyor")]
    pub conveyor: ConveyorState,
    pub kpis: KpiSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SystemStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_flow: Option<ProcessFlow>,
}

/// Empty lanes of the documented two-oven topology with zeroed counters.
impl Default for SystemSnapshot {
    fn default() -> Self {
        Self {
            buffer_lanes: BufferLanes::default(),
            conveyor: ConveyorState::default(),
            kpis: KpiSet::default(),
            stats: None,
            process_flow: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferLanes {
    pub oven1: Vec<BufferLane>,
    pub oven2: Vec<BufferLane>,
}

impl Default for BufferLanes {
    fn default() -> Self {
        let oven1 = (0..OVEN1_LANES)
            .map(|idx| BufferLane::empty(format!("L{}", idx + 1), OVEN1_LANE_CAPACITY))
            .collect();
        let oven2 = (0..OVEN2_LANES)
            .map(|idx| {
                BufferLane::empty(format!("L{}", OVEN1_LANES + idx + 1), OVEN2_LANE_CAPACITY)
            })
            .collect();
        Self { oven1, oven2 }
    }
}

impl BufferLanes {
    pub fn total_capacity(&self) -> u64 {
        self.oven1
            .iter()
            .chain(self.oven2.iter())
            .map(|lane| u64::from(lane.capacity))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferLane {
    pub id: String,
    pub capacity: u32,
    /// Advisory fill count reported upstream; not re-derived from `vehicles`.
    pub current: u32,
    #[serde(default)]
    pub vehicles: Vec<ColorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LaneStatus>,
}

impl BufferLane {
    pub fn empty(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            capacity,
            current: 0,
            vehicles: Vec::new(),
            status: None,
        }
    }

    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        f64::from(self.current) / f64::from(self.capacity)
    }

    /// Upstream status when present, otherwise classified from the reported fill.
    pub fn effective_status(&self) -> LaneStatus {
        self.status
            .unwrap_or_else(|| LaneStatus::classify(self.current, self.capacity))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneStatus {
    Active,
    Warning,
    Critical,
}

impl LaneStatus {
    pub fn classify(current: u32, capacity: u32) -> Self {
        if capacity == 0 {
            return LaneStatus::Active;
        }
        let ratio = f64::from(current) / f64::from(capacity);
        if ratio >= LANE_CRITICAL_RATIO {
            LaneStatus::Critical
        } else if ratio >= LANE_WARNING_RATIO {
            LaneStatus::Warning
        } else {
            LaneStatus::Active
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LaneStatus::Active => "active",
            LaneStatus::Warning => "warning",
            LaneStatus::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConveyorState {
    #[serde(default)]
    pub current_color: Option<ColorCode>,
    #[serde(default)]
    pub total_picks: u64,
    #[serde(default)]
    pub color_changes: u64,
    /// Most recent pick last.
    #[serde(default)]
    pub recent_sequence: Vec<ColorCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiSet {
    pub throughput: f64,
    #[serde(rename = "targetJPH")]
    pub target_jph: f64,
    #[serde(rename = "colorChangeovers")]
    pub color_changeovers: f64,
    #[serde(rename = "bufferUtilization")]
    pub buffer_utilization: f64,
    #[serde(rename = "ovenEfficiency")]
    pub oven_efficiency: f64,
    #[serde(rename = "totalVehicles")]
    pub total_vehicles: f64,
    #[serde(rename = "overflowPenalties")]
    pub overflow_penalties: f64,
}

impl Default for KpiSet {
    fn default() -> Self {
        Self {
            throughput: 0.0,
            target_jph: DEFAULT_TARGET_JPH,
            color_changeovers: 0.0,
            buffer_utilization: 0.0,
            oven_efficiency: DEFAULT_OVEN_EFFICIENCY,
            total_vehicles: 0.0,
            overflow_penalties: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStats {
    pub oven1_utilization: f64,
    pub oven2_utilization: f64,
    pub total_cars: u64,
    pub penalties: u64,
    pub color_distribution: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessFlow {
    /// Oldest first, as emitted by the simulation.
    #[serde(default)]
    pub recent_operations: Vec<ProcessEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEvent {
    pub step: ProcessStep,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub details: ProcessDetails,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorCode>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProcessStep {
    CarArrival,
    ConveyorPickup,
    ColorChange,
    Other(String),
}

impl ProcessStep {
    pub fn as_str(&self) -> &str {
        match self {
            ProcessStep::CarArrival => "car_arrival",
            ProcessStep::ConveyorPickup => "conveyor_pickup",
            ProcessStep::ColorChange => "color_change",
            ProcessStep::Other(raw) => raw.as_str(),
        }
    }

    /// Human label, e.g. `CAR ARRIVAL`.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }
}

impl From<String> for ProcessStep {
    fn from(value: String) -> Self {
        match value.trim() {
            "car_arrival" => ProcessStep::CarArrival,
            "conveyor_pickup" => ProcessStep::ConveyorPickup,
            "color_change" => ProcessStep::ColorChange,
            _ => ProcessStep::Other(value),
        }
    }
}

impl From<ProcessStep> for String {
    fn from(value: ProcessStep) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ProcessStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts RFC 3339 as well as the naive ISO-8601 form the simulation emits
/// (`2026-02-07T21:00:00.123456`, read as UTC). Anything else becomes `None`.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    let Value::String(raw) = val else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc()))
}
