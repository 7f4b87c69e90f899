use conveyor_core::{ColorInfo, ConnectivityStatus, LaneStatus, RunState};
use ratatui::style::Color;

#[derive(Clone, Copy)]
pub struct Theme {
    pub bg: Color,
    pub border: Color,
    pub title: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub ok: Color,
    pub warn: Color,
    pub critical: Color,
}

pub fn theme() -> Theme {
    Theme {
        bg: Color::Rgb(17, 24, 39),
        border: Color::Rgb(55, 65, 81),
        title: Color::Rgb(191, 219, 254),
        text: Color::Rgb(229, 231, 235),
        muted: Color::Rgb(156, 163, 175),
        accent: Color::Rgb(96, 165, 250),
        ok: Color::Rgb(34, 197, 94),
        warn: Color::Rgb(234, 179, 8),
        critical: Color::Rgb(239, 68, 68),
    }
}

pub mod icons {
    pub const VEHICLE: &str = "\u{25A0}";
    pub const LATEST: &str = "\u{25B6}";
    pub const FILLED: &str = "\u{2588}";
    pub const UNFILLED: &str = "\u{2591}";
}

pub fn paint(info: ColorInfo) -> Color {
    let rgb = info.rgb;
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

pub fn lane_status_color(theme: Theme, status: LaneStatus) -> Color {
    match status {
        LaneStatus::Active => theme.ok,
        LaneStatus::Warning => theme.warn,
        LaneStatus::Critical => theme.critical,
    }
}

pub fn connectivity_color(theme: Theme, status: ConnectivityStatus) -> Color {
    if status.is_connected() {
        theme.ok
    } else {
        theme.critical
    }
}

pub fn run_color(theme: Theme, run: RunState) -> Color {
    match run {
        RunState::Running => theme.ok,
        RunState::Stopped => theme.muted,
    }
}
