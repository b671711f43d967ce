//! Color constants and auto-scaling helpers for the TUI.

use ratatui::style::Color;

/// Solar output line color.
pub const SOLAR_COLOR: Color = Color::Yellow;
/// Demand line color.
pub const DEMAND_COLOR: Color = Color::Cyan;
/// SOC gauge color when high (>= 50%).
pub const SOC_HIGH: Color = Color::Green;
/// SOC gauge color when above the reserve.
pub const SOC_MID: Color = Color::Yellow;
/// SOC gauge color at or below the reserve.
pub const SOC_LOW: Color = Color::Red;
/// Header bar foreground.
pub const HEADER_FG: Color = Color::White;
/// Header bar background.
pub const HEADER_BG: Color = Color::DarkGray;
/// Footer help text color.
pub const FOOTER_FG: Color = Color::DarkGray;
/// Shed load and active fault color.
pub const ALERT: Color = Color::Magenta;
/// Active load color.
pub const LOAD_ON: Color = Color::Green;

/// Returns a color based on the battery SOC relative to the reserve.
pub fn soc_color(soc: f64, reserve_soc: f64) -> Color {
    if soc >= 0.5 {
        SOC_HIGH
    } else if soc > reserve_soc {
        SOC_MID
    } else {
        SOC_LOW
    }
}

/// Computes Y-axis bounds from chart data points with 10% headroom.
///
/// Power never goes negative, so the lower bound is pinned at zero.
pub fn auto_bounds_y(solar: &[(f64, f64)], demand: &[(f64, f64)]) -> [f64; 2] {
    let max = solar
        .iter()
        .chain(demand.iter())
        .map(|&(_, y)| y)
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() || max <= 0.0 {
        return [0.0, 1.0];
    }
    [0.0, max * 1.1]
}
