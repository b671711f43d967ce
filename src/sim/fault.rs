//! Scheduled faults: cloud cover, load spikes, and panel failures.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::devices::{Load, SolarSource};
use crate::error::{ConfigError, ensure_at_least, ensure_fraction};

/// Converts a scenario hour offset to whole seconds.
///
/// # Errors
///
/// Returns a `ConfigError` for `field` if `hours` is negative, not finite,
/// or too large to count in seconds.
pub fn hours_to_seconds(field: &str, hours: f64) -> Result<u64, ConfigError> {
    ensure_at_least(field, hours, 0.0)?;
    let seconds = (hours * 3600.0).round();
    // 2^64 is the first f64 that no longer fits
    if seconds >= u64::MAX as f64 {
        return Err(ConfigError::new(
            field,
            format!("{hours} h does not fit in a u64 second count"),
        ));
    }
    Ok(seconds as u64)
}

/// What a fault does and, for windowed faults, when it ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FaultKind {
    /// Irradiance multiplied by `1 - reduction` during `[start, end)`.
    CloudCover { end_s: u64, reduction: f64 },
    /// `load` draws `spike_w` extra during `[start, end)`.
    LoadSpike {
        end_s: u64,
        load: String,
        spike_w: f64,
    },
    /// Panel efficiency permanently reduced by `degradation`, once.
    PanelFailure { degradation: f64 },
}

/// A fault scheduled at `start_s` seconds into the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultEvent {
    pub start_s: u64,
    #[serde(flatten)]
    pub kind: FaultKind,
}

impl FaultEvent {
    /// Cloud cover over `[start_s, end_s)` reducing irradiance by `reduction`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the window is empty or `reduction` is
    /// outside `[0, 1]`.
    pub fn cloud_cover(start_s: u64, end_s: u64, reduction: f64) -> Result<Self, ConfigError> {
        check_window(start_s, end_s)?;
        ensure_fraction("reduction_factor", reduction)?;
        Ok(Self {
            start_s,
            kind: FaultKind::CloudCover { end_s, reduction },
        })
    }

    /// Extra draw of `spike_w` on `load` over `[start_s, end_s)`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the window is empty, the load name is blank
    /// or `spike_w` is negative.
    pub fn load_spike(
        start_s: u64,
        end_s: u64,
        load: impl Into<String>,
        spike_w: f64,
    ) -> Result<Self, ConfigError> {
        check_window(start_s, end_s)?;
        let load = load.into();
        if load.trim().is_empty() {
            return Err(ConfigError::new("load_name", "must not be empty"));
        }
        ensure_at_least("spike_power_w", spike_w, 0.0)?;
        Ok(Self {
            start_s,
            kind: FaultKind::LoadSpike {
                end_s,
                load,
                spike_w,
            },
        })
    }

    /// One-shot efficiency loss of `degradation` at or after `start_s`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `degradation` is outside `[0, 1]`.
    pub fn panel_failure(start_s: u64, degradation: f64) -> Result<Self, ConfigError> {
        ensure_fraction("degradation", degradation)?;
        Ok(Self {
            start_s,
            kind: FaultKind::PanelFailure { degradation },
        })
    }

    /// End of the window, `None` for one-shot faults.
    pub fn end_s(&self) -> Option<u64> {
        match self.kind {
            FaultKind::CloudCover { end_s, .. } | FaultKind::LoadSpike { end_s, .. } => Some(end_s),
            FaultKind::PanelFailure { .. } => None,
        }
    }

    /// Target load name for spikes.
    pub fn target_load(&self) -> Option<&str> {
        match &self.kind {
            FaultKind::LoadSpike { load, .. } => Some(load),
            _ => None,
        }
    }

    fn overlaps(&self, other: &FaultEvent) -> bool {
        match (self.end_s(), other.end_s()) {
            (Some(a_end), Some(b_end)) => self.start_s < b_end && other.start_s < a_end,
            _ => false,
        }
    }
}

fn check_window(start_s: u64, end_s: u64) -> Result<(), ConfigError> {
    if start_s >= end_s {
        return Err(ConfigError::new(
            "duration_hours",
            format!("window must end after it starts ({start_s}s >= {end_s}s)"),
        ));
    }
    Ok(())
}

/// A fault in effect during a tick, as reported in the step record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum ActiveFault {
    CloudCover { reduction: f64 },
    LoadSpike { load: String, spike_w: f64 },
    PanelFailure { degradation: f64 },
    /// A spike whose target load was missing when the window opened.
    SpikeIgnored { load: String },
}

impl fmt::Display for ActiveFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CloudCover { reduction } => {
                write!(f, "Cloud cover active ({:.0}% reduction)", reduction * 100.0)
            }
            Self::LoadSpike { load, spike_w } => write!(f, "Load spike: {load} +{spike_w:.0}W"),
            Self::PanelFailure { degradation } => {
                write!(f, "Panel failure: {:.0}% degradation", degradation * 100.0)
            }
            Self::SpikeIgnored { load } => write!(f, "Load spike ignored: unknown load {load}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Active,
    Done,
}

#[derive(Debug, Clone)]
struct Scheduled {
    event: FaultEvent,
    phase: Phase,
}

/// Registered faults with their lifecycle.
///
/// Each fault moves `Pending -> Active -> Done` as time crosses its
/// boundaries. A window that is stepped over entirely goes straight to
/// `Done` without touching any component.
#[derive(Debug, Clone, Default)]
pub struct FaultSchedule {
    faults: Vec<Scheduled>,
}

impl FaultSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fault, keeping registration order.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a spike targets a load not in `loads`, or
    /// overlaps another spike on the same load.
    pub fn register(&mut self, event: FaultEvent, loads: &[Load]) -> Result<(), ConfigError> {
        if let Some(target) = event.target_load() {
            if !loads.iter().any(|l| l.name() == target) {
                return Err(ConfigError::new(
                    "load_name",
                    format!("unknown load '{target}'"),
                ));
            }
            let clash = self
                .faults
                .iter()
                .any(|s| s.event.target_load() == Some(target) && s.event.overlaps(&event));
            if clash {
                return Err(ConfigError::new(
                    "load_name",
                    format!("spike on '{target}' overlaps an earlier spike on the same load"),
                ));
            }
        }
        self.faults.push(Scheduled {
            event,
            phase: Phase::Pending,
        });
        Ok(())
    }

    /// Applies faults for the tick starting at `now_s`.
    ///
    /// Must run after the time-of-day irradiance update: cloud cover scales
    /// whatever irradiance the solar source holds. Windows that have ended
    /// are reverted before new ones open, so back-to-back spikes on one
    /// load hand over cleanly.
    pub fn apply(
        &mut self,
        now_s: u64,
        solar: &mut SolarSource,
        loads: &mut [Load],
    ) -> Vec<ActiveFault> {
        for s in &mut self.faults {
            if s.phase == Phase::Active && s.event.end_s().is_some_and(|end| now_s >= end) {
                if let FaultKind::LoadSpike { load, .. } = &s.event.kind {
                    if let Some(l) = find_load(loads, load) {
                        l.end_spike();
                    }
                }
                s.phase = Phase::Done;
                info!(now_s, fault = ?s.event.kind, "fault cleared");
            }
        }

        let mut active = Vec::new();
        for s in &mut self.faults {
            if s.phase == Phase::Done || now_s < s.event.start_s {
                continue;
            }
            match &s.event.kind {
                FaultKind::CloudCover { end_s, reduction } => {
                    if now_s >= *end_s {
                        s.phase = Phase::Done;
                        continue;
                    }
                    if s.phase == Phase::Pending {
                        s.phase = Phase::Active;
                        info!(now_s, reduction, "cloud cover started");
                    }
                    solar.set_irradiance(solar.irradiance() * (1.0 - reduction));
                    active.push(ActiveFault::CloudCover {
                        reduction: *reduction,
                    });
                }
                FaultKind::LoadSpike {
                    end_s,
                    load,
                    spike_w,
                } => {
                    if now_s >= *end_s {
                        s.phase = Phase::Done;
                        continue;
                    }
                    if s.phase == Phase::Pending {
                        match find_load(loads, load) {
                            Some(l) => l.begin_spike(*spike_w),
                            None => {
                                warn!(now_s, load = %load, "load spike targets unknown load; ignored");
                                s.phase = Phase::Done;
                                active.push(ActiveFault::SpikeIgnored { load: load.clone() });
                                continue;
                            }
                        }
                        s.phase = Phase::Active;
                        info!(now_s, load = %load, spike_w, "load spike started");
                    }
                    active.push(ActiveFault::LoadSpike {
                        load: load.clone(),
                        spike_w: *spike_w,
                    });
                }
                FaultKind::PanelFailure { degradation } => {
                    solar.apply_degradation(*degradation);
                    s.phase = Phase::Done;
                    info!(
                        now_s,
                        degradation,
                        efficiency = solar.efficiency(),
                        "panel failure"
                    );
                    active.push(ActiveFault::PanelFailure {
                        degradation: *degradation,
                    });
                }
            }
        }
        active
    }

    /// Registered faults in registration order.
    pub fn events(&self) -> impl Iterator<Item = &FaultEvent> {
        self.faults.iter().map(|s| &s.event)
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }
}

fn find_load<'a>(loads: &'a mut [Load], name: &str) -> Option<&'a mut Load> {
    loads.iter_mut().find(|l| l.name() == name)
}
