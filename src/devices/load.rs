use std::fmt;

use serde::Serialize;

use crate::error::ConfigError;

/// Load priority; a larger rank is shed earlier and restored later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Never shed while anything else can be shed.
    Critical = 0,
    /// Shed only after all deferrable loads.
    High = 1,
    /// Shed first.
    Deferrable = 2,
}

impl Priority {
    /// Ordinal rank (0 = critical, 2 = deferrable).
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Upper-case label used in reports and traces.
    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Deferrable => "DEFERRABLE",
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = ConfigError;

    fn try_from(rank: u8) -> Result<Self, Self::Error> {
        match rank {
            0 => Ok(Self::Critical),
            1 => Ok(Self::High),
            2 => Ok(Self::Deferrable),
            _ => Err(ConfigError::new(
                "priority",
                format!("must be 0 (critical), 1 (high) or 2 (deferrable), got {rank}"),
            )),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An electrical load that the controller can shed and restore.
///
/// Only the controller toggles the active flag; only load-spike faults
/// touch the power draw. The pre-spike draw is kept in an explicit field so
/// the load's shape never changes while a spike is in effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    name: String,
    power_draw_w: f64,
    priority: Priority,
    active: bool,
    shed_count: u32,
    pre_spike_power_w: Option<f64>,
}

impl Load {
    /// Creates an active load.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the name is blank or the draw is not a
    /// positive finite number.
    pub fn new(
        name: impl Into<String>,
        power_draw_w: f64,
        priority: Priority,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigError::new("name", "must not be empty"));
        }
        if !power_draw_w.is_finite() || power_draw_w <= 0.0 {
            return Err(ConfigError::new(
                "power_draw_w",
                format!("must be > 0, got {power_draw_w}"),
            ));
        }
        Ok(Self {
            name,
            power_draw_w,
            priority,
            active: true,
            shed_count: 0,
            pre_spike_power_w: None,
        })
    }

    /// Turns the load on. The shed counter is unchanged.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Turns the load off.
    ///
    /// The shed counter only advances on an active-to-inactive transition;
    /// deactivating an already shed load is a no-op.
    pub fn deactivate(&mut self) {
        if self.active {
            self.active = false;
            self.shed_count += 1;
        }
    }

    /// Power drawn right now: the configured draw when active, else zero.
    pub fn current_draw(&self) -> f64 {
        if self.active { self.power_draw_w } else { 0.0 }
    }

    /// Forces the draw to `original + spike_w`, remembering the original on
    /// the first call of a spike's lifetime.
    pub(crate) fn begin_spike(&mut self, spike_w: f64) {
        let original = *self.pre_spike_power_w.get_or_insert(self.power_draw_w);
        self.power_draw_w = original + spike_w;
    }

    /// Restores the draw remembered by [`Load::begin_spike`], if any.
    pub(crate) fn end_spike(&mut self) {
        if let Some(original) = self.pre_spike_power_w.take() {
            self.power_draw_w = original;
        }
    }

    /// Unique load name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured draw in watts (includes any active spike).
    pub fn power_draw_w(&self) -> f64 {
        self.power_draw_w
    }

    /// Load priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Label for the load priority.
    pub fn priority_label(&self) -> &'static str {
        self.priority.label()
    }

    /// Whether the load is currently powered.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of times the load has been shed.
    pub fn shed_count(&self) -> u32 {
        self.shed_count
    }

    /// Draw before the current spike, while a spike is in effect.
    pub fn pre_spike_power_w(&self) -> Option<f64> {
        self.pre_spike_power_w
    }
}

impl fmt::Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.active { "ACTIVE" } else { "SHED" };
        write!(
            f,
            "{} ({:.0} W, {}, {})",
            self.name, self.power_draw_w, self.priority, status
        )
    }
}
