//! Supervisor thresholds and timing.
//!
//! The two bench setups the firmware ships with differ only in numbers and in
//! two policy choices (when Idle starts heating, where Overheat releases), so
//! both are plain values of [`SupervisorConfig`].

use core::fmt;

use embassy_time::Duration;

/// Threshold that moves the supervisor out of `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdleExit {
    /// Start heating as soon as the reading is below the target.
    BelowTarget,
    /// Start heating only below `target - hysteresis`.
    BelowBand,
}

impl IdleExit {
    pub fn to_str(&self) -> &'static str {
        match self {
            IdleExit::BelowTarget => "below-target",
            IdleExit::BelowBand => "below-band",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SupervisorConfig {
    /// Desired steady-state temperature (°C).
    pub target_temp: f32,
    /// Deadband below target before re-heating (°C).
    pub hysteresis: f32,
    /// Absolute safety ceiling (°C).
    pub overheat_temp: f32,
    /// Minimum dwell in `Stabilizing` before `TargetReached`.
    pub stabilizing_duration: Duration,
    /// `Overheat` releases below `target_temp - reset_margin` (°C).
    pub reset_margin: f32,
    pub idle_exit: IdleExit,
    pub poll_interval: Duration,
}

impl SupervisorConfig {
    /// TMP36 bench: 1 s poll, releases Overheat 5 °C below target.
    pub const ANALOG_BENCH: Self = Self {
        target_temp: 30.0,
        hysteresis: 2.0,
        overheat_temp: 40.0,
        stabilizing_duration: Duration::from_millis(5000),
        reset_margin: 5.0,
        idle_exit: IdleExit::BelowTarget,
        poll_interval: Duration::from_millis(1000),
    };

    /// LM75 bench: 500 ms poll, releases Overheat below target.
    pub const I2C_BENCH: Self = Self {
        target_temp: 40.0,
        hysteresis: 2.0,
        overheat_temp: 50.0,
        stabilizing_duration: Duration::from_millis(5000),
        reset_margin: 0.0,
        idle_exit: IdleExit::BelowBand,
        poll_interval: Duration::from_millis(500),
    };

    pub fn with_target(mut self, target_temp: f32) -> Self {
        self.target_temp = target_temp;
        self
    }

    pub fn with_overheat(mut self, overheat_temp: f32) -> Self {
        self.overheat_temp = overheat_temp;
        self
    }

    pub fn with_hysteresis(mut self, hysteresis: f32) -> Self {
        self.hysteresis = hysteresis;
        self
    }

    pub fn with_reset_margin(mut self, reset_margin: f32) -> Self {
        self.reset_margin = reset_margin;
        self
    }

    pub fn with_stabilizing_duration(mut self, duration: Duration) -> Self {
        self.stabilizing_duration = duration;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_idle_exit(mut self, idle_exit: IdleExit) -> Self {
        self.idle_exit = idle_exit;
        self
    }

    /// Check the invariants the state machine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            self.target_temp,
            self.hysteresis,
            self.overheat_temp,
            self.reset_margin,
        ];
        if thresholds.iter().any(|t| !t.is_finite()) {
            return Err(ConfigError::NonFiniteThreshold);
        }
        if self.overheat_temp <= self.target_temp {
            return Err(ConfigError::OverheatNotAboveTarget);
        }
        if self.hysteresis < 0.0 {
            return Err(ConfigError::NegativeHysteresis);
        }
        if self.reset_margin < 0.0 {
            return Err(ConfigError::NegativeResetMargin);
        }
        if self.poll_interval.as_ticks() == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Reading below which `Idle` starts heating.
    pub fn idle_exit_threshold(&self) -> f32 {
        match self.idle_exit {
            IdleExit::BelowTarget => self.target_temp,
            IdleExit::BelowBand => self.target_temp - self.hysteresis,
        }
    }

    /// Reading below which `TargetReached` heats again.
    pub fn reheat_threshold(&self) -> f32 {
        self.target_temp - self.hysteresis
    }

    /// Reading below which `Overheat` returns to `Idle`.
    pub fn overheat_reset_threshold(&self) -> f32 {
        self.target_temp - self.reset_margin
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::ANALOG_BENCH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    OverheatNotAboveTarget,
    NegativeHysteresis,
    NegativeResetMargin,
    ZeroPollInterval,
    NonFiniteThreshold,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::OverheatNotAboveTarget => {
                write!(f, "overheat temperature must be above the target")
            }
            ConfigError::NegativeHysteresis => write!(f, "hysteresis must not be negative"),
            ConfigError::NegativeResetMargin => write!(f, "reset margin must not be negative"),
            ConfigError::ZeroPollInterval => write!(f, "poll interval must be non-zero"),
            ConfigError::NonFiniteThreshold => write!(f, "thresholds must be finite numbers"),
        }
    }
}
