#![cfg_attr(not(test), no_std)]

#[cfg(feature = "rp2040")]
pub use defmt as log;

#[cfg(not(feature = "rp2040"))]
pub use log;

pub mod config;
pub mod heater_supervisor;
pub mod lm75;
pub mod sensor;
pub mod status;
pub mod thermal_model;

#[cfg(feature = "rp2040")]
pub mod resources_rp2040;
#[cfg(feature = "rp2040")]
pub use resources_rp2040::*;

#[cfg(feature = "rp2040")]
pub mod heater_rp2040;
#[cfg(feature = "rp2040")]
pub use heater_rp2040 as heater;

#[cfg(feature = "std")]
pub mod heater_std;
#[cfg(feature = "std")]
pub use heater_std as heater;

#[cfg(all(feature = "rp2040", not(feature = "tmp36")))]
pub mod temperature_sensor_lm75;
#[cfg(all(feature = "rp2040", not(feature = "tmp36")))]
pub use temperature_sensor_lm75 as temperature_sensor;

#[cfg(all(feature = "rp2040", feature = "tmp36"))]
pub mod temperature_sensor_tmp36;
#[cfg(all(feature = "rp2040", feature = "tmp36"))]
pub use temperature_sensor_tmp36 as temperature_sensor;

#[cfg(feature = "std")]
pub mod temperature_sensor_mock;
#[cfg(feature = "std")]
pub use temperature_sensor_mock as temperature_sensor;

pub static VERSION: &str = "v0.1";

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_sync::watch::Watch;

pub use config::{ConfigError, IdleExit, SupervisorConfig};
pub use heater_supervisor::{HeaterState, HeaterSupervisor, SupervisorRuntimeState};
pub use sensor::SensorError;
pub use status::SupervisorStatus;

/// Outputs requested by the supervisor for one polling period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorCommand {
    pub heater_on: bool,
    pub warning_on: bool,
}

impl ActuatorCommand {
    pub const ALL_OFF: Self = Self {
        heater_on: false,
        warning_on: false,
    };
}

/// Latest sensor result, signalled by the active temperature sensor task.
pub static CURRENT_TEMPERATURE: Signal<CriticalSectionRawMutex, Result<f32, SensorError>> =
    Signal::new();
/// Commands for the heater/indicator task, re-sent every polling period.
pub static ACTUATOR_COMMANDS: Channel<CriticalSectionRawMutex, ActuatorCommand, 2> =
    Channel::new();
/// Heater output as actually applied, used by the simulated plant.
pub static HEATER_OUTPUT: Watch<CriticalSectionRawMutex, bool, 2> = Watch::new();
pub static CURRENT_STATUS: Watch<CriticalSectionRawMutex, SupervisorStatus, 2> = Watch::new();
