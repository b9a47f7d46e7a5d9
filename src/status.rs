//! Snapshot published after every supervisor tick.

use heapless::String;
use serde::Serialize;

use crate::heater_supervisor::HeaterState;
use crate::sensor::SensorError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupervisorStatus {
    pub state: HeaterState,
    pub temperature: Option<f32>,
    pub sensor_error: Option<SensorError>,
    pub heater_on: bool,
    pub warning_on: bool,
    pub time_in_state_ms: u64,
}

pub fn to_json_heapless(
    status: &SupervisorStatus,
) -> Result<String<256>, serde_json_core::ser::Error> {
    serde_json_core::to_string(status)
}
