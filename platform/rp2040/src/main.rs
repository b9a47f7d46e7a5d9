#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use heater_supervisor::heater::heater_task;
use heater_supervisor::heater_supervisor::supervisor_task;
use heater_supervisor::temperature_sensor::run_temperature_sensor;
use heater_supervisor::SupervisorConfig;
use heater_supervisor::{
    split_resources, AdcResources, AssignedResources, I2CResources, OutputResources,
};
use {defmt_rtt as _, panic_probe as _};

#[cfg(feature = "tmp36")]
const CONFIG: SupervisorConfig = SupervisorConfig::ANALOG_BENCH;
#[cfg(not(feature = "tmp36"))]
const CONFIG: SupervisorConfig = SupervisorConfig::I2C_BENCH;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    let r = split_resources!(p);

    if let Err(e) = CONFIG.validate() {
        error!("Invalid configuration: {}", e);
        return;
    }

    spawner.spawn(unwrap!(heater_task(r.outputs)));
    #[cfg(feature = "tmp36")]
    spawner.spawn(unwrap!(run_temperature_sensor(r.adc, CONFIG.poll_interval)));
    #[cfg(not(feature = "tmp36"))]
    spawner.spawn(unwrap!(run_temperature_sensor(r.i2c, CONFIG.poll_interval)));
    spawner.spawn(unwrap!(supervisor_task(CONFIG)));
}
