use crate::log::*;
use crate::sensor::SensorError;
use crate::thermal_model::{ThermalModel, ThermalParams};
use crate::{CURRENT_TEMPERATURE, HEATER_OUTPUT};
use embassy_time::{Duration, Ticker};

#[embassy_executor::task]
pub async fn run_temperature_sensor(
    params: ThermalParams,
    period: Duration,
    fail_every: Option<u32>,
) -> ! {
    info!(
        "Thermal parameters: ambient={} C, rate={} C/s, loss={}, mass={}",
        params.ambient_temp, params.heating_rate, params.heat_loss_coefficient, params.thermal_mass
    );

    let mut model = ThermalModel::new(params);
    let mut heater = HEATER_OUTPUT.anon_receiver();
    let dt_s = period.as_millis() as f32 / 1000.0;
    let mut ticker = Ticker::every(period);
    let mut heater_on = false;
    let mut samples: u32 = 0;

    loop {
        if let Some(on) = heater.try_get() {
            heater_on = on;
        }
        model.step(heater_on, dt_s);
        samples = samples.wrapping_add(1);

        let reading = match fail_every {
            Some(n) if n > 0 && samples % n == 0 => {
                debug!("Injecting sensor failure on sample {}", samples);
                Err(SensorError::Bus)
            }
            _ => Ok(model.sample()),
        };
        CURRENT_TEMPERATURE.signal(reading);
        ticker.next().await;
    }
}
