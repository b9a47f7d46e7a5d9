use defmt::{error, info};
use embassy_rp::i2c::{Config, I2c, InterruptHandler};
use embassy_time::{with_timeout, Duration, Ticker};

use crate::lm75::Lm75;
use crate::sensor::SensorError;
use crate::{I2CResources, CURRENT_TEMPERATURE};

embassy_rp::bind_interrupts!(struct Irqs {
    I2C0_IRQ => InterruptHandler<embassy_rp::peripherals::I2C0>;
});

#[embassy_executor::task]
pub async fn run_temperature_sensor(r: I2CResources, period: Duration) -> ! {
    let bus = I2c::new_async(r.i2c, r.scl, r.sda, Irqs, Config::default());
    let mut sensor = Lm75::new(bus);

    info!("Starting LM75 temperature sensor task");
    if sensor.set_shutdown(false).await.is_err() {
        error!("LM75 did not accept configuration");
    }

    let mut ticker = Ticker::every(period);
    loop {
        let reading = match with_timeout(period, sensor.read_celsius()).await {
            Ok(Ok(t)) => Ok(t),
            Ok(Err(e)) => {
                error!("Error reading temperature");
                Err(SensorError::from(e))
            }
            Err(_) => {
                error!("Temperature read timed out");
                Err(SensorError::Timeout)
            }
        };
        CURRENT_TEMPERATURE.signal(reading);
        ticker.next().await;
    }
}
