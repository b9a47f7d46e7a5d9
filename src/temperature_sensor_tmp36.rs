use defmt::{error, info};
use embassy_rp::adc::{Adc, Channel, Config, InterruptHandler};
use embassy_rp::gpio::Pull;
use embassy_time::{Duration, Ticker};

use crate::sensor::{checked_reading, tmp36_celsius, AnalogScale, SensorError};
use crate::{AdcResources, CURRENT_TEMPERATURE};

embassy_rp::bind_interrupts!(struct Irqs {
    ADC_IRQ_FIFO => InterruptHandler;
});

#[embassy_executor::task]
pub async fn run_temperature_sensor(r: AdcResources, period: Duration) -> ! {
    let mut adc = Adc::new(r.adc, Irqs, Config::default());
    let mut channel = Channel::new_pin(r.sensor, Pull::None);

    info!("Starting TMP36 temperature sensor task");

    let mut ticker = Ticker::every(period);
    loop {
        let reading = match adc.read(&mut channel).await {
            Ok(raw) => checked_reading(tmp36_celsius(raw, AnalogScale::RP2040_12BIT)),
            Err(_) => {
                error!("ADC conversion failed");
                Err(SensorError::Adc)
            }
        };
        CURRENT_TEMPERATURE.signal(reading);
        ticker.next().await;
    }
}
