use defmt::info;
use embassy_rp::gpio::{Level, Output};

use crate::{OutputResources, ACTUATOR_COMMANDS, HEATER_OUTPUT};

fn level(on: bool) -> Level {
    if on {
        Level::High
    } else {
        Level::Low
    }
}

#[embassy_executor::task]
pub async fn heater_task(r: OutputResources) {
    let mut heater = Output::new(r.heater, Level::Low);
    let mut warning_led = Output::new(r.warning_led, Level::Low);

    let receiver = ACTUATOR_COMMANDS.receiver();
    let output = HEATER_OUTPUT.sender();
    output.send(false);

    info!("Starting heater task");
    loop {
        let command = receiver.receive().await;
        heater.set_level(level(command.heater_on));
        warning_led.set_level(level(command.warning_on));
        output.send(command.heater_on);
    }
}
