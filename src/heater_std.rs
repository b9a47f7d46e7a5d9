use crate::log::*;
use crate::{ActuatorCommand, ACTUATOR_COMMANDS, HEATER_OUTPUT};

fn level(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

/// Simulated relay and warning LED: logs edges and feeds the heater level
/// back to the thermal model.
#[embassy_executor::task]
pub async fn heater_task() {
    info!("Starting heater task");
    let receiver = ACTUATOR_COMMANDS.receiver();
    let output = HEATER_OUTPUT.sender();

    let mut applied = ActuatorCommand::ALL_OFF;
    output.send(applied.heater_on);

    loop {
        let command = receiver.receive().await;
        if command.heater_on != applied.heater_on {
            info!("Heater {}", level(command.heater_on));
        }
        if command.warning_on != applied.warning_on {
            warn!("Warning LED {}", level(command.warning_on));
        }
        output.send(command.heater_on);
        applied = command;
    }
}
