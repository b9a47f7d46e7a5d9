use assign_resources::assign_resources;
use embassy_rp::peripherals;
use embassy_rp::Peri;

assign_resources! {
    outputs: OutputResources {
        heater: PIN_8,
        warning_led: PIN_25,
    },
    i2c: I2CResources {
        i2c: I2C0,
        sda: PIN_20,
        scl: PIN_21,
    },
    adc: AdcResources {
        adc: ADC,
        sensor: PIN_26,
    },
}
