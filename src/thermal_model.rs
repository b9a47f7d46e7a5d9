//! First-order heater plant used by the host simulation.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalParams {
    pub ambient_temp: f32,
    /// Degrees C per second with the heater fully on.
    pub heating_rate: f32,
    /// Heat loss to ambient per degree of difference, per second.
    pub heat_loss_coefficient: f32,
    /// Factor affecting heat retention (0-1)
    pub thermal_mass: f32,
}

impl Default for ThermalParams {
    fn default() -> Self {
        Self {
            ambient_temp: 22.0,
            heating_rate: 1.5,
            heat_loss_coefficient: 0.02,
            thermal_mass: 0.8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThermalModel {
    params: ThermalParams,
    current_temp: f32,
    steps: u32,
}

impl ThermalModel {
    pub fn new(params: ThermalParams) -> Self {
        Self {
            params,
            current_temp: params.ambient_temp,
            steps: 0,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.current_temp
    }

    /// Advance the plant by `dt_s` seconds and return the true temperature.
    pub fn step(&mut self, heater_on: bool, dt_s: f32) -> f32 {
        let heat_input = if heater_on { self.params.heating_rate } else { 0.0 };

        // Newton's law of cooling
        let temp_diff = self.current_temp - self.params.ambient_temp;
        let heat_loss = self.params.heat_loss_coefficient * temp_diff;

        let net_heat_rate = (heat_input - heat_loss) * self.params.thermal_mass;
        self.current_temp += net_heat_rate * dt_s;

        if self.current_temp < self.params.ambient_temp {
            self.current_temp = self.params.ambient_temp;
        }
        self.steps = self.steps.wrapping_add(1);
        self.current_temp
    }

    /// Temperature as a sensor would report it, with a small ripple (±0.1 °C).
    pub fn sample(&self) -> f32 {
        let ripple = (self.steps % 5) as f32 * 0.05 - 0.1;
        self.current_temp + ripple
    }
}
