use crate::log::*;
use embassy_time::{with_timeout, Duration, Instant, Ticker};
use serde::Serialize;

use crate::config::{ConfigError, SupervisorConfig};
use crate::sensor::{checked_reading, SensorError};
use crate::status::SupervisorStatus;
use crate::{ActuatorCommand, ACTUATOR_COMMANDS, CURRENT_STATUS, CURRENT_TEMPERATURE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaterState {
    Idle,
    Heating,
    Stabilizing,
    TargetReached,
    Overheat,
}

impl HeaterState {
    pub fn to_str(&self) -> &'static str {
        match self {
            HeaterState::Idle => "IDLE",
            HeaterState::Heating => "HEATING",
            HeaterState::Stabilizing => "STABILIZING",
            HeaterState::TargetReached => "TARGET_REACHED",
            HeaterState::Overheat => "OVERHEAT",
        }
    }

    /// Outputs owned by this state.
    pub fn command(&self) -> ActuatorCommand {
        match self {
            HeaterState::Heating => ActuatorCommand {
                heater_on: true,
                warning_on: false,
            },
            HeaterState::Overheat => ActuatorCommand {
                heater_on: false,
                warning_on: true,
            },
            HeaterState::Idle | HeaterState::Stabilizing | HeaterState::TargetReached => {
                ActuatorCommand::ALL_OFF
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorRuntimeState {
    pub current_state: HeaterState,
    pub state_entered_at: Instant,
}

pub struct HeaterSupervisor {
    config: SupervisorConfig,
    runtime: SupervisorRuntimeState,
    last_reading: Result<f32, SensorError>,
}

impl HeaterSupervisor {
    /// Start in `Idle` at `now`. An invalid config is rejected here.
    pub fn new(config: SupervisorConfig, now: Instant) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            "Supervisor starting: target {} C, overheat {} C, hysteresis {} C",
            config.target_temp, config.overheat_temp, config.hysteresis
        );
        Ok(Self {
            config,
            runtime: SupervisorRuntimeState {
                current_state: HeaterState::Idle,
                state_entered_at: now,
            },
            last_reading: Err(SensorError::Timeout),
        })
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn runtime(&self) -> SupervisorRuntimeState {
        self.runtime
    }

    pub fn state(&self) -> HeaterState {
        self.runtime.current_state
    }

    pub fn time_in_state(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.runtime.state_entered_at)
    }

    /// Outputs for the current state and the last reading.
    pub fn command(&self) -> ActuatorCommand {
        let mut command = self.runtime.current_state.command();
        if self.last_reading.is_err() {
            command.heater_on = false;
        }
        command
    }

    /// Evaluate one polling period with a sampled temperature.
    pub fn tick(&mut self, temperature: f32, now: Instant) -> ActuatorCommand {
        self.tick_reading(Ok(temperature), now)
    }

    /// Evaluate one polling period with the sensor result as delivered.
    ///
    /// A failed reading holds the current state and forces the heater off;
    /// it never takes part in a threshold comparison.
    pub fn tick_reading(
        &mut self,
        reading: Result<f32, SensorError>,
        now: Instant,
    ) -> ActuatorCommand {
        self.last_reading = reading.and_then(checked_reading);
        match self.last_reading {
            Ok(temperature) => {
                debug!(
                    "Temperature: {} C | State: {}",
                    temperature,
                    self.runtime.current_state.to_str()
                );
                if let Some(next) = self.next_state(temperature, now) {
                    self.change_state(next, temperature, now);
                }
            }
            Err(e) => {
                warn!(
                    "Sensor read failed ({}), holding {} with heater off",
                    e.to_str(),
                    self.runtime.current_state.to_str()
                );
            }
        }
        self.command()
    }

    pub fn status(&self, now: Instant) -> SupervisorStatus {
        let command = self.command();
        SupervisorStatus {
            state: self.runtime.current_state,
            temperature: self.last_reading.ok(),
            sensor_error: self.last_reading.err(),
            heater_on: command.heater_on,
            warning_on: command.warning_on,
            time_in_state_ms: self.time_in_state(now).as_millis(),
        }
    }

    fn next_state(&self, temperature: f32, now: Instant) -> Option<HeaterState> {
        let config = &self.config;
        let current = self.runtime.current_state;

        // Safety cutoff runs before any state rule.
        if temperature >= config.overheat_temp && current != HeaterState::Overheat {
            return Some(HeaterState::Overheat);
        }

        match current {
            HeaterState::Idle => {
                (temperature < config.idle_exit_threshold()).then_some(HeaterState::Heating)
            }
            HeaterState::Heating => {
                (temperature >= config.target_temp).then_some(HeaterState::Stabilizing)
            }
            HeaterState::Stabilizing => (self.time_in_state(now) >= config.stabilizing_duration)
                .then_some(HeaterState::TargetReached),
            HeaterState::TargetReached => {
                (temperature < config.reheat_threshold()).then_some(HeaterState::Heating)
            }
            HeaterState::Overheat => {
                (temperature < config.overheat_reset_threshold()).then_some(HeaterState::Idle)
            }
        }
    }

    fn change_state(&mut self, next: HeaterState, temperature: f32, now: Instant) {
        if next == self.runtime.current_state {
            return;
        }
        match next {
            HeaterState::Overheat => error!(
                "{} -> {} at {} C, heater cut off",
                self.runtime.current_state.to_str(),
                next.to_str(),
                temperature
            ),
            _ => info!(
                "{} -> {} at {} C",
                self.runtime.current_state.to_str(),
                next.to_str(),
                temperature
            ),
        }
        self.runtime = SupervisorRuntimeState {
            current_state: next,
            state_entered_at: now,
        };
    }

    /// Polling loop: one sample, one tick and one command per poll interval.
    pub async fn run(&mut self) -> ! {
        let poll_interval = self.config.poll_interval;
        let commands = ACTUATOR_COMMANDS.sender();
        let status = CURRENT_STATUS.sender();
        let mut ticker = Ticker::every(poll_interval);

        commands.send(self.command()).await;
        loop {
            let reading = match with_timeout(poll_interval, CURRENT_TEMPERATURE.wait()).await {
                Ok(reading) => reading,
                Err(_) => Err(SensorError::Timeout),
            };
            let now = Instant::now();
            let command = self.tick_reading(reading, now);
            // Outputs are re-asserted every period.
            commands.send(command).await;
            status.send(self.status(now));
            ticker.next().await;
        }
    }
}

#[cfg(any(feature = "std", feature = "rp2040"))]
#[embassy_executor::task]
pub async fn supervisor_task(config: SupervisorConfig) {
    match HeaterSupervisor::new(config, Instant::now()) {
        Ok(mut supervisor) => supervisor.run().await,
        Err(e) => error!("Supervisor not started: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdleExit;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn analog() -> HeaterSupervisor {
        HeaterSupervisor::new(SupervisorConfig::ANALOG_BENCH, at(0)).unwrap()
    }

    /// Drive a fresh supervisor into `target` with the analog bench thresholds.
    fn reach(target: HeaterState) -> (HeaterSupervisor, u64) {
        let mut sup = analog();
        let mut t = 0;
        let path = [(HeaterState::Idle, 20.0), (HeaterState::Heating, 31.0)];
        for (state, temp) in path {
            if sup.state() == target {
                return (sup, t);
            }
            assert_eq!(sup.state(), state);
            t += 1000;
            sup.tick(temp, at(t));
        }
        if target == HeaterState::Stabilizing {
            return (sup, t);
        }
        t += 5000;
        sup.tick(31.0, at(t));
        assert_eq!(sup.state(), HeaterState::TargetReached);
        if target == HeaterState::Overheat {
            t += 1000;
            sup.tick(45.0, at(t));
        }
        assert_eq!(sup.state(), target);
        (sup, t)
    }

    #[test]
    fn rejects_invalid_config_at_construction() {
        let config = SupervisorConfig::ANALOG_BENCH.with_overheat(10.0);
        assert_eq!(
            HeaterSupervisor::new(config, at(0)).err(),
            Some(ConfigError::OverheatNotAboveTarget)
        );
        let config = SupervisorConfig::I2C_BENCH.with_poll_interval(Duration::from_ticks(0));
        assert_eq!(
            HeaterSupervisor::new(config, at(0)).err(),
            Some(ConfigError::ZeroPollInterval)
        );
    }

    #[test]
    fn starts_idle_with_outputs_off() {
        let sup = analog();
        assert_eq!(sup.state(), HeaterState::Idle);
        assert_eq!(sup.runtime().state_entered_at, at(0));
        assert_eq!(sup.command(), ActuatorCommand::ALL_OFF);
    }

    #[test]
    fn end_to_end_scenario() {
        let mut sup = analog();

        let cmd = sup.tick(20.0, at(0));
        assert_eq!(sup.state(), HeaterState::Heating);
        assert!(cmd.heater_on);

        // Stabilizing is entered at t=10_000; offsets below are relative.
        let entered = 10_000;
        let cmd = sup.tick(31.0, at(entered));
        assert_eq!(sup.state(), HeaterState::Stabilizing);
        assert!(!cmd.heater_on);

        sup.tick(31.0, at(entered + 4999));
        assert_eq!(sup.state(), HeaterState::Stabilizing);

        sup.tick(31.0, at(entered + 5000));
        assert_eq!(sup.state(), HeaterState::TargetReached);

        let cmd = sup.tick(27.0, at(entered + 6000));
        assert_eq!(sup.state(), HeaterState::Heating);
        assert!(cmd.heater_on);

        let cmd = sup.tick(41.0, at(entered + 7000));
        assert_eq!(sup.state(), HeaterState::Overheat);
        assert_eq!(
            cmd,
            ActuatorCommand {
                heater_on: false,
                warning_on: true
            }
        );

        let cmd = sup.tick(24.0, at(entered + 8000));
        assert_eq!(sup.state(), HeaterState::Idle);
        assert_eq!(cmd, ActuatorCommand::ALL_OFF);
    }

    #[test]
    fn overheat_preempts_every_state() {
        for state in [
            HeaterState::Idle,
            HeaterState::Heating,
            HeaterState::Stabilizing,
            HeaterState::TargetReached,
        ] {
            let (mut sup, t) = reach(state);
            let cmd = sup.tick(40.0, at(t + 1));
            assert_eq!(sup.state(), HeaterState::Overheat, "from {:?}", state);
            assert!(!cmd.heater_on);
            assert!(cmd.warning_on);
            assert_eq!(sup.runtime().state_entered_at, at(t + 1));
        }
    }

    #[test]
    fn overheat_wins_over_a_pending_dwell_expiry() {
        let (mut sup, t) = reach(HeaterState::Stabilizing);
        sup.tick(55.0, at(t + 60_000));
        assert_eq!(sup.state(), HeaterState::Overheat);
    }

    #[test]
    fn overheat_holds_after_many_ticks() {
        let mut sup = analog();
        for i in 0..50 {
            sup.tick(29.0 + (i % 3) as f32, at(i * 500));
        }
        sup.tick(40.5, at(25_000));
        assert_eq!(sup.state(), HeaterState::Overheat);
    }

    #[test]
    fn constant_inputs_do_not_reset_the_timer() {
        let (mut sup, t) = reach(HeaterState::TargetReached);
        let entered = sup.runtime().state_entered_at;
        for i in 1..=20 {
            sup.tick(29.0, at(t + i * 1000));
            assert_eq!(sup.state(), HeaterState::TargetReached);
            assert_eq!(sup.runtime().state_entered_at, entered);
        }

        let mut sup = analog();
        sup.tick(20.0, at(0));
        for i in 1..=10 {
            sup.tick(25.0, at(i * 1000));
            assert_eq!(sup.state(), HeaterState::Heating);
            assert_eq!(sup.runtime().state_entered_at, at(0));
        }
    }

    #[test]
    fn reheat_requires_strictly_below_band() {
        let (mut sup, t) = reach(HeaterState::TargetReached);
        sup.tick(28.0, at(t + 1000));
        assert_eq!(sup.state(), HeaterState::TargetReached);
        sup.tick(27.99, at(t + 2000));
        assert_eq!(sup.state(), HeaterState::Heating);
    }

    #[test]
    fn stabilizing_dwell_boundary() {
        let (mut sup, t) = reach(HeaterState::Stabilizing);
        sup.tick(31.0, at(t + 4999));
        assert_eq!(sup.state(), HeaterState::Stabilizing);
        sup.tick(31.0, at(t + 5000));
        assert_eq!(sup.state(), HeaterState::TargetReached);
        assert_eq!(sup.runtime().state_entered_at, at(t + 5000));
    }

    #[test]
    fn stabilizing_ignores_temperature_below_overheat() {
        let (mut sup, t) = reach(HeaterState::Stabilizing);
        sup.tick(10.0, at(t + 100));
        assert_eq!(sup.state(), HeaterState::Stabilizing);
    }

    #[test]
    fn overheat_recovery_needs_reset_threshold() {
        let (mut sup, t) = reach(HeaterState::Overheat);
        // reset threshold is 30 - 5 = 25
        for (i, temp) in [45.0, 39.9, 30.0, 25.0].into_iter().enumerate() {
            let cmd = sup.tick(temp, at(t + 1000 * (i as u64 + 1)));
            assert_eq!(sup.state(), HeaterState::Overheat);
            assert!(cmd.warning_on);
        }
        let cmd = sup.tick(24.9, at(t + 10_000));
        assert_eq!(sup.state(), HeaterState::Idle);
        assert!(!cmd.warning_on);
    }

    #[test]
    fn i2c_bench_releases_below_target_and_uses_band_from_idle() {
        let mut sup = HeaterSupervisor::new(SupervisorConfig::I2C_BENCH, at(0)).unwrap();
        sup.tick(39.0, at(500));
        assert_eq!(sup.state(), HeaterState::Idle);
        sup.tick(38.0, at(1000));
        assert_eq!(sup.state(), HeaterState::Idle);
        sup.tick(37.5, at(1500));
        assert_eq!(sup.state(), HeaterState::Heating);

        sup.tick(50.0, at(2000));
        assert_eq!(sup.state(), HeaterState::Overheat);
        sup.tick(40.0, at(2500));
        assert_eq!(sup.state(), HeaterState::Overheat);
        sup.tick(39.5, at(3000));
        assert_eq!(sup.state(), HeaterState::Idle);
    }

    #[test]
    fn idle_exit_policy_is_configurable() {
        let config = SupervisorConfig::ANALOG_BENCH.with_idle_exit(IdleExit::BelowBand);
        let mut sup = HeaterSupervisor::new(config, at(0)).unwrap();
        sup.tick(29.0, at(1000));
        assert_eq!(sup.state(), HeaterState::Idle);
        sup.tick(27.0, at(2000));
        assert_eq!(sup.state(), HeaterState::Heating);
    }

    #[test]
    fn sensor_failure_never_starts_heating() {
        let mut sup = analog();
        let cmd = sup.tick_reading(Err(SensorError::Bus), at(1000));
        assert_eq!(sup.state(), HeaterState::Idle);
        assert_eq!(cmd, ActuatorCommand::ALL_OFF);
        assert_eq!(sup.runtime().state_entered_at, at(0));
    }

    #[test]
    fn sensor_failure_forces_heater_off_and_holds_state() {
        let mut sup = analog();
        sup.tick(20.0, at(0));
        assert!(sup.command().heater_on);

        let cmd = sup.tick_reading(Err(SensorError::Timeout), at(1000));
        assert_eq!(sup.state(), HeaterState::Heating);
        assert!(!cmd.heater_on);

        let cmd = sup.tick(22.0, at(2000));
        assert_eq!(sup.state(), HeaterState::Heating);
        assert!(cmd.heater_on);
    }

    #[test]
    fn sensor_failure_keeps_overheat_warning() {
        let (mut sup, t) = reach(HeaterState::Overheat);
        let cmd = sup.tick_reading(Err(SensorError::Bus), at(t + 1000));
        assert_eq!(sup.state(), HeaterState::Overheat);
        assert!(cmd.warning_on);
    }

    #[test]
    fn dwell_expiry_waits_for_a_valid_reading() {
        let (mut sup, t) = reach(HeaterState::Stabilizing);
        sup.tick_reading(Err(SensorError::Bus), at(t + 6000));
        assert_eq!(sup.state(), HeaterState::Stabilizing);
        sup.tick(30.5, at(t + 7000));
        assert_eq!(sup.state(), HeaterState::TargetReached);
    }

    #[test]
    fn nan_is_treated_as_failure() {
        let mut sup = analog();
        let cmd = sup.tick(f32::NAN, at(1000));
        assert_eq!(sup.state(), HeaterState::Idle);
        assert_eq!(cmd, ActuatorCommand::ALL_OFF);
        assert_eq!(
            sup.status(at(1000)).sensor_error,
            Some(SensorError::InvalidReading)
        );
    }

    #[test]
    fn failure_sentinel_never_starts_heating() {
        let mut sup = analog();
        let cmd = sup.tick(crate::sensor::SENSOR_FAILURE_SENTINEL, at(1000));
        assert_eq!(sup.state(), HeaterState::Idle);
        assert_eq!(cmd, ActuatorCommand::ALL_OFF);
        assert_eq!(sup.runtime().state_entered_at, at(0));
        let status = sup.status(at(1000));
        assert_eq!(status.sensor_error, Some(SensorError::Bus));
        assert_eq!(status.temperature, None);
    }

    #[test]
    fn status_reflects_last_tick() {
        let mut sup = analog();
        sup.tick(20.0, at(0));
        let status = sup.status(at(1500));
        assert_eq!(status.state, HeaterState::Heating);
        assert_eq!(status.temperature, Some(20.0));
        assert!(status.heater_on);
        assert!(!status.warning_on);
        assert_eq!(status.time_in_state_ms, 1500);
    }

    #[test]
    fn supervisors_are_independent() {
        let mut a = analog();
        let mut b = analog();
        a.tick(20.0, at(0));
        assert_eq!(a.state(), HeaterState::Heating);
        assert_eq!(b.state(), HeaterState::Idle);
        b.tick(45.0, at(0));
        assert_eq!(a.state(), HeaterState::Heating);
        assert_eq!(b.state(), HeaterState::Overheat);
    }

    struct NoopWake;

    impl std::task::Wake for NoopWake {
        fn wake(self: std::sync::Arc<Self>) {}
    }

    fn poll_pending<F: core::future::Future>(fut: core::pin::Pin<&mut F>) {
        let waker = std::task::Waker::from(std::sync::Arc::new(NoopWake));
        let mut cx = std::task::Context::from_waker(&waker);
        assert!(fut.poll(&mut cx).is_pending());
    }

    // The only test touching the global channels and the mock clock.
    #[test]
    fn run_loop_times_out_then_repeats_commands() {
        let clock = embassy_time::MockDriver::get();
        clock.reset();
        CURRENT_TEMPERATURE.reset();
        while ACTUATOR_COMMANDS.try_receive().is_ok() {}
        let mut status = CURRENT_STATUS.anon_receiver();

        let period = SupervisorConfig::ANALOG_BENCH.poll_interval;
        let heating = HeaterState::Heating.command();
        let mut sup =
            HeaterSupervisor::new(SupervisorConfig::ANALOG_BENCH, Instant::now()).unwrap();
        let mut run = core::pin::pin!(sup.run());

        // Initial outputs go out before the first wait.
        poll_pending(run.as_mut());
        assert_eq!(
            ACTUATOR_COMMANDS.try_receive().ok(),
            Some(ActuatorCommand::ALL_OFF)
        );

        // No sample within one period.
        clock.advance(period);
        poll_pending(run.as_mut());
        assert_eq!(
            ACTUATOR_COMMANDS.try_receive().ok(),
            Some(ActuatorCommand::ALL_OFF)
        );
        let published = status.try_get().unwrap();
        assert_eq!(published.state, HeaterState::Idle);
        assert_eq!(published.sensor_error, Some(SensorError::Timeout));
        assert!(!published.heater_on);

        CURRENT_TEMPERATURE.signal(Ok(20.0));
        poll_pending(run.as_mut());
        assert_eq!(ACTUATOR_COMMANDS.try_receive().ok(), Some(heating));
        let published = status.try_get().unwrap();
        assert_eq!(published.state, HeaterState::Heating);
        assert_eq!(published.temperature, Some(20.0));

        for _ in 0..3 {
            clock.advance(period);
            poll_pending(run.as_mut());
            assert!(ACTUATOR_COMMANDS.try_receive().is_err());

            CURRENT_TEMPERATURE.signal(Ok(21.0));
            poll_pending(run.as_mut());
            assert_eq!(ACTUATOR_COMMANDS.try_receive().ok(), Some(heating));
            assert!(ACTUATOR_COMMANDS.try_receive().is_err());
        }
    }
}
