use clap::{ArgEnum, Parser};
use embassy_executor::Spawner;
use embassy_time::Duration;
use heater_supervisor::heater::heater_task;
use heater_supervisor::heater_supervisor::supervisor_task;
use heater_supervisor::status::to_json_heapless;
use heater_supervisor::temperature_sensor::run_temperature_sensor;
use heater_supervisor::thermal_model::ThermalParams;
use heater_supervisor::{IdleExit, SupervisorConfig, CURRENT_STATUS};
use log::*;

#[derive(Debug, Clone, Copy, ArgEnum)]
enum Preset {
    Analog,
    I2c,
}

#[derive(Debug, Clone, Copy, ArgEnum)]
enum IdleExitArg {
    BelowTarget,
    BelowBand,
}

/// Heater supervisor running against a simulated plant.
#[derive(Debug, Parser)]
#[clap(version)]
struct Args {
    #[clap(long, arg_enum, default_value = "analog")]
    preset: Preset,
    /// Target temperature (°C)
    #[clap(long)]
    target: Option<f32>,
    /// Overheat cutoff (°C)
    #[clap(long)]
    overheat: Option<f32>,
    #[clap(long)]
    hysteresis: Option<f32>,
    /// Overheat releases below target minus this margin (°C)
    #[clap(long)]
    reset_margin: Option<f32>,
    #[clap(long)]
    stabilizing_ms: Option<u64>,
    #[clap(long)]
    poll_ms: Option<u64>,
    #[clap(long, arg_enum)]
    idle_exit: Option<IdleExitArg>,
    /// Ambient temperature of the simulated plant (°C)
    #[clap(long, default_value_t = 22.0)]
    ambient: f32,
    /// Heater rate of the simulated plant (°C/s)
    #[clap(long, default_value_t = 1.5)]
    heating_rate: f32,
    /// Make every Nth sensor sample fail
    #[clap(long)]
    fail_every: Option<u32>,
    /// Print every status snapshot as JSON
    #[clap(long)]
    json: bool,
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

impl Args {
    fn supervisor_config(&self) -> SupervisorConfig {
        let mut config = match self.preset {
            Preset::Analog => SupervisorConfig::ANALOG_BENCH,
            Preset::I2c => SupervisorConfig::I2C_BENCH,
        };
        if let Some(target) = self.target {
            config = config.with_target(target);
        }
        if let Some(overheat) = self.overheat {
            config = config.with_overheat(overheat);
        }
        if let Some(hysteresis) = self.hysteresis {
            config = config.with_hysteresis(hysteresis);
        }
        if let Some(margin) = self.reset_margin {
            config = config.with_reset_margin(margin);
        }
        if let Some(ms) = self.stabilizing_ms {
            config = config.with_stabilizing_duration(Duration::from_millis(ms));
        }
        if let Some(ms) = self.poll_ms {
            config = config.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(idle_exit) = self.idle_exit {
            config = config.with_idle_exit(match idle_exit {
                IdleExitArg::BelowTarget => IdleExit::BelowTarget,
                IdleExitArg::BelowBand => IdleExit::BelowBand,
            });
        }
        config
    }

    fn thermal_params(&self) -> ThermalParams {
        ThermalParams {
            ambient_temp: self.ambient,
            heating_rate: self.heating_rate,
            ..ThermalParams::default()
        }
    }
}

#[embassy_executor::task]
async fn status_task(json: bool) {
    let Some(mut receiver) = CURRENT_STATUS.receiver() else {
        warn!("No status receiver available");
        return;
    };
    loop {
        let status = receiver.changed().await;
        if !json {
            continue;
        }
        match to_json_heapless(&status) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Could not encode status: {:?}", e),
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(args.log_level)
        .format_timestamp_nanos()
        .init();

    let config = args.supervisor_config();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(2);
    }
    info!(
        "Heater supervisor {} ({:?} preset, idle exit {})",
        heater_supervisor::VERSION,
        args.preset,
        config.idle_exit.to_str()
    );

    spawner.spawn(heater_task().unwrap());
    spawner.spawn(
        run_temperature_sensor(args.thermal_params(), config.poll_interval, args.fail_every)
            .unwrap(),
    );
    spawner.spawn(status_task(args.json).unwrap());
    spawner.spawn(supervisor_task(config).unwrap());
}
