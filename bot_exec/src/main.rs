//! Main robot executable entry point.
//!
//! # Architecture
//!
//! The executable wires the control core to the simulated robot and runs a scripted match:
//!
//!     - Load parameters and start the session
//!     - Build the simulated hardware and the drive controller, calibrate the yaw sensor
//!     - Main loop (the runtime), every tick:
//!         - Observe the competition state and controller
//!         - Fire the periodic hook, which counts the enabled ticks
//!         - Step the mode machine, firing the hooks below
//!     - Report scheduler and drive statistics
//!
//! The autonomous routine runs inside the autonomous enter hook. It blocks, ticking the drive
//! controller itself, and is cancelled by the runtime if the robot is disabled part way through.
//!
//! Simulated time only advances when the loop waits, so the whole match runs as fast as the host
//! can compute it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use serde::de::DeserializeOwned;
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use structopt::StructOpt;

// Internal
use bot_lib::{
    drive_ctrl::{self, ArcDirection, DriveCtrl, MoveOptions, MoveStatus, TimedCommand},
    geom::{Rotation2d, Translation1d, Translation2d},
    mode::{ButtonMap, Mode, ModeHooks, ModeMachine, RobotState},
    params::BotExecParams,
    runtime::Runtime,
    sched::{Scheduler, TickWait},
    sim::{Sim, SimClock, SimMotor, SimYaw},
};
use hal_if::{Button, ButtonEvent};
use util::{
    logger::{logger_init, LevelFilter},
    params::LoadError,
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Step applied to the velocity scalar by the driver's up/down buttons.
const SCALAR_STEP: f64 = 0.1;

/// Bounds on the velocity scalar the driver can select.
const SCALAR_RANGE: (f64, f64) = (0.2, 1.0);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "bot_exec", about = "Tank drive robot, running a scripted simulated match")]
struct Opts {
    /// Directory holding the parameter files, defaults to `$TANK_SW_ROOT/params`
    #[structopt(long, parse(from_os_str))]
    params_dir: Option<PathBuf>,

    /// Run duration in seconds, overrides the exec parameters
    #[structopt(long)]
    duration: Option<f64>,

    /// Minimum log level, overrides the exec parameters
    #[structopt(long)]
    log_level: Option<LevelFilter>,
}

type SimDrive = DriveCtrl<SimMotor, SimYaw, SimClock>;

/// Hooks run by the mode machine.
struct BotHooks {
    drive: SimDrive,

    /// Velocity scalar selected by the driver, applied on the next driver tick.
    requested_scalar: Rc<Cell<f64>>,

    /// Number of background commands which have run.
    background_runs: Arc<AtomicUsize>,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- LOAD PARAMETERS ----

    let exec_params: BotExecParams =
        load_params(&opts, "exec.toml").wrap_err("Could not load exec params")?;
    let drive_params: drive_ctrl::Params =
        load_params(&opts, "drive_ctrl.toml").wrap_err("Could not load drive_ctrl params")?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("bot_exec", "sessions", exec_params.tm_queue_len)
        .wrap_err("Failed to create the session")?;

    let log_level = match opts.log_level {
        Some(l) => l,
        None => LevelFilter::from_str(&exec_params.log_level).map_err(|e| {
            eyre!("Invalid log level {:?} in exec params: {}", exec_params.log_level, e)
        })?,
    };
    logger_init(log_level, &[("bot_lib::sim", LevelFilter::Info)], &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Tank Drive Robot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    let duration_s = opts.duration.unwrap_or(exec_params.duration_s);

    // ---- INITIALISE HARDWARE ----

    let sim = Sim::new(exec_params.sim);
    for e in exec_params.events.iter() {
        sim.schedule(e.time_s, e.event);
    }
    info!(
        "Simulation initialised with {} scripted events",
        exec_params.events.len()
    );

    // ---- INITIALISE MODULES ----

    let mut drive = DriveCtrl::new(
        drive_params,
        sim.left_motor(),
        sim.right_motor(),
        sim.yaw(),
        sim.clock(),
        session.telemetry(),
    )
    .wrap_err("Failed to initialise DriveCtrl")?;

    drive
        .calibrate()
        .wrap_err("Failed to calibrate the yaw sensor")?;
    info!("DriveCtrl init complete");

    let requested_scalar = Rc::new(Cell::new(drive.velocity_scalar()));
    let buttons = bind_buttons(&requested_scalar);

    let scheduler = Scheduler::new(
        sim.clock(),
        exec_params.tick_period_s,
        exec_params.warn_period_s,
    )
    .wrap_err("Failed to create the scheduler")?;

    let mut runtime = Runtime::new(
        scheduler,
        ModeMachine::new(buttons),
        sim.competition(),
        sim.controller(),
    );

    let enabled_ticks = Rc::new(Cell::new(0u64));
    let ticks = enabled_ticks.clone();
    runtime.set_periodic(move |state| {
        if state.enabled {
            ticks.set(ticks.get() + 1);
        }
    });

    let mut hooks = BotHooks {
        drive,
        requested_scalar,
        background_runs: Arc::new(AtomicUsize::new(0)),
    };

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    runtime.run_for(&mut hooks, duration_s)?;

    hooks.drive.stop().wrap_err("Failed to stop the drive")?;

    // ---- SHUTDOWN ----

    let stats = runtime.stats();
    info!(
        "Scheduler: {} ticks ({} enabled), {} overruns (max {:.06} s), {} dropped periods",
        stats.num_ticks,
        enabled_ticks.get(),
        stats.num_overruns,
        stats.max_overrun_s,
        stats.num_dropped_periods
    );

    let report = hooks.drive.report();
    info!(
        "DriveCtrl: {} movements, {} completed, {} timed out, {} cancelled",
        report.num_moves(),
        report.num_completed,
        report.num_timeout,
        report.num_cancelled
    );
    info!(
        "Final pose {:?}, true pose {:?}, {} background commands run",
        hooks.drive.pose(),
        sim.true_pose(),
        hooks.background_runs.load(Ordering::Relaxed)
    );

    info!("End of execution");
    session.exit();

    Ok(())
}

/// Load a parameter file from the command line's directory or the software root.
fn load_params<P: DeserializeOwned>(opts: &Opts, file: &str) -> Result<P, LoadError> {
    match opts.params_dir {
        Some(ref dir) => util::params::load_from_path(dir.join(file)),
        None => util::params::load(file),
    }
}

fn bind_buttons(requested_scalar: &Rc<Cell<f64>>) -> ButtonMap {
    let mut buttons = ButtonMap::new();

    let s = requested_scalar.clone();
    buttons.bind(ButtonEvent::pressed(Button::Up), move || {
        s.set((s.get() + SCALAR_STEP).min(SCALAR_RANGE.1))
    });

    let s = requested_scalar.clone();
    buttons.bind(ButtonEvent::pressed(Button::Down), move || {
        s.set((s.get() - SCALAR_STEP).max(SCALAR_RANGE.0))
    });

    buttons
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BotHooks {
    /// The autonomous routine, a loop out and back to the start.
    fn autonomous(&mut self, ticks: &mut dyn TickWait) -> Result<MoveStatus, Report> {
        let status = self.drive.turn_to(Rotation2d::from_degrees(90.0), ticks)?;
        if status == MoveStatus::Cancelled {
            return Ok(status);
        }

        let runs = self.background_runs.clone();
        let options = MoveOptions::straight()
            .with_command(TimedCommand::inline(0.3, || info!("Intake down")))
            .with_command(TimedCommand::background(-0.2, move || {
                runs.fetch_add(1, Ordering::Relaxed);
                info!("Intake up");
            }));
        let status = self.drive.move_straight(
            Translation1d::from_meters(1.0),
            Rotation2d::from_degrees(90.0),
            options,
            ticks,
        )?;
        if status == MoveStatus::Cancelled {
            return Ok(status);
        }

        let status = self.drive.arc(
            Rotation2d::from_degrees(90.0),
            Translation1d::from_meters(0.5),
            ArcDirection::Clockwise,
            Rotation2d::from_degrees(90.0),
            MoveOptions::arc(),
            ticks,
        )?;
        if status == MoveStatus::Cancelled {
            return Ok(status);
        }

        let status = self.drive.move_to_point(
            Translation2d::new(0.0, 0.0),
            MoveOptions::straight().use_back(),
            ticks,
        )?;

        Ok(status)
    }
}

impl ModeHooks for BotHooks {
    fn enter(&mut self, state: RobotState, ticks: &mut dyn TickWait) -> Result<(), Report> {
        if state == RobotState::new(Mode::Autonomous, true) {
            info!("Starting autonomous routine");
            match self.autonomous(ticks)? {
                MoveStatus::Cancelled => warn!("Autonomous routine cancelled"),
                s => info!(
                    "Autonomous routine finished ({:?}), pose {:?}",
                    s,
                    self.drive.pose()
                ),
            }
        }

        Ok(())
    }

    fn on_disable(&mut self) -> Result<(), Report> {
        self.drive.stop().wrap_err("Failed to stop the drive")
    }

    fn state_periodic(
        &mut self,
        state: RobotState,
        _ticks: &mut dyn TickWait,
    ) -> Result<(), Report> {
        if state.mode == Mode::Driver {
            let requested = self.requested_scalar.get();
            if requested != self.drive.velocity_scalar() {
                info!("Velocity scalar set to {:.2}", requested);
                self.drive.set_velocity_scalar(requested)?;
            }
        }

        self.drive.tick().wrap_err("DriveCtrl tick failed")
    }
}
