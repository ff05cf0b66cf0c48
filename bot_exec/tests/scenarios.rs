//! End to end movements of the drive controller against the simulated robot.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::cell::RefCell;
use std::f64::consts::FRAC_PI_2;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_abs_diff_eq;

use bot_lib::{
    drive_ctrl::{
        ArcDirection, DriveCtrl, DriveCtrlError, MoveKind, MoveOptions, MoveStatus, Params,
        TimedCommand,
    },
    geom::{Rotation2d, Translation1d, Translation2d},
    runtime::GuardedTicker,
    sched::Scheduler,
    sim::{Side, Sim, SimClock, SimEvent, SimMotor, SimParams, SimYaw},
};
use hal_if::Clock;
use util::{maths::smallest_angular_difference, session::Telemetry};

// ------------------------------------------------------------------------------------------------
// FIXTURES
// ------------------------------------------------------------------------------------------------

const PARAMS_TOML: &str = r#"
    track_width_m = 0.3
    wheel_circumference_m = 0.32
    motor_to_wheel_gear_ratio = 0.6
    max_speed_ms = 2.0
    velocity_scalar = 1.0
    acceleration_scalar = 1.0
    turning_threshold_rad = 0.026
    turn_timeout_s = 2.0
    turn_settle_speed_ms = 0.05
    turn_feedforward = 0.03
    turn_max_output = 0.6
    turn_correction_scalar_while_moving = 0.5
    angle_direction = -1.0
    movement_distance_threshold_m = 0.005
    movement_max_extra_time_s = 1.0
    calibration_timeout_s = 3.0
    pid_min_dt_s = 0.005
    rate_min_sample_time_s = 0.005

    [velocity_pidf]
    kp = 0.2
    ki = 0.0
    kd = 0.0
    ki_limit = 0.0
    kf = 0.5

    [position_pid]
    kp = 4.0
    ki = 0.0
    kd = 0.0
    ki_limit = 0.0

    [yaw_pid]
    kp = 0.6
    ki = 0.0
    kd = 0.0
    ki_limit = 0.0
"#;

type SimDrive = DriveCtrl<SimMotor, SimYaw, SimClock>;

/// An enabled robot in autonomous, calibrated and at the origin.
fn setup(sim_params: SimParams) -> (Sim, SimDrive, Scheduler<SimClock>) {
    let sim = Sim::new(sim_params);
    sim.set_enabled(true);
    sim.set_autonomous(true);

    let params: Params = toml::from_str(PARAMS_TOML).unwrap();
    let mut drive = DriveCtrl::new(
        params,
        sim.left_motor(),
        sim.right_motor(),
        sim.yaw(),
        sim.clock(),
        Telemetry::disabled(),
    )
    .unwrap();
    drive.calibrate().unwrap();

    let sched = Scheduler::new(sim.clock(), 0.01, 0.015).unwrap();

    (sim, drive, sched)
}

/// Absolute heading error of `heading` against `target`, both in radians.
fn heading_error(heading: Rotation2d, target: f64) -> f64 {
    smallest_angular_difference(heading.radians(), target).abs()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[test]
fn test_turn_in_place() {
    let (sim, mut drive, mut sched) = setup(SimParams::default());
    let comp = sim.competition();
    let mut ticks = GuardedTicker::new(&mut sched, &comp);

    let status = drive
        .turn_to(Rotation2d::from_degrees(90.0), &mut ticks)
        .unwrap();
    assert_eq!(status, MoveStatus::Completed);

    // Counter-clockwise on the field, settled within the threshold
    let threshold = drive.params().turning_threshold_rad;
    let truth = sim.true_pose();
    assert!(heading_error(truth.rotation, FRAC_PI_2) <= threshold, "{:?}", truth);
    assert!(heading_error(drive.pose().rotation, FRAC_PI_2) <= threshold);
    assert_abs_diff_eq!(truth.translation.x.meters(), 0.0, epsilon = 1e-6);

    let report = drive.report().last_move.unwrap();
    assert_eq!(report.kind, MoveKind::Turn);
    assert!(report.elapsed_s < 2.0);

    // Wheels settled and motors left stopped
    assert!(sim.velocity_ms(Side::Left).abs() + sim.velocity_ms(Side::Right).abs() < 0.05);
    assert_eq!(sim.power(Side::Left), 0.0);
    assert_eq!(sim.power(Side::Right), 0.0);

    // Turning back the other way takes the short way round
    let status = drive
        .turn_to(Rotation2d::from_degrees(-135.0), &mut ticks)
        .unwrap();
    assert_eq!(status, MoveStatus::Completed);
    let target = (-135.0f64).to_radians();
    assert!(heading_error(sim.true_pose().rotation, target) <= threshold);
    assert!(heading_error(drive.pose().rotation, target) <= threshold);
}

#[test]
fn test_move_straight() {
    let (sim, mut drive, mut sched) = setup(SimParams::default());
    let comp = sim.competition();
    let mut ticks = GuardedTicker::new(&mut sched, &comp);

    let status = drive
        .move_straight(
            Translation1d::from_meters(1.0),
            Rotation2d::from_degrees(0.0),
            MoveOptions::straight(),
            &mut ticks,
        )
        .unwrap();
    assert_eq!(status, MoveStatus::Completed);

    let truth = sim.true_pose();
    assert_abs_diff_eq!(truth.translation.x.meters(), 1.0, epsilon = 0.01);
    assert_abs_diff_eq!(truth.translation.y.meters(), 0.0, epsilon = 0.01);
    assert_abs_diff_eq!(drive.pose().translation.x.meters(), 1.0, epsilon = 0.01);

    // Heading held throughout
    let threshold = drive.params().turning_threshold_rad;
    assert!(heading_error(truth.rotation, 0.0) <= threshold, "{:?}", truth);
    assert!(heading_error(drive.pose().rotation, 0.0) <= threshold);

    // A triangular profile, 2 * sqrt(d / a) long, then settling
    let report = drive.report().last_move.unwrap();
    assert_eq!(report.kind, MoveKind::Straight);
    assert_abs_diff_eq!(report.profile_time_s, 2.0f64.sqrt(), epsilon = 1e-9);
    assert!(report.elapsed_s >= report.profile_time_s);
    assert!(report.elapsed_s <= report.profile_time_s + 1.0 + 0.01);
    assert!(report.left_error_m.abs() <= 0.005);
    assert!(report.right_error_m.abs() <= 0.005);
}

#[test]
fn test_acceleration_scalar() {
    let (sim, mut drive, mut sched) = setup(SimParams::default());

    assert!(matches!(
        drive.set_acceleration_scalar(0.0),
        Err(DriveCtrlError::InvalidArgument(_))
    ));
    assert!(matches!(
        drive.set_acceleration_scalar(f64::NAN),
        Err(DriveCtrlError::InvalidArgument(_))
    ));
    assert_eq!(drive.acceleration_scalar(), 1.0);

    drive.set_acceleration_scalar(0.5).unwrap();
    assert_eq!(drive.acceleration_scalar(), 0.5);

    let comp = sim.competition();
    let mut ticks = GuardedTicker::new(&mut sched, &comp);
    let status = drive
        .move_straight(
            Translation1d::from_meters(1.0),
            Rotation2d::from_degrees(0.0),
            MoveOptions::straight(),
            &mut ticks,
        )
        .unwrap();
    assert_eq!(status, MoveStatus::Completed);

    // Half the acceleration stretches the triangle to 2 * sqrt(1 m / 1 m/s^2)
    let report = drive.report().last_move.unwrap();
    assert_abs_diff_eq!(report.profile_time_s, 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(sim.true_pose().translation.x.meters(), 1.0, epsilon = 0.01);
}

#[test]
fn test_drive_normalised() {
    let (sim, mut drive, mut sched) = setup(SimParams::default());

    drive.drive_normalised(0.25, 0.25);
    for _ in 0..100 {
        sched.wait_next();
        drive.tick().unwrap();
    }

    // Both sides driven forward together, so the robot runs straight
    let left_m = sim.position_m(Side::Left);
    assert!(left_m > 0.1, "{}", left_m);
    assert_abs_diff_eq!(sim.position_m(Side::Right), left_m, epsilon = 1e-9);
    assert!(sim.velocity_ms(Side::Left) > 0.0);
    assert_abs_diff_eq!(sim.true_pose().rotation.radians(), 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(drive.pose().translation.x.meters(), left_m, epsilon = 0.01);

    drive.stop().unwrap();
    assert_eq!(sim.power(Side::Left), 0.0);
    assert_eq!(sim.power(Side::Right), 0.0);
}

#[test]
fn test_timed_commands() {
    let (sim, mut drive, mut sched) = setup(SimParams::default());
    let comp = sim.competition();
    let clock = sim.clock();
    let start_s = clock.now_seconds();

    let fired: Rc<RefCell<Vec<(&'static str, f64)>>> = Rc::new(RefCell::new(Vec::new()));
    let (fa, ca) = (fired.clone(), clock.clone());
    let (fb, cb) = (fired.clone(), clock.clone());
    let (fc, cc) = (fired.clone(), clock.clone());

    let options = MoveOptions::straight()
        .with_command(TimedCommand::inline(0.5, move || {
            fa.borrow_mut().push(("a", ca.now_seconds() - start_s))
        }))
        .with_command(TimedCommand::inline(-0.3, move || {
            fb.borrow_mut().push(("b", cb.now_seconds() - start_s))
        }))
        .with_command(TimedCommand::inline(10.0, move || {
            fc.borrow_mut().push(("late", cc.now_seconds() - start_s))
        }));

    let mut ticks = GuardedTicker::new(&mut sched, &comp);
    let status = drive
        .move_straight(
            Translation1d::from_meters(2.0),
            Rotation2d::from_degrees(0.0),
            options,
            &mut ticks,
        )
        .unwrap();
    assert_eq!(status, MoveStatus::Completed);

    // Two meters at 2 m/s and 2 m/s^2 is a 2 s triangle
    let report = drive.report().last_move.unwrap();
    assert_abs_diff_eq!(report.profile_time_s, 2.0, epsilon = 1e-9);
    assert_eq!(report.commands_fired, 3);

    let fired = fired.borrow();
    assert_eq!(fired.len(), 3);

    // Each fires on the first tick at or after its offset
    assert_eq!(fired[0].0, "a");
    assert!(fired[0].1 >= 0.5 - 1e-9 && fired[0].1 < 0.51 + 1e-9, "{:?}", fired);
    assert_eq!(fired[1].0, "b");
    assert!(fired[1].1 >= 1.7 - 1e-9 && fired[1].1 < 1.71 + 1e-9, "{:?}", fired);

    // A command past the end of the movement still fires once it completes
    assert_eq!(fired[2].0, "late");
    assert!(fired[2].1 >= report.profile_time_s);
}

#[test]
fn test_background_command() {
    let (sim, mut drive, mut sched) = setup(SimParams::default());
    let comp = sim.competition();
    let runs = Arc::new(AtomicUsize::new(0));

    let r = runs.clone();
    let options = MoveOptions::straight().with_command(TimedCommand::background(-0.2, move || {
        r.fetch_add(1, Ordering::SeqCst);
    }));

    let mut ticks = GuardedTicker::new(&mut sched, &comp);
    let status = drive
        .move_straight(
            Translation1d::from_meters(0.5),
            Rotation2d::from_degrees(0.0),
            options,
            &mut ticks,
        )
        .unwrap();
    assert_eq!(status, MoveStatus::Completed);

    // Dropping the controller waits for the worker to drain
    drop(drive);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_arc() {
    let (sim, mut drive, mut sched) = setup(SimParams::default());
    drive.set_velocity_scalar(0.5).unwrap();
    let comp = sim.competition();
    let mut ticks = GuardedTicker::new(&mut sched, &comp);

    let status = drive
        .arc(
            Rotation2d::from_degrees(90.0),
            Translation1d::from_meters(0.5),
            ArcDirection::CounterClockwise,
            Rotation2d::from_degrees(0.0),
            MoveOptions::arc(),
            &mut ticks,
        )
        .unwrap();
    assert_eq!(status, MoveStatus::Completed);

    // Inner and outer sides travel theta * (r -/+ track / 2)
    assert_abs_diff_eq!(sim.position_m(Side::Left), FRAC_PI_2 * 0.35, epsilon = 0.005);
    assert_abs_diff_eq!(sim.position_m(Side::Right), FRAC_PI_2 * 0.65, epsilon = 0.005);

    // Quarter circle to the left of the start
    let threshold = drive.params().turning_threshold_rad;
    let truth = sim.true_pose();
    assert!(heading_error(truth.rotation, FRAC_PI_2) <= threshold, "{:?}", truth);
    assert!(heading_error(drive.pose().rotation, FRAC_PI_2) <= threshold);
    assert_abs_diff_eq!(truth.translation.x.meters(), 0.5, epsilon = 0.02);
    assert_abs_diff_eq!(truth.translation.y.meters(), 0.5, epsilon = 0.02);

    let target = drive.target_pose();
    assert_abs_diff_eq!(target.translation.x.meters(), 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(target.translation.y.meters(), 0.5, epsilon = 1e-9);
}

#[test]
fn test_arc_heading_from_start_heading() {
    let (sim, mut drive, mut sched) = setup(SimParams::default());
    drive.set_velocity_scalar(0.5).unwrap();
    let comp = sim.competition();
    let mut ticks = GuardedTicker::new(&mut sched, &comp);

    // Facing 0 but asked to arc from 30 degrees without turning first
    let status = drive
        .arc(
            Rotation2d::from_degrees(90.0),
            Translation1d::from_meters(0.5),
            ArcDirection::CounterClockwise,
            Rotation2d::from_degrees(30.0),
            MoveOptions::arc(),
            &mut ticks,
        )
        .unwrap();
    assert_eq!(status, MoveStatus::Completed);

    // The wheels alone set the turn, a quarter circle from 0
    let truth = sim.true_pose();
    assert!(heading_error(truth.rotation, FRAC_PI_2) <= drive.params().turning_threshold_rad);

    // The heading setpoint was taken from 30 degrees, not from the setpoint held before the arc.
    // The sensor reads clockwise positive, so the error is the true heading less 30 degrees.
    let report = drive.report().last_move.unwrap();
    assert_eq!(report.kind, MoveKind::Arc);
    assert_abs_diff_eq!(
        report.yaw_error_rad,
        truth.rotation.radians() - 30f64.to_radians(),
        epsilon = 1e-3
    );
}

#[test]
fn test_move_to_point() {
    let (sim, mut drive, mut sched) = setup(SimParams::default());
    let comp = sim.competition();
    let mut ticks = GuardedTicker::new(&mut sched, &comp);

    let status = drive
        .move_to_point(
            Translation2d::new(0.0, 0.5),
            MoveOptions::straight(),
            &mut ticks,
        )
        .unwrap();
    assert_eq!(status, MoveStatus::Completed);

    let truth = sim.true_pose();
    assert!((truth.rotation.degrees() - 90.0).abs() < 2.0, "{:?}", truth);
    assert_abs_diff_eq!(truth.translation.x.meters(), 0.0, epsilon = 0.02);
    assert_abs_diff_eq!(truth.translation.y.meters(), 0.5, epsilon = 0.02);
}

#[test]
fn test_cancelled_on_disable() {
    let (sim, mut drive, mut sched) = setup(SimParams::default());
    let comp = sim.competition();
    let start_s = sim.now_s();
    sim.schedule(start_s + 1.005, SimEvent::SetEnabled(false));

    let mut ticks = GuardedTicker::new(&mut sched, &comp);
    let status = drive
        .move_straight(
            Translation1d::from_meters(10.0),
            Rotation2d::from_degrees(0.0),
            MoveOptions::straight(),
            &mut ticks,
        )
        .unwrap();
    assert_eq!(status, MoveStatus::Cancelled);

    // Seen on the first tick after the disable, motors stopped
    let elapsed_s = sim.now_s() - start_s;
    assert!(elapsed_s > 1.005 && elapsed_s < 1.005 + 0.01 + 1e-9, "{}", elapsed_s);
    assert_eq!(sim.power(Side::Left), 0.0);
    assert_eq!(sim.power(Side::Right), 0.0);

    let report = drive.report();
    assert_eq!(report.num_cancelled, 1);
    assert_eq!(report.last_move.unwrap().status, MoveStatus::Cancelled);
}

#[test]
fn test_stuck_times_out() {
    let (sim, mut drive, mut sched) = setup(SimParams::default());
    sim.set_stuck(true);
    let comp = sim.competition();
    let start_s = sim.now_s();

    let mut ticks = GuardedTicker::new(&mut sched, &comp);
    let status = drive
        .move_straight(
            Translation1d::from_meters(1.0),
            Rotation2d::from_degrees(0.0),
            MoveOptions::straight(),
            &mut ticks,
        )
        .unwrap();
    assert_eq!(status, MoveStatus::Timeout);

    // Gives up once the extra time after the profile has run out
    let total_s = 2.0f64.sqrt() + 1.0;
    let elapsed_s = sim.now_s() - start_s;
    assert!(elapsed_s >= total_s && elapsed_s < total_s + 0.02, "{}", elapsed_s);

    let report = drive.report();
    assert_eq!(report.num_timeout, 1);
    assert_abs_diff_eq!(report.last_move.unwrap().left_error_m, 1.0, epsilon = 1e-9);
    assert_eq!(sim.position_m(Side::Left), 0.0);
    assert_abs_diff_eq!(drive.pose().translation.x.meters(), 0.0);
    assert_abs_diff_eq!(drive.pose().translation.y.meters(), 0.0);
}

#[test]
fn test_calibration() {
    // Calibration blocks while the sensor settles
    let (sim, _drive, _sched) = setup(SimParams {
        yaw_calibration_s: 1.0,
        ..SimParams::default()
    });
    assert!(sim.now_s() >= 1.0 && sim.now_s() < 1.05);

    // A sensor which never finishes in time
    let sim = Sim::new(SimParams {
        yaw_calibration_s: 5.0,
        ..SimParams::default()
    });
    let params: Params = toml::from_str(PARAMS_TOML).unwrap();
    let mut drive = DriveCtrl::new(
        params,
        sim.left_motor(),
        sim.right_motor(),
        sim.yaw(),
        sim.clock(),
        Telemetry::disabled(),
    )
    .unwrap();
    assert!(matches!(
        drive.calibrate(),
        Err(DriveCtrlError::CalibrationFailed(_))
    ));

    // A sensor which reports a failure
    sim.fail_next_calibration();
    assert!(matches!(
        drive.calibrate(),
        Err(DriveCtrlError::CalibrationFailed(_))
    ));
}
