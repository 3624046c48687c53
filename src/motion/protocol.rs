//! Tick-accurate paired wheel commands
//!
//! Converts linear distances into encoder ticks and issues one command per
//! wheel motor. The two sends are independent: a failure on one wheel is
//! logged and reported, never rolled back on the other.
//!
//! Tick-based moves are suppressed entirely while the ticks-per-rotation value
//! is still unknown (or the requested distance rounds down to zero ticks).
//!
//! Tick-based moves address the motors in their raw mounting direction. The
//! chassis mounts wheel B mirrored, so "A forward, B backward" drives the body
//! straight ahead and identical raw directions pivot it in place.

use crate::config::RobotConfig;
use crate::core::driver::MotorActuator;
use crate::core::types::{CommandKind, MotorCommand, MotorId};
use crate::error::Result;
use crate::motion::ticks::TicksPerRotation;

/// Result of one half of a paired command
#[derive(Debug)]
pub struct MotorOutcome {
    pub command: MotorCommand,
    pub result: Result<()>,
}

impl MotorOutcome {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-motor report of a paired command
#[derive(Debug)]
pub struct PairedOutcome {
    pub first: MotorOutcome,
    pub second: MotorOutcome,
}

impl PairedOutcome {
    /// Both motors accepted their command
    pub fn all_ok(&self) -> bool {
        self.first.is_ok() && self.second.is_ok()
    }

    /// Outcomes whose send failed
    pub fn failures(&self) -> impl Iterator<Item = &MotorOutcome> {
        [&self.first, &self.second]
            .into_iter()
            .filter(|outcome| !outcome.is_ok())
    }
}

/// Wheel command composer for a two-wheel differential chassis
pub struct MotionProtocol {
    actuator: Box<dyn MotorActuator>,
    wheel_a: MotorId,
    wheel_b: MotorId,
    wheel_diameter_mm: u32,
    ticks: TicksPerRotation,
}

impl MotionProtocol {
    pub fn new(
        actuator: Box<dyn MotorActuator>,
        robot: &RobotConfig,
        ticks: TicksPerRotation,
    ) -> Self {
        Self {
            actuator,
            wheel_a: robot.left_motor_id,
            wheel_b: robot.right_motor_id,
            wheel_diameter_mm: robot.wheel_diameter_mm,
            ticks,
        }
    }

    #[inline]
    pub fn wheel_a(&self) -> MotorId {
        self.wheel_a
    }

    #[inline]
    pub fn wheel_b(&self) -> MotorId {
        self.wheel_b
    }

    #[inline]
    pub fn wheel_diameter_mm(&self) -> u32 {
        self.wheel_diameter_mm
    }

    /// Live ticks-per-rotation cell
    pub fn ticks(&self) -> &TicksPerRotation {
        &self.ticks
    }

    /// Encoder ticks needed to travel `mm`.
    ///
    /// `mm * ticks_per_rotation / wheel_diameter_mm`, truncated, saturated to
    /// `u32`. Returns 0 while ticks-per-rotation is unknown.
    pub fn millimeters_to_ticks(&self, mm: u32) -> u32 {
        let per_rotation = self.ticks.get();
        if per_rotation == 0 || self.wheel_diameter_mm == 0 {
            return 0;
        }
        let ticks = u64::from(mm) * u64::from(per_rotation) / u64::from(self.wheel_diameter_mm);
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }

    /// Send `kind_a` to motor `a` and `kind_b` to motor `b`.
    ///
    /// Both sends are always attempted.
    pub fn compose_paired_command(
        &mut self,
        a: MotorId,
        kind_a: CommandKind,
        b: MotorId,
        kind_b: CommandKind,
    ) -> PairedOutcome {
        let first = self.send(MotorCommand::new(a, kind_a));
        let second = self.send(MotorCommand::new(b, kind_b));
        PairedOutcome { first, second }
    }

    fn send(&mut self, command: MotorCommand) -> MotorOutcome {
        log::debug!("Sending {}", command);
        let result = self.actuator.send_command(command.motor, command.kind);
        if let Err(e) = &result {
            log::warn!("Failed to send {}: {}", command, e);
        }
        MotorOutcome { command, result }
    }

    fn paired(&mut self, kind_a: CommandKind, kind_b: CommandKind) -> PairedOutcome {
        let (a, b) = (self.wheel_a, self.wheel_b);
        self.compose_paired_command(a, kind_a, b, kind_b)
    }

    /// Both wheels forward
    pub fn forward(&mut self) -> PairedOutcome {
        self.paired(CommandKind::Forward, CommandKind::Forward)
    }

    /// Spin in place: wheel A forward, wheel B backward
    pub fn spin(&mut self) -> PairedOutcome {
        self.paired(CommandKind::Forward, CommandKind::Backward)
    }

    /// Stop both wheels
    pub fn stop(&mut self) -> PairedOutcome {
        self.paired(CommandKind::Stop, CommandKind::Stop)
    }

    /// Set the speed used by later moves on both wheels
    pub fn set_speed(&mut self, speed: u16) -> PairedOutcome {
        self.paired(CommandKind::SetSpeed(speed), CommandKind::SetSpeed(speed))
    }

    /// Drive `mm` straight ahead.
    ///
    /// Returns `None` when the move was suppressed.
    pub fn move_forward_distance(&mut self, mm: u32) -> Option<PairedOutcome> {
        let ticks = self.ticks_or_skip(mm, "move_forward_distance")?;
        Some(self.paired(
            CommandKind::ForwardForTicks(ticks),
            CommandKind::BackwardForTicks(ticks),
        ))
    }

    /// Drive `mm` straight back.
    ///
    /// Returns `None` when the move was suppressed.
    pub fn move_backward_distance(&mut self, mm: u32) -> Option<PairedOutcome> {
        let ticks = self.ticks_or_skip(mm, "move_backward_distance")?;
        Some(self.paired(
            CommandKind::BackwardForTicks(ticks),
            CommandKind::ForwardForTicks(ticks),
        ))
    }

    /// Pivot the body roughly 180 degrees.
    ///
    /// Both wheels run backward for the ticks of one wheel diameter of
    /// travel. Returns `None` when the move was suppressed.
    pub fn turn_back(&mut self) -> Option<PairedOutcome> {
        let ticks = self.ticks_or_skip(self.wheel_diameter_mm, "turn_back")?;
        Some(self.paired(
            CommandKind::BackwardForTicks(ticks),
            CommandKind::BackwardForTicks(ticks),
        ))
    }

    fn ticks_or_skip(&self, mm: u32, operation: &str) -> Option<u32> {
        let ticks = self.millimeters_to_ticks(mm);
        if ticks == 0 {
            if self.ticks.is_unknown() {
                log::debug!("{} skipped: ticks per rotation not known yet", operation);
            } else {
                log::debug!("{} skipped: {} mm is less than one tick", operation, mm);
            }
            return None;
        }
        Some(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::mock::{CommandRecorder, RecordingActuator};

    fn robot(diameter: u32) -> RobotConfig {
        RobotConfig {
            wheel_diameter_mm: diameter,
            left_motor_id: 3,
            right_motor_id: 4,
            ..RobotConfig::default()
        }
    }

    fn protocol(diameter: u32, ticks: u32) -> (MotionProtocol, CommandRecorder) {
        let recorder = CommandRecorder::new();
        let actuator = RecordingActuator::new(recorder.clone());
        let motion = MotionProtocol::new(
            Box::new(actuator),
            &robot(diameter),
            TicksPerRotation::with_value(ticks),
        );
        (motion, recorder)
    }

    #[test]
    fn test_millimeters_to_ticks_scales_by_wheel() {
        let (motion, _) = protocol(200, 50);
        assert_eq!(motion.millimeters_to_ticks(1000), 250);
        assert_eq!(motion.millimeters_to_ticks(0), 0);
        // truncates
        assert_eq!(motion.millimeters_to_ticks(7), 1);
        assert_eq!(motion.millimeters_to_ticks(3), 0);
    }

    #[test]
    fn test_millimeters_to_ticks_non_decreasing() {
        let (motion, _) = protocol(65, 360);
        let mut previous = 0;
        for mm in (0..5000).step_by(13) {
            let ticks = motion.millimeters_to_ticks(mm);
            assert!(ticks >= previous);
            previous = ticks;
        }
    }

    #[test]
    fn test_millimeters_to_ticks_saturates() {
        let (motion, _) = protocol(1, u32::MAX);
        assert_eq!(motion.millimeters_to_ticks(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_unknown_ticks_converts_to_zero() {
        let (motion, _) = protocol(200, 0);
        for mm in [0, 1, 1000, u32::MAX] {
            assert_eq!(motion.millimeters_to_ticks(mm), 0);
        }
    }

    #[test]
    fn test_unknown_ticks_suppresses_tick_moves() {
        let (mut motion, recorder) = protocol(200, 0);
        assert!(motion.move_forward_distance(1000).is_none());
        assert!(motion.move_backward_distance(1000).is_none());
        assert!(motion.turn_back().is_none());
        assert!(recorder.commands().is_empty());
    }

    #[test]
    fn test_ticks_learned_later_enables_moves() {
        let (mut motion, recorder) = protocol(200, 0);
        assert!(motion.move_forward_distance(1000).is_none());

        motion.ticks().set(50);
        let outcome = motion.move_forward_distance(1000).unwrap();
        assert!(outcome.all_ok());
        assert_eq!(
            recorder.commands(),
            vec![
                MotorCommand::new(3, CommandKind::ForwardForTicks(250)),
                MotorCommand::new(4, CommandKind::BackwardForTicks(250)),
            ]
        );
    }

    #[test]
    fn test_move_backward_distance_mirrors_forward() {
        let (mut motion, recorder) = protocol(200, 50);
        motion.move_backward_distance(400).unwrap();
        assert_eq!(
            recorder.commands(),
            vec![
                MotorCommand::new(3, CommandKind::BackwardForTicks(100)),
                MotorCommand::new(4, CommandKind::ForwardForTicks(100)),
            ]
        );
    }

    #[test]
    fn test_turn_back_uses_wheel_diameter() {
        let (mut motion, recorder) = protocol(65, 360);
        motion.turn_back().unwrap();
        assert_eq!(
            recorder.commands(),
            vec![
                MotorCommand::new(3, CommandKind::BackwardForTicks(360)),
                MotorCommand::new(4, CommandKind::BackwardForTicks(360)),
            ]
        );
    }

    #[test]
    fn test_sub_tick_distance_is_suppressed() {
        let (mut motion, recorder) = protocol(200, 50);
        assert!(motion.move_forward_distance(3).is_none());
        assert!(recorder.commands().is_empty());
    }

    #[test]
    fn test_continuous_moves() {
        let (mut motion, recorder) = protocol(65, 0);
        motion.forward();
        motion.spin();
        motion.stop();
        motion.set_speed(600);
        assert_eq!(
            recorder.commands(),
            vec![
                MotorCommand::new(3, CommandKind::Forward),
                MotorCommand::new(4, CommandKind::Forward),
                MotorCommand::new(3, CommandKind::Forward),
                MotorCommand::new(4, CommandKind::Backward),
                MotorCommand::new(3, CommandKind::Stop),
                MotorCommand::new(4, CommandKind::Stop),
                MotorCommand::new(3, CommandKind::SetSpeed(600)),
                MotorCommand::new(4, CommandKind::SetSpeed(600)),
            ]
        );
    }

    #[test]
    fn test_paired_failure_does_not_block_other_motor() {
        let recorder = CommandRecorder::new();
        let actuator = RecordingActuator::new(recorder.clone()).fail_motor(3);
        let mut motion =
            MotionProtocol::new(Box::new(actuator), &robot(65), TicksPerRotation::new());

        let outcome = motion.stop();
        assert!(!outcome.all_ok());
        assert!(outcome.first.result.is_err());
        assert!(outcome.second.is_ok());
        assert_eq!(outcome.failures().count(), 1);
        assert_eq!(recorder.commands(), vec![MotorCommand::new(4, CommandKind::Stop)]);
    }
}
