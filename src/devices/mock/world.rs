//! Simulated chassis: wheel motors, encoders and the panoramic scene
//!
//! Heading is integrated from the body-frame direction of both wheels. The
//! scene is a 360 degree panorama, so a camera that has turned a full circle
//! sees its starting view again.
//!
//! Wheel B is mounted mirrored. Tick moves address it in that raw mounting
//! direction (`BackwardForTicks` on B drives the body forward); continuous
//! `Forward`/`Backward` are already body-frame and take it as-is.

use crate::config::SimulationConfig;
use crate::core::types::{CHANNELS, CommandKind, FeedbackEvent, Frame, MotorId};
use crate::error::{Error, Result};

/// Full duty on the 0-1000 speed scale
const FULL_DUTY: f64 = 1000.0;

/// Angular width of one brightness sector of the panorama
const SECTOR_DEG: f64 = 6.0;

/// State of one wheel motor
#[derive(Debug, Clone, Default)]
struct Wheel {
    id: MotorId,
    /// Raw direction: 1 forward, -1 backward, 0 stopped
    direction: i8,
    /// Tick commands address wheel B in its mirrored mounting direction
    mirrored: bool,
    /// Ticks left before auto-stop
    budget: Option<u32>,
    duty: u16,
    fraction: f64,
    total_ticks: u64,
}

impl Wheel {
    fn new(id: MotorId) -> Self {
        Self {
            id,
            duty: FULL_DUTY as u16,
            ..Self::default()
        }
    }

    fn halt(&mut self) {
        self.direction = 0;
        self.budget = None;
        self.mirrored = false;
    }

    /// Direction in the body frame, scaled by duty
    fn body_velocity(&self) -> f64 {
        let direction = if self.mirrored {
            -self.direction
        } else {
            self.direction
        };
        f64::from(direction) * f64::from(self.duty) / FULL_DUTY
    }
}

/// Simulated robot state shared by the actuator, camera and physics thread
pub struct SimWorld {
    config: SimulationConfig,
    wheel_a: Wheel,
    wheel_b: Wheel,
    heading_deg: f64,
    ticks_reported: bool,
}

impl SimWorld {
    pub fn new(config: SimulationConfig, wheel_a: MotorId, wheel_b: MotorId) -> Self {
        Self {
            config,
            wheel_a: Wheel::new(wheel_a),
            wheel_b: Wheel::new(wheel_b),
            heading_deg: 0.0,
            ticks_reported: false,
        }
    }

    /// Chassis heading in [0, 360)
    #[inline]
    pub fn heading(&self) -> f64 {
        self.heading_deg
    }

    pub fn set_heading(&mut self, degrees: f64) {
        self.heading_deg = degrees.rem_euclid(360.0);
    }

    /// Raw direction of `motor` (1, -1 or 0)
    pub fn direction(&self, motor: MotorId) -> Option<i8> {
        self.wheel(motor).map(|w| w.direction)
    }

    fn wheel(&self, motor: MotorId) -> Option<&Wheel> {
        if motor == self.wheel_a.id {
            Some(&self.wheel_a)
        } else if motor == self.wheel_b.id {
            Some(&self.wheel_b)
        } else {
            None
        }
    }

    /// Apply one motor command
    pub fn apply(&mut self, motor: MotorId, kind: CommandKind) -> Result<()> {
        let is_b = motor == self.wheel_b.id;
        let wheel = if motor == self.wheel_a.id {
            &mut self.wheel_a
        } else if is_b {
            &mut self.wheel_b
        } else {
            return Err(Error::CommandSend {
                motor,
                reason: "no such motor on simulated chassis".to_string(),
            });
        };

        match kind {
            CommandKind::Forward | CommandKind::Backward => {
                wheel.direction = if kind == CommandKind::Forward { 1 } else { -1 };
                wheel.budget = None;
                wheel.mirrored = false;
            }
            CommandKind::ForwardForTicks(ticks) | CommandKind::BackwardForTicks(ticks) => {
                wheel.direction = if matches!(kind, CommandKind::ForwardForTicks(_)) {
                    1
                } else {
                    -1
                };
                wheel.budget = Some(ticks);
                wheel.mirrored = is_b;
            }
            CommandKind::Stop => wheel.halt(),
            CommandKind::SetSpeed(duty) => wheel.duty = duty.min(FULL_DUTY as u16),
        }
        Ok(())
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// Returns feedback raised during the step.
    pub fn step(&mut self, dt: f64) -> Vec<FeedbackEvent> {
        let mut events = Vec::new();

        let yaw_rate = (self.wheel_a.body_velocity() - self.wheel_b.body_velocity()) / 2.0
            * self.config.degrees_per_second;
        self.set_heading(self.heading_deg + yaw_rate * dt);

        let ticks_per_second =
            self.config.rotations_per_second * f64::from(self.config.ticks_per_rotation);
        for wheel in [&mut self.wheel_a, &mut self.wheel_b] {
            if let Some(event) = advance_encoder(wheel, ticks_per_second, dt) {
                events.push(event);
            }
        }

        let per_rotation = u64::from(self.config.ticks_per_rotation);
        if !self.ticks_reported
            && per_rotation > 0
            && (self.wheel_a.total_ticks >= per_rotation || self.wheel_b.total_ticks >= per_rotation)
        {
            self.ticks_reported = true;
            events.push(FeedbackEvent::TicksPerRotation(self.config.ticks_per_rotation));
        }

        events
    }

    /// Camera view at the current heading
    pub fn render(&self) -> Frame {
        render_view(&self.config, self.heading_deg)
    }
}

/// Count encoder ticks for one wheel and auto-stop once its budget is spent
fn advance_encoder(wheel: &mut Wheel, ticks_per_second: f64, dt: f64) -> Option<FeedbackEvent> {
    if wheel.direction == 0 {
        return None;
    }

    wheel.fraction += ticks_per_second * f64::from(wheel.duty) / FULL_DUTY * dt;
    let whole = wheel.fraction.floor();
    wheel.fraction -= whole;
    let whole = whole as u64;
    wheel.total_ticks += whole;

    let remaining = wheel.budget?;
    if whole >= u64::from(remaining) {
        wheel.halt();
        log::debug!("Simulated motor {} spent its tick budget", wheel.id);
        return Some(FeedbackEvent::AutoStop(wheel.id));
    }
    wheel.budget = Some(remaining - whole as u32);
    None
}

/// Render the panorama slice centered on `heading_deg`
pub fn render_view(config: &SimulationConfig, heading_deg: f64) -> Frame {
    let width = config.frame_width;
    let height = config.frame_height;
    let mut pixels = Vec::with_capacity(width as usize * height as usize * CHANNELS);

    for y in 0..height {
        let row = if height > 1 {
            f64::from(y) / f64::from(height - 1)
        } else {
            0.0
        };
        for x in 0..width {
            let column = (f64::from(x) + 0.5) / f64::from(width.max(1)) - 0.5;
            let azimuth = heading_deg + column * config.field_of_view_deg;
            pixels.extend_from_slice(&panorama(azimuth, row));
        }
    }

    // Buffer length is exact by construction
    Frame::from_rgb(width, height, pixels)
        .unwrap_or_else(|| Frame::solid(width, height, [0, 0, 0]))
}

/// Scene color at `azimuth_deg`, `row` in [0, 1] from top to bottom
fn panorama(azimuth_deg: f64, row: f64) -> [u8; 3] {
    let azimuth = azimuth_deg.rem_euclid(360.0);
    let sector = (azimuth / SECTOR_DEG) as u64;
    let brightness = 0.05 + 0.95 * f64::from(sector_hash(sector)) / 255.0;
    let value = brightness * (1.0 - 0.4 * row);
    hsv_to_rgb(azimuth, 0.5, value)
}

/// Stable pseudo-random byte per sector
fn sector_hash(sector: u64) -> u8 {
    let mut z = sector.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    (z ^ (z >> 31)) as u8
}

fn hsv_to_rgb(hue_deg: f64, saturation: f64, value: f64) -> [u8; 3] {
    let c = value * saturation;
    let h = hue_deg.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_byte(r), to_byte(g), to_byte(b)]
}
