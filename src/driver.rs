use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, TryLockError};
use std::time::Duration;

use embedded_hal::blocking::delay::DelayUs;
use log::{debug, info};

use crate::config::{ResolvedConfig, SensorConfig};
use crate::delay::SpinDelay;
use crate::interrupt::GpiodLines;
use crate::sensor::{Edge, Level, SensorLines};
use crate::types::Measurement;
use crate::{Error, Result};

/// Trigger pulse width. The HC-SR04 needs at least 10 µs.
pub const TRIGGER_PULSE_US: u32 = 10;

/// Low time before the pulse so it starts from a clean edge
const TRIGGER_SETTLE_US: u32 = 2;

/// Where a measurement currently is. Outside a call it is always `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MeasurementState {
    Idle = 0,
    Triggering = 1,
    AwaitingRisingEdge = 2,
    AwaitingFallingEdge = 3,
}

impl MeasurementState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => MeasurementState::Triggering,
            2 => MeasurementState::AwaitingRisingEdge,
            3 => MeasurementState::AwaitingFallingEdge,
            _ => MeasurementState::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementState::Idle => "idle",
            MeasurementState::Triggering => "triggering",
            MeasurementState::AwaitingRisingEdge => "awaiting_rising_edge",
            MeasurementState::AwaitingFallingEdge => "awaiting_falling_edge",
        }
    }
}

struct Hardware<L, D> {
    lines: L,
    delay: D,
}

/// Driver for one HC-SR04 class ultrasonic sensor.
///
/// Owns the trigger and echo lines for its whole lifetime. Measurements
/// are independent of each other: a timeout or GPIO error leaves the
/// driver ready for the next call. Only one measurement runs at a time;
/// a second caller gets [`Error::Busy`] instead of waiting.
pub struct DistanceSensorDriver<L, D = SpinDelay> {
    hardware: Mutex<Hardware<L, D>>,
    state: AtomicU8,
    timeout: Duration,
}

impl DistanceSensorDriver<GpiodLines> {
    /// Resolves the configured pins and requests them from the board's
    /// GPIO chip.
    pub fn new(config: &SensorConfig) -> Result<Self> {
        let resolved = config.validate()?;
        let lines = GpiodLines::open(&resolved.chip, resolved.trigger.line(), resolved.echo.line())?;
        info!(
            "HC-SR04 ready on {} ({}): trigger {}, echo {}",
            resolved.board, resolved.chip, resolved.trigger, resolved.echo
        );
        Ok(Self::with_lines(lines, SpinDelay::new(), &resolved))
    }
}

impl<L, D> DistanceSensorDriver<L, D>
where
    L: SensorLines,
    D: DelayUs<u32> + Send,
{
    /// Builds a driver over already-acquired lines.
    pub fn with_lines(lines: L, delay: D, config: &ResolvedConfig) -> Self {
        Self::from_parts(lines, delay, config.timeout)
    }

    pub fn from_parts(lines: L, delay: D, timeout: Duration) -> Self {
        DistanceSensorDriver {
            hardware: Mutex::new(Hardware { lines, delay }),
            state: AtomicU8::new(MeasurementState::Idle as u8),
            timeout,
        }
    }

    /// Bound on each echo edge wait
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> MeasurementState {
        MeasurementState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Fires one ping and times the echo.
    ///
    /// Fails with [`Error::Busy`] if another measurement is in flight,
    /// [`Error::Timeout`] if either echo edge is missing, and
    /// [`Error::Hardware`] if the lines cannot be driven or read.
    pub fn measure_distance(&self) -> Result<Measurement> {
        let mut hardware = match self.hardware.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(Error::Busy),
            // A panic mid-measurement leaves nothing to repair: every
            // cycle starts by pulling the trigger low.
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let result = self.run_cycle(&mut hardware);
        self.enter(MeasurementState::Idle);

        match &result {
            Ok(m) => debug!(
                "Echo {:?} -> {:.3} m",
                m.echo_duration, m.distance_meters
            ),
            Err(e) => debug!("Measurement failed: {}", e),
        }
        result
    }

    /// Distance to the target in meters.
    pub fn get_distance(&self) -> Result<f64> {
        self.measure_distance().map(|m| m.distance_meters)
    }

    fn run_cycle(&self, hardware: &mut Hardware<L, D>) -> Result<Measurement> {
        self.enter(MeasurementState::Triggering);
        hardware.lines.discard_pending()?;
        hardware.lines.set_trigger(Level::Low)?;
        hardware.delay.delay_us(TRIGGER_SETTLE_US);
        hardware.lines.set_trigger(Level::High)?;
        hardware.delay.delay_us(TRIGGER_PULSE_US);
        hardware.lines.set_trigger(Level::Low)?;

        self.enter(MeasurementState::AwaitingRisingEdge);
        let start = self.await_edge(&mut hardware.lines, Edge::Rising)?;

        self.enter(MeasurementState::AwaitingFallingEdge);
        let end = self.await_edge(&mut hardware.lines, Edge::Falling)?;

        let echo = end.checked_sub(start).ok_or_else(|| {
            Error::Hardware(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("echo fell at {:?} before it rose at {:?}", end, start),
            ))
        })?;

        Ok(Measurement::from_echo(echo))
    }

    fn await_edge(&self, lines: &mut L, edge: Edge) -> Result<Duration> {
        lines
            .wait_for_edge(edge, self.timeout)?
            .ok_or(Error::Timeout {
                edge,
                waited: self.timeout,
            })
    }

    fn enter(&self, state: MeasurementState) {
        self.state.store(state as u8, Ordering::Release);
    }
}
