use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::{Duration, Instant};

use gpiod::{Bias, Chip, EdgeDetect, Input, Lines, Options, Output};
use log::{debug, info};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use crate::sensor::{Edge, Level, SensorLines};
use crate::{Error, Result};

/// Consumer label shown by `gpioinfo` for the requested lines
const CONSUMER: &str = "hcsr04";

/// Most stale echo edges dropped before a ping. An idle sensor queues at
/// most a couple; more means the line is floating or chattering.
const MAX_STALE_EDGES: usize = 64;

/// Queue of timestamped echo edges
trait EdgeSource {
    /// Waits up to `timeout` for an edge to be queued.
    fn ready(&mut self, timeout: Duration) -> Result<bool>;

    /// Takes the next queued edge. Only called after `ready` said so.
    fn next_edge(&mut self) -> Result<(Edge, Duration)>;
}

/// Echo line requested from the GPIO character device
struct EchoLine(Lines<Input>);

impl EdgeSource for EchoLine {
    fn ready(&mut self, timeout: Duration) -> Result<bool> {
        // SAFETY: the descriptor belongs to `self.0`, which outlives the poll.
        let fd = unsafe { BorrowedFd::borrow_raw(self.0.as_raw_fd()) };
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(poll_millis(timeout))) {
            Ok(0) => Ok(false),
            Ok(_) => Ok(true),
            // Interrupted: the caller recomputes its deadline and retries
            Err(Errno::EINTR) => Ok(false),
            Err(e) => Err(io::Error::from(e).into()),
        }
    }

    fn next_edge(&mut self) -> Result<(Edge, Duration)> {
        let event = self.0.read_event()?;
        let edge = match event.edge {
            gpiod::Edge::Rising => Edge::Rising,
            gpiod::Edge::Falling => Edge::Falling,
        };
        Ok((edge, event.time))
    }
}

/// Milliseconds for poll(2), rounded up so the wait is never cut short.
fn poll_millis(remaining: Duration) -> u16 {
    remaining.as_micros().div_ceil(1000).min(u16::MAX as u128) as u16
}

/// Timestamp of the next `edge`, skipping the other kind, or `None` once
/// `timeout` has passed.
fn wait_for<S: EdgeSource>(source: &mut S, edge: Edge, timeout: Duration) -> Result<Option<Duration>> {
    let deadline = Instant::now()
        .checked_add(timeout)
        .ok_or_else(|| Error::config(format!("edge timeout {:?} is out of range", timeout)))?;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        if !source.ready(remaining)? {
            continue;
        }

        let (seen, time) = source.next_edge()?;
        if seen == edge {
            return Ok(Some(time));
        }
        debug!("Skipping {} edge while waiting for {} edge", seen, edge);
    }
}

/// Drops queued edges. Fails if the line keeps producing them.
fn drain<S: EdgeSource>(source: &mut S) -> Result<usize> {
    let mut dropped = 0;
    while source.ready(Duration::ZERO)? {
        if dropped == MAX_STALE_EDGES {
            return Err(Error::Hardware(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "echo line produced more than {} edges while idle; check wiring",
                    MAX_STALE_EDGES
                ),
            )));
        }
        let (edge, _) = source.next_edge()?;
        debug!("Discarding stale {} edge", edge);
        dropped += 1;
    }
    Ok(dropped)
}

/// Trigger and echo lines requested from a Linux GPIO character device.
///
/// The echo line reports both edges. The kernel timestamps each edge
/// when the interrupt fires, so the measured pulse width does not depend
/// on how quickly this thread gets scheduled.
pub struct GpiodLines {
    trigger: Lines<Output>,
    echo: EchoLine,
}

impl GpiodLines {
    pub fn open(chip: &str, trigger: u32, echo: u32) -> Result<Self> {
        let chip = Chip::new(chip)?;

        // Trigger idles low
        let trigger_opts = Options::output([trigger])
            .values([false])
            .consumer(CONSUMER);
        let trigger_handle = chip.request_lines(trigger_opts)?;

        let echo_opts = Options::input([echo])
            .bias(Bias::PullDown)
            .edge(EdgeDetect::Both)
            .consumer(CONSUMER);
        let echo_handle = chip.request_lines(echo_opts)?;

        info!("Requested trigger line {} and echo line {}", trigger, echo);

        Ok(GpiodLines {
            trigger: trigger_handle,
            echo: EchoLine(echo_handle),
        })
    }
}

impl SensorLines for GpiodLines {
    fn set_trigger(&mut self, level: Level) -> Result<()> {
        self.trigger.set_values([level.is_high()])?;
        Ok(())
    }

    fn wait_for_edge(&mut self, edge: Edge, timeout: Duration) -> Result<Option<Duration>> {
        wait_for(&mut self.echo, edge, timeout)
    }

    fn discard_pending(&mut self) -> Result<()> {
        drain(&mut self.echo).map(|_| ())
    }
}
