//! Sensor attributes as supplied by the robot host.
//!
//! The host hands over a JSON attribute map:
//!
//! ```json
//! { "board": "pi", "trigger_pin": "D23", "echo_interrupt_pin": "D24" }
//! ```
//!
//! Unknown attributes are ignored. `timeout_ms` and `gpio_chip` are
//! optional.

use std::time::Duration;

use serde::Deserialize;

use crate::board::Board;
use crate::pin::PinId;
use crate::{Error, Result};

/// Bound on each echo edge wait when `timeout_ms` is not given
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Accepted range for `timeout_ms`
pub const MIN_TIMEOUT: Duration = Duration::from_micros(1);
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorConfig {
    pub board: String,
    pub trigger_pin: String,
    pub echo_interrupt_pin: String,
    #[serde(default)]
    pub timeout_ms: Option<f64>,
    #[serde(default)]
    pub gpio_chip: Option<String>,
}

/// A validated config: board known, pins resolved and distinct.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub board: Board,
    pub chip: String,
    pub trigger: PinId,
    pub echo: PinId,
    pub timeout: Duration,
}

impl SensorConfig {
    pub fn new(
        board: impl Into<String>,
        trigger_pin: impl Into<String>,
        echo_interrupt_pin: impl Into<String>,
    ) -> Self {
        SensorConfig {
            board: board.into(),
            trigger_pin: trigger_pin.into(),
            echo_interrupt_pin: echo_interrupt_pin.into(),
            timeout_ms: None,
            gpio_chip: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: f64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_gpio_chip(mut self, chip: impl Into<String>) -> Self {
        self.gpio_chip = Some(chip.into());
        self
    }

    /// Parses the host's attribute map. Missing or non-string required
    /// attributes are configuration errors.
    pub fn from_json(attributes: &str) -> Result<Self> {
        serde_json::from_str(attributes)
            .map_err(|e| Error::config(format!("invalid sensor attributes: {}", e)))
    }

    pub fn validate(&self) -> Result<ResolvedConfig> {
        let board = Board::from_name(&self.board)?;
        let trigger = PinId::resolve(board, &self.trigger_pin)?;
        let echo = PinId::resolve(board, &self.echo_interrupt_pin)?;

        if trigger.line() == echo.line() {
            return Err(Error::config(format!(
                "trigger_pin {:?} and echo_interrupt_pin {:?} are both {}",
                self.trigger_pin, self.echo_interrupt_pin, trigger
            )));
        }

        let timeout = match self.timeout_ms {
            None => DEFAULT_TIMEOUT,
            Some(ms) => timeout_from_ms(ms)?,
        };

        let chip = match &self.gpio_chip {
            Some(chip) if chip.trim().is_empty() => {
                return Err(Error::config("gpio_chip must not be empty"))
            }
            Some(chip) => chip.trim().to_string(),
            None => board.default_chip().to_string(),
        };

        Ok(ResolvedConfig {
            board,
            chip,
            trigger,
            echo,
            timeout,
        })
    }
}

/// Whole nanoseconds, range-checked before conversion so huge, tiny or
/// non-finite values are rejected instead of overflowing `Duration`.
fn timeout_from_ms(ms: f64) -> Result<Duration> {
    let nanos = (ms * 1_000_000.0).round();
    let in_range = nanos.is_finite()
        && nanos >= MIN_TIMEOUT.as_nanos() as f64
        && nanos <= MAX_TIMEOUT.as_nanos() as f64;
    if !in_range {
        return Err(Error::config(format!(
            "timeout_ms must be between {} and {} ms, got {}",
            MIN_TIMEOUT.as_secs_f64() * 1000.0,
            MAX_TIMEOUT.as_millis(),
            ms
        )));
    }
    Ok(Duration::from_nanos(nanos as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let config = SensorConfig::from_json(
            r#"{"board": "pi", "trigger_pin": "D23", "echo_interrupt_pin": "D24", "extra": 5}"#,
        )
        .unwrap();
        assert_eq!(config, SensorConfig::new("pi", "D23", "D24"));

        let config = SensorConfig::from_json(
            r#"{"board": "pi", "trigger_pin": "18", "echo_interrupt_pin": "16", "timeout_ms": 60}"#,
        )
        .unwrap();
        assert_eq!(config.timeout_ms, Some(60.0));
    }

    #[test]
    fn test_from_json_rejects_missing_or_mistyped() {
        let test_cases = [
            r#"{"trigger_pin": "D23", "echo_interrupt_pin": "D24"}"#,
            r#"{"board": "pi", "echo_interrupt_pin": "D24"}"#,
            r#"{"board": "pi", "trigger_pin": "D23"}"#,
            r#"{"board": "pi", "trigger_pin": 23, "echo_interrupt_pin": "D24"}"#,
            r#"{"board": "pi", "trigger_pin": "D23", "echo_interrupt_pin": "D24", "timeout_ms": "60"}"#,
            "not json",
        ];
        for attributes in test_cases {
            assert!(
                matches!(SensorConfig::from_json(attributes), Err(Error::Configuration(_))),
                "{}",
                attributes
            );
        }
    }

    #[test]
    fn test_validate() {
        let resolved = SensorConfig::new("pi", "D23", "D24").validate().unwrap();
        assert_eq!(resolved.board, Board::RaspberryPi);
        assert_eq!(resolved.trigger.line(), 23);
        assert_eq!(resolved.echo.line(), 24);
        assert_eq!(resolved.chip, "/dev/gpiochip0");
        assert_eq!(resolved.timeout, DEFAULT_TIMEOUT);

        // Same wiring in physical notation
        let physical = SensorConfig::new("pi", "16", "18").validate().unwrap();
        assert_eq!(physical.trigger, PinId::resolve(Board::RaspberryPi, "16").unwrap());
        assert_eq!(physical.trigger.line(), resolved.trigger.line());
        assert_eq!(physical.echo.line(), resolved.echo.line());

        let custom = SensorConfig::new("pi5", "GPIO5", "GPIO6")
            .with_timeout_ms(60.0)
            .with_gpio_chip("/dev/gpiochip4")
            .validate()
            .unwrap();
        assert_eq!(custom.timeout, Duration::from_millis(60));
        assert_eq!(custom.chip, "/dev/gpiochip4");
    }

    #[test]
    fn test_timeout_bounds() {
        let test_cases = vec![
            (0.001, MIN_TIMEOUT),
            (0.5, Duration::from_micros(500)),
            (60_000.0, MAX_TIMEOUT),
        ];
        for (ms, expected) in test_cases {
            let resolved = SensorConfig::new("pi", "D23", "D24")
                .with_timeout_ms(ms)
                .validate()
                .unwrap();
            assert_eq!(resolved.timeout, expected, "{}", ms);
        }

        let err = SensorConfig::from_json(
            r#"{"board": "pi", "trigger_pin": "D23", "echo_interrupt_pin": "D24", "timeout_ms": 1e30}"#,
        )
        .unwrap()
        .validate();
        assert!(matches!(err, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects() {
        let test_cases = vec![
            SensorConfig::new("arduino", "D23", "D24"),
            SensorConfig::new("pi", "D23", "bogus"),
            SensorConfig::new("pi", "X1", "D24"),
            // same line, different notation
            SensorConfig::new("pi", "D23", "16"),
            SensorConfig::new("pi", "GPIO24", "GPIO24"),
            SensorConfig::new("pi", "D23", "D24").with_timeout_ms(0.0),
            SensorConfig::new("pi", "D23", "D24").with_timeout_ms(-5.0),
            SensorConfig::new("pi", "D23", "D24").with_timeout_ms(f64::NAN),
            SensorConfig::new("pi", "D23", "D24").with_timeout_ms(f64::INFINITY),
            // overflows Duration
            SensorConfig::new("pi", "D23", "D24").with_timeout_ms(1e30),
            SensorConfig::new("pi", "D23", "D24").with_timeout_ms(1e22),
            // rounds to zero
            SensorConfig::new("pi", "D23", "D24").with_timeout_ms(1e-9),
            SensorConfig::new("pi", "D23", "D24").with_timeout_ms(60_001.0),
            SensorConfig::new("pi", "D23", "D24").with_gpio_chip(" "),
        ];
        for config in test_cases {
            assert!(
                matches!(config.validate(), Err(Error::Configuration(_))),
                "{:?}",
                config
            );
        }
    }
}
