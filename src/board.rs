//! Boards the driver knows how to address.
//!
//! Every supported board exposes the Raspberry Pi 40-pin header, so pin
//! names are resolved against the same header table. What differs is the
//! name the host uses for the board.

use std::fmt;

use crate::{Error, Result};

/// Physical header pin number to BCM GPIO number, 40-pin header.
/// Power and ground pins are absent.
const HEADER_TO_BCM: &[(u8, u32)] = &[
    (3, 2),
    (5, 3),
    (7, 4),
    (8, 14),
    (10, 15),
    (11, 17),
    (12, 18),
    (13, 27),
    (15, 22),
    (16, 23),
    (18, 24),
    (19, 10),
    (21, 9),
    (22, 25),
    (23, 11),
    (24, 8),
    (26, 7),
    (29, 5),
    (31, 6),
    (32, 12),
    (33, 13),
    (35, 19),
    (36, 16),
    (37, 26),
    (38, 20),
    (40, 21),
];

/// BCM lines routed to the header, ID EEPROM lines 0 and 1 included
const HEADER_LINES: std::ops::RangeInclusive<u32> = 0..=27;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    RaspberryPi,
    RaspberryPi5,
    RaspberryPiZero,
}

impl Board {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pi" | "rpi" | "raspberry-pi" | "raspberrypi" | "pi3" | "pi4" => Ok(Board::RaspberryPi),
            "pi5" | "rpi5" => Ok(Board::RaspberryPi5),
            "pi-zero" | "pizero" | "pi-zero-2w" => Ok(Board::RaspberryPiZero),
            _ => Err(Error::config(format!(
                "unknown board {:?}. Known boards: pi, rpi, raspberry-pi, pi3, pi4, pi5, pi-zero",
                name
            ))),
        }
    }

    /// GPIO character device for the header lines
    pub fn default_chip(&self) -> &'static str {
        // The Pi 5 RP1 controller is gpiochip0 on current kernels too.
        "/dev/gpiochip0"
    }

    pub fn has_line(&self, bcm: u32) -> bool {
        HEADER_LINES.contains(&bcm)
    }

    /// Maps a physical header pin to its BCM line, if that pin is a GPIO.
    pub fn header_to_bcm(&self, physical: u8) -> Option<u32> {
        HEADER_TO_BCM
            .iter()
            .find(|(pin, _)| *pin == physical)
            .map(|&(_, bcm)| bcm)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Board::RaspberryPi => write!(f, "raspberry-pi"),
            Board::RaspberryPi5 => write!(f, "pi5"),
            Board::RaspberryPiZero => write!(f, "pi-zero"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_names() {
        assert_eq!(Board::from_name("pi").unwrap(), Board::RaspberryPi);
        assert_eq!(Board::from_name(" RPi ").unwrap(), Board::RaspberryPi);
        assert_eq!(Board::from_name("Pi5").unwrap(), Board::RaspberryPi5);
        assert_eq!(Board::from_name("pi-zero").unwrap(), Board::RaspberryPiZero);
        assert!(matches!(
            Board::from_name("jetson-nano"),
            Err(Error::Configuration(_))
        ));
        assert!(Board::from_name("").is_err());
    }

    #[test]
    fn test_header_table() {
        let board = Board::RaspberryPi;
        assert_eq!(board.header_to_bcm(16), Some(23));
        assert_eq!(board.header_to_bcm(18), Some(24));
        assert_eq!(board.header_to_bcm(40), Some(21));
        // 5V, ground, ID EEPROM
        assert_eq!(board.header_to_bcm(2), None);
        assert_eq!(board.header_to_bcm(6), None);
        assert_eq!(board.header_to_bcm(27), None);
        for &(_, bcm) in HEADER_TO_BCM {
            assert!(board.has_line(bcm));
        }
        assert!(board.has_line(0));
        assert!(board.has_line(1));
        assert!(!board.has_line(28));
    }
}
