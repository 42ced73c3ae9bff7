use std::fmt;

use log::info;

use crate::board::Board;
use crate::{Error, Result};

/// How a pin name was written in the attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinNotation {
    /// Physical header pin number, e.g. "16"
    Physical(u8),
    /// Board constant, e.g. "D23"
    Board,
    /// Kernel GPIO name, e.g. "GPIO23"
    Gpio,
    /// Bare BCM number that is not a header pin, e.g. "17"
    Bcm,
}

/// A pin name resolved to a GPIO line offset on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinId {
    bcm: u32,
    notation: PinNotation,
}

impl PinId {
    /// Resolves `name` on `board`.
    ///
    /// Physical header numbers win over bare BCM numbers, so "18" is
    /// header pin 18 (BCM 24) and "17", which is a 3.3V header pin, is
    /// BCM 17. Numbers with leading zeros ("016", "D05") are rejected in
    /// every notation.
    pub fn resolve(board: Board, name: &str) -> Result<Self> {
        let trimmed = name.trim();
        let (bcm, notation) = if let Some((physical, bcm)) = parse_number(trimmed)
            .and_then(|n| u8::try_from(n).ok())
            .and_then(|n| board.header_to_bcm(n).map(|bcm| (n, bcm)))
        {
            info!("Resolved physical pin {} -> BCM {}", physical, bcm);
            (bcm, PinNotation::Physical(physical))
        } else if let Some(bcm) = trimmed.strip_prefix('D').and_then(parse_number) {
            info!("Using board constant {} -> BCM {}", trimmed, bcm);
            (bcm, PinNotation::Board)
        } else if let Some(bcm) = strip_prefix_ignore_case(trimmed, "GPIO").and_then(parse_number) {
            info!("Resolved {} -> BCM {}", trimmed, bcm);
            (bcm, PinNotation::Gpio)
        } else if let Some(bcm) = parse_number(trimmed) {
            info!("Assuming BCM {}", bcm);
            (bcm, PinNotation::Bcm)
        } else {
            return Err(Error::config(format!(
                "invalid pin format: {:?}. Use a physical pin (e.g. \"16\"), D23, GPIO23, or a BCM number",
                name
            )));
        };

        if !board.has_line(bcm) {
            return Err(Error::config(format!(
                "pin {:?} (BCM {}) is not available on {}",
                name, bcm, board
            )));
        }

        Ok(PinId { bcm, notation })
    }

    /// Line offset on the board's GPIO chip
    pub fn line(&self) -> u32 {
        self.bcm
    }

    pub fn notation(&self) -> PinNotation {
        self.notation
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.bcm)
    }
}

/// Digits only: no sign, no whitespace, no empty string, no leading zero.
fn parse_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(name: &str) -> Result<PinId> {
        PinId::resolve(Board::RaspberryPi, name)
    }

    #[test]
    fn test_notations() {
        let test_cases = vec![
            ("16", 23, PinNotation::Physical(16)),
            ("18", 24, PinNotation::Physical(18)),
            ("23", 11, PinNotation::Physical(23)),
            ("D23", 23, PinNotation::Board),
            ("D24", 24, PinNotation::Board),
            ("GPIO23", 23, PinNotation::Gpio),
            ("gpio5", 5, PinNotation::Gpio),
            ("17", 17, PinNotation::Bcm),
            ("4", 4, PinNotation::Bcm),
            (" D23 ", 23, PinNotation::Board),
            ("D0", 0, PinNotation::Board),
            ("GPIO1", 1, PinNotation::Gpio),
            ("0", 0, PinNotation::Bcm),
        ];

        for (name, line, notation) in test_cases {
            let pin = resolve(name).unwrap();
            assert_eq!(pin.line(), line, "{}", name);
            assert_eq!(pin.notation(), notation, "{}", name);
        }
    }

    #[test]
    fn test_unrecognised_notations() {
        let test_cases = [
            "", "  ", "D", "GPIO", "P16", "D-3", "+16", "16a", "d 23", "GPIO_23", "１６",
            // leading zeros
            "016", "D05", "GPIO023", "00",
        ];
        for name in test_cases {
            assert!(
                matches!(resolve(name), Err(Error::Configuration(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_lines_not_on_board() {
        // parse fine but are not header GPIOs
        for name in ["D28", "GPIO40", "99", "4294967296"] {
            assert!(
                matches!(resolve(name), Err(Error::Configuration(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(resolve("16").unwrap().to_string(), "GPIO23");
    }
}
