//! PIN strength rules applied at registration

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Seven-digit runs that are refused outright
const SEQUENTIAL_RUNS: &[&str] = &[
    "0123456", "1234567", "2345678", "3456789", "9876543", "8765432", "7654321", "6543210",
];

/// Verdict of the PIN strength check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinStrength {
    InvalidLength,
    Repeated,
    Sequential,
    Strong,
}

impl PinStrength {
    pub fn is_strong(self) -> bool {
        self == PinStrength::Strong
    }

    /// Message shown next to the PIN field
    pub fn message(self) -> &'static str {
        match self {
            PinStrength::InvalidLength => "PIN must be 6-8 digits.",
            PinStrength::Repeated => "PIN cannot be repeated digits (e.g., 111111).",
            PinStrength::Sequential => "PIN cannot be sequential digits.",
            PinStrength::Strong => "Strong PIN.",
        }
    }
}

fn pin_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| Regex::new(r"^[0-9]{6,8}$").expect("static regex"))
}

/// Check a PIN against the registration rules
pub fn check_pin_strength(pin: &str) -> PinStrength {
    if !pin_shape().is_match(pin) {
        return PinStrength::InvalidLength;
    }

    let mut chars = pin.chars();
    if let Some(first) = chars.next() {
        if chars.all(|c| c == first) {
            return PinStrength::Repeated;
        }
    }

    if SEQUENTIAL_RUNS.contains(&pin) {
        return PinStrength::Sequential;
    }

    PinStrength::Strong
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_digits() {
        assert_eq!(check_pin_strength("12345"), PinStrength::InvalidLength);
        assert_eq!(check_pin_strength("123456789"), PinStrength::InvalidLength);
        assert_eq!(check_pin_strength("12a456"), PinStrength::InvalidLength);
        assert_eq!(check_pin_strength(""), PinStrength::InvalidLength);
    }

    #[test]
    fn test_repeated_digits() {
        assert_eq!(check_pin_strength("111111"), PinStrength::Repeated);
        assert_eq!(check_pin_strength("00000000"), PinStrength::Repeated);
    }

    #[test]
    fn test_sequential_runs() {
        assert_eq!(check_pin_strength("1234567"), PinStrength::Sequential);
        assert_eq!(check_pin_strength("6543210"), PinStrength::Sequential);
        // Only the listed seven-digit runs are refused
        assert_eq!(check_pin_strength("123456"), PinStrength::Strong);
    }

    #[test]
    fn test_strong_pin() {
        let verdict = check_pin_strength("402917");
        assert!(verdict.is_strong());
        assert_eq!(verdict.message(), "Strong PIN.");
    }
}
