//! Status words terminating every APDU response

use std::fmt;

/// Two-byte status word (SW1, SW2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte
    pub sw1: u8,
    /// Second status byte
    pub sw2: u8,
}

impl StatusWord {
    /// Create a status word from its two bytes
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Create a status word from a big-endian u16
    pub const fn from_u16(sw: u16) -> Self {
        Self {
            sw1: (sw >> 8) as u8,
            sw2: sw as u8,
        }
    }

    /// Status word as a big-endian u16
    pub const fn to_u16(self) -> u16 {
        ((self.sw1 as u16) << 8) | self.sw2 as u16
    }

    /// `0x9000`
    pub const fn is_success(self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Remaining attempts encoded in a `63Cx` status word
    pub const fn retries_left(self) -> Option<u8> {
        if self.sw1 == 0x63 && self.sw2 & 0xF0 == 0xC0 {
            Some(self.sw2 & 0x0F)
        } else {
            None
        }
    }

    /// Human readable description of well known status words
    pub const fn description(self) -> &'static str {
        match self.to_u16() {
            0x9000 => "Success",
            0x6700 => "Wrong length",
            0x6982 => "Security status not satisfied",
            0x6983 => "Authentication method blocked",
            0x6985 => "Conditions of use not satisfied",
            0x6986 => "Command not allowed",
            0x6A80 => "Wrong data",
            0x6A82 => "File or application not found",
            0x6A84 => "Not enough memory space",
            0x6A86 => "Incorrect P1 or P2",
            0x6A88 => "Referenced data not found",
            0x6D00 => "Instruction not supported",
            0x6E00 => "Class not supported",
            0x6F00 => "Unknown error",
            _ if self.sw1 == 0x63 && self.sw2 & 0xF0 == 0xC0 => "Verification failed",
            _ => "Unknown status",
        }
    }
}

impl From<(u8, u8)> for StatusWord {
    fn from((sw1, sw2): (u8, u8)) -> Self {
        Self::new(sw1, sw2)
    }
}

impl From<u16> for StatusWord {
    fn from(sw: u16) -> Self {
        Self::from_u16(sw)
    }
}

impl From<StatusWord> for u16 {
    fn from(sw: StatusWord) -> Self {
        sw.to_u16()
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X} ({})", self.sw1, self.sw2, self.description())
    }
}

/// Success
pub const SW_NO_ERROR: StatusWord = StatusWord::new(0x90, 0x00);
/// Wrong length
pub const SW_WRONG_LENGTH: StatusWord = StatusWord::new(0x67, 0x00);
/// Security status not satisfied
pub const SW_SECURITY_STATUS_NOT_SATISFIED: StatusWord = StatusWord::new(0x69, 0x82);
/// Authentication method blocked
pub const SW_AUTHENTICATION_METHOD_BLOCKED: StatusWord = StatusWord::new(0x69, 0x83);
/// Conditions of use not satisfied
pub const SW_CONDITIONS_NOT_SATISFIED: StatusWord = StatusWord::new(0x69, 0x85);
/// Command not allowed
pub const SW_COMMAND_NOT_ALLOWED: StatusWord = StatusWord::new(0x69, 0x86);
/// Wrong data
pub const SW_WRONG_DATA: StatusWord = StatusWord::new(0x6A, 0x80);
/// File or application not found
pub const SW_FILE_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x82);
/// Not enough memory space in the file
pub const SW_FILE_FULL: StatusWord = StatusWord::new(0x6A, 0x84);
/// Incorrect parameters P1-P2
pub const SW_INCORRECT_P1P2: StatusWord = StatusWord::new(0x6A, 0x86);
/// Referenced data not found
pub const SW_REFERENCED_DATA_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x88);
/// Instruction not supported
pub const SW_INS_NOT_SUPPORTED: StatusWord = StatusWord::new(0x6D, 0x00);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_conversion() {
        let sw = StatusWord::from_u16(0x6A82);
        assert_eq!(sw, SW_FILE_NOT_FOUND);
        assert_eq!(sw.to_u16(), 0x6A82);
        assert!(!sw.is_success());
        assert!(SW_NO_ERROR.is_success());
    }

    #[test]
    fn test_retries_left() {
        assert_eq!(StatusWord::new(0x63, 0xC2).retries_left(), Some(2));
        assert_eq!(StatusWord::new(0x63, 0xC0).retries_left(), Some(0));
        assert_eq!(StatusWord::new(0x63, 0x00).retries_left(), None);
        assert_eq!(SW_NO_ERROR.retries_left(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            SW_REFERENCED_DATA_NOT_FOUND.to_string(),
            "6A88 (Referenced data not found)"
        );
    }
}
