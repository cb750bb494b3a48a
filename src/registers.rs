use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail};
use strum::VariantNames;
use ux::u3;

/// the number of architectural registers in the toy ISA
pub const REGISTERS_COUNT: u8 = 6;

/// A register identifier.
///
/// Register fields are 3 bits wide in the instruction encoding, but only `R0` through `R5` exist.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, VariantNames)]
#[repr(u8)]
pub enum Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
}

impl Register {
    pub const ALL: [Register; REGISTERS_COUNT as usize] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
    ];

    /// the names a front end should offer when asking for a register operand
    #[must_use]
    pub fn choices() -> &'static [&'static str] {
        Self::VARIANTS
    }

    /// the 3 bit encoding of this register
    #[must_use]
    pub fn encode(self) -> u3 {
        u3::new(self as u8)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", *self as u8)
    }
}

impl TryFrom<u8> for Register {
    type Error = anyhow::Error;
    fn try_from(value: u8) -> Result<Self, anyhow::Error> {
        if value >= REGISTERS_COUNT {
            bail!(
                "Invalid register number provided to Register::try_from(u8): {}",
                value
            );
        }
        Ok(Self::ALL[value as usize])
    }
}

impl TryFrom<u3> for Register {
    type Error = anyhow::Error;
    fn try_from(value: u3) -> Result<Self, anyhow::Error> {
        Self::try_from(u8::from(value))
    }
}

impl FromStr for Register {
    type Err = anyhow::Error;

    /// accepts `R3` or `r3`, surrounding whitespace and a trailing comma are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().trim_end_matches(',');
        let number = token
            .strip_prefix('R')
            .or_else(|| token.strip_prefix('r'))
            .ok_or_else(|| anyhow!("Expected a register like R1, got {token:?}"))?;
        let number: u8 = number
            .parse()
            .map_err(|_| anyhow!("Invalid register number in {token:?}"))?;
        Self::try_from(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::Result;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display() {
        assert_eq!(Register::R0.to_string(), "R0");
        assert_eq!(Register::R5.to_string(), "R5");
    }

    #[test]
    fn test_parse() -> Result<()> {
        assert_eq!("R1".parse::<Register>()?, Register::R1);
        assert_eq!(" r4, ".parse::<Register>()?, Register::R4);
        assert!("R6".parse::<Register>().is_err());
        assert!("X1".parse::<Register>().is_err());
        assert!("R".parse::<Register>().is_err());
        Ok(())
    }

    #[test]
    fn test_encoding_round_trip() -> Result<()> {
        for register in Register::ALL {
            assert_eq!(Register::try_from(register.encode())?, register);
        }
        assert!(Register::try_from(u3::new(7)).is_err());
        Ok(())
    }

    #[test]
    fn test_choices_match_display() {
        let displayed: Vec<String> = Register::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(Register::choices(), displayed.as_slice());
    }
}
