use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};
use strum::{Display, EnumString, VariantNames};

use crate::registers::Register;

/// the mnemonic of an instruction in the toy ISA
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Display, EnumString, VariantNames)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Operation {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    /// `LW rd, rs1`: load into rd from the address in rs1
    Lw,
    /// `SW rs1, rs2`: store rs2 to the address in rs1
    Sw,
    Nop,
}

/// which register fields an operation uses
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Operands {
    pub rd: bool,
    pub rs1: bool,
    pub rs2: bool,
}

impl Operation {
    #[must_use]
    pub const fn operands(self) -> Operands {
        match self {
            Operation::Add
            | Operation::Sub
            | Operation::Mul
            | Operation::And
            | Operation::Or
            | Operation::Xor => Operands {
                rd: true,
                rs1: true,
                rs2: true,
            },
            Operation::Lw => Operands {
                rd: true,
                rs1: true,
                rs2: false,
            },
            Operation::Sw => Operands {
                rd: false,
                rs1: true,
                rs2: true,
            },
            Operation::Nop => Operands {
                rd: false,
                rs1: false,
                rs2: false,
            },
        }
    }
}

/// One entry of the program.
///
/// Records are plain values: stages and history snapshots hold their own copies,
/// so nothing downstream can observe a later mutation. Absent register fields never
/// take part in a hazard.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Instruction {
    pub operation: Operation,
    pub rd: Option<Register>,
    pub rs1: Option<Register>,
    pub rs2: Option<Register>,
}

impl Instruction {
    /// build a record without checking it against the operation's operand layout
    #[must_use]
    pub const fn new(
        operation: Operation,
        rd: Option<Register>,
        rs1: Option<Register>,
        rs2: Option<Register>,
    ) -> Self {
        Self {
            operation,
            rd,
            rs1,
            rs2,
        }
    }

    #[must_use]
    pub const fn nop() -> Self {
        Self::new(Operation::Nop, None, None, None)
    }

    /// shorthand for the three register form, e.g. `ADD rd, rs1, rs2`
    #[must_use]
    pub const fn rtype(operation: Operation, rd: Register, rs1: Register, rs2: Register) -> Self {
        Self::new(operation, Some(rd), Some(rs1), Some(rs2))
    }

    /// Build a record, rejecting it unless the register fields present are exactly the
    /// ones the operation uses.
    ///
    /// This is the check front ends run on user input before anything reaches a `Processor`.
    pub fn checked(
        operation: Operation,
        rd: Option<Register>,
        rs1: Option<Register>,
        rs2: Option<Register>,
    ) -> Result<Self> {
        let expected = operation.operands();
        for (name, wanted, given) in [
            ("destination", expected.rd, rd),
            ("first source", expected.rs1, rs1),
            ("second source", expected.rs2, rs2),
        ] {
            match (wanted, given) {
                (true, None) => bail!("{operation} requires a {name} register"),
                (false, Some(register)) => {
                    bail!("{operation} does not take a {name} register (got {register})")
                }
                _ => (),
            }
        }
        Ok(Self::new(operation, rd, rs1, rs2))
    }

    #[must_use]
    pub fn is_nop(&self) -> bool {
        self.operation == Operation::Nop
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        let registers = [self.rd, self.rs1, self.rs2];
        let mut operands = registers.iter().flatten();
        if let Some(first) = operands.next() {
            write!(f, " {first}")?;
            for register in operands {
                write!(f, ", {register}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Instruction {
    type Err = anyhow::Error;

    /// parses the assembly form produced by `Display`, e.g. `SUB R4, R1, R5` or `NOP`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty());

        let mnemonic = tokens.next().ok_or_else(|| anyhow!("Empty instruction"))?;
        let operation: Operation = mnemonic
            .parse()
            .with_context(|| format!("Unknown operation {mnemonic:?}"))?;

        let registers = tokens
            .map(str::parse::<Register>)
            .collect::<Result<Vec<Register>>>()?;

        let layout = operation.operands();
        let wanted = [layout.rd, layout.rs1, layout.rs2];
        let arity = wanted.iter().filter(|used| **used).count();
        if registers.len() != arity {
            bail!(
                "{operation} takes {arity} register operand(s), got {}",
                registers.len()
            );
        }

        let mut given = registers.into_iter();
        let [rd, rs1, rs2] = wanted.map(|used| if used { given.next() } else { None });
        Self::checked(operation, rd, rs1, rs2)
    }
}

/// Parse a program written one instruction per line.
///
/// Blank lines are skipped and `#` starts a comment.
pub fn parse_program(text: &str) -> Result<Vec<Instruction>> {
    text.lines()
        .enumerate()
        .map(|(number, line)| (number + 1, line.split('#').next().unwrap_or_default().trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(number, line)| {
            line.parse::<Instruction>()
                .with_context(|| format!("line {number}: {line:?}"))
        })
        .collect()
}
