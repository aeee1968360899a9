//! Resolved TrueType instruction programs.

use std::fmt;

use crate::{
    bytecode::{self, EncodeError},
    opcode::Opcode,
    Error,
};

/// Encoding width of pushed values.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Width {
    /// Unsigned 8-bit values, pushed with `PUSHB`/`NPUSHB`.
    Byte,
    /// Signed 16-bit values, pushed with `PUSHW`/`NPUSHW`.
    Word,
}

impl Width {
    /// Returns the narrowest width that can hold `value`.
    pub fn for_value(value: i16) -> Self {
        if (0..=u8::MAX as i16).contains(&value) {
            Self::Byte
        } else {
            Self::Word
        }
    }

    /// Returns the number of bytes each value occupies in bytecode.
    pub fn size(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
        }
    }
}

/// A single resolved instruction.
///
/// Jumps carry no operand: their distance is the last value pushed before
/// them.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instruction {
    Push { width: Width, values: Vec<i16> },
    Plain(Opcode),
    Jump(Opcode),
}

impl Instruction {
    /// Creates the instruction for a non-push opcode.
    pub fn from_opcode(opcode: Opcode) -> Self {
        if opcode.is_jump() {
            Self::Jump(opcode)
        } else {
            Self::Plain(opcode)
        }
    }

    /// Returns the number of bytes this instruction occupies in bytecode.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Push { width, values } => values
                .chunks(bytecode::MAX_PUSH_COUNT)
                .map(|chunk| push_len(*width, chunk.len()))
                .sum(),
            Self::Plain(_) | Self::Jump(_) => 1,
        }
    }
}

/// Size of a single push instruction carrying `count` values.
pub(crate) fn push_len(width: Width, count: usize) -> usize {
    let header = if count <= bytecode::MAX_SHORT_PUSH_COUNT {
        1
    } else {
        2
    };
    header + count * width.size()
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push { width, values } => {
                f.write_str(match width {
                    Width::Byte => "PUSH[]",
                    Width::Word => "PUSHW[]",
                })?;
                for value in values {
                    write!(f, " {value}")?;
                }
                Ok(())
            }
            Self::Plain(opcode) | Self::Jump(opcode) => write!(f, "{opcode}"),
        }
    }
}

/// An ordered sequence of resolved instructions.
#[derive(Clone, Default, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instruction.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Parses target dialect assembly text.
    pub fn parse(text: &str) -> Result<Self, Error> {
        crate::text::parse(text)
    }

    /// Returns the size of the program in bytes once encoded.
    pub fn encoded_len(&self) -> usize {
        self.instructions.iter().map(Instruction::encoded_len).sum()
    }

    /// Encodes the program as TrueType bytecode.
    pub fn to_bytecode(&self) -> Result<Vec<u8>, EncodeError> {
        bytecode::encode(&self.instructions)
    }

    /// Decodes a program from TrueType bytecode.
    pub fn from_bytecode(bytecode: &[u8]) -> Result<Self, bytecode::DecodeError> {
        bytecode::decode(bytecode).map(Self::from)
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

impl std::str::FromStr for Program {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Formats one instruction per line, with no trailing newline.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instruction) in self.instructions.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{instruction}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(byte: u8) -> Instruction {
        Instruction::from_opcode(Opcode::from_byte(byte))
    }

    #[test]
    fn widths() {
        assert_eq!(Width::for_value(0), Width::Byte);
        assert_eq!(Width::for_value(255), Width::Byte);
        assert_eq!(Width::for_value(256), Width::Word);
        assert_eq!(Width::for_value(-1), Width::Word);
    }

    #[test]
    fn jumps_are_their_own_variant() {
        assert_eq!(op(0x1C), Instruction::Jump(Opcode::JMPR));
        assert!(matches!(op(0x20), Instruction::Plain(_)));
    }

    #[test]
    fn format() {
        let program = Program::from(vec![
            Instruction::Push {
                width: Width::Byte,
                values: vec![1, 2],
            },
            Instruction::Push {
                width: Width::Word,
                values: vec![-6],
            },
            op(0x20),
            op(0x1C),
            op(0xFD),
        ]);
        assert_eq!(
            program.to_string(),
            "PUSH[] 1 2\nPUSHW[] -6\nDUP[]\nJMPR[]\nMIRP[11101]"
        );
        assert_eq!(Program::new().to_string(), "");
    }

    #[test]
    fn encoded_len() {
        let program = Program::from(vec![
            // PUSHB[001]
            Instruction::Push {
                width: Width::Byte,
                values: vec![1, 2],
            },
            // NPUSHW
            Instruction::Push {
                width: Width::Word,
                values: vec![7; 9],
            },
            op(0x20),
        ]);
        assert_eq!(program.encoded_len(), 3 + 20 + 1);
    }
}
