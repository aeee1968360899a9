//! TrueType bytecode encoding and decoding.

use std::fmt;

use read_fonts::tables::glyf::bytecode::Decoder;

use crate::{
    opcode::Opcode,
    program::{Instruction, Width},
};

/// Maximum number of values a single push instruction can carry.
pub const MAX_PUSH_COUNT: usize = u8::MAX as usize;

/// Maximum number of values pushed by the short `PUSHB[n]`/`PUSHW[n]` forms.
pub const MAX_SHORT_PUSH_COUNT: usize = 8;

/// An error returned by [`decode`] if an instruction runs past the end of
/// the bytecode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodeError {
    /// Offset of the instruction that was cut short.
    pub pc: usize,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected end of bytecode in instruction at {}", self.pc)
    }
}

impl std::error::Error for DecodeError {}

/// An error returned when a program cannot be represented as bytecode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// A byte push holds a value outside of 0..=255.
    ByteOutOfRange { index: usize, value: i16 },
    /// A push instruction has no values.
    EmptyPush { index: usize },
    /// A push opcode appears as a plain instruction.
    BarePushOpcode { index: usize },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByteOutOfRange { index, value } => {
                write!(f, "instruction {index} pushes {value} as a byte")
            }
            Self::EmptyPush { index } => write!(f, "instruction {index} pushes no values"),
            Self::BarePushOpcode { index } => {
                write!(f, "instruction {index} is a push opcode without values")
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// Encodes instructions as bytecode.
///
/// Pushes of more than [`MAX_PUSH_COUNT`] values are split across several
/// instructions.
pub fn encode(instructions: &[Instruction]) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    for (index, instruction) in instructions.iter().enumerate() {
        match instruction {
            Instruction::Push { values, .. } if values.is_empty() => {
                return Err(EncodeError::EmptyPush { index })
            }
            Instruction::Push { width, values } => {
                for chunk in values.chunks(MAX_PUSH_COUNT) {
                    encode_push(&mut out, *width, chunk, index)?;
                }
            }
            Instruction::Plain(opcode) | Instruction::Jump(opcode) => {
                if opcode.is_push() {
                    return Err(EncodeError::BarePushOpcode { index });
                }
                out.push(opcode.to_u8());
            }
        }
    }
    Ok(out)
}

fn encode_push(
    out: &mut Vec<u8>,
    width: Width,
    values: &[i16],
    index: usize,
) -> Result<(), EncodeError> {
    let (short_base, long) = match width {
        Width::Byte => (Opcode::PUSHB000, Opcode::NPUSHB),
        Width::Word => (Opcode::PUSHW000, Opcode::NPUSHW),
    };
    if values.len() <= MAX_SHORT_PUSH_COUNT {
        out.push(short_base.to_u8() + values.len() as u8 - 1);
    } else {
        out.push(long.to_u8());
        out.push(values.len() as u8);
    }
    match width {
        Width::Byte => {
            for &value in values {
                let byte =
                    u8::try_from(value).map_err(|_| EncodeError::ByteOutOfRange { index, value })?;
                out.push(byte);
            }
        }
        Width::Word => {
            for &value in values {
                out.extend_from_slice(&value.to_be_bytes());
            }
        }
    }
    Ok(())
}

/// Decodes bytecode into instructions.
///
/// Stops at the first instruction that runs past the end of the bytecode.
pub fn decode(bytecode: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut decoder = Decoder::new(bytecode, 0);
    let mut instructions = Vec::new();
    loop {
        let pc = decoder.pc;
        let Some(decoded) = decoder.decode() else {
            return Ok(instructions);
        };
        let ins = decoded.map_err(|_| DecodeError { pc })?;
        let opcode = Opcode::from_byte(ins.opcode as u8);
        instructions.push(if opcode.is_push() {
            let width = if opcode.is_push_words() {
                Width::Word
            } else {
                Width::Byte
            };
            Instruction::Push {
                width,
                values: ins.inline_operands.values().map(|v| v as i16).collect(),
            }
        } else {
            Instruction::from_opcode(opcode)
        });
    }
}
