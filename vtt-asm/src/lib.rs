//! Assembling VTT hinting source into TrueType instructions
//!
//! The Visual TrueType authoring tool stores hinting programs as a
//! line-oriented assembly with named labels and symbolic jump distances:
//!
//! ```text
//! #PUSH, 1
//! DUP[]
//! #Loop:
//! DUP[]
//! #PUSH, Var1
//! JMPR[], (Var1=#Loop)
//! ```
//!
//! This crate turns that source into a [`Program`]: a flat list of pushes and
//! instructions in which every jump distance is a concrete byte offset. A
//! program can be printed as label-free assembly in the notation used by
//! fontTools, parsed back from that notation, and encoded as the bytecode
//! stored in the `fpgm`, `prep` and `glyf` tables.
//!
//! # Example
//!
//! ```
//! let source = "#PUSH, 1\nDUP[]\n#Loop:\nDUP[]\n#PUSH, Var1\nJMPR[], (Var1=#Loop)";
//! let text = vtt_asm::compile(source).unwrap();
//! assert_eq!(text, "PUSH[] 1\nDUP[]\nDUP[]\nPUSHW[] -4\nJMPR[]");
//!
//! let program = vtt_asm::parse(&text).unwrap();
//! let bytes = program.to_bytecode().unwrap();
//! assert_eq!(bytes, [0xB0, 1, 0x20, 0x20, 0xB8, 0xFF, 0xFC, 0x1C]);
//! ```
//!
//! Jump distances are resolved iteratively, since the width of a pushed
//! distance changes the size of the code it jumps over. See
//! [`JumpEncoding`] for the two ways distances can be pushed.

#![forbid(unsafe_code)]

mod assemble;
pub mod bytecode;
mod error;
pub mod opcode;
mod options;
mod pack;
mod program;
mod resolve;
mod symbols;
mod text;
pub mod tokenize;

pub use bytecode::{DecodeError, EncodeError};
pub use error::Error;
pub use opcode::Opcode;
pub use options::{CompileOptions, JumpEncoding};
pub use program::{Instruction, Program, Width};
pub use text::{format, parse};

/// Compiles VTT source to assembly text, using the default options.
pub fn compile(source: &str) -> Result<String, Error> {
    assemble(source).map(|program| program.to_string())
}

/// Compiles VTT source to a program, using the default options.
pub fn assemble(source: &str) -> Result<Program, Error> {
    compile_with_options(source, &CompileOptions::default())
}

/// Compiles VTT source to a program.
pub fn compile_with_options(source: &str, options: &CompileOptions) -> Result<Program, Error> {
    let lines = tokenize::tokenize(source)?;
    let assembly = assemble::assemble(&lines)?;
    resolve::resolve(&assembly, options.jump_encoding)
}

/// Decodes TrueType bytecode into a program.
pub fn disassemble(bytecode: &[u8]) -> Result<Program, Error> {
    Ok(Program::from_bytecode(bytecode)?)
}
