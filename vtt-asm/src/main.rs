//! VTT assembler
//!
//! Compiles VTT hinting source into fontTools style assembly or TrueType
//! bytecode.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use vtt_asm::{CompileOptions, JumpEncoding, Program};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The input file, or '-' for stdin.
    input: PathBuf,

    /// How to read the input.
    #[arg(long, value_enum, default_value_t = InputFormat::Vtt)]
    input_format: InputFormat,

    /// What to write.
    #[arg(long, value_enum, default_value_t = Emit::Asm)]
    emit: Emit,

    /// How pushed jump distances are encoded.
    #[arg(long, value_enum, default_value_t = JumpEncodingArg::Word)]
    jump_encoding: JumpEncodingArg,

    /// The output file. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// VTT assembly source
    Vtt,
    /// fontTools style assembly, normalized through parse and format
    Tt,
    /// Raw TrueType bytecode
    Bytecode,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// fontTools style assembly
    Asm,
    /// Bytecode as hex digits
    Hex,
    /// Raw bytecode
    Binary,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum JumpEncodingArg {
    /// Word sized distances in pushes of their own, as VTT does
    Word,
    /// The narrowest width for each distance
    Compact,
}

impl From<JumpEncodingArg> for JumpEncoding {
    fn from(arg: JumpEncodingArg) -> Self {
        match arg {
            JumpEncodingArg::Word => JumpEncoding::Word,
            JumpEncodingArg::Compact => JumpEncoding::Compact,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("Error reading '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Error writing output: {0}")]
    Write(#[from] std::io::Error),
    #[error("{0}")]
    Asm(#[from] vtt_asm::Error),
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), RunError> {
    let input = read_input(&args.input).map_err(|source| RunError::Read {
        path: args.input.clone(),
        source,
    })?;
    log::debug!("read {} bytes from {}", input.len(), args.input.display());
    let program = match args.input_format {
        InputFormat::Vtt => {
            let options =
                CompileOptions::default().with_jump_encoding(args.jump_encoding.into());
            vtt_asm::compile_with_options(&text(&args.input, input)?, &options)?
        }
        InputFormat::Tt => vtt_asm::parse(&text(&args.input, input)?)?,
        InputFormat::Bytecode => vtt_asm::disassemble(&input)?,
    };
    log::info!(
        "{} instructions, {} bytes of bytecode",
        program.len(),
        program.encoded_len()
    );
    let output = render(&program, args.emit)?;
    match &args.output {
        Some(path) => std::fs::write(path, output)?,
        None => std::io::stdout().write_all(&output)?,
    }
    Ok(())
}

fn read_input(path: &Path) -> std::io::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read(path)
    }
}

fn text(path: &Path, input: Vec<u8>) -> Result<String, RunError> {
    String::from_utf8(input).map_err(|e| RunError::Read {
        path: path.to_owned(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })
}

fn render(program: &Program, emit: Emit) -> Result<Vec<u8>, RunError> {
    let output = match emit {
        Emit::Asm => {
            let mut text = vtt_asm::format(program);
            if !text.is_empty() {
                text.push('\n');
            }
            text.into_bytes()
        }
        Emit::Hex => {
            let bytes = program.to_bytecode().map_err(vtt_asm::Error::from)?;
            let mut hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
            hex.push('\n');
            hex.into_bytes()
        }
        Emit::Binary => program.to_bytecode().map_err(vtt_asm::Error::from)?,
    };
    Ok(output)
}
