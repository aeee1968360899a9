//! Parsing label-free assembly text, as written by fontTools.

use crate::{
    opcode::Opcode,
    program::{Instruction, Program, Width},
    tokenize::{parse_integer, split_mnemonic, strip_comments},
    Error,
};

/// Width requested by a push mnemonic.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PushKind {
    /// `PUSH[]`: the narrowest width for each value.
    Auto,
    Explicit(Width),
}

struct PendingPush {
    line: usize,
    text: String,
    kind: PushKind,
    /// Number of values the mnemonic encodes, for `PUSHB[bits]`.
    count: Option<usize>,
    values: Vec<i64>,
}

impl PendingPush {
    fn finish(self, program: &mut Program) -> Result<(), Error> {
        let error = |reason: String| Error::syntax(self.line, &self.text, reason);
        if self.values.is_empty() {
            return Err(error("push without values".into()));
        }
        if let Some(count) = self.count.filter(|count| *count != self.values.len()) {
            return Err(error(format!(
                "expected {count} values, found {}",
                self.values.len()
            )));
        }
        let values = self
            .values
            .iter()
            .map(|value| {
                let fits = match self.kind {
                    PushKind::Explicit(Width::Byte) => (0..=u8::MAX as i64).contains(value),
                    _ => i16::try_from(*value).is_ok(),
                };
                fits.then_some(*value as i16)
                    .ok_or_else(|| error(format!("{value} does not fit the push width")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        match self.kind {
            PushKind::Explicit(width) => program.push(Instruction::Push { width, values }),
            PushKind::Auto => {
                for chunk in values.chunk_by(|a, b| Width::for_value(*a) == Width::for_value(*b))
                {
                    program.push(Instruction::Push {
                        width: Width::for_value(chunk[0]),
                        values: chunk.to_vec(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Parses assembly text into a program.
///
/// Pushes may be written `PUSH[]`, which picks widths automatically, or
/// with an explicit `PUSHB`, `PUSHW`, `NPUSHB` or `NPUSHW` mnemonic. Lines
/// holding only integers continue the preceding push.
pub fn parse(text: &str) -> Result<Program, Error> {
    let stripped = strip_comments(text)?;
    let mut program = Program::new();
    let mut pending: Option<PendingPush> = None;
    for (i, raw) in stripped.lines().enumerate() {
        let line = i + 1;
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }
        if text.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+') {
            let Some(push) = pending.as_mut() else {
                return Err(Error::syntax(line, text, "values outside of a push"));
            };
            push.values.extend(parse_values(line, text, text)?);
            continue;
        }
        if let Some(push) = pending.take() {
            push.finish(&mut program)?;
        }
        let Some((name, flags, rest)) = split_mnemonic(text) else {
            return Err(Error::syntax(line, text, "expected an instruction"));
        };
        match push_kind(name, flags) {
            Some((kind, count)) => {
                pending = Some(PendingPush {
                    line,
                    text: text.to_owned(),
                    kind,
                    count,
                    values: parse_values(line, text, rest)?,
                });
            }
            None => {
                let opcode = Opcode::from_mnemonic(name, flags)
                    .map_err(|e| Error::syntax(line, text, e.to_string()))?;
                if !rest.is_empty() {
                    return Err(Error::syntax(line, text, "unexpected operands"));
                }
                program.push(Instruction::from_opcode(opcode));
            }
        }
    }
    if let Some(push) = pending {
        push.finish(&mut program)?;
    }
    Ok(program)
}

/// Returns the push kind and fixed value count for push mnemonics.
fn push_kind(name: &str, flags: &str) -> Option<(PushKind, Option<usize>)> {
    let (kind, allows_bits) = match name {
        "PUSH" => (PushKind::Auto, false),
        "NPUSHB" => (PushKind::Explicit(Width::Byte), false),
        "NPUSHW" => (PushKind::Explicit(Width::Word), false),
        "PUSHB" => (PushKind::Explicit(Width::Byte), true),
        "PUSHW" => (PushKind::Explicit(Width::Word), true),
        _ => return None,
    };
    if flags.is_empty() {
        return Some((kind, None));
    }
    // anything else is reported by the opcode table
    if !allows_bits || flags.len() != 3 || !flags.bytes().all(|b| b == b'0' || b == b'1') {
        return None;
    }
    let bits = u8::from_str_radix(flags, 2).ok()?;
    Some((kind, Some(bits as usize + 1)))
}

fn parse_values(line: usize, text: &str, values: &str) -> Result<Vec<i64>, Error> {
    values
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            parse_integer(token)
                .ok_or_else(|| Error::syntax(line, text, format!("invalid value '{token}'")))
        })
        .collect()
}

/// Formats a program, one instruction per line.
pub fn format(program: &Program) -> String {
    program.to_string()
}
