//! Assigning jump distances.
//!
//! The encoded size of a push depends on the width of the distances it
//! carries, and each distance depends on the size of everything between a
//! jump and its label. Distances start out as narrow as the encoding allows
//! and are widened until a layout pass leaves every width unchanged. Widths
//! only ever grow, so this takes at most one pass per jump plus one.

use crate::{
    assemble::{Assembly, Item, PushItem, Slot},
    options::JumpEncoding,
    pack::{pack, PackOperand},
    program::{Instruction, Program, Width},
    Error,
};

/// Byte offsets of every item, plus the end of the program.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Layout {
    offsets: Vec<usize>,
}

impl Layout {
    fn new(items: &[Item], widths: &[Width], encoding: JumpEncoding) -> Self {
        let mut offsets = Vec::with_capacity(items.len() + 1);
        let mut offset = 0;
        for item in items {
            offsets.push(offset);
            offset += match item {
                Item::Push(push) => {
                    let operands = pack_operands(push, widths);
                    pack(&operands, encoding)
                        .iter()
                        .map(|run| run.encoded_len())
                        .sum()
                }
                Item::Op(_) => 1,
            };
        }
        offsets.push(offset);
        Self { offsets }
    }

    fn len(&self) -> usize {
        self.offsets.last().copied().unwrap_or_default()
    }
}

fn pack_operands(push: &PushItem, widths: &[Width]) -> Vec<PackOperand> {
    push.slots
        .iter()
        .map(|slot| match slot {
            Slot::Literal(value) => PackOperand::literal(*value),
            Slot::Distance(jump) => PackOperand::distance(widths[*jump]),
        })
        .collect()
}

/// Resolves every jump distance and emits the final program.
pub(crate) fn resolve(assembly: &Assembly, encoding: JumpEncoding) -> Result<Program, Error> {
    resolve_with_passes(assembly, encoding).map(|(program, _)| program)
}

/// Like [`resolve`], also returning the number of layout passes taken.
pub(crate) fn resolve_with_passes(
    assembly: &Assembly,
    encoding: JumpEncoding,
) -> Result<(Program, usize), Error> {
    let jumps = &assembly.jumps;
    let mut widths = vec![
        match encoding {
            JumpEncoding::Word => Width::Word,
            JumpEncoding::Compact => Width::Byte,
        };
        jumps.len()
    ];
    let max_passes = jumps.len() + 2;
    for pass in 1..=max_passes {
        let layout = Layout::new(&assembly.items, &widths, encoding);
        let distances: Vec<i64> = jumps
            .iter()
            .map(|jump| layout.offsets[jump.target] as i64 - layout.offsets[jump.item] as i64)
            .collect();
        let mut widened = false;
        for (i, distance) in distances.iter().enumerate() {
            if widths[i] == Width::Byte && !(0..=u8::MAX as i64).contains(distance) {
                log::trace!(
                    "pass {pass}: widening jump on line {} with distance {distance}",
                    jumps[i].line
                );
                widths[i] = Width::Word;
                widened = true;
            }
        }
        if widened {
            continue;
        }
        log::debug!(
            "resolved {} jumps in {pass} passes, program is {} bytes",
            jumps.len(),
            layout.len()
        );
        for (name, label) in assembly.symbols.labels() {
            log::trace!("label '#{name}' at byte {}", layout.offsets[label.item]);
        }
        let distances = distances
            .iter()
            .zip(jumps)
            .map(|(&distance, jump)| {
                i16::try_from(distance).map_err(|_| Error::JumpOutOfRange {
                    line: jump.line,
                    distance,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok((emit(assembly, &widths, &distances, encoding), pass));
    }
    Err(Error::Unconverged { passes: max_passes })
}

fn emit(
    assembly: &Assembly,
    widths: &[Width],
    distances: &[i16],
    encoding: JumpEncoding,
) -> Program {
    let mut program = Program::new();
    for item in &assembly.items {
        match item {
            Item::Push(push) => {
                log::trace!("line {}: pushing {} values", push.line, push.slots.len());
                let values: Vec<i16> = push
                    .slots
                    .iter()
                    .map(|slot| match slot {
                        Slot::Literal(value) => *value,
                        Slot::Distance(jump) => distances[*jump],
                    })
                    .collect();
                for run in pack(&pack_operands(push, widths), encoding) {
                    program.push(Instruction::Push {
                        width: run.width,
                        values: values[run.range].to_vec(),
                    });
                }
            }
            Item::Op(opcode) => program.push(Instruction::from_opcode(*opcode)),
        }
    }
    program
}
