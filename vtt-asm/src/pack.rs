//! Splitting push operands into width-homogeneous push instructions.

use std::ops::Range;

use crate::{
    bytecode::MAX_PUSH_COUNT,
    options::JumpEncoding,
    program::{push_len, Width},
};

/// What a pushed value is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Class {
    Literal,
    /// The distance of a jump.
    Distance,
}

/// A value to be pushed, as seen by the packer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PackOperand {
    /// The narrowest width that can hold the value.
    pub width: Width,
    pub class: Class,
}

impl PackOperand {
    pub fn literal(value: i16) -> Self {
        Self {
            width: Width::for_value(value),
            class: Class::Literal,
        }
    }

    pub fn distance(width: Width) -> Self {
        Self {
            width,
            class: Class::Distance,
        }
    }
}

/// A single push instruction covering a range of operands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Run {
    pub width: Width,
    pub range: Range<usize>,
}

impl Run {
    pub fn encoded_len(&self) -> usize {
        push_len(self.width, self.range.len())
    }
}

/// Packs operands into runs, in operand order.
///
/// No run holds more than 255 operands.
pub fn pack(operands: &[PackOperand], encoding: JumpEncoding) -> Vec<Run> {
    let wide_distance = operands
        .iter()
        .any(|op| op.class == Class::Distance && op.width == Width::Word);
    let mut runs = Vec::new();
    if encoding == JumpEncoding::Compact && wide_distance {
        push_runs(&mut runs, Width::Word, 0..operands.len());
        return runs;
    }
    // operands share a run when their keys match
    let key = |op: &PackOperand| match (encoding, op.class) {
        (JumpEncoding::Word, Class::Distance) => (Class::Distance, Width::Word),
        _ => (Class::Literal, op.width),
    };
    let mut start = 0;
    for i in 1..=operands.len() {
        if i == operands.len() || key(&operands[i]) != key(&operands[start]) {
            push_runs(&mut runs, key(&operands[start]).1, start..i);
            start = i;
        }
    }
    runs
}

fn push_runs(runs: &mut Vec<Run>, width: Width, range: Range<usize>) {
    let mut start = range.start;
    while start < range.end {
        let end = range.end.min(start + MAX_PUSH_COUNT);
        runs.push(Run {
            width,
            range: start..end,
        });
        start = end;
    }
}
