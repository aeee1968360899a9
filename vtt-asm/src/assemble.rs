//! Building a flat list of pushes and operations from source lines.
//!
//! Jump distances are not known here: a push directive keeps a slot for
//! each variable operand that refers to the jump bound to it. The slots are
//! filled in by the resolver.

use indexmap::IndexMap;

use crate::{
    opcode::Opcode,
    symbols::{SymbolTable, VariableDef},
    tokenize::{JumpBinding, LineKind, OpLine, Operand, SourceLine},
    Error,
};

/// Mnemonic of the VTT pseudo-instruction that marks overlapping contours.
const OVERLAP: &str = "OVERLAP";

/// A value pushed by a push item.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Literal(i16),
    /// The distance of the jump with this index.
    Distance(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PushItem {
    pub line: usize,
    pub slots: Vec<Slot>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Item {
    /// Values pushed by a directive, inline arguments or a block.
    ///
    /// May be empty, in which case it emits nothing.
    Push(PushItem),
    Op(Opcode),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Jump {
    pub line: usize,
    /// Index of the jump instruction item.
    pub item: usize,
    pub label: String,
    /// Index of the item the label is bound to.
    pub target: usize,
}

/// The output of the builder: items in program order and the jumps
/// between them.
#[derive(Clone, Debug)]
pub(crate) struct Assembly {
    pub items: Vec<Item>,
    pub jumps: Vec<Jump>,
    pub symbols: SymbolTable,
}

/// Builds an assembly from source lines.
pub(crate) fn assemble(lines: &[SourceLine]) -> Result<Assembly, Error> {
    let mut builder = Builder::default();
    for line in lines {
        builder.add(line)?;
    }
    builder.finish()
}

struct Directive {
    line: usize,
    item: usize,
    operands: Vec<Operand>,
    /// Jump index for each variable bound so far.
    bound: IndexMap<String, usize>,
}

struct Block {
    line: usize,
    /// Index of the push item at the start of the block.
    item: usize,
    /// Inline arguments of each op in the block.
    args: Vec<Vec<i16>>,
}

struct Builder {
    items: Vec<Item>,
    jumps: Vec<Jump>,
    symbols: SymbolTable,
    directives: Vec<Directive>,
    blocks: Vec<Block>,
    push_on: bool,
    /// Errors that do not stop the pass; the earliest is reported.
    errors: Vec<Error>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            jumps: Vec::new(),
            symbols: SymbolTable::default(),
            directives: Vec::new(),
            blocks: Vec::new(),
            push_on: true,
            errors: Vec::new(),
        }
    }
}

impl Builder {
    fn add(&mut self, line: &SourceLine) -> Result<(), Error> {
        let number = line.number;
        match &line.kind {
            LineKind::PushDirective(operands) => self.add_directive(number, operands),
            LineKind::LabelDef(name) => {
                match self.symbols.define_label(name, number, self.items.len()) {
                    Ok(()) => {
                        log::trace!("line {number}: label '#{name}' at item {}", self.items.len())
                    }
                    Err(e) => self.errors.push(e),
                }
            }
            LineKind::PlainOp(op) => {
                if let Some(opcode) = self.resolve_op(line, op)? {
                    self.add_args(line, &op.args)?;
                    self.push_op(opcode);
                }
            }
            LineKind::JumpOp { op, binding } => self.add_jump(line, op, binding)?,
            LineKind::PushOn => self.push_on = true,
            LineKind::PushOff => self.push_on = false,
            LineKind::BeginBlock => {
                self.blocks.push(Block {
                    line: number,
                    item: self.items.len(),
                    args: Vec::new(),
                });
                self.push_item(number, Vec::new());
            }
            LineKind::EndBlock => {
                let Some(block) = self.blocks.pop() else {
                    return Err(Error::syntax(number, &line.text, "#END without #BEGIN"));
                };
                // the first op of the block finds its arguments on top
                let slots = block
                    .args
                    .iter()
                    .rev()
                    .flatten()
                    .map(|value| Slot::Literal(*value))
                    .collect();
                if let Some(Item::Push(push)) = self.items.get_mut(block.item) {
                    push.slots = slots;
                }
            }
        }
        Ok(())
    }

    fn add_directive(&mut self, line: usize, operands: &[Operand]) {
        let item = self.items.len();
        let mut variables: IndexMap<&str, Vec<usize>> = IndexMap::new();
        for (position, operand) in operands.iter().enumerate() {
            if let Operand::Variable(name) = operand {
                variables.entry(name.as_str()).or_default().push(position);
            }
        }
        for (name, positions) in variables {
            self.symbols.define_variable(
                name,
                VariableDef {
                    line,
                    item,
                    positions,
                },
            );
        }
        self.directives.push(Directive {
            line,
            item,
            operands: operands.to_vec(),
            bound: IndexMap::new(),
        });
        // slots are filled in once every jump is known
        self.push_item(line, Vec::new());
    }

    /// Returns `None` for instructions that are dropped.
    fn resolve_op(&self, line: &SourceLine, op: &OpLine) -> Result<Option<Opcode>, Error> {
        if op.mnemonic == OVERLAP {
            log::trace!("line {}: dropping {OVERLAP}", line.number);
            return Ok(None);
        }
        let opcode = Opcode::from_mnemonic(&op.mnemonic, &op.flags)
            .map_err(|e| Error::syntax(line.number, &line.text, e.to_string()))?;
        if opcode.is_push() {
            return Err(Error::syntax(
                line.number,
                &line.text,
                "push instructions are written as #PUSH",
            ));
        }
        Ok(Some(opcode))
    }

    fn add_args(&mut self, line: &SourceLine, args: &[i16]) -> Result<(), Error> {
        if args.is_empty() {
            return Ok(());
        }
        if !self.push_on {
            return Err(Error::syntax(
                line.number,
                &line.text,
                "inline arguments are not allowed after #PUSHOFF",
            ));
        }
        match self.blocks.last_mut() {
            Some(block) => block.args.push(args.to_vec()),
            None => {
                let slots = args.iter().copied().map(Slot::Literal).collect();
                self.push_item(line.number, slots);
            }
        }
        Ok(())
    }

    fn add_jump(
        &mut self,
        line: &SourceLine,
        op: &OpLine,
        binding: &JumpBinding,
    ) -> Result<(), Error> {
        let number = line.number;
        let Some(opcode) = self.resolve_op(line, op)? else {
            return Err(Error::binding(number, &line.text, "binding on a dropped instruction"));
        };
        if !opcode.is_jump() {
            return Err(Error::binding(
                number,
                &line.text,
                format!("{opcode} is not a jump instruction"),
            ));
        }
        let variable = binding.variable.as_str();
        let Some(def) = self.symbols.variable(variable) else {
            self.errors.push(Error::UnresolvedVariable {
                line: number,
                name: variable.to_owned(),
            });
            self.push_op(opcode);
            return Ok(());
        };
        let def_item = def.item;
        let def_line = def.line;
        log::trace!(
            "line {number}: '{variable}' fills {} slots of the #PUSH on line {def_line}",
            def.positions.len()
        );
        let directive = self
            .directives
            .last_mut()
            .filter(|directive| directive.item == def_item)
            .ok_or_else(|| {
                Error::binding(
                    number,
                    &line.text,
                    format!(
                        "'{variable}' is pushed on line {def_line}, not by the most recent #PUSH"
                    ),
                )
            })?;
        if let Some(&jump) = directive.bound.get(variable) {
            let bound_line = self.jumps[jump].line;
            return Err(Error::binding(
                number,
                &line.text,
                format!("'{variable}' is already bound to the jump on line {bound_line}"),
            ));
        }
        let jump = self.jumps.len();
        directive.bound.insert(variable.to_owned(), jump);
        self.jumps.push(Jump {
            line: number,
            item: self.items.len(),
            label: binding.label.clone(),
            target: 0,
        });
        self.push_op(opcode);
        Ok(())
    }

    fn push_item(&mut self, line: usize, slots: Vec<Slot>) {
        self.items.push(Item::Push(PushItem { line, slots }));
    }

    fn push_op(&mut self, opcode: Opcode) {
        self.items.push(Item::Op(opcode));
    }

    fn finish(mut self) -> Result<Assembly, Error> {
        if let Some(block) = self.blocks.first() {
            return Err(Error::syntax(block.line, "#BEGIN", "#BEGIN without #END"));
        }
        let mut errors = std::mem::take(&mut self.errors);
        for jump in &mut self.jumps {
            match self.symbols.label(&jump.label) {
                Some(label) => jump.target = label.item,
                None => errors.push(Error::UnresolvedLabel {
                    line: jump.line,
                    name: jump.label.clone(),
                }),
            }
        }
        for directive in &self.directives {
            let mut slots = Vec::with_capacity(directive.operands.len());
            for operand in &directive.operands {
                match operand {
                    Operand::Literal(value) => slots.push(Slot::Literal(*value)),
                    Operand::Variable(name) => match directive.bound.get(name) {
                        Some(&jump) => slots.push(Slot::Distance(jump)),
                        None => errors.push(Error::UnresolvedVariable {
                            line: directive.line,
                            name: name.clone(),
                        }),
                    },
                }
            }
            if let Some(Item::Push(push)) = self.items.get_mut(directive.item) {
                push.slots = slots;
            }
        }
        // report the earliest problem, whenever it was found
        if let Some(error) = errors.into_iter().min_by_key(|e| e.line()) {
            return Err(error);
        }
        log::debug!(
            "assembled {} items with {} jumps",
            self.items.len(),
            self.jumps.len()
        );
        Ok(Assembly {
            items: self.items,
            jumps: self.jumps,
            symbols: self.symbols,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::tokenize;

    fn build(source: &str) -> Result<Assembly, Error> {
        assemble(&tokenize(source)?)
    }

    fn slots(assembly: &Assembly, item: usize) -> &[Slot] {
        match &assembly.items[item] {
            Item::Push(push) => &push.slots,
            other => panic!("expected a push, found {other:?}"),
        }
    }

    fn opcodes(assembly: &Assembly) -> Vec<Option<Opcode>> {
        assembly
            .items
            .iter()
            .map(|item| match item {
                Item::Op(opcode) => Some(*opcode),
                Item::Push(_) => None,
            })
            .collect()
    }

    #[test]
    fn jump_back() {
        let assembly = build(
            "#PUSH, 1\nDUP[]\n#Label1:\nDUP[]\nDUP[]\nDUP[]\n#PUSH, Var1\nJMPR[], (Var1=#Label1)",
        )
        .unwrap();
        assert_eq!(assembly.items.len(), 7);
        assert_eq!(
            assembly.jumps,
            vec![Jump {
                line: 8,
                item: 6,
                label: "Label1".into(),
                target: 2,
            }]
        );
        assert_eq!(slots(&assembly, 5), &[Slot::Distance(0)]);
        assert_eq!(assembly.symbols.label("Label1").unwrap().item, 2);
    }

    #[test]
    fn repeated_variable() {
        let assembly = build(
            "#PUSH, 0, Var1, Var1, -1\nPOP[]\nSWAP[]\nJROF[], (Var1=#Label1)\nDUP[]\n#Label1:\nDUP[]",
        )
        .unwrap();
        assert_eq!(
            slots(&assembly, 0),
            &[
                Slot::Literal(0),
                Slot::Distance(0),
                Slot::Distance(0),
                Slot::Literal(-1)
            ]
        );
        let def = assembly.symbols.variable("Var1").unwrap();
        assert_eq!(def.positions, [1, 2]);
    }

    #[test]
    fn inline_arguments() {
        let assembly = build("MIAP[R], 3, 7\nSVTCA[X]\nMDAP[R] 0").unwrap();
        assert_eq!(slots(&assembly, 0), &[Slot::Literal(3), Slot::Literal(7)]);
        assert_eq!(slots(&assembly, 3), &[Slot::Literal(0)]);
        assert_eq!(
            opcodes(&assembly),
            vec![
                None,
                Some(Opcode::from_byte(0x3F)),
                Some(Opcode::from_byte(0x01)),
                None,
                Some(Opcode::from_byte(0x2F)),
            ]
        );
    }

    #[test]
    fn blocks_hoist_arguments() {
        let assembly =
            build("#BEGIN\nMIAP[R], 3, 7\nMIRP[M>RBl], 10, 12\nMDRP[m<rGr], 5\n#END\nIUP[Y]")
                .unwrap();
        assert_eq!(assembly.items.len(), 5);
        let values: Vec<_> = slots(&assembly, 0)
            .iter()
            .map(|slot| match slot {
                Slot::Literal(value) => *value,
                Slot::Distance(_) => panic!("unexpected distance"),
            })
            .collect();
        assert_eq!(values, [5, 10, 12, 3, 7]);
    }

    #[test]
    fn nested_blocks() {
        let assembly = build("#BEGIN\nSHP[1], 1\n#BEGIN\nSHP[1], 2\n#END\nSHP[1], 3\n#END").unwrap();
        assert_eq!(slots(&assembly, 0), &[Slot::Literal(3), Slot::Literal(1)]);
        assert_eq!(slots(&assembly, 2), &[Slot::Literal(2)]);
    }

    #[test]
    fn overlap_is_dropped() {
        let assembly = build("OVERLAP[]\nDUP[]\nOVERLAP[]").unwrap();
        assert_eq!(assembly.items.len(), 1);
    }

    #[test]
    fn push_off() {
        let err = build("#PUSHOFF\n#PUSH, 1\nMDAP[R]\nMDAP[R], 2").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 4, .. }), "{err}");
        assert!(build("#PUSHOFF\nMDAP[R]\n#PUSHON\nMDAP[R], 2").is_ok());
    }

    #[test]
    fn unbalanced_blocks() {
        let err = build("DUP[]\n#END").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 2, .. }), "{err}");
        let err = build("#BEGIN\nDUP[]").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 1, .. }), "{err}");
    }

    #[test]
    fn bad_instructions() {
        let err = build("DUP[]\nFROB[]").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 2, .. }), "{err}");
        let err = build("PUSHB[000], 1").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 1, .. }), "{err}");
    }

    #[test]
    fn unresolved_variable() {
        // never pushed
        let err = build("JMPR[], (Var1=#A)\n#A:").unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedVariable {
                line: 1,
                name: "Var1".into()
            }
        );
        // pushed but never bound
        let err = build("#PUSH, Var1\nDUP[]").unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedVariable {
                line: 1,
                name: "Var1".into()
            }
        );
    }

    #[test]
    fn unresolved_label() {
        let err = build("#PUSH, Var1\nJMPR[], (Var1=#Nowhere)").unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedLabel {
                line: 2,
                name: "Nowhere".into()
            }
        );
    }

    #[test]
    fn earliest_error_wins() {
        let err = build("#PUSH, Var2\nDUP[]\n#PUSH, Var1\nJMPR[], (Var1=#Nowhere)").unwrap_err();
        assert_eq!(err.line(), Some(1));
        assert!(matches!(err, Error::UnresolvedVariable { .. }));

        // a duplicate label found first still loses to an earlier line
        let err = build("#PUSH, Var2\nDUP[]\n#A:\n#A:").unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedVariable {
                line: 1,
                name: "Var2".into()
            }
        );
        let err = build("#A:\nDUP[]\n#A:\nJMPR[], (Var9=#A)").unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel { line: 3, .. }), "{err}");
        let err = build("JMPR[], (Var9=#A)\n#A:\n#A:").unwrap_err();
        assert!(matches!(err, Error::UnresolvedVariable { line: 1, .. }), "{err}");
    }

    #[test]
    fn duplicate_label() {
        let err = build("#A:\nDUP[]\n#A:").unwrap_err();
        assert_eq!(
            err,
            Error::DuplicateLabel {
                line: 3,
                name: "A".into(),
                first: 1
            }
        );
    }

    #[test]
    fn malformed_bindings() {
        for (source, line) in [
            // not from the most recent directive
            ("#PUSH, Var1\n#PUSH, 2\nJMPR[], (Var1=#A)\n#A:", 3),
            // bound twice
            ("#PUSH, Var1\nJMPR[], (Var1=#A)\nJMPR[], (Var1=#A)\n#A:", 3),
            // not a jump
            ("#PUSH, Var1\nDUP[], (Var1=#A)\n#A:", 2),
        ] {
            let err = build(source).unwrap_err();
            assert!(
                matches!(err, Error::MalformedJumpBinding { .. }),
                "{source}: {err}"
            );
            assert_eq!(err.line(), Some(line), "{source}");
        }
    }

    #[test]
    fn shadowed_variable_binds_to_latest() {
        let assembly =
            build("#PUSH, Var1\nJMPR[], (Var1=#A)\n#PUSH, Var1\nJROT[], (Var1=#A)\n#A:").unwrap();
        assert_eq!(slots(&assembly, 0), &[Slot::Distance(0)]);
        assert_eq!(slots(&assembly, 2), &[Slot::Distance(1)]);
        assert!(assembly.jumps.iter().all(|jump| jump.target == 4));
    }
}
