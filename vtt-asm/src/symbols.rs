//! Variables and labels seen while assembling.

use indexmap::IndexMap;

use crate::Error;

/// Where a variable was pushed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableDef {
    /// Line of the `#PUSH` directive that introduced the variable.
    pub line: usize,
    /// Index of the push item created for that directive.
    pub item: usize,
    /// Operand positions the variable occupies in the directive.
    pub positions: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelDef {
    pub line: usize,
    /// Index of the first item emitted after the label.
    pub item: usize,
}

/// Variables and labels, in order of first definition.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    variables: IndexMap<String, VariableDef>,
    labels: IndexMap<String, LabelDef>,
}

impl SymbolTable {
    /// Records a variable, shadowing any earlier definition of the same name.
    pub fn define_variable(&mut self, name: &str, def: VariableDef) -> Option<VariableDef> {
        let previous = self.variables.insert(name.to_owned(), def);
        if let Some(previous) = &previous {
            log::trace!("variable '{name}' from line {} is shadowed", previous.line);
        }
        previous
    }

    pub fn variable(&self, name: &str) -> Option<&VariableDef> {
        self.variables.get(name)
    }

    /// Binds a label to the next item. Labels can only be defined once.
    pub fn define_label(&mut self, name: &str, line: usize, item: usize) -> Result<(), Error> {
        if let Some(first) = self.labels.get(name) {
            return Err(Error::DuplicateLabel {
                line,
                name: name.to_owned(),
                first: first.line,
            });
        }
        self.labels.insert(name.to_owned(), LabelDef { line, item });
        Ok(())
    }

    pub fn label(&self, name: &str) -> Option<&LabelDef> {
        self.labels.get(name)
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, &LabelDef)> + '_ {
        self.labels.iter().map(|(name, def)| (name.as_str(), def))
    }
}
