//! Options controlling how programs are assembled.

/// How pushed jump distances are encoded.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum JumpEncoding {
    /// Every distance is pushed as a word, in a push of its own.
    ///
    /// This matches the output of the VTT compiler.
    #[default]
    Word,
    /// Distances use the narrowest width that holds them and share pushes
    /// with neighbouring literals.
    Compact,
}

/// Options for [`compile_with_options`](crate::compile_with_options).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompileOptions {
    pub jump_encoding: JumpEncoding,
}

impl CompileOptions {
    pub fn with_jump_encoding(mut self, jump_encoding: JumpEncoding) -> Self {
        self.jump_encoding = jump_encoding;
        self
    }
}
