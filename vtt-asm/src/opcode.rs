//! TrueType instruction opcodes.
//!
//! Opcodes are grouped into families that share a mnemonic and differ only
//! in their low flag bits (`MIRP[00000]` through `MIRP[11111]`, for
//! example). Flags may be written in binary, the way fontTools writes them,
//! or with the letter notation used by VTT (`MIRP[M>RBl]`, `SVTCA[X]`).
//! Opcodes always format in the binary notation.

use std::fmt;

/// A single TrueType instruction opcode.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Opcode(u8);

/// Error returned when a mnemonic does not name a TrueType instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MnemonicError {
    /// No instruction has this name.
    UnknownInstruction(String),
    /// The instruction exists, but the bracketed flags are not valid for it.
    InvalidFlags { name: &'static str, flags: String },
}

impl fmt::Display for MnemonicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownInstruction(name) => write!(f, "unknown instruction '{name}'"),
            Self::InvalidFlags { name, flags } if flags.is_empty() => {
                write!(f, "instruction '{name}' requires flags")
            }
            Self::InvalidFlags { name, flags } => {
                write!(f, "invalid flags '[{flags}]' for instruction '{name}'")
            }
        }
    }
}

impl std::error::Error for MnemonicError {}

/// How the letter form of a family's flags is spelled.
#[derive(Copy, Clone, Debug)]
enum FlagStyle {
    /// Only the binary form is accepted.
    Binary,
    /// A single token selects the flag value.
    Letters(&'static [(&'static str, u8)]),
    /// `MDRP`/`MIRP`: rp0, minimum distance, rounding and distance type.
    Move,
}

#[derive(Copy, Clone, Debug)]
struct Family {
    name: &'static str,
    base: u8,
    bits: u8,
    style: FlagStyle,
}

const AXIS: FlagStyle = FlagStyle::Letters(&[("Y", 0), ("X", 1)]);
const ROUND: FlagStyle = FlagStyle::Letters(&[("r", 0), ("R", 1)]);
const REF_POINT: FlagStyle = FlagStyle::Letters(&[("2", 0), ("1", 1)]);
const OUTLINE: FlagStyle = FlagStyle::Letters(&[("N", 0), ("O", 1)]);
const RP0: FlagStyle = FlagStyle::Letters(&[("<", 0), (">", 1)]);
const DISTANCE: FlagStyle = FlagStyle::Letters(&[("Gr", 0), ("Bl", 1), ("Wh", 2)]);

const fn op(name: &'static str, base: u8) -> Family {
    Family {
        name,
        base,
        bits: 0,
        style: FlagStyle::Binary,
    }
}

const fn flagged(name: &'static str, base: u8, bits: u8, style: FlagStyle) -> Family {
    Family {
        name,
        base,
        bits,
        style,
    }
}

/// All assigned opcodes, sorted by base value.
#[rustfmt::skip]
const FAMILIES: &[Family] = &[
    flagged("SVTCA", 0x00, 1, AXIS), flagged("SPVTCA", 0x02, 1, AXIS),
    flagged("SFVTCA", 0x04, 1, AXIS), flagged("SPVTL", 0x06, 1, ROUND),
    flagged("SFVTL", 0x08, 1, ROUND), op("SPVFS", 0x0A), op("SFVFS", 0x0B), op("GPV", 0x0C),
    op("GFV", 0x0D), op("SFVTPV", 0x0E), op("ISECT", 0x0F), op("SRP0", 0x10), op("SRP1", 0x11),
    op("SRP2", 0x12), op("SZP0", 0x13), op("SZP1", 0x14), op("SZP2", 0x15), op("SZPS", 0x16),
    op("SLOOP", 0x17), op("RTG", 0x18), op("RTHG", 0x19), op("SMD", 0x1A), op("ELSE", 0x1B),
    op("JMPR", 0x1C), op("SCVTCI", 0x1D), op("SSWCI", 0x1E), op("SSW", 0x1F), op("DUP", 0x20),
    op("POP", 0x21), op("CLEAR", 0x22), op("SWAP", 0x23), op("DEPTH", 0x24), op("CINDEX", 0x25),
    op("MINDEX", 0x26), op("ALIGNPTS", 0x27), op("UTP", 0x29), op("LOOPCALL", 0x2A),
    op("CALL", 0x2B), op("FDEF", 0x2C), op("ENDF", 0x2D), flagged("MDAP", 0x2E, 1, ROUND),
    flagged("IUP", 0x30, 1, AXIS), flagged("SHP", 0x32, 1, REF_POINT),
    flagged("SHC", 0x34, 1, REF_POINT), flagged("SHZ", 0x36, 1, REF_POINT), op("SHPIX", 0x38),
    op("IP", 0x39), flagged("MSIRP", 0x3A, 1, RP0), op("ALIGNRP", 0x3C), op("RTDG", 0x3D),
    flagged("MIAP", 0x3E, 1, ROUND), op("NPUSHB", 0x40), op("NPUSHW", 0x41), op("WS", 0x42),
    op("RS", 0x43), op("WCVTP", 0x44), op("RCVT", 0x45), flagged("GC", 0x46, 1, OUTLINE),
    op("SCFS", 0x48), flagged("MD", 0x49, 1, OUTLINE), op("MPPEM", 0x4B), op("MPS", 0x4C),
    op("FLIPON", 0x4D), op("FLIPOFF", 0x4E), op("DEBUG", 0x4F), op("LT", 0x50), op("LTEQ", 0x51),
    op("GT", 0x52), op("GTEQ", 0x53), op("EQ", 0x54), op("NEQ", 0x55), op("ODD", 0x56),
    op("EVEN", 0x57), op("IF", 0x58), op("EIF", 0x59), op("AND", 0x5A), op("OR", 0x5B),
    op("NOT", 0x5C), op("DELTAP1", 0x5D), op("SDB", 0x5E), op("SDS", 0x5F), op("ADD", 0x60),
    op("SUB", 0x61), op("DIV", 0x62), op("MUL", 0x63), op("ABS", 0x64), op("NEG", 0x65),
    op("FLOOR", 0x66), op("CEILING", 0x67), flagged("ROUND", 0x68, 2, DISTANCE),
    flagged("NROUND", 0x6C, 2, DISTANCE), op("WCVTF", 0x70), op("DELTAP2", 0x71),
    op("DELTAP3", 0x72), op("DELTAC1", 0x73), op("DELTAC2", 0x74), op("DELTAC3", 0x75),
    op("SROUND", 0x76), op("S45ROUND", 0x77), op("JROT", 0x78), op("JROF", 0x79),
    op("ROFF", 0x7A), op("RUTG", 0x7C), op("RDTG", 0x7D), op("SANGW", 0x7E), op("AA", 0x7F),
    op("FLIPPT", 0x80), op("FLIPRGON", 0x81), op("FLIPRGOFF", 0x82), op("SCANCTRL", 0x85),
    flagged("SDPVTL", 0x86, 1, ROUND), op("GETINFO", 0x88), op("IDEF", 0x89), op("ROLL", 0x8A),
    op("MAX", 0x8B), op("MIN", 0x8C), op("SCANTYPE", 0x8D), op("INSTCTRL", 0x8E),
    op("GETVARIATION", 0x91), op("GETDATA", 0x92),
    flagged("PUSHB", 0xB0, 3, FlagStyle::Binary), flagged("PUSHW", 0xB8, 3, FlagStyle::Binary),
    flagged("MDRP", 0xC0, 5, FlagStyle::Move), flagged("MIRP", 0xE0, 5, FlagStyle::Move),
];

impl Opcode {
    pub const NPUSHB: Self = Self(0x40);
    pub const NPUSHW: Self = Self(0x41);
    pub const PUSHB000: Self = Self(0xB0);
    pub const PUSHW000: Self = Self(0xB8);
    pub const JMPR: Self = Self(0x1C);
    pub const JROT: Self = Self(0x78);
    pub const JROF: Self = Self(0x79);

    /// Creates an opcode from its byte value.
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Returns the byte value of the opcode.
    pub const fn to_u8(self) -> u8 {
        self.0
    }

    /// Resolves a mnemonic and its bracketed flags to an opcode.
    ///
    /// `flags` is the text between the brackets, without the brackets.
    pub fn from_mnemonic(name: &str, flags: &str) -> Result<Self, MnemonicError> {
        let flags = flags.trim();
        let Some(family) = FAMILIES.iter().find(|family| family.name == name) else {
            return Self::from_unassigned_name(name, flags)
                .ok_or_else(|| MnemonicError::UnknownInstruction(name.to_owned()));
        };
        family
            .parse_flags(flags)
            .map(|value| Self(family.base + value))
            .ok_or_else(|| MnemonicError::InvalidFlags {
                name: family.name,
                flags: flags.to_owned(),
            })
    }

    // `OP28[]` and friends, for opcodes given meaning by IDEF
    fn from_unassigned_name(name: &str, flags: &str) -> Option<Self> {
        let hex = name.strip_prefix("OP")?;
        if hex.len() != 2 || !flags.is_empty() {
            return None;
        }
        let byte = u8::from_str_radix(hex, 16).ok()?;
        let opcode = Self(byte);
        opcode.family().is_none().then_some(opcode)
    }

    fn family(self) -> Option<&'static Family> {
        FAMILIES
            .iter()
            .find(|family| (family.base..=family.base + family.max_flags()).contains(&self.0))
    }

    /// Returns the mnemonic without flags, or `None` for unassigned opcodes.
    pub fn name(self) -> Option<&'static str> {
        self.family().map(|family| family.name)
    }

    /// Returns true for the relative jump instructions `JMPR`, `JROT` and
    /// `JROF`.
    pub fn is_jump(self) -> bool {
        matches!(self, Self::JMPR | Self::JROT | Self::JROF)
    }

    /// Returns true if this opcode pushes inline operands.
    pub fn is_push(self) -> bool {
        matches!(self.0, 0x40 | 0x41 | 0xB0..=0xBF)
    }

    /// Returns true if this opcode pushes word sized inline operands.
    pub fn is_push_words(self) -> bool {
        matches!(self.0, 0x41 | 0xB8..=0xBF)
    }
}

impl Family {
    fn max_flags(&self) -> u8 {
        ((1u16 << self.bits) - 1) as u8
    }

    fn parse_flags(&self, flags: &str) -> Option<u8> {
        if self.bits == 0 {
            return flags.is_empty().then_some(0);
        }
        if flags.len() == self.bits as usize && flags.bytes().all(|b| b == b'0' || b == b'1') {
            return u8::from_str_radix(flags, 2).ok();
        }
        match self.style {
            FlagStyle::Binary => None,
            FlagStyle::Letters(table) => table
                .iter()
                .find_map(|(letters, value)| (*letters == flags).then_some(*value)),
            FlagStyle::Move => parse_move_flags(flags),
        }
    }
}

/// Parses VTT flags for `MDRP` and `MIRP`, such as `M>RBl` or `m<rGr`.
///
/// Each of the four settings must appear exactly once, in any order.
fn parse_move_flags(flags: &str) -> Option<u8> {
    let mut rp0 = None;
    let mut min_distance = None;
    let mut round = None;
    let mut distance_type = None;
    let mut chars = flags.chars();
    while let Some(c) = chars.next() {
        let (slot, value) = match c {
            '<' => (&mut rp0, 0),
            '>' => (&mut rp0, 1),
            'm' => (&mut min_distance, 0),
            'M' => (&mut min_distance, 1),
            'r' => (&mut round, 0),
            'R' => (&mut round, 1),
            'G' | 'B' | 'W' => {
                let value = match (c, chars.next()?) {
                    ('G', 'r') => 0,
                    ('B', 'l') => 1,
                    ('W', 'h') => 2,
                    _ => return None,
                };
                (&mut distance_type, value)
            }
            _ => return None,
        };
        if slot.replace(value).is_some() {
            return None;
        }
    }
    Some(rp0? << 4 | min_distance? << 3 | round? << 2 | distance_type?)
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family() {
            Some(family) if family.bits == 0 => write!(f, "{}[]", family.name),
            Some(family) => write!(
                f,
                "{}[{:0width$b}]",
                family.name,
                self.0 - family.base,
                width = family.bits as usize
            ),
            None => write!(f, "OP{:02X}[]", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_are_sorted_and_disjoint() {
        for pair in FAMILIES.windows(2) {
            assert!(
                pair[0].base + pair[0].max_flags() < pair[1].base,
                "{} overlaps {}",
                pair[0].name,
                pair[1].name
            );
        }
    }

    #[test]
    fn binary_flags() {
        assert_eq!(Opcode::from_mnemonic("DUP", ""), Ok(Opcode(0x20)));
        assert_eq!(Opcode::from_mnemonic("SVTCA", "1"), Ok(Opcode(0x01)));
        assert_eq!(Opcode::from_mnemonic("ROUND", "01"), Ok(Opcode(0x69)));
        assert_eq!(Opcode::from_mnemonic("MIRP", "10110"), Ok(Opcode(0xF6)));
        assert_eq!(Opcode::from_mnemonic("PUSHB", "010"), Ok(Opcode(0xB2)));
    }

    #[test]
    fn vtt_flags() {
        assert_eq!(Opcode::from_mnemonic("SVTCA", "Y"), Ok(Opcode(0x00)));
        assert_eq!(Opcode::from_mnemonic("SVTCA", "X"), Ok(Opcode(0x01)));
        assert_eq!(Opcode::from_mnemonic("IUP", "X"), Ok(Opcode(0x31)));
        assert_eq!(Opcode::from_mnemonic("MDAP", "R"), Ok(Opcode(0x2F)));
        assert_eq!(Opcode::from_mnemonic("SHP", "2"), Ok(Opcode(0x32)));
        assert_eq!(Opcode::from_mnemonic("MD", "O"), Ok(Opcode(0x4A)));
        assert_eq!(Opcode::from_mnemonic("ROUND", "Wh"), Ok(Opcode(0x6A)));
        // rp0, min distance, round, black
        assert_eq!(Opcode::from_mnemonic("MIRP", "M>RBl"), Ok(Opcode(0xFD)));
        assert_eq!(Opcode::from_mnemonic("MDRP", "m<rGr"), Ok(Opcode(0xC0)));
        assert_eq!(Opcode::from_mnemonic("MDRP", "<RmWh"), Ok(Opcode(0xC6)));
    }

    #[test]
    fn bad_mnemonics() {
        assert_eq!(
            Opcode::from_mnemonic("FROB", ""),
            Err(MnemonicError::UnknownInstruction("FROB".into()))
        );
        assert!(Opcode::from_mnemonic("DUP", "1").is_err());
        assert!(Opcode::from_mnemonic("IUP", "").is_err());
        assert!(Opcode::from_mnemonic("MIRP", "M>RBlR").is_err());
        assert!(Opcode::from_mnemonic("MIRP", "M>R").is_err());
        assert!(Opcode::from_mnemonic("OP29", "").is_err());
    }

    #[test]
    fn unassigned_opcodes() {
        let op = Opcode::from_mnemonic("OP28", "").unwrap();
        assert_eq!(op.to_u8(), 0x28);
        assert_eq!(op.name(), None);
        assert_eq!(op.to_string(), "OP28[]");
    }

    #[test]
    fn display_round_trips() {
        for byte in 0..=255u8 {
            let opcode = Opcode::from_byte(byte);
            let text = opcode.to_string();
            let (name, rest) = text.split_once('[').unwrap();
            let flags = rest.strip_suffix(']').unwrap();
            assert_eq!(Opcode::from_mnemonic(name, flags), Ok(opcode), "{text}");
        }
    }

    #[test]
    fn classification() {
        assert!(Opcode::JMPR.is_jump());
        assert!(Opcode::JROF.is_jump());
        assert!(!Opcode::from_byte(0x20).is_jump());
        assert!(Opcode::NPUSHW.is_push_words());
        assert!(Opcode::from_byte(0xB3).is_push());
        assert!(!Opcode::from_byte(0xB3).is_push_words());
    }
}
