//! Splitting VTT assembly source into classified lines.

use crate::Error;

/// One meaningful line of source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number in the input.
    pub number: usize,
    /// The line with comments removed and surrounding whitespace trimmed.
    pub text: String,
    pub kind: LineKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// `#PUSH, a, b, ...`
    PushDirective(Vec<Operand>),
    /// `#Name:`
    LabelDef(String),
    /// `NAME[flags]` with optional inline arguments.
    PlainOp(OpLine),
    /// `NAME[flags], (Var=#Label)`
    JumpOp { op: OpLine, binding: JumpBinding },
    PushOn,
    PushOff,
    BeginBlock,
    EndBlock,
}

/// A `#PUSH` operand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Literal(i16),
    Variable(String),
}

/// An instruction as written in the source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpLine {
    pub mnemonic: String,
    /// The text between the brackets.
    pub flags: String,
    /// Inline literal arguments.
    pub args: Vec<i16>,
}

/// The `(Var=#Label)` suffix of a jump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JumpBinding {
    pub variable: String,
    pub label: String,
}

/// Splits source text into lines, dropping comments and blank lines.
///
/// Fails on the first malformed line.
pub fn tokenize(source: &str) -> Result<Vec<SourceLine>, Error> {
    let stripped = strip_comments(source)?;
    let mut lines = Vec::new();
    for (i, raw) in stripped.lines().enumerate() {
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }
        let number = i + 1;
        let kind = classify(number, text)?;
        lines.push(SourceLine {
            number,
            text: text.to_owned(),
            kind,
        });
    }
    Ok(lines)
}

/// Replaces every `/* ... */` comment with spaces, keeping line breaks so
/// that line numbers are unchanged.
pub(crate) fn strip_comments(source: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        let comment = &rest[start..];
        let Some(end) = comment[2..].find("*/") else {
            let line = source[..source.len() - comment.len()].matches('\n').count() + 1;
            let text = comment.lines().next().unwrap_or_default();
            return Err(Error::syntax(line, text, "unterminated comment"));
        };
        let comment = &comment[..end + 4];
        out.extend(comment.chars().map(|c| if c == '\n' { '\n' } else { ' ' }));
        rest = &rest[start + comment.len()..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Parses a signed decimal or `0x` hexadecimal integer.
pub(crate) fn parse_integer(token: &str) -> Option<i64> {
    let (negative, digits) = match token.as_bytes().first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            i64::from_str_radix(hex, 16).ok()?
        }
        Some(_) => return None,
        None if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.parse().ok()?
        }
        None => return None,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Splits `NAME[flags] rest` into its three parts.
pub(crate) fn split_mnemonic(text: &str) -> Option<(&str, &str, &str)> {
    let (name, rest) = text.split_once('[')?;
    let (flags, rest) = rest.split_once(']')?;
    let name = name.trim_end();
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    Some((name, flags.trim(), rest.trim()))
}

fn is_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    bytes
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn classify(line: usize, text: &str) -> Result<LineKind, Error> {
    match text.strip_prefix('#') {
        Some(directive) => classify_directive(line, text, directive),
        None => classify_op(line, text),
    }
}

fn classify_directive(line: usize, text: &str, directive: &str) -> Result<LineKind, Error> {
    if let Some(name) = directive.strip_suffix(':') {
        let name = name.trim();
        if !is_identifier(name) {
            return Err(Error::syntax(line, text, format!("invalid label name '{name}'")));
        }
        return Ok(LineKind::LabelDef(name.to_owned()));
    }
    let (keyword, operands) = match directive.split_once(',') {
        Some((keyword, operands)) => (keyword.trim(), Some(operands)),
        None => (directive.trim(), None),
    };
    let kind = match (keyword, operands) {
        ("PUSH", Some(operands)) => {
            LineKind::PushDirective(parse_operands(line, text, operands)?)
        }
        ("PUSH", None) => return Err(Error::syntax(line, text, "#PUSH without operands")),
        ("PUSHON", None) => LineKind::PushOn,
        ("PUSHOFF", None) => LineKind::PushOff,
        ("BEGIN", None) => LineKind::BeginBlock,
        ("END", None) => LineKind::EndBlock,
        _ => return Err(Error::syntax(line, text, "unknown directive")),
    };
    Ok(kind)
}

fn parse_operands(line: usize, text: &str, operands: &str) -> Result<Vec<Operand>, Error> {
    operands
        .split(',')
        .map(str::trim)
        .map(|token| {
            if token.is_empty() {
                Err(Error::syntax(line, text, "empty operand"))
            } else if let Some(value) = parse_integer(token) {
                literal(line, text, token, value).map(Operand::Literal)
            } else if is_identifier(token) {
                Ok(Operand::Variable(token.to_owned()))
            } else {
                Err(Error::syntax(line, text, format!("invalid operand '{token}'")))
            }
        })
        .collect()
}

fn literal(line: usize, text: &str, token: &str, value: i64) -> Result<i16, Error> {
    i16::try_from(value).map_err(|_| {
        Error::syntax(
            line,
            text,
            format!("'{token}' does not fit in a signed 16-bit word"),
        )
    })
}

fn classify_op(line: usize, text: &str) -> Result<LineKind, Error> {
    let Some((mnemonic, flags, rest)) = split_mnemonic(text) else {
        return Err(Error::syntax(line, text, "expected an instruction"));
    };
    let (args, binding) = match rest.find('(') {
        Some(open) => (&rest[..open], Some(&rest[open..])),
        None => (rest, None),
    };
    let args = args
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| match parse_integer(token) {
            Some(value) => literal(line, text, token, value),
            None => Err(Error::syntax(
                line,
                text,
                format!("invalid argument '{token}'"),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let op = OpLine {
        mnemonic: mnemonic.to_owned(),
        flags: flags.to_owned(),
        args,
    };
    let Some(binding) = binding else {
        return Ok(LineKind::PlainOp(op));
    };
    if !op.args.is_empty() {
        return Err(Error::binding(
            line,
            text,
            "a jump with a binding takes no inline arguments",
        ));
    }
    let binding = parse_binding(binding)
        .ok_or_else(|| Error::binding(line, text, "expected '(Variable=#Label)'"))?;
    Ok(LineKind::JumpOp { op, binding })
}

fn parse_binding(text: &str) -> Option<JumpBinding> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let (variable, label) = inner.split_once('=')?;
    let variable = variable.trim();
    let label = label.trim().strip_prefix('#')?.trim();
    (is_identifier(variable) && is_identifier(label)).then(|| JumpBinding {
        variable: variable.to_owned(),
        label: label.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<LineKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|line| line.kind)
            .collect()
    }

    fn op(mnemonic: &str, flags: &str, args: &[i16]) -> OpLine {
        OpLine {
            mnemonic: mnemonic.into(),
            flags: flags.into(),
            args: args.to_vec(),
        }
    }

    #[test]
    fn line_forms() {
        let source = "#PUSH, 1, -2, 0x1F, Var1\n\
                      #Label1:\n\
                      SVTCA[X]\n\
                      MIAP[R], 3, 7\n\
                      SHP[1] 4 5\n\
                      JROT[], (Var1=#Label1)\n\
                      #PUSHOFF\n\
                      #PUSHON\n\
                      #BEGIN\n\
                      #END";
        assert_eq!(
            kinds(source),
            vec![
                LineKind::PushDirective(vec![
                    Operand::Literal(1),
                    Operand::Literal(-2),
                    Operand::Literal(31),
                    Operand::Variable("Var1".into()),
                ]),
                LineKind::LabelDef("Label1".into()),
                LineKind::PlainOp(op("SVTCA", "X", &[])),
                LineKind::PlainOp(op("MIAP", "R", &[3, 7])),
                LineKind::PlainOp(op("SHP", "1", &[4, 5])),
                LineKind::JumpOp {
                    op: op("JROT", "", &[]),
                    binding: JumpBinding {
                        variable: "Var1".into(),
                        label: "Label1".into(),
                    },
                },
                LineKind::PushOff,
                LineKind::PushOn,
                LineKind::BeginBlock,
                LineKind::EndBlock,
            ]
        );
    }

    #[test]
    fn comments_keep_line_numbers() {
        let source = "/* header\n   spans lines */\n\nDUP[] /* inline */\n  /* x */ POP[]";
        let lines = tokenize(source).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 4);
        assert_eq!(lines[0].text, "DUP[]");
        assert_eq!(lines[1].number, 5);
        assert_eq!(lines[1].text, "POP[]");
    }

    #[test]
    fn unterminated_comment() {
        let err = tokenize("DUP[]\n/* oops\nPOP[]").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn integers() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("-42"), Some(-42));
        assert_eq!(parse_integer("+7"), Some(7));
        assert_eq!(parse_integer("0x10"), Some(16));
        assert_eq!(parse_integer("-0XfF"), Some(-255));
        assert_eq!(parse_integer("0x"), None);
        assert_eq!(parse_integer("-"), None);
        assert_eq!(parse_integer("1a"), None);
        assert_eq!(parse_integer("Var1"), None);
    }

    #[test]
    fn syntax_errors() {
        for (source, line) in [
            ("#PUSH", 1),
            ("#PUSH, 1,, 2", 1),
            ("#PUSH, 40000", 1),
            ("#PUSH, 1x", 1),
            ("DUP[]\n#FROB", 2),
            ("DUP[]\nDUP[]\nDUP", 3),
            ("#9lives:", 1),
            ("MIAP[R], 3, seven", 1),
        ] {
            let err = tokenize(source).unwrap_err();
            assert!(matches!(err, Error::Syntax { .. }), "{source}: {err}");
            assert_eq!(err.line(), Some(line), "{source}");
        }
    }

    #[test]
    fn malformed_bindings() {
        for source in [
            "JMPR[], (Var1#Label)",
            "JMPR[], (Var1=Label)",
            "JMPR[], (Var1=#Label",
            "JMPR[], (Var1=#Label) 5",
            "JMPR[], 5, (Var1=#Label)",
        ] {
            let err = tokenize(source).unwrap_err();
            assert!(
                matches!(err, Error::MalformedJumpBinding { .. }),
                "{source}: {err}"
            );
        }
    }

    #[test]
    fn error_text_is_the_offending_line() {
        let err = tokenize("DUP[]\n   #PUSH, ?  ").unwrap_err();
        assert_eq!(
            err,
            Error::Syntax {
                line: 2,
                text: "#PUSH, ?".into(),
                reason: "invalid operand '?'".into(),
            }
        );
    }
}
