#![cfg(feature = "serde")]

use vtt_asm::{CompileOptions, JumpEncoding, Program};

#[test]
fn options_from_json() {
    let options: CompileOptions = serde_json::from_str(r#"{"jump_encoding": "compact"}"#).unwrap();
    assert_eq!(options.jump_encoding, JumpEncoding::Compact);
    // missing fields use the defaults
    let options: CompileOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(options, CompileOptions::default());
}

#[test]
fn program_round_trip() {
    let program = vtt_asm::assemble("#PUSH, Var1, 300\nJMPR[], (Var1=#A)\n#A:\nSVTCA[X]").unwrap();
    let json = serde_json::to_string(&program).unwrap();
    let back: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(back, program);
}
