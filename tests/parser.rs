// tests/parser.rs
use arm_script::{Command, ErrorKind, RobotError, ScriptProgram, parse_statement};
use proptest::prelude::*;

fn kind_of(source: &str) -> ErrorKind {
    ScriptProgram::parse(source)
        .expect_err("script should be rejected")
        .kind()
}

#[test]
fn test_parses_commands_in_order() {
    let program = ScriptProgram::parse("position(1,2)\nhoehe(2)\n\n\n").unwrap();
    let commands: Vec<_> = program.commands().cloned().collect();

    assert_eq!(
        commands,
        vec![Command::MoveXY { x: 1, y: 2 }, Command::MoveZ { z: 2 }]
    );
}

#[test]
fn test_whitespace_is_ignored() {
    let program =
        ScriptProgram::parse("position(1, 2)   \nhoehe(2) \n  \n \n \n pumpe_an() \n  pumpe_aus()")
            .unwrap();

    assert_eq!(program.len(), 4);
    assert_eq!(program.statements()[2].command, Command::PumpOn);
    assert_eq!(program.statements()[3].command, Command::PumpOff);
    // Source lines are kept, blank lines included.
    assert_eq!(program.statements()[2].line, 6);
}

#[test]
fn test_semicolons_separate_statements() {
    let program = ScriptProgram::parse(
        "position(3,4);hoehe(1);pumpe_an();hoehe(2);position(4,6);hoehe(1);pumpe_aus()",
    )
    .unwrap();

    assert_eq!(program.len(), 7);
    assert!(program.statements().iter().all(|s| s.line == 1));
    assert_eq!(program.statements()[4].command, Command::MoveXY { x: 4, y: 6 });
}

#[test]
fn test_all_vocabulary() {
    let program =
        ScriptProgram::parse("drehen(-90)\ndiagnose()\ndiagnose(1)\npumpe_an()").unwrap();
    let commands: Vec<_> = program.commands().cloned().collect();

    assert_eq!(
        commands,
        vec![
            Command::RotateWrist { degrees: -90 },
            Command::Diagnostic { args: vec![] },
            Command::Diagnostic { args: vec![1] },
            Command::PumpOn,
        ]
    );
}

#[test]
fn test_syntax_errors() {
    assert_eq!(kind_of("hoehe("), ErrorKind::Syntax);
    assert_eq!(kind_of("hoehe 2"), ErrorKind::Syntax);
    assert_eq!(kind_of("hoehe(2)x"), ErrorKind::Syntax);
    assert_eq!(kind_of("hoehe((2))"), ErrorKind::Syntax);
    assert_eq!(kind_of("hoehe)2("), ErrorKind::Syntax);
    assert_eq!(kind_of("(2)"), ErrorKind::Syntax);
    assert_eq!(kind_of("position(1,,2)"), ErrorKind::Syntax);
}

#[test]
fn test_non_integer_argument_is_named() {
    let err = ScriptProgram::parse("position(1, x)").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert!(err.to_string().contains("`x`"), "message was: {err}");
}

#[test]
fn test_arity_errors() {
    assert_eq!(kind_of("position()"), ErrorKind::Arity);
    assert_eq!(kind_of("position(1)"), ErrorKind::Arity);
    assert_eq!(kind_of("hoehe()"), ErrorKind::Arity);
    assert_eq!(kind_of("pumpe_an(1)"), ErrorKind::Arity);
    assert_eq!(kind_of("pumpe_aus(1)"), ErrorKind::Arity);
    assert_eq!(kind_of("drehen()"), ErrorKind::Arity);
    assert_eq!(kind_of("diagnose(0,1)"), ErrorKind::Arity);
}

#[test]
fn test_unknown_commands() {
    assert_eq!(kind_of("unknownfn()"), ErrorKind::UnknownCommand);
    assert_eq!(kind_of("hoehe_()"), ErrorKind::UnknownCommand);
    // Names are case-sensitive.
    assert_eq!(kind_of("Position(1,2)"), ErrorKind::UnknownCommand);
}

#[test]
fn test_height_is_bounded() {
    assert_eq!(kind_of("hoehe(4)"), ErrorKind::InvalidArgument);
    assert_eq!(kind_of("hoehe(-1)"), ErrorKind::InvalidArgument);
    assert!(ScriptProgram::parse("hoehe(0)\nhoehe(3)").is_ok());
}

#[test]
fn test_first_error_aborts_with_its_line() {
    let err = ScriptProgram::parse("position(1,2)\n\nfoo()\nbar(").unwrap_err();

    assert_eq!(
        err,
        RobotError::UnknownCommand {
            line: 3,
            name: "foo".into()
        }
    );
    assert_eq!(err.line(), Some(3));
}

#[test]
fn test_blank_input() {
    assert!(ScriptProgram::parse("").unwrap().is_empty());
    assert!(ScriptProgram::parse(" \n\t\n").unwrap().is_empty());
    assert_eq!(parse_statement("   ", 1).unwrap(), None);
}

proptest! {
    #[test]
    fn prop_any_position_parses(x in any::<i32>(), y in any::<i32>()) {
        let command = parse_statement(&format!(" position( {x} ,{y} ) "), 1).unwrap();
        prop_assert_eq!(command, Some(Command::MoveXY { x, y }));
    }

    #[test]
    fn prop_garbage_never_panics(line in "[a-z_(),0-9 -]{0,24}") {
        let _ = parse_statement(&line, 1);
    }
}
