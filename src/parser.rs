//! Parser turning script text into a [`ScriptProgram`].
//!
//! A script holds one call per line, `name(arg0, arg1, ...)`, with integer
//! arguments only. Whitespace anywhere is ignored, blank lines are skipped and
//! `;` may separate several calls on one line. The first bad line aborts the
//! whole parse.

use crate::command::{Command, CommandKind, ScriptProgram, Statement, lookup};
use crate::error::{Result, RobotError};

/// Lowest grid height accepted by `hoehe`.
pub const MIN_HEIGHT: i32 = 0;
/// Highest grid height accepted by `hoehe`.
pub const MAX_HEIGHT: i32 = 3;

impl ScriptProgram {
    /// Parses a whole script. See the [module docs](crate::parser).
    pub fn parse(source: &str) -> Result<Self> {
        parse_script(source)
    }
}

/// Parses a whole script; an empty or blank script yields an empty program.
pub fn parse_script(source: &str) -> Result<ScriptProgram> {
    let mut statements = Vec::new();

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        for part in line.split(';') {
            if let Some(command) = parse_statement(part, line_no)? {
                statements.push(Statement {
                    line: line_no,
                    command,
                });
            }
        }
    }

    Ok(ScriptProgram::new(statements))
}

/// Parses a single call. Returns `Ok(None)` for blank input.
pub fn parse_statement(text: &str, line: usize) -> Result<Option<Command>> {
    let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if text.is_empty() {
        return Ok(None);
    }

    let syntax = |message: String| RobotError::Syntax { line, message };

    let open = text
        .find('(')
        .ok_or_else(|| syntax(format!("`{text}` is missing `(`")))?;
    let close = text
        .rfind(')')
        .ok_or_else(|| syntax(format!("`{text}` is missing `)`")))?;

    if close < open {
        return Err(syntax(format!("`)` before `(` in `{text}`")));
    }
    if text.matches('(').count() > 1 || text.matches(')').count() > 1 {
        return Err(syntax(format!("nested or repeated parentheses in `{text}`")));
    }
    if close + 1 != text.len() {
        return Err(syntax(format!(
            "unexpected `{}` after `)`",
            &text[close + 1..]
        )));
    }

    let name = &text[..open];
    if name.is_empty() {
        return Err(syntax("missing command name before `(`".into()));
    }

    let inner = &text[open + 1..close];
    let args = if inner.is_empty() {
        Vec::new()
    } else {
        inner
            .split(',')
            .map(|token| {
                token
                    .parse::<i32>()
                    .map_err(|_| syntax(format!("`{token}` is not an integer")))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let word = lookup(name).ok_or_else(|| RobotError::UnknownCommand {
        line,
        name: name.to_string(),
    })?;

    if !word.arity.accepts(args.len()) {
        return Err(RobotError::Arity {
            line,
            name: name.to_string(),
            expected: word.arity.describe(),
            found: args.len(),
            example: word.example,
        });
    }

    let command = match word.kind {
        CommandKind::MoveXY => Command::MoveXY {
            x: args[0],
            y: args[1],
        },
        CommandKind::MoveZ => {
            let z = args[0];
            if !(MIN_HEIGHT..=MAX_HEIGHT).contains(&z) {
                return Err(RobotError::InvalidArgument {
                    line,
                    message: format!("height {z} is outside {MIN_HEIGHT}..={MAX_HEIGHT}"),
                });
            }
            Command::MoveZ { z }
        }
        CommandKind::PumpOn => Command::PumpOn,
        CommandKind::PumpOff => Command::PumpOff,
        CommandKind::RotateWrist => Command::RotateWrist { degrees: args[0] },
        CommandKind::Diagnostic => Command::Diagnostic { args },
    };

    Ok(Some(command))
}
