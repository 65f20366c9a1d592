//! Canonical textual encoding of a [`Program`].
//!
//! One instruction per line, `OPCODE[ OPERAND]`. Operands are a number, a
//! quoted word, `true`/`false`, a bare identifier, or an instruction index.
//! `CALL` lines carry the procedure name and the call-site arity. The
//! encoding is lossless: [`parse_listing`] rebuilds the procedure table
//! from the `DEF name` / guard `JUMP` / leading `PARAM` shape the code
//! generator emits, so a listing re-parses into an equivalent program.

use std::collections::HashMap;

use tortue_syntax::error::{Error, ErrorKind, Result};

use crate::builtin::Builtin;
use crate::instruction::Instruction;
use crate::program::{Procedure, Program};
use crate::value::{format_number, Value};

fn escape_word(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn format_instruction(instr: &Instruction) -> String {
    match instr {
        Instruction::Push(Value::Num(n)) => format!("PUSH {}", format_number(*n)),
        Instruction::Push(Value::Word(s)) => format!("PUSH \"{}\"", escape_word(s)),
        Instruction::Push(Value::Bool(b)) => format!("PUSH {}", b),
        Instruction::Load(name) => format!("LOAD {}", name),
        Instruction::Store(name) => format!("STORE {}", name),
        Instruction::Add => "ADD".to_string(),
        Instruction::Sub => "SUB".to_string(),
        Instruction::Mul => "MUL".to_string(),
        Instruction::Div => "DIV".to_string(),
        Instruction::Pow => "POW".to_string(),
        Instruction::Neg => "UMINUS".to_string(),
        Instruction::And => "AND".to_string(),
        Instruction::Or => "OR".to_string(),
        Instruction::Not => "NOT".to_string(),
        Instruction::Gt => "GT".to_string(),
        Instruction::Lt => "LT".to_string(),
        Instruction::Gte => "GTE".to_string(),
        Instruction::Lte => "LTE".to_string(),
        Instruction::Eq => "EQ".to_string(),
        Instruction::Neq => "NEQ".to_string(),
        Instruction::Jump(tgt) => format!("JUMP {}", tgt),
        Instruction::JumpIfFalse(tgt) => format!("JUMP_IF_FALSE {}", tgt),
        Instruction::Def(name) => format!("DEF {}", name),
        Instruction::Param(name) => format!("PARAM {}", name),
        Instruction::Call { name, arity } => format!("CALL {} {}", name, arity),
        Instruction::Return => "RETURN".to_string(),
        Instruction::CallBuiltin(b) => format!("CALL_BUILTIN {}", b.tag()),
        Instruction::Pop => "POP".to_string(),
        Instruction::Halt => "HALT".to_string(),
    }
}

/// Render a program as the canonical listing, one instruction per line.
pub fn to_listing(program: &Program) -> String {
    let mut out = String::new();
    for instr in &program.code {
        out.push_str(&format_instruction(instr));
        out.push('\n');
    }
    out
}

fn parse_word_operand(operand: &str, line_no: usize) -> Result<String> {
    let inner = operand
        .strip_prefix('"')
        .ok_or_else(|| Error::with_span(ErrorKind::Syntax, "Expected quoted word", line_no, 1))?;
    let mut out = String::new();
    let mut chars = inner.chars();
    loop {
        match chars.next() {
            Some('"') => {
                if chars.next().is_some() {
                    return Err(Error::with_span(
                        ErrorKind::Syntax,
                        "Trailing text after closing quote",
                        line_no,
                        1,
                    ));
                }
                return Ok(out);
            }
            Some('\\') => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => break,
            },
            Some(other) => out.push(other),
            None => break,
        }
    }
    Err(Error::with_span(
        ErrorKind::Syntax,
        "Unterminated quoted word",
        line_no,
        1,
    ))
}

fn parse_index(operand: &str, line_no: usize) -> Result<usize> {
    operand.parse().map_err(|_| {
        Error::with_span(
            ErrorKind::Syntax,
            format!("Expected instruction index, got '{}'", operand),
            line_no,
            1,
        )
    })
}

fn parse_instruction(line: &str, line_no: usize) -> Result<Instruction> {
    let line = line.trim();
    let (opcode, operand) = match line.split_once(char::is_whitespace) {
        Some((op, rest)) => (op, rest.trim()),
        None => (line, ""),
    };
    let need_operand = |what: &str| -> Result<()> {
        if operand.is_empty() {
            Err(Error::with_span(
                ErrorKind::Syntax,
                format!("{} requires {}", opcode, what),
                line_no,
                1,
            ))
        } else {
            Ok(())
        }
    };
    let instr = match opcode {
        "PUSH" => {
            need_operand("an operand")?;
            if operand.starts_with('"') {
                Instruction::Push(Value::Word(parse_word_operand(operand, line_no)?))
            } else if operand == "true" {
                Instruction::Push(Value::Bool(true))
            } else if operand == "false" {
                Instruction::Push(Value::Bool(false))
            } else {
                let n: f64 = operand.parse().map_err(|_| {
                    Error::with_span(
                        ErrorKind::Syntax,
                        format!("Invalid PUSH operand '{}'", operand),
                        line_no,
                        1,
                    )
                })?;
                Instruction::Push(Value::Num(n))
            }
        }
        "LOAD" => {
            need_operand("a name")?;
            Instruction::Load(operand.to_string())
        }
        "STORE" => {
            need_operand("a name")?;
            Instruction::Store(operand.to_string())
        }
        "ADD" => Instruction::Add,
        "SUB" => Instruction::Sub,
        "MUL" => Instruction::Mul,
        "DIV" => Instruction::Div,
        "POW" => Instruction::Pow,
        "UMINUS" => Instruction::Neg,
        "AND" => Instruction::And,
        "OR" => Instruction::Or,
        "NOT" => Instruction::Not,
        "GT" => Instruction::Gt,
        "LT" => Instruction::Lt,
        "GTE" => Instruction::Gte,
        "LTE" => Instruction::Lte,
        "EQ" => Instruction::Eq,
        "NEQ" => Instruction::Neq,
        "JUMP" => {
            need_operand("a target index")?;
            Instruction::Jump(parse_index(operand, line_no)?)
        }
        "JUMP_IF_FALSE" => {
            need_operand("a target index")?;
            Instruction::JumpIfFalse(parse_index(operand, line_no)?)
        }
        "DEF" => {
            need_operand("a name")?;
            Instruction::Def(operand.to_string())
        }
        "PARAM" => {
            need_operand("a name")?;
            Instruction::Param(operand.to_string())
        }
        "CALL" => {
            need_operand("a name and an arity")?;
            let (name, arity) = operand.split_once(char::is_whitespace).ok_or_else(|| {
                Error::with_span(
                    ErrorKind::Syntax,
                    "CALL requires a name and an arity",
                    line_no,
                    1,
                )
            })?;
            Instruction::Call {
                name: name.to_string(),
                arity: parse_index(arity.trim(), line_no)?,
            }
        }
        "RETURN" => Instruction::Return,
        "CALL_BUILTIN" => {
            need_operand("a builtin tag")?;
            let b = Builtin::from_tag(operand).ok_or_else(|| {
                Error::with_span(
                    ErrorKind::Syntax,
                    format!("Unknown builtin '{}'", operand),
                    line_no,
                    1,
                )
            })?;
            Instruction::CallBuiltin(b)
        }
        "POP" => Instruction::Pop,
        "HALT" => Instruction::Halt,
        other => {
            return Err(Error::with_span(
                ErrorKind::Syntax,
                format!("Unknown opcode '{}'", other),
                line_no,
                1,
            ));
        }
    };
    Ok(instr)
}

/// Rebuild the procedure table from the instruction stream. Every `DEF`
/// must be followed by its guard jump; the parameters are the consecutive
/// `PARAM` instructions at the start of the body.
fn rebuild_procs(code: &[Instruction]) -> Result<HashMap<String, Procedure>> {
    let mut procs = HashMap::new();
    for (i, instr) in code.iter().enumerate() {
        let Instruction::Def(name) = instr else {
            continue;
        };
        let guard = match code.get(i + 1) {
            Some(Instruction::Jump(tgt)) => *tgt,
            _ => {
                return Err(Error::with_span(
                    ErrorKind::Syntax,
                    format!("DEF {} is not followed by a guard JUMP", name),
                    i + 1,
                    1,
                ));
            }
        };
        let body_start = i + 2;
        if guard < body_start || guard > code.len() {
            return Err(Error::with_span(
                ErrorKind::Syntax,
                format!("DEF {} has an out-of-range guard target {}", name, guard),
                i + 1,
                1,
            ));
        }
        let mut params = Vec::new();
        let mut j = body_start;
        while let Some(Instruction::Param(p)) = code.get(j) {
            params.push(p.clone());
            j += 1;
        }
        procs.insert(
            name.clone(),
            Procedure {
                name: name.clone(),
                params,
                body: body_start..guard,
            },
        );
    }
    Ok(procs)
}

/// Parse a canonical listing back into a [`Program`]. Blank lines are
/// ignored; anything else must be a valid `OPCODE[ OPERAND]` line.
pub fn parse_listing(text: &str) -> Result<Program> {
    let mut code = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        code.push(parse_instruction(line, idx + 1)?);
    }
    let procs = rebuild_procs(&code)?;
    Ok(Program { code, procs })
}
