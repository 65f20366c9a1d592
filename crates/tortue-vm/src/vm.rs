//! Tortue VM core.
//!
//! Fetch/dispatch over a flat instruction array: the pc advances by one
//! unless a jump sets it or a call transfers control into a procedure
//! body. Calls push a frame holding the return pc and a snapshot of the
//! whole environment; `RETURN` pops the frame and reinstalls the snapshot,
//! which is the entire scoping model.

use std::io::Write;

use rand::Rng;

use tortue_bytecode::{format_number, Builtin, Instruction, Program, Value};
use tortue_syntax::error::{error, Error, ErrorKind, Result};

use crate::env::{Binding, Env};
use crate::turtle::TurtleSink;

struct Frame {
    return_pc: usize,
    saved_env: Env,
}

pub struct Vm<S, W> {
    stack: Vec<Value>,
    env: Env,
    sink: S,
    out: W,
}

impl<S: TurtleSink, W: Write> Vm<S, W> {
    pub fn new(sink: S, out: W) -> Self {
        Self {
            stack: Vec::new(),
            env: Env::new(),
            sink,
            out,
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_parts(self) -> (S, W) {
        (self.sink, self.out)
    }

    /// Discard operand-stack residue. A failed batch may leave operands
    /// behind; the REPL clears them before running the next input.
    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    /// Execute a program from its first instruction.
    pub fn run(&mut self, program: &Program) -> Result<()> {
        self.run_from(program, 0)
    }

    /// Execute a program starting at `entry`. The REPL appends each input
    /// to one growing program and resumes at the start of the new batch.
    pub fn run_from(&mut self, program: &Program, entry: usize) -> Result<()> {
        let mut frames: Vec<Frame> = Vec::new();
        let mut pc = entry;
        while pc < program.code.len() {
            let instr = &program.code[pc];
            // default pc increment; jumps and calls override
            pc += 1;
            match instr {
                Instruction::Push(v) => self.stack.push(v.clone()),
                Instruction::Load(name) => match self.env.get(name) {
                    Some(Binding::Value(v)) => self.stack.push(v.clone()),
                    Some(Binding::Proc(_)) => {
                        return error(
                            ErrorKind::Type,
                            format!("'{}' names a procedure, not a value", name),
                        );
                    }
                    None => {
                        return error(
                            ErrorKind::UndefinedVariable,
                            format!("Undefined variable '{}'", name),
                        );
                    }
                },
                Instruction::Store(name) => {
                    let v = self.pop("STORE")?;
                    self.env.set_value(name.clone(), v);
                }
                Instruction::Add => self.num_binop("add", |a, b| a + b)?,
                Instruction::Sub => self.num_binop("subtract", |a, b| a - b)?,
                Instruction::Mul => self.num_binop("multiply", |a, b| a * b)?,
                Instruction::Div => {
                    let b = self.pop_num("divide")?;
                    let a = self.pop_num("divide")?;
                    if b == 0.0 {
                        return error(
                            ErrorKind::DivisionByZero,
                            format!("division of {} by zero", format_number(a)),
                        );
                    }
                    self.stack.push(Value::Num(a / b));
                }
                Instruction::Pow => self.num_binop("raise", |a, b| a.powf(b))?,
                Instruction::Neg => {
                    let n = self.pop_num("negate")?;
                    self.stack.push(Value::Num(-n));
                }
                Instruction::And => self.bool_binop(|a, b| a && b)?,
                Instruction::Or => self.bool_binop(|a, b| a || b)?,
                Instruction::Not => {
                    let b = self.pop_bool("not")?;
                    self.stack.push(Value::Bool(!b));
                }
                Instruction::Gt => self.cmp_binop(">", |a, b| a > b)?,
                Instruction::Lt => self.cmp_binop("<", |a, b| a < b)?,
                Instruction::Gte => self.cmp_binop(">=", |a, b| a >= b)?,
                Instruction::Lte => self.cmp_binop("<=", |a, b| a <= b)?,
                Instruction::Eq => {
                    let eq = self.pop_same_kind("==")?;
                    self.stack.push(Value::Bool(eq));
                }
                Instruction::Neq => {
                    let eq = self.pop_same_kind("!=")?;
                    self.stack.push(Value::Bool(!eq));
                }
                Instruction::Jump(tgt) => {
                    pc = *tgt;
                }
                Instruction::JumpIfFalse(tgt) => match self.pop("JUMP_IF_FALSE")? {
                    Value::Bool(false) => pc = *tgt,
                    Value::Bool(true) => (),
                    other => {
                        return error(
                            ErrorKind::Type,
                            format!("condition must be a boolean, got {}", other.kind_name()),
                        );
                    }
                },
                Instruction::Def(name) => match program.procs.get(name) {
                    Some(proc) => self.env.define_proc(proc.clone()),
                    None => {
                        return error(
                            ErrorKind::Internal,
                            format!("DEF of unknown procedure '{}'", name),
                        );
                    }
                },
                Instruction::Param(_) => (),
                Instruction::Call { name, arity } => {
                    let proc = match self.env.get(name) {
                        Some(Binding::Proc(p)) => p.clone(),
                        Some(Binding::Value(_)) => {
                            return error(
                                ErrorKind::UndeclaredProcedure,
                                format!("'{}' is not a procedure", name),
                            );
                        }
                        None => {
                            return error(
                                ErrorKind::UndeclaredProcedure,
                                format!("Undeclared procedure '{}'", name),
                            );
                        }
                    };
                    // the call aborts before any pop or bind on a mismatch
                    if proc.params.len() != *arity {
                        return error(
                            ErrorKind::ArityMismatch,
                            format!(
                                "Procedure '{}' expected {} arguments, got {}",
                                name,
                                proc.params.len(),
                                arity
                            ),
                        );
                    }
                    if self.stack.len() < *arity {
                        return error(ErrorKind::Internal, "stack underflow in CALL");
                    }
                    let start = self.stack.len() - arity;
                    let args: Vec<Value> = self.stack.drain(start..).collect();
                    let saved = self.env.snapshot();
                    for (p, v) in proc.params.iter().zip(args) {
                        self.env.set_value(p.clone(), v);
                    }
                    frames.push(Frame {
                        return_pc: pc,
                        saved_env: saved,
                    });
                    pc = proc.body.start;
                }
                Instruction::Return => match frames.pop() {
                    Some(frame) => {
                        self.env.restore(frame.saved_env);
                        pc = frame.return_pc;
                    }
                    None => {
                        return error(ErrorKind::Internal, "RETURN outside of a procedure call");
                    }
                },
                Instruction::CallBuiltin(b) => self.builtin(*b)?,
                Instruction::Pop => {
                    let _ = self.stack.pop();
                }
                Instruction::Halt => break,
            }
        }
        Ok(())
    }

    fn builtin(&mut self, b: Builtin) -> Result<()> {
        match b {
            Builtin::Forward => {
                let n = self.pop_num("forward")?;
                self.sink.forward(n);
            }
            Builtin::Back => {
                let n = self.pop_num("back")?;
                self.sink.back(n);
            }
            Builtin::Right => {
                let n = self.pop_num("right")?;
                self.sink.right(n);
            }
            Builtin::Left => {
                let n = self.pop_num("left")?;
                self.sink.left(n);
            }
            Builtin::Heading => {
                let n = self.pop_num("heading")?;
                self.sink.heading(n);
            }
            Builtin::SetXy => {
                let y = self.pop_num("setxy")?;
                let x = self.pop_num("setxy")?;
                self.sink.set_xy(x, y);
            }
            Builtin::PenUp => self.sink.pen_up(),
            Builtin::PenDown => self.sink.pen_down(),
            Builtin::Home => self.sink.home(),
            Builtin::WipeClean => self.sink.wipe_clean(),
            Builtin::Reset => self.sink.reset(),
            Builtin::XCor => self.stack.push(Value::Num(self.sink.xcor())),
            Builtin::YCor => self.stack.push(Value::Num(self.sink.ycor())),
            Builtin::TypeIn => {
                let n = self.pop_num("typein")?;
                self.sink.type_in(n);
            }
            Builtin::Sqrt => {
                let n = self.pop_num("sqrt")?;
                if n < 0.0 {
                    return error(
                        ErrorKind::Domain,
                        format!("sqrt of negative number {}", format_number(n)),
                    );
                }
                self.stack.push(Value::Num(n.sqrt()));
            }
            Builtin::Random => {
                let n = self.pop_num("random")?;
                let bound = n.trunc() as i64;
                if bound < 1 {
                    return error(
                        ErrorKind::InvalidRange,
                        format!("random bound must be positive, got {}", format_number(n)),
                    );
                }
                let v = rand::thread_rng().gen_range(0..bound);
                self.stack.push(Value::Num(v as f64));
            }
            Builtin::Print => {
                let v = self.pop("print")?;
                writeln!(self.out, "{}", v)
                    .map_err(|e| Error::new(ErrorKind::Internal, format!("IO error: {}", e)))?;
            }
        }
        Ok(())
    }

    fn pop(&mut self, ctx: &str) -> Result<Value> {
        self.stack
            .pop()
            .ok_or_else(|| Error::new(ErrorKind::Internal, format!("stack underflow in {}", ctx)))
    }

    fn pop_num(&mut self, ctx: &str) -> Result<f64> {
        match self.pop(ctx)? {
            Value::Num(n) => Ok(n),
            other => error(
                ErrorKind::Type,
                format!("{} expects a number, got {}", ctx, other.kind_name()),
            ),
        }
    }

    fn pop_bool(&mut self, ctx: &str) -> Result<bool> {
        match self.pop(ctx)? {
            Value::Bool(b) => Ok(b),
            other => error(
                ErrorKind::Type,
                format!("{} expects a boolean, got {}", ctx, other.kind_name()),
            ),
        }
    }

    fn num_binop(&mut self, verb: &str, f: impl Fn(f64, f64) -> f64) -> Result<()> {
        let b = self.pop(verb)?;
        let a = self.pop(verb)?;
        match (a, b) {
            (Value::Num(x), Value::Num(y)) => {
                self.stack.push(Value::Num(f(x, y)));
                Ok(())
            }
            (x, y) => error(
                ErrorKind::Type,
                format!("Cannot {} {} and {}", verb, x.kind_name(), y.kind_name()),
            ),
        }
    }

    fn bool_binop(&mut self, f: impl Fn(bool, bool) -> bool) -> Result<()> {
        let b = self.pop_bool("logic")?;
        let a = self.pop_bool("logic")?;
        self.stack.push(Value::Bool(f(a, b)));
        Ok(())
    }

    fn cmp_binop(&mut self, op: &str, f: impl Fn(f64, f64) -> bool) -> Result<()> {
        let b = self.pop(op)?;
        let a = self.pop(op)?;
        match (a, b) {
            (Value::Num(x), Value::Num(y)) => {
                self.stack.push(Value::Bool(f(x, y)));
                Ok(())
            }
            (x, y) => error(
                ErrorKind::Type,
                format!("Cannot compare {} and {} with {}", x.kind_name(), y.kind_name(), op),
            ),
        }
    }

    fn pop_same_kind(&mut self, op: &str) -> Result<bool> {
        let b = self.pop(op)?;
        let a = self.pop(op)?;
        match (&a, &b) {
            (Value::Num(_), Value::Num(_))
            | (Value::Word(_), Value::Word(_))
            | (Value::Bool(_), Value::Bool(_)) => Ok(a == b),
            _ => error(
                ErrorKind::Type,
                format!("Cannot compare {} and {} with {}", a.kind_name(), b.kind_name(), op),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turtle::{RecordingTurtle, TurtleCmd};
    use tortue_bytecode::{parse_listing, to_listing};
    use tortue_compiler::Compiler;
    use tortue_lexer::Lexer;
    use tortue_parser::Parser;

    fn compile_src(input: &str) -> Program {
        let (tokens, diagnostics) = Lexer::new(input).tokenize();
        assert!(diagnostics.is_empty(), "Lexing should succeed");
        let block = Parser::new(tokens)
            .parse_program()
            .expect("Parsing should succeed");
        Compiler::compile(&block).expect("Compilation should succeed")
    }

    fn run_program(program: &Program) -> Result<(Vec<TurtleCmd>, String)> {
        let mut vm = Vm::new(RecordingTurtle::new(), Vec::new());
        vm.run(program)?;
        let (sink, out) = vm.into_parts();
        Ok((
            sink.commands().to_vec(),
            String::from_utf8(out).expect("print output is UTF-8"),
        ))
    }

    fn run_src(input: &str) -> (Vec<TurtleCmd>, String) {
        run_program(&compile_src(input)).expect("Execution should succeed")
    }

    fn run_src_err(input: &str) -> Error {
        run_program(&compile_src(input)).expect_err("Execution should fail")
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let (_, out) = run_src("write 2 + 3 * 4");
        assert_eq!(out, "14\n");
    }

    #[test]
    fn power_binds_tighter_than_unary_minus() {
        let (_, out) = run_src("write -2 ^ 2");
        assert_eq!(out, "-4\n");
    }

    #[test]
    fn writes_words_and_numbers() {
        let (_, out) = run_src("write \"hello\" write 2.5 write 4");
        assert_eq!(out, "hello\n2.5\n4\n");
    }

    #[test]
    fn turtle_commands_arrive_in_source_order() {
        let (cmds, _) = run_src("penup forward 10 right 90 forward 5 pendown home");
        assert_eq!(
            cmds,
            vec![
                TurtleCmd::PenUp,
                TurtleCmd::Forward(10.0),
                TurtleCmd::Right(90.0),
                TurtleCmd::Forward(5.0),
                TurtleCmd::PenDown,
                TurtleCmd::Home,
            ]
        );
    }

    #[test]
    fn setxy_pops_y_then_x() {
        let (cmds, _) = run_src("setxy{3, 4}");
        assert_eq!(cmds, vec![TurtleCmd::SetXy(3.0, 4.0)]);
    }

    #[test]
    fn xcor_reads_the_sink_position() {
        let (_, out) = run_src("setxy{3, 4} write xcor + 1 write ycor");
        assert_eq!(out, "4\n4\n");
    }

    #[test]
    fn square_procedure_prints_25() {
        let (_, out) = run_src("to square :x write :x * :x end square 5");
        assert_eq!(out, "25\n");
    }

    #[test]
    fn arity_mismatch_aborts_and_leaves_env_unchanged() {
        let program = compile_src("to square :x write :x * :x end square 1 2");
        let mut vm = Vm::new(RecordingTurtle::new(), Vec::new());
        let err = vm.run(&program).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        // no parameter binding leaked out of the aborted call
        assert!(vm.env().get("x").is_none());
        // the procedure itself is still defined
        assert!(matches!(vm.env().get("square"), Some(Binding::Proc(_))));
    }

    #[test]
    fn recursion_counts_down_and_restores_the_env() {
        let program =
            compile_src("to count :n if (:n > 0) then write :n count :n - 1 end end count 3");
        let mut vm = Vm::new(RecordingTurtle::new(), Vec::new());
        vm.run(&program).unwrap();
        assert!(vm.env().get("n").is_none());
        let (_, out) = vm.into_parts();
        assert_eq!(String::from_utf8(out).unwrap(), "3\n2\n1\n");
    }

    #[test]
    fn mutations_inside_a_call_are_invisible_to_the_caller() {
        let program = compile_src("x = 1 to clobber :n x = 99 y = 2 end clobber 5 write :x");
        let mut vm = Vm::new(RecordingTurtle::new(), Vec::new());
        vm.run(&program).unwrap();
        assert!(vm.env().get("y").is_none());
        let (_, out) = vm.into_parts();
        assert_eq!(String::from_utf8(out).unwrap(), "1\n");
    }

    #[test]
    fn procedures_defined_inside_a_call_vanish_on_return() {
        let src = "to outer to inner penup end inner end outer inner";
        let program = compile_src(src);
        let mut vm = Vm::new(RecordingTurtle::new(), Vec::new());
        let err = vm.run(&program).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndeclaredProcedure);
        // the inner call ran once while the definition was live
        assert_eq!(vm.sink().commands(), &[TurtleCmd::PenUp]);
    }

    #[test]
    fn while_loop_prints_zero_through_four() {
        let (_, out) = run_src("i = 0 while (:i < 5) write :i; :i = :i + 1 end");
        assert_eq!(out, "0\n1\n2\n3\n4\n");
    }

    #[test]
    fn while_loop_leaves_the_counter_at_the_exit_value() {
        let program = compile_src("i = 0 while (:i < 5) :i = :i + 1 end");
        let mut vm = Vm::new(RecordingTurtle::new(), Vec::new());
        vm.run(&program).unwrap();
        assert_eq!(
            vm.env().get("i"),
            Some(&Binding::Value(Value::Num(5.0)))
        );
    }

    #[test]
    fn random_yields_integers_below_the_bound() {
        for _ in 0..50 {
            let program = compile_src("r = random 10");
            let mut vm = Vm::new(RecordingTurtle::new(), Vec::new());
            vm.run(&program).unwrap();
            let Some(Binding::Value(Value::Num(r))) = vm.env().get("r") else {
                panic!("expected a numeric binding for r");
            };
            assert_eq!(*r, r.trunc());
            assert!((0.0..10.0).contains(r));
        }
    }

    #[test]
    fn random_with_zero_bound_is_an_invalid_range() {
        let err = run_src_err("r = random 0");
        assert_eq!(err.kind, ErrorKind::InvalidRange);
    }

    #[test]
    fn sqrt_of_a_negative_number_is_a_domain_error() {
        let (_, out) = run_src("write sqrt 16");
        assert_eq!(out, "4\n");
        let err = run_src_err("write sqrt -9");
        assert_eq!(err.kind, ErrorKind::Domain);
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let err = run_src_err("write 1 / 0");
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
    }

    #[test]
    fn adding_a_number_and_a_word_is_a_type_error() {
        let err = run_src_err("write 1 + \"x\"");
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn a_non_boolean_condition_is_a_type_error() {
        let err = run_src_err("if (1 + 1) then penup end");
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn comparing_mixed_kinds_is_a_type_error() {
        let err = run_src_err("if (1 == \"one\") then penup end");
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn loading_an_unbound_name_is_an_undefined_variable() {
        let err = run_src_err("write :nope");
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
    }

    #[test]
    fn calling_an_unknown_name_is_an_undeclared_procedure() {
        let err = run_src_err("frob 1");
        assert_eq!(err.kind, ErrorKind::UndeclaredProcedure);
    }

    #[test]
    fn logical_operators_require_booleans_and_work() {
        let (cmds, _) = run_src("if (true and not false) then penup end");
        assert_eq!(cmds, vec![TurtleCmd::PenUp]);
        let err = run_src_err("if (true and 1) then penup end");
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn else_branch_runs_when_the_condition_is_false() {
        let (cmds, _) = run_src("if (1 > 2) then penup else pendown end");
        assert_eq!(cmds, vec![TurtleCmd::PenDown]);
    }

    #[test]
    fn stack_underflow_is_an_internal_error() {
        let program = Program {
            code: vec![Instruction::Add],
            procs: Default::default(),
        };
        let mut vm = Vm::new(RecordingTurtle::new(), Vec::new());
        let err = vm.run(&program).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert!(err.msg.contains("stack underflow"));
    }

    #[test]
    fn listing_round_trip_preserves_observable_behavior() {
        let src = "to square :x forward :x right 90 end \
                   i = 0 while (:i < 4) square 20 :i = :i + 1 end write \"done\"";
        let program = compile_src(src);
        let (cmds, out) = run_program(&program).unwrap();

        let reparsed = parse_listing(&to_listing(&program)).unwrap();
        let (cmds2, out2) = run_program(&reparsed).unwrap();

        assert_eq!(cmds, cmds2);
        assert_eq!(out, out2);
        assert!(!cmds.is_empty());
    }

    #[test]
    fn repl_style_batches_share_one_environment() {
        let parse = |s: &str| {
            let (tokens, _) = Lexer::new(s).tokenize();
            Parser::new(tokens).parse_program().unwrap()
        };
        let mut compiler = Compiler::new();
        let mut vm = Vm::new(RecordingTurtle::new(), Vec::new());

        let entry = compiler
            .compile_block(&parse("to square :x write :x * :x end"))
            .unwrap();
        vm.run_from(compiler.program(), entry).unwrap();

        let entry = compiler.compile_block(&parse("square 6")).unwrap();
        vm.run_from(compiler.program(), entry).unwrap();

        let (_, out) = vm.into_parts();
        assert_eq!(String::from_utf8(out).unwrap(), "36\n");
    }
}
