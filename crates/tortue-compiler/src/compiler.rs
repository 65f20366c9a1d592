//! Tortue code generator: AST -> bytecode.
//!
//! Expressions lower in post-order and are stack-neutral except for the one
//! value they leave behind. Structured control flow becomes explicit
//! `JUMP` / `JUMP_IF_FALSE` instructions: a forward jump is emitted with a
//! placeholder operand and patched once the skipped region has been
//! compiled, a loop's backward jump targets the recorded loop top directly.
//! Procedure bodies are emitted inline, guarded by a jump over them, and
//! their table entry's body range is patched when the end index is known.

use tortue_bytecode::{Builtin, Instruction as BC, Procedure, Program, Value};
use tortue_syntax::ast::*;
use tortue_syntax::error::{error, ErrorKind, Result};

pub struct Compiler {
    program: Program,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            program: Program::default(),
        }
    }

    /// Compile a whole program in one shot.
    pub fn compile(block: &Block) -> Result<Program> {
        let mut c = Compiler::new();
        c.compile_block(block)?;
        Ok(c.finish())
    }

    /// Append one top-level block to the growing program, terminated by
    /// `HALT`. Returns the index of the first appended instruction, which
    /// is where execution of this batch starts (the REPL resumes here).
    pub fn compile_block(&mut self, block: &Block) -> Result<usize> {
        let entry = self.here();
        for stmt in &block.stmts {
            self.emit_stmt(stmt)?;
        }
        self.emit(BC::Halt);
        Ok(entry)
    }

    /// The program compiled so far.
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn finish(self) -> Program {
        self.program
    }

    fn emit(&mut self, i: BC) -> usize {
        self.program.code.push(i);
        self.program.code.len() - 1
    }

    fn here(&self) -> usize {
        self.program.code.len()
    }

    fn patch_to_here(&mut self, at: usize) -> Result<()> {
        let tgt = self.here();
        match &mut self.program.code[at] {
            BC::Jump(x) | BC::JumpIfFalse(x) => {
                *x = tgt;
                Ok(())
            }
            other => error(ErrorKind::Internal, format!("cannot patch at {:?}", other)),
        }
    }

    fn emit_stmt(&mut self, s: &Stmt) -> Result<()> {
        match s {
            Stmt::Turtle { op, args } => {
                let b = turtle_builtin(*op);
                for a in args {
                    self.emit_expr(a)?;
                }
                self.emit(BC::CallBuiltin(b));
                // a query used as a bare statement must not leave its value
                if b.pushes_result() {
                    self.emit(BC::Pop);
                }
                Ok(())
            }
            Stmt::Assign { name, expr } => {
                self.emit_expr(expr)?;
                self.emit(BC::Store(name.clone()));
                Ok(())
            }
            Stmt::Write(e) => {
                self.emit_expr(e)?;
                self.emit(BC::CallBuiltin(Builtin::Print));
                Ok(())
            }
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                self.emit_expr(cond)?;
                let jf_at = self.emit(BC::JumpIfFalse(0));
                for s in &then_block.stmts {
                    self.emit_stmt(s)?;
                }
                match else_block {
                    Some(eb) => {
                        let jend_at = self.emit(BC::Jump(0));
                        self.patch_to_here(jf_at)?; // else starts here
                        for s in &eb.stmts {
                            self.emit_stmt(s)?;
                        }
                        self.patch_to_here(jend_at)?;
                    }
                    None => {
                        self.patch_to_here(jf_at)?;
                    }
                }
                Ok(())
            }
            Stmt::While { cond, body } => {
                let loop_top = self.here();
                self.emit_expr(cond)?;
                let jf_at = self.emit(BC::JumpIfFalse(0));
                for s in &body.stmts {
                    self.emit_stmt(s)?;
                }
                // backward jump, target already known
                self.emit(BC::Jump(loop_top));
                self.patch_to_here(jf_at)?;
                Ok(())
            }
            Stmt::ProcDef { name, params, body } => {
                self.emit(BC::Def(name.clone()));
                let guard_at = self.emit(BC::Jump(0));
                let body_start = self.here();
                // placeholder range; patched once the body end is known
                self.program.procs.insert(
                    name.clone(),
                    Procedure {
                        name: name.clone(),
                        params: params.clone(),
                        body: body_start..body_start,
                    },
                );
                for p in params {
                    self.emit(BC::Param(p.clone()));
                }
                for s in &body.stmts {
                    self.emit_stmt(s)?;
                }
                self.emit(BC::Return);
                let body_end = self.here();
                match self.program.procs.get_mut(name) {
                    Some(proc) => proc.body = body_start..body_end,
                    None => {
                        return error(
                            ErrorKind::Internal,
                            format!("procedure '{}' vanished during compilation", name),
                        );
                    }
                }
                self.patch_to_here(guard_at)?;
                Ok(())
            }
            Stmt::ProcCall { name, args } => {
                for a in args {
                    self.emit_expr(a)?;
                }
                self.emit(BC::Call {
                    name: name.clone(),
                    arity: args.len(),
                });
                Ok(())
            }
        }
    }

    fn emit_expr(&mut self, e: &Expr) -> Result<()> {
        match e {
            Expr::Number(n) => {
                self.emit(BC::Push(Value::Num(*n)));
                Ok(())
            }
            Expr::Word(w) => {
                self.emit(BC::Push(Value::Word(w.clone())));
                Ok(())
            }
            Expr::Bool(b) => {
                self.emit(BC::Push(Value::Bool(*b)));
                Ok(())
            }
            Expr::Variable(name) => {
                self.emit(BC::Load(name.clone()));
                Ok(())
            }
            Expr::Binary(op, a, b) => {
                self.emit_expr(a)?;
                self.emit_expr(b)?;
                self.emit(match op {
                    BinOp::Add => BC::Add,
                    BinOp::Sub => BC::Sub,
                    BinOp::Mul => BC::Mul,
                    BinOp::Div => BC::Div,
                    BinOp::Pow => BC::Pow,
                });
                Ok(())
            }
            Expr::Unary(UnOp::Neg, a) => {
                self.emit_expr(a)?;
                self.emit(BC::Neg);
                Ok(())
            }
            Expr::Comparison(op, a, b) => {
                self.emit_expr(a)?;
                self.emit_expr(b)?;
                self.emit(match op {
                    CmpOp::Gt => BC::Gt,
                    CmpOp::Lt => BC::Lt,
                    CmpOp::Gte => BC::Gte,
                    CmpOp::Lte => BC::Lte,
                    CmpOp::Eq => BC::Eq,
                    CmpOp::Neq => BC::Neq,
                });
                Ok(())
            }
            Expr::Logical(op, operands) => {
                let expected = match op {
                    LogicOp::Not => 1,
                    LogicOp::And | LogicOp::Or => 2,
                };
                if operands.len() != expected {
                    return error(
                        ErrorKind::Internal,
                        format!("{:?} with {} operands", op, operands.len()),
                    );
                }
                for o in operands {
                    self.emit_expr(o)?;
                }
                self.emit(match op {
                    LogicOp::And => BC::And,
                    LogicOp::Or => BC::Or,
                    LogicOp::Not => BC::Not,
                });
                Ok(())
            }
            Expr::Builtin(b, args) => {
                for a in args {
                    self.emit_expr(a)?;
                }
                self.emit(BC::CallBuiltin(expr_builtin(*b)));
                Ok(())
            }
        }
    }
}

fn turtle_builtin(op: TurtleOp) -> Builtin {
    match op {
        TurtleOp::Forward => Builtin::Forward,
        TurtleOp::Back => Builtin::Back,
        TurtleOp::Right => Builtin::Right,
        TurtleOp::Left => Builtin::Left,
        TurtleOp::Heading => Builtin::Heading,
        TurtleOp::SetXy => Builtin::SetXy,
        TurtleOp::PenUp => Builtin::PenUp,
        TurtleOp::PenDown => Builtin::PenDown,
        TurtleOp::Home => Builtin::Home,
        TurtleOp::WipeClean => Builtin::WipeClean,
        TurtleOp::Reset => Builtin::Reset,
        TurtleOp::XCor => Builtin::XCor,
        TurtleOp::YCor => Builtin::YCor,
        TurtleOp::TypeIn => Builtin::TypeIn,
    }
}

fn expr_builtin(b: ExprBuiltin) -> Builtin {
    match b {
        ExprBuiltin::Sqrt => Builtin::Sqrt,
        ExprBuiltin::Random => Builtin::Random,
        ExprBuiltin::XCor => Builtin::XCor,
        ExprBuiltin::YCor => Builtin::YCor,
    }
}
