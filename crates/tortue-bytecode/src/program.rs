//! Program container for Tortue bytecode.

use std::collections::HashMap;
use std::ops::Range;

use crate::instruction::Instruction;

/// A user-defined procedure. Created when its `DEF` executes, looked up by
/// `CALL`, never mutated after code generation completes.
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub name: String,
    /// Ordered parameter names; unique, no defaults
    pub params: Vec<String>,
    /// Body instruction range inside [`Program::code`], ending just past
    /// the body's `RETURN`
    pub body: Range<usize>,
}

/// An ordered, index-addressable instruction sequence plus the procedure
/// table produced at compile time. The index is the sole addressing mode
/// for jumps.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub code: Vec<Instruction>,
    pub procs: HashMap<String, Procedure>,
}
