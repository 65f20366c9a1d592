//! Bytecode IR for the Tortue turtle-graphics language.
//!
//! This crate defines a simple stack-based bytecode, a program container
//! with its procedure table, the runtime value representation, and the
//! canonical one-instruction-per-line listing codec.

pub mod builtin;
pub mod instruction;
pub mod listing;
pub mod program;
pub mod value;

pub use builtin::Builtin;
pub use instruction::Instruction;
pub use listing::{parse_listing, to_listing};
pub use program::{Procedure, Program};
pub use value::{format_number, Value};
