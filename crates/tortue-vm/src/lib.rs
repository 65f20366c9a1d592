//! Tortue VM: executes Tortue bytecode against a mutable environment,
//! forwarding turtle side effects to an external [`TurtleSink`].

pub mod env;
pub mod turtle;
pub mod vm;

pub use env::{Binding, Env};
pub use turtle::{RecordingTurtle, TurtleCmd, TurtleSink};
pub use vm::Vm;
