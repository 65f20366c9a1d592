//! Error handling types and utilities for the Tortue toolchain.
//!
//! Every component reports failures through one structured [`Error`] type:
//! a category tag, a human-readable message and, when the failure can be
//! located in source text, a 1-based line/column span.
//!
//! Lexical and syntax errors are recoverable: the lexer skips the offending
//! character and the parser skips to the next statement boundary, so a
//! single run can report several diagnostics. Runtime errors are fatal to
//! the current execution.
//!
//! # Examples
//!
//! ## Basic error creation
//!
//! ```rust
//! use tortue_syntax::error::{Error, ErrorKind, Result, error};
//!
//! // A runtime error without a source location
//! let type_err = Error::new(ErrorKind::Type, "forward expects a number");
//!
//! // A parse error pinned to a token
//! let located = Error::with_span(ErrorKind::Syntax, "Expected 'end'", 10, 5);
//!
//! // The convenience function
//! fn might_fail() -> Result<f64> {
//!     error(ErrorKind::DivisionByZero, "division by zero")
//! }
//! ```
//!
//! ## Error propagation
//!
//! ```rust
//! use tortue_syntax::error::{Error, ErrorKind, Result, error};
//!
//! fn bound_check(n: f64) -> Result<f64> {
//!     if n <= 0.0 {
//!         error(ErrorKind::InvalidRange, format!("random bound must be positive, got {}", n))
//!     } else {
//!         Ok(n)
//!     }
//! }
//! ```

use std::fmt;

/// Categories of failure across the toolchain.
///
/// The first two are recoverable front-end diagnostics; the rest abort the
/// current execution. `Internal` marks conditions the compiler contract
/// rules out (malformed bytecode, operand-stack underflow) and signals a
/// toolchain bug rather than a user error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Illegal character in the source; the lexer skips it and continues
    Lexical,
    /// Malformed statement; the parser resumes at the next statement
    Syntax,
    /// `LOAD` of a name with no binding
    UndefinedVariable,
    /// `CALL` of a name that is absent or not bound to a procedure
    UndeclaredProcedure,
    /// Call-site argument count differs from the declared parameter count
    ArityMismatch,
    /// Operator or builtin applied to incompatible value kinds
    Type,
    /// `sqrt` of a negative number
    Domain,
    /// `random` with a non-positive bound
    InvalidRange,
    /// Division by zero
    DivisionByZero,
    /// Invariant violation inside the toolchain itself
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Lexical => "lexical error",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::UndefinedVariable => "undefined variable",
            ErrorKind::UndeclaredProcedure => "undeclared procedure",
            ErrorKind::ArityMismatch => "arity mismatch",
            ErrorKind::Type => "type error",
            ErrorKind::Domain => "domain error",
            ErrorKind::InvalidRange => "invalid range",
            ErrorKind::DivisionByZero => "division by zero",
            ErrorKind::Internal => "internal error",
        };
        write!(f, "{}", name)
    }
}

/// An error that occurred while lexing, parsing, compiling or running a
/// Tortue program.
///
/// # Examples
///
/// ```rust
/// use tortue_syntax::{Error, ErrorKind};
///
/// let err = Error::with_span(ErrorKind::Syntax, "Expected 'end'", 15, 8);
/// assert_eq!(format!("{}", err), "syntax error: Expected 'end' at 15:8");
/// ```
#[derive(Debug, Clone)]
pub struct Error {
    /// Failure category
    pub kind: ErrorKind,

    /// Human-readable error message
    pub msg: String,

    /// Optional line number in the source file (1-based)
    pub line: Option<usize>,

    /// Optional column number in the source file (1-based)
    pub col: Option<usize>,
}

impl Error {
    /// Creates a new error with the given category and message and no
    /// source location. Suitable for runtime errors.
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
            line: None,
            col: None,
        }
    }

    /// Creates a new error pinned to a source location. Used for lexical
    /// and syntax diagnostics.
    pub fn with_span(kind: ErrorKind, msg: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            msg: msg.into(),
            line: Some(line),
            col: Some(col),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(l), Some(c)) = (self.line, self.col) {
            write!(f, "{}: {} at {}:{}", self.kind, self.msg, l, c)
        } else {
            write!(f, "{}: {}", self.kind, self.msg)
        }
    }
}

impl std::error::Error for Error {}

/// A specialized `Result` type for Tortue operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience function to create an error result.
///
/// Shorthand for `Err(Error::new(kind, msg))`.
///
/// # Examples
///
/// ```rust
/// use tortue_syntax::error::{ErrorKind, Result, error};
///
/// fn check_divisor(d: f64) -> Result<()> {
///     if d == 0.0 {
///         error(ErrorKind::DivisionByZero, "division by zero")
///     } else {
///         Ok(())
///     }
/// }
/// ```
pub fn error<T>(kind: ErrorKind, msg: impl Into<String>) -> Result<T> {
    Err(Error::new(kind, msg))
}

/// Convenience function to create an error result with a source location.
///
/// Shorthand for `Err(Error::with_span(kind, msg, line, col))`.
pub fn error_at<T>(kind: ErrorKind, line: usize, col: usize, msg: impl Into<String>) -> Result<T> {
    Err(Error::with_span(kind, msg, line, col))
}
