//! The turtle sink capability consumed by the VM.
//!
//! The VM never draws; movement and pen-state effects are forwarded to
//! whatever implements [`TurtleSink`]. [`RecordingTurtle`] keeps the
//! ordered command trace (and enough position state to answer `xcor` /
//! `ycor`) for the CLI and for tests.

use std::fmt;

use tortue_bytecode::format_number;

/// External capability receiving turtle side effects.
pub trait TurtleSink {
    fn forward(&mut self, n: f64);
    fn back(&mut self, n: f64);
    fn right(&mut self, n: f64);
    fn left(&mut self, n: f64);
    fn heading(&mut self, n: f64);
    fn set_xy(&mut self, x: f64, y: f64);
    fn pen_up(&mut self);
    fn pen_down(&mut self);
    fn home(&mut self);
    fn wipe_clean(&mut self);
    fn reset(&mut self);
    fn xcor(&self) -> f64;
    fn ycor(&self) -> f64;
    fn type_in(&mut self, n: f64);
}

/// One observed turtle command.
#[derive(Debug, Clone, PartialEq)]
pub enum TurtleCmd {
    Forward(f64),
    Back(f64),
    Right(f64),
    Left(f64),
    Heading(f64),
    SetXy(f64, f64),
    PenUp,
    PenDown,
    Home,
    WipeClean,
    Reset,
    TypeIn(f64),
}

impl fmt::Display for TurtleCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurtleCmd::Forward(n) => write!(f, "forward {}", format_number(*n)),
            TurtleCmd::Back(n) => write!(f, "back {}", format_number(*n)),
            TurtleCmd::Right(n) => write!(f, "right {}", format_number(*n)),
            TurtleCmd::Left(n) => write!(f, "left {}", format_number(*n)),
            TurtleCmd::Heading(n) => write!(f, "heading {}", format_number(*n)),
            TurtleCmd::SetXy(x, y) => {
                write!(f, "setxy{{{}, {}}}", format_number(*x), format_number(*y))
            }
            TurtleCmd::PenUp => write!(f, "penup"),
            TurtleCmd::PenDown => write!(f, "pendown"),
            TurtleCmd::Home => write!(f, "home"),
            TurtleCmd::WipeClean => write!(f, "wipeclean"),
            TurtleCmd::Reset => write!(f, "clearscreen"),
            TurtleCmd::TypeIn(n) => write!(f, "typein {}", format_number(*n)),
        }
    }
}

/// Sink that records every command in order. Position follows Logo
/// convention: heading 0 points up, degrees grow clockwise.
#[derive(Debug, Default)]
pub struct RecordingTurtle {
    cmds: Vec<TurtleCmd>,
    x: f64,
    y: f64,
    heading: f64,
}

impl RecordingTurtle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ordered trace observed so far.
    pub fn commands(&self) -> &[TurtleCmd] {
        &self.cmds
    }

    /// Drain the trace, leaving position state intact. The REPL prints
    /// and clears the trace after each input.
    pub fn take_commands(&mut self) -> Vec<TurtleCmd> {
        std::mem::take(&mut self.cmds)
    }

    fn advance(&mut self, n: f64) {
        let rad = self.heading.to_radians();
        self.x += n * rad.sin();
        self.y += n * rad.cos();
    }
}

impl TurtleSink for RecordingTurtle {
    fn forward(&mut self, n: f64) {
        self.advance(n);
        self.cmds.push(TurtleCmd::Forward(n));
    }
    fn back(&mut self, n: f64) {
        self.advance(-n);
        self.cmds.push(TurtleCmd::Back(n));
    }
    fn right(&mut self, n: f64) {
        self.heading += n;
        self.cmds.push(TurtleCmd::Right(n));
    }
    fn left(&mut self, n: f64) {
        self.heading -= n;
        self.cmds.push(TurtleCmd::Left(n));
    }
    fn heading(&mut self, n: f64) {
        self.heading = n;
        self.cmds.push(TurtleCmd::Heading(n));
    }
    fn set_xy(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.cmds.push(TurtleCmd::SetXy(x, y));
    }
    fn pen_up(&mut self) {
        self.cmds.push(TurtleCmd::PenUp);
    }
    fn pen_down(&mut self) {
        self.cmds.push(TurtleCmd::PenDown);
    }
    fn home(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.heading = 0.0;
        self.cmds.push(TurtleCmd::Home);
    }
    fn wipe_clean(&mut self) {
        self.cmds.push(TurtleCmd::WipeClean);
    }
    fn reset(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.heading = 0.0;
        self.cmds.push(TurtleCmd::Reset);
    }
    fn xcor(&self) -> f64 {
        self.x
    }
    fn ycor(&self) -> f64 {
        self.y
    }
    fn type_in(&mut self, n: f64) {
        self.cmds.push(TurtleCmd::TypeIn(n));
    }
}
