mod repl;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;

use tortue_bytecode::{parse_listing, to_listing, Program};
use tortue_compiler::Compiler;
use tortue_lexer::Lexer;
use tortue_parser::Parser as TortueParser;
use tortue_syntax::error::Error;
use tortue_vm::{RecordingTurtle, Vm};

#[derive(Parser)]
#[command(
    name = "tortue",
    version,
    about = "Compiler and stack VM for the Tortue turtle-graphics language"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a source file and emit the canonical bytecode listing
    Compile {
        /// Tortue source file
        file: PathBuf,

        /// Write the listing here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compile and execute a source file
    Run {
        /// Tortue source file (or a compiled listing with --listing)
        file: PathBuf,

        /// Treat the input as an already-compiled listing
        #[arg(long)]
        listing: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    match args.command {
        None => repl::start(),
        Some(Command::Compile { file, output }) => compile_command(&file, output.as_deref()),
        Some(Command::Run { file, listing }) => run_command(&file, listing),
    }
}

fn compile_command(file: &Path, output: Option<&Path>) -> ExitCode {
    let Some(src) = read_source(file) else {
        return ExitCode::FAILURE;
    };
    let Some(program) = front_end(&src) else {
        return ExitCode::FAILURE;
    };
    let listing = to_listing(&program);
    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, &listing) {
                report_io(&format!("Failed to write {}: {}", path.display(), e));
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        None => {
            print!("{}", listing);
            ExitCode::SUCCESS
        }
    }
}

fn run_command(file: &Path, listing: bool) -> ExitCode {
    let Some(text) = read_source(file) else {
        return ExitCode::FAILURE;
    };
    let program = if listing {
        match parse_listing(&text) {
            Ok(p) => p,
            Err(e) => {
                render_error(&text, &e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        match front_end(&text) {
            Some(p) => p,
            None => return ExitCode::FAILURE,
        }
    };

    let mut vm = Vm::new(RecordingTurtle::new(), io::stdout());
    if let Err(e) = vm.run(&program) {
        // the trace up to the failing instruction is still real
        print_trace(vm.sink_mut().take_commands());
        render_error(&text, &e);
        return ExitCode::FAILURE;
    }
    print_trace(vm.sink_mut().take_commands());
    ExitCode::SUCCESS
}

/// Lex, parse and compile a source string, rendering every diagnostic.
/// Lexical errors are recovered (the offending character is skipped), so
/// they are reported without stopping the pipeline; syntax errors are
/// batched per statement and abort it.
fn front_end(src: &str) -> Option<Program> {
    let (tokens, lex_diagnostics) = Lexer::new(src).tokenize();
    for d in &lex_diagnostics {
        render_error(src, d);
    }
    let block = match TortueParser::new(tokens).parse_program() {
        Ok(b) => b,
        Err(errs) => {
            for e in &errs {
                render_error(src, e);
            }
            return None;
        }
    };
    match Compiler::compile(&block) {
        Ok(p) => Some(p),
        Err(e) => {
            render_error(src, &e);
            None
        }
    }
}

fn read_source(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            report_io(&format!("Failed to read {}: {}", path.display(), e));
            None
        }
    }
}

fn report_io(msg: &str) {
    eprintln!("{}: {}", "error".red().bold(), msg.red());
}

fn print_trace(cmds: Vec<tortue_vm::TurtleCmd>) {
    for cmd in cmds {
        println!("{}", cmd);
    }
}

fn render_error(source: &str, err: &Error) {
    eprintln!("{}: {}", err.kind.to_string().red().bold(), err.msg.red());
    if let (Some(line), Some(col)) = (err.line, err.col) {
        eprintln!("  --> line {}, column {}", line, col);
        if let Some(src_line) = source.lines().nth(line - 1) {
            let gutter = format!("{:3} | ", line);
            eprintln!("     |");
            eprintln!("{}{}", gutter.bright_black(), src_line);

            let mut marker = String::new();
            marker.push_str(&" ".repeat(gutter.len()));
            if col > 1 {
                marker.push_str(&" ".repeat(col - 1));
            }
            marker.push('^');
            eprintln!("{}", marker.red());
            eprintln!("     |");
        }
    }
}
