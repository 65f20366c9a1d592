use std::io::{self, Write};
use std::process::ExitCode;

use owo_colors::OwoColorize;

use tortue_bytecode::to_listing;
use tortue_compiler::Compiler;
use tortue_lexer::Lexer;
use tortue_parser::Parser;
use tortue_syntax::error::Error;
use tortue_syntax::token::TokenKind;
use tortue_vm::{Binding, RecordingTurtle, Vm};

type ReplVm = Vm<RecordingTurtle, io::Stdout>;

pub fn start() -> ExitCode {
    println!(
        "{}",
        "Tortue REPL. Type :help for help, 'exit' to leave.".bold().green()
    );

    let mut compiler = Compiler::new();
    let mut vm: ReplVm = Vm::new(RecordingTurtle::new(), io::stdout());

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() {
            "tortue> ".cyan().to_string()
        } else {
            "   ...> ".cyan().to_string()
        };
        print!("{}", prompt);
        let _ = io::stdout().flush();

        let mut line = String::new();
        let n = match io::stdin().read_line(&mut line) {
            Ok(n) => n,
            Err(_) => {
                println!("<input error>");
                break;
            }
        };
        if n == 0 {
            // EOF
            println!("\nGoodbye.");
            break;
        }
        let trimmed = line.trim();

        if buffer.is_empty() {
            if trimmed == "exit" {
                println!("Goodbye.");
                break;
            }
            match trimmed {
                ":quit" | ":q" => {
                    println!("Goodbye.");
                    break;
                }
                ":help" | ":h" => {
                    print_help();
                    continue;
                }
                ":vars" => {
                    print_vars(&vm);
                    continue;
                }
                ":procs" => {
                    print_procs(&vm);
                    continue;
                }
                ":list" => {
                    print!("{}", to_listing(compiler.program()).bright_black());
                    continue;
                }
                ":reset" => {
                    compiler = Compiler::new();
                    vm = Vm::new(RecordingTurtle::new(), io::stdout());
                    println!("{}", "State reset.".yellow());
                    continue;
                }
                _ => {}
            }
            if trimmed.is_empty() {
                continue;
            }
        }

        buffer.push_str(&line);

        // a blank line forces execution of whatever is buffered
        if !trimmed.is_empty() && !is_complete(&buffer) {
            continue;
        }

        eval_chunk(&buffer, &mut compiler, &mut vm);
        buffer.clear();
    }
    ExitCode::SUCCESS
}

fn eval_chunk(src: &str, compiler: &mut Compiler, vm: &mut ReplVm) {
    let (tokens, lex_diagnostics) = Lexer::new(src).tokenize();
    for d in &lex_diagnostics {
        render_error(src, d);
    }
    let block = match Parser::new(tokens).parse_program() {
        Ok(b) => b,
        Err(errs) => {
            for e in &errs {
                render_error(src, e);
            }
            return;
        }
    };
    let entry = match compiler.compile_block(&block) {
        Ok(entry) => entry,
        Err(e) => {
            render_error(src, &e);
            return;
        }
    };
    let result = vm.run_from(compiler.program(), entry);
    for cmd in vm.sink_mut().take_commands() {
        println!("{}", cmd.to_string().cyan());
    }
    if let Err(e) = result {
        render_error(src, &e);
        vm.clear_stack();
    }
}

fn print_help() {
    println!(
        "{}\n  {}   {}\n  {}   {}\n  {}  {}\n  {}   {}\n  {}  {}",
        "Commands:".bold(),
        ":help".yellow(),
        "Show this help",
        ":quit".yellow(),
        "Exit the REPL (or type 'exit')",
        ":vars".yellow(),
        "List variable bindings",
        ":procs".yellow(),
        "List defined procedures",
        ":list".yellow(),
        "Show the bytecode compiled so far",
    );
    println!(
        "  {}  {}\n{}",
        ":reset".yellow(),
        "Clear the compiled program and the environment",
        "Type statements to run them. 'to', 'if' and 'while' blocks may span\n\
         several lines; a blank line runs the buffered input as-is."
    );
}

fn print_vars(vm: &ReplVm) {
    let mut any = false;
    for (name, binding) in vm.env().names_snapshot() {
        if let Binding::Value(v) = binding {
            println!("{} = {}", name.yellow(), v.to_string().bright_blue());
            any = true;
        }
    }
    if !any {
        println!("{}", "<no vars>".dimmed());
    }
}

fn print_procs(vm: &ReplVm) {
    let mut any = false;
    for (name, binding) in vm.env().names_snapshot() {
        if let Binding::Proc(p) = binding {
            let params: Vec<String> = p.params.iter().map(|p| format!(":{}", p)).collect();
            println!("to {} {}", name.yellow(), params.join(" "));
            any = true;
        }
    }
    if !any {
        println!("{}", "<no procedures>".dimmed());
    }
}

fn render_error(source: &str, err: &Error) {
    eprintln!("{}: {}", err.kind.to_string().red().bold(), err.msg.red());
    if let (Some(line), Some(col)) = (err.line, err.col) {
        if let Some(src_line) = source.lines().nth(line - 1) {
            eprintln!("  {}", src_line.bright_black());
            let mut marker = String::new();
            if col > 1 {
                marker.push_str(&" ".repeat(col - 1));
            }
            marker.push('^');
            eprintln!("  {}", marker.red());
        } else {
            eprintln!("  at {}:{}", line, col);
        }
    }
}

/// A chunk is complete when every `to` / `if` / `while` has its `end` and
/// parentheses and braces balance. Incomplete chunks keep buffering.
fn is_complete(input: &str) -> bool {
    let (tokens, _) = Lexer::new(input).tokenize();
    let mut paren = 0i32;
    let mut brace = 0i32;
    let mut starts = 0i32;
    let mut ends = 0i32;
    for tk in tokens.iter() {
        match &tk.kind {
            TokenKind::LParen => paren += 1,
            TokenKind::RParen => paren -= 1,
            TokenKind::LBrace => brace += 1,
            TokenKind::RBrace => brace -= 1,
            TokenKind::To | TokenKind::If | TokenKind::While => starts += 1,
            TokenKind::End => ends += 1,
            _ => {}
        }
    }
    paren <= 0 && brace <= 0 && starts <= ends
}
