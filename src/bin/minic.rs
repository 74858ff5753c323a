//! the driver binary: compiles a source file and runs it on the bytecode VM.
//!
//! run with `--help` for more info.

use std::fmt;
use std::process::ExitCode;

use clap::Parser;

use minic::back::{compile, run, CodegenError, RuntimeError};
use minic::front::lex::{LexError, Lexer};
use minic::front::parse::{parse, ParseError};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// the source file to compile and run
    file: String,
    /// print the token stream before compiling
    #[arg(long)]
    dump_tokens: bool,
    /// print the parsed AST before compiling
    #[arg(long)]
    dump_ast: bool,
    /// print the generated bytecode before running
    #[arg(long)]
    dump_bytecode: bool,
}

#[derive(Debug)]
enum DriverError {
    Io(std::io::Error),
    Utf8(std::string::FromUtf8Error),
    Lex(LexError),
    Parse(ParseError),
    Codegen(CodegenError),
    Runtime(RuntimeError),
    MainTakesArguments(usize),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Io(e) => write!(f, "{e}"),
            DriverError::Utf8(e) => write!(f, "{e}"),
            DriverError::Lex(e) => write!(f, "{e}"),
            DriverError::Parse(e) => write!(f, "{e}"),
            DriverError::Codegen(e) => write!(f, "{e}"),
            DriverError::Runtime(e) => write!(f, "{e}"),
            DriverError::MainTakesArguments(n) => {
                write!(f, "'main' must take no arguments to be run from the command line, found {n}")
            }
        }
    }
}

impl From<std::io::Error> for DriverError {
    fn from(e: std::io::Error) -> Self {
        DriverError::Io(e)
    }
}
impl From<std::string::FromUtf8Error> for DriverError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        DriverError::Utf8(e)
    }
}
impl From<LexError> for DriverError {
    fn from(e: LexError) -> Self {
        DriverError::Lex(e)
    }
}
impl From<ParseError> for DriverError {
    fn from(e: ParseError) -> Self {
        DriverError::Parse(e)
    }
}
impl From<CodegenError> for DriverError {
    fn from(e: CodegenError) -> Self {
        DriverError::Codegen(e)
    }
}
impl From<RuntimeError> for DriverError {
    fn from(e: RuntimeError) -> Self {
        DriverError::Runtime(e)
    }
}

fn try_main(args: &Args) -> Result<(), DriverError> {
    println!("minic 0.1\n");

    let bytes = std::fs::read(&args.file)?;
    let source = String::from_utf8(bytes)?;
    println!("{source}\n");

    if args.dump_tokens {
        for tok in Lexer::new(&source).tokenize()? {
            println!("{tok}");
        }
        println!();
    }

    let program = parse(&source)?;

    if args.dump_ast {
        println!("{program:#?}\n");
    }

    let (code, symbols) = compile(&program)?;

    if args.dump_bytecode {
        for (i, instr) in code.iter().enumerate() {
            println!("{i:>5}: {instr}");
        }
        println!();
    }

    let main_name = internment::Intern::new("main".to_string());
    let main_info = symbols.get(&main_name).expect("compile() already checked 'main' exists");
    if main_info.param_count != 0 {
        return Err(DriverError::MainTakesArguments(main_info.param_count));
    }

    let result = run(&code, main_info.entry, &[])?;
    println!("Result: {result}");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match std::panic::catch_unwind(|| try_main(&args)) {
        Ok(Ok(())) => ExitCode::from(0),
        Ok(Err(e)) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
        Err(_) => {
            eprintln!("Unknown error.");
            ExitCode::from(1)
        }
    }
}
