use clap::Parser;
use jsrt::{Interpreter, JsError, JsValue, Options};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(name = "jsrt", version, about = "An ECMAScript 5 runtime")]
struct Cli {
    /// JavaScript file to execute
    file: Option<PathBuf>,

    /// Evaluate inline JavaScript
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Run global code in strict mode
    #[arg(long)]
    strict: bool,

    /// Maximum depth of nested function calls
    #[arg(long = "max-recursion")]
    max_recursion: Option<usize>,

    /// Maximum number of statements per execution (0 = unlimited)
    #[arg(long = "max-statements", default_value_t = 0)]
    max_statements: usize,

    /// Wall-clock limit per execution, in milliseconds
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Emit a trace event for `debugger` statements
    #[arg(long = "allow-debugger")]
    allow_debugger: bool,
}

impl Cli {
    fn options(&self) -> Options {
        let mut options = Options::new()
            .strict(self.strict)
            .max_statements(self.max_statements)
            .allow_debugger_statement(self.allow_debugger);
        if let Some(depth) = self.max_recursion {
            options = options.limit_recursion(depth);
        }
        if let Some(ms) = self.timeout_ms {
            options = options.timeout_interval(Duration::from_millis(ms));
        }
        options
    }
}

fn new_engine(options: Options) -> Interpreter {
    let mut interp = Interpreter::with_options(options);
    interp.set_native_function("print", 1, |interp, _this, args| {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push(interp.to_string(arg)?);
        }
        println!("{}", parts.join(" "));
        Ok(JsValue::Undefined)
    });
    interp
}

fn report(err: &JsError) {
    eprintln!("Uncaught {err}");
    if let JsError::Thrown(thrown) = err {
        for frame in &thrown.stack {
            eprintln!("    {frame}");
        }
    }
}

fn execute_code(interp: &mut Interpreter, code: &str, print_result: bool) -> ExitCode {
    match interp.execute(code) {
        Ok(value) => {
            if print_result && !value.is_undefined() {
                println!("{}", interp.to_display_string(&value));
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&e);
            ExitCode::from(1)
        }
    }
}

fn run_file(interp: &mut Interpreter, path: &Path) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            return ExitCode::from(1);
        }
    };
    execute_code(interp, &source, false)
}

fn run_repl(interp: &mut Interpreter) -> ExitCode {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("jsrt v{}", env!("CARGO_PKG_VERSION"));
    println!("Type JavaScript statements. Press Ctrl-D to exit.");

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match interp.execute(trimmed) {
                    Ok(value) => println!("{}", interp.to_display_string(&value)),
                    Err(e) => report(&e),
                }
            }
            Err(e) => {
                eprintln!("Read error: {e}");
                return ExitCode::from(1);
            }
        }
    }

    println!();
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("JSRT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut interp = new_engine(cli.options());

    if let Some(code) = &cli.eval {
        return execute_code(&mut interp, code, true);
    }

    if let Some(path) = &cli.file {
        return run_file(&mut interp, path);
    }

    run_repl(&mut interp)
}
