use clap::{Parser as ClapParser, Subcommand};
use sorrel_expr::cli::{self, CliError, EvalOptions, EvalOutcome};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "sorrel")]
#[command(about = "Sorrel - an embeddable infix expression language for template interpolation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and evaluate an expression
    Eval {
        /// The expression to evaluate
        expr: String,

        /// JSON context object (reads from stdin if not provided)
        #[arg(short, long)]
        context: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't evaluate
        #[arg(long)]
        syntax_only: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Eval {
            expr,
            context,
            pretty,
            syntax_only,
        } => run_eval(expr, context, pretty, syntax_only),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_eval(
    expr: String,
    context: Option<String>,
    pretty: bool,
    syntax_only: bool,
) -> Result<(), CliError> {
    let context = match context {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(CliError::Io)?;
            if buffer.trim().is_empty() {
                None
            } else {
                Some(buffer)
            }
        }
        None => None,
    };

    let options = EvalOptions {
        expr,
        context,
        syntax_only,
    };

    match cli::execute_eval(&options)? {
        EvalOutcome::SyntaxValid => println!("Syntax is valid"),
        EvalOutcome::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }
            .map_err(CliError::Json)?;
            println!("{}", json);
        }
    }
    Ok(())
}
