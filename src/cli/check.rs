//! Evaluate expressions against JSON context documents

use super::{CliError, filters, json_to_value, value_to_json};
use crate::{Bindings, Evaluator, Lexer, Parser};

/// Options for the eval command
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// The expression to evaluate
    pub expr: String,
    /// JSON context document; its top-level keys become variables
    pub context: Option<String>,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
}

/// Result of an eval operation
#[derive(Debug)]
pub enum EvalOutcome {
    /// Syntax validation passed
    SyntaxValid,
    /// Expression evaluated successfully with JSON output
    Success(serde_json::Value),
}

/// Parse and evaluate one expression with the demo filter set.
pub fn execute_eval(options: &EvalOptions) -> Result<EvalOutcome, CliError> {
    let lexer = Lexer::new(&options.expr);
    let mut parser = Parser::new(lexer).map_err(CliError::Parse)?;
    let expr = parser.parse().map_err(CliError::Parse)?;

    if options.syntax_only {
        return Ok(EvalOutcome::SyntaxValid);
    }

    let mut bindings = Bindings::new();
    filters::register_defaults(&mut bindings);

    if let Some(json_str) = &options.context {
        let document: serde_json::Value = serde_json::from_str(json_str).map_err(CliError::Json)?;
        match document {
            serde_json::Value::Object(map) => {
                for (name, value) in map {
                    bindings.define(name, json_to_value(value));
                }
            }
            _ => return Err(CliError::ContextNotObject),
        }
    }

    let result = Evaluator::new()
        .eval(&expr, &mut bindings)
        .map_err(CliError::Eval)?;

    Ok(EvalOutcome::Success(value_to_json(result)))
}
