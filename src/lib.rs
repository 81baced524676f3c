pub mod ast;
pub mod cli;
pub mod evaluator;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod value;

pub use ast::{BinOp, Expr, InfixOp, LogicOp, Token, UnaryOp};
pub use evaluator::{Bindings, EvalContext, EvalError, Evaluator, FilterFn};
pub use lexer::{LexError, Lexer, Position};
pub use output::to_source;
pub use parser::{ParseError, Parser};
pub use value::{ExternalRef, Value};

/// Error from the combined parse-and-evaluate entry point.
#[derive(Debug)]
pub enum Error {
    Parse(ParseError),
    Eval(EvalError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "{}", e),
            Error::Eval(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(e) => Some(e),
            Error::Eval(e) => Some(e),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<EvalError> for Error {
    fn from(e: EvalError) -> Self {
        Error::Eval(e)
    }
}

/// Parse one expression source string into a tree.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    Parser::new(Lexer::new(source))?.parse()
}

/// Parse and evaluate one expression against a context.
///
/// # Examples
///
/// ```
/// use sorrel_expr::{Bindings, Value, eval};
///
/// let mut bindings = Bindings::new();
/// bindings.define("qty", Value::Integer(3));
///
/// let result = eval("qty > 2 ? 'bulk' : 'single'", &mut bindings).unwrap();
/// assert_eq!(result, Value::String("bulk".to_string()));
/// ```
pub fn eval(source: &str, ctx: &mut dyn EvalContext) -> Result<Value, Error> {
    let expr = parse(source)?;
    Ok(Evaluator::new().eval(&expr, ctx)?)
}
