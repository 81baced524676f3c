//! Canonical source rendering for expression trees.
//!
//! The printer emits an expression back as source text with minimal
//! parenthesization: a sub-expression is wrapped exactly when its operator
//! binds looser than its position requires. Re-parsing the printed form of
//! a parsed expression yields a structurally equal tree, which is what the
//! round-trip tests lean on.
//!
//! # Examples
//!
//! ```
//! use sorrel_expr::{Lexer, Parser, output::to_source};
//!
//! let lexer = Lexer::new("1+2 * 3");
//! let mut parser = Parser::new(lexer).unwrap();
//! let expr = parser.parse().unwrap();
//!
//! assert_eq!(to_source(&expr), "1 + 2 * 3");
//! ```

use crate::ast::{Expr, operators};

/// Binding strength of a whole sub-expression, on the operator table's
/// scale. Primary terms are tighter than any operator.
const PREC_PRIMARY: u8 = operators::PREC_UNARY + 1;

fn expr_precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Conditional { .. } => operators::PREC_CONDITIONAL,
        Expr::LogicalOp { op, .. } => op.precedence(),
        Expr::BinaryOp { op, .. } => op.precedence(),
        Expr::UnaryOp { .. } => operators::PREC_UNARY,
        _ => PREC_PRIMARY,
    }
}

pub struct SourcePrinter;

impl SourcePrinter {
    pub fn new() -> Self {
        SourcePrinter
    }

    pub fn print(&self, expr: &Expr) -> String {
        let mut out = String::new();
        self.write_expr(&mut out, expr);
        out
    }

    /// Write `expr`, parenthesized when it binds looser than `min_prec`.
    fn write_child(&self, out: &mut String, expr: &Expr, min_prec: u8) {
        if expr_precedence(expr) < min_prec {
            out.push('(');
            self.write_expr(out, expr);
            out.push(')');
        } else {
            self.write_expr(out, expr);
        }
    }

    fn write_expr(&self, out: &mut String, expr: &Expr) {
        match expr {
            Expr::Integer(n) => out.push_str(&n.to_string()),
            Expr::Float(n) => out.push_str(&format_float(*n)),
            Expr::String(s) => {
                out.push('\'');
                out.push_str(&escape_string(s));
                out.push('\'');
            }
            Expr::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Expr::Null => out.push_str("null"),
            Expr::Identifier(name) => out.push_str(name),

            Expr::UnaryOp { op, operand } => {
                out.push_str(op.symbol());
                self.write_child(out, operand, operators::PREC_UNARY);
            }

            Expr::BinaryOp { op, left, right } => {
                let prec = op.precedence();
                self.write_child(out, left, prec);
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                // Left-associative: an equal-rank right child needs parens
                self.write_child(out, right, prec + 1);
            }

            Expr::LogicalOp { op, left, right } => {
                let prec = op.precedence();
                self.write_child(out, left, prec);
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                self.write_child(out, right, prec + 1);
            }

            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.write_child(out, test, operators::PREC_CONDITIONAL + 1);
                out.push_str(" ? ");
                // Both arms are delimited by '?'/':' and re-parse at full
                // expression level, so nested conditionals stay bare
                self.write_expr(out, consequent);
                out.push_str(" : ");
                self.write_expr(out, alternate);
            }

            Expr::Array(elements) => {
                out.push('[');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_expr(out, element);
                }
                out.push(']');
            }

            Expr::Object(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if is_bare_key(key) {
                        out.push_str(key);
                    } else {
                        out.push('\'');
                        out.push_str(&escape_string(key));
                        out.push('\'');
                    }
                    out.push_str(": ");
                    self.write_expr(out, value);
                }
                out.push('}');
            }

            Expr::Call { name, args } => {
                out.push_str(name);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_expr(out, arg);
                }
                out.push(')');
            }
        }
    }
}

impl Default for SourcePrinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Floats must re-lex as floats, so integral values keep one fractional
/// digit.
fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{:.1}", n)
    } else {
        n.to_string()
    }
}

fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    // Keywords would re-lex as literals, not identifiers
    if matches!(key, "true" | "false" | "null") {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Renders an expression tree as canonical source text.
///
/// # Examples
///
/// ```
/// use sorrel_expr::{ast::Expr, output::to_source};
///
/// let expr = Expr::Array(vec![Expr::Integer(1), Expr::Null]);
/// assert_eq!(to_source(&expr), "[1, null]");
/// ```
pub fn to_source(expr: &Expr) -> String {
    SourcePrinter::new().print(expr)
}
