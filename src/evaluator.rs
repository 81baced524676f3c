use std::collections::HashMap;

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::{
    ast::{BinOp, Expr, LogicOp, UnaryOp},
    value::Value,
};

/// Hard bound on tree depth during evaluation. The parser enforces its own
/// bound, so this only triggers for trees built by hand.
const MAX_EVAL_DEPTH: usize = 128;

/// The two capabilities a host must supply to evaluate expressions:
/// identifier resolution and filter invocation.
///
/// The evaluator calls both synchronously and retains the context for no
/// longer than one [`Evaluator::eval`] call. `lookup` signals an absent
/// name with `None`; the evaluator turns that into null rather than an
/// error, so templates can probe optional bindings.
pub trait EvalContext {
    /// Resolve a variable name to a value.
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Invoke a named filter with already-evaluated arguments.
    ///
    /// A context that does not know the name reports
    /// [`EvalError::UnknownFilter`].
    fn invoke_filter(&mut self, name: &str, args: Vec<Value>) -> Result<Value, EvalError>;
}

/// A filter implementation stored in [`Bindings`].
pub type FilterFn = Box<dyn Fn(&[Value]) -> Result<Value, EvalError>>;

/// Plain [`EvalContext`] backed by two maps: variables and filters.
///
/// Hosts embedding the interpreter in a larger scope chain implement
/// [`EvalContext`] themselves; `Bindings` covers tests, the CLI, and
/// simple single-scope hosts.
#[derive(Default)]
pub struct Bindings {
    vars: HashMap<String, Value>,
    filters: HashMap<String, FilterFn>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable name.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Register a filter under a name.
    pub fn register_filter(&mut self, name: impl Into<String>, filter: FilterFn) {
        self.filters.insert(name.into(), filter);
    }
}

impl EvalContext for Bindings {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    fn invoke_filter(&mut self, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        match self.filters.get(name) {
            Some(filter) => filter(&args),
            None => Err(EvalError::UnknownFilter(name.to_string())),
        }
    }
}

/// Errors that can occur during expression evaluation.
#[derive(Debug, Clone)]
pub enum EvalError {
    /// An operator applied to operand types it does not support
    TypeError(String),

    /// A filter invocation named a filter the context does not know
    UnknownFilter(String),

    /// Integer division or modulo by zero
    DivisionByZero,

    /// The tree is deeper than the evaluator's recursion bound
    NestingTooDeep,
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::TypeError(msg) => write!(f, "Type error: {}", msg),
            EvalError::UnknownFilter(name) => write!(f, "Unknown filter: '{}'", name),
            EvalError::DivisionByZero => write!(f, "Division by zero"),
            EvalError::NestingTooDeep => write!(f, "Expression tree nested too deeply"),
        }
    }
}

impl std::error::Error for EvalError {}

/// The expression evaluator: a tree walk over [`Expr`] against an
/// [`EvalContext`].
///
/// Evaluation never mutates the tree, so one parsed expression can be
/// evaluated any number of times against different contexts.
#[derive(Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates an expression tree against a context.
    ///
    /// # Examples
    ///
    /// ```
    /// use sorrel_expr::{Bindings, Evaluator, Lexer, Parser, Value};
    ///
    /// let lexer = Lexer::new("price * 2");
    /// let mut parser = Parser::new(lexer).unwrap();
    /// let expr = parser.parse().unwrap();
    ///
    /// let mut bindings = Bindings::new();
    /// bindings.define("price", Value::Integer(100));
    ///
    /// let result = Evaluator::new().eval(&expr, &mut bindings).unwrap();
    /// assert_eq!(result, Value::Integer(200));
    /// ```
    pub fn eval(&self, expr: &Expr, ctx: &mut dyn EvalContext) -> Result<Value, EvalError> {
        self.eval_expr(expr, ctx, 0)
    }

    fn eval_expr(
        &self,
        expr: &Expr,
        ctx: &mut dyn EvalContext,
        depth: usize,
    ) -> Result<Value, EvalError> {
        if depth >= MAX_EVAL_DEPTH {
            return Err(EvalError::NestingTooDeep);
        }

        match expr {
            Expr::Float(n) => Ok(Value::Float(*n)),
            Expr::Integer(n) => Ok(Value::Integer(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Null => Ok(Value::Null),

            // Absent names resolve to null, not an error; the template
            // layer leans on this for optional bindings.
            Expr::Identifier(name) => Ok(ctx.lookup(name).unwrap_or(Value::Null)),

            Expr::UnaryOp { op, operand } => {
                let value = self.eval_expr(operand, ctx, depth + 1)?;
                apply_unary(*op, value)
            }

            Expr::BinaryOp { op, left, right } => {
                let left = self.eval_expr(left, ctx, depth + 1)?;
                let right = self.eval_expr(right, ctx, depth + 1)?;
                apply_binop(*op, &left, &right)
            }

            // Logical operators short-circuit and yield the chosen
            // operand's value, not a coerced boolean. `??` falls through
            // on ANY falsy left operand, null included but not only.
            Expr::LogicalOp { op, left, right } => {
                let left = self.eval_expr(left, ctx, depth + 1)?;
                let take_left = match op {
                    LogicOp::And => !left.is_truthy(),
                    LogicOp::Or | LogicOp::Coalesce => left.is_truthy(),
                };
                if take_left {
                    Ok(left)
                } else {
                    self.eval_expr(right, ctx, depth + 1)
                }
            }

            // Only the selected branch is evaluated; the other arm must
            // stay side-effect free even when it names filters.
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.eval_expr(test, ctx, depth + 1)?;
                if test.is_truthy() {
                    self.eval_expr(consequent, ctx, depth + 1)
                } else {
                    self.eval_expr(alternate, ctx, depth + 1)
                }
            }

            Expr::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expr(element, ctx, depth + 1)?);
                }
                Ok(Value::Array(values))
            }

            Expr::Object(entries) => {
                let mut map = HashMap::new();
                for (key, value_expr) in entries {
                    let value = self.eval_expr(value_expr, ctx, depth + 1)?;
                    // Duplicate keys: last occurrence wins
                    map.insert(key.clone(), value);
                }
                Ok(Value::Object(map))
            }

            Expr::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg, ctx, depth + 1)?);
                }
                ctx.invoke_filter(name, values)
            }
        }
    }
}

fn apply_unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
        UnaryOp::Negate => match value {
            Value::Integer(n) => Ok(Value::Integer(-n)),
            Value::Float(n) => Ok(Value::Float(-n)),
            v => Err(EvalError::TypeError(format!(
                "Cannot negate {}",
                v.type_name()
            ))),
        },
        UnaryOp::Plus => match value {
            v @ (Value::Integer(_) | Value::Float(_)) => Ok(v),
            v => Err(EvalError::TypeError(format!(
                "Cannot apply unary '+' to {}",
                v.type_name()
            ))),
        },
    }
}

fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Add
        | BinOp::Subtract
        | BinOp::Multiply
        | BinOp::Divide
        | BinOp::Modulo => arithmetic(op, left, right),

        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::ShiftLeft | BinOp::ShiftRight => {
            bitwise(op, left, right)
        }

        BinOp::Equal | BinOp::NotEqual => Ok(equality(op, left, right)),

        BinOp::LessThan | BinOp::GreaterThan | BinOp::LessEqual | BinOp::GreaterEqual => {
            relational(op, left, right)
        }
    }
}

/// Arithmetic with dynamic numeric promotion: two integers stay integer
/// (division widens to float when it does not divide evenly), and mixed
/// integer/float operands go through decimal arithmetic so exact integral
/// results collapse back to integers.
fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => int_arithmetic(op, *a, *b),
        (Value::Float(a), Value::Float(b)) => float_arithmetic(op, *a, *b),
        (Value::Integer(a), Value::Float(b)) => mixed_arithmetic(op, *a as f64, *b),
        (Value::Float(a), Value::Integer(b)) => mixed_arithmetic(op, *a, *b as f64),
        (Value::String(a), Value::String(b)) if op == BinOp::Add => {
            Ok(Value::String(format!("{}{}", a, b)))
        }
        (a, b) => Err(EvalError::TypeError(format!(
            "Cannot apply '{}' to {} and {}",
            op.symbol(),
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn int_arithmetic(op: BinOp, a: i64, b: i64) -> Result<Value, EvalError> {
    match op {
        BinOp::Add => Ok(Value::Integer(a + b)),
        BinOp::Subtract => Ok(Value::Integer(a - b)),
        BinOp::Multiply => Ok(Value::Integer(a * b)),
        BinOp::Divide => {
            if b == 0 {
                Err(EvalError::DivisionByZero)
            } else if a % b == 0 {
                Ok(Value::Integer(a / b))
            } else {
                // Non-exact integer division widens to float
                Ok(Value::Float(a as f64 / b as f64))
            }
        }
        BinOp::Modulo => {
            if b == 0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(Value::Integer(a % b))
            }
        }
        _ => unreachable!("non-arithmetic operator in int_arithmetic"),
    }
}

fn float_arithmetic(op: BinOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        BinOp::Divide => a / b,
        BinOp::Modulo => a % b,
        _ => unreachable!("non-arithmetic operator in float_arithmetic"),
    };
    Ok(Value::Float(result))
}

fn mixed_arithmetic(op: BinOp, a: f64, b: f64) -> Result<Value, EvalError> {
    if let Some(value) = decimal_collapse(op, a, b) {
        return Ok(value);
    }
    float_arithmetic(op, a, b)
}

/// Exact decimal arithmetic for mixed integer/float operands. Integral
/// results come back as integers. Returns None when the operands do not
/// convert cleanly (or the divisor is zero), in which case the caller
/// falls back to IEEE semantics.
fn decimal_collapse(op: BinOp, a: f64, b: f64) -> Option<Value> {
    let ad = Decimal::from_f64(a)?;
    let bd = Decimal::from_f64(b)?;

    let rd = match op {
        BinOp::Add => ad + bd,
        BinOp::Subtract => ad - bd,
        BinOp::Multiply => ad * bd,
        BinOp::Divide => {
            if bd == Decimal::ZERO {
                return None;
            }
            ad / bd
        }
        BinOp::Modulo => {
            if bd == Decimal::ZERO {
                return None;
            }
            ad % bd
        }
        _ => return None,
    };

    if rd.is_integer() {
        if let Some(r) = rd.to_i64() {
            return Some(Value::Integer(r));
        }
    }
    rd.to_f64().map(Value::Float)
}

/// Bitwise and shift operators require integer-coercible operands:
/// integers, or floats carrying no fraction.
fn bitwise(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (a, b) = match (left.as_integer(), right.as_integer()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(EvalError::TypeError(format!(
                "Cannot apply '{}' to {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            )));
        }
    };

    match op {
        BinOp::BitAnd => Ok(Value::Integer(a & b)),
        BinOp::BitOr => Ok(Value::Integer(a | b)),
        BinOp::BitXor => Ok(Value::Integer(a ^ b)),
        BinOp::ShiftLeft | BinOp::ShiftRight => {
            if !(0..64).contains(&b) {
                return Err(EvalError::TypeError(format!(
                    "Shift amount {} out of range",
                    b
                )));
            }
            let result = if op == BinOp::ShiftLeft {
                a << b
            } else {
                a >> b
            };
            Ok(Value::Integer(result))
        }
        _ => unreachable!("non-bitwise operator in bitwise"),
    }
}

/// Equality promotes mixed numeric pairs; everything else compares
/// structurally.
fn equality(op: BinOp, left: &Value, right: &Value) -> Value {
    let eq = match (left, right) {
        (Value::Integer(a), Value::Float(b)) => (*a as f64) == *b,
        (Value::Float(a), Value::Integer(b)) => *a == (*b as f64),
        _ => left == right,
    };
    Value::Boolean(if op == BinOp::Equal { eq } else { !eq })
}

/// Ordering comparisons: numeric pairs promote, strings compare
/// lexicographically, anything else is a type error.
fn relational(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let ordering = match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (Value::String(a), Value::String(b)) => a.partial_cmp(b),
        (a, b) => {
            return Err(EvalError::TypeError(format!(
                "Cannot compare {} {} {}",
                a.type_name(),
                op.symbol(),
                b.type_name()
            )));
        }
    };

    // NaN operands order with nothing; every comparison on them is false
    let result = match ordering {
        None => false,
        Some(ordering) => match op {
            BinOp::LessThan => ordering.is_lt(),
            BinOp::GreaterThan => ordering.is_gt(),
            BinOp::LessEqual => ordering.is_le(),
            BinOp::GreaterEqual => ordering.is_ge(),
            _ => unreachable!("non-relational operator in relational"),
        },
    };
    Ok(Value::Boolean(result))
}
