//! Demo filters registered by the `sorrel` binary.
//!
//! The interpreter core defines no filters; this set exists so the CLI can
//! exercise call expressions the way a real template host would. Hosts
//! embedding the library bring their own registry.

use crate::{Bindings, EvalError, Value};

/// Register the demo filter set into a context.
pub fn register_defaults(bindings: &mut Bindings) {
    bindings.register_filter("add", Box::new(add));
    bindings.register_filter("sum", Box::new(sum));
    bindings.register_filter("get", Box::new(get));
    bindings.register_filter("count", Box::new(count));
    bindings.register_filter("upper", Box::new(upper));
    bindings.register_filter("lower", Box::new(lower));
    bindings.register_filter("matches", Box::new(matches_filter));
}

fn type_error(msg: impl Into<String>) -> EvalError {
    EvalError::TypeError(msg.into())
}

/// Sum a slice of numeric values, keeping integers integer when no float
/// is involved.
fn numeric_sum(values: &[Value]) -> Result<Value, EvalError> {
    let mut int_sum: i64 = 0;
    let mut float_sum: f64 = 0.0;
    let mut any_float = false;

    for value in values {
        match value {
            Value::Integer(n) => {
                int_sum += n;
                float_sum += *n as f64;
            }
            Value::Float(n) => {
                any_float = true;
                float_sum += n;
            }
            v => {
                return Err(type_error(format!(
                    "Expected a number, got {}",
                    v.type_name()
                )));
            }
        }
    }

    if any_float {
        Ok(Value::Float(float_sum))
    } else {
        Ok(Value::Integer(int_sum))
    }
}

/// add(a, b, ...) - numeric addition over all arguments
fn add(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(type_error("add expects at least one argument"));
    }
    numeric_sum(args)
}

/// sum(array) - sum the elements of an array
fn sum(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::Array(items)] => numeric_sum(items),
        _ => Err(type_error("sum expects a single array argument")),
    }
}

/// get(object, key) or get(array, index) - element lookup
fn get(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::Object(map), Value::String(key)] => {
            Ok(map.get(key).cloned().unwrap_or(Value::Null))
        }
        [Value::Array(items), Value::Integer(index)] => {
            let i = usize::try_from(*index)
                .map_err(|_| type_error(format!("Negative array index {}", index)))?;
            Ok(items.get(i).cloned().unwrap_or(Value::Null))
        }
        _ => Err(type_error(
            "get expects (object, string key) or (array, integer index)",
        )),
    }
}

/// count(value) - length of an array, object, or string
fn count(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::Array(items)] => Ok(Value::Integer(items.len() as i64)),
        [Value::Object(map)] => Ok(Value::Integer(map.len() as i64)),
        [Value::String(s)] => Ok(Value::Integer(s.chars().count() as i64)),
        _ => Err(type_error(
            "count expects a single array, object, or string argument",
        )),
    }
}

/// upper(string) - uppercase
fn upper(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::String(s)] => Ok(Value::String(s.to_uppercase())),
        _ => Err(type_error("upper expects a single string argument")),
    }
}

/// lower(string) - lowercase
fn lower(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::String(s)] => Ok(Value::String(s.to_lowercase())),
        _ => Err(type_error("lower expects a single string argument")),
    }
}

/// matches(string, pattern) - true if the string matches the regex pattern
fn matches_filter(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::String(s), Value::String(pattern)] => {
            let re = regex::Regex::new(pattern)
                .map_err(|e| type_error(format!("invalid regex: {e}")))?;
            Ok(Value::Boolean(re.is_match(s)))
        }
        _ => Err(type_error("matches expects (string, string pattern)")),
    }
}
