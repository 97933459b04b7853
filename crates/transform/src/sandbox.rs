//! Minijinja evaluation of a single transform expression.
//!
//! The expression is wrapped in `{{ (expr) | tojson }}` and registered once
//! as an owned template, so each record only pays for rendering.

use std::time::Duration;

use minijinja::{context, Environment, Error, ErrorKind, Value};

use loader_core::{RawRecord, TransformConfig, MAX_TRANSFORM_FUEL};

use crate::{TransformError, TransformOutcome};

const TEMPLATE_NAME: &str = "transform";

/// Execution budget for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformLimits {
    pub time_limit: Duration,
    pub fuel: u64,
    pub max_output_bytes: usize,
}

impl From<&TransformConfig> for TransformLimits {
    fn from(cfg: &TransformConfig) -> Self {
        Self {
            time_limit: Duration::from_millis(cfg.time_limit_ms.max(1)),
            fuel: cfg.fuel.clamp(1, MAX_TRANSFORM_FUEL),
            max_output_bytes: cfg.max_output_bytes.max(2),
        }
    }
}

impl Default for TransformLimits {
    fn default() -> Self {
        Self::from(&TransformConfig::default())
    }
}

/// Raised by the `fail(message)` function so it can be told apart from
/// ordinary evaluation errors.
#[derive(Debug)]
struct ExplicitFailure(String);

impl std::fmt::Display for ExplicitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ExplicitFailure {}

fn fail_function(message: String) -> Result<Value, Error> {
    Err(Error::new(ErrorKind::InvalidOperation, message.clone()).with_source(ExplicitFailure(message)))
}

/// `merge(a, b)`: shallow object merge, keys in `b` win.
fn merge_function(base: Value, overlay: Value) -> Result<Value, Error> {
    let to_object = |v: &Value| match serde_json::to_value(v) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(serde_json::Value::Null) => Ok(serde_json::Map::new()),
        Ok(_) => Err(Error::new(
            ErrorKind::InvalidOperation,
            "merge() expects two objects",
        )),
        Err(e) => Err(Error::new(ErrorKind::InvalidOperation, e.to_string())),
    };
    let mut merged = to_object(&base)?;
    merged.extend(to_object(&overlay)?);
    Ok(Value::from_serialize(&merged))
}

/// A compiled transform expression.
pub struct Sandbox {
    env: Environment<'static>,
    limits: TransformLimits,
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox").field("limits", &self.limits).finish()
    }
}

impl Sandbox {
    pub fn compile(code: &str, limits: TransformLimits) -> Result<Self, TransformError> {
        let mut env = Environment::new();
        env.set_fuel(Some(limits.fuel.clamp(1, MAX_TRANSFORM_FUEL)));
        env.add_function("fail", fail_function);
        env.add_function("merge", merge_function);
        env.add_template_owned(TEMPLATE_NAME, format!("{{{{ ({}) | tojson }}}}", code.trim()))
            .map_err(|e| TransformError::Compile(e.to_string()))?;
        Ok(Self { env, limits })
    }

    pub fn limits(&self) -> TransformLimits {
        self.limits
    }

    /// Evaluate against one record. Blocking; callers bound wall-clock time.
    pub fn eval(&self, raw: &RawRecord, index: u64, key: &str) -> Result<TransformOutcome, TransformError> {
        let tmpl = self
            .env
            .get_template(TEMPLATE_NAME)
            .map_err(|e| TransformError::Compile(e.to_string()))?;

        let rendered = tmpl
            .render(context! {
                record => Value::from_serialize(raw),
                index => index,
                key => key,
            })
            .map_err(classify)?;

        if rendered.len() > self.limits.max_output_bytes {
            return Err(TransformError::OutputTooLarge {
                size: rendered.len(),
                limit: self.limits.max_output_bytes,
            });
        }

        match serde_json::from_str::<serde_json::Value>(&rendered) {
            Ok(serde_json::Value::Object(map)) => Ok(TransformOutcome::Record(serde_json::Value::Object(map))),
            Ok(serde_json::Value::Null) => Ok(TransformOutcome::Skip),
            Ok(other) => Err(TransformError::InvalidOutput(json_type_name(&other).to_string())),
            Err(e) => Err(TransformError::InvalidOutput(e.to_string())),
        }
    }
}

fn classify(err: Error) -> TransformError {
    if err.kind() == ErrorKind::OutOfFuel {
        return TransformError::FuelExhausted;
    }
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(e) = source {
        if let Some(explicit) = e.downcast_ref::<ExplicitFailure>() {
            return TransformError::Failed(explicit.0.clone());
        }
        source = e.source();
    }
    TransformError::Runtime(err.to_string())
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sandbox(code: &str) -> Sandbox {
        Sandbox::compile(code, TransformLimits::default()).unwrap()
    }

    #[test]
    fn builds_a_new_object() {
        let sb = sandbox(r#"{"sku": record.id, "name": record.name | upper, "pos": index}"#);
        let out = sb.eval(&json!({"id": "A1", "name": "shoe"}), 4, "A1").unwrap();
        assert_eq!(
            out,
            TransformOutcome::Record(json!({"sku": "A1", "name": "SHOE", "pos": 4}))
        );
    }

    #[test]
    fn none_means_skip() {
        let sb = sandbox("none if record.hidden else record");
        assert_eq!(sb.eval(&json!({"hidden": true}), 1, "1").unwrap(), TransformOutcome::Skip);
        assert!(matches!(
            sb.eval(&json!({"hidden": false}), 2, "2").unwrap(),
            TransformOutcome::Record(_)
        ));
    }

    #[test]
    fn non_object_output_is_invalid() {
        let sb = sandbox("record.price");
        let err = sb.eval(&json!({"price": 12}), 1, "1").unwrap_err();
        assert_eq!(err, TransformError::InvalidOutput("number".to_string()));
    }

    #[test]
    fn fail_function_raises_explicit_error() {
        let sb = sandbox(r#"fail("no price") if record.price is none else record"#);
        let err = sb.eval(&json!({"price": null}), 1, "1").unwrap_err();
        assert_eq!(err, TransformError::Failed("no price".to_string()));
    }

    #[test]
    fn merge_overlays_fields() {
        let sb = sandbox(r#"merge(record, {"key": key, "n": 2})"#);
        let out = sb.eval(&json!({"n": 1, "a": "x"}), 9, "K9").unwrap();
        assert_eq!(out, TransformOutcome::Record(json!({"n": 2, "a": "x", "key": "K9"})));
    }

    #[test]
    fn syntax_error_fails_compile() {
        let err = Sandbox::compile("record.(", TransformLimits::default()).unwrap_err();
        assert!(matches!(err, TransformError::Compile(_)));
    }

    #[test]
    fn fuel_bounds_instruction_count() {
        let limits = TransformLimits {
            fuel: 3,
            ..TransformLimits::default()
        };
        let sb = Sandbox::compile("record.a + record.b + record.c + record.d", limits).unwrap();
        let rec = json!({"a": 1, "b": 2, "c": 3, "d": 4});
        assert_eq!(sb.eval(&rec, 1, "1").unwrap_err(), TransformError::FuelExhausted);
    }

    #[test]
    fn oversized_fuel_is_clamped() {
        let limits = TransformLimits {
            fuel: u64::MAX,
            ..TransformLimits::default()
        };
        let sb = Sandbox::compile("record", limits).unwrap();
        assert_eq!(
            sb.eval(&json!({"a": 1}), 1, "1").unwrap(),
            TransformOutcome::Record(json!({"a": 1}))
        );

        let from_config = TransformLimits::from(&TransformConfig {
            fuel: u64::MAX,
            ..TransformConfig::default()
        });
        assert_eq!(from_config.fuel, MAX_TRANSFORM_FUEL);
    }

    #[test]
    fn oversized_output_is_rejected() {
        let limits = TransformLimits {
            max_output_bytes: 16,
            ..TransformLimits::default()
        };
        let sb = Sandbox::compile("record", limits).unwrap();
        let err = sb
            .eval(&json!({"description": "a fairly long description"}), 1, "1")
            .unwrap_err();
        assert!(matches!(err, TransformError::OutputTooLarge { limit: 16, .. }));
    }
}
