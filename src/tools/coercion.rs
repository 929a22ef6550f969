//! Parameter coercion: untyped JSON into the native argument a tool declares.
//!
//! Declared types are tags looked up in a [`CoercionTable`], not a fixed
//! `match`, so a new type (say `date-time`) is one `insert` away and the
//! dispatcher never changes.

use crate::tools::catalog::ParamDef;
use crate::types::{Error, Result, ToolFailure};
use rust_decimal::Decimal;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Parameter types
// =============================================================================

/// Declared parameter type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamType(Cow<'static, str>);

impl ParamType {
    pub const STRING: ParamType = ParamType(Cow::Borrowed("string"));
    pub const INTEGER: ParamType = ParamType(Cow::Borrowed("integer"));
    pub const OPTIONAL_INTEGER: ParamType = ParamType(Cow::Borrowed("optional-integer"));
    pub const BOOLEAN: ParamType = ParamType(Cow::Borrowed("boolean"));
    pub const DOUBLE: ParamType = ParamType(Cow::Borrowed("double"));
    pub const DECIMAL: ParamType = ParamType(Cow::Borrowed("decimal"));

    /// A type tag outside the built-in set.
    pub fn custom(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Native argument values
// =============================================================================

/// A coerced, natively-typed argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// No value: explicit `null` for optional types, or a `null` default.
    Null,
    String(String),
    Integer(i32),
    Boolean(bool),
    Double(f64),
    Decimal(Decimal),
    /// Produced by custom coercers that have no dedicated variant.
    Json(Value),
}

impl ArgValue {
    fn kind(&self) -> &'static str {
        match self {
            ArgValue::Null => "null",
            ArgValue::String(_) => "string",
            ArgValue::Integer(_) => "integer",
            ArgValue::Boolean(_) => "boolean",
            ArgValue::Double(_) => "double",
            ArgValue::Decimal(_) => "decimal",
            ArgValue::Json(_) => "json",
        }
    }
}

/// Ordered, coerced argument list handed to a tool body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<(String, ArgValue)>,
}

impl Args {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn push(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn lookup(&self, name: &str) -> std::result::Result<&ArgValue, ToolFailure> {
        self.get(name)
            .ok_or_else(|| ToolFailure::internal(format!("argument '{}' was not declared", name)))
    }

    fn mismatch(name: &str, wanted: &str, got: &ArgValue) -> ToolFailure {
        ToolFailure::internal(format!(
            "argument '{}' is {}, tool expected {}",
            name,
            got.kind(),
            wanted
        ))
    }

    pub fn string(&self, name: &str) -> std::result::Result<&str, ToolFailure> {
        match self.lookup(name)? {
            ArgValue::String(s) => Ok(s),
            other => Err(Self::mismatch(name, "string", other)),
        }
    }

    pub fn opt_string(&self, name: &str) -> std::result::Result<Option<&str>, ToolFailure> {
        match self.lookup(name)? {
            ArgValue::Null => Ok(None),
            ArgValue::String(s) => Ok(Some(s)),
            other => Err(Self::mismatch(name, "string or null", other)),
        }
    }

    pub fn integer(&self, name: &str) -> std::result::Result<i32, ToolFailure> {
        match self.lookup(name)? {
            ArgValue::Integer(i) => Ok(*i),
            other => Err(Self::mismatch(name, "integer", other)),
        }
    }

    pub fn opt_integer(&self, name: &str) -> std::result::Result<Option<i32>, ToolFailure> {
        match self.lookup(name)? {
            ArgValue::Null => Ok(None),
            ArgValue::Integer(i) => Ok(Some(*i)),
            other => Err(Self::mismatch(name, "integer or null", other)),
        }
    }

    pub fn boolean(&self, name: &str) -> std::result::Result<bool, ToolFailure> {
        match self.lookup(name)? {
            ArgValue::Boolean(b) => Ok(*b),
            other => Err(Self::mismatch(name, "boolean", other)),
        }
    }

    pub fn double(&self, name: &str) -> std::result::Result<f64, ToolFailure> {
        match self.lookup(name)? {
            ArgValue::Double(d) => Ok(*d),
            other => Err(Self::mismatch(name, "double", other)),
        }
    }

    pub fn decimal(&self, name: &str) -> std::result::Result<Decimal, ToolFailure> {
        match self.lookup(name)? {
            ArgValue::Decimal(d) => Ok(*d),
            other => Err(Self::mismatch(name, "decimal", other)),
        }
    }
}

// =============================================================================
// Coercion table
// =============================================================================

/// Conversion from a raw JSON value; `Err` carries a human-readable reason.
pub type CoerceFn = fn(&Value) -> std::result::Result<ArgValue, String>;

/// One table entry: how to convert, and how to describe the type in schemas.
#[derive(Debug, Clone, Copy)]
pub struct Coercer {
    /// JSON-Schema `type` advertised for parameters of this type.
    pub schema_type: &'static str,
    pub coerce: CoerceFn,
}

/// Declared-type tag → coercer.
#[derive(Debug, Clone)]
pub struct CoercionTable {
    entries: HashMap<ParamType, Coercer>,
}

impl CoercionTable {
    /// Empty table; most callers want [`CoercionTable::builtin`].
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Table with the six built-in types.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table.insert(ParamType::STRING, Coercer { schema_type: "string", coerce: coerce_string });
        table.insert(ParamType::INTEGER, Coercer { schema_type: "integer", coerce: coerce_integer });
        table.insert(
            ParamType::OPTIONAL_INTEGER,
            Coercer { schema_type: "integer", coerce: coerce_optional_integer },
        );
        table.insert(ParamType::BOOLEAN, Coercer { schema_type: "boolean", coerce: coerce_boolean });
        table.insert(ParamType::DOUBLE, Coercer { schema_type: "number", coerce: coerce_double });
        table.insert(ParamType::DECIMAL, Coercer { schema_type: "number", coerce: coerce_decimal });
        table
    }

    /// Add or replace a coercer, returning the previous one.
    pub fn insert(&mut self, param_type: ParamType, coercer: Coercer) -> Option<Coercer> {
        self.entries.insert(param_type, coercer)
    }

    pub fn get(&self, param_type: &ParamType) -> Option<&Coercer> {
        self.entries.get(param_type)
    }

    pub fn contains(&self, param_type: &ParamType) -> bool {
        self.entries.contains_key(param_type)
    }

    /// Convert `value` to `param_type`, naming `parameter` on failure.
    pub fn coerce_value(
        &self,
        parameter: &str,
        param_type: &ParamType,
        value: &Value,
    ) -> Result<ArgValue> {
        let coercer = self.get(param_type).ok_or_else(|| {
            Error::internal(format!("no coercion registered for type '{}'", param_type))
        })?;
        (coercer.coerce)(value).map_err(|message| Error::TypeCoercion {
            parameter: parameter.to_string(),
            expected: param_type.to_string(),
            message,
        })
    }

    /// Resolve one parameter: the raw value if present, else its default.
    ///
    /// A `null` default yields [`ArgValue::Null`] for any type, whether the
    /// parameter is omitted or sent as an explicit `null`. Any other default
    /// goes through the same coercer as a supplied value, so omitting a
    /// parameter and sending its default are indistinguishable.
    pub fn coerce_param(&self, tool: &str, param: &ParamDef, raw: Option<&Value>) -> Result<ArgValue> {
        match (raw, &param.default) {
            (Some(Value::Null), Some(Value::Null)) => Ok(ArgValue::Null),
            (Some(value), _) => self.coerce_value(&param.name, &param.param_type, value),
            (None, Some(Value::Null)) => Ok(ArgValue::Null),
            (None, Some(default)) => self.coerce_value(&param.name, &param.param_type, default),
            (None, None) => Err(Error::MissingParameter {
                tool: tool.to_string(),
                parameter: param.name.clone(),
            }),
        }
    }
}

impl Default for CoercionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// =============================================================================
// Built-in coercers
// =============================================================================

pub(crate) fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn coerce_string(value: &Value) -> std::result::Result<ArgValue, String> {
    match value {
        Value::String(s) => Ok(ArgValue::String(s.clone())),
        other => Err(format!("expected string, got {}", value_type_name(other))),
    }
}

fn coerce_integer(value: &Value) -> std::result::Result<ArgValue, String> {
    let Value::Number(n) = value else {
        return Err(format!("expected integer, got {}", value_type_name(value)));
    };
    if let Some(i) = n.as_i64() {
        return i32::try_from(i)
            .map(ArgValue::Integer)
            .map_err(|_| format!("{} is out of range for a 32-bit integer", i));
    }
    if n.is_u64() {
        return Err(format!("{} is out of range for a 32-bit integer", n));
    }
    match n.as_f64() {
        // 5.0 is an integer that happened to be written with a fraction.
        Some(f) if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 => {
            Ok(ArgValue::Integer(f as i32))
        }
        Some(f) if f.fract() == 0.0 => Err(format!("{} is out of range for a 32-bit integer", n)),
        _ => Err(format!("expected integer, got fractional number {}", n)),
    }
}

fn coerce_optional_integer(value: &Value) -> std::result::Result<ArgValue, String> {
    if value.is_null() {
        Ok(ArgValue::Null)
    } else {
        coerce_integer(value)
    }
}

fn coerce_boolean(value: &Value) -> std::result::Result<ArgValue, String> {
    match value {
        Value::Bool(b) => Ok(ArgValue::Boolean(*b)),
        other => Err(format!("expected boolean, got {}", value_type_name(other))),
    }
}

fn coerce_double(value: &Value) -> std::result::Result<ArgValue, String> {
    value
        .as_f64()
        .map(ArgValue::Double)
        .ok_or_else(|| format!("expected number, got {}", value_type_name(value)))
}

fn coerce_decimal(value: &Value) -> std::result::Result<ArgValue, String> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => return Err(format!("expected decimal, got {}", value_type_name(other))),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(ArgValue::Decimal)
        .map_err(|_| format!("'{}' is not a representable decimal", text))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> CoercionTable {
        CoercionTable::builtin()
    }

    fn coerce(ty: &ParamType, value: Value) -> Result<ArgValue> {
        table().coerce_value("p", ty, &value)
    }

    fn param(name: &str, ty: ParamType, default: Option<Value>) -> ParamDef {
        ParamDef {
            name: name.to_string(),
            param_type: ty,
            description: String::new(),
            default,
        }
    }

    #[test]
    fn test_string() {
        assert_eq!(
            coerce(&ParamType::STRING, json!("TX")).unwrap(),
            ArgValue::String("TX".into())
        );
        let err = coerce(&ParamType::STRING, json!(42)).unwrap_err();
        assert!(matches!(err, Error::TypeCoercion { ref parameter, .. } if parameter == "p"));
        assert!(coerce(&ParamType::STRING, json!(null)).is_err());
    }

    #[test]
    fn test_integer() {
        assert_eq!(coerce(&ParamType::INTEGER, json!(7)).unwrap(), ArgValue::Integer(7));
        assert_eq!(coerce(&ParamType::INTEGER, json!(-3)).unwrap(), ArgValue::Integer(-3));
        assert_eq!(coerce(&ParamType::INTEGER, json!(5.0)).unwrap(), ArgValue::Integer(5));
        assert!(coerce(&ParamType::INTEGER, json!(5.5)).is_err());
        assert!(coerce(&ParamType::INTEGER, json!("5")).is_err());
        assert!(coerce(&ParamType::INTEGER, json!(null)).is_err());
    }

    #[test]
    fn test_integer_range() {
        assert_eq!(
            coerce(&ParamType::INTEGER, json!(i32::MAX)).unwrap(),
            ArgValue::Integer(i32::MAX)
        );
        let err = coerce(&ParamType::INTEGER, json!(i64::from(i32::MAX) + 1)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(coerce(&ParamType::INTEGER, json!(u64::MAX)).is_err());
        assert!(coerce(&ParamType::INTEGER, json!(1e12)).is_err());
    }

    #[test]
    fn test_optional_integer_null_is_no_value() {
        assert_eq!(coerce(&ParamType::OPTIONAL_INTEGER, json!(null)).unwrap(), ArgValue::Null);
        assert_eq!(
            coerce(&ParamType::OPTIONAL_INTEGER, json!(3)).unwrap(),
            ArgValue::Integer(3)
        );
        assert!(coerce(&ParamType::OPTIONAL_INTEGER, json!(true)).is_err());
    }

    #[test]
    fn test_boolean_and_double() {
        assert_eq!(coerce(&ParamType::BOOLEAN, json!(true)).unwrap(), ArgValue::Boolean(true));
        assert!(coerce(&ParamType::BOOLEAN, json!("true")).is_err());
        assert_eq!(coerce(&ParamType::DOUBLE, json!(1.5)).unwrap(), ArgValue::Double(1.5));
        assert_eq!(coerce(&ParamType::DOUBLE, json!(2)).unwrap(), ArgValue::Double(2.0));
        assert!(coerce(&ParamType::DOUBLE, json!([1.0])).is_err());
    }

    #[test]
    fn test_decimal() {
        assert_eq!(
            coerce(&ParamType::DECIMAL, json!(12.25)).unwrap(),
            ArgValue::Decimal(Decimal::from_str("12.25").unwrap())
        );
        assert_eq!(
            coerce(&ParamType::DECIMAL, json!(" 0.1 ")).unwrap(),
            ArgValue::Decimal(Decimal::from_str("0.1").unwrap())
        );
        assert!(coerce(&ParamType::DECIMAL, json!("ten")).is_err());
        assert!(coerce(&ParamType::DECIMAL, json!(false)).is_err());
    }

    #[test]
    fn test_unknown_type_is_internal() {
        let err = coerce(&ParamType::custom("date-time"), json!("2024-01-01")).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_custom_type_extends_table() {
        let mut table = CoercionTable::builtin();
        let tag = ParamType::custom("date-time");
        table.insert(
            tag.clone(),
            Coercer {
                schema_type: "string",
                coerce: |v| {
                    let s = v.as_str().ok_or("expected RFC 3339 string")?;
                    chrono::DateTime::parse_from_rfc3339(s)
                        .map(|_| ArgValue::String(s.to_string()))
                        .map_err(|e| e.to_string())
                },
            },
        );
        assert!(table
            .coerce_value("when", &tag, &json!("2024-05-01T12:00:00Z"))
            .is_ok());
        assert!(table.coerce_value("when", &tag, &json!("yesterday")).is_err());
    }

    #[test]
    fn test_coerce_param_missing_and_defaults() {
        let t = table();
        let required = param("state", ParamType::STRING, None);
        let err = t.coerce_param("tool", &required, None).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingParameter { ref tool, ref parameter } if tool == "tool" && parameter == "state"
        ));

        let days = param("days", ParamType::INTEGER, Some(json!(5)));
        assert_eq!(t.coerce_param("tool", &days, None).unwrap(), ArgValue::Integer(5));
        assert_eq!(
            t.coerce_param("tool", &days, Some(&json!(2))).unwrap(),
            ArgValue::Integer(2)
        );

        let city = param("city", ParamType::STRING, Some(Value::Null));
        assert_eq!(t.coerce_param("tool", &city, None).unwrap(), ArgValue::Null);
        assert_eq!(
            t.coerce_param("tool", &city, Some(&Value::Null)).unwrap(),
            ArgValue::Null
        );

        // Explicit null is only accepted where null is the declared default.
        let name = param("name", ParamType::STRING, Some(json!("x")));
        assert!(matches!(
            t.coerce_param("tool", &name, Some(&Value::Null)).unwrap_err(),
            Error::TypeCoercion { .. }
        ));
        assert!(t.coerce_param("tool", &required, Some(&Value::Null)).is_err());
    }

    #[test]
    fn test_explicit_null_does_not_reapply_default() {
        let t = table();
        let limit = param("limit", ParamType::OPTIONAL_INTEGER, Some(json!(10)));
        assert_eq!(t.coerce_param("tool", &limit, None).unwrap(), ArgValue::Integer(10));
        assert_eq!(
            t.coerce_param("tool", &limit, Some(&Value::Null)).unwrap(),
            ArgValue::Null
        );
    }

    #[test]
    fn test_args_accessors() {
        let mut args = Args::new();
        args.push("state", ArgValue::String("TX".into()));
        args.push("city", ArgValue::Null);
        args.push("days", ArgValue::Integer(3));

        assert_eq!(args.string("state").unwrap(), "TX");
        assert_eq!(args.opt_string("city").unwrap(), None);
        assert_eq!(args.integer("days").unwrap(), 3);
        assert_eq!(args.opt_integer("days").unwrap(), Some(3));
        assert!(args.boolean("days").is_err());
        assert!(matches!(args.string("missing"), Err(ToolFailure::Internal(_))));
        assert_eq!(args.len(), 3);
    }
}
