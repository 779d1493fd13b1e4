//! Optional-parameter resolution and validation
//!
//! Helper functions across this library accept partially specified parameter
//! sets. Each function declares its parameters once as a slice of
//! [`ParamSpec`] values; [`resolve`] fills the gaps from a precedence chain
//! (caller argument, then [`DefaultRegistry`] entry, then the declaration's
//! fallback) and validates every resolved value before the wrapped operation
//! runs. A failed validation never reaches the external collaborator.
//!
//! The registry is an explicit object constructed once at process start and
//! passed by reference; there is no process-global state in this module.

use crate::errors::{DasError, Result};
use std::collections::HashMap;
use std::fmt;

/// A single resolved parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// The tag describing this value's type, used in mismatch reports
    pub fn type_tag(&self) -> TypeTag {
        match self {
            ParamValue::Bool(_) => TypeTag::Bool,
            ParamValue::Int(_) => TypeTag::Int,
            ParamValue::Float(_) => TypeTag::Float,
            ParamValue::Str(_) => TypeTag::Str,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers widen to float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Parses an untyped string (environment variable shape detection):
    /// booleans, then integers, then floats, otherwise the string itself.
    pub fn from_env_str(raw: &str) -> ParamValue {
        match raw {
            "true" | "True" | "TRUE" => return ParamValue::Bool(true),
            "false" | "False" | "FALSE" => return ParamValue::Bool(false),
            _ => {}
        }
        if let Ok(v) = raw.parse::<i64>() {
            return ParamValue::Int(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            return ParamValue::Float(v);
        }
        ParamValue::Str(raw.to_string())
    }

    fn from_json(value: &serde_json::Value) -> Option<ParamValue> {
        match value {
            serde_json::Value::Bool(v) => Some(ParamValue::Bool(*v)),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Some(ParamValue::Int(v))
                } else {
                    n.as_f64().map(ParamValue::Float)
                }
            }
            serde_json::Value::String(v) => Some(ParamValue::Str(v.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// Expected type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Bool,
    Int,
    Float,
    Str,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Bool => "bool",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Str => "str",
        };
        write!(f, "{}", name)
    }
}

/// Constraint a resolved value must satisfy
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Plain type check
    Type(TypeTag),
    /// Membership in an enumerated set of allowed values
    Choice(Vec<ParamValue>),
    /// Numeric value within an inclusive range
    Range { min: f64, max: f64 },
}

/// Declaration of one optional parameter: name, constraint, optional fallback
///
/// Declarations are built once per helper-function signature and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    name: String,
    constraint: Constraint,
    fallback: Option<ParamValue>,
}

impl ParamSpec {
    pub fn new(name: &str, constraint: Constraint) -> Self {
        Self {
            name: name.to_string(),
            constraint,
            fallback: None,
        }
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, Constraint::Type(TypeTag::Bool))
    }

    pub fn int(name: &str) -> Self {
        Self::new(name, Constraint::Type(TypeTag::Int))
    }

    pub fn float(name: &str) -> Self {
        Self::new(name, Constraint::Type(TypeTag::Float))
    }

    pub fn str(name: &str) -> Self {
        Self::new(name, Constraint::Type(TypeTag::Str))
    }

    pub fn choice<V: Into<ParamValue>, I: IntoIterator<Item = V>>(name: &str, allowed: I) -> Self {
        Self::new(
            name,
            Constraint::Choice(allowed.into_iter().map(Into::into).collect()),
        )
    }

    pub fn range(name: &str, min: f64, max: f64) -> Self {
        Self::new(name, Constraint::Range { min, max })
    }

    /// Attaches the hard-coded last-resort default
    pub fn fallback<V: Into<ParamValue>>(mut self, value: V) -> Self {
        self.fallback = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }
}

/// Caller-supplied keyword arguments for one invocation
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    values: HashMap<String, ParamValue>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion; unset parameters are simply never set
    pub fn set<V: Into<ParamValue>>(mut self, name: &str, value: V) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Configured default values, looked up by parameter name
///
/// Built once at process start from the environment and/or a JSON config
/// file, then handed around by shared reference. Reads are lock-free; the
/// struct has no interior mutability, so any runtime mutation scheme is the
/// caller's to synchronize.
#[derive(Debug, Clone, Default)]
pub struct DefaultRegistry {
    values: HashMap<String, ParamValue>,
}

/// Prefix for environment-variable defaults, e.g. `DAS_COMMON_CMAP`
pub const ENV_PREFIX: &str = "DAS_COMMON_";

impl DefaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<V: Into<ParamValue>>(&mut self, name: &str, value: V) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Collects defaults from `DAS_COMMON_*` environment variables.
    ///
    /// The variable name after the prefix is lowercased to form the parameter
    /// name; values are shape-parsed (bool, int, float, then string).
    pub fn from_env() -> Self {
        let mut registry = Self::new();
        for (key, raw) in std::env::vars() {
            if let Some(suffix) = key.strip_prefix(ENV_PREFIX) {
                if suffix.is_empty() {
                    continue;
                }
                registry
                    .values
                    .insert(suffix.to_lowercase(), ParamValue::from_env_str(&raw));
            }
        }
        registry
    }

    /// Loads defaults from a JSON object file, e.g. `{"cmap": "gray", "retries": 5}`.
    ///
    /// Nested values are rejected; defaults are scalars by construction.
    pub fn from_json_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let parsed: serde_json::Value = serde_json::from_str(&raw)?;
        let object = parsed.as_object().ok_or_else(|| DasError::ParseError {
            message: format!("Registry file '{}' is not a JSON object", path.display()),
        })?;

        let mut registry = Self::new();
        for (name, value) in object {
            let value = ParamValue::from_json(value).ok_or_else(|| DasError::ParseError {
                message: format!("Registry entry '{}' is not a scalar", name),
            })?;
            registry.values.insert(name.clone(), value);
        }
        Ok(registry)
    }
}

/// Fully populated, validated parameter set for one call
///
/// Contains exactly one entry per declaration, each satisfying its declared
/// constraint. The set is owned by the invocation and offers no mutators.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    values: HashMap<String, ParamValue>,
}

impl ResolvedParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(ParamValue::as_bool)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(ParamValue::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(ParamValue::as_float)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(ParamValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Produces a validated parameter set for a single call.
///
/// For each declaration, in declaration order, the value comes from the
/// first available source: the caller's arguments, the registry entry with
/// the same name, then the declaration's fallback. A parameter with no
/// source at all fails with [`DasError::MissingParameter`]. Every resolved
/// value is then checked against the declaration's constraint.
///
/// Pure over its inputs; resolving the same inputs twice yields the same set.
pub fn resolve(
    args: &CallArgs,
    specs: &[ParamSpec],
    registry: &DefaultRegistry,
) -> Result<ResolvedParams> {
    let mut values = HashMap::with_capacity(specs.len());

    for spec in specs {
        let value = args
            .get(&spec.name)
            .or_else(|| registry.get(&spec.name))
            .or(spec.fallback.as_ref())
            .ok_or_else(|| DasError::MissingParameter {
                param: spec.name.clone(),
            })?;

        let value = coerce(value, &spec.constraint);
        validate(&spec.name, &value, &spec.constraint)?;
        values.insert(spec.name.clone(), value);
    }

    Ok(ResolvedParams { values })
}

/// Widening coercions: integers are accepted where floats or strings are
/// declared; nothing else converts implicitly.
fn coerce(value: &ParamValue, constraint: &Constraint) -> ParamValue {
    if let (ParamValue::Int(v), Constraint::Type(tag)) = (value, constraint) {
        match tag {
            TypeTag::Float => return ParamValue::Float(*v as f64),
            TypeTag::Str => return ParamValue::Str(v.to_string()),
            _ => {}
        }
    }
    value.clone()
}

/// Checks one resolved value against its declared constraint.
pub fn validate(param: &str, value: &ParamValue, constraint: &Constraint) -> Result<()> {
    match constraint {
        Constraint::Type(expected) => {
            if value.type_tag() != *expected {
                return Err(DasError::TypeMismatch {
                    param: param.to_string(),
                    expected: expected.to_string(),
                    received: format!("{} ('{}')", value.type_tag(), value),
                });
            }
        }
        Constraint::Choice(allowed) => {
            if !allowed.contains(value) {
                return Err(DasError::InvalidChoice {
                    param: param.to_string(),
                    received: value.to_string(),
                    allowed: allowed.iter().map(|v| v.to_string()).collect(),
                });
            }
        }
        Constraint::Range { min, max } => {
            let numeric = value.as_float().ok_or_else(|| DasError::TypeMismatch {
                param: param.to_string(),
                expected: "numeric".to_string(),
                received: format!("{} ('{}')", value.type_tag(), value),
            })?;
            if numeric < *min || numeric > *max {
                return Err(DasError::OutOfRange {
                    param: param.to_string(),
                    received: numeric,
                    min: *min,
                    max: *max,
                });
            }
        }
    }
    Ok(())
}
