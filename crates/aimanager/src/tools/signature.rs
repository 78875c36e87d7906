use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use strum_macros::Display;

use super::function::ToolArgs;
use crate::errors::{AgentError, AgentResult};

/// JSON schema type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

/// Maps a Rust type onto the schema type the model sees.
///
/// Anything without a natural JSON counterpart, including [`Value`] itself, is advertised
/// as a string.
pub trait SchemaType {
    fn param_type() -> ParamType;
}

macro_rules! schema_type {
    ($param_type:expr => $($ty:ty),+) => {
        $(impl SchemaType for $ty {
            fn param_type() -> ParamType {
                $param_type
            }
        })+
    };
}

schema_type!(ParamType::Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
schema_type!(ParamType::Number => f32, f64);
schema_type!(ParamType::Boolean => bool);
schema_type!(ParamType::String => String, str, char, Value);

impl<'a> SchemaType for &'a str {
    fn param_type() -> ParamType {
        ParamType::String
    }
}

impl<T: SchemaType> SchemaType for Option<T> {
    fn param_type() -> ParamType {
        T::param_type()
    }
}

impl<T> SchemaType for Vec<T> {
    fn param_type() -> ParamType {
        ParamType::Array
    }
}

impl<T> SchemaType for [T] {
    fn param_type() -> ParamType {
        ParamType::Array
    }
}

impl<T> SchemaType for VecDeque<T> {
    fn param_type() -> ParamType {
        ParamType::Array
    }
}

impl<T, S> SchemaType for HashSet<T, S> {
    fn param_type() -> ParamType {
        ParamType::Array
    }
}

impl<T> SchemaType for BTreeSet<T> {
    fn param_type() -> ParamType {
        ParamType::Array
    }
}

impl<K, V, S> SchemaType for HashMap<K, V, S> {
    fn param_type() -> ParamType {
        ParamType::Object
    }
}

impl<K, V> SchemaType for BTreeMap<K, V> {
    fn param_type() -> ParamType {
        ParamType::Object
    }
}

impl SchemaType for Map<String, Value> {
    fn param_type() -> ParamType {
        ParamType::Object
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Bound by position or by keyword
    Named,
    /// Collects surplus positional arguments
    VarPositional,
    /// Collects surplus keyword arguments
    VarKeyword,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<Value>,
    pub kind: ParamKind,
}

impl Param {
    pub fn is_required(&self) -> bool {
        self.kind == ParamKind::Named && self.default.is_none()
    }
}

/// The declared parameter list of a tool, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// A required parameter
    pub fn arg<T: SchemaType + ?Sized>(self, name: &str) -> Self {
        self.push(name, T::param_type(), None, ParamKind::Named)
    }

    /// An optional parameter with a default value
    pub fn arg_with_default<T: SchemaType + ?Sized>(
        self,
        name: &str,
        default: impl Into<Value>,
    ) -> Self {
        self.push(name, T::param_type(), Some(default.into()), ParamKind::Named)
    }

    /// A required parameter without a type annotation
    pub fn untyped(self, name: &str) -> Self {
        self.push(name, ParamType::String, None, ParamKind::Named)
    }

    pub fn var_args(self, name: &str) -> Self {
        self.push(name, ParamType::Array, None, ParamKind::VarPositional)
    }

    pub fn var_kwargs(self, name: &str) -> Self {
        self.push(name, ParamType::Object, None, ParamKind::VarKeyword)
    }

    fn push(mut self, name: &str, ty: ParamType, default: Option<Value>, kind: ParamKind) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            ty,
            default,
            kind,
        });
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    fn named(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| p.kind == ParamKind::Named)
    }

    fn has_named(&self, name: &str) -> bool {
        self.named().any(|p| p.name == name)
    }

    pub fn accepts_var_args(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::VarPositional)
    }

    fn is_var_positional(&self, name: &str) -> bool {
        self.params
            .iter()
            .any(|p| p.kind == ParamKind::VarPositional && p.name == name)
    }

    pub fn accepts_var_kwargs(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::VarKeyword)
    }

    /// Checks that the signature is well formed and that every registration default has a
    /// parameter to land on.
    pub(crate) fn validate(&self, defaults: &Map<String, Value>) -> Result<(), String> {
        let mut seen = HashSet::new();
        for param in &self.params {
            if param.name.is_empty() {
                return Err("parameter names must not be empty".to_string());
            }
            if !seen.insert(param.name.as_str()) {
                return Err(format!("duplicate parameter `{}`", param.name));
            }
        }
        for kind in [ParamKind::VarPositional, ParamKind::VarKeyword] {
            if self.params.iter().filter(|p| p.kind == kind).count() > 1 {
                return Err(format!("more than one {:?} parameter", kind));
            }
        }
        if !self.accepts_var_kwargs() {
            if let Some(key) = defaults.keys().find(|key| !self.has_named(key)) {
                return Err(format!("default `{}` does not match any parameter", key));
            }
        }
        Ok(())
    }

    /// Binds call arguments to the declared parameters.
    ///
    /// Positional values fill named parameters in order. Keyword values fill parameters by
    /// name. `fallback` supplies values for anything the caller left out, ahead of the
    /// declared defaults.
    pub fn bind(
        &self,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
        fallback: &Map<String, Value>,
    ) -> AgentResult<ToolArgs> {
        let named: Vec<&Param> = self.named().collect();
        let mut bound = ToolArgs::default();

        let mut positional = args.into_iter();
        for param in &named {
            match positional.next() {
                Some(value) => {
                    bound.values.insert(param.name.clone(), value);
                }
                None => break,
            }
        }
        let overflow: Vec<Value> = positional.collect();
        if !overflow.is_empty() {
            if !self.accepts_var_args() {
                return Err(AgentError::InvalidParameters(format!(
                    "takes {} positional arguments but {} were given",
                    named.len(),
                    named.len() + overflow.len()
                )));
            }
            bound.varargs = overflow;
        }

        for (key, value) in kwargs {
            if self.has_named(&key) {
                if bound.values.contains_key(&key) {
                    return Err(AgentError::InvalidParameters(format!(
                        "got multiple values for argument `{}`",
                        key
                    )));
                }
                bound.values.insert(key, value);
            } else if self.is_var_positional(&key) {
                // The schema advertises the variadic list as an array property
                let items = match value {
                    Value::Array(items) => items,
                    other => {
                        return Err(AgentError::InvalidParameters(format!(
                            "`{}` must be an array, got {}",
                            key, other
                        )))
                    }
                };
                if !bound.varargs.is_empty() {
                    return Err(AgentError::InvalidParameters(format!(
                        "got multiple values for argument `{}`",
                        key
                    )));
                }
                bound.varargs = items;
            } else if self.accepts_var_kwargs() {
                bound.extra.insert(key, value);
            } else {
                return Err(AgentError::InvalidParameters(format!(
                    "unexpected keyword argument `{}`",
                    key
                )));
            }
        }

        for (key, value) in fallback {
            if self.has_named(key) {
                bound.values.entry(key.clone()).or_insert_with(|| value.clone());
            } else if self.accepts_var_kwargs() {
                bound.extra.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        let mut missing = Vec::new();
        for param in named {
            if bound.values.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    bound.values.insert(param.name.clone(), default.clone());
                }
                None => missing.push(param.name.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(AgentError::InvalidParameters(format!(
                "missing required arguments: {}",
                missing.join(", ")
            )));
        }

        Ok(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_type_mapping() {
        assert_eq!(<i64 as SchemaType>::param_type(), ParamType::Integer);
        assert_eq!(<u8 as SchemaType>::param_type(), ParamType::Integer);
        assert_eq!(<f64 as SchemaType>::param_type(), ParamType::Number);
        assert_eq!(<bool as SchemaType>::param_type(), ParamType::Boolean);
        assert_eq!(<Vec<String> as SchemaType>::param_type(), ParamType::Array);
        assert_eq!(<HashMap<String, i32> as SchemaType>::param_type(), ParamType::Object);
        assert_eq!(<Option<f32> as SchemaType>::param_type(), ParamType::Number);
        assert_eq!(<str as SchemaType>::param_type(), ParamType::String);
        assert_eq!(<Value as SchemaType>::param_type(), ParamType::String);
    }

    #[test]
    fn test_bind_positional_and_keyword() {
        let signature = Signature::new().arg::<i64>("x").arg_with_default::<String>("y", "d");

        let bound = signature.bind(vec![json!(42)], Map::new(), &Map::new()).unwrap();
        assert_eq!(bound.value("x"), Some(&json!(42)));
        assert_eq!(bound.value("y"), Some(&json!("d")));

        let bound = signature
            .bind(vec![json!(42)], object(json!({"y": "test"})), &Map::new())
            .unwrap();
        assert_eq!(bound.value("y"), Some(&json!("test")));
    }

    #[test]
    fn test_bind_rejects_bad_calls() {
        let signature = Signature::new().arg::<i64>("x");

        let err = signature.bind(vec![], Map::new(), &Map::new()).unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameters(msg) if msg.contains("x")));

        let err = signature
            .bind(vec![json!(1), json!(2)], Map::new(), &Map::new())
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameters(_)));

        let err = signature
            .bind(vec![json!(1)], object(json!({"x": 2})), &Map::new())
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameters(msg) if msg.contains("multiple")));

        let err = signature
            .bind(vec![], object(json!({"x": 1, "z": 2})), &Map::new())
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameters(msg) if msg.contains("`z`")));
    }

    #[test]
    fn test_bind_variadics() {
        let signature = Signature::new()
            .arg::<String>("first")
            .var_args("rest")
            .var_kwargs("options");

        let bound = signature
            .bind(
                vec![json!("a"), json!("b"), json!("c")],
                object(json!({"verbose": true})),
                &Map::new(),
            )
            .unwrap();
        assert_eq!(bound.value("first"), Some(&json!("a")));
        assert_eq!(bound.varargs(), &[json!("b"), json!("c")]);
        assert_eq!(bound.extra().get("verbose"), Some(&json!(true)));
    }

    #[test]
    fn test_fallback_never_overrides_caller() {
        let signature = Signature::new().arg::<String>("chat_id").arg::<String>("text");
        let fallback = object(json!({"chat_id": "injected"}));

        let bound = signature
            .bind(vec![], object(json!({"text": "hi"})), &fallback)
            .unwrap();
        assert_eq!(bound.value("chat_id"), Some(&json!("injected")));

        let bound = signature
            .bind(vec![json!("explicit"), json!("hi")], Map::new(), &fallback)
            .unwrap();
        assert_eq!(bound.value("chat_id"), Some(&json!("explicit")));
    }

    #[test]
    fn test_validate() {
        assert!(Signature::new().arg::<i64>("a").arg::<i64>("a").validate(&Map::new()).is_err());
        assert!(Signature::new().var_args("a").var_args("b").validate(&Map::new()).is_err());
        assert!(Signature::new()
            .arg::<i64>("a")
            .validate(&object(json!({"b": 1})))
            .is_err());
        assert!(Signature::new()
            .var_kwargs("rest")
            .validate(&object(json!({"b": 1})))
            .is_ok());
    }
}
