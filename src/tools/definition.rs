//! Tool descriptors and parameter schemas
//!
//! Descriptors are immutable once the catalog is built. Each one also checks
//! an incoming parameter object against its declared parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{McpError, Result};

/// JSON type a parameter must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Check if a JSON value has this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// Declared parameter of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Element type for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ParamType>,
}

impl ParamSpec {
    /// Create an optional parameter
    pub fn new(param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            description: description.into(),
            required: false,
            default: None,
            items: None,
        }
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the advertised default
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Set the array element type
    pub fn with_items(mut self, items: ParamType) -> Self {
        self.items = Some(items);
        self
    }

    fn check(&self, name: &str, value: &Value) -> Result<()> {
        if !self.param_type.matches(value) {
            return Err(McpError::InvalidParameters(format!(
                "'{}' must be {}, got {}",
                name,
                self.param_type.as_str(),
                json_type(value)
            )));
        }
        if let (Some(items), Some(elements)) = (self.items, value.as_array())
            && let Some(pos) = elements.iter().position(|e| !items.matches(e))
        {
            return Err(McpError::InvalidParameters(format!(
                "'{}[{}]' must be {}",
                name,
                pos,
                items.as_str()
            )));
        }
        Ok(())
    }
}

/// A named tool and its parameter schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: BTreeMap<String, ParamSpec>,
}

impl ToolDescriptor {
    /// Create a descriptor with no parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.parameters.insert(name.into(), spec);
        self
    }

    /// Names of the required parameters
    pub fn required_params(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Check a parameter object against the declared parameters.
    ///
    /// `null` counts as an empty object. Undeclared keys are ignored; a
    /// declared key holding `null` counts as absent.
    pub fn validate(&self, params: &Value) -> Result<Map<String, Value>> {
        let object = match params {
            Value::Null => return self.validate_object(Map::new()),
            Value::Object(map) => map.clone(),
            other => {
                return Err(McpError::InvalidParameters(format!(
                    "parameters for '{}' must be an object, got {}",
                    self.name,
                    json_type(other)
                )));
            }
        };
        self.validate_object(object)
    }

    fn validate_object(&self, object: Map<String, Value>) -> Result<Map<String, Value>> {
        for (name, spec) in &self.parameters {
            match object.get(name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(McpError::InvalidParameters(format!(
                        "missing required parameter '{}' for '{}'",
                        name, self.name
                    )));
                }
                None | Some(Value::Null) => {}
                Some(value) => spec.check(name, value)?,
            }
        }
        Ok(object)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new("write_code", "Writes a file")
            .with_param("title", ParamSpec::new(ParamType::String, "File name").required())
            .with_param("files", ParamSpec::new(ParamType::Array, "Paths").with_items(ParamType::String))
            .with_param("trials", ParamSpec::new(ParamType::Integer, "Count").with_default(json!(50)))
    }

    #[test]
    fn test_param_type_matches() {
        assert!(ParamType::Integer.matches(&json!(3)));
        assert!(!ParamType::Integer.matches(&json!(3.5)));
        assert!(ParamType::Number.matches(&json!(3)));
        assert!(ParamType::String.matches(&json!("x")));
        assert!(!ParamType::Object.matches(&json!([])));
    }

    #[test]
    fn test_descriptor_serialization() {
        let value = serde_json::to_value(descriptor()).unwrap();
        assert_eq!(value["name"], "write_code");
        assert_eq!(value["parameters"]["title"]["type"], "string");
        assert_eq!(value["parameters"]["title"]["required"], true);
        assert_eq!(value["parameters"]["files"]["items"], "string");
        assert_eq!(value["parameters"]["trials"]["default"], 50);
        assert!(value["parameters"]["title"].get("default").is_none());
    }

    #[test]
    fn test_validate_accepts_valid_params() {
        let params = json!({"title": "a.py", "files": ["a.py"], "extra": true});
        let map = descriptor().validate(&params).unwrap();
        assert_eq!(map["title"], "a.py");
    }

    #[test]
    fn test_validate_missing_required() {
        let err = descriptor().validate(&json!({"files": []})).unwrap_err();
        assert!(matches!(err, McpError::InvalidParameters(msg) if msg.contains("title")));
    }

    #[test]
    fn test_validate_null_required_is_missing() {
        assert!(descriptor().validate(&json!({"title": null})).is_err());
    }

    #[test]
    fn test_validate_wrong_type() {
        let err = descriptor().validate(&json!({"title": 5})).unwrap_err();
        assert!(matches!(err, McpError::InvalidParameters(msg) if msg.contains("must be string")));
    }

    #[test]
    fn test_validate_array_items() {
        let err = descriptor()
            .validate(&json!({"title": "a", "files": ["a", 2]}))
            .unwrap_err();
        assert!(matches!(err, McpError::InvalidParameters(msg) if msg.contains("files[1]")));
    }

    #[test]
    fn test_validate_null_params() {
        let optional = ToolDescriptor::new("optimize", "Tune")
            .with_param("trials", ParamSpec::new(ParamType::Integer, "Count"));
        assert!(optional.validate(&Value::Null).unwrap().is_empty());
        assert!(descriptor().validate(&Value::Null).is_err());
    }

    #[test]
    fn test_validate_non_object() {
        assert!(matches!(
            descriptor().validate(&json!([1, 2])),
            Err(McpError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_required_params() {
        assert_eq!(descriptor().required_params(), vec!["title"]);
    }
}
