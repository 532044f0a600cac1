use serde_json::{json, Map, Value};

use super::ToolError;
use crate::qdrant::{PointId, PointStruct};

/// Expected shape of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    String,
    Integer {
        default: Option<u64>,
    },
    Number {
        default: Option<f64>,
    },
    Choice {
        options: &'static [&'static str],
        default: &'static str,
    },
    Object,
    /// Array of numbers.
    Vector,
    /// Array of point ids.
    Ids,
    /// Array of `{id, vector, payload}` objects.
    Records,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }

    fn schema(&self) -> Value {
        let mut schema = match self.kind {
            ParamKind::String => json!({ "type": "string" }),
            ParamKind::Integer { default } => {
                let mut s = json!({ "type": "integer" });
                if let Some(default) = default {
                    s["default"] = json!(default);
                }
                s
            }
            ParamKind::Number { default } => {
                let mut s = json!({ "type": "number" });
                if let Some(default) = default {
                    s["default"] = json!(default);
                }
                s
            }
            ParamKind::Choice { options, default } => {
                json!({ "type": "string", "enum": options, "default": default })
            }
            ParamKind::Object => json!({ "type": "object" }),
            ParamKind::Vector => json!({ "type": "array", "items": { "type": "number" } }),
            ParamKind::Ids => json!({ "type": "array", "items": { "type": "string" } }),
            ParamKind::Records => json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {
                            "type": "string",
                            "description": "Unique identifier for the vector"
                        },
                        "vector": {
                            "type": "array",
                            "items": { "type": "number" },
                            "description": "Vector data"
                        },
                        "payload": {
                            "type": "object",
                            "description": "Metadata payload"
                        }
                    },
                    "required": ["id", "vector"]
                }
            }),
        };
        schema["description"] = json!(self.description);
        schema
    }
}

/// JSON schema object for a parameter list, as advertised in `tools/list`.
pub fn input_schema(specs: &[ParamSpec]) -> Map<String, Value> {
    let properties: Map<String, Value> = specs
        .iter()
        .map(|spec| (spec.name.to_string(), spec.schema()))
        .collect();
    let required: Vec<&str> = specs
        .iter()
        .filter(|spec| spec.required)
        .map(|spec| spec.name)
        .collect();

    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    schema.insert("required".to_string(), json!(required));
    schema
}

fn invalid(name: &str, reason: impl Into<String>) -> ToolError {
    ToolError::InvalidParameter {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn coerce_string(name: &str, value: &Value) -> Result<String, ToolError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(invalid(name, "expected a string")),
    }
}

fn coerce_positive_integer(name: &str, value: &Value) -> Result<u64, ToolError> {
    let n = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n > 0 => Ok(n),
        _ => Err(invalid(name, "expected a positive integer")),
    }
}

fn coerce_number(name: &str, value: &Value) -> Result<f32, ToolError> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.map(|f| f as f32)
        .filter(|f| f.is_finite())
        .ok_or_else(|| invalid(name, "expected a number"))
}

fn coerce_vector(name: &str, value: &Value) -> Result<Vec<f32>, ToolError> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(name, "expected an array of numbers"))?;
    if items.is_empty() {
        return Err(invalid(name, "vector must not be empty"));
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let f = item
                .as_f64()
                .ok_or_else(|| invalid(name, format!("element {i} is not a number")))?
                as f32;
            if !f.is_finite() {
                return Err(invalid(name, format!("element {i} is out of range")));
            }
            Ok(f)
        })
        .collect()
}

/// Digit-only strings become integer ids; other strings must be UUIDs.
fn coerce_point_id(name: &str, value: &Value) -> Result<PointId, ToolError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(PointId::Num)
            .ok_or_else(|| invalid(name, "integer ids must be unsigned")),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => s
            .parse::<u64>()
            .map(PointId::Num)
            .map_err(|_| invalid(name, "integer id out of range")),
        Value::String(s) => uuid::Uuid::parse_str(s)
            .map(|_| PointId::Uuid(s.clone()))
            .map_err(|_| invalid(name, format!("`{s}` is neither an unsigned integer nor a UUID"))),
        _ => Err(invalid(name, "expected an unsigned integer or UUID")),
    }
}

/// Validated arguments of a single invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: Map<String, Value>,
}

impl Params {
    /// Checks that every required parameter is present and not `null`.
    pub fn validate(
        specs: &[ParamSpec],
        args: Option<Map<String, Value>>,
    ) -> Result<Self, ToolError> {
        let values = args.unwrap_or_default();
        for spec in specs.iter().filter(|spec| spec.required) {
            match values.get(spec.name) {
                None | Some(Value::Null) => {
                    return Err(ToolError::MissingParameter(spec.name.to_string()))
                }
                Some(_) => {}
            }
        }
        Ok(Self { values })
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    fn require(&self, name: &str) -> Result<&Value, ToolError> {
        self.get(name)
            .ok_or_else(|| ToolError::MissingParameter(name.to_string()))
    }

    pub fn string(&self, name: &str) -> Result<String, ToolError> {
        coerce_string(name, self.require(name)?)
    }

    pub fn positive_integer(&self, name: &str) -> Result<u64, ToolError> {
        coerce_positive_integer(name, self.require(name)?)
    }

    pub fn opt_positive_integer(&self, name: &str) -> Result<Option<u64>, ToolError> {
        self.get(name)
            .map(|v| coerce_positive_integer(name, v))
            .transpose()
    }

    pub fn opt_number(&self, name: &str) -> Result<Option<f32>, ToolError> {
        self.get(name).map(|v| coerce_number(name, v)).transpose()
    }

    pub fn opt_object(&self, name: &str) -> Result<Option<Value>, ToolError> {
        match self.get(name) {
            None => Ok(None),
            Some(v @ Value::Object(_)) => Ok(Some(v.clone())),
            Some(_) => Err(invalid(name, "expected an object")),
        }
    }

    /// Returns the canonical spelling of the chosen option.
    /// Index into `options` of the case-insensitive match, or `default`.
    pub fn choice(&self, name: &str, options: &[&str], default: usize) -> Result<usize, ToolError> {
        let Some(value) = self.get(name) else {
            return Ok(default);
        };
        let s = coerce_string(name, value)?;
        options
            .iter()
            .position(|option| option.eq_ignore_ascii_case(&s))
            .ok_or_else(|| invalid(name, format!("expected one of {}", options.join(", "))))
    }

    pub fn vector(&self, name: &str) -> Result<Vec<f32>, ToolError> {
        coerce_vector(name, self.require(name)?)
    }

    pub fn ids(&self, name: &str) -> Result<Vec<PointId>, ToolError> {
        let items = self
            .require(name)?
            .as_array()
            .ok_or_else(|| invalid(name, "expected an array of ids"))?;
        items
            .iter()
            .enumerate()
            .map(|(i, id)| coerce_point_id(&format!("{name}[{i}]"), id))
            .collect()
    }

    pub fn records(&self, name: &str) -> Result<Vec<PointStruct>, ToolError> {
        let items = self
            .require(name)?
            .as_array()
            .ok_or_else(|| invalid(name, "expected an array of objects"))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let path = format!("{name}[{i}]");
                let record = item
                    .as_object()
                    .ok_or_else(|| invalid(&path, "expected an object"))?;
                let field = |field: &str| {
                    record
                        .get(field)
                        .filter(|v| !v.is_null())
                        .ok_or_else(|| ToolError::MissingParameter(format!("{path}.{field}")))
                };
                let id = coerce_point_id(&format!("{path}.id"), field("id")?)?;
                let vector = coerce_vector(&format!("{path}.vector"), field("vector")?)?;
                let payload = match record.get("payload") {
                    None | Some(Value::Null) => Map::new(),
                    Some(Value::Object(payload)) => payload.clone(),
                    Some(_) => return Err(invalid(&format!("{path}.payload"), "expected an object")),
                };
                Ok(PointStruct {
                    id,
                    vector,
                    payload,
                })
            })
            .collect()
    }
}
