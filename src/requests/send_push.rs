use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Validation rules for `POST /api/send`.
static SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema = json!({
        "type": "object",
        "required": ["title", "body", "fcm_tokens"],
        "properties": {
            "title": { "type": "string", "minLength": 1 },
            "body": { "type": "string", "minLength": 1 },
            "fcm_tokens": {
                "type": "array",
                "items": { "type": "string" },
                "minItems": 1
            },
            "data": {
                "type": "object",
                "additionalProperties": { "type": "string" }
            }
        },
        "additionalProperties": false
    });
    jsonschema::validator_for(&schema).expect("request schema is valid")
});

/// A validated push notification request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SendPushRequest {
    pub title: String,
    pub body: String,
    pub fcm_tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
}

/// One cleaned message per offending field, every violation collected in
/// a single pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    fn insert(&mut self, field: String, message: String) {
        self.0.entry(field).or_insert(message);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl SendPushRequest {
    /// Check an arbitrary JSON payload against the request schema.
    ///
    /// Returns the typed request on success, otherwise every schema
    /// violation keyed by field name.
    pub fn validate(payload: &Value) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for error in SCHEMA.iter_errors(payload) {
            // Unknown top-level fields are rejected, one error per key.
            if error.instance_path.to_string().is_empty() {
                if let ValidationErrorKind::AdditionalProperties { unexpected } = &error.kind {
                    for key in unexpected {
                        errors.insert(key.clone(), format!("{} is not allowed", key));
                    }
                    continue;
                }
            }
            let (field, message) = describe(&error);
            errors.insert(field, message);
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut request: SendPushRequest = match serde_json::from_value(payload.clone()) {
            Ok(request) => request,
            Err(err) => {
                // Schema passed but the typed decode did not; report it
                // against the whole request rather than panicking.
                let mut errors = ValidationErrors::default();
                errors.insert("request".to_string(), err.to_string());
                return Err(errors);
            }
        };
        if matches!(&request.data, Some(map) if map.is_empty()) {
            request.data = None;
        }
        Ok(request)
    }
}

/// Map a schema violation to a field name and a normalized message,
/// stripping the library's own phrasing.
fn describe(error: &ValidationError<'_>) -> (String, String) {
    let path = error.instance_path.to_string();
    let field = path
        .strip_prefix('/')
        .and_then(|p| p.split('/').next())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let nested = field
        .as_deref()
        .map(|f| path.len() > f.len() + 1)
        .unwrap_or(false);

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property.as_str().unwrap_or("request").to_string();
            let message = format!("{} is required", name);
            (name, message)
        }
        ValidationErrorKind::MinLength { .. } => {
            let name = field.unwrap_or_else(|| "request".to_string());
            let message = format!("{} is not allowed to be empty", name);
            (name, message)
        }
        ValidationErrorKind::MinItems { .. } => {
            let name = field.unwrap_or_else(|| "request".to_string());
            let message = format!("{} must contain at least one token", name);
            (name, message)
        }
        ValidationErrorKind::Type { .. } => match field.as_deref() {
            Some("title") => ("title".to_string(), "title must be a string".to_string()),
            Some("body") => ("body".to_string(), "body must be a string".to_string()),
            Some("fcm_tokens") if nested => (
                "fcm_tokens".to_string(),
                "fcm_tokens must contain only strings".to_string(),
            ),
            Some("fcm_tokens") => (
                "fcm_tokens".to_string(),
                "fcm_tokens must be an array".to_string(),
            ),
            Some("data") if nested => (
                "data".to_string(),
                "data values must be strings".to_string(),
            ),
            Some("data") => ("data".to_string(), "data must be an object".to_string()),
            _ => (
                "request".to_string(),
                "request body must be a JSON object".to_string(),
            ),
        },
        _ => {
            let name = field.unwrap_or_else(|| "request".to_string());
            let message = error.to_string().replace('"', "");
            (name, message)
        }
    }
}
