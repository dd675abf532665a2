use crate::common::{DOC_ID, FIELD_SEPARATOR, UNDEFINED_GROUP};
use crate::errors::{ErrorKind, FolioError, FolioResult};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::fmt::{Display, Formatter};

/// A schemaless JSON document body. Key order is preserved.
pub type Document = Map<String, Value>;

type FieldVec<'a> = SmallVec<[&'a str; 8]>;

/// Identifier of a document inside a collection.
///
/// Ids are always strings. Integer ids are converted to their decimal form,
/// so `DocumentId::from(42)` and `DocumentId::from("42")` address the same
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub(crate) fn validate(&self) -> FolioResult<()> {
        if self.0.is_empty() {
            log::error!("Document id cannot be empty");
            return Err(FolioError::new(
                "Document id cannot be empty",
                ErrorKind::ValidationError,
            ));
        }
        Ok(())
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        DocumentId(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        DocumentId(value)
    }
}

impl From<&String> for DocumentId {
    fn from(value: &String) -> Self {
        DocumentId(value.clone())
    }
}

impl From<&DocumentId> for DocumentId {
    fn from(value: &DocumentId) -> Self {
        value.clone()
    }
}

macro_rules! document_id_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for DocumentId {
                fn from(value: $t) -> Self {
                    DocumentId(value.to_string())
                }
            }
        )*
    };
}

document_id_from_integer!(i32, i64, u32, u64, usize);

/// Returns the body as a document, rejecting anything that is not a JSON
/// object.
pub(crate) fn into_document(body: Value) -> FolioResult<Document> {
    match body {
        Value::Object(map) => Ok(map),
        other => {
            log::error!("Document body must be a JSON object, found {}", type_name(&other));
            Err(FolioError::new(
                &format!("Document body must be a JSON object, found {}", type_name(&other)),
                ErrorKind::ValidationError,
            ))
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Builds the outward view of a stored body: `id` first, then the body keys.
/// A body key named `id` replaces the attached value but keeps the first slot.
pub fn with_id(id: &str, body: &Document) -> Document {
    let mut document = Map::with_capacity(body.len() + 1);
    document.insert(DOC_ID.to_string(), Value::String(id.to_string()));
    for (key, value) in body {
        document.insert(key.clone(), value.clone());
    }
    document
}

/// Resolves a dotted field path such as `"address.city"` or `"items.0.sku"`.
///
/// Objects are walked by key, arrays by numeric segment.
pub fn resolve_field<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let segments: FieldVec = path.split(FIELD_SEPARATOR).collect();
    let (first, rest) = segments.split_first()?;
    let mut current = document.get(*first)?;
    for segment in rest {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => {
                let index = segment.parse::<usize>().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Converts a field value into the string key used by a group stage.
///
/// A missing field groups under `"undefined"`. Integral numbers print without
/// a fraction, arrays join their elements with `,` and objects all collapse
/// into `"[object Object]"`.
pub fn group_key(value: Option<&Value>) -> String {
    match value {
        None => UNDEFINED_GROUP.to_string(),
        Some(value) => coerce_to_string(value),
    }
}

fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_to_string(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
            format!("{}", f as i128)
        }
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
