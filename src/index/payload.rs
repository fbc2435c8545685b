//! Payload schema for index points

use crate::models::SourceKind;
use qdrant_client::qdrant::Value as QdrantValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Payload stored with each chunk in the vector index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Owning document id
    pub doc_id: String,

    /// Document title
    pub title: String,

    /// The chunk text itself
    pub text: String,

    /// "corpus" or "web"
    pub source_type: String,

    /// Canonical URL for web documents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Originating collection name for corpus documents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// Publish timestamp, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,

    /// Chunk index within the document (0-based, contiguous)
    pub chunk_index: i64,

    /// Total chunks produced for the document
    pub total_chunks: i64,

    /// Blake3 hash of the chunk text
    pub content_hash: String,

    /// When this chunk was indexed
    pub updated_at: String,

    /// Residual document metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ChunkPayload {
    /// Deduplication key for corpus hits: `doc_id#chunk_index`
    pub fn identity(&self) -> String {
        format!("{}#{}", self.doc_id, self.chunk_index)
    }

    pub fn source_kind(&self) -> Option<SourceKind> {
        match self.source_type.as_str() {
            "corpus" => Some(SourceKind::Corpus),
            "web" => Some(SourceKind::Web),
            _ => None,
        }
    }

    /// Convert to the Qdrant payload format
    pub fn to_qdrant_payload(&self) -> HashMap<String, QdrantValue> {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (k, qdrant_value_from_json(v)))
                .collect(),
            _ => HashMap::new(),
        }
    }
}

impl From<Map<String, Value>> for ChunkPayload {
    fn from(map: Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(map)).unwrap_or_default()
    }
}

/// Convert a serde_json value to a Qdrant value
pub fn qdrant_value_from_json(v: Value) -> QdrantValue {
    use qdrant_client::qdrant::value::Kind;

    let kind = match v {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Kind::IntegerValue(i)
            } else {
                Kind::DoubleValue(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => Kind::StringValue(s),
        Value::Array(items) => Kind::ListValue(qdrant_client::qdrant::ListValue {
            values: items.into_iter().map(qdrant_value_from_json).collect(),
        }),
        Value::Object(map) => Kind::StructValue(qdrant_client::qdrant::Struct {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, qdrant_value_from_json(v)))
                .collect(),
        }),
    };

    QdrantValue { kind: Some(kind) }
}

/// Convert a Qdrant value to a serde_json value
pub fn json_from_qdrant_value(v: QdrantValue) -> Value {
    use qdrant_client::qdrant::value::Kind;

    match v.kind {
        Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(json_from_qdrant_value).collect())
        }
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}
