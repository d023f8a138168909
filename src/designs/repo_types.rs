use mongodb::bson::{Bson, Document};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Field holding the owner's email on a design document.
pub const OWNER_FIELD: &str = "userEmail";

/// A design document as stored; the payload is opaque to this service.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignRecord(pub Document);

impl Serialize for DesignRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        document_to_json(&self.0).serialize(serializer)
    }
}

pub fn document_to_json(doc: &Document) -> Value {
    Value::Object(
        doc.iter()
            .map(|(k, v)| (k.clone(), bson_to_json(v)))
            .collect::<Map<_, _>>(),
    )
}

/// ObjectIds become hex strings and dates RFC 3339 strings; everything else
/// uses relaxed extended JSON.
pub fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::from(dt.timestamp_millis()),
        },
        Bson::Document(doc) => document_to_json(doc),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        other => other.clone().into_relaxed_extjson(),
    }
}
