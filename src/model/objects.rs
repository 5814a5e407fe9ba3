use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::common::{generate_id, BaseTypeId, Id};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectData {
    pub id: Id,
    pub type_id: Id,
    pub base_type_id: BaseTypeId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    pub properties: HashMap<String, serde_json::Value>,
    pub change_token: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStream {
    pub file_name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl ContentStream {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            content,
        }
    }

    pub fn length(&self) -> usize {
        self.content.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclEntry {
    pub principal: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Acl {
    pub entries: Vec<AclEntry>,
}

/// Factory for fresh object data records. Owned by the gateway and shared
/// with provider implementations so ids, change tokens and audit fields are
/// produced uniformly.
#[derive(Debug, Default)]
pub struct ObjectFactory;

impl ObjectFactory {
    pub fn new_document(
        &self,
        type_id: &str,
        name: &str,
        parent_id: Option<&str>,
        created_by: &str,
        properties: HashMap<String, serde_json::Value>,
    ) -> ObjectData {
        self.new_object(type_id, BaseTypeId::Document, name, parent_id, created_by, properties)
    }

    pub fn new_folder(
        &self,
        type_id: &str,
        name: &str,
        parent_id: &str,
        created_by: &str,
        properties: HashMap<String, serde_json::Value>,
    ) -> ObjectData {
        self.new_object(
            type_id,
            BaseTypeId::Folder,
            name,
            Some(parent_id),
            created_by,
            properties,
        )
    }

    fn new_object(
        &self,
        type_id: &str,
        base_type_id: BaseTypeId,
        name: &str,
        parent_id: Option<&str>,
        created_by: &str,
        properties: HashMap<String, serde_json::Value>,
    ) -> ObjectData {
        let now = Utc::now();
        ObjectData {
            id: generate_id(),
            type_id: type_id.to_string(),
            base_type_id,
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
            properties,
            change_token: generate_id(),
            created_by: created_by.to_string(),
            created_at: now,
            updated_by: created_by.to_string(),
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_produces_unique_ids_and_audit_fields() {
        let factory = ObjectFactory;
        let a = factory.new_document("cmis:document", "a.txt", Some("root"), "alice", HashMap::new());
        let b = factory.new_document("cmis:document", "b.txt", None, "alice", HashMap::new());
        assert_ne!(a.id, b.id);
        assert_ne!(a.change_token, b.change_token);
        assert_eq!(a.base_type_id, BaseTypeId::Document);
        assert_eq!(a.parent_id.as_deref(), Some("root"));
        assert!(b.parent_id.is_none());
        assert_eq!(a.created_by, "alice");
        assert_eq!(a.created_at, a.updated_at);
    }
}
