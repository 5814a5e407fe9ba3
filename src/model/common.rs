use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = String;

/// Base object types of the content model. Parsing is strict; unknown wire
/// values are reported to the caller as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseTypeId {
    #[serde(rename = "cmis:document")]
    Document,
    #[serde(rename = "cmis:folder")]
    Folder,
    #[serde(rename = "cmis:relationship")]
    Relationship,
    #[serde(rename = "cmis:policy")]
    Policy,
}

impl BaseTypeId {
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "cmis:document" => Some(BaseTypeId::Document),
            "cmis:folder" => Some(BaseTypeId::Folder),
            "cmis:relationship" => Some(BaseTypeId::Relationship),
            "cmis:policy" => Some(BaseTypeId::Policy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseTypeId::Document => "cmis:document",
            BaseTypeId::Folder => "cmis:folder",
            BaseTypeId::Relationship => "cmis:relationship",
            BaseTypeId::Policy => "cmis:policy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Integer,
    Boolean,
    DateTime,
    Decimal,
    Id,
    Uri,
    Html,
}

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_type_round_trips_wire_values() {
        assert_eq!(BaseTypeId::from_value("cmis:folder"), Some(BaseTypeId::Folder));
        assert_eq!(BaseTypeId::from_value("cmis:secondary"), None);
        assert_eq!(BaseTypeId::Document.as_str(), "cmis:document");

        let json = serde_json::to_string(&BaseTypeId::Document).unwrap();
        assert_eq!(json, "\"cmis:document\"");
    }
}
