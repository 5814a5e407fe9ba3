use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::common::{BaseTypeId, Id, PropertyType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub id: Id,
    pub query_name: String,
    pub property_type: PropertyType,
    #[serde(default)]
    pub required: bool,
}

impl PropertyDefinition {
    pub fn new(id: impl Into<Id>, query_name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            id: id.into(),
            query_name: query_name.into(),
            property_type,
            required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub id: Id,
    pub query_name: String,
    pub display_name: String,
    pub base_id: BaseTypeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    /// Property definitions keyed by property id.
    pub properties: HashMap<Id, PropertyDefinition>,
}

impl TypeDefinition {
    pub fn property(&self, property_id: &str) -> Option<&PropertyDefinition> {
        self.properties.get(property_id)
    }

    pub fn property_by_query_name(&self, query_name: &str) -> Option<&PropertyDefinition> {
        self.properties.values().find(|p| p.query_name == query_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub id: Id,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub vendor_name: String,
    pub product_name: String,
    pub product_version: String,
    pub root_folder_id: Id,
    pub cmis_version_supported: String,
}
