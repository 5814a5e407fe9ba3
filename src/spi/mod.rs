pub mod memory;

pub use memory::InMemoryProvider;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CmisError;
use crate::model::{Acl, ContentStream, Id, ObjectData, RepositoryInfo, TypeDefinition};

/// Repository-level reads: descriptors and the type system.
#[async_trait]
pub trait RepositoryCapability: Send + Sync {
    async fn get_repository_infos(&self) -> Result<Vec<RepositoryInfo>, CmisError>;
    async fn get_repository_info(&self, repository_id: &str) -> Result<RepositoryInfo, CmisError>;
    async fn get_type_definition(
        &self,
        repository_id: &str,
        type_id: &str,
    ) -> Result<TypeDefinition, CmisError>;
    /// Children of `type_id`, or the base types when `type_id` is `None`.
    async fn get_type_children(
        &self,
        repository_id: &str,
        type_id: Option<&str>,
    ) -> Result<Vec<TypeDefinition>, CmisError>;
    async fn get_type_descendants(
        &self,
        repository_id: &str,
        type_id: Option<&str>,
        depth: i64,
    ) -> Result<Vec<TypeDefinition>, CmisError>;
}

#[async_trait]
pub trait NavigationCapability: Send + Sync {
    async fn get_children(
        &self,
        repository_id: &str,
        folder_id: &str,
    ) -> Result<Vec<ObjectData>, CmisError>;
    async fn get_descendants(
        &self,
        repository_id: &str,
        folder_id: &str,
        depth: i64,
    ) -> Result<Vec<ObjectData>, CmisError>;
    async fn get_folder_tree(
        &self,
        repository_id: &str,
        folder_id: &str,
        depth: i64,
    ) -> Result<Vec<ObjectData>, CmisError>;
    async fn get_object_parents(
        &self,
        repository_id: &str,
        object_id: &str,
    ) -> Result<Vec<ObjectData>, CmisError>;
}

#[async_trait]
pub trait ObjectCapability: Send + Sync {
    async fn get_object(&self, repository_id: &str, object_id: &str)
        -> Result<ObjectData, CmisError>;
    async fn get_content_stream(
        &self,
        repository_id: &str,
        object_id: &str,
    ) -> Result<ContentStream, CmisError>;
    async fn create_document(
        &self,
        repository_id: &str,
        properties: HashMap<String, serde_json::Value>,
        folder_id: Option<&str>,
        content: Option<ContentStream>,
    ) -> Result<ObjectData, CmisError>;
    async fn create_folder(
        &self,
        repository_id: &str,
        properties: HashMap<String, serde_json::Value>,
        folder_id: &str,
    ) -> Result<ObjectData, CmisError>;
    async fn set_content_stream(
        &self,
        repository_id: &str,
        object_id: &str,
        content: ContentStream,
        overwrite: bool,
    ) -> Result<ObjectData, CmisError>;
    async fn delete_object(&self, repository_id: &str, object_id: &str) -> Result<(), CmisError>;
    async fn delete_tree(&self, repository_id: &str, folder_id: &str)
        -> Result<Vec<Id>, CmisError>;
}

#[async_trait]
pub trait DiscoveryCapability: Send + Sync {
    async fn query(
        &self,
        repository_id: &str,
        statement: &str,
    ) -> Result<Vec<ObjectData>, CmisError>;
}

#[async_trait]
pub trait RelationshipCapability: Send + Sync {
    async fn get_object_relationships(
        &self,
        repository_id: &str,
        object_id: &str,
    ) -> Result<Vec<ObjectData>, CmisError>;
}

#[async_trait]
pub trait VersioningCapability: Send + Sync {
    async fn get_all_versions(
        &self,
        repository_id: &str,
        object_id: &str,
    ) -> Result<Vec<ObjectData>, CmisError>;
}

#[async_trait]
pub trait AclCapability: Send + Sync {
    async fn get_acl(&self, repository_id: &str, object_id: &str) -> Result<Acl, CmisError>;
    async fn apply_acl(
        &self,
        repository_id: &str,
        object_id: &str,
        acl: Acl,
    ) -> Result<Acl, CmisError>;
}

#[async_trait]
pub trait MultiFilingCapability: Send + Sync {
    async fn add_object_to_folder(
        &self,
        repository_id: &str,
        object_id: &str,
        folder_id: &str,
    ) -> Result<(), CmisError>;
    async fn remove_object_from_folder(
        &self,
        repository_id: &str,
        object_id: &str,
        folder_id: &str,
    ) -> Result<(), CmisError>;
}

#[async_trait]
pub trait PolicyCapability: Send + Sync {
    async fn apply_policy(
        &self,
        repository_id: &str,
        policy_id: &str,
        object_id: &str,
    ) -> Result<(), CmisError>;
    async fn remove_policy(
        &self,
        repository_id: &str,
        policy_id: &str,
        object_id: &str,
    ) -> Result<(), CmisError>;
    async fn get_applied_policies(
        &self,
        repository_id: &str,
        object_id: &str,
    ) -> Result<Vec<ObjectData>, CmisError>;
}

/// A resolved service-provider session: one per gateway, resolved at most
/// once, shared read-only afterwards. Capability accessors hand out shared
/// handles; cache and lifecycle hooks are synchronous by contract so the
/// gateway may call them inside its locked sections.
pub trait ProviderSession: Send + Sync {
    fn repository(&self) -> Arc<dyn RepositoryCapability>;
    fn navigation(&self) -> Arc<dyn NavigationCapability>;
    fn object(&self) -> Arc<dyn ObjectCapability>;
    fn discovery(&self) -> Arc<dyn DiscoveryCapability>;
    fn relationship(&self) -> Arc<dyn RelationshipCapability>;
    fn versioning(&self) -> Arc<dyn VersioningCapability>;
    fn acl(&self) -> Arc<dyn AclCapability>;
    fn multi_filing(&self) -> Arc<dyn MultiFilingCapability>;
    fn policy(&self) -> Arc<dyn PolicyCapability>;

    fn clear_all_caches(&self);
    fn clear_repository_cache(&self, repository_id: &str);
    fn close(&self);
}
