use std::sync::Arc;

use crate::binding::gateway::BindingInner;
use crate::error::CmisError;
use crate::model::{RepositoryInfo, TypeDefinition};

/// Repository service with a read-through cache in front of the provider.
/// Single-item lookups populate the cache on miss; list operations always
/// hit the provider and refresh whatever they return.
pub struct RepositoryService {
    inner: Arc<BindingInner>,
}

impl RepositoryService {
    pub(crate) fn new(inner: Arc<BindingInner>) -> Self {
        Self { inner }
    }

    pub async fn get_repository_infos(&self) -> Result<Vec<Arc<RepositoryInfo>>, CmisError> {
        let repository = self.inner.provider_session()?.repository();
        let infos: Vec<Arc<RepositoryInfo>> = repository
            .get_repository_infos()
            .await?
            .into_iter()
            .map(Arc::new)
            .collect();
        let mut caches = self.inner.caches.write();
        for info in &infos {
            caches.repository_info.put(info.clone());
        }
        Ok(infos)
    }

    pub async fn get_repository_info(
        &self,
        repository_id: &str,
    ) -> Result<Arc<RepositoryInfo>, CmisError> {
        if let Some(info) = self.inner.caches.read().repository_info.get(repository_id) {
            return Ok(info);
        }
        let repository = self.inner.provider_session()?.repository();
        let info = Arc::new(repository.get_repository_info(repository_id).await?);
        let mut caches = self.inner.caches.write();
        if let Some(cached) = caches.repository_info.get(repository_id) {
            return Ok(cached);
        }
        caches.repository_info.put(info.clone());
        Ok(info)
    }

    pub async fn get_type_definition(
        &self,
        repository_id: &str,
        type_id: &str,
    ) -> Result<Arc<TypeDefinition>, CmisError> {
        if let Some(type_def) = self
            .inner
            .caches
            .read()
            .type_definitions
            .get(repository_id, type_id)
        {
            return Ok(type_def);
        }
        let repository = self.inner.provider_session()?.repository();
        let type_def = Arc::new(repository.get_type_definition(repository_id, type_id).await?);
        let mut caches = self.inner.caches.write();
        if let Some(cached) = caches.type_definitions.get(repository_id, type_id) {
            return Ok(cached);
        }
        caches.type_definitions.put(repository_id, type_def.clone());
        Ok(type_def)
    }

    pub async fn get_type_children(
        &self,
        repository_id: &str,
        type_id: Option<&str>,
    ) -> Result<Vec<Arc<TypeDefinition>>, CmisError> {
        let repository = self.inner.provider_session()?.repository();
        let types = repository.get_type_children(repository_id, type_id).await?;
        Ok(self.cache_types(repository_id, types))
    }

    pub async fn get_type_descendants(
        &self,
        repository_id: &str,
        type_id: Option<&str>,
        depth: i64,
    ) -> Result<Vec<Arc<TypeDefinition>>, CmisError> {
        let repository = self.inner.provider_session()?.repository();
        let types = repository
            .get_type_descendants(repository_id, type_id, depth)
            .await?;
        Ok(self.cache_types(repository_id, types))
    }

    fn cache_types(
        &self,
        repository_id: &str,
        types: Vec<TypeDefinition>,
    ) -> Vec<Arc<TypeDefinition>> {
        let types: Vec<Arc<TypeDefinition>> = types.into_iter().map(Arc::new).collect();
        let mut caches = self.inner.caches.write();
        for type_def in &types {
            caches.type_definitions.put(repository_id, type_def.clone());
        }
        types
    }
}
