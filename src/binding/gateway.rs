use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::binding::auth::{AuthenticationProvider, Credentials};
use crate::binding::params;
use crate::binding::registry::{ProviderFactory, ProviderRegistry};
use crate::binding::repository::RepositoryService;
use crate::error::CmisError;
use crate::model::ObjectFactory;
use crate::session::{RepositoryInfoCache, Session, TypeDefinitionCache};
use crate::spi::{
    AclCapability, DiscoveryCapability, MultiFilingCapability, NavigationCapability,
    ObjectCapability, PolicyCapability, ProviderSession, RelationshipCapability,
    VersioningCapability,
};

/// Configured cache sizes pass through the lenient integer getter; zero or
/// negative values clamp to one entry instead of wrapping on the cast.
fn cache_capacity(configured: i64) -> usize {
    configured.max(1) as usize
}

pub(crate) struct GatewayCaches {
    pub(crate) repository_info: RepositoryInfoCache,
    pub(crate) type_definitions: TypeDefinitionCache,
}

/// Shared core of an open gateway. Service handles and the repository
/// facade hold this directly, so a closed [`Binding`] stops handing out
/// services without invalidating calls already in flight.
pub(crate) struct BindingInner {
    pub(crate) session: Arc<Session>,
    auth_provider: Option<Arc<dyn AuthenticationProvider>>,
    provider_factory: ProviderFactory,
    provider: RwLock<Option<Arc<dyn ProviderSession>>>,
    pub(crate) caches: RwLock<GatewayCaches>,
}

impl BindingInner {
    /// The memoized provider session, resolved during gateway construction.
    /// Every call returns the same instance.
    pub(crate) fn provider_session(&self) -> Result<Arc<dyn ProviderSession>, CmisError> {
        if let Some(provider) = self.provider.read().clone() {
            return Ok(provider);
        }
        let mut slot = self.provider.write();
        if let Some(provider) = slot.clone() {
            return Ok(provider);
        }
        let provider = (self.provider_factory)(&self.session).map_err(|err| {
            CmisError::runtime(format!("Could not create service provider: {}", err))
        })?;
        *slot = Some(provider.clone());
        Ok(provider)
    }

    fn resolved_provider(&self) -> Option<Arc<dyn ProviderSession>> {
        self.provider.read().clone()
    }
}

#[derive(Clone)]
struct BindingHandles {
    inner: Arc<BindingInner>,
    repository_service: Arc<RepositoryService>,
}

/// Client-side gateway to a CMIS service provider. Owns the session state,
/// the caches and the provider session resolved at construction; hands out capability
/// services and the caching repository facade.
pub struct Binding {
    state: RwLock<Option<BindingHandles>>,
    object_factory: Arc<ObjectFactory>,
}

impl Binding {
    pub fn new(
        parameters: HashMap<String, String>,
        registry: &ProviderRegistry,
    ) -> Result<Self, CmisError> {
        if parameters.is_empty() {
            return Err(CmisError::invalid_argument("Session parameters must be set!"));
        }

        let session = Arc::new(Session::new());
        {
            let mut guard = session.write();
            for (key, value) in parameters {
                guard.put(key, value);
            }
        }

        let provider_name = session
            .get_str(params::PROVIDER)
            .ok_or_else(|| CmisError::invalid_argument("Provider must be set!"))?;
        let provider_factory = registry.provider(&provider_name).ok_or_else(|| {
            CmisError::invalid_argument(format!("Unknown provider: {}", provider_name))
        })?;

        let auth_provider = match session.get_str(params::AUTH_PROVIDER) {
            Some(name) => {
                let factory = registry.auth_provider(&name).ok_or_else(|| {
                    CmisError::invalid_argument(format!(
                        "Unknown authentication provider: {}",
                        name
                    ))
                })?;
                let auth_provider = factory().map_err(|err| {
                    CmisError::invalid_argument(format!(
                        "Could not create authentication provider: {}",
                        err
                    ))
                })?;
                auth_provider.set_session(Arc::downgrade(&session));
                Some(auth_provider)
            }
            None => None,
        };

        let caches = GatewayCaches {
            repository_info: RepositoryInfoCache::new(cache_capacity(session.get_int(
                params::CACHE_SIZE_REPOSITORIES,
                params::DEFAULT_CACHE_SIZE_REPOSITORIES,
            ))),
            type_definitions: TypeDefinitionCache::new(cache_capacity(
                session.get_int(params::CACHE_SIZE_TYPES, params::DEFAULT_CACHE_SIZE_TYPES),
            )),
        };

        let inner = Arc::new(BindingInner {
            session,
            auth_provider,
            provider_factory,
            provider: RwLock::new(None),
            caches: RwLock::new(caches),
        });
        // Resolve the provider session up front; a gateway with a broken
        // provider must fail construction, not every later request. The
        // memoized slot serves all subsequent accesses.
        inner.provider_session()?;
        let repository_service = Arc::new(RepositoryService::new(inner.clone()));

        Ok(Self {
            state: RwLock::new(Some(BindingHandles {
                inner,
                repository_service,
            })),
            object_factory: Arc::new(ObjectFactory),
        })
    }

    fn handles(&self) -> Result<BindingHandles, CmisError> {
        self.state
            .read()
            .clone()
            .ok_or_else(|| CmisError::illegal_state("Already closed."))
    }

    /// Available even after the gateway is closed; the factory holds no
    /// session state.
    pub fn object_factory(&self) -> Arc<ObjectFactory> {
        self.object_factory.clone()
    }

    pub fn session(&self) -> Result<Arc<Session>, CmisError> {
        Ok(self.handles()?.inner.session.clone())
    }

    pub fn credentials(&self) -> Result<Option<Credentials>, CmisError> {
        Ok(self
            .handles()?
            .inner
            .auth_provider
            .as_ref()
            .and_then(|p| p.credentials()))
    }

    pub fn provider(&self) -> Result<Arc<dyn ProviderSession>, CmisError> {
        self.handles()?.inner.provider_session()
    }

    pub fn repository_service(&self) -> Result<Arc<RepositoryService>, CmisError> {
        Ok(self.handles()?.repository_service.clone())
    }

    pub fn navigation_service(&self) -> Result<Arc<dyn NavigationCapability>, CmisError> {
        Ok(self.provider()?.navigation())
    }

    pub fn object_service(&self) -> Result<Arc<dyn ObjectCapability>, CmisError> {
        Ok(self.provider()?.object())
    }

    pub fn discovery_service(&self) -> Result<Arc<dyn DiscoveryCapability>, CmisError> {
        Ok(self.provider()?.discovery())
    }

    pub fn relationship_service(&self) -> Result<Arc<dyn RelationshipCapability>, CmisError> {
        Ok(self.provider()?.relationship())
    }

    pub fn versioning_service(&self) -> Result<Arc<dyn VersioningCapability>, CmisError> {
        Ok(self.provider()?.versioning())
    }

    pub fn acl_service(&self) -> Result<Arc<dyn AclCapability>, CmisError> {
        Ok(self.provider()?.acl())
    }

    pub fn multi_filing_service(&self) -> Result<Arc<dyn MultiFilingCapability>, CmisError> {
        Ok(self.provider()?.multi_filing())
    }

    pub fn policy_service(&self) -> Result<Arc<dyn PolicyCapability>, CmisError> {
        Ok(self.provider()?.policy())
    }

    /// Drops everything cached and tells the provider to do the same. The
    /// provider call happens inside the cache lock so readers never see the
    /// gateway cleared but the provider still serving stale state.
    pub fn clear_all_caches(&self) -> Result<(), CmisError> {
        let inner = self.handles()?.inner;
        let mut caches = inner.caches.write();
        caches.repository_info.clear();
        caches.type_definitions.clear();
        inner.provider_session()?.clear_all_caches();
        Ok(())
    }

    /// Drops one repository's cached state. An empty id is a no-op.
    pub fn clear_repository_cache(&self, repository_id: &str) -> Result<(), CmisError> {
        if repository_id.is_empty() {
            return Ok(());
        }
        let inner = self.handles()?.inner;
        let mut caches = inner.caches.write();
        caches.repository_info.remove(repository_id);
        caches.type_definitions.remove(repository_id);
        inner.provider_session()?.clear_repository_cache(repository_id);
        Ok(())
    }

    /// Closes the gateway and the provider session behind it. Further calls
    /// fail with an illegal-state error.
    pub fn close(&self) -> Result<(), CmisError> {
        let handles = self
            .state
            .write()
            .take()
            .ok_or_else(|| CmisError::illegal_state("Already closed."))?;
        if let Some(provider) = handles.inner.resolved_provider() {
            provider.close();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::registry::default_registry;
    use crate::error::ErrorKind;
    use crate::spi::InMemoryProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn memory_parameters() -> HashMap<String, String> {
        let mut parameters = HashMap::new();
        parameters.insert(params::PROVIDER.to_string(), "memory".to_string());
        parameters.insert(params::REPOSITORY_ID.to_string(), "test".to_string());
        parameters
    }

    #[test]
    fn empty_parameters_are_rejected() {
        let err = Binding::new(HashMap::new(), &default_registry()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut parameters = memory_parameters();
        parameters.insert(params::PROVIDER.to_string(), "jdbc".to_string());
        let err = Binding::new(parameters, &default_registry()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().contains("jdbc"));
    }

    #[test]
    fn provider_is_created_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let mut registry = default_registry();
        registry.register_provider(
            "counting",
            Arc::new(|_session: &Session| {
                CALLS.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(InMemoryProvider::with_sample_content("test"))
                    as Arc<dyn ProviderSession>)
            }),
        );
        let mut parameters = memory_parameters();
        parameters.insert(params::PROVIDER.to_string(), "counting".to_string());
        let binding = Binding::new(parameters, &registry).unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);

        let first = binding.provider().unwrap();
        let second = binding.provider().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_factory_fails_construction() {
        let mut registry = default_registry();
        registry.register_provider(
            "broken",
            Arc::new(|_session: &Session| Err(CmisError::storage("connection refused"))),
        );
        let mut parameters = memory_parameters();
        parameters.insert(params::PROVIDER.to_string(), "broken".to_string());

        let err = Binding::new(parameters, &registry).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert!(err.message().contains("Could not create service provider"));
        assert!(err.message().contains("connection refused"));
    }

    #[test]
    fn close_rejects_further_use() {
        let binding = Binding::new(memory_parameters(), &default_registry()).unwrap();
        binding.provider().unwrap();
        binding.close().unwrap();

        let err = binding.provider().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::IllegalState);
        assert_eq!(err.message(), "Already closed.");

        let err = binding.close().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalState);
    }

    #[test]
    fn object_factory_survives_close() {
        let binding = Binding::new(memory_parameters(), &default_registry()).unwrap();
        binding.close().unwrap();
        let factory = binding.object_factory();
        let doc = factory.new_document("cmis:document", "x", None, "alice", HashMap::new());
        assert_eq!(doc.name, "x");
    }

    #[test]
    fn cache_capacity_clamps_to_one() {
        assert_eq!(cache_capacity(-5), 1);
        assert_eq!(cache_capacity(0), 1);
        assert_eq!(cache_capacity(10), 10);
    }

    #[tokio::test]
    async fn negative_cache_sizes_still_yield_usable_caches() {
        let mut parameters = memory_parameters();
        parameters.insert(params::CACHE_SIZE_REPOSITORIES.to_string(), "-3".to_string());
        parameters.insert(params::CACHE_SIZE_TYPES.to_string(), "0".to_string());
        let binding = Binding::new(parameters, &default_registry()).unwrap();

        let service = binding.repository_service().unwrap();
        let info = service.get_repository_info("test").await.unwrap();
        assert_eq!(info.id, "test");
    }

    #[test]
    fn auth_provider_sees_session_credentials() {
        let mut parameters = memory_parameters();
        parameters.insert(params::AUTH_PROVIDER.to_string(), "basic".to_string());
        parameters.insert(params::USER.to_string(), "alice".to_string());
        parameters.insert(params::PASSWORD.to_string(), "s3cret".to_string());
        let binding = Binding::new(parameters, &default_registry()).unwrap();

        let credentials = binding.credentials().unwrap().unwrap();
        assert_eq!(credentials.user, "alice");
        assert_eq!(credentials.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn unknown_auth_provider_is_rejected() {
        let mut parameters = memory_parameters();
        parameters.insert(params::AUTH_PROVIDER.to_string(), "ntlm".to_string());
        let err = Binding::new(parameters, &default_registry()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().contains("ntlm"));
    }

    #[tokio::test]
    async fn service_accessors_reach_the_provider() {
        let binding = Binding::new(memory_parameters(), &default_registry()).unwrap();

        let acl = binding.acl_service().unwrap();
        let acl = acl.get_acl("test", "doc-readme").await.unwrap();
        assert_eq!(acl.entries[0].principal, "system");

        let versions = binding
            .versioning_service()
            .unwrap()
            .get_all_versions("test", "doc-readme")
            .await
            .unwrap();
        assert_eq!(versions.len(), 1);

        let relationships = binding
            .relationship_service()
            .unwrap()
            .get_object_relationships("test", "doc-readme")
            .await
            .unwrap();
        assert!(relationships.is_empty());

        binding
            .multi_filing_service()
            .unwrap()
            .add_object_to_folder("test", "doc-readme", "folder-reports")
            .await
            .unwrap();
        binding
            .policy_service()
            .unwrap()
            .apply_policy("test", "doc-q3", "doc-readme")
            .await
            .unwrap();
        let applied = binding
            .policy_service()
            .unwrap()
            .get_applied_policies("test", "doc-readme")
            .await
            .unwrap();
        assert_eq!(applied[0].id, "doc-q3");
    }

    #[test]
    fn cache_clears_delegate_to_provider() {
        let memory = Arc::new(InMemoryProvider::with_sample_content("test"));
        let mut registry = default_registry();
        let shared = memory.clone();
        registry.register_provider(
            "shared",
            Arc::new(move |_session: &Session| {
                Ok(shared.clone() as Arc<dyn ProviderSession>)
            }),
        );
        let mut parameters = memory_parameters();
        parameters.insert(params::PROVIDER.to_string(), "shared".to_string());
        let binding = Binding::new(parameters, &registry).unwrap();

        binding.clear_all_caches().unwrap();
        binding.clear_repository_cache("test").unwrap();
        binding.clear_repository_cache("").unwrap();
        binding.close().unwrap();

        assert_eq!(memory.clear_all_calls(), 1);
        assert_eq!(memory.cleared_repositories(), vec!["test".to_string()]);
        assert!(memory.is_closed());
    }
}
