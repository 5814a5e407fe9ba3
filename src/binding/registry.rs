use std::collections::HashMap;
use std::sync::Arc;

use crate::binding::auth::{AuthenticationProvider, BasicAuthProvider};
use crate::binding::params;
use crate::error::CmisError;
use crate::session::Session;
use crate::spi::{InMemoryProvider, ProviderSession};

/// Builds a provider session from the gateway session. The factory runs at
/// most once per gateway, on first service access.
pub type ProviderFactory =
    Arc<dyn Fn(&Session) -> Result<Arc<dyn ProviderSession>, CmisError> + Send + Sync>;

pub type AuthProviderFactory =
    Arc<dyn Fn() -> Result<Arc<dyn AuthenticationProvider>, CmisError> + Send + Sync>;

/// Name-keyed factories for providers and authentication providers. Gateways
/// look implementations up here by the `binding.provider` and
/// `binding.authprovider` session parameters.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderFactory>,
    auth_providers: HashMap<String, AuthProviderFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_provider(
        &mut self,
        name: impl Into<String>,
        factory: ProviderFactory,
    ) -> &mut Self {
        self.providers.insert(name.into(), factory);
        self
    }

    pub fn register_auth_provider(
        &mut self,
        name: impl Into<String>,
        factory: AuthProviderFactory,
    ) -> &mut Self {
        self.auth_providers.insert(name.into(), factory);
        self
    }

    pub fn provider(&self, name: &str) -> Option<ProviderFactory> {
        self.providers.get(name).cloned()
    }

    pub fn auth_provider(&self, name: &str) -> Option<AuthProviderFactory> {
        self.auth_providers.get(name).cloned()
    }
}

/// Registry with the built-in implementations: the `memory` provider and the
/// `basic` authentication provider.
pub fn default_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register_provider(
        "memory",
        Arc::new(|session: &Session| {
            let repository_id = session
                .get_str(params::REPOSITORY_ID)
                .unwrap_or_else(|| "test".to_string());
            Ok(Arc::new(InMemoryProvider::with_sample_content(&repository_id))
                as Arc<dyn ProviderSession>)
        }),
    );
    registry.register_auth_provider(
        "basic",
        Arc::new(|| Ok(Arc::new(BasicAuthProvider::new()) as Arc<dyn AuthenticationProvider>)),
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_builds_memory_provider() {
        let registry = default_registry();
        let factory = registry.provider("memory").unwrap();

        let session = Session::new();
        session.put(params::REPOSITORY_ID, "r1");
        let provider = factory(&session).unwrap();

        let repository = provider.repository();
        let info = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(repository.get_repository_info("r1"))
            .unwrap();
        assert_eq!(info.id, "r1");
    }

    #[test]
    fn unknown_names_return_none() {
        let registry = default_registry();
        assert!(registry.provider("jdbc").is_none());
        assert!(registry.auth_provider("ntlm").is_none());
    }
}
