//! Well-known session parameter keys. Callers configure a gateway entirely
//! through these; everything else in the session is pass-through state.

/// Registry name of the service provider backing the gateway. Required.
pub const PROVIDER: &str = "binding.provider";

/// Registry name of the authentication provider. Optional.
pub const AUTH_PROVIDER: &str = "binding.authprovider";

/// Repository the provider should serve by default.
pub const REPOSITORY_ID: &str = "binding.repository";

/// Credentials consumed by [`crate::binding::BasicAuthProvider`].
pub const USER: &str = "binding.user";
pub const PASSWORD: &str = "binding.password";

/// Capacity of the repository info cache.
pub const CACHE_SIZE_REPOSITORIES: &str = "binding.cache.repositories.size";

/// Capacity of the type definition cache, per repository.
pub const CACHE_SIZE_TYPES: &str = "binding.cache.types.size";

pub const DEFAULT_CACHE_SIZE_REPOSITORIES: i64 = 10;
pub const DEFAULT_CACHE_SIZE_TYPES: i64 = 100;
