pub mod auth;
pub mod gateway;
pub mod params;
pub mod registry;
pub mod repository;

pub use auth::{AuthenticationProvider, BasicAuthProvider, Credentials};
pub use gateway::Binding;
pub use registry::{default_registry, ProviderRegistry};
pub use repository::RepositoryService;
