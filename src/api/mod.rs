pub mod context;
pub mod dispatch;
pub mod handlers;
pub mod service;

pub use context::CallContext;
pub use dispatch::{Dispatcher, ListResponse, Operation, OperationRequest, ServiceResponse};
pub use service::{create_router, GatewayState};
