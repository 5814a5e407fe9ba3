use parking_lot::RwLock;
use std::sync::Weak;

use crate::binding::params;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: Option<String>,
}

/// Supplies credentials for outgoing provider calls. Implementations get a
/// weak handle to the gateway session after construction and must not keep
/// the session alive past the gateway.
pub trait AuthenticationProvider: Send + Sync {
    fn set_session(&self, session: Weak<Session>);
    fn credentials(&self) -> Option<Credentials>;
}

/// Reads `binding.user` / `binding.password` straight from the session.
#[derive(Default)]
pub struct BasicAuthProvider {
    session: RwLock<Weak<Session>>,
}

impl BasicAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuthenticationProvider for BasicAuthProvider {
    fn set_session(&self, session: Weak<Session>) {
        *self.session.write() = session;
    }

    fn credentials(&self) -> Option<Credentials> {
        let session = self.session.read().upgrade()?;
        let user = session.get_str(params::USER)?;
        Some(Credentials {
            user,
            password: session.get_str(params::PASSWORD),
        })
    }
}
