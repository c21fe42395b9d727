use std::sync::Arc;

use tracing::info;

use crate::backend::TaskBackend;
use crate::errors::Result;
use crate::session::{SessionStorage, SESSION_USER_KEY};
use crate::user::{Credentials, User};

pub struct LoginFlow {
    backend: Arc<dyn TaskBackend>,
}

impl LoginFlow {
    pub fn new(backend: Arc<dyn TaskBackend>) -> Self {
        Self { backend }
    }

    /// Stores the matched user in the session. Without a match the session
    /// is not touched.
    pub async fn login(
        &self,
        session: &mut SessionStorage,
        credentials: &Credentials,
    ) -> Result<Option<User>> {
        let Some(user) = self.backend.login(credentials).await? else {
            info!(email = %credentials.email, "login rejected");
            return Ok(None);
        };
        session.set_user(&user)?;
        info!(user = %user.user_name, "logged in");
        Ok(Some(user))
    }

    pub fn logout(session: &mut SessionStorage) -> Result<()> {
        session.remove_item(SESSION_USER_KEY)
    }
}
