use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::modules::auth::interface::{RepoError, RoleRepository};

/// Role assigned to every self-registered and OAuth-created account.
pub const CLIENT_ROLE_NAME: &str = "Client";

/// Resolves the default role id once per process and caches it. A failed
/// first lookup leaves the cell empty, so a later call retries.
#[derive(Clone)]
pub struct RolesService {
    repo: Arc<dyn RoleRepository>,
    client_role_id: Arc<OnceCell<String>>,
}

impl RolesService {
    pub fn new(repo: Arc<dyn RoleRepository>) -> Self {
        Self {
            repo,
            client_role_id: Arc::new(OnceCell::new()),
        }
    }

    /// A missing "Client" role is an unrecoverable bootstrap failure.
    pub async fn client_role_id(&self) -> Result<String, RepoError> {
        let id = self
            .client_role_id
            .get_or_try_init(|| async {
                let role = self
                    .repo
                    .find_by_name(CLIENT_ROLE_NAME)
                    .await?
                    .ok_or(RepoError::NotFound)?;
                Ok::<String, RepoError>(role.id)
            })
            .await?;
        Ok(id.clone())
    }
}
