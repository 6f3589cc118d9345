use serde::{Deserialize, Serialize};

/// The authenticated operator on whose behalf an operation runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub roles: Vec<String>,
}

impl SessionContext {
    pub fn new<S: Into<String>>(user_id: S, roles: Vec<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
