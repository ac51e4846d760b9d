use crate::capabilities::AuthContext;

/// Signed in whenever a non-blank session token was configured.
#[derive(Debug, Clone, Default)]
pub struct TokenAuth {
    token: Option<String>,
}

impl TokenAuth {
    pub fn new(token: Option<String>) -> Self {
        TokenAuth { token }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

impl AuthContext for TokenAuth {
    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}
