use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl AuthTokens {
    pub fn new(access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenParams {
    pub refresh_token: String,
}

impl RefreshTokenParams {
    pub fn new(refresh_token: &str) -> Self {
        Self {
            refresh_token: refresh_token.to_owned(),
        }
    }
}

/// Shared holder for the current auth tokens. Reads happen before every
/// request and `replace` is the only write path.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<AuthTokens>,
}

impl TokenStore {
    pub fn new(tokens: AuthTokens) -> Self {
        Self {
            tokens: RwLock::new(tokens),
        }
    }

    pub fn access_token(&self) -> String {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens.access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens.refresh_token.clone()
    }

    pub fn replace(&self, tokens: AuthTokens) {
        let mut current = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        *current = tokens;
    }
}
