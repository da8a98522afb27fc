//! Access/refresh token holder shared between the API client and the user repository.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .finish()
    }
}

/// Cloneable handle to the current token pair.
///
/// Constructed once at startup and handed to every consumer; clones share state.
#[derive(Debug, Clone, Default)]
pub struct TokenHolder {
    inner: Arc<RwLock<Option<TokenPair>>>,
}

impl TokenHolder {
    #[must_use]
    pub fn new(initial: Option<TokenPair>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<TokenPair> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.get().map(|t| t.access_token)
    }

    pub fn set(&self, tokens: TokenPair) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
