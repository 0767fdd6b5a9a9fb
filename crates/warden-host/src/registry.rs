//! Active session tokens.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use warden_core::CommunicationToken;

/// Tokens of every session the host has established and not yet closed.
///
/// Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    tokens: Arc<RwLock<HashSet<CommunicationToken>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint and register a token for a new session.
    pub async fn open(&self) -> CommunicationToken {
        let token = CommunicationToken::generate();
        self.tokens.write().await.insert(token);
        token
    }

    pub async fn contains(&self, token: &CommunicationToken) -> bool {
        self.tokens.read().await.contains(token)
    }

    /// Forget a session. Returns whether it was registered.
    ///
    /// Requests still carrying the token are answered `Unauthorized`.
    pub async fn revoke(&self, token: &CommunicationToken) -> bool {
        self.tokens.write().await.remove(token)
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_then_revoke() {
        let registry = SessionRegistry::new();
        let token = registry.open().await;
        assert!(registry.contains(&token).await);
        assert_eq!(registry.len().await, 1);

        assert!(registry.revoke(&token).await);
        assert!(!registry.revoke(&token).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn clones_share_tokens() {
        let registry = SessionRegistry::new();
        let token = registry.clone().open().await;
        assert!(registry.contains(&token).await);
    }
}
