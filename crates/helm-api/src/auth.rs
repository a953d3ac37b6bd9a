use async_trait::async_trait;

use crate::ApiError;

#[async_trait]
/// Supplies the bearer credential attached to backend requests.
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, ApiError>;
}

#[derive(Debug, Clone)]
/// Fixed-secret provider for service deployments and tests.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, ApiError> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(ApiError::NotAuthenticated);
        }
        Ok(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{StaticTokenProvider, TokenProvider};

    #[tokio::test]
    async fn static_provider_rejects_blank_tokens() {
        let provider = StaticTokenProvider::new("  ");
        let error = provider.bearer_token().await.expect_err("blank token");
        assert!(error.is_not_authenticated());

        let provider = StaticTokenProvider::new(" secret ");
        assert_eq!(provider.bearer_token().await.expect("token"), "secret");
    }
}
