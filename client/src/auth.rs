// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! Bearer tokens come from the external sign-in provider. The client asks
//! for one before every request and never keeps it.

use std::future::{Future, ready};

use crate::error::ApiError;

pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> impl Future<Output = Result<String, ApiError>> + Send;
}

/// A token handed over once, e.g. in tests or from a command-line flag.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> impl Future<Output = Result<String, ApiError>> + Send {
        ready(non_blank(Some(self.0.clone()), "empty token"))
    }
}

/// Reads the token from an environment variable on every request, so a
/// refreshed token is picked up without restarting.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenProvider for EnvToken {
    fn bearer_token(&self) -> impl Future<Output = Result<String, ApiError>> + Send {
        let token = std::env::var(&self.var).ok();
        ready(non_blank(token, &format!("{} is not set", self.var)))
    }
}

fn non_blank(token: Option<String>, reason: &str) -> Result<String, ApiError> {
    match token {
        Some(t) if !t.trim().is_empty() => Ok(t.trim().to_string()),
        _ => Err(ApiError::Unauthorized(reason.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let token = StaticToken::new(" abc ").bearer_token().await.unwrap();

        assert_eq!(token, "abc");
    }

    #[tokio::test]
    async fn test_blank_token_is_unauthorized() {
        let result = StaticToken::new("").bearer_token().await;

        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_missing_env_token_is_unauthorized() {
        let result = EnvToken::new("CHECKIN_TEST_SURELY_UNSET_TOKEN")
            .bearer_token()
            .await;

        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }
}
