#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::utils::error::Result;
use crate::utils::validation::{validate_aws_region, Validate};
use std::fmt;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const TOKEN_ENV_VAR: &str = "CODECOMMIT_TOKEN";

/// Opaque secret blob; never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretToken(**********)")
    }
}

/// Construction parameters shared by every Git provider service.
///
/// `user_id`, the external auth fields and `external_token_manager` are not
/// used by CodeCommit; they are carried so hosts can build every provider from
/// the same inputs.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub user_id: Option<String>,
    pub external_auth_id: Option<String>,
    pub external_auth_token: Option<SecretToken>,
    pub token: Option<SecretToken>,
    pub external_token_manager: bool,
    /// For CodeCommit the base domain names the region and wins over `region`.
    pub base_domain: Option<String>,
    pub region: Option<String>,
    /// Destination ARN used when probing repository triggers for merge
    /// conflicts. Without it no merge-conflict tasks are reported.
    pub trigger_destination_arn: Option<String>,
}

impl ServiceConfig {
    pub fn region(&self) -> &str {
        non_empty(&self.base_domain)
            .or_else(|| non_empty(&self.region))
            .unwrap_or(DEFAULT_REGION)
    }

    pub fn base_url(&self) -> String {
        format!("https://codecommit.{}.amazonaws.com", self.region())
    }

    /// Falls back to `CODECOMMIT_TOKEN` when no token was given explicitly.
    pub fn with_token_from_env(mut self) -> Self {
        if self.token.is_none() {
            self.token = std::env::var(TOKEN_ENV_VAR)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(SecretToken::new);
        }
        self
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        validate_aws_region("region", self.region())?;
        tracing::debug!("Service configuration validated for region {}", self.region());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_precedence() {
        let config = ServiceConfig::default();
        assert_eq!(config.region(), "us-east-1");

        let config = ServiceConfig {
            region: Some("eu-west-1".to_string()),
            ..Default::default()
        };
        assert_eq!(config.region(), "eu-west-1");

        let config = ServiceConfig {
            region: Some("eu-west-1".to_string()),
            base_domain: Some("ap-southeast-2".to_string()),
            ..Default::default()
        };
        assert_eq!(config.region(), "ap-southeast-2");
        assert_eq!(
            config.base_url(),
            "https://codecommit.ap-southeast-2.amazonaws.com"
        );

        let config = ServiceConfig {
            region: Some("eu-west-1".to_string()),
            base_domain: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.region(), "eu-west-1");

        let config = ServiceConfig {
            region: Some("  ".to_string()),
            base_domain: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.region(), "us-east-1");
    }

    #[test]
    fn test_secret_token_is_redacted() {
        let config = ServiceConfig {
            token: Some(SecretToken::new("{\"aws_secret_access_key\":\"hunter2\"}")),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("**********"));
    }

    #[test]
    fn test_validate_rejects_bad_region() {
        let config = ServiceConfig {
            region: Some("Not A Region".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ServiceConfig::default().validate().is_ok());
    }
}
