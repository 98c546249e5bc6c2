use crate::config::{SecretToken, ServiceConfig};
use crate::utils::error::{GitServiceError, Result};
use crate::utils::validation::{validate_aws_region, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub codecommit: CodeCommitSection,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeCommitSection {
    pub region: Option<String>,
    pub base_domain: Option<String>,
    pub token: Option<String>,
    pub trigger_destination_arn: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl TomlConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GitServiceError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| GitServiceError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR_NAME}` with the variable's value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| GitServiceError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn json_logs(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|logging| logging.json)
            .unwrap_or(false)
    }

    pub fn into_service_config(self) -> ServiceConfig {
        let section = self.codecommit;
        ServiceConfig {
            user_id: section.user_id,
            token: section
                .token
                // an unresolved `${VAR}` means the variable was not set
                .filter(|token| !token.trim().is_empty() && !token.starts_with("${"))
                .map(SecretToken::new),
            base_domain: section.base_domain,
            region: section.region,
            trigger_destination_arn: section.trigger_destination_arn,
            ..Default::default()
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(region) = &self.codecommit.region {
            validate_aws_region("codecommit.region", region)?;
        }
        if let Some(base_domain) = &self.codecommit.base_domain {
            validate_aws_region("codecommit.base_domain", base_domain)?;
        }
        Ok(())
    }
}
