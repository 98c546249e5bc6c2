use crate::utils::error::{GitServiceError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GitServiceError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(GitServiceError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(GitServiceError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: region.to_string(),
            reason: "AWS region can only contain lowercase letters, numbers, and hyphens"
                .to_string(),
        });
    }

    if region.starts_with('-') || region.ends_with('-') {
        return Err(GitServiceError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: region.to_string(),
            reason: "AWS region cannot start or end with a hyphen".to_string(),
        });
    }

    Ok(())
}

pub const MAX_PER_PAGE: u32 = 1000;

/// Checks 1-based page arguments before they reach the service.
pub fn validate_page(page: u32, per_page: u32) -> Result<()> {
    validate_range("page", page, 1, u32::MAX)?;
    validate_range("per_page", per_page, 1, MAX_PER_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_aws_region() {
        assert!(validate_aws_region("region", "us-east-1").is_ok());
        assert!(validate_aws_region("region", "eu-central-2").is_ok());
        assert!(validate_aws_region("region", "").is_err());
        assert!(validate_aws_region("region", "US-EAST-1").is_err());
        assert!(validate_aws_region("region", "us east 1").is_err());
        assert!(validate_aws_region("region", "-us-east-1").is_err());
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(1, 30).is_ok());
        assert!(validate_page(0, 30).is_err());
        assert!(validate_page(1, 0).is_err());
        assert!(validate_page(2, MAX_PER_PAGE + 1).is_err());
    }
}
