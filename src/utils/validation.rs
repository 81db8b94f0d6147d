use crate::utils::error::{DashboardError, Result};
use std::fmt::Display;
use std::path::Path;
use url::Url;

/// Checked before a config is handed to the dashboard.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Into<String>, reason: impl Into<String>) -> DashboardError {
    DashboardError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.into(),
        reason: reason.into(),
    }
}

/// API endpoints must be absolute http(s) URLs with a host.
pub fn validate_url(field: &str, endpoint: &str) -> Result<()> {
    let parsed = Url::parse(endpoint.trim())
        .map_err(|e| invalid(field, endpoint, format!("not an absolute URL ({})", e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(
            field,
            endpoint,
            format!("scheme '{}' is not http or https", parsed.scheme()),
        ));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid(field, endpoint, "URL has no host"));
    }
    Ok(())
}

/// The upload widget only offers `.csv` files; the CLI enforces the same.
pub fn validate_file_extension(field: &str, path: &str, allowed: &[&str]) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field, path, "path is empty"));
    }

    let extension = Path::new(path).extension().and_then(|ext| ext.to_str());
    match extension {
        Some(ext) if allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)) => Ok(()),
        Some(ext) => Err(invalid(
            field,
            path,
            format!("'.{}' files are not accepted (expected {})", ext, allowed.join(", ")),
        )),
        None => Err(invalid(
            field,
            path,
            format!("file has no extension (expected {})", allowed.join(", ")),
        )),
    }
}

pub fn validate_non_empty_string(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "must not be blank"));
    }
    Ok(())
}

/// Inclusive bounds check for numeric settings.
pub fn validate_range<T>(field: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + Display,
{
    if (&min..=&max).contains(&&value) {
        Ok(())
    } else {
        Err(invalid(
            field,
            value.to_string(),
            format!("expected {}..={}", min, max),
        ))
    }
}
