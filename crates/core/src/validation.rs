//! Input validation for job submissions.

use validator::ValidateUrl;

use crate::catalog::{default_model, find_model, ModelInfo};
use crate::error::CoreError;

/// Maximum accepted repository URL length.
pub const MAX_REPO_URL_LEN: usize = 2048;

/// Validate a repository URL.
///
/// Must be an absolute `http`/`https` URL whose path names at least an
/// owner and a repository (`https://host/owner/repo`).
pub fn validate_repo_url(url: &str) -> Result<(), CoreError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(CoreError::Validation("repo_url must not be empty".into()));
    }
    if url.len() > MAX_REPO_URL_LEN {
        return Err(CoreError::Validation(format!(
            "repo_url must be at most {MAX_REPO_URL_LEN} characters"
        )));
    }
    if !url.validate_url() {
        return Err(CoreError::Validation(format!("'{url}' is not a valid URL")));
    }

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| CoreError::Validation("repo_url must use http or https".into()))?;

    let segments = rest
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split('/')
        .skip(1)
        .filter(|s| !s.is_empty())
        .count();
    if segments < 2 {
        return Err(CoreError::Validation(
            "repo_url must point at a repository (https://host/owner/repo)".into(),
        ));
    }
    Ok(())
}

/// Resolve the requested model against the catalog.
///
/// `None` selects the catalog default; an unknown id is a validation error.
pub fn resolve_model(requested: Option<&str>) -> Result<&'static ModelInfo, CoreError> {
    match requested.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default_model()),
        Some(id) => {
            find_model(id).ok_or_else(|| CoreError::Validation(format!("unknown model '{id}'")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // -- validate_repo_url ---------------------------------------------------

    #[test]
    fn accepts_repository_urls() {
        assert!(validate_repo_url("https://github.com/tokio-rs/axum").is_ok());
        assert!(validate_repo_url("http://gitlab.example.com/group/project.git").is_ok());
        assert!(validate_repo_url("https://github.com/tokio-rs/axum/").is_ok());
    }

    #[test]
    fn rejects_empty_url() {
        assert_matches!(validate_repo_url("   "), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert_matches!(
            validate_repo_url("ftp://github.com/a/b"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_matches!(validate_repo_url("not a url"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_url_without_repository_path() {
        assert_matches!(
            validate_repo_url("https://github.com/tokio-rs"),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            validate_repo_url("https://github.com"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn rejects_overlong_url() {
        let url = format!("https://github.com/a/{}", "b".repeat(MAX_REPO_URL_LEN));
        assert_matches!(validate_repo_url(&url), Err(CoreError::Validation(_)));
    }

    // -- resolve_model -------------------------------------------------------

    #[test]
    fn missing_model_resolves_to_default() {
        assert!(resolve_model(None).unwrap().default);
        assert!(resolve_model(Some("  ")).unwrap().default);
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert_matches!(resolve_model(Some("gpt-2")), Err(CoreError::Validation(_)));
    }
}
