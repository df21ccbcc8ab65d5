use regex::Regex;

use crate::core::error::PipelineError;

pub const INVALID_URI_REASON: &str = "Expected URI to git repository";

fn re_git_uri() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.git$").unwrap())
}

/// True when `uri` is non-empty and ends in `.git`. Nothing else is checked.
pub fn is_git_uri(uri: &str) -> bool {
    !uri.is_empty() && re_git_uri().is_match(uri)
}

pub fn validate_uri(uri: &str) -> Result<&str, PipelineError> {
    if is_git_uri(uri) {
        Ok(uri)
    } else {
        Err(PipelineError::Validation(INVALID_URI_REASON.to_string()))
    }
}
