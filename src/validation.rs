use regex::Regex;
use std::sync::LazyLock;

use crate::error::{AvatarError, AvatarResult};
use crate::render::{DEFAULT_CANVAS_SIZE, MAX_CANVAS_SIZE};

// 1-39 characters, alphanumeric or single hyphens, no leading hyphen.
static GITHUB_USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9]|-[A-Za-z0-9]){0,38}$").expect("valid regex"));

/// Request validation utilities
pub struct RequestValidator;

impl RequestValidator {
    /// Parses the `w` query parameter into a canvas size.
    pub fn parse_width(raw: Option<&str>) -> AvatarResult<u32> {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Ok(DEFAULT_CANVAS_SIZE),
            Some(raw) => raw,
        };

        let width: i64 = raw
            .parse()
            .map_err(|_| AvatarError::InvalidRequest(format!("Invalid number(width): {}", raw)))?;

        if width <= 0 {
            return Err(AvatarError::InvalidRequest(
                "width must be a positive integer".to_string(),
            ));
        }
        if width > MAX_CANVAS_SIZE as i64 {
            return Err(AvatarError::InvalidRequest(format!(
                "Width value cannot be greater than {}",
                MAX_CANVAS_SIZE
            )));
        }

        Ok(width as u32)
    }

    pub fn validate_identifier(identifier: &str) -> AvatarResult<()> {
        if identifier.trim().is_empty() {
            return Err(AvatarError::InvalidRequest(
                "Missing name parameter = `/avatar/:name`".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_github_username(username: &str) -> AvatarResult<()> {
        if username.trim().is_empty() {
            return Err(AvatarError::InvalidRequest(
                "Missing GitHub username = `/avatar/github/:username`".to_string(),
            ));
        }
        if !GITHUB_USERNAME.is_match(username) {
            return Err(AvatarError::InvalidRequest(format!(
                "Invalid GitHub username: {}",
                username
            )));
        }
        Ok(())
    }
}
