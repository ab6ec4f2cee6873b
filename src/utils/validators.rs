use std::sync::LazyLock;

use regex::Regex;
use validator::ValidationError;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());
static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());
static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if value == "me" {
        return Err(invalid("reserved", "`me` can't be used as a username"));
    }
    if !USERNAME_RE.is_match(value) {
        return Err(invalid(
            "username",
            "username may contain only letters, digits and . @ + - _",
        ));
    }
    Ok(())
}

pub fn validate_slug(value: &str) -> Result<(), ValidationError> {
    if !SLUG_RE.is_match(value) {
        return Err(invalid(
            "slug",
            "slug may contain only latin letters, digits, hyphens and underscores",
        ));
    }
    Ok(())
}

pub fn validate_color(value: &str) -> Result<(), ValidationError> {
    if !COLOR_RE.is_match(value) {
        return Err(invalid("color", "color must look like #rrggbb"));
    }
    Ok(())
}
