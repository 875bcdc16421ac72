//! Configuration validation

use crate::schema::{RawConfig, RawNotification};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("[timer] {field} must be at least {min}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        value: u64,
    },

    #[error("[badge] {field} '{value}' is not a #RRGGBB color")]
    InvalidColor { field: &'static str, value: String },

    #[error("{section}: {message}")]
    SectionError {
        section: &'static str,
        message: String,
    },

    #[error("Duplicate blocked site: {0}")]
    DuplicateSite(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let timer = &config.timer;
    for (field, value) in [
        ("work_minutes", timer.work_minutes.map(u64::from)),
        ("break_minutes", timer.break_minutes.map(u64::from)),
        ("badge_refresh_seconds", timer.badge_refresh_seconds),
    ] {
        if let Some(value) = value
            && value < 1
        {
            errors.push(ValidationError::OutOfRange {
                field,
                min: 1,
                value,
            });
        }
    }

    let badge = &config.badge;
    for (field, value) in [
        ("work_color", &badge.work_color),
        ("break_color", &badge.break_color),
        ("done_color", &badge.done_color),
    ] {
        if let Some(value) = value
            && !is_hex_color(value)
        {
            errors.push(ValidationError::InvalidColor {
                field,
                value: value.clone(),
            });
        }
    }
    if let Some(text) = &badge.done_text
        && text.trim().is_empty()
    {
        errors.push(ValidationError::SectionError {
            section: "[badge]",
            message: "done_text cannot be empty".into(),
        });
    }

    errors.extend(validate_notification(
        "[notifications.work]",
        config.notifications.work.as_ref(),
    ));
    errors.extend(validate_notification(
        "[notifications.break]",
        config.notifications.break_.as_ref(),
    ));

    if let Some(player) = &config.audio.player
        && player.first().is_none_or(|program| program.trim().is_empty())
    {
        errors.push(ValidationError::SectionError {
            section: "[audio]",
            message: "player must name a program".into(),
        });
    }
    if let Some(url) = &config.audio.url
        && !(url.starts_with("https://") || url.starts_with("http://"))
    {
        errors.push(ValidationError::SectionError {
            section: "[audio]",
            message: format!("url '{}' must be http(s)", url),
        });
    }

    let mut seen = HashSet::new();
    for site in &config.blocking.sites {
        let keyword = site.trim().to_lowercase();
        if keyword.is_empty() {
            errors.push(ValidationError::SectionError {
                section: "[blocking]",
                message: "sites cannot contain empty keywords".into(),
            });
        } else if !seen.insert(keyword) {
            errors.push(ValidationError::DuplicateSite(site.trim().to_string()));
        }
    }

    errors
}

fn validate_notification(
    section: &'static str,
    raw: Option<&RawNotification>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let Some(raw) = raw else {
        return errors;
    };

    if let Some(title) = &raw.title
        && title.trim().is_empty()
    {
        errors.push(ValidationError::SectionError {
            section,
            message: "title cannot be empty".into(),
        });
    }

    errors
}

/// `#RRGGBB`
fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
