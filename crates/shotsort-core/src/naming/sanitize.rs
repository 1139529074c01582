//! Sanitization of raw vision-model output into file base names.
//!
//! Every name produced here matches `^[a-z0-9_]{2,}$`. The one exception
//! is [`NamingSuggestion::frame_fallback`], which keeps the original stem
//! as-is so the file stays recognizable.

use crate::config::NamingConfig;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// A trailing `.ext` the model sometimes appends despite the prompt.
static TRAILING_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[A-Za-z0-9]{1,5}$").unwrap());

/// Anything outside lowercase alphanumerics, underscore, hyphen and whitespace.
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9_\-\s]").unwrap());

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]").unwrap());

static REPEATED_UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").unwrap());

static VALID_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9_]{2,}$").unwrap());

/// A suggested base name (no extension).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NamingSuggestion(String);

impl NamingSuggestion {
    /// Fallback used when a video frame could not be extracted:
    /// `error_video_frame_<stem>`.
    pub fn frame_fallback(original_stem: &str) -> Self {
        Self(format!(
            "{}{}",
            NamingConfig::FRAME_FALLBACK_PREFIX,
            original_stem
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full file name: base name plus `extension` (lowercased, dot added).
    pub fn file_name(&self, extension: Option<&str>) -> String {
        match extension {
            Some(ext) if !ext.is_empty() => format!("{}.{}", self.0, ext.to_lowercase()),
            _ => self.0.clone(),
        }
    }
}

impl std::fmt::Display for NamingSuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Clean raw model output.
///
/// Returns `None` when fewer than two characters survive.
pub fn clean(raw: &str) -> Option<NamingSuggestion> {
    let name = normalize(raw);
    if name.len() < NamingConfig::MIN_NAME_LENGTH {
        None
    } else {
        Some(NamingSuggestion(name))
    }
}

/// Clean raw model output, falling back to a name built from the
/// original file stem when nothing usable remains.
pub fn sanitize_suggestion(raw: &str, original_stem: &str) -> NamingSuggestion {
    clean(raw).unwrap_or_else(|| fallback_name(original_stem))
}

/// `screenshot_<first 15 chars of stem>`, normalized.
pub fn fallback_name(original_stem: &str) -> NamingSuggestion {
    let stem: String = original_stem
        .chars()
        .take(NamingConfig::FALLBACK_STEM_CHARS)
        .collect();
    NamingSuggestion(normalize(&format!(
        "{}{}",
        NamingConfig::FALLBACK_PREFIX,
        stem
    )))
}

/// True if `name` is a well-formed sanitized base name.
pub fn is_valid_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_ext = TRAILING_EXTENSION.replace(trimmed, "");
    let lower = without_ext.to_lowercase();
    let kept = DISALLOWED.replace_all(&lower, "");
    let underscored = SEPARATORS.replace_all(&kept, "_");
    let collapsed = REPEATED_UNDERSCORES.replace_all(&underscored, "_");
    let mut result = collapsed.trim_matches('_').to_string();

    // Output is ASCII at this point, so byte slicing is safe.
    if result.len() > NamingConfig::MAX_NAME_LENGTH {
        result.truncate(NamingConfig::MAX_NAME_LENGTH);
        if let Some(pos) = result.rfind('_') {
            if pos > NamingConfig::MAX_NAME_LENGTH / 2 {
                result.truncate(pos);
            }
        }
        result = result.trim_matches('_').to_string();
    }

    result
}
