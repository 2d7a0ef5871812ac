//! Naming rules for catalog references and produced artifacts.

use regex::Regex;
use std::sync::OnceLock;

/// Extension of every produced audio artifact.
pub const AUDIO_EXTENSION: &str = "mp3";

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", video_id)
}

pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)
}

/// File name of the artifact produced for a job.
pub fn artifact_file_name(job_id: &str) -> String {
    format!("{}.{}", job_id, AUDIO_EXTENSION)
}

/// Catalog ids are short url-safe tokens.
pub fn is_valid_video_id(video_id: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap());
    re.is_match(video_id)
}

/// Download filename for an artifact, derived from the job title.
///
/// Only word characters, whitespace, dots and hyphens survive; anything
/// else becomes `_`. Whitespace runs collapse to one space so the result is
/// safe inside a header value.
pub fn download_file_name(title: Option<&str>, job_id: &str) -> String {
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let disallowed = DISALLOWED.get_or_init(|| Regex::new(r"[^\w\s.-]").unwrap());
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").unwrap());

    let stem = title
        .map(|t| disallowed.replace_all(t, "_"))
        .map(|t| spaces.replace_all(&t, " ").trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| job_id.to_string());

    format!("{}.{}", stem, AUDIO_EXTENSION)
}
