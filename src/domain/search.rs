use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One catalog hit returned by `/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub uploader: String,
    /// Seconds.
    pub duration: u64,
    pub thumbnail: String,
    #[serde(rename = "url")]
    pub canonical_url: String,
}

impl SearchResult {
    /// Build a result from a catalog metadata entry.
    ///
    /// Returns `None` for entries without an id. Missing fields fall back to
    /// `"Unknown"` uploader/title, zero duration and URLs derived from the id.
    pub fn from_catalog_entry(entry: &Value) -> Option<Self> {
        let id = entry.get("id")?.as_str()?.trim();
        if id.is_empty() {
            return None;
        }

        let text = |key: &str| {
            entry
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let duration = entry
            .get("duration")
            .and_then(Value::as_f64)
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d.round() as u64)
            .unwrap_or(0);

        let thumbnail = text("thumbnail")
            .or_else(|| last_thumbnail(entry))
            .unwrap_or_else(|| super::media::thumbnail_url(id));

        let canonical_url = text("webpage_url")
            .or_else(|| text("url").filter(|u| u.starts_with("http")))
            .unwrap_or_else(|| super::media::watch_url(id));

        Some(Self {
            id: id.to_string(),
            title: text("title").unwrap_or_else(|| "Unknown".to_string()),
            uploader: text("uploader")
                .or_else(|| text("channel"))
                .unwrap_or_else(|| "Unknown".to_string()),
            duration,
            thumbnail,
            canonical_url,
        })
    }
}

// Flat listings only carry a `thumbnails` array, largest last.
fn last_thumbnail(entry: &Value) -> Option<String> {
    entry
        .get("thumbnails")?
        .as_array()?
        .iter()
        .rev()
        .find_map(|t| t.get("url").and_then(Value::as_str))
        .map(str::to_string)
}

/// Cache key form of a search query.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}
