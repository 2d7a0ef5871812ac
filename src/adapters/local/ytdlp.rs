//! MediaExtractor driven by a `yt-dlp` child process.

use crate::domain::media::watch_url;
use crate::domain::search::SearchResult;
use crate::ports::extractor::{ExtractionError, FetchedAudio, MediaExtractor};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct YtDlpExtractor {
    bin: PathBuf,
    fragment_retries: u32,
    search_timeout: Duration,
    fetch_timeout: Duration,
}

impl YtDlpExtractor {
    pub fn new(bin: impl Into<PathBuf>, fragment_retries: u32) -> Self {
        Self {
            bin: bin.into(),
            fragment_retries,
            search_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(15 * 60),
        }
    }

    async fn run(&self, args: Vec<OsString>, timeout: Duration) -> Result<Output, ExtractionError> {
        let mut command = TokioCommand::new(&self.bin);
        command.args(&args).kill_on_drop(true);
        debug!(bin = ?self.bin, ?args, "Running extractor");

        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| ExtractionError::Timeout)??;

        if !output.status.success() {
            return Err(ExtractionError::Failed {
                status: output.status.to_string(),
                stderr: last_error_line(&output.stderr),
            });
        }
        Ok(output)
    }
}

pub(crate) fn search_args(query: &str, limit: usize) -> Vec<OsString> {
    [
        "--flat-playlist",
        "--dump-json",
        "--no-warnings",
        "--quiet",
        "--skip-download",
    ]
    .iter()
    .map(OsString::from)
    .chain(std::iter::once(OsString::from(format!(
        "ytsearch{}:{}",
        limit, query
    ))))
    .collect()
}

pub(crate) fn fetch_args(video_id: &str, dest: &Path, fragment_retries: u32) -> Vec<OsString> {
    // `<job>.mp3` -> `<job>.%(ext)s`; the audio post-processor renames the
    // download back to `.mp3`.
    let template = dest.with_extension("%(ext)s");
    let mut args: Vec<OsString> = [
        "--format",
        "bestaudio/best",
        "--extract-audio",
        "--audio-format",
        "mp3",
        "--audio-quality",
        "192K",
        "--no-playlist",
        "--no-warnings",
        "--no-progress",
        "--concurrent-fragments",
        "8",
        "--retries",
        "1",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push("--fragment-retries".into());
    args.push(fragment_retries.to_string().into());
    args.push("--print".into());
    args.push("after_move:title".into());
    args.push("--output".into());
    args.push(template.into_os_string());
    args.push(watch_url(video_id).into());
    args
}

/// One JSON object per line; unparsable lines are skipped.
pub(crate) fn parse_search_output(stdout: &str, limit: usize) -> Vec<SearchResult> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<serde_json::Value>(line) {
            Ok(entry) => SearchResult::from_catalog_entry(&entry),
            Err(e) => {
                warn!(error = %e, "Skipping unparsable search entry");
                None
            }
        })
        .take(limit)
        .collect()
}

fn last_error_line(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no error output")
        .to_string()
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ExtractionError> {
        let output = self.run(search_args(query, limit), self.search_timeout).await?;
        Ok(parse_search_output(
            &String::from_utf8_lossy(&output.stdout),
            limit,
        ))
    }

    async fn fetch_audio(&self, video_id: &str, dest: &Path) -> Result<FetchedAudio, ExtractionError> {
        let output = self
            .run(
                fetch_args(video_id, dest, self.fragment_retries),
                self.fetch_timeout,
            )
            .await?;

        if !tokio::fs::try_exists(dest).await.unwrap_or(false) {
            return Err(ExtractionError::MissingOutput(dest.to_path_buf()));
        }

        let title = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && *line != "NA")
            .map(str::to_string);
        Ok(FetchedAudio {
            path: dest.to_path_buf(),
            title,
        })
    }
}
