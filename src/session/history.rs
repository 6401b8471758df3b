/*!
 * History of processed videos.
 *
 * Entries are de-duplicated by video id only. Storage is a collaborator
 * behind `HistoryStore`; the in-memory store is what the CLI and tests use.
 */

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use url::Url;

use crate::errors::EngineError;
use crate::services::ProcessedVideo;
use crate::subtitle_processor::SubtitleCue;

/// One processed video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub source_url: String,
    pub video_id: String,
    pub title: Option<String>,
    pub thumbnail_ref: Option<String>,
    pub cues: Vec<SubtitleCue>,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_processed(source_url: &str, video: &ProcessedVideo) -> Self {
        Self {
            source_url: source_url.to_string(),
            video_id: video.video_id.clone(),
            title: video.video_title.clone(),
            thumbnail_ref: youtube_video_id(source_url).map(|id| thumbnail_for(&id)),
            cues: video.subtitles.clone(),
            recorded_at: Utc::now(),
        }
    }
}

/// Storage for processed videos
pub trait HistoryStore: Send + Sync + Debug {
    fn contains(&self, video_id: &str) -> bool;

    fn append(&mut self, entry: HistoryEntry);

    /// Entries, most recent first
    fn entries(&self) -> Vec<HistoryEntry>;

    fn find(&self, video_id: &str) -> Option<HistoryEntry> {
        self.entries().into_iter().find(|entry| entry.video_id == video_id)
    }
}

/// Append `entry` unless its video id is already recorded
pub fn record_if_new(store: &mut dyn HistoryStore, entry: HistoryEntry) -> bool {
    if store.contains(&entry.video_id) {
        debug!("Video {} already in history", entry.video_id);
        return false;
    }
    info!("Recording video {} in history", entry.video_id);
    store.append(entry);
    true
}

#[derive(Debug, Default)]
pub struct InMemoryHistory {
    entries: Vec<HistoryEntry>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HistoryStore for InMemoryHistory {
    fn contains(&self, video_id: &str) -> bool {
        self.entries.iter().any(|entry| entry.video_id == video_id)
    }

    fn append(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
    }

    fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.clone()
    }
}

/// Check a user-supplied source URL before anything is processed
pub fn validate_source_url(raw: &str) -> Result<Url, EngineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput("Source URL is empty".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| EngineError::InvalidInput(format!("Malformed source URL '{}': {}", trimmed, e)))?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(EngineError::InvalidInput(format!(
            "Source URL must be an http(s) address: {}",
            trimmed
        ))),
    }
}

/// Extract the video id from the common YouTube URL shapes
pub fn youtube_video_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let mut segments = url.path_segments()?;

    let id = match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" => match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("shorts") | Some("embed") | Some("live") => segments.next().map(str::to_string),
            _ => None,
        },
        _ => None,
    };
    id.filter(|id| !id.is_empty())
}

pub fn thumbnail_for(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/hqdefault.jpg", video_id)
}
