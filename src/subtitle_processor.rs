use std::fmt;
use std::fs;
use std::path::Path;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::{warn, debug};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// @module: Subtitle cues, timestamps and active-cue resolution

// @const: SRT timing line regex
static SRT_TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}:\d{2}:\d{2}[,.]\d{3})\s*-->\s*(\d{1,2}:\d{2}:\d{2}[,.]\d{3})").unwrap()
});

// @const: WebVTT timing line regex (hours are optional)
static VTT_TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((?:\d+:)?\d{2}:\d{2}\.\d{3})\s+-->\s+((?:\d+:)?\d{2}:\d{2}\.\d{3})").unwrap()
});

// @const: WebVTT inline cue tags (<c>, <i>, <00:00:01.000>, ...)
static VTT_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<[^>]*>").unwrap()
});

/// A point in the video, stored as milliseconds since the start
///
/// The canonical text form is `HH:MM:SS.mmm`. Parsing is permissive: a
/// malformed timestamp resolves to zero instead of failing, so a single bad
/// cue cannot break playback sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Seconds as `h*3600 + m*60 + s + ms/1000`
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Strict parse of `HH:MM:SS.mmm` (also accepts `MM:SS.mmm` and a comma separator)
    pub fn parse(timestamp: &str) -> Option<Self> {
        let timestamp = timestamp.trim();
        let mut parts: Vec<&str> = timestamp.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return None;
        }

        let last = parts.pop()?;
        let (secs, millis) = last.split_once(['.', ','])?;
        if millis.is_empty() || millis.len() > 3 {
            return None;
        }

        let hours: u64 = if parts.len() == 2 { parts[0].parse().ok()? } else { 0 };
        let minutes: u64 = parts.last()?.parse().ok()?;
        let seconds: u64 = secs.parse().ok()?;
        // Fractional digits: ".5" is 500 ms
        let millis: u64 = format!("{:0<3}", millis).parse().ok()?;

        // Out-of-range components are malformed, not wrapped
        let total_secs = hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(seconds)?;
        Some(Timestamp(total_secs.checked_mul(1000)?.checked_add(millis)?))
    }

    /// Permissive parse: any malformed component yields zero
    pub fn parse_lenient(timestamp: &str) -> Self {
        match Self::parse(timestamp) {
            Some(ts) => ts,
            None => {
                debug!("Malformed timestamp '{}', defaulting to 0", timestamp);
                Self::ZERO
            }
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ms = self.0;
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Timestamp::parse_lenient(&raw))
    }
}

// @struct: Single time-bounded subtitle cue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleCue {
    // @field: Window start
    pub start: Timestamp,

    // @field: Window end (inclusive)
    pub end: Timestamp,

    // @field: Display text
    pub text: String,
}

impl SubtitleCue {
    pub fn new(start: Timestamp, end: Timestamp, text: impl Into<String>) -> Self {
        SubtitleCue {
            start,
            end,
            text: text.into(),
        }
    }

    /// Build a cue from textual timestamps, defaulting malformed ones to zero
    pub fn from_strings(start: &str, end: &str, text: impl Into<String>) -> Self {
        Self::new(Timestamp::parse_lenient(start), Timestamp::parse_lenient(end), text)
    }

    // @creates: Validated cue
    // @validates: start <= end and non-empty text
    pub fn new_validated(start: Timestamp, end: Timestamp, text: &str) -> Result<Self> {
        if end < start {
            return Err(anyhow!("Invalid time range: end {} < start {}", end, start));
        }

        let trimmed_text = text.trim();
        if trimmed_text.is_empty() {
            return Err(anyhow!("Empty subtitle text at {}", start));
        }

        Ok(Self::new(start, end, trimmed_text))
    }

    /// Whether `time_secs` falls inside `[start, end]`, both ends inclusive
    pub fn contains(&self, time_secs: f64) -> bool {
        self.start.as_secs_f64() <= time_secs && time_secs <= self.end.as_secs_f64()
    }
}

impl fmt::Display for SubtitleCue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{} --> {}] {}", self.start, self.end, self.text)
    }
}

/// Neighbor direction relative to a cue in list order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Index of the cue whose window contains `time_secs`
///
/// Assumes `cues` is sorted by start and non-overlapping. When two cues
/// touch at a boundary the earlier one wins. Unsorted input gives an
/// unspecified (but in-bounds) answer.
pub fn resolve_active_index(cues: &[SubtitleCue], time_secs: f64) -> Option<usize> {
    if !time_secs.is_finite() {
        return None;
    }

    let upper = cues.partition_point(|cue| cue.start.as_secs_f64() <= time_secs);

    let mut found = None;
    for index in (0..upper).rev() {
        if cues[index].end.as_secs_f64() < time_secs {
            break;
        }
        if cues[index].contains(time_secs) {
            found = Some(index);
        }
    }
    found
}

/// The cue active at `time_secs`, if any
pub fn resolve_active(cues: &[SubtitleCue], time_secs: f64) -> Option<&SubtitleCue> {
    resolve_active_index(cues, time_secs).map(|index| &cues[index])
}

/// Adjacent cue by list order, or `None` at the boundaries
pub fn neighbor(cues: &[SubtitleCue], index: usize, direction: Direction) -> Option<&SubtitleCue> {
    match direction {
        Direction::Previous => index.checked_sub(1).and_then(|i| cues.get(i)),
        Direction::Next => index.checked_add(1).and_then(|i| cues.get(i)),
    }
}

/// Previous/current/next cue text around one cue, as sent with generation requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueContext {
    pub previous: String,
    pub current: String,
    pub next: String,
}

impl CueContext {
    pub fn around(cues: &[SubtitleCue], index: usize) -> Self {
        let text_of = |cue: Option<&SubtitleCue>| cue.map(|c| c.text.clone()).unwrap_or_default();
        Self {
            previous: text_of(neighbor(cues, index, Direction::Previous)),
            current: text_of(cues.get(index)),
            next: text_of(neighbor(cues, index, Direction::Next)),
        }
    }
}

/// Supported cue-track formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueTrackFormat {
    Srt,
    WebVtt,
}

impl CueTrackFormat {
    /// Detect the format from file content
    pub fn detect(content: &str) -> Self {
        if content.trim_start_matches('\u{feff}').trim_start().starts_with("WEBVTT") {
            Self::WebVtt
        } else {
            Self::Srt
        }
    }
}

/// Load and parse a cue-track file (SRT or WebVTT)
pub fn load_cue_file<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleCue>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
    parse_cue_track(&content)
        .with_context(|| format!("Failed to parse subtitle file: {}", path.display()))
}

/// Parse cue-track content, auto-detecting the format
pub fn parse_cue_track(content: &str) -> Result<Vec<SubtitleCue>> {
    match CueTrackFormat::detect(content) {
        CueTrackFormat::WebVtt => parse_vtt(content),
        CueTrackFormat::Srt => parse_srt(content),
    }
}

/// Parse SRT content into a sorted cue sequence
pub fn parse_srt(content: &str) -> Result<Vec<SubtitleCue>> {
    let mut cues = Vec::new();
    let mut timing: Option<(Timestamp, Timestamp)> = None;
    let mut current_text = String::new();
    let mut line_count = 0;

    for line in content.lines() {
        line_count += 1;
        let trimmed = line.trim().trim_start_matches('\u{feff}');

        if trimmed.is_empty() {
            if let Some((start, end)) = timing.take() {
                push_cue(&mut cues, start, end, &current_text);
            }
            current_text.clear();
            continue;
        }

        if timing.is_none() {
            if let Some(caps) = SRT_TIMING_REGEX.captures(trimmed) {
                timing = Some((Timestamp::parse_lenient(&caps[1]), Timestamp::parse_lenient(&caps[2])));
                continue;
            }
            // Sequence numbers precede the timing line
            if trimmed.parse::<usize>().is_err() {
                warn!("Unexpected text at line {} before timing line: {}", line_count, trimmed);
            }
            continue;
        }

        if !current_text.is_empty() {
            current_text.push('\n');
        }
        current_text.push_str(trimmed);
    }

    if let Some((start, end)) = timing {
        push_cue(&mut cues, start, end, &current_text);
    }

    finish(cues)
}

/// Parse WebVTT content into a sorted cue sequence
///
/// Header, NOTE, STYLE and REGION blocks are skipped, cue identifiers are
/// ignored and inline cue tags are stripped from the text.
pub fn parse_vtt(content: &str) -> Result<Vec<SubtitleCue>> {
    let mut cues = Vec::new();
    let mut timing: Option<(Timestamp, Timestamp)> = None;
    let mut current_text = String::new();
    let mut skipping_block = false;

    for line in content.lines() {
        let trimmed = line.trim().trim_start_matches('\u{feff}');

        if trimmed.is_empty() {
            if let Some((start, end)) = timing.take() {
                push_cue(&mut cues, start, end, &current_text);
            }
            current_text.clear();
            skipping_block = false;
            continue;
        }

        if skipping_block {
            continue;
        }

        if timing.is_none() {
            if let Some(caps) = VTT_TIMING_REGEX.captures(trimmed) {
                timing = Some((Timestamp::parse_lenient(&caps[1]), Timestamp::parse_lenient(&caps[2])));
            } else if trimmed.starts_with("WEBVTT")
                || trimmed.starts_with("NOTE")
                || trimmed.starts_with("STYLE")
                || trimmed.starts_with("REGION")
            {
                skipping_block = true;
            }
            // Anything else before a timing line is a cue identifier
            continue;
        }

        let text = VTT_TAG_REGEX.replace_all(trimmed, "");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if !current_text.is_empty() {
            current_text.push('\n');
        }
        current_text.push_str(text);
    }

    if let Some((start, end)) = timing {
        push_cue(&mut cues, start, end, &current_text);
    }

    finish(cues)
}

fn push_cue(cues: &mut Vec<SubtitleCue>, start: Timestamp, end: Timestamp, text: &str) {
    match SubtitleCue::new_validated(start, end, text) {
        Ok(cue) => cues.push(cue),
        Err(e) => warn!("Skipping invalid cue: {}", e),
    }
}

fn finish(mut cues: Vec<SubtitleCue>) -> Result<Vec<SubtitleCue>> {
    if cues.is_empty() {
        return Err(anyhow!("No valid subtitle cues were found in the content"));
    }

    cues.sort_by_key(|cue| cue.start);

    let overlap_count = cues.windows(2).filter(|pair| pair[0].end > pair[1].start).count();
    if overlap_count > 0 {
        warn!("Found {} overlapping subtitle cues", overlap_count);
    }

    Ok(cues)
}
