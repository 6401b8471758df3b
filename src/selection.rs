/*!
 * Word selection on the active subtitle cue.
 *
 * Clicking words builds a phrase one token at a time. A click extends the
 * phrase only when it lands on the token right after the last selected one;
 * any other click starts a new phrase. Selections never survive a change of
 * the active cue.
 */

use log::debug;

/// Characters removed from clicked and cue tokens before comparison
const STRIPPED_PUNCTUATION: [char; 6] = ['.', ',', '!', '?', '"', '“'];

/// Clean a raw token: drop the punctuation set and surrounding whitespace
pub fn clean_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Tracks the contiguous phrase selected on the active cue
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    active_cue_text: String,
    selected: Vec<String>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of the cue the selection is drawn from
    pub fn active_cue_text(&self) -> &str {
        &self.active_cue_text
    }

    /// Selected tokens in click order
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// The user-facing phrase: tokens joined by single spaces
    pub fn phrase(&self) -> String {
        self.selected.join(" ")
    }

    /// Record the active cue's text; a different text clears the selection
    ///
    /// Returns true when a reset happened.
    pub fn on_cue_changed(&mut self, new_text: &str) -> bool {
        if new_text == self.active_cue_text {
            return false;
        }
        self.reset(new_text);
        true
    }

    /// Replace the active text and clear the selection unconditionally
    pub fn reset(&mut self, new_text: &str) {
        if !self.selected.is_empty() {
            debug!("Clearing selection '{}' on cue change", self.phrase());
        }
        self.active_cue_text = new_text.to_string();
        self.selected.clear();
    }

    /// Apply a click on a word of the active cue
    ///
    /// Returns false when nothing changed: the cleaned token is empty or
    /// does not occur in the active cue.
    pub fn on_word_clicked(&mut self, raw_word: &str) -> bool {
        let word = clean_token(raw_word);
        if word.is_empty() {
            return false;
        }

        let Some(clicked_index) = self.token_index(&word) else {
            debug!("Ignoring click on '{}', not in the active cue", word);
            return false;
        };
        let last_index = self.selected.last().and_then(|last| self.token_index(last));
        let extends = last_index.is_some_and(|last| clicked_index == last + 1);

        if extends {
            self.selected.push(word);
        } else {
            self.selected = vec![word];
        }
        true
    }

    /// First position of `token` in the active cue's tokenization
    ///
    /// Repeated words always resolve to their first occurrence.
    fn token_index(&self, token: &str) -> Option<usize> {
        self.active_cue_text
            .split_whitespace()
            .map(clean_token)
            .position(|candidate| candidate == token)
    }
}
