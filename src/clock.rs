/*!
 * Playback clock sampling.
 *
 * The player is seen through a `PlaybackClock` handle. `ClockSampler` turns
 * it into a stream of positions at a fixed cadence, only while the handle
 * reports playback. Nothing is produced while paused or detached.
 */

use log::{debug, trace};
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::app_config::PlaybackConfig;

/// Read-only view of a media player's clock
pub trait PlaybackClock: Send + Sync + Debug {
    /// Current position in seconds, `None` before any position is known
    fn current_position(&self) -> Option<f64>;

    /// Whether the media is actively playing
    fn is_playing(&self) -> bool;
}

/// Periodic sampler over an attached `PlaybackClock`
#[derive(Debug)]
pub struct ClockSampler {
    period: Duration,
    handle: Option<Arc<dyn PlaybackClock>>,
    interval: Option<Interval>,
}

impl ClockSampler {
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(250);

    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: None,
            interval: None,
        }
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(Duration::from_millis(config.tick_interval_ms))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Attach a player handle; ticking starts if it is already playing
    pub fn attach(&mut self, handle: Arc<dyn PlaybackClock>) {
        let playing = handle.is_playing();
        self.handle = Some(handle);
        self.set_playing(playing);
    }

    /// Drop the player handle and stop ticking
    pub fn detach(&mut self) {
        self.handle = None;
        self.interval = None;
    }

    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    /// Start or stop the tick timer on a play/pause notification
    pub fn set_playing(&mut self, playing: bool) {
        if playing && self.handle.is_some() {
            if self.interval.is_none() {
                debug!("Clock sampling started every {:?}", self.period);
                let mut interval = tokio::time::interval(self.period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.interval = Some(interval);
            }
        } else if self.interval.take().is_some() {
            debug!("Clock sampling stopped");
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.interval.is_some()
    }

    /// Read the position once; invalid readings give `None`
    pub fn sample(&self) -> Option<f64> {
        let position = self.handle.as_ref()?.current_position()?;
        if position.is_finite() && position >= 0.0 {
            Some(position)
        } else {
            trace!("Dropping invalid clock sample {}", position);
            None
        }
    }

    /// Wait for the next valid sample
    ///
    /// Never resolves while the sampler is idle. Ticking stops on the first
    /// tick that finds the handle no longer playing. Cancel-safe.
    pub async fn next_sample(&mut self) -> f64 {
        loop {
            let Some(interval) = self.interval.as_mut() else {
                return std::future::pending::<f64>().await;
            };
            interval.tick().await;

            let playing = self.handle.as_ref().is_some_and(|handle| handle.is_playing());
            if !playing {
                self.set_playing(false);
                continue;
            }
            if let Some(position) = self.sample() {
                return position;
            }
        }
    }
}

impl Default for ClockSampler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PERIOD)
    }
}

#[derive(Debug)]
struct PlayerState {
    // Position at `anchor`, or the frozen position while paused
    base_position: f64,
    anchor: Option<Instant>,
    buffering: bool,
    loaded: bool,
}

/// A player handle advancing in real (or paused-test) time
#[derive(Debug)]
pub struct SimulatedPlayer {
    state: Mutex<PlayerState>,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlayerState {
                base_position: 0.0,
                anchor: None,
                buffering: false,
                loaded: true,
            }),
        }
    }

    /// A player that has not reported any position yet
    pub fn unloaded() -> Self {
        let player = Self::new();
        player.state.lock().loaded = false;
        player
    }

    pub fn play(&self) {
        let mut state = self.state.lock();
        state.loaded = true;
        if state.anchor.is_none() {
            state.anchor = Some(Instant::now());
        }
    }

    pub fn pause(&self) {
        let mut state = self.state.lock();
        if let Some(anchor) = state.anchor.take() {
            state.base_position += anchor.elapsed().as_secs_f64();
        }
    }

    pub fn seek(&self, position_secs: f64) {
        let mut state = self.state.lock();
        state.loaded = true;
        state.base_position = position_secs.max(0.0);
        if state.anchor.is_some() {
            state.anchor = Some(Instant::now());
        }
    }

    /// While buffering the player reports itself as not playing
    pub fn set_buffering(&self, buffering: bool) {
        self.state.lock().buffering = buffering;
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for SimulatedPlayer {
    fn current_position(&self) -> Option<f64> {
        let state = self.state.lock();
        if !state.loaded {
            return None;
        }
        let elapsed = state.anchor.map_or(0.0, |anchor| anchor.elapsed().as_secs_f64());
        Some(state.base_position + elapsed)
    }

    fn is_playing(&self) -> bool {
        let state = self.state.lock();
        state.anchor.is_some() && !state.buffering
    }
}
