//! Bounded pool of in-flight audio previews.
//!
//! The scheduler reacts to selection-change edges by starting a clip through
//! an [`AudioBackend`], and reclaims slots once the backend reports the clip
//! ended or the grace ceiling passes. It never queues or evicts: a request
//! that arrives with the pool full is dropped.

use crate::constants::{playback_grace, MAX_SOUNDS};
use crate::error::PlaybackError;
use instant::Instant;
use smallvec::SmallVec;
use std::time::Duration;

/// Collaborator that actually plays media. Calls must not block on playback.
pub trait AudioBackend {
    type Handle;

    fn start(&mut self, media: &str) -> Result<Self::Handle, PlaybackError>;

    fn is_playing(&self, handle: &Self::Handle) -> bool;

    /// Called when a slot is reclaimed; backends may release resources here.
    fn stop(&mut self, _handle: &Self::Handle) {}
}

#[derive(Clone, Copy, Debug)]
pub struct SchedulerParams {
    pub capacity: usize,
    pub grace: Duration,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            capacity: MAX_SOUNDS,
            grace: playback_grace(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlaybackSlot<H> {
    pub handle: H,
    pub index: usize,
    pub media: String,
    pub started_at: Instant,
}

impl<H> PlaybackSlot<H> {
    #[inline]
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.duration_since(self.started_at)
    }
}

/// What a selection-change request turned into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// No point selected; nothing to play.
    Idle,
    Started(usize),
    /// The point already has a live slot.
    AlreadyPlaying(usize),
    /// Pool full; request discarded.
    Dropped(usize),
    /// Backend refused the clip; logged and discarded.
    Failed(usize),
}

pub struct SoundScheduler<B: AudioBackend> {
    backend: B,
    params: SchedulerParams,
    slots: SmallVec<[PlaybackSlot<B::Handle>; 8]>,
    recent_media: Option<String>,
}

impl<B: AudioBackend> SoundScheduler<B> {
    pub fn new(backend: B, params: SchedulerParams) -> Self {
        Self {
            backend,
            params,
            slots: SmallVec::new(),
            recent_media: None,
        }
    }

    pub fn on_selection_change<'a>(
        &mut self,
        new_index: Option<usize>,
        media_path_for: impl FnOnce(usize) -> Option<&'a str>,
        now: Instant,
    ) -> Trigger {
        let Some(index) = new_index else {
            return Trigger::Idle;
        };
        if self.is_playing_index(index, now) {
            return Trigger::AlreadyPlaying(index);
        }
        if self.slots.len() >= self.params.capacity {
            self.reclaim(now);
        }
        if self.slots.len() >= self.params.capacity {
            log::debug!(
                "[sound] pool full ({}/{}); dropping point {}",
                self.slots.len(),
                self.params.capacity,
                index
            );
            return Trigger::Dropped(index);
        }

        let Some(media) = media_path_for(index) else {
            let err = PlaybackError::Unresolvable(format!("point {index}"));
            log::warn!("[sound] {}", err);
            return Trigger::Failed(index);
        };
        match self.backend.start(media) {
            Ok(handle) => {
                log::debug!("[sound] start point={} media={}", index, media);
                self.slots.push(PlaybackSlot {
                    handle,
                    index,
                    media: media.to_owned(),
                    started_at: now,
                });
                self.recent_media = Some(media.to_owned());
                Trigger::Started(index)
            }
            Err(e) => {
                log::warn!("[sound] playback failed for point {}: {}", index, e);
                Trigger::Failed(index)
            }
        }
    }

    /// Remove finished slots and return how many were reclaimed.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.reclaim(now)
    }

    fn reclaim(&mut self, now: Instant) -> usize {
        let before = self.slots.len();
        let grace = self.params.grace;
        let backend = &mut self.backend;
        self.slots.retain(|slot| {
            let done = !backend.is_playing(&slot.handle) || slot.elapsed(now) > grace;
            if done {
                backend.stop(&slot.handle);
            }
            !done
        });
        before - self.slots.len()
    }

    fn is_finished(&self, slot: &PlaybackSlot<B::Handle>, now: Instant) -> bool {
        !self.backend.is_playing(&slot.handle) || slot.elapsed(now) > self.params.grace
    }

    /// Stop and forget every slot, e.g. when the dataset changes.
    pub fn clear(&mut self) {
        for slot in self.slots.drain(..) {
            self.backend.stop(&slot.handle);
        }
    }

    #[inline]
    pub fn active(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.params.capacity
    }

    pub fn params(&self) -> SchedulerParams {
        self.params
    }

    pub fn slots(&self) -> &[PlaybackSlot<B::Handle>] {
        &self.slots
    }

    /// True while `index` holds a slot that has not finished at `now`.
    pub fn is_playing_index(&self, index: usize, now: Instant) -> bool {
        self.slots
            .iter()
            .any(|s| s.index == index && !self.is_finished(s, now))
    }

    /// Media path of the most recently started clip.
    pub fn recent_media(&self) -> Option<&str> {
        self.recent_media.as_deref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
