// Shared fixtures for host-side tests.

#![allow(dead_code)]

use glam::{Vec2, Vec4};
use tsne_core::{AudioBackend, PlaybackError, PointSet};

/// Audio backend that records calls and lets tests end clips by hand.
#[derive(Debug, Default)]
pub struct MockAudio {
    next_handle: u32,
    live: Vec<u32>,
    pub started: Vec<String>,
    pub stopped: Vec<u32>,
    pub fail_media: Option<String>,
}

impl MockAudio {
    pub fn finish(&mut self, handle: u32) {
        self.live.retain(|h| *h != handle);
    }

    pub fn finish_all(&mut self) {
        self.live.clear();
    }

    pub fn live(&self) -> usize {
        self.live.len()
    }
}

impl AudioBackend for MockAudio {
    type Handle = u32;

    fn start(&mut self, media: &str) -> Result<u32, PlaybackError> {
        if self.fail_media.as_deref() == Some(media) {
            return Err(PlaybackError::Unresolvable(media.to_owned()));
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.live.push(handle);
        self.started.push(media.to_owned());
        Ok(handle)
    }

    fn is_playing(&self, handle: &u32) -> bool {
        self.live.contains(handle)
    }

    fn stop(&mut self, handle: &u32) {
        self.live.retain(|h| h != handle);
        self.stopped.push(*handle);
    }
}

/// Three points: (0,0) "cat", (1,0) "dog", (0,1) "catfish".
pub fn pets() -> PointSet {
    points_from(&[
        ((0.0, 0.0), "cat"),
        ((1.0, 0.0), "dog"),
        ((0.0, 1.0), "catfish"),
    ])
}

pub fn points_from(entries: &[((f32, f32), &str)]) -> PointSet {
    let positions = entries.iter().map(|((x, y), _)| Vec2::new(*x, *y)).collect();
    let colors = entries.iter().map(|_| Vec4::new(0.5, 0.25, 0.75, 1.0)).collect();
    let labels = entries.iter().map(|(_, l)| (*l).to_owned()).collect();
    let media = entries.iter().map(|(_, l)| format!("/media/{l}.wav")).collect();
    match PointSet::load(positions, colors, labels, media) {
        Ok(points) => points,
        Err(e) => panic!("fixture failed to load: {e}"),
    }
}
