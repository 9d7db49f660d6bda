// Host-side tests for the bounded playback scheduler.

mod common;

use common::MockAudio;
use std::time::{Duration, Instant};
use tsne_core::{SchedulerParams, SoundScheduler, Trigger, MAX_SOUNDS};

fn scheduler(capacity: usize) -> SoundScheduler<MockAudio> {
    SoundScheduler::new(
        MockAudio::default(),
        SchedulerParams {
            capacity,
            grace: Duration::from_millis(1000),
        },
    )
}

fn media(i: usize) -> Option<&'static str> {
    ["a.wav", "b.wav", "c.wav", "d.wav"].get(i).copied()
}

#[test]
fn default_params_use_crate_constants() {
    let params = SchedulerParams::default();
    assert_eq!(params.capacity, MAX_SOUNDS);
    assert_eq!(params.grace, Duration::from_millis(1000));
}

#[test]
fn selection_starts_playback() {
    let mut s = scheduler(4);
    let now = Instant::now();
    assert_eq!(s.on_selection_change(Some(1), media, now), Trigger::Started(1));
    assert_eq!(s.active(), 1);
    assert!(s.is_playing_index(1, now));
    assert_eq!(s.backend().started, vec!["b.wav".to_owned()]);
    assert_eq!(s.recent_media(), Some("b.wav"));
}

#[test]
fn no_selection_is_idle() {
    let mut s = scheduler(4);
    assert_eq!(s.on_selection_change(None, media, Instant::now()), Trigger::Idle);
    assert_eq!(s.active(), 0);
    assert!(s.recent_media().is_none());
}

#[test]
fn capacity_one_drops_second_request() {
    let mut s = scheduler(1);
    let now = Instant::now();
    assert_eq!(s.on_selection_change(Some(0), media, now), Trigger::Started(0));
    assert_eq!(s.on_selection_change(Some(1), media, now), Trigger::Dropped(1));
    assert_eq!(s.active(), 1);
    assert_eq!(s.backend().started.len(), 1);
    // the in-flight clip was not interrupted
    assert!(s.backend().stopped.is_empty());
}

#[test]
fn never_exceeds_capacity() {
    let mut s = scheduler(3);
    let now = Instant::now();
    for i in 0..40 {
        s.on_selection_change(Some(i), |_| Some("x.wav"), now);
        assert!(s.active() <= s.capacity());
    }
    assert_eq!(s.active(), 3);
}

#[test]
fn duplicate_index_is_not_retriggered_while_playing() {
    let mut s = scheduler(4);
    let now = Instant::now();
    s.on_selection_change(Some(2), media, now);
    assert_eq!(
        s.on_selection_change(Some(2), media, now),
        Trigger::AlreadyPlaying(2)
    );
    assert_eq!(s.active(), 1);
}

#[test]
fn finished_index_can_play_again() {
    let mut s = scheduler(4);
    let now = Instant::now();
    s.on_selection_change(Some(2), media, now);
    s.backend_mut().finish_all();
    assert_eq!(s.on_selection_change(Some(2), media, now), Trigger::Started(2));
}

#[test]
fn tick_reclaims_clips_the_backend_ended() {
    let mut s = scheduler(4);
    let now = Instant::now();
    s.on_selection_change(Some(0), media, now);
    s.on_selection_change(Some(1), media, now);
    s.backend_mut().finish(0);
    assert_eq!(s.tick(now), 1);
    assert_eq!(s.active(), 1);
    assert!(!s.is_playing_index(0, now));
    assert!(s.is_playing_index(1, now));
}

#[test]
fn tick_reclaims_after_grace_ceiling() {
    let mut s = scheduler(4);
    let start = Instant::now();
    s.on_selection_change(Some(0), media, start);
    assert_eq!(s.tick(start + Duration::from_millis(1000)), 0);
    assert_eq!(s.tick(start + Duration::from_millis(1001)), 1);
    assert_eq!(s.active(), 0);
    // the backend was told to release the clip it still thought was playing
    assert_eq!(s.backend().stopped, vec![0]);
    assert_eq!(s.backend().live(), 0);
}

#[test]
fn unreclaimed_finished_slot_is_not_playing() {
    let mut s = scheduler(4);
    let start = Instant::now();
    s.on_selection_change(Some(0), media, start);
    s.on_selection_change(Some(1), media, start);
    s.backend_mut().finish(1);
    // both slots are still held until the next tick
    assert_eq!(s.active(), 2);
    assert!(s.is_playing_index(0, start));
    assert!(!s.is_playing_index(1, start));
    assert!(!s.is_playing_index(0, start + Duration::from_millis(1001)));
    assert_eq!(s.on_selection_change(Some(1), media, start), Trigger::Started(1));
}

#[test]
fn full_pool_reclaims_before_dropping() {
    let mut s = scheduler(1);
    let now = Instant::now();
    s.on_selection_change(Some(0), media, now);
    s.backend_mut().finish_all();
    // slot 0 is finished but not yet ticked away
    assert_eq!(s.on_selection_change(Some(1), media, now), Trigger::Started(1));
    assert_eq!(s.active(), 1);
}

#[test]
fn start_failure_is_swallowed() {
    let mut s = scheduler(4);
    s.backend_mut().fail_media = Some("c.wav".to_owned());
    let now = Instant::now();
    assert_eq!(s.on_selection_change(Some(2), media, now), Trigger::Failed(2));
    assert_eq!(s.active(), 0);
    assert_eq!(s.on_selection_change(Some(3), media, now), Trigger::Started(3));
}

#[test]
fn unknown_media_is_a_failure() {
    let mut s = scheduler(4);
    assert_eq!(
        s.on_selection_change(Some(9), media, Instant::now()),
        Trigger::Failed(9)
    );
}

#[test]
fn clear_stops_everything() {
    let mut s = scheduler(4);
    let now = Instant::now();
    s.on_selection_change(Some(0), media, now);
    s.on_selection_change(Some(1), media, now);
    s.clear();
    assert_eq!(s.active(), 0);
    assert_eq!(s.backend().stopped.len(), 2);
}
