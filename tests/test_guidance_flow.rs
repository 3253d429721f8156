//! End-to-end step sequencing on paused time.
//!
//! Timeline for the built-in catalog at 120 BPM, 30 compressions and a
//! 400 ms transition delay:
//!
//! | step | kind         | entered | leaves   |
//! |------|--------------|---------|----------|
//! | 0    | timed 10s    | 0.0     | 10.0     |
//! | 1    | timed 12s    | 10.4    | 22.4     |
//! | 2    | timed 8s     | 22.8    | 30.8     |
//! | 3    | timed 10s    | 31.2    | 41.2     |
//! | 4    | compressions | 41.6    | 56.6     |
//! | 5    | timed 12s    | 57.0    | 69.0     |
//! | 4    | compressions | 69.4    | (cycle 2) |

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{CountingBeeper, Harness, RecordingNarrator};
use cpr_guide::error::CatalogError;
use cpr_guide::guidance::{
    self, CompressionSource, EnginePhase, EnginePorts, GuidanceSettings, StepCatalog,
    StepDescriptor, StepKind,
};

#[tokio::test(start_paused = true)]
async fn test_full_cycle_timeline() {
    let h = Harness::builtin();
    let snap = h.engine.start().await.unwrap();
    assert_eq!(snap.phase, EnginePhase::StepActive);
    assert_eq!(snap.step_index, Some(0));
    assert_eq!(snap.time_remaining_seconds, 10);
    assert_eq!(snap.cycle_count, 1);

    h.at(9.5).await;
    assert_eq!(h.engine.snapshot().time_remaining_seconds, 1);

    h.at(10.2).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.phase, EnginePhase::Transitioning);
    assert_eq!(snap.step_index, Some(0));

    h.at(10.5).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.step_index, Some(1));
    assert_eq!(snap.time_remaining_seconds, 12);

    h.at(41.7).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.step_index, Some(4));
    assert_eq!(snap.step_type, Some(StepKind::Compressions));
    assert_eq!(snap.compression_count, 0);

    h.at(56.5).await;
    assert_eq!(h.engine.snapshot().compression_count, 29);

    h.at(56.8).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.compression_count, 30);
    assert_eq!(snap.phase, EnginePhase::Transitioning);

    h.at(57.1).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.step_index, Some(5));
    assert!(snap.is_last_step_of_cycle);
    // The count is kept until the compressions step is entered again.
    assert_eq!(snap.compression_count, 30);
    assert_eq!(snap.cycle_count, 1);

    h.at(69.5).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.step_index, Some(4));
    assert_eq!(snap.cycle_count, 2);
    assert_eq!(snap.compression_count, 0);
    assert!(!snap.is_last_step_of_cycle);
}

#[tokio::test(start_paused = true)]
async fn test_beeps_only_during_compressions() {
    let h = Harness::builtin();
    h.engine.start().await.unwrap();

    h.at(41.5).await;
    assert_eq!(h.beeper.count(), 0);

    h.at(56.7).await;
    assert_eq!(h.beeper.count(), 30);

    h.at(68.0).await;
    assert_eq!(h.beeper.count(), 30);
}

#[tokio::test(start_paused = true)]
async fn test_each_step_narrated_on_entry() {
    let h = Harness::builtin();
    h.engine.start().await.unwrap();
    h.at(57.1).await;

    let spoken = h.narrator.spoken();
    assert_eq!(spoken.len(), 6);
    for (text, step) in spoken.iter().zip(StepCatalog::builtin().steps()) {
        assert_eq!(text, &step.narration_text);
    }
}

fn short_catalog() -> StepCatalog {
    StepCatalog::new(vec![
        StepDescriptor::new(1, StepKind::Timed, 2, "assess"),
        StepDescriptor::new(2, StepKind::Compressions, 10, "push"),
        StepDescriptor::new(3, StepKind::Timed, 1, "breathe"),
    ])
    .unwrap()
}

fn short_settings() -> GuidanceSettings {
    GuidanceSettings {
        target_compressions: 4,
        compressions_step_index: 1,
        ..GuidanceSettings::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_cycle_wraps_to_compressions_step() {
    let h = Harness::new(short_catalog(), short_settings());
    h.engine.start().await.unwrap();

    // 0 -> 1 at 2.4s; four beats end at 4.4s; 2 entered at 4.8s.
    h.at(5.0).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.step_index, Some(2));
    assert!(snap.is_last_step_of_cycle);
    assert_eq!(snap.compression_count, 4);

    // 2 expires at 5.8s and wraps to 1 at 6.2s.
    h.at(6.3).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.step_index, Some(1));
    assert_eq!(snap.cycle_count, 2);
    assert_eq!(snap.compression_count, 0);

    // Step 0 is never revisited.
    h.at(30.0).await;
    let spoken = h.narrator.spoken();
    assert_eq!(spoken.iter().filter(|s| *s == "assess").count(), 1);
    assert!(h.engine.snapshot().cycle_count > 2);
}

#[tokio::test(start_paused = true)]
async fn test_events_record_wrap() {
    let h = Harness::new(short_catalog(), short_settings());
    h.engine.start().await.unwrap();
    h.at(6.3).await;

    let events = h.events.lines();
    let types = h.event_types();
    assert_eq!(types[0], "SessionStarted");
    assert_eq!(types[1], "StepEntered");

    let advances: Vec<_> = events
        .iter()
        .filter(|e| e["type"] == "StepAdvanced")
        .collect();
    assert_eq!(advances.len(), 3);
    assert_eq!(advances[0]["reason"], "countdown_expired");
    assert_eq!(advances[1]["reason"], "compression_target");
    assert_eq!(advances[2]["from"], 2);
    assert_eq!(advances[2]["to"], 1);
    assert_eq!(advances[2]["cycle_wrapped"], true);

    let sequences: Vec<u64> = events
        .iter()
        .map(|e| e["sequence"].as_u64().unwrap())
        .collect();
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test(start_paused = true)]
async fn test_skip_during_compressions_keeps_count_until_reentry() {
    let h = Harness::new(short_catalog(), short_settings());
    h.engine.start().await.unwrap();

    // Two beats into step 1 (2.9s, 3.4s), then skip.
    h.at(3.5).await;
    assert_eq!(h.engine.snapshot().compression_count, 2);
    h.engine.skip().await.unwrap();

    h.at(4.0).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.step_index, Some(2));
    assert_eq!(snap.compression_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_narration_completion_advances_when_enabled() {
    let settings = GuidanceSettings {
        advance_on_narration: true,
        ..GuidanceSettings::default()
    };
    let h = Harness::with_settings(settings);
    h.engine.start().await.unwrap();

    h.at(1.0).await;
    assert!(h.narrator.finish());
    h.at(1.2).await;
    assert_eq!(h.engine.snapshot().phase, EnginePhase::Transitioning);

    h.at(1.5).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.step_index, Some(1));
    assert_eq!(snap.time_remaining_seconds, 12);
}

#[tokio::test(start_paused = true)]
async fn test_narration_completion_ignored_by_default() {
    let h = Harness::builtin();
    h.engine.start().await.unwrap();

    h.at(1.0).await;
    assert!(h.narrator.finish());
    h.at(5.0).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.step_index, Some(0));
    assert_eq!(snap.phase, EnginePhase::StepActive);
}

#[tokio::test(start_paused = true)]
async fn test_late_narration_callback_is_stale() {
    let settings = GuidanceSettings {
        advance_on_narration: true,
        ..GuidanceSettings::default()
    };
    let h = Harness::with_settings(settings);
    h.engine.start().await.unwrap();

    // Keep step 0's callback, move on, then fire it in step 1.
    let late = h.narrator.take_callback().unwrap();
    h.engine.skip().await.unwrap();
    h.at(0.5).await;
    assert_eq!(h.engine.snapshot().step_index, Some(1));

    late();
    h.at(2.0).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.step_index, Some(1));
    assert_eq!(snap.phase, EnginePhase::StepActive);
}

#[tokio::test(start_paused = true)]
async fn test_narration_never_ends_compressions_step() {
    let settings = GuidanceSettings {
        advance_on_narration: true,
        ..short_settings()
    };
    let h = Harness::new(short_catalog(), settings);
    h.engine.start().await.unwrap();
    h.engine.skip().await.unwrap();

    h.at(0.5).await;
    assert_eq!(h.engine.snapshot().step_index, Some(1));
    assert!(h.narrator.finish());
    h.at(0.8).await;
    assert_eq!(h.engine.snapshot().phase, EnginePhase::StepActive);
    assert_eq!(h.engine.snapshot().step_index, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_manual_mode_counts_taps_only() {
    let settings = GuidanceSettings {
        compression_source: CompressionSource::Manual,
        ..short_settings()
    };
    let h = Harness::new(short_catalog(), settings);
    h.engine.start().await.unwrap();
    h.engine.skip().await.unwrap();

    h.at(2.0).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.step_index, Some(1));
    assert_eq!(snap.compression_count, 0);
    assert!(h.beeper.count() > 0);

    for i in 0..3_u32 {
        h.at(2.5 + f64::from(i) * 0.5).await;
        h.engine.tap().await.unwrap();
    }
    let snap = h.engine.snapshot();
    assert_eq!(snap.compression_count, 3);
    let rhythm = snap.rhythm.unwrap();
    assert_eq!(rhythm.bpm, 120);

    h.at(4.0).await;
    let snap = h.engine.tap().await.unwrap();
    assert_eq!(snap.compression_count, 4);
    assert_eq!(snap.phase, EnginePhase::Transitioning);
}

#[tokio::test(start_paused = true)]
async fn test_beep_failures_do_not_stall_counting() {
    let beeper = Arc::new(CountingBeeper::default());
    beeper.failing.store(true, Ordering::SeqCst);
    let h = Harness::with_ports(
        short_catalog(),
        short_settings(),
        Arc::new(RecordingNarrator::default()),
        beeper,
    );
    h.engine.start().await.unwrap();

    h.at(5.0).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.step_index, Some(2));
    assert_eq!(snap.compression_count, 4);
    assert_eq!(h.beeper.count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_port_init_failure_keeps_engine_running() {
    let narrator = Arc::new(RecordingNarrator::default());
    narrator.fail_init.store(true, Ordering::SeqCst);
    let h = Harness::with_ports(
        StepCatalog::builtin(),
        GuidanceSettings::default(),
        narrator,
        Arc::new(CountingBeeper::default()),
    );
    h.engine.start().await.unwrap();

    h.at(10.5).await;
    assert_eq!(h.engine.snapshot().step_index, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_rapid_skips_advance_once_per_transition() {
    let h = Harness::builtin();
    h.engine.start().await.unwrap();

    h.engine.skip().await.unwrap();
    h.engine.skip().await.unwrap();
    h.engine.skip().await.unwrap();

    h.at(0.5).await;
    assert_eq!(h.engine.snapshot().step_index, Some(1));
    let advanced = h
        .event_types()
        .iter()
        .filter(|t| *t == "StepAdvanced")
        .count();
    assert_eq!(advanced, 1);
}

#[tokio::test]
async fn test_spawn_rejects_zero_target() {
    let settings = GuidanceSettings {
        target_compressions: 0,
        ..GuidanceSettings::default()
    };
    let result = guidance::spawn(StepCatalog::builtin(), settings, EnginePorts::silent());
    assert!(matches!(result.err(), Some(CatalogError::ZeroTarget)));
}
