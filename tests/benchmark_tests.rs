//! Performance benchmarks for the hot paths of the sync pipeline

use client::scene::{HeadlessScene, Scene, SpawnKind};
use client::sync::SyncEngine;
use shared::{check_overlap, decode, Bounds, ClientEnvelope, ClientMessage, MovementIntent};
use std::time::{Duration, Instant};

fn running_engine(stars: usize, bombs: usize) -> SyncEngine<HeadlessScene> {
    let mut engine = SyncEngine::new(HeadlessScene::new(), Duration::from_millis(100));
    engine.handle_text(
        r#"{"topic": "init", "player_id": "p1", "game_state": 1, "players": {}}"#,
        Instant::now(),
    );

    let stars: Vec<String> = (0..stars)
        .map(|i| format!(r#""s{}": {{"x": {}, "y": 100}}"#, i, 20 + i * 60))
        .collect();
    let bombs: Vec<String> = (0..bombs)
        .map(|i| format!(r#""b{}": {{"x": {}, "y": 50, "vx": 100}}"#, i, 400 + i))
        .collect();
    let game_start = format!(
        r#"{{"topic": "game_start", "payload": {{"stars": {{{}}}, "bombs": {{{}}}}}}}"#,
        stars.join(","),
        bombs.join(",")
    );
    engine.handle_text(&game_start, Instant::now());
    engine
}

/// Benchmarks decoding of the most frequent inbound topic
#[test]
fn benchmark_decode_player_movement() {
    let text = r#"{"type": "game_event", "topic": "player_movement", "player_id": "p2",
        "payload": {"x": 123.5, "y": 450, "facing": "left", "player_id": "p2"}}"#;

    let iterations = 50_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = decode(text);
    }

    let duration = start.elapsed();
    println!(
        "Movement decode: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks encoding of outbound movement reports
#[test]
fn benchmark_encode_movement() {
    let intent = MovementIntent {
        x: 100.0,
        y: 450.0,
        player_id: "p1".to_string(),
        ..Default::default()
    };

    let iterations = 50_000;
    let start = Instant::now();

    for i in 0..iterations {
        let envelope = ClientEnvelope::new("p1", ClientMessage::Movement(intent.clone()))
            .with_req_id(i as u64);
        let _ = envelope.encode();
    }

    let duration = start.elapsed();
    println!(
        "Movement encode: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks overlap checks between the avatar and a field of items
#[test]
fn benchmark_overlap_checks() {
    let avatar = Bounds::centered(100.0, 450.0, 32.0, 48.0);
    let items: Vec<Bounds> = (0..12)
        .map(|i| Bounds::centered(12.0 + i as f32 * 70.0, 100.0, 24.0, 24.0))
        .collect();

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        for item in &items {
            let _ = check_overlap(&avatar, item);
        }
    }

    let duration = start.elapsed();
    println!(
        "Overlap checks: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 500ms for 100k frames of 12 items
    assert!(duration.as_millis() < 500);
}

/// Benchmarks dispatch of remote movement into the registry and scene
#[test]
fn benchmark_dispatch_remote_movement() {
    let mut engine = running_engine(12, 4);
    for i in 0..8 {
        engine.handle_text(
            &format!(r#"{{"topic": "player_joined", "player_id": "p{}"}}"#, i + 2),
            Instant::now(),
        );
    }

    let messages: Vec<String> = (0..8)
        .map(|i| {
            format!(
                r#"{{"topic": "player_movement", "player_id": "p{}", "payload": {{"x": {}, "y": 450, "facing": "right"}}}}"#,
                i + 2,
                100 + i * 10
            )
        })
        .collect();

    let iterations = 5_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let now = Instant::now();
        for text in &messages {
            engine.handle_text(text, now);
        }
    }

    let duration = start.elapsed();
    println!(
        "Movement dispatch: {} rounds of {} players in {:?}",
        iterations,
        messages.len(),
        duration
    );

    assert_eq!(engine.registry().players.len(), 8);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks frame sampling plus frame tick with a populated scene
#[test]
fn benchmark_frame_tick() {
    let mut engine = running_engine(12, 20);

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let sample = engine.scene_mut().step(1.0 / 60.0);
        engine.on_frame_tick(sample, Instant::now());
        engine.report_movement();
        engine.drain_outbound();
    }

    let duration = start.elapsed();
    println!(
        "Frame tick: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks spawning and tearing down a full round of visuals
#[test]
fn benchmark_scene_spawn_destroy() {
    let mut scene = HeadlessScene::new();

    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        let handle = scene.spawn(SpawnKind::Star, (i % 800) as f32, 100.0);
        scene.destroy(handle);
    }

    let duration = start.elapsed();
    println!("Spawn/destroy: {} iterations in {:?}", iterations, duration);

    assert_eq!(scene.sprite_count(), 0);
    assert!(duration.as_millis() < 1000);
}
