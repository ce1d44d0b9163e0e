use std::time::Duration;

use geminitts_core::events::TtsEvent;
use geminitts_core::tts::{LineContext, RetryPolicy, TtsError, TtsRequest};
use tokio::time::Instant;

mod fixture;
use fixture::{pcm_for, samples_for, wav_samples, FakeTransport, Fixture};

#[tokio::test]
async fn test_cache_round_trip_skips_transport() {
    let mut fixture = Fixture::new();
    let request = TtsRequest::new("Read aloud", "zephyr", "Hello world");

    let first = fixture.client.synthesize(&request, None).await.unwrap();
    assert!(!first.from_cache);
    assert_eq!(wav_samples(&first.wav), samples_for("Hello world"));
    assert_eq!(fixture.transport.calls(), 1);

    let key = fixture.client.cache().key(&request);
    assert!(fixture.client.cache().try_get(&key).await.is_some());

    let second = fixture.client.synthesize(&request, None).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.wav, first.wav);
    assert_eq!(fixture.transport.calls(), 1);

    let events = fixture.drain_events();
    assert_eq!(events, vec![TtsEvent::CacheHit { line: None }]);
}

#[tokio::test]
async fn test_different_voice_misses_cache() {
    let fixture = Fixture::new();

    let a = TtsRequest::new("Read aloud", "zephyr", "Same text");
    let b = TtsRequest::new("Read aloud", "puck", "Same text");
    fixture.client.synthesize(&a, None).await.unwrap();
    fixture.client.synthesize(&b, None).await.unwrap();

    assert_eq!(fixture.transport.calls(), 2);
    assert_eq!(fixture.cache_entries(), 2);
}

#[tokio::test]
async fn test_voice_is_capitalized_in_request() {
    let fixture = Fixture::new();
    let request = TtsRequest::new("Read aloud", "AUTONOE", "Hi");

    let audio = fixture.client.generate(&request, None).await.unwrap();
    assert_eq!(audio.pcm, pcm_for("Hi"));
    assert_eq!(audio.format.sample_rate, 24_000);
    assert_eq!(fixture.transport.prompts(), vec!["Read aloud: Hi"]);
}

#[tokio::test]
async fn test_empty_voice_fails_without_calling_api() {
    let fixture = Fixture::new();
    let request = TtsRequest::new("Read aloud", "", "Hi");

    let result = fixture.client.synthesize(&request, None).await;
    assert!(matches!(result, Err(TtsError::Voice(_))));
    assert_eq!(fixture.transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_three_attempts_one_second_apart() {
    let transport = FakeTransport::new().failing("never works");
    let mut fixture = Fixture::build(transport, RetryPolicy::default(), false);
    let request = TtsRequest::new("Read aloud", "kore", "never works");
    let context = LineContext {
        line: 4,
        preview: "never works".to_string(),
    };

    let start = Instant::now();
    let result = fixture.client.generate(&request, Some(&context)).await;
    let elapsed = start.elapsed();

    match result {
        Err(TtsError::GenerationFailed {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("OTHER"), "unexpected: {last_error}");
        }
        other => panic!("expected GenerationFailed, got {other:?}"),
    }
    assert_eq!(fixture.transport.calls(), 3);
    assert_eq!(elapsed, Duration::from_secs(2));

    let retries: Vec<(u32, Option<Duration>)> = fixture
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            TtsEvent::RetryAttempt {
                line: Some(4),
                preview: Some(preview),
                attempt,
                max_attempts: 3,
                delay,
                ..
            } if preview == "never works" => Some((attempt, delay)),
            _ => None,
        })
        .collect();
    assert_eq!(
        retries,
        vec![
            (1, Some(Duration::from_secs(1))),
            (2, Some(Duration::from_secs(1))),
            (3, None),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_success_on_final_attempt() {
    let transport = FakeTransport::new().flaky("eventually", 2);
    let fixture = Fixture::build(transport, RetryPolicy::default(), false);
    let request = TtsRequest::new("Read aloud", "kore", "eventually");

    let start = Instant::now();
    let audio = fixture.client.generate(&request, None).await.unwrap();

    assert_eq!(audio.pcm, pcm_for("eventually"));
    assert_eq!(fixture.transport.calls(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test]
async fn test_disabled_cache_always_calls_transport() {
    let fixture = Fixture::build(
        FakeTransport::new(),
        RetryPolicy::new(1, Duration::ZERO),
        false,
    );
    let request = TtsRequest::new("Read aloud", "kore", "again");

    fixture.client.synthesize(&request, None).await.unwrap();
    let second = fixture.client.synthesize(&request, None).await.unwrap();

    assert!(!second.from_cache);
    assert_eq!(fixture.transport.calls(), 2);
    assert_eq!(fixture.cache_entries(), 0);
}
