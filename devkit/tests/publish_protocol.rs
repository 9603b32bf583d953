use hassmqtt::{Device, Error, Metric, ANNOUNCE_INTERVAL};
use hassmqtt_devkit::{MockTransport, MockTransportError, TestHarness};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::advance;

#[tokio::test(start_paused = true)]
async fn test_config_announced_once_per_window() {
    let harness = TestHarness::new();
    let temp = harness.metric("temp", "sensor");

    temp.publish(&harness.transport, &20.0).await.unwrap();
    assert_eq!(harness.config_count(&temp), 1);
    assert_eq!(harness.state_count(&temp), 1);

    advance(Duration::from_secs(30)).await;
    temp.publish(&harness.transport, &20.5).await.unwrap();
    advance(Duration::from_secs(29)).await;
    temp.publish(&harness.transport, &21.0).await.unwrap();
    assert_eq!(harness.config_count(&temp), 1);
    assert_eq!(harness.state_count(&temp), 3);

    // exactly one interval after the announcement
    advance(Duration::from_secs(1)).await;
    temp.publish(&harness.transport, &21.5).await.unwrap();
    assert_eq!(harness.config_count(&temp), 2);

    advance(Duration::from_secs(10)).await;
    temp.publish(&harness.transport, &22.0).await.unwrap();
    assert_eq!(harness.config_count(&temp), 2);
    assert_eq!(harness.state_count(&temp), 5);
}

#[tokio::test(start_paused = true)]
async fn test_config_precedes_value() {
    let harness = TestHarness::new();
    let temp = harness.metric("temp", "sensor");

    temp.publish(&harness.transport, &20.0).await.unwrap();
    advance(ANNOUNCE_INTERVAL * 2).await;
    temp.publish(&harness.transport, &21.0).await.unwrap();

    let topics: Vec<String> = harness
        .transport
        .get_published_messages()
        .into_iter()
        .map(|m| m.topic)
        .collect();
    assert_eq!(
        topics,
        vec![
            temp.config_topic(),
            temp.topic(),
            temp.config_topic(),
            temp.topic(),
        ]
    );
    assert!(harness.transport.get_published_messages().iter().all(|m| !m.retain));
}

#[tokio::test]
async fn test_value_published_on_announced_state_topic() {
    let harness = TestHarness::new();
    let temp = harness.metric("temp", "sensor").with_device_class("temperature");

    temp.publish(&harness.transport, &19.5).await.unwrap();

    let config = harness.last_config(&temp).unwrap().unwrap();
    let messages = harness.transport.get_published_messages();
    assert_eq!(messages[1].topic, config.state_topic);
    assert_eq!(messages[1].payload, b"19.5");
}

#[tokio::test]
async fn test_scenario_topics() {
    let harness = TestHarness::with_device(Device::new("home", "host-abc", "kitchen"));
    let temp = harness.metric("temp", "sensor");

    temp.publish(&harness.transport, "warm").await.unwrap();

    let topics = harness.transport.get_attempts();
    assert_eq!(
        topics,
        vec![
            "homeassistant/sensor/home-host-abc-kitchen-temp/config".to_string(),
            "home/host-abc/kitchen/temp".to_string(),
        ]
    );
    assert_eq!(harness.last_state(&temp).unwrap(), Some("warm".into()));
}

#[tokio::test]
async fn test_config_failure_skips_value_and_keeps_metric_fresh() {
    let harness = TestHarness::new();
    let temp = harness.metric("temp", "sensor");
    harness.transport.fail_topic_times(temp.config_topic(), 1);

    let err = temp.publish(&harness.transport, &20.0).await.unwrap_err();
    match &err {
        Error::Transport { topic, source } => {
            assert_eq!(topic, &temp.config_topic());
            let cause = source.downcast_ref::<MockTransportError>().unwrap();
            assert_eq!(cause.topic, temp.config_topic());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(harness.transport.get_attempts(), vec![temp.config_topic()]);
    assert_eq!(temp.announced_at().await, None);

    // next call retries the announcement right away
    temp.publish(&harness.transport, &20.0).await.unwrap();
    assert_eq!(
        harness.transport.get_attempts(),
        vec![temp.config_topic(), temp.config_topic(), temp.topic()]
    );
    assert!(temp.announced_at().await.is_some());

    let stats = harness.get_stats();
    stats.print();
    assert_eq!(stats.failed_attempts, 1);
    assert_eq!(stats.topic_counts.get(&temp.config_topic()), Some(&1));
}

#[tokio::test]
async fn test_value_failure_keeps_announcement() {
    let harness = TestHarness::new();
    let temp = harness.metric("temp", "sensor");
    harness.transport.fail_topic_times(temp.topic(), 1);

    let err = temp.publish(&harness.transport, &20.0).await.unwrap_err();
    assert_eq!(err.topic(), temp.topic());
    assert!(temp.announced_at().await.is_some());

    temp.publish(&harness.transport, &20.0).await.unwrap();
    assert_eq!(harness.config_count(&temp), 1);
    assert_eq!(harness.state_count(&temp), 1);
    assert_eq!(
        harness.transport.get_attempts(),
        vec![temp.config_topic(), temp.topic(), temp.topic()]
    );
}

#[tokio::test]
async fn test_serialization_error_sends_nothing_for_value() {
    let harness = TestHarness::new();
    let temp = harness.metric("temp", "sensor");

    let mut unencodable = HashMap::new();
    unencodable.insert((1u8, 2u8), 3u8);

    let err = temp.publish(&harness.transport, &unencodable).await.unwrap_err();
    assert!(matches!(err, Error::Serialization { .. }));
    assert_eq!(err.topic(), temp.topic());
    // the config phase had already succeeded
    assert_eq!(harness.transport.get_attempts(), vec![temp.config_topic()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publishes_on_one_metric_do_not_interleave() {
    let transport = MockTransport::new().with_latency(Duration::from_millis(5));
    let device = Arc::new(Device::new("home", "host-abc", "kitchen"));
    let temp = Arc::new(Metric::new(device, "temp", "sensor"));

    let mut tasks = JoinSet::new();
    for i in 0..8 {
        let transport = transport.clone();
        let temp = temp.clone();
        tasks.spawn(async move { temp.publish(&transport, &i).await });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(transport.max_in_flight(), 1);
    let attempts = transport.get_attempts();
    assert_eq!(attempts.len(), 9);
    assert_eq!(attempts[0], temp.config_topic());
    assert!(attempts[1..].iter().all(|t| *t == temp.topic()));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_announce_once_after_window() {
    let transport = MockTransport::new().with_latency(Duration::from_millis(100));
    let device = Arc::new(Device::new("home", "host-abc", "kitchen"));
    let temp = Arc::new(Metric::new(device, "temp", "sensor"));

    temp.publish(&transport, &0).await.unwrap();
    advance(ANNOUNCE_INTERVAL + Duration::from_secs(1)).await;

    let mut tasks = JoinSet::new();
    for i in 1..=5 {
        let transport = transport.clone();
        let temp = temp.clone();
        tasks.spawn(async move { temp.publish(&transport, &i).await });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(transport.count_messages(&temp.config_topic()), 2);
    assert_eq!(transport.count_messages(&temp.topic()), 6);

    // every announcement is directly followed by its own value
    let attempts = transport.get_attempts();
    for (i, topic) in attempts.iter().enumerate() {
        if *topic == temp.config_topic() {
            assert_eq!(attempts[i + 1], temp.topic());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_metrics_of_one_device_publish_independently() {
    let harness = TestHarness::new();
    let transport = harness.transport.clone().with_latency(Duration::from_millis(10));
    let temp = harness.metric("temp", "sensor");
    let humidity = harness.metric("humidity", "sensor");

    let (a, b) = tokio::join!(
        temp.publish(&transport, &21.0),
        humidity.publish(&transport, &40),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(transport.max_in_flight(), 2);
    assert_eq!(harness.config_count(&temp), 1);
    assert_eq!(harness.config_count(&humidity), 1);
}
