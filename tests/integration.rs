//! End-to-end tests: transports, decoder worker, dispatcher and monitors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use topicwatch::{
    channel, wait_values, wait_values_at_once, ArrivalNotifier, Condition, DecoderWorker,
    Dispatcher, Generator, Message, MessageSink, Monitor, MonitorOutcome, NotifyError, Payload,
    StoreConfig, TopicSpec, TopicStore, UdpSink, UdpSource, WireFormat,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn wait_for_waiters(store: &TopicStore, topic: &str) {
    let start = Instant::now();
    while store.waiter_count(topic).unwrap() == 0 {
        assert!(start.elapsed() < Duration::from_secs(5));
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_monitor_all_sees_both_writes() {
    init_tracing();
    let (store, dispatcher) = Dispatcher::with_store(&StoreConfig::new(vec![
        TopicSpec::new("a", ["1"]),
        TopicSpec::new("b", ["3"]),
    ]))
    .unwrap();

    thread::scope(|s| {
        let monitor = s.spawn(|| {
            Monitor::all(&store, ["a", "b"], Duration::from_secs(2))
                .unwrap()
                .run(|store, arrived| {
                    assert_eq!(arrived.to_vec(), vec!["a", "b"]);
                    Ok(store.value("a", "1")? == Some(1.0) && store.value("b", "3")? == Some(1.0))
                })
        });

        wait_for_waiters(&store, "a");
        wait_for_waiters(&store, "b");
        dispatcher
            .dispatch(br#"{"type":"a","payload":{"1":1}}"#)
            .unwrap();
        dispatcher
            .dispatch(br#"{"type":"b","payload":{"3":1}}"#)
            .unwrap();

        let report = monitor.join().unwrap().unwrap();
        assert!(report.is_met());
        assert_eq!(report.wakeups, 1);
        assert_eq!(report.last_arrived, vec!["a", "b"]);
    });
}

#[test]
fn test_monitor_deadline_reported_not_raised() {
    init_tracing();
    let (store, _dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();

    let report = Monitor::any(&store, ["c"], Duration::from_millis(40))
        .unwrap()
        .run(|_, _| Ok(true))
        .unwrap();

    assert_eq!(report.outcome, MonitorOutcome::DeadlineExceeded);
    assert_eq!(report.wakeups, 0);
    assert_eq!(store.waiter_count("c").unwrap(), 0);
}

#[test]
fn test_monitor_unknown_topic_fails_fast() {
    let (store, _dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();
    let started = Instant::now();

    let result = Monitor::any(&store, ["x"], Duration::from_secs(10))
        .unwrap()
        .run(|_, _| Ok(true));

    assert!(matches!(result, Err(NotifyError::UnknownTopic(_))));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_generator_through_channel_meets_conditions() {
    init_tracing();
    let (store, dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();
    let (sink, source) = channel(Some(64));
    let worker = DecoderWorker::spawn(source, Arc::new(dispatcher)).unwrap();

    let conditions: Vec<Condition> = vec![
        "/a/1 >= 4".parse().unwrap(),
        "/b/3 >= 2".parse().unwrap(),
        "/a/2 > 0".parse().unwrap(),
    ];

    let generator = Generator::new(Generator::demo_streams().unwrap(), WireFormat::Json);
    let handle = generator.spawn(Arc::new(sink)).unwrap();

    let report = wait_values_at_once(&store, &conditions, Duration::from_secs(5)).unwrap();
    assert!(report.is_met());
    assert!(report.wakeups >= 1);

    let sent = handle.stop();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().any(|(name, n)| name == "a" && *n >= 3));

    // The generator dropped its sink, so the worker drains and exits.
    let stats = worker.join();
    assert_eq!(stats.dropped, 0);
    assert_eq!(stats.received, stats.dispatched);
    assert!(store.value("a", "1").unwrap().unwrap() >= 4.0);
}

#[test]
fn test_udp_end_to_end() {
    init_tracing();
    let (store, dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();
    let source = UdpSource::bind("127.0.0.1:0").unwrap();
    let sink = UdpSink::connect(source.local_addr().unwrap()).unwrap();
    let _worker = DecoderWorker::spawn(source, Arc::new(dispatcher)).unwrap();

    let handle = Generator::new(Generator::demo_streams().unwrap(), WireFormat::Json)
        .spawn(Arc::new(sink))
        .unwrap();

    let conditions: Vec<Condition> = vec!["/a/1 >= 2".parse().unwrap()];
    let report = wait_values(&store, &conditions, Duration::from_secs(5)).unwrap();
    assert!(report.is_met());

    handle.stop();
}

#[test]
fn test_msgpack_end_to_end() {
    init_tracing();
    let config = StoreConfig::demo().with_wire_format(WireFormat::MessagePack);
    let (store, dispatcher) = Dispatcher::with_store(&config).unwrap();
    let (sink, source) = channel(None);
    let worker = DecoderWorker::spawn(source, Arc::new(dispatcher)).unwrap();

    let raw = WireFormat::MessagePack
        .encode(&Message::new("c", Payload::new().with("5", 7.0).with("6", 8.0)))
        .unwrap();

    let pending = store.wait_topic("c").unwrap();
    sink.send(&raw).unwrap();
    assert_eq!(
        pending.wait_timeout(Duration::from_secs(2)).unwrap(),
        vec!["c"]
    );
    assert_eq!(store.value("c", "6").unwrap(), Some(8.0));

    drop(sink);
    let stats = worker.join();
    assert_eq!(stats.dispatched, 1);
}

#[test]
fn test_arrival_notifier_counts_topics() {
    init_tracing();
    let (store, dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();
    let stop = AtomicBool::new(false);

    thread::scope(|s| {
        let notifier = s.spawn(|| {
            ArrivalNotifier::all_topics(&store)
                .unwrap()
                .with_poll_interval(Duration::from_millis(500))
                .run(&stop)
        });

        wait_for_waiters(&store, "b");
        dispatcher
            .dispatch_message(Message::new("b", Payload::new().with("3", 1.0)))
            .unwrap();

        // Wait for the notifier to re-register before stopping it.
        thread::sleep(Duration::from_millis(50));
        wait_for_waiters(&store, "b");
        stop.store(true, Ordering::SeqCst);

        let counts = notifier.join().unwrap().unwrap();
        assert_eq!(counts.get("b"), Some(&1));
        assert_eq!(counts.get("a").copied().unwrap_or(0), 0);
    });
}

#[test]
fn test_config_file_drives_routing() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(
        &mut file,
        br#"{
            "topics": [{"name": "pose", "keys": ["x", "y"]}],
            "routes": {"odom": "pose"}
        }"#,
    )
    .unwrap();

    let config = StoreConfig::from_file(file.path()).unwrap();
    let (store, dispatcher) = Dispatcher::with_store(&config).unwrap();

    let receipt = dispatcher
        .dispatch(br#"{"type":"odom","payload":{"x":1.5,"y":-2}}"#)
        .unwrap();
    assert_eq!(receipt.topic, "pose");
    assert_eq!(store.value("pose", "y").unwrap(), Some(-2.0));
    assert!(dispatcher.dispatch(br#"{"type":"pose","payload":{}}"#).is_err());
}
