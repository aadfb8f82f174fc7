use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use sfbridge_client::sinks::EventWriter;
use sfbridge_client::source::{EventStream, SourceError};
use sfbridge_client::Forwarder;
use sfbridge_common::types::event::Envelope;

/// Replays a fixed script of events and errors, counting close calls.
struct ScriptedStream {
    items: VecDeque<Result<Value, SourceError>>,
    close_calls: Arc<AtomicU64>,
    fail_close: bool,
}

impl ScriptedStream {
    fn new(items: Vec<Result<Value, SourceError>>) -> (Self, Arc<AtomicU64>) {
        let close_calls = Arc::new(AtomicU64::new(0));
        (
            ScriptedStream {
                items: items.into(),
                close_calls: close_calls.clone(),
                fail_close: false,
            },
            close_calls,
        )
    }
}

impl EventStream for ScriptedStream {
    async fn next_event(&mut self) -> Result<Option<Value>, SourceError> {
        match self.items.pop_front() {
            Some(Ok(event)) => Ok(Some(event)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            Err(SourceError::Transport("disconnect failed".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Never yields an event; used to exercise cancellation.
struct PendingStream {
    close_calls: Arc<AtomicU64>,
}

impl EventStream for PendingStream {
    async fn next_event(&mut self) -> Result<Option<Value>, SourceError> {
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records every envelope it is asked to publish; optionally fails on one
/// call (1-based) to simulate a broker hiccup for a single event.
#[derive(Default)]
struct RecordingWriter {
    written: Mutex<Vec<Envelope>>,
    calls: AtomicU64,
    fail_on_call: Option<u64>,
}

impl RecordingWriter {
    fn failing_on(call: u64) -> Self {
        RecordingWriter {
            fail_on_call: Some(call),
            ..Default::default()
        }
    }

    fn written(&self) -> Vec<Envelope> {
        self.written.lock().unwrap().clone()
    }
}

impl EventWriter for &RecordingWriter {
    async fn write_event(&self, envelope: &Envelope) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(anyhow!("broker unreachable"));
        }
        self.written.lock().unwrap().push(envelope.clone());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

fn metric_event(n: u64) -> Value {
    json!({
        "event": { "createdDate": format!("2024-01-01T00:00:{n:02}Z") },
        "Metric_Name__c": "cpu",
        "Metric_Value__c": n
    })
}

#[tokio::test]
async fn forwards_all_events_in_arrival_order() {
    let events: Vec<_> = (1..=5).map(|n| Ok(metric_event(n))).collect();
    let (stream, close_calls) = ScriptedStream::new(events);
    let writer = RecordingWriter::default();
    let forwarder = Forwarder::new("Monitoring_Event__e", &writer);

    forwarder
        .run(stream, CancellationToken::new())
        .await
        .unwrap();

    let written = writer.written();
    assert_eq!(written.len(), 5);
    for (i, envelope) in written.iter().enumerate() {
        assert_eq!(envelope.data, metric_event(i as u64 + 1));
        assert_eq!(
            envelope.timestamp,
            Some(json!(format!("2024-01-01T00:00:{:02}Z", i + 1)))
        );
    }
    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(forwarder.counters().forwarded(), 5);
    assert_eq!(forwarder.counters().failed(), 0);
}

#[tokio::test]
async fn one_failing_event_does_not_stop_the_loop() {
    let events: Vec<_> = (1..=5).map(|n| Ok(metric_event(n))).collect();
    let (stream, _) = ScriptedStream::new(events);
    let writer = RecordingWriter::failing_on(3);
    let forwarder = Forwarder::new("Monitoring_Event__e", &writer);

    forwarder
        .run(stream, CancellationToken::new())
        .await
        .unwrap();

    let written = writer.written();
    let delivered: Vec<_> = written
        .iter()
        .map(|e| e.data["Metric_Value__c"].as_u64().unwrap())
        .collect();
    assert_eq!(delivered, vec![1, 2, 4, 5]);
    assert_eq!(forwarder.counters().forwarded(), 4);
    assert_eq!(forwarder.counters().failed(), 1);
}

#[tokio::test]
async fn fatal_stream_error_closes_subscription_exactly_once() {
    let (stream, close_calls) = ScriptedStream::new(vec![
        Ok(metric_event(1)),
        Err(SourceError::Transport("connection reset".to_string())),
    ]);
    let writer = RecordingWriter::default();
    let forwarder = Forwarder::new("Monitoring_Event__e", &writer);

    let err = forwarder
        .run(stream, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("subscription lost"));
    assert_eq!(writer.written().len(), 1);
    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn close_runs_once_even_when_close_itself_fails() {
    let (mut stream, close_calls) = ScriptedStream::new(vec![Err(SourceError::Transport(
        "connection reset".to_string(),
    ))]);
    stream.fail_close = true;
    let writer = RecordingWriter::default();
    let forwarder = Forwarder::new("Monitoring_Event__e", &writer);

    let result = forwarder.run(stream, CancellationToken::new()).await;

    assert!(result.is_err());
    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancellation_stops_the_loop_and_closes_the_subscription() {
    let close_calls = Arc::new(AtomicU64::new(0));
    let stream = PendingStream {
        close_calls: close_calls.clone(),
    };
    let writer = RecordingWriter::default();
    let forwarder = Forwarder::new("Monitoring_Event__e", &writer);

    let token = CancellationToken::new();
    token.cancel();

    forwarder.run(stream, token).await.unwrap();

    assert!(writer.written().is_empty());
    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn published_wire_format_matches_the_contract() {
    let inbound = json!({
        "event": { "createdDate": "2024-01-01T00:00:00Z" },
        "Metric_Name__c": "cpu",
        "Metric_Value__c": 42.5
    });
    let (stream, _) = ScriptedStream::new(vec![Ok(inbound.clone())]);
    let writer = RecordingWriter::default();
    let forwarder = Forwarder::new("Monitoring_Event__e", &writer);

    forwarder
        .run(stream, CancellationToken::new())
        .await
        .unwrap();

    let wire = serde_json::to_value(&writer.written()[0]).unwrap();
    assert_eq!(
        wire,
        json!({
            "event_type": "Monitoring_Event__e",
            "data": inbound,
            "timestamp": "2024-01-01T00:00:00Z"
        })
    );
}

#[tokio::test]
async fn event_without_created_date_is_forwarded_with_null_timestamp() {
    let inbound = json!({ "Metric_Name__c": "cpu" });
    let (stream, _) = ScriptedStream::new(vec![Ok(inbound.clone())]);
    let writer = RecordingWriter::default();
    let forwarder = Forwarder::new("Monitoring_Event__e", &writer);

    forwarder
        .run(stream, CancellationToken::new())
        .await
        .unwrap();

    let written = writer.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].data, inbound);
    assert_eq!(written[0].timestamp, None);
    assert_eq!(forwarder.counters().failed(), 0);
}
