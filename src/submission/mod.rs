//! Serializes the reviewed aggregate and posts it in a single request.

pub mod transport;

use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{Result, SubmissionError};
use crate::review::{ReviewRow, ReviewSummary};
use crate::wizard::Wizard;

pub use transport::{HttpTransport, SubmissionTransport};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Body layout of the submission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    /// `{main: {sub: [{id, label, value, frequency}]}}`
    #[default]
    Aggregate,
    /// `[{id, value, frequency}]` for every input field.
    Projection,
}

impl PayloadShape {
    pub fn label(self) -> &'static str {
        match self {
            PayloadShape::Aggregate => "aggregate",
            PayloadShape::Projection => "projection",
        }
    }
}

impl fmt::Display for PayloadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PayloadShape {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "aggregate" => Ok(PayloadShape::Aggregate),
            "projection" => Ok(PayloadShape::Projection),
            other => Err(format!(
                "unknown payload shape `{other}` (expected aggregate or projection)"
            )),
        }
    }
}

#[derive(Serialize)]
struct WireRow<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u32>,
    label: &'a str,
    value: JsonValue,
    frequency: &'a str,
}

#[derive(Serialize)]
struct ProjectedField<'a> {
    id: Option<u32>,
    value: JsonValue,
    frequency: &'a str,
}

fn wire_frequency(row: &ReviewRow) -> &'static str {
    match row.frequency {
        Some(frequency) if row.kind.accepts_frequency() => frequency.label(),
        _ => "",
    }
}

struct AggregateDocument<'a>(&'a ReviewSummary);

impl Serialize for AggregateDocument<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut mains = serializer.serialize_map(Some(self.0.categories.len()))?;
        for category in &self.0.categories {
            mains.serialize_entry(&category.name, &CategoryDocument(category))?;
        }
        mains.end()
    }
}

struct CategoryDocument<'a>(&'a crate::review::CategorySummary);

impl Serialize for CategoryDocument<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut subs = serializer.serialize_map(Some(self.0.subcategories.len()))?;
        for summary in &self.0.subcategories {
            let rows: Vec<WireRow<'_>> = summary
                .rows
                .iter()
                .map(|row| WireRow {
                    id: row.id,
                    label: &row.label,
                    value: row.value.to_wire(&row.kind),
                    frequency: wire_frequency(row),
                })
                .collect();
            subs.serialize_entry(&summary.key, &rows)?;
        }
        subs.end()
    }
}

/// Serializes the summary in the requested shape.
pub fn build_payload(
    summary: &ReviewSummary,
    shape: PayloadShape,
) -> std::result::Result<String, SubmissionError> {
    let encoded = match shape {
        PayloadShape::Aggregate => serde_json::to_string(&AggregateDocument(summary)),
        PayloadShape::Projection => {
            let fields: Vec<ProjectedField<'_>> = summary
                .categories
                .iter()
                .flat_map(|category| &category.subcategories)
                .flat_map(|sub| &sub.rows)
                .map(|row| ProjectedField {
                    id: row.id,
                    value: row.value.to_wire(&row.kind),
                    frequency: wire_frequency(row),
                })
                .collect();
            serde_json::to_string_pretty(&fields)
        }
    };
    encoded.map_err(|err| SubmissionError::Encode(err.to_string()))
}

/// Cancels the submission currently being awaited.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub status: u16,
    pub bytes: usize,
    pub session_id: Uuid,
}

/// Runs each request on a worker thread and waits for it with a deadline
/// and an abort flag. Only one request may be outstanding.
#[derive(Clone)]
pub struct SubmissionSink {
    transport: Arc<dyn SubmissionTransport>,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
    abort: AbortHandle,
}

impl fmt::Debug for SubmissionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionSink")
            .field("timeout", &self.timeout)
            .field("in_flight", &self.is_in_flight())
            .finish()
    }
}

impl SubmissionSink {
    pub fn new(transport: Arc<dyn SubmissionTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
            abort: AbortHandle::default(),
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Posts `body` and waits for a 2xx status.
    pub fn send(&self, body: String) -> std::result::Result<u16, SubmissionError> {
        self.abort.reset();
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SubmissionError::InFlight);
        }
        // Held by the worker so an abandoned request still blocks retries.
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        let (tx, rx) = mpsc::channel();
        let transport = Arc::clone(&self.transport);
        thread::spawn(move || {
            let _guard = guard;
            let _ = tx.send(transport.post(&body));
        });

        let deadline = Instant::now() + self.timeout;
        loop {
            if self.abort.is_aborted() {
                return Err(SubmissionError::Aborted);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SubmissionError::Timeout);
            }
            match rx.recv_timeout(remaining.min(POLL_INTERVAL)) {
                Ok(Ok(status)) if (200..=299).contains(&status) => return Ok(status),
                Ok(Ok(status)) => return Err(SubmissionError::Http(status)),
                Ok(Err(err)) => return Err(err),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SubmissionError::Transport(
                        "submission worker exited without a result".into(),
                    ))
                }
            }
        }
    }

    /// Submits the whole aggregate. On success every persisted step is
    /// cleared and the wizard restarts at the first step; on failure nothing
    /// is touched so the same payload can be sent again.
    pub fn submit(&self, wizard: &mut Wizard, shape: PayloadShape) -> Result<SubmissionReceipt> {
        let summary = wizard.enter_review();
        let body = build_payload(&summary, shape)?;
        let bytes = body.len();
        let session_id = wizard.session_id();

        match self.send(body) {
            Ok(status) => {
                info!(%session_id, status, bytes, "submission accepted");
                wizard.session_mut().clear_all_persisted()?;
                wizard.restart()?;
                Ok(SubmissionReceipt {
                    status,
                    bytes,
                    session_id,
                })
            }
            Err(err) => {
                warn!(%session_id, error = %err, "submission failed; state kept for retry");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::catalog::Catalog;
    use crate::domain::FieldValue;
    use crate::storage::{ClientStorage, MemoryStorage};

    struct RecordingTransport {
        status: u16,
        bodies: Mutex<Vec<String>>,
        delay: Duration,
    }

    impl RecordingTransport {
        fn new(status: u16) -> Self {
            Self {
                status,
                bodies: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }
    }

    impl SubmissionTransport for RecordingTransport {
        fn post(&self, body: &str) -> std::result::Result<u16, SubmissionError> {
            thread::sleep(self.delay);
            self.bodies.lock().unwrap().push(body.to_string());
            Ok(self.status)
        }
    }

    fn wizard(storage: &MemoryStorage) -> Wizard {
        let catalog = Catalog::from_json(
            r#"{"Income": ["Salary"], "Savings": []}"#,
            r#"{"Salary": [{"id": 1, "label": "Base", "value": 0, "frequency": "Monthly"}],
                "Savings": [{"id": 2, "label": "Note", "kind": "text"}]}"#,
        )
        .unwrap();
        Wizard::new(Arc::new(catalog), Arc::new(storage.clone())).unwrap()
    }

    #[test]
    fn aggregate_payload_keeps_taxonomy_order() {
        let storage = MemoryStorage::new();
        let mut wizard = wizard(&storage);
        wizard.session_mut().input(0, "1500").unwrap();
        let summary = wizard.enter_review();
        let body = build_payload(&summary, PayloadShape::Aggregate).unwrap();
        assert_eq!(
            body,
            r#"{"Income":{"Salary":[{"id":1,"label":"Base","value":1500.0,"frequency":"Monthly"}]},"Savings":{"Savings":[{"id":2,"label":"Note","value":"","frequency":""}]}}"#
        );

        let projection = build_payload(&summary, PayloadShape::Projection).unwrap();
        let parsed: JsonValue = serde_json::from_str(&projection).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([
                {"id": 1, "value": 1500.0, "frequency": "Monthly"},
                {"id": 2, "value": "", "frequency": ""}
            ])
        );
    }

    #[test]
    fn failure_keeps_state_and_retry_resends_the_same_body() {
        let storage = MemoryStorage::new();
        let mut wizard = wizard(&storage);
        wizard.session_mut().input(0, "1500").unwrap();
        let persisted = storage.get("Salary").unwrap();

        let transport = Arc::new(RecordingTransport::new(500));
        let sink = SubmissionSink::new(transport.clone(), Duration::from_secs(2));
        for _ in 0..2 {
            let err = sink.submit(&mut wizard, PayloadShape::Aggregate).unwrap_err();
            assert!(matches!(
                err,
                crate::errors::WizardError::Submission(SubmissionError::Http(500))
            ));
            assert_eq!(storage.get("Salary").unwrap(), persisted);
        }
        let bodies = transport.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0], bodies[1]);
    }

    #[test]
    fn success_clears_storage_and_restarts() {
        let storage = MemoryStorage::new();
        let mut wizard = wizard(&storage);
        wizard.session_mut().input(0, "1500").unwrap();
        wizard.advance().unwrap();

        let sink = SubmissionSink::new(
            Arc::new(RecordingTransport::new(201)),
            Duration::from_secs(2),
        );
        let receipt = sink.submit(&mut wizard, PayloadShape::Aggregate).unwrap();
        assert_eq!(receipt.status, 201);
        assert_eq!(wizard.progress(), (1, 2));
        assert_eq!(wizard.session().rows()[0].value, FieldValue::Numeric(0.0));
        assert_eq!(storage.get("Salary").unwrap(), None);
        assert_ne!(wizard.session_id(), receipt.session_id);
    }

    #[test]
    fn slow_transport_times_out_and_abort_is_reported() {
        let transport = Arc::new(RecordingTransport {
            status: 200,
            bodies: Mutex::new(Vec::new()),
            delay: Duration::from_millis(300),
        });
        let sink = SubmissionSink::new(transport, Duration::from_millis(50));
        assert_eq!(sink.send("{}".into()), Err(SubmissionError::Timeout));

        let patient = SubmissionSink::new(
            Arc::new(RecordingTransport {
                status: 200,
                bodies: Mutex::new(Vec::new()),
                delay: Duration::from_millis(300),
            }),
            Duration::from_secs(5),
        );
        let handle = patient.abort_handle();
        let aborter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.abort();
        });
        assert_eq!(patient.send("{}".into()), Err(SubmissionError::Aborted));
        aborter.join().unwrap();
    }

    #[test]
    fn abandoned_request_blocks_retry_until_it_settles() {
        let transport = Arc::new(RecordingTransport {
            status: 200,
            bodies: Mutex::new(Vec::new()),
            delay: Duration::from_millis(300),
        });
        let sink = SubmissionSink::new(transport.clone(), Duration::from_millis(50));
        assert_eq!(sink.send("{}".into()), Err(SubmissionError::Timeout));
        assert!(sink.is_in_flight());
        assert_eq!(sink.send("{}".into()), Err(SubmissionError::InFlight));

        let settled = Instant::now() + Duration::from_secs(5);
        while sink.is_in_flight() && Instant::now() < settled {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(!sink.is_in_flight());
        assert_eq!(transport.bodies.lock().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_submission_is_refused() {
        let sink = SubmissionSink::new(
            Arc::new(RecordingTransport {
                status: 200,
                bodies: Mutex::new(Vec::new()),
                delay: Duration::from_millis(200),
            }),
            Duration::from_secs(5),
        );
        let other = sink.clone();
        let worker = thread::spawn(move || other.send("{}".into()));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sink.send("{}".into()), Err(SubmissionError::InFlight));
        assert_eq!(worker.join().unwrap(), Ok(200));
    }
}
