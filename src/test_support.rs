//! Fakes shared by the unit tests

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc;

use crate::audio::{AudioFormat, CaptureDevice, CaptureError, CaptureStream, DeviceHandle};
use crate::chat::Message;
use crate::database::{DatabaseManager, Notebook};
use crate::llm_engine::{AnalysisError, AnalysisProvider, AudioPayload, RecordingContext};

pub fn temp_store() -> (TempDir, Arc<DatabaseManager>) {
    let dir = tempdir().unwrap();
    let db = DatabaseManager::initialize(dir.path().join("test.db")).unwrap();
    (dir, Arc::new(db))
}

pub fn temp_store_with_notebook(id: &str) -> (TempDir, Arc<DatabaseManager>) {
    let (dir, db) = temp_store();
    db.put_notebook(&Notebook {
        id: id.to_string(),
        name: "Biology".to_string(),
        color: "#111".to_string(),
        created_at: 1,
    })
    .unwrap();
    (dir, db)
}

struct FlagHandle(Arc<AtomicBool>);

impl DeviceHandle for FlagHandle {
    fn release(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Capture device fed by the test through an unbounded sender
pub struct FakeDevice {
    chunks: Mutex<Option<mpsc::UnboundedReceiver<Bytes>>>,
    released: Arc<AtomicBool>,
    denied: bool,
}

impl FakeDevice {
    pub fn new() -> (Self, mpsc::UnboundedSender<Bytes>, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let released = Arc::new(AtomicBool::new(false));
        let device = Self {
            chunks: Mutex::new(Some(rx)),
            released: released.clone(),
            denied: false,
        };
        (device, tx, released)
    }

    pub fn denied() -> Self {
        Self {
            chunks: Mutex::new(None),
            released: Arc::new(AtomicBool::new(false)),
            denied: true,
        }
    }
}

#[async_trait]
impl CaptureDevice for FakeDevice {
    fn device_name(&self) -> String {
        "fake".to_string()
    }

    async fn acquire(&self) -> Result<CaptureStream, CaptureError> {
        if self.denied {
            return Err(CaptureError::DeviceAccessDenied("permission refused".to_string()));
        }
        let rx = self
            .chunks
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| mpsc::unbounded_channel().1);
        self.released.store(false, Ordering::SeqCst);
        Ok(CaptureStream::new(
            AudioFormat::mono(16000),
            rx,
            Box::new(FlagHandle(self.released.clone())),
        ))
    }
}

/// One `converse` call as seen by the provider
#[derive(Debug, Clone)]
pub struct ConverseCall {
    pub history: Vec<Message>,
    pub message: String,
    pub context: Vec<RecordingContext>,
}

/// Analysis provider returning canned replies
#[derive(Default)]
pub struct FakeProvider {
    pub reply: Mutex<Option<String>>,
    pub analyze_calls: AtomicUsize,
    pub converse_calls: Mutex<Vec<ConverseCall>>,
    pub last_payload: Mutex<Option<AudioPayload>>,
}

impl FakeProvider {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Mutex::new(Some(reply.to_string())),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    fn reply(&self) -> Result<String, AnalysisError> {
        self.reply
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AnalysisError::Request("service unreachable".to_string()))
    }
}

#[async_trait]
impl AnalysisProvider for FakeProvider {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn analyze(&self, audio: &AudioPayload, _instruction: &str) -> Result<String, AnalysisError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_payload.lock().unwrap() = Some(audio.clone());
        self.reply()
    }

    async fn converse(
        &self,
        history: &[Message],
        message: &str,
        context: &[RecordingContext],
    ) -> Result<String, AnalysisError> {
        self.converse_calls.lock().unwrap().push(ConverseCall {
            history: history.to_vec(),
            message: message.to_string(),
            context: context.to_vec(),
        });
        self.reply()
    }
}
