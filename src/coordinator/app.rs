// Application coordinator for VoiceNotes
// Drives the store, the capture controller and the analysis gateway in
// response to user actions, and keeps the in-memory view up to date.

use log::{debug, info};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::notifier::{Notice, Notifier};
use crate::audio::{format_elapsed, CaptureController, CaptureDevice, CaptureStatus};
use crate::chat::Message;
use crate::database::{DatabaseManager, Notebook, Recording};
use crate::error::{AppError, AppResult};
use crate::llm_engine::AnalysisGateway;

/// What the user currently sees
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Oldest first
    pub notebooks: Vec<Notebook>,
    pub active_notebook_id: Option<String>,
    /// Recordings of the active notebook, most recent first
    pub recordings: Vec<Recording>,
    /// Chat transcript for the active notebook
    pub messages: Vec<Message>,
}

/// Marks one notebook switch; results carrying an outdated epoch are dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Selection {
    epoch: u64,
    notebook_id: String,
}

/// Clears the busy flag when the request finishes
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Coordinator {
    store: Arc<DatabaseManager>,
    capture: CaptureController,
    gateway: AnalysisGateway,
    notifier: Arc<dyn Notifier>,
    view: Mutex<ViewState>,
    selection: AtomicU64,
    thinking: AtomicBool,
}

impl Coordinator {
    pub fn new(
        store: Arc<DatabaseManager>,
        device: Arc<dyn CaptureDevice>,
        gateway: AnalysisGateway,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            capture: CaptureController::new(device),
            gateway,
            notifier,
            view: Mutex::new(ViewState::default()),
            selection: AtomicU64::new(0),
            thinking: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<DatabaseManager> {
        &self.store
    }

    pub fn capture(&self) -> &CaptureController {
        &self.capture
    }

    pub fn view(&self) -> ViewState {
        self.lock_view().clone()
    }

    pub fn notebooks(&self) -> Vec<Notebook> {
        self.lock_view().notebooks.clone()
    }

    pub fn active_notebook_id(&self) -> Option<String> {
        self.lock_view().active_notebook_id.clone()
    }

    pub fn active_notebook(&self) -> Option<Notebook> {
        let view = self.lock_view();
        let id = view.active_notebook_id.as_deref()?;
        view.notebooks.iter().find(|n| n.id == id).cloned()
    }

    pub fn recordings(&self) -> Vec<Recording> {
        self.lock_view().recordings.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock_view().messages.clone()
    }

    /// An analysis or chat request is outstanding
    pub fn is_thinking(&self) -> bool {
        self.thinking.load(Ordering::SeqCst)
    }

    pub fn capture_status(&self) -> CaptureStatus {
        self.capture.status()
    }

    /// Elapsed capture time as `m:ss`
    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.capture.elapsed_seconds())
    }

    /// Load every notebook from the store, oldest first
    pub async fn load_notebooks(&self) -> AppResult<Vec<Notebook>> {
        let result = self.store.run_blocking(|db| db.list_notebooks()).await;
        let mut notebooks = self.report(result.map_err(AppError::from), "Could not load notebooks")?;
        notebooks.sort_by_key(|n| n.created_at);

        self.lock_view().notebooks = notebooks.clone();
        info!("Loaded {} notebooks", notebooks.len());
        Ok(notebooks)
    }

    /// Create a notebook and make it the active one
    pub async fn create_notebook(&self, name: &str, color: &str) -> AppResult<Notebook> {
        let name = name.trim();
        if name.is_empty() {
            return self.report(Err(AppError::EmptyNotebookName), "Could not save the notebook");
        }

        let notebook = Notebook::new(name, color);
        let to_save = notebook.clone();
        let result = self.store.run_blocking(move |db| db.put_notebook(&to_save)).await;
        self.report(result.map_err(AppError::from), "Could not save the notebook")?;

        self.lock_view().notebooks.push(notebook.clone());
        info!("Created notebook {} ({})", notebook.id, notebook.name);

        self.select_notebook(&notebook.id).await?;
        self.notifier.notify(Notice::success("Notebook created"));
        Ok(notebook)
    }

    /// Switch the active notebook, clearing the chat and reloading recordings.
    ///
    /// A load that completes after a later switch is discarded.
    pub async fn select_notebook(&self, id: &str) -> AppResult<()> {
        let selection = self.report(self.begin_selection(id), "Could not open the notebook")?;

        let notebook_id = id.to_string();
        let result = self
            .store
            .run_blocking(move |db| db.list_recordings_by_notebook(&notebook_id))
            .await;

        match result {
            Ok(recordings) => {
                self.apply_selection(&selection, recordings);
                Ok(())
            }
            Err(e) if self.is_current(&selection) => {
                self.report(Err(AppError::from(e)), "Could not load recordings")
            }
            Err(e) => {
                debug!("Ignoring failed load for stale selection {}: {}", selection.notebook_id, e);
                Ok(())
            }
        }
    }

    /// Delete a notebook and every recording in it
    pub async fn delete_notebook(&self, id: &str) -> AppResult<()> {
        if self.capture.capturing_notebook_id().as_deref() == Some(id) {
            return self.report(Err(AppError::NotebookInUse(id.to_string())), "Could not delete");
        }

        let notebook_id = id.to_string();
        let result = self.store.run_blocking(move |db| db.delete_notebook(&notebook_id)).await;
        let removed = self.report(result.map_err(AppError::from), "Could not delete")?;

        {
            let mut view = self.lock_view();
            view.notebooks.retain(|n| n.id != id);
            if view.active_notebook_id.as_deref() == Some(id) {
                self.selection.fetch_add(1, Ordering::SeqCst);
                view.active_notebook_id = None;
                view.recordings.clear();
                view.messages.clear();
            }
        }

        info!("Deleted notebook {} with {} recordings", id, removed);
        self.notifier.notify(Notice::success("Notebook deleted"));
        Ok(())
    }

    /// Start capturing into the active notebook
    pub async fn start_recording(&self) -> AppResult<()> {
        let result = match self.active_notebook_id() {
            Some(notebook_id) => self.capture.start(&notebook_id).await.map(|_| ()).map_err(AppError::from),
            None => Err(AppError::NoActiveNotebook),
        };
        self.report(result, "Could not access the microphone")
    }

    /// Stop capturing and save the recording into the notebook it was started in
    pub async fn stop_recording(&self) -> AppResult<Recording> {
        let result = self.capture.stop(&self.store).await.map_err(AppError::from);
        let recording = self.report(result, "Could not save the recording")?;

        {
            let mut view = self.lock_view();
            if view.active_notebook_id.as_deref() == Some(recording.notebook_id.as_str()) {
                view.recordings.insert(0, recording.clone());
            }
        }

        self.notifier.notify(Notice::success("Recording saved"));
        Ok(recording)
    }

    pub async fn delete_recording(&self, id: &str) -> AppResult<()> {
        let recording_id = id.to_string();
        let result = self.store.run_blocking(move |db| db.delete_recording(&recording_id)).await;
        self.report(result.map_err(AppError::from), "Could not delete")?;

        self.lock_view().recordings.retain(|r| r.id != id);
        self.notifier.notify(Notice::success("Recording deleted"));
        Ok(())
    }

    /// Transcribe and summarize a recording, attaching the summary to it
    pub async fn analyze_recording(&self, id: &str) -> AppResult<Recording> {
        let result = self.analyze_recording_inner(id).await;
        let updated = self.report(result, "Could not process with the AI")?;

        {
            let mut view = self.lock_view();
            if let Some(entry) = view.recordings.iter_mut().find(|r| r.id == updated.id) {
                *entry = updated.clone();
            }
        }

        self.notifier.notify(Notice::success("Analysis complete"));
        Ok(updated)
    }

    async fn analyze_recording_inner(&self, id: &str) -> AppResult<Recording> {
        let _busy = self.begin_request()?;

        let recording_id = id.to_string();
        let recording = self
            .store
            .run_blocking(move |db| db.get_recording(&recording_id))
            .await?
            .ok_or_else(|| AppError::UnknownRecording(id.to_string()))?;

        let summary = self.gateway.analyze_recording(&recording).await?;
        let updated = recording.with_summary(summary);

        // The recording may have been deleted while the request was out.
        let (recording_id, summary, transcription) =
            (updated.id.clone(), updated.summary.clone(), updated.transcription.clone());
        let attached = self
            .store
            .run_blocking(move |db| {
                db.attach_analysis(&recording_id, summary.as_deref(), transcription.as_deref())
            })
            .await?;
        if !attached {
            return Err(AppError::UnknownRecording(updated.id));
        }

        info!("Attached summary to recording {}", updated.id);
        Ok(updated)
    }

    /// Ask the assistant about the active notebook.
    ///
    /// Blank input, or no active notebook, is ignored and yields `None`. A
    /// reply arriving after the notebook was switched is dropped.
    pub async fn send_message(&self, text: &str) -> AppResult<Option<Message>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let result = self.send_message_inner(text).await;
        self.report(result, "The assistant could not reply")
    }

    async fn send_message_inner(&self, text: &str) -> AppResult<Option<Message>> {
        let _busy = self.begin_request()?;

        let (epoch, history, recordings) = {
            let mut view = self.lock_view();
            if view.active_notebook_id.is_none() {
                return Ok(None);
            }
            let history = view.messages.clone();
            view.messages.push(Message::user(text));
            (self.selection.load(Ordering::SeqCst), history, view.recordings.clone())
        };

        let reply = self.gateway.converse(&history, text, &recordings).await?;
        let message = Message::model(reply);

        let mut view = self.lock_view();
        if self.selection.load(Ordering::SeqCst) == epoch {
            view.messages.push(message.clone());
        } else {
            debug!("Dropping chat reply for a notebook that is no longer active");
        }
        Ok(Some(message))
    }

    pub(crate) fn begin_selection(&self, id: &str) -> AppResult<Selection> {
        let mut view = self.lock_view();
        if !view.notebooks.iter().any(|n| n.id == id) {
            return Err(AppError::UnknownNotebook(id.to_string()));
        }

        let epoch = self.selection.fetch_add(1, Ordering::SeqCst) + 1;
        view.active_notebook_id = Some(id.to_string());
        view.recordings.clear();
        view.messages.clear();

        Ok(Selection {
            epoch,
            notebook_id: id.to_string(),
        })
    }

    /// Install loaded recordings unless a later switch superseded `selection`
    pub(crate) fn apply_selection(&self, selection: &Selection, recordings: Vec<Recording>) -> bool {
        let mut view = self.lock_view();
        if self.selection.load(Ordering::SeqCst) != selection.epoch {
            debug!("Discarding stale recordings for notebook {}", selection.notebook_id);
            return false;
        }
        view.recordings = recordings;
        true
    }

    fn is_current(&self, selection: &Selection) -> bool {
        self.selection.load(Ordering::SeqCst) == selection.epoch
    }

    fn begin_request(&self) -> AppResult<BusyGuard<'_>> {
        if self.thinking.swap(true, Ordering::SeqCst) {
            return Err(AppError::Busy);
        }
        Ok(BusyGuard(&self.thinking))
    }

    fn report<T>(&self, result: AppResult<T>, failure: &str) -> AppResult<T> {
        if let Err(e) = &result {
            self.notifier.notify(Notice::error(format!("{}: {}", failure, e)));
        }
        result
    }

    fn lock_view(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
