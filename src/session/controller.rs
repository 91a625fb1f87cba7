//! Creation-flow controller — drives record → transcribe → generate → save.
//!
//! [`SessionController`] owns the [`SharedSession`] and the pipeline
//! collaborators behind `Arc<dyn …>` trait objects.  Each operation is
//! guarded by the current view: invoking a step from the wrong view is a
//! no-op, and the busy view is written *before* the step awaits anything,
//! so re-entry while a step is in flight is excluded.
//!
//! Failure routing: the failing step records a tagged [`SessionError`] in
//! the session bag and returns the view to the step's pre-failure state —
//! the payload survives a transcription failure, the transcript survives a
//! generation failure, the generated pitch survives a save failure.

use std::sync::{Arc, Mutex};

use crate::audio::{AudioPayload, AudioSource, CaptureError, RecordingSession};
use crate::pitch::PitchGenerator;
use crate::store::{NewPitch, PitchStore, SavedPitch};
use crate::transcribe::Transcriber;

use super::state::{new_shared_session, ErrorKind, SessionError, SessionView, SharedSession};

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Orchestrates one creation session.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use voice_to_pitch::audio::{CaptureConstraints, MicSource};
/// use voice_to_pitch::config::AppConfig;
/// use voice_to_pitch::pitch::ApiPitchGenerator;
/// use voice_to_pitch::session::SessionController;
/// use voice_to_pitch::store::MemoryStore;
/// use voice_to_pitch::transcribe::RemoteTranscriber;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let controller = SessionController::new(
///     Arc::new(MicSource::new(CaptureConstraints::default())),
///     Arc::new(RemoteTranscriber::remote_only(&config.transcription)),
///     Arc::new(ApiPitchGenerator::from_config(&config.generation)),
///     Arc::new(MemoryStore::new()),
///     "local-user",
/// );
///
/// controller.start_recording();
/// // … user speaks …
/// controller.stop_recording().await;
/// controller.generate().await;
/// let saved = controller.save().await;
/// # let _ = saved;
/// # }
/// ```
pub struct SessionController {
    state: SharedSession,
    source: Arc<dyn AudioSource>,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn PitchGenerator>,
    store: Arc<dyn PitchStore>,
    owner_id: String,

    /// The open recording, while the view is `Recording`.
    active: Mutex<Option<Box<dyn RecordingSession>>>,
    /// Finalized payload retained across transcription failures so the user
    /// can retry without re-recording.
    payload: Mutex<Option<AudioPayload>>,
}

impl SessionController {
    pub fn new(
        source: Arc<dyn AudioSource>,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn PitchGenerator>,
        store: Arc<dyn PitchStore>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            state: new_shared_session(),
            source,
            transcriber,
            generator,
            store,
            owner_id: owner_id.into(),
            active: Mutex::new(None),
            payload: Mutex::new(None),
        }
    }

    /// Shared handle for UI reads.
    pub fn state(&self) -> SharedSession {
        Arc::clone(&self.state)
    }

    /// Current view.
    pub fn view(&self) -> SessionView {
        self.state.lock().unwrap().view
    }

    /// Snapshot of the whole session bag.
    pub fn snapshot(&self) -> super::state::SessionState {
        self.state.lock().unwrap().clone()
    }

    /// `true` when a finalized payload is retained and transcription can be
    /// retried without re-recording.
    pub fn can_retry_transcription(&self) -> bool {
        self.view() == SessionView::Idle && self.payload.lock().unwrap().is_some()
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// `Idle → Recording`: acquire the microphone and start buffering.
    ///
    /// No-op from any other view (the record control is inert while a step
    /// is in flight).
    pub fn start_recording(&self) -> SessionView {
        {
            let mut st = self.state.lock().unwrap();
            if st.view != SessionView::Idle {
                log::debug!("record ignored in view {:?}", st.view);
                return st.view;
            }
            // Claim the view before touching the device so concurrent
            // invocations see Recording and back off.
            st.view = SessionView::Recording;
            st.last_error = None;
        }

        match self.source.begin() {
            Ok(session) => {
                *self.active.lock().unwrap() = Some(session);
                log::info!("session: recording started");
                SessionView::Recording
            }
            Err(e) => {
                log::warn!("session: recording failed to start: {e}");
                self.fail_to(SessionView::Idle, e.into())
            }
        }
    }

    /// `Recording → Transcribing → TranscriptReady`: finalize the payload
    /// and transcribe it.
    ///
    /// On capture failure the view returns to `Idle`; on transcription
    /// failure the view returns to `Idle` with the payload retained for
    /// [`retry_transcription`](Self::retry_transcription).
    pub async fn stop_recording(&self) -> SessionView {
        {
            let mut st = self.state.lock().unwrap();
            if st.view != SessionView::Recording {
                log::debug!("stop ignored in view {:?}", st.view);
                return st.view;
            }
            st.view = SessionView::Transcribing;
            st.last_error = None;
        }

        let session = self.active.lock().unwrap().take();
        let Some(session) = session else {
            return self.fail_to(SessionView::Idle, CaptureError::EmptyRecording.into());
        };

        // Finalization joins the capture thread — keep it off the runtime.
        let finished = tokio::task::spawn_blocking(move || session.finish()).await;

        let payload = match finished {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => return self.fail_to(SessionView::Idle, e.into()),
            Err(e) => {
                return self.fail_to(
                    SessionView::Idle,
                    SessionError {
                        kind: ErrorKind::DeviceUnavailable,
                        message: format!("capture task failed: {e}"),
                    },
                );
            }
        };

        *self.payload.lock().unwrap() = Some(payload.clone());
        self.run_transcription(payload).await
    }

    /// Re-run transcription on the retained payload after a failure.
    ///
    /// No-op unless the session is `Idle` with a payload in hand.
    pub async fn retry_transcription(&self) -> SessionView {
        let payload = {
            let mut st = self.state.lock().unwrap();
            if st.view != SessionView::Idle {
                return st.view;
            }
            let Some(payload) = self.payload.lock().unwrap().clone() else {
                log::debug!("retry ignored: no retained payload");
                return st.view;
            };
            st.view = SessionView::Transcribing;
            st.last_error = None;
            payload
        };

        self.run_transcription(payload).await
    }

    /// Transcribe `payload`; the view is already `Transcribing`.
    async fn run_transcription(&self, payload: AudioPayload) -> SessionView {
        match self.transcriber.transcribe(&payload).await {
            Ok(text) => {
                let mut st = self.state.lock().unwrap();
                st.transcript = Some(text);
                st.view = SessionView::TranscriptReady;
                st.last_error = None;
                st.view
            }
            Err(e) => {
                let error: SessionError = e.into();
                log::warn!("session: transcription failed: {}", error.message);
                // The payload stays retained — the user can retry the step.
                self.fail_to(SessionView::Idle, error)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    /// `TranscriptReady → Generating → PitchReady`.
    ///
    /// On failure the view returns to `TranscriptReady` with the transcript
    /// intact so the user can retry generation.
    pub async fn generate(&self) -> SessionView {
        let transcript = {
            let mut st = self.state.lock().unwrap();
            if st.view != SessionView::TranscriptReady {
                log::debug!("generate ignored in view {:?}", st.view);
                return st.view;
            }
            let transcript = st.transcript.clone().unwrap_or_default();
            st.view = SessionView::Generating;
            st.last_error = None;
            transcript
        };

        match self.generator.generate(&transcript).await {
            Ok(pitch) => {
                let mut st = self.state.lock().unwrap();
                st.generated = Some(pitch);
                st.view = SessionView::PitchReady;
                st.view
            }
            Err(e) => {
                log::warn!("session: generation failed: {e}");
                self.fail_to(SessionView::TranscriptReady, e.into())
            }
        }
    }

    /// `TranscriptReady → Idle`: discard the transcript and start over.
    ///
    /// Clears the transcript, the retained payload, and any error flags —
    /// regardless of what failed earlier in the session.
    pub fn rerecord(&self) -> SessionView {
        {
            let mut st = self.state.lock().unwrap();
            if st.view != SessionView::TranscriptReady {
                log::debug!("rerecord ignored in view {:?}", st.view);
                return st.view;
            }
            st.reset();
        }
        *self.payload.lock().unwrap() = None;
        log::info!("session: transcript discarded, back to idle");
        SessionView::Idle
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// `PitchReady → Saving → Idle`: persist the pitch and reset the
    /// session.
    ///
    /// Returns the stored record on success.  On failure the view returns
    /// to `PitchReady` with the pitch intact for another attempt.
    pub async fn save(&self) -> Option<SavedPitch> {
        let (pitch, transcript) = {
            let mut st = self.state.lock().unwrap();
            if st.view != SessionView::PitchReady {
                log::debug!("save ignored in view {:?}", st.view);
                return None;
            }
            let Some(pitch) = st.generated.clone() else {
                return None;
            };
            let transcript = st.transcript.clone().unwrap_or_default();
            st.view = SessionView::Saving;
            st.last_error = None;
            (pitch, transcript)
        };

        let record = NewPitch::from_generated(&self.owner_id, &pitch, &transcript);

        match self.store.save(record).await {
            Ok(saved) => {
                self.state.lock().unwrap().reset();
                *self.payload.lock().unwrap() = None;
                log::info!("session: pitch saved as {}", saved.id);
                Some(saved)
            }
            Err(e) => {
                log::warn!("session: save failed: {e}");
                self.fail_to(SessionView::PitchReady, e.into());
                None
            }
        }
    }

    /// `PitchReady → Idle`: drop the generated pitch without persisting.
    pub fn discard(&self) -> SessionView {
        {
            let mut st = self.state.lock().unwrap();
            if st.view != SessionView::PitchReady {
                log::debug!("discard ignored in view {:?}", st.view);
                return st.view;
            }
            st.reset();
        }
        *self.payload.lock().unwrap() = None;
        log::info!("session: pitch discarded");
        SessionView::Idle
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Record `error` and move to `view`, raising the quota flag when the
    /// failure kind calls for the distinct quota affordance.
    fn fail_to(&self, view: SessionView, error: SessionError) -> SessionView {
        let mut st = self.state.lock().unwrap();
        if error.kind == ErrorKind::QuotaExceeded {
            st.quota_flag = true;
        }
        st.last_error = Some(error);
        st.view = view;
        st.view
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::audio::{MockAudioSource, MockCaptureOutcome};
    use crate::pitch::{GeneratedPitch, MockGenerator, PitchStructure, FIELD_NAMES};
    use crate::store::{MemoryStore, PitchStatus, StoreError};
    use crate::transcribe::{TranscribeError, Transcript};

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Scripted transcriber: fixed response, call counting, and an optional
    /// gate so tests can hold the pipeline in `Transcribing`.
    struct MockTranscriber {
        response: Result<String, TranscribeError>,
        calls: Arc<AtomicUsize>,
        gate: Option<Arc<tokio::sync::Notify>>,
    }

    impl MockTranscriber {
        fn ok(text: &str) -> Self {
            Self {
                response: Ok(text.into()),
                calls: Default::default(),
                gate: None,
            }
        }

        fn err(error: TranscribeError) -> Self {
            Self {
                response: Err(error),
                calls: Default::default(),
                gate: None,
            }
        }

        fn gated(text: &str, gate: Arc<tokio::sync::Notify>) -> Self {
            Self {
                response: Ok(text.into()),
                calls: Default::default(),
                gate: Some(gate),
            }
        }

        fn calls(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.calls)
        }
    }

    #[async_trait]
    impl Transcriber for MockTranscriber {
        async fn transcribe(
            &self,
            _payload: &crate::audio::AudioPayload,
        ) -> Result<Transcript, TranscribeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.response.clone()
        }
    }

    /// Store whose writes always fail.
    struct FailStore;

    #[async_trait]
    impl PitchStore for FailStore {
        async fn save(&self, _pitch: NewPitch) -> Result<SavedPitch, StoreError> {
            Err(StoreError::PersistenceFailed("disk on fire".into()))
        }
        async fn list(&self, _owner: &str) -> Result<Vec<SavedPitch>, StoreError> {
            Ok(Vec::new())
        }
        async fn delete(&self, _id: &str, _owner: &str) -> Result<(), StoreError> {
            Err(StoreError::PersistenceFailed("disk on fire".into()))
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn full_pitch() -> GeneratedPitch {
        let mut structure = PitchStructure::default();
        for name in FIELD_NAMES {
            structure.set_field(name, format!("{name} content"));
        }
        GeneratedPitch {
            one_liner: "Ovens for every baker".into(),
            structure,
        }
    }

    struct Harness {
        controller: Arc<SessionController>,
        begin_calls: Arc<AtomicUsize>,
        transcribe_calls: Arc<AtomicUsize>,
        generate_calls: Arc<AtomicUsize>,
        store: Arc<MemoryStore>,
    }

    fn harness(
        capture: MockAudioSource,
        transcriber: MockTranscriber,
        generator: MockGenerator,
    ) -> Harness {
        let begin_calls = capture.begin_calls();
        let transcribe_calls = transcriber.calls();
        let generate_calls = generator.calls();
        let store = Arc::new(MemoryStore::new());

        let controller = Arc::new(SessionController::new(
            Arc::new(capture),
            Arc::new(transcriber),
            Arc::new(generator),
            Arc::clone(&store) as Arc<dyn PitchStore>,
            "user-1",
        ));

        Harness {
            controller,
            begin_calls,
            transcribe_calls,
            generate_calls,
            store,
        }
    }

    fn default_harness() -> Harness {
        harness(
            MockAudioSource::recording(&[1, 2, 3, 4]),
            MockTranscriber::ok("We help bakers find ovens"),
            MockGenerator::ok(full_pitch()),
        )
    }

    // -----------------------------------------------------------------------
    // Happy path
    // -----------------------------------------------------------------------

    /// Full session: record → stop → generate → save writes exactly one
    /// completed record carrying the transcript.
    #[tokio::test]
    async fn end_to_end_session_persists_one_completed_record() {
        let h = default_harness();

        assert_eq!(h.controller.start_recording(), SessionView::Recording);
        assert_eq!(
            h.controller.stop_recording().await,
            SessionView::TranscriptReady
        );
        assert_eq!(
            h.controller.snapshot().transcript.as_deref(),
            Some("We help bakers find ovens")
        );

        assert_eq!(h.controller.generate().await, SessionView::PitchReady);

        let saved = h.controller.save().await.expect("save should succeed");
        assert_eq!(saved.transcript, "We help bakers find ovens");
        assert_eq!(saved.status, PitchStatus::Completed);
        assert_eq!(saved.owner_id, "user-1");
        assert_eq!(saved.title, "Ovens for every baker");

        // Exactly one write landed, and the session reset.
        assert_eq!(h.store.row_count(), 1);
        let st = h.controller.snapshot();
        assert_eq!(st.view, SessionView::Idle);
        assert!(st.transcript.is_none());
        assert!(st.generated.is_none());
    }

    // -----------------------------------------------------------------------
    // Guards / mutual exclusion
    // -----------------------------------------------------------------------

    /// While `Transcribing`, a second record invocation is a no-op: the view
    /// is unchanged and the capture source is not re-acquired.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn record_is_inert_while_transcribing() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let h = harness(
            MockAudioSource::recording(&[1, 2, 3]),
            MockTranscriber::gated("text", Arc::clone(&gate)),
            MockGenerator::ok(full_pitch()),
        );

        h.controller.start_recording();
        assert_eq!(h.begin_calls.load(Ordering::SeqCst), 1);

        let controller = Arc::clone(&h.controller);
        let stop_task = tokio::spawn(async move { controller.stop_recording().await });

        // Wait until the pipeline is parked inside the gated transcriber.
        while h.controller.view() != SessionView::Transcribing {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        assert_eq!(h.controller.start_recording(), SessionView::Transcribing);
        assert_eq!(h.begin_calls.load(Ordering::SeqCst), 1, "no second acquisition");

        gate.notify_one();
        assert_eq!(stop_task.await.unwrap(), SessionView::TranscriptReady);
    }

    #[tokio::test]
    async fn stop_is_inert_when_not_recording() {
        let h = default_harness();
        assert_eq!(h.controller.stop_recording().await, SessionView::Idle);
        assert_eq!(h.transcribe_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generate_is_inert_without_a_transcript() {
        let h = default_harness();
        assert_eq!(h.controller.generate().await, SessionView::Idle);
        assert_eq!(h.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn save_is_inert_without_a_pitch() {
        let h = default_harness();
        assert!(h.controller.save().await.is_none());
        assert_eq!(h.store.row_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Capture failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn begin_failure_surfaces_permission_denied_and_stays_idle() {
        let h = harness(
            MockAudioSource::with_outcome(MockCaptureOutcome::BeginError(
                crate::audio::CaptureError::PermissionDenied("blocked".into()),
            )),
            MockTranscriber::ok("unused"),
            MockGenerator::ok(full_pitch()),
        );

        assert_eq!(h.controller.start_recording(), SessionView::Idle);
        let st = h.controller.snapshot();
        assert_eq!(st.last_error.as_ref().unwrap().kind, ErrorKind::PermissionDenied);
    }

    /// Stopping with zero captured audio fails with EmptyRecording and never
    /// reaches the transcriber.
    #[tokio::test]
    async fn empty_recording_fails_before_any_transcription_call() {
        let h = harness(
            MockAudioSource::with_outcome(MockCaptureOutcome::FinishError(
                crate::audio::CaptureError::EmptyRecording,
            )),
            MockTranscriber::ok("unused"),
            MockGenerator::ok(full_pitch()),
        );

        h.controller.start_recording();
        assert_eq!(h.controller.stop_recording().await, SessionView::Idle);

        let st = h.controller.snapshot();
        assert_eq!(st.last_error.as_ref().unwrap().kind, ErrorKind::EmptyRecording);
        assert_eq!(h.transcribe_calls.load(Ordering::SeqCst), 0);
    }

    // -----------------------------------------------------------------------
    // Transcription failures / retry
    // -----------------------------------------------------------------------

    /// Quota exhaustion raises the quota flag and is tagged QuotaExceeded,
    /// not generic failure.
    #[tokio::test]
    async fn quota_failure_sets_flag_and_distinct_kind() {
        let h = harness(
            MockAudioSource::recording(&[9, 9]),
            MockTranscriber::err(TranscribeError::QuotaExceeded("quota exceeded".into())),
            MockGenerator::ok(full_pitch()),
        );

        h.controller.start_recording();
        assert_eq!(h.controller.stop_recording().await, SessionView::Idle);

        let st = h.controller.snapshot();
        assert!(st.quota_flag);
        assert_eq!(st.last_error.as_ref().unwrap().kind, ErrorKind::QuotaExceeded);
    }

    /// A failed transcription keeps the payload, and retry re-submits it
    /// without a new recording.
    #[tokio::test]
    async fn transcription_failure_keeps_payload_for_retry() {
        let h = harness(
            MockAudioSource::recording(&[5, 5, 5]),
            MockTranscriber::err(TranscribeError::TranscriptionFailed("503".into())),
            MockGenerator::ok(full_pitch()),
        );

        h.controller.start_recording();
        assert_eq!(h.controller.stop_recording().await, SessionView::Idle);
        assert!(h.controller.can_retry_transcription());

        assert_eq!(h.controller.retry_transcription().await, SessionView::Idle);
        // Two attempts on the same payload, one acquisition of the mic.
        assert_eq!(h.transcribe_calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.begin_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_without_payload_is_inert() {
        let h = default_harness();
        assert_eq!(h.controller.retry_transcription().await, SessionView::Idle);
        assert_eq!(h.transcribe_calls.load(Ordering::SeqCst), 0);
    }

    // -----------------------------------------------------------------------
    // Rerecord
    // -----------------------------------------------------------------------

    /// From TranscriptReady, rerecord always lands in Idle with the
    /// transcript cleared — prior error flags included.
    #[tokio::test]
    async fn rerecord_clears_transcript_and_flags() {
        let h = default_harness();
        h.controller.start_recording();
        h.controller.stop_recording().await;
        assert_eq!(h.controller.view(), SessionView::TranscriptReady);

        // Simulate stale error flags from earlier in the session.
        {
            let state = h.controller.state();
            let mut st = state.lock().unwrap();
            st.quota_flag = true;
            st.last_error = Some(SessionError {
                kind: ErrorKind::TranscriptionFailed,
                message: "old failure".into(),
            });
        }

        assert_eq!(h.controller.rerecord(), SessionView::Idle);
        let st = h.controller.snapshot();
        assert!(st.transcript.is_none());
        assert!(st.last_error.is_none());
        assert!(!st.quota_flag);
        assert!(!h.controller.can_retry_transcription());
    }

    // -----------------------------------------------------------------------
    // Generation failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn generation_failure_returns_to_transcript_ready() {
        let h = harness(
            MockAudioSource::recording(&[7]),
            MockTranscriber::ok("a fine story"),
            MockGenerator::err(crate::pitch::GenerateError::MalformedResponse(
                "no json".into(),
            )),
        );

        h.controller.start_recording();
        h.controller.stop_recording().await;
        assert_eq!(h.controller.generate().await, SessionView::TranscriptReady);

        let st = h.controller.snapshot();
        // Transcript survives the failure for a retry.
        assert_eq!(st.transcript.as_deref(), Some("a fine story"));
        assert_eq!(
            st.last_error.as_ref().unwrap().kind,
            ErrorKind::MalformedResponse
        );
    }

    // -----------------------------------------------------------------------
    // Save / discard
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn save_failure_retains_pitch_for_retry() {
        let capture = MockAudioSource::recording(&[3, 3]);
        let transcriber = MockTranscriber::ok("story");
        let generator = MockGenerator::ok(full_pitch());
        let controller = SessionController::new(
            Arc::new(capture),
            Arc::new(transcriber),
            Arc::new(generator),
            Arc::new(FailStore),
            "user-1",
        );

        controller.start_recording();
        controller.stop_recording().await;
        controller.generate().await;

        assert!(controller.save().await.is_none());
        let st = controller.snapshot();
        assert_eq!(st.view, SessionView::PitchReady);
        assert!(st.generated.is_some(), "pitch must survive a failed save");
        assert_eq!(
            st.last_error.as_ref().unwrap().kind,
            ErrorKind::PersistenceFailed
        );
    }

    #[tokio::test]
    async fn discard_drops_pitch_without_persisting() {
        let h = default_harness();
        h.controller.start_recording();
        h.controller.stop_recording().await;
        h.controller.generate().await;

        assert_eq!(h.controller.discard(), SessionView::Idle);
        assert_eq!(h.store.row_count(), 0);
        assert!(h.controller.snapshot().generated.is_none());
    }
}
