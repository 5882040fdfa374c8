//! Typed input standing in for speech recognition
//!
//! Each recognition session waits for one submission from the UI. A
//! submission is delivered as a final result followed by the end of the
//! session, exactly like a spoken utterance.

use crate::events::{EventSender, LoopEvent};
use crate::speech::recognition::{RecognitionEvent, Recognizer};
use crate::{AvatarError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct Session {
    open: bool,
}

/// Recognizer half, owned by the transcriber
pub struct KeyboardRecognizer {
    event_tx: EventSender,
    session: Arc<Mutex<Session>>,
}

/// Input half, held by the UI
#[derive(Clone)]
pub struct KeyboardInput {
    event_tx: EventSender,
    session: Arc<Mutex<Session>>,
}

/// Create a connected recognizer/input pair
pub fn keyboard_backend(event_tx: EventSender) -> (KeyboardRecognizer, KeyboardInput) {
    let session = Arc::new(Mutex::new(Session::default()));
    (
        KeyboardRecognizer {
            event_tx: event_tx.clone(),
            session: Arc::clone(&session),
        },
        KeyboardInput { event_tx, session },
    )
}

impl KeyboardRecognizer {
    fn emit(&self, event: RecognitionEvent) -> Result<()> {
        self.event_tx
            .send(LoopEvent::Recognition(event))
            .map_err(|e| AvatarError::ChannelError(format!("Failed to send event: {}", e)))
    }
}

impl Recognizer for KeyboardRecognizer {
    fn start(&mut self) -> Result<()> {
        let mut session = self.session.lock();
        if session.open {
            return Err(AvatarError::RecognitionBusy);
        }
        session.open = true;
        self.emit(RecognitionEvent::Started)
    }

    fn stop(&mut self) {
        let mut session = self.session.lock();
        if session.open {
            session.open = false;
            let _ = self.emit(RecognitionEvent::Ended);
        }
    }
}

impl KeyboardInput {
    /// True while a session is waiting for input
    pub fn is_listening(&self) -> bool {
        self.session.lock().open
    }

    /// The input box was edited. Counts as speech activity, so an open
    /// session is kept alive while the user types.
    pub fn typing(&self) -> bool {
        let session = self.session.lock();
        if !session.open {
            return false;
        }
        self.event_tx
            .send(LoopEvent::Recognition(RecognitionEvent::SpeechDetected))
            .is_ok()
    }

    /// Deliver `text` as a finished utterance.
    /// Returns false when no session is open; the text is not kept.
    pub fn submit(&self, text: &str) -> bool {
        let mut session = self.session.lock();
        if !session.open {
            debug!("Typed input while not listening");
            return false;
        }
        session.open = false;

        let events = [
            RecognitionEvent::SpeechDetected,
            RecognitionEvent::Result {
                transcript: text.to_string(),
                is_final: true,
            },
            RecognitionEvent::Ended,
        ];
        events
            .into_iter()
            .all(|event| self.event_tx.send(LoopEvent::Recognition(event)).is_ok())
    }
}
