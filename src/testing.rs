//! Recording test doubles
//!
//! Each fake comes with a cloneable probe that shares its state, so a test
//! can hand the fake to the coordinator and keep inspecting it afterwards.

use crate::chat::ChatBackend;
use crate::messages::ConversationMessage;
use crate::speech::recognition::Recognizer;
use crate::speech::synthesis::{Synthesizer, Utterance, Voice};
use crate::timer::{TimerId, TimerKind, Timers};
use crate::{AvatarError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct RecognizerLog {
    starts: usize,
    stops: usize,
    probe_error: Option<AvatarError>,
    start_errors: VecDeque<AvatarError>,
}

/// Inspects and scripts a `FakeRecognizer`
#[derive(Clone, Default)]
pub struct RecognizerProbe {
    log: Arc<Mutex<RecognizerLog>>,
}

impl RecognizerProbe {
    /// Number of `start()` calls, including refused ones
    pub fn starts(&self) -> usize {
        self.log.lock().starts
    }

    pub fn stops(&self) -> usize {
        self.log.lock().stops
    }

    pub fn fail_probe(&self, error: AvatarError) {
        self.log.lock().probe_error = Some(error);
    }

    pub fn fail_next_start(&self, error: AvatarError) {
        self.log.lock().start_errors.push_back(error);
    }
}

/// Recognizer that records calls; events are injected by the test
pub struct FakeRecognizer {
    probe: RecognizerProbe,
}

impl FakeRecognizer {
    pub fn new() -> (Self, RecognizerProbe) {
        let probe = RecognizerProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl Recognizer for FakeRecognizer {
    fn probe(&mut self) -> Result<()> {
        match self.probe.log.lock().probe_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start(&mut self) -> Result<()> {
        let mut log = self.probe.log.lock();
        log.starts += 1;
        match log.start_errors.pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn stop(&mut self) {
        self.probe.log.lock().stops += 1;
    }
}

struct SynthesizerLog {
    available: bool,
    voices: Vec<Voice>,
    spoken: Vec<Utterance>,
    cancels: usize,
    speak_errors: VecDeque<AvatarError>,
}

/// Inspects and scripts a `FakeSynthesizer`
#[derive(Clone)]
pub struct SynthesizerProbe {
    log: Arc<Mutex<SynthesizerLog>>,
}

impl SynthesizerProbe {
    pub fn spoken(&self) -> Vec<Utterance> {
        self.log.lock().spoken.clone()
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.log.lock().spoken.iter().map(|u| u.text.clone()).collect()
    }

    /// Id of the most recent utterance
    pub fn last_utterance(&self) -> Option<u64> {
        self.log.lock().spoken.last().map(|u| u.id)
    }

    pub fn cancels(&self) -> usize {
        self.log.lock().cancels
    }

    pub fn set_available(&self, available: bool) {
        self.log.lock().available = available;
    }

    pub fn fail_next_speak(&self, error: AvatarError) {
        self.log.lock().speak_errors.push_back(error);
    }
}

/// Synthesizer that records utterances; events are injected by the test
pub struct FakeSynthesizer {
    probe: SynthesizerProbe,
}

impl FakeSynthesizer {
    pub fn new() -> (Self, SynthesizerProbe) {
        Self::with_voices(vec![Voice::new("Test Voice", "en-US")])
    }

    pub fn with_voices(voices: Vec<Voice>) -> (Self, SynthesizerProbe) {
        let probe = SynthesizerProbe {
            log: Arc::new(Mutex::new(SynthesizerLog {
                available: true,
                voices,
                spoken: Vec::new(),
                cancels: 0,
                speak_errors: VecDeque::new(),
            })),
        };
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl Synthesizer for FakeSynthesizer {
    fn is_available(&self) -> bool {
        self.probe.log.lock().available
    }

    fn voices(&self) -> Vec<Voice> {
        self.probe.log.lock().voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        let mut log = self.probe.log.lock();
        if let Some(e) = log.speak_errors.pop_front() {
            return Err(e);
        }
        log.spoken.push(utterance);
        Ok(())
    }

    fn cancel(&mut self) {
        self.probe.log.lock().cancels += 1;
    }
}

#[derive(Default)]
struct ChatLog {
    requests: Vec<Vec<ConversationMessage>>,
    health_checks: usize,
    fail_requests: bool,
}

/// Inspects and scripts a `FakeChat`
#[derive(Clone, Default)]
pub struct ChatProbe {
    log: Arc<Mutex<ChatLog>>,
}

impl ChatProbe {
    pub fn requests(&self) -> Vec<Vec<ConversationMessage>> {
        self.log.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.log.lock().requests.len()
    }

    pub fn health_checks(&self) -> usize {
        self.log.lock().health_checks
    }

    /// Make `request()` fail as if the worker were gone
    pub fn fail_requests(&self) {
        self.log.lock().fail_requests = true;
    }
}

/// Chat backend that records requests; replies are injected by the test
pub struct FakeChat {
    probe: ChatProbe,
}

impl FakeChat {
    pub fn new() -> (Self, ChatProbe) {
        let probe = ChatProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl ChatBackend for FakeChat {
    fn request(&mut self, history: Vec<ConversationMessage>) -> Result<()> {
        let mut log = self.probe.log.lock();
        if log.fail_requests {
            return Err(AvatarError::ChannelError("chat worker stopped".to_string()));
        }
        log.requests.push(history);
        Ok(())
    }

    fn check_health(&mut self) -> Result<()> {
        self.probe.log.lock().health_checks += 1;
        Ok(())
    }
}

/// Timers that only record what was scheduled
///
/// Clones share the record. Tests fire timers by passing the recorded id
/// back as `LoopEvent::Timer`.
#[derive(Clone, Default)]
pub struct ManualTimers {
    scheduled: Arc<Mutex<Vec<(TimerId, Duration)>>>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> Vec<(TimerId, Duration)> {
        self.scheduled.lock().clone()
    }

    /// Most recently scheduled timer of `kind`
    pub fn last(&self, kind: TimerKind) -> Option<(TimerId, Duration)> {
        self.scheduled
            .lock()
            .iter()
            .rev()
            .find(|(id, _)| id.kind == kind)
            .copied()
    }
}

impl Timers for ManualTimers {
    fn schedule(&mut self, id: TimerId, after: Duration) {
        self.scheduled.lock().push((id, after));
    }
}
