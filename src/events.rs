//! Events delivered to the voice loop
//!
//! Every suspension point (recognizer callbacks, synthesis callbacks, timer
//! expiry, chat replies, UI controls) arrives as one `LoopEvent` on a single
//! crossbeam channel and is handled to completion before the next one.

use crate::speech::recognition::RecognitionEvent;
use crate::speech::synthesis::SpeechEvent;
use crate::timer::TimerId;
use crossbeam_channel::{Receiver, Sender};

/// Input to the turn coordinator
#[derive(Clone, Debug, PartialEq)]
pub enum LoopEvent {
    /// Callback from the speech recognizer
    Recognition(RecognitionEvent),
    /// Callback from the speech synthesizer
    Speech(SpeechEvent),
    /// A scheduled timer elapsed
    Timer(TimerId),
    /// The chat worker finished a request (reply or fallback text)
    Reply(String),
    /// Result of the startup health check
    HealthChecked(bool),
    /// The user pressed the stop control
    StopSpeaking,
    /// Terminate the voice loop
    Shutdown,
}

/// Sending half of the voice loop channel
pub type EventSender = Sender<LoopEvent>;

/// Receiving half of the voice loop channel
pub type EventReceiver = Receiver<LoopEvent>;
