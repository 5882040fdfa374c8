//! Projection of the turn state onto the avatar

use crate::state::TurnState;

/// What the avatar shows for a turn state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AvatarView {
    /// Visual class: `idle`, `listening`, `thinking` or `speaking`
    pub class: &'static str,
    pub status_text: &'static str,
}

/// Map a turn state to the avatar view. Pure; no side effects.
pub fn present(state: TurnState) -> AvatarView {
    match state {
        TurnState::Idle => AvatarView {
            class: "idle",
            status_text: "Waiting for your voice...",
        },
        TurnState::Listening => AvatarView {
            class: "listening",
            status_text: "Listening...",
        },
        TurnState::Thinking => AvatarView {
            class: "thinking",
            status_text: "Thinking...",
        },
        TurnState::Speaking => AvatarView {
            class: "speaking",
            status_text: "Speaking...",
        },
    }
}
