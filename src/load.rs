//! Load path of a shared link, as a small state machine.
//!
//! ```text
//! Idle --load--> LockedAwaitingPassword --right password--> ImageApplied
//!   |                 ^      |
//!   |                 +------+ wrong password
//!   +--load--> ImageApplied | LoadFailed
//! ```
//!
//! Transport decoding and container parsing happen inside a single call, so
//! the intermediate "decoded" and "plaintext loaded" steps are never
//! observable from outside.

use crate::decoder::{Decoder, Payload, SealedPayload};
use crate::error::CodecError;
use image::RgbaImage;
use log::debug;

#[derive(Debug)]
pub enum LoadState {
    Idle,
    LockedAwaitingPassword(SealedPayload),
    ImageApplied,
    LoadFailed,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LoadOutcome {
    Applied,
    RequiresPassword,
    WrongPassword,
    Failed(CodecError),
}

pub struct Loader {
    decoder: Decoder,
    state: LoadState,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    pub fn new() -> Self {
        Self {
            decoder: Decoder::new(),
            state: LoadState::Idle,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, LoadState::LockedAwaitingPassword(_))
    }

    /// Starts a new load, discarding whatever state the loader was in.
    pub fn load(&mut self, text: &str, target: &mut RgbaImage) -> LoadOutcome {
        let outcome = match self.decoder.decode(text) {
            Ok(Payload::Plain(container)) => match container.apply_to(target) {
                Ok(()) => self.transition(LoadState::ImageApplied, LoadOutcome::Applied),
                Err(err) => self.fail(err),
            },
            Ok(Payload::Sealed(sealed)) => self.transition(
                LoadState::LockedAwaitingPassword(sealed),
                LoadOutcome::RequiresPassword,
            ),
            Err(err) => self.fail(err),
        };

        debug!("load finished: {:?}", outcome);
        outcome
    }

    /// Tries `password` against the pending sealed payload. A wrong password
    /// keeps the loader locked so the caller can ask again.
    pub fn submit_password(&mut self, password: &str, target: &mut RgbaImage) -> LoadOutcome {
        let sealed = match &self.state {
            LoadState::LockedAwaitingPassword(sealed) => sealed,
            _ => {
                debug!("password submitted while not locked");
                return LoadOutcome::Failed(CodecError::DecodeError);
            }
        };

        let outcome = match sealed.unlock(password) {
            Ok(container) => match container.apply_to(target) {
                Ok(()) => self.transition(LoadState::ImageApplied, LoadOutcome::Applied),
                Err(err) => self.fail(err),
            },
            Err(CodecError::AuthenticationFailed) => LoadOutcome::WrongPassword,
            Err(err) => self.fail(err),
        };

        debug!("password attempt finished: {:?}", outcome);
        outcome
    }

    fn transition(&mut self, state: LoadState, outcome: LoadOutcome) -> LoadOutcome {
        debug!("load state -> {:?}", StateName(&state));
        self.state = state;
        outcome
    }

    fn fail(&mut self, err: CodecError) -> LoadOutcome {
        debug!("load failed: {}", err);
        self.transition(LoadState::LoadFailed, LoadOutcome::Failed(err))
    }
}

/// Logs a state without dumping sealed bytes.
struct StateName<'a>(&'a LoadState);

impl std::fmt::Debug for StateName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.0 {
            LoadState::Idle => "Idle",
            LoadState::LockedAwaitingPassword(_) => "LockedAwaitingPassword",
            LoadState::ImageApplied => "ImageApplied",
            LoadState::LoadFailed => "LoadFailed",
        };
        f.write_str(name)
    }
}
