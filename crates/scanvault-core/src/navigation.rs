//! # Navigation
//!
//! Maps the session to a screen and keeps the screen stack consistent.
//!
//! ```text
//!   SessionState          route()          Navigator stack
//!   ────────────          ───────          ───────────────
//!   Loading        ──►    Splash     ──►   [Splash]
//!   SignedOut      ──►    Auth       ──►   [Auth]
//!   SignedIn(u)    ──►    Scanner    ──►   [Scanner] ─push─► [Scanner, Storage]
//! ```
//!
//! Every mounted screen instance gets a generation from [`ScreenEpoch`].
//! Async work started by a screen carries the generation it was started
//! under; once the screen is unmounted or remounted the old generation is no
//! longer current and late results are dropped.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::session::{Session, SessionState};

// =============================================================================
// Router
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Splash,
    Auth,
    Scanner,
    Storage,
}

impl Screen {
    pub fn title(&self) -> &'static str {
        match self {
            Screen::Splash => "ScanVault",
            Screen::Auth => "Welcome",
            Screen::Scanner => "Scanner",
            Screen::Storage => "Saved codes",
        }
    }
}

/// Root screen for a session.
pub fn route(session: &Session) -> Screen {
    match session.state() {
        SessionState::Loading => Screen::Splash,
        SessionState::SignedOut => Screen::Auth,
        SessionState::SignedIn(_) => Screen::Scanner,
    }
}

// =============================================================================
// Navigator
// =============================================================================

/// Stack of screens rooted at the routed screen.
#[derive(Debug, Clone)]
pub struct Navigator {
    stack: Vec<Screen>,
}

impl Default for Navigator {
    fn default() -> Self {
        Navigator {
            stack: vec![Screen::Splash],
        }
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-roots the stack if the session now routes elsewhere.
    ///
    /// Returns `true` if the stack was reset.
    pub fn sync(&mut self, session: &Session) -> bool {
        let root = route(session);
        if self.root() == root {
            return false;
        }
        self.stack.clear();
        self.stack.push(root);
        true
    }

    pub fn root(&self) -> Screen {
        self.stack.first().copied().unwrap_or(Screen::Splash)
    }

    pub fn current(&self) -> Screen {
        self.stack.last().copied().unwrap_or(Screen::Splash)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Opens the saved-codes screen. Only allowed from the scanner.
    pub fn push_storage(&mut self) -> bool {
        if self.current() != Screen::Scanner {
            return false;
        }
        self.stack.push(Screen::Storage);
        true
    }

    /// Pops the top screen; the root is never popped.
    pub fn back(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        self.stack.pop();
        true
    }
}

// =============================================================================
// Screen Generations
// =============================================================================

/// Token identifying one mounted instance of a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochToken(u64);

/// Generation counter for a single screen slot.
#[derive(Debug, Default)]
pub struct ScreenEpoch {
    generation: u64,
    mounted: bool,
}

impl ScreenEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts a new instance and returns its token.
    pub fn mount(&mut self) -> EpochToken {
        self.generation += 1;
        self.mounted = true;
        EpochToken(self.generation)
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    /// Whether a result started under `token` may still be applied.
    pub fn is_current(&self, token: EpochToken) -> bool {
        self.mounted && token.0 == self.generation
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
