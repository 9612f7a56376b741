//! Connection state published by the supervisor
//!
//! The supervisor is the only writer. Everyone else reads whole snapshots
//! through a `watch` channel, so a reader never sees a partial update.

use serde::Serialize;
use std::fmt;

/// Database connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection state record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    /// Current lifecycle state
    pub lifecycle: Lifecycle,
    /// Message from the most recent failed attempt, cleared on connect
    pub last_error: Option<String>,
    /// Attempt number within the running sequence (0 while idle or cooling down)
    pub attempt: u32,
    /// Set once the default records have been seeded, never reset
    pub seeded: bool,
}

/// An open database handle tagged with the connect that produced it
#[derive(Debug, Clone)]
pub struct Connected<H> {
    /// Increments on every successful connect
    pub generation: u64,
    pub handle: H,
}

/// Everything the supervisor publishes in one atomic unit
#[derive(Debug, Clone)]
pub struct Snapshot<H> {
    pub state: ConnectionState,
    pub current: Option<Connected<H>>,
}

impl<H> Default for Snapshot<H> {
    fn default() -> Self {
        Self {
            state: ConnectionState::default(),
            current: None,
        }
    }
}

impl<H: Clone> Snapshot<H> {
    /// The handle, if the connection is currently up
    pub fn ready_handle(&self) -> Option<Connected<H>> {
        if self.state.lifecycle == Lifecycle::Connected {
            self.current.clone()
        } else {
            None
        }
    }
}
