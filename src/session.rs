//! Per-process session state shared by every tool invocation.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Time-to-live applied to tokens set through `set_github_token`.
pub const TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Supplies the bearer token for an outgoing request.
///
/// Consulted once per request so expiry and rotation take effect immediately.
pub trait TokenSource: Send + Sync {
    fn current_token(&self) -> Option<String>;
}

#[derive(Debug, Default)]
struct SessionState {
    repository: Option<String>,
    token: Option<String>,
    /// `None` with a token present means the expiry overflowed `Instant`.
    token_expiry: Option<Instant>,
}

/// Active repository and bearer token for one running server.
///
/// All three fields live behind a single lock so readers never observe a
/// token paired with another token's expiry.
#[derive(Debug, Default)]
pub struct SessionContext {
    state: RwLock<SessionState>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_repository(&self, name: impl Into<String>) {
        self.write().repository = Some(name.into());
    }

    /// The stored repository, or an empty string if none was set.
    pub fn repository(&self) -> String {
        self.read().repository.clone().unwrap_or_default()
    }

    pub fn set_token(&self, value: impl Into<String>, ttl: Duration) {
        self.set_token_at(value, ttl, Instant::now());
    }

    pub fn set_token_at(&self, value: impl Into<String>, ttl: Duration, now: Instant) {
        let mut state = self.write();
        state.token = Some(value.into());
        state.token_expiry = now.checked_add(ttl);
    }

    /// The stored token while it is live, otherwise an empty string.
    pub fn token(&self) -> String {
        self.token_at(Instant::now())
    }

    pub fn token_at(&self, now: Instant) -> String {
        let state = self.read();
        match (&state.token, state.token_expiry) {
            (Some(token), _) if token.is_empty() => String::new(),
            (Some(token), Some(expiry)) if now <= expiry => token.clone(),
            (Some(token), None) => token.clone(),
            _ => String::new(),
        }
    }

    pub fn has_token(&self) -> bool {
        !self.token().is_empty()
    }
}

impl TokenSource for SessionContext {
    fn current_token(&self) -> Option<String> {
        let token = self.token();
        (!token.is_empty()).then_some(token)
    }
}
