// Session/Identity State
// Who is logged in, and the single reset path shared by logout and HTTP 401

pub mod credentials;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::Result;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

/// Identity of the logged-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: u64,
    pub username: String,
    /// Account balance, known once the profile or a checkout reported it
    pub balance: Option<f64>,
}

/// Snapshot of the session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<UserIdentity>,
    /// When this process established the session
    pub established_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: UserIdentity) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            established_at: Some(Utc::now()),
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Explicit logout
    Logout,
    /// Some endpoint answered 401
    Unauthorized,
}

/// Shared handle to the one session of this process.
/// Cloning is cheap; all clones observe the same state.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    /// Persisted bearer credential
    credentials: Arc<dyn CredentialStore>,

    /// Fixed name the credential is stored under
    key: String,

    /// Current snapshot; receivers are woken on every change
    state: watch::Sender<Session>,

    /// Number of authenticated -> anonymous transitions
    resets: AtomicU64,

    /// Set by a 401 reset, cleared by the next login
    login_required: AtomicBool,
}

impl SessionHandle {
    pub fn new(credentials: Arc<dyn CredentialStore>, key: impl Into<String>) -> Self {
        let (state, _) = watch::channel(Session::anonymous());

        Self {
            inner: Arc::new(SessionInner {
                credentials,
                key: key.into(),
                state,
                resets: AtomicU64::new(0),
                login_required: AtomicBool::new(false),
            }),
        }
    }

    /// Current session snapshot
    pub fn current(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.inner.state.borrow().user.clone()
    }

    /// Watch session changes
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// True after a 401 until the next successful login
    pub fn login_required(&self) -> bool {
        self.inner.login_required.load(Ordering::Acquire)
    }

    /// How many times an authenticated session has been torn down
    pub fn reset_count(&self) -> u64 {
        self.inner.resets.load(Ordering::Relaxed)
    }

    /// Read the persisted bearer credential
    pub async fn bearer(&self) -> Result<Option<String>> {
        let token = self.inner.credentials.get(&self.inner.key).await?;
        Ok(token.filter(|t| !t.is_empty()))
    }

    /// Persist the bearer credential for later requests
    pub async fn store_bearer(&self, token: &str) -> Result<()> {
        self.inner.credentials.set(&self.inner.key, token).await
    }

    /// Mark the session authenticated as `user`
    pub fn establish(&self, user: UserIdentity) {
        info!(user_id = user.id, username = %user.username, "Session established");
        self.inner.login_required.store(false, Ordering::Release);
        self.inner.state.send_replace(Session::authenticated(user));
    }

    /// Record a balance reported by the server. Ignored when anonymous.
    pub fn update_balance(&self, balance: f64) {
        self.inner.state.send_if_modified(|session| match session.user.as_mut() {
            Some(user) if user.balance != Some(balance) => {
                user.balance = Some(balance);
                true
            }
            _ => false,
        });
    }

    /// Clear the persisted credential and drop to anonymous.
    ///
    /// Idempotent: the credential is removed every time, but the state
    /// transition (and its notification) happens at most once per session.
    /// Returns whether this call ended an authenticated session.
    pub async fn reset(&self, reason: SessionEnd) -> Result<bool> {
        let cleared = self.inner.credentials.remove(&self.inner.key).await;

        if reason == SessionEnd::Unauthorized {
            self.inner.login_required.store(true, Ordering::Release);
        }

        let transitioned = self.inner.state.send_if_modified(|session| {
            if session.is_authenticated {
                *session = Session::anonymous();
                true
            } else {
                false
            }
        });

        if transitioned {
            self.inner.resets.fetch_add(1, Ordering::Relaxed);
            match reason {
                SessionEnd::Logout => info!("👋 Session ended by logout"),
                SessionEnd::Unauthorized => warn!("🔒 Session invalidated by 401, login required"),
            }
        }

        if let Err(e) = &cleared {
            warn!(error = %e, "Failed to clear persisted credential");
        }
        cleared.map(|_| transitioned)
    }
}
