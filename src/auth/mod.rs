// Authentication Module
// Login, logout, session restore and account endpoints

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::session::{Session, SessionEnd, SessionHandle, UserIdentity};
use crate::transport::Transport;

const LOGIN_PATH: &str = "/api/user/login";
const REGISTER_PATH: &str = "/api/user/register";
const PROFILE_PATH: &str = "/api/user/profile";
const BALANCE_PATH: &str = "/api/user/balance";
const RECHARGE_PATH: &str = "/api/user/recharge";

/// Username and password pair
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// New account request
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    user: LoginUser,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    id: u64,
    username: String,
}

/// Account details as reported by the profile endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: f64,
}

/// Outcome of a balance top-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RechargeReceipt {
    pub message: String,
    pub amount: f64,
    pub balance: f64,
}

#[derive(Serialize)]
struct RechargeRequest {
    amount: f64,
}

/// Identity operations on top of the shared transport
pub struct AuthClient {
    transport: Arc<Transport>,
    session: SessionHandle,
}

impl AuthClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        let session = transport.session().clone();
        Self { transport, session }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Exchange credentials for a bearer token and establish the session
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        info!(username = %credentials.username, "Logging in");

        let resp: LoginResponse = self
            .transport
            .post(LOGIN_PATH, credentials)
            .await
            .map_err(|e| match e {
                StoreError::Unauthorized { message } | StoreError::Server { message, .. } => {
                    StoreError::Auth(message)
                }
                other => other,
            })?;

        self.session.store_bearer(&resp.token).await?;
        self.session.establish(UserIdentity {
            id: resp.user.id,
            username: resp.user.username,
            balance: None,
        });

        // Balance is only on the profile; a failure here keeps the login
        if let Err(e) = self.refresh_profile().await {
            warn!(error = %e, "Logged in but profile could not be loaded");
        }

        Ok(self.session.current())
    }

    /// Forget the credential and drop to anonymous. Safe when already anonymous.
    pub async fn logout(&self) -> Result<()> {
        self.session.reset(SessionEnd::Logout).await?;
        Ok(())
    }

    /// Rebuild the session from a persisted credential at startup.
    ///
    /// A stored token is checked against the profile endpoint. A 401 there
    /// clears it through the transport; a network failure leaves it in place
    /// so the next start can try again.
    pub async fn restore(&self) -> Result<Session> {
        if self.session.bearer().await?.is_none() {
            info!("No persisted credential, starting anonymous");
            return Ok(self.session.current());
        }

        match self.refresh_profile().await {
            Ok(_) => Ok(self.session.current()),
            Err(StoreError::Unauthorized { .. }) => {
                info!("Persisted credential rejected, starting anonymous");
                Ok(self.session.current())
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch the profile and (re)establish the session from it
    pub async fn refresh_profile(&self) -> Result<UserProfile> {
        let profile: UserProfile = self.transport.get(PROFILE_PATH).await?;

        match self.session.user() {
            Some(user) if user.id == profile.id => {
                if let Some(balance) = profile.balance {
                    self.session.update_balance(balance);
                }
            }
            _ => self.session.establish(UserIdentity {
                id: profile.id,
                username: profile.username.clone(),
                balance: profile.balance,
            }),
        }

        Ok(profile)
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, registration: &Registration) -> Result<String> {
        let message = self.transport.post_text(REGISTER_PATH, registration).await?;
        info!(username = %registration.username, "Account registered");
        Ok(message)
    }

    pub async fn balance(&self) -> Result<f64> {
        if !self.session.is_authenticated() {
            return Err(StoreError::NotAuthenticated);
        }

        let resp: BalanceResponse = self.transport.get(BALANCE_PATH).await?;
        self.session.update_balance(resp.balance);
        Ok(resp.balance)
    }

    /// Top up the balance. The amount is validated server-side.
    pub async fn recharge(&self, amount: f64) -> Result<RechargeReceipt> {
        if !self.session.is_authenticated() {
            return Err(StoreError::NotAuthenticated);
        }

        let receipt: RechargeReceipt = self
            .transport
            .post(RECHARGE_PATH, &RechargeRequest { amount })
            .await?;
        self.session.update_balance(receipt.balance);
        info!(amount = receipt.amount, balance = receipt.balance, "Balance recharged");
        Ok(receipt)
    }
}
