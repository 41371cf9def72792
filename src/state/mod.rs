// Storefront state composition root
// Builds the session, transport and stores once and hands out shared references

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::auth::AuthClient;
use crate::cart::CartSync;
use crate::catalog::Catalog;
use crate::config::{CredentialBackend, StorefrontConfig};
use crate::error::Result;
use crate::session::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionHandle,
};
use crate::transport::Transport;

/// Everything a storefront view needs, wired together.
/// Lives for the whole process; the cart follows the session until drop.
pub struct Storefront {
    config: StorefrontConfig,
    session: SessionHandle,
    transport: Arc<Transport>,
    auth: AuthClient,
    cart: Arc<CartSync>,
    catalog: Catalog,
    listener: JoinHandle<()>,
}

impl Storefront {
    /// Build from configuration and restore any persisted session
    pub async fn connect(config: StorefrontConfig) -> Result<Self> {
        let credentials: Arc<dyn CredentialStore> = match config.credentials.backend {
            CredentialBackend::File => Arc::new(FileCredentialStore::new(&config.credentials.path)),
            CredentialBackend::Memory => Arc::new(MemoryCredentialStore::new()),
        };
        Self::with_credentials(config, credentials).await
    }

    /// Build on an explicit credential store
    pub async fn with_credentials(
        config: StorefrontConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let session = SessionHandle::new(credentials, config.credentials.key.clone());
        let transport = Arc::new(Transport::new(&config.api, session.clone())?);
        info!(base_url = %transport.base_url(), "✓ Transport ready");

        let auth = AuthClient::new(Arc::clone(&transport));
        let cart = Arc::new(CartSync::new(Arc::clone(&transport)));
        let catalog = Catalog::new(Arc::clone(&transport), &config.catalog);

        let listener = cart.spawn_session_listener();
        info!("✓ Cart following session state");

        let storefront = Self {
            config,
            session,
            transport,
            auth,
            cart,
            catalog,
            listener,
        };

        match storefront.auth.restore().await {
            Ok(session) if session.is_authenticated => info!("✓ Session restored"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Could not verify persisted credential"),
        }

        Ok(storefront)
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn cart(&self) -> &Arc<CartSync> {
        &self.cart
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Re-read profile and cart side by side
    pub async fn refresh(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            return self.cart.fetch_items().await;
        }

        let (profile, cart) =
            futures::future::join(self.auth.refresh_profile(), self.cart.fetch_items()).await;
        profile?;
        cart
    }
}

impl Drop for Storefront {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
