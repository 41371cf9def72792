//! Storefront client state.
//!
//! Session and cart are thin projections of server-owned resources. The
//! session gates every cart call; every successful cart mutation is followed
//! by a full re-read of the list and summary, so what is held in memory is
//! always a real server snapshot.
//!
//! ```ignore
//! use storefront_sync::{Credentials, Storefront, StorefrontConfig};
//!
//! let store = Storefront::connect(StorefrontConfig::default()).await?;
//! store.auth().login(&Credentials::new("alice", "secret")).await?;
//! store.cart().add_to_cart(42, 1).await?;
//! println!("{:?}", store.cart().snapshot());
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod observability;
pub mod session;
pub mod state;
pub mod transport;

pub use auth::{AuthClient, Credentials, Registration};
pub use cart::{CartItem, CartSnapshot, CartSummary, CartSync, CheckoutReceipt, MutationResult, PendingKey};
pub use catalog::{Catalog, Page, Product, ProductQuery};
pub use config::StorefrontConfig;
pub use error::{Result, StoreError};
pub use fetch::{FetchState, RemoteResource, FETCH_ERROR_MESSAGE};
pub use session::{Session, SessionEnd, SessionHandle, UserIdentity};
pub use state::Storefront;
pub use transport::Transport;
