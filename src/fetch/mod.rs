// Remote Resource Loader
// Declarative GET loading with {data, loading, error} and generation-guarded refetch

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::transport::Transport;

/// Message shown for any failed load; server detail is not surfaced here
pub const FETCH_ERROR_MESSAGE: &str = "Failed to load data, please try again later";

/// Parameter set for resources that take none
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoParams {}

/// What a view renders from
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> FetchState<T> {
    fn initial() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }
}

/// A GET-backed resource bound to a path and a parameter set.
///
/// Every load takes a fresh generation number. Only the completion of the
/// most recently issued load is applied; older ones are dropped on arrival.
pub struct RemoteResource<T, P = NoParams> {
    transport: Arc<Transport>,
    path: RwLock<String>,
    initial_params: P,
    dependencies: RwLock<Option<u64>>,
    state: ArcSwap<FetchState<T>>,
    generation: AtomicU64,
}

impl<T, P> RemoteResource<T, P>
where
    T: DeserializeOwned + Clone + Send + Sync,
    P: Serialize + Clone + Send + Sync,
{
    /// Create without loading; call [`RemoteResource::load`] to mount
    pub fn new(transport: Arc<Transport>, path: impl Into<String>, initial_params: P) -> Self {
        Self {
            transport,
            path: RwLock::new(path.into()),
            initial_params,
            dependencies: RwLock::new(None),
            state: ArcSwap::from_pointee(FetchState::initial()),
            generation: AtomicU64::new(0),
        }
    }

    /// Create and immediately load with the initial parameters
    pub async fn mount(transport: Arc<Transport>, path: impl Into<String>, initial_params: P) -> Self {
        let resource = Self::new(transport, path, initial_params);
        resource.load().await;
        resource
    }

    pub fn path(&self) -> String {
        self.path.read().clone()
    }

    pub fn snapshot(&self) -> Arc<FetchState<T>> {
        self.state.load_full()
    }

    pub fn data(&self) -> Option<T> {
        self.state.load().data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.load().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.load().error.clone()
    }

    /// Latest generation handed out
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Load with the initial parameters
    pub async fn load(&self) -> bool {
        let params = self.initial_params.clone();
        self.run(params).await
    }

    /// Load again, with new parameters or (when `None`) the initial ones.
    /// Returns whether this load's result was applied.
    pub async fn refetch(&self, params: Option<P>) -> bool {
        let params = params.unwrap_or_else(|| self.initial_params.clone());
        self.run(params).await
    }

    /// Point at a different path; loads only when it actually changed
    pub async fn set_path(&self, path: impl Into<String>) -> bool {
        let path = path.into();
        {
            let mut current = self.path.write();
            if *current == path {
                return false;
            }
            *current = path;
        }
        self.load().await
    }

    /// Declare the values this resource depends on; loads when they differ
    /// from the last declared set
    pub async fn set_dependencies<D: Hash + ?Sized>(&self, dependencies: &D) -> bool {
        let mut hasher = DefaultHasher::new();
        dependencies.hash(&mut hasher);
        let fingerprint = hasher.finish();

        {
            let mut current = self.dependencies.write();
            if *current == Some(fingerprint) {
                return false;
            }
            *current = Some(fingerprint);
        }
        self.load().await
    }

    async fn run(&self, params: P) -> bool {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let path = self.path();

        self.state.rcu(|current| FetchState {
            data: current.data.clone(),
            loading: true,
            error: None,
        });

        let result = self.transport.get_with::<T, P>(&path, &params).await;

        if self.generation.load(Ordering::Acquire) != generation {
            debug!(path = %path, generation, "Discarding superseded response");
            return false;
        }

        let next = match result {
            Ok(data) => FetchState {
                data: Some(data),
                loading: false,
                error: None,
            },
            Err(e) => {
                warn!(path = %path, error = %e, "Error fetching resource");
                FetchState {
                    data: None,
                    loading: false,
                    error: Some(FETCH_ERROR_MESSAGE.to_string()),
                }
            }
        };
        self.state.store(Arc::new(next));
        true
    }
}
