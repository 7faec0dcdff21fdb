//! The DSL context generated wrappers are implemented on.

use super::continuation::SharedContinuation;
use super::error::CallError;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, trace};

/// Receives `true` when a wrapped call starts and `false` when it returns
pub type BusySink = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DslError {
    #[error("service client has already been set")]
    ClientAlreadySet,

    #[error("no service client has been set")]
    ClientMissing,

    #[error("no implementation bound for {0}")]
    ServiceNotBound(&'static str),
}

/// Registry of service implementations keyed by the service type, usually
/// `dyn SomeService`.
#[derive(Default)]
pub struct ServiceClient {
    services: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    names: Vec<&'static str>,
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("services", &self.names)
            .finish()
    }
}

impl ServiceClient {
    pub fn builder() -> ServiceClientBuilder {
        ServiceClientBuilder::default()
    }

    pub fn get<S>(&self) -> Option<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.services
            .get(&TypeId::of::<S>())
            .and_then(|entry| entry.downcast_ref::<Arc<S>>())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[derive(Default)]
pub struct ServiceClientBuilder {
    client: ServiceClient,
}

impl ServiceClientBuilder {
    /// Bind `service` as the implementation of `S`; a later bind of the same
    /// type replaces it.
    pub fn bind<S>(mut self, service: Arc<S>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let previous = self
            .client
            .services
            .insert(TypeId::of::<S>(), Box::new(service));
        if previous.is_none() {
            self.client.names.push(type_name::<S>());
        }
        self
    }

    pub fn build(self) -> ServiceClient {
        self.client
    }
}

/// Signals `false` to the busy sink when dropped
#[must_use = "the busy state ends when the guard is dropped"]
pub struct BusyGuard {
    sink: BusySink,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        (self.sink)(false);
    }
}

/// Context that generated `*DslExtensions` traits are implemented for.
///
/// Holds the bound [`ServiceClient`], the busy sink and, optionally, the tokio
/// runtime deferred calls are spawned on.
pub struct ServiceDsl {
    client: OnceLock<ServiceClient>,
    busy_sink: BusySink,
    runtime: Option<Handle>,
}

impl Default for ServiceDsl {
    fn default() -> Self {
        Self {
            client: OnceLock::new(),
            busy_sink: Arc::new(|_| {}),
            runtime: None,
        }
    }
}

impl fmt::Debug for ServiceDsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDsl")
            .field("client", &self.client.get())
            .field("runtime", &self.runtime.is_some())
            .finish_non_exhaustive()
    }
}

impl ServiceDsl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_busy_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.busy_sink = Arc::new(sink);
        self
    }

    /// Spawn deferred calls on `handle` instead of the ambient runtime
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Set the service client. Only the first call succeeds.
    pub fn client(&self, client: ServiceClient) -> Result<(), DslError> {
        debug!(?client, "Binding service client");
        self.client
            .set(client)
            .map_err(|_| DslError::ClientAlreadySet)
    }

    /// Select the implementation bound for `S`, run `block` against this
    /// context and return the implementation.
    pub fn service<S, F>(&self, block: F) -> Result<Arc<S>, DslError>
    where
        S: ?Sized + Send + Sync + 'static,
        F: FnOnce(&Self),
    {
        let client = self.client.get().ok_or(DslError::ClientMissing)?;
        let service = client
            .get::<S>()
            .ok_or(DslError::ServiceNotBound(type_name::<S>()))?;
        block(self);
        Ok(service)
    }

    /// The bound implementation of `S`, as a call failure when missing
    pub fn service_handle<S>(&self) -> Result<Arc<S>, CallError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let client = self.client.get().ok_or_else(|| {
            CallError::ServiceUnavailable(DslError::ClientMissing.to_string())
        })?;
        client.get::<S>().ok_or_else(|| {
            CallError::ServiceUnavailable(DslError::ServiceNotBound(type_name::<S>()).to_string())
        })
    }

    /// Signal busy and return the guard that ends it
    pub fn busy(&self) -> BusyGuard {
        trace!("busy");
        (self.busy_sink)(true);
        BusyGuard {
            sink: Arc::clone(&self.busy_sink),
        }
    }

    /// Run `future` on the configured or ambient tokio runtime and complete
    /// `continuation` with its value. A panic in the future becomes
    /// [`CallError::Panicked`].
    pub fn spawn_deferred<T, F>(
        &self,
        future: F,
        continuation: SharedContinuation<T>,
    ) -> Result<(), CallError>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let handle = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|_| CallError::NoRuntime)?,
        };

        let task = handle.spawn(future);
        handle.spawn(async move {
            let outcome = match task.await {
                Ok(value) => Ok(value),
                Err(err) if err.is_panic() => Err(CallError::from_panic(err.into_panic())),
                Err(_) => Err(CallError::Cancelled),
            };
            continuation.complete(outcome);
        });
        Ok(())
    }
}

/// Build a [`ServiceDsl`] and configure it in `block`
pub fn service_dsl<F>(block: F) -> ServiceDsl
where
    F: FnOnce(&ServiceDsl),
{
    let dsl = ServiceDsl::new();
    block(&dsl);
    dsl
}
