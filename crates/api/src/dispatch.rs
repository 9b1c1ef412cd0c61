//! Typed handler adapters and the dispatch table.
//!
//! Business logic is written against the narrowest signature it needs
//! (`fn(i64, store)`, `fn(String, body, store)`, ...). The adapters in this
//! module pull those arguments out of the generic request inputs and erase
//! the handler into one uniform [`Handler`] the routing layer can call.

use bytes::Bytes;
use futures::future::BoxFuture;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use traffic_ops_core::{
    traits::Datastore,
    types::{ApiMethod, ApiMethods, HandlerOutput, API_PATH},
    Error, Result,
};

/// Path parameters captured from the route template, e.g. `key`, `key0`.
pub type PathParams = HashMap<String, String>;

/// Everything a uniform handler receives.
pub struct RequestContext {
    pub path_params: PathParams,
    pub body: Bytes,
    pub store: Arc<dyn Datastore>,
}

type ApiHandlerFn = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Result<HandlerOutput>> + Send + Sync>;

/// Which typed signature a handler was adapted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerShape {
    Empty,
    Int64,
    String,
    Body,
    Int64Body,
    StringBody,
    StringInt64,
    StringInt64Body,
    StringString,
    StringStringBody,
}

impl HandlerShape {
    /// Whether the shape reads the request body.
    pub fn takes_body(&self) -> bool {
        matches!(
            self,
            Self::Body | Self::Int64Body | Self::StringBody | Self::StringInt64Body | Self::StringStringBody
        )
    }
}

/// A handler erased to the uniform signature.
#[derive(Clone)]
pub struct Handler {
    shape: HandlerShape,
    call: ApiHandlerFn,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").field("shape", &self.shape).finish()
    }
}

impl Handler {
    fn new<G, Fut, T>(shape: HandlerShape, g: G) -> Self
    where
        G: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerOutput<T>>> + Send + 'static,
        T: Serialize + 'static,
    {
        let call: ApiHandlerFn = Arc::new(move |ctx: RequestContext| -> BoxFuture<'static, Result<HandlerOutput>> {
            let fut = g(ctx);
            Box::pin(async move { Ok(fut.await?.into_json()?) })
        });
        Self { shape, call }
    }

    pub fn shape(&self) -> HandlerShape {
        self.shape
    }

    /// Invoke the handler; its result is returned unchanged.
    pub async fn call(&self, ctx: RequestContext) -> Result<HandlerOutput> {
        (self.call)(ctx).await
    }
}

// =============================================================================
// Key extraction
// =============================================================================

fn string_param(params: &PathParams, name: &str, what: &str) -> Result<String> {
    params
        .get(name)
        .cloned()
        .ok_or_else(|| Error::missing_key(what))
}

fn int64_param(params: &PathParams, name: &str, what: &str, ordinal: &'static str) -> Result<i64> {
    let raw = string_param(params, name, what)?;
    raw.parse::<i64>().map_err(|_| Error::KeyNotInteger {
        ordinal,
        value: raw,
    })
}

// =============================================================================
// Adapters
// =============================================================================

/// Adapt `fn(store)`.
pub fn empty<F, Fut, T>(f: F) -> Handler
where
    F: Fn(Arc<dyn Datastore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput<T>>> + Send + 'static,
    T: Serialize + 'static,
{
    Handler::new(HandlerShape::Empty, move |ctx: RequestContext| f(ctx.store))
}

/// Adapt `fn(body, store)`. The body is passed through undecoded.
pub fn body<F, Fut, T>(f: F) -> Handler
where
    F: Fn(Bytes, Arc<dyn Datastore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput<T>>> + Send + 'static,
    T: Serialize + 'static,
{
    Handler::new(HandlerShape::Body, move |ctx: RequestContext| f(ctx.body, ctx.store))
}

/// Adapt `fn(key: i64, store)`, reading `key` from the path.
pub fn int64_key<F, Fut, T>(f: F) -> Handler
where
    F: Fn(i64, Arc<dyn Datastore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput<T>>> + Send + 'static,
    T: Serialize + 'static,
{
    let f = Arc::new(f);
    Handler::new(HandlerShape::Int64, move |ctx: RequestContext| {
        let f = f.clone();
        async move {
            let key = int64_param(&ctx.path_params, "key", "int64 key", "")?;
            f(key, ctx.store).await
        }
    })
}

/// Adapt `fn(key: i64, body, store)`.
pub fn int64_key_body<F, Fut, T>(f: F) -> Handler
where
    F: Fn(i64, Bytes, Arc<dyn Datastore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput<T>>> + Send + 'static,
    T: Serialize + 'static,
{
    let f = Arc::new(f);
    Handler::new(HandlerShape::Int64Body, move |ctx: RequestContext| {
        let f = f.clone();
        async move {
            let key = int64_param(&ctx.path_params, "key", "int64 key", "")?;
            f(key, ctx.body, ctx.store).await
        }
    })
}

/// Adapt `fn(key: String, store)`.
pub fn string_key<F, Fut, T>(f: F) -> Handler
where
    F: Fn(String, Arc<dyn Datastore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput<T>>> + Send + 'static,
    T: Serialize + 'static,
{
    let f = Arc::new(f);
    Handler::new(HandlerShape::String, move |ctx: RequestContext| {
        let f = f.clone();
        async move {
            let key = string_param(&ctx.path_params, "key", "string key")?;
            f(key, ctx.store).await
        }
    })
}

/// Adapt `fn(key: String, body, store)`.
pub fn string_key_body<F, Fut, T>(f: F) -> Handler
where
    F: Fn(String, Bytes, Arc<dyn Datastore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput<T>>> + Send + 'static,
    T: Serialize + 'static,
{
    let f = Arc::new(f);
    Handler::new(HandlerShape::StringBody, move |ctx: RequestContext| {
        let f = f.clone();
        async move {
            let key = string_param(&ctx.path_params, "key", "string key")?;
            f(key, ctx.body, ctx.store).await
        }
    })
}

/// Adapt `fn(key0: String, key1: i64, store)` for two-key routes.
pub fn string_int64_keys<F, Fut, T>(f: F) -> Handler
where
    F: Fn(String, i64, Arc<dyn Datastore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput<T>>> + Send + 'static,
    T: Serialize + 'static,
{
    let f = Arc::new(f);
    Handler::new(HandlerShape::StringInt64, move |ctx: RequestContext| {
        let f = f.clone();
        async move {
            let key0 = string_param(&ctx.path_params, "key0", "string key")?;
            let key1 = int64_param(&ctx.path_params, "key1", "second int64 key", "second ")?;
            f(key0, key1, ctx.store).await
        }
    })
}

/// Adapt `fn(key0: String, key1: i64, body, store)`.
pub fn string_int64_keys_body<F, Fut, T>(f: F) -> Handler
where
    F: Fn(String, i64, Bytes, Arc<dyn Datastore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput<T>>> + Send + 'static,
    T: Serialize + 'static,
{
    let f = Arc::new(f);
    Handler::new(HandlerShape::StringInt64Body, move |ctx: RequestContext| {
        let f = f.clone();
        async move {
            let key0 = string_param(&ctx.path_params, "key0", "string key")?;
            let key1 = int64_param(&ctx.path_params, "key1", "second int64 key", "second ")?;
            f(key0, key1, ctx.body, ctx.store).await
        }
    })
}

/// Adapt `fn(key0: String, key1: String, store)`.
pub fn string_string_keys<F, Fut, T>(f: F) -> Handler
where
    F: Fn(String, String, Arc<dyn Datastore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput<T>>> + Send + 'static,
    T: Serialize + 'static,
{
    let f = Arc::new(f);
    Handler::new(HandlerShape::StringString, move |ctx: RequestContext| {
        let f = f.clone();
        async move {
            let key0 = string_param(&ctx.path_params, "key0", "string key")?;
            let key1 = string_param(&ctx.path_params, "key1", "second string key")?;
            f(key0, key1, ctx.store).await
        }
    })
}

/// Adapt `fn(key0: String, key1: String, body, store)`.
pub fn string_string_keys_body<F, Fut, T>(f: F) -> Handler
where
    F: Fn(String, String, Bytes, Arc<dyn Datastore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput<T>>> + Send + 'static,
    T: Serialize + 'static,
{
    let f = Arc::new(f);
    Handler::new(HandlerShape::StringStringBody, move |ctx: RequestContext| {
        let f = f.clone();
        async move {
            let key0 = string_param(&ctx.path_params, "key0", "string key")?;
            let key1 = string_param(&ctx.path_params, "key1", "second string key")?;
            f(key0, key1, ctx.body, ctx.store).await
        }
    })
}

// =============================================================================
// Dispatch table
// =============================================================================

#[derive(Debug, Default)]
struct Route {
    /// Registration order is kept for `Allow` headers.
    handlers: Vec<(ApiMethod, Handler)>,
}

impl Route {
    fn get(&self, method: ApiMethod) -> Option<&Handler> {
        self.handlers
            .iter()
            .find(|(m, _)| *m == method)
            .map(|(_, h)| h)
    }
}

/// Immutable map from (path template, method) to handler.
///
/// Built once at startup and shared by reference; lookups need no locking.
#[derive(Debug, Default)]
pub struct DispatchTable {
    routes: HashMap<String, Route>,
    order: Vec<String>,
}

impl DispatchTable {
    pub fn builder() -> DispatchTableBuilder {
        DispatchTableBuilder::default()
    }

    /// Registered path templates, in registration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of registered (path, method) pairs.
    pub fn len(&self) -> usize {
        self.routes.values().map(|r| r.handlers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn handler(&self, path: &str, method: ApiMethod) -> Option<&Handler> {
        self.routes.get(path).and_then(|r| r.get(method))
    }

    /// Methods registered for a path, or `None` for an unknown path.
    pub fn allowed_methods(&self, path: &str) -> Option<ApiMethods> {
        self.routes
            .get(path)
            .map(|r| r.handlers.iter().map(|(m, _)| *m).collect())
    }

    /// Look up and invoke the handler for (path, method).
    pub async fn dispatch(
        &self,
        path: &str,
        method: ApiMethod,
        path_params: PathParams,
        body: Bytes,
        store: Arc<dyn Datastore>,
    ) -> Result<HandlerOutput> {
        let handler = self
            .handler(path, method)
            .ok_or_else(|| Error::not_found(format!("{} {}{}", method, API_PATH, path)))?;

        tracing::debug!(
            path = path,
            method = %method,
            shape = ?handler.shape(),
            "Dispatching request"
        );

        handler
            .call(RequestContext {
                path_params,
                body,
                store,
            })
            .await
    }
}

/// Collects registrations and validates them once in [`build`](Self::build).
#[derive(Default)]
pub struct DispatchTableBuilder {
    entries: Vec<(String, ApiMethod, Handler)>,
}

impl DispatchTableBuilder {
    /// Register a handler for (path, method).
    pub fn route(mut self, path: impl Into<String>, method: ApiMethod, handler: Handler) -> Self {
        self.entries.push((path.into(), method, handler));
        self
    }

    /// Build the table, failing if any (path, method) pair is registered twice.
    pub fn build(self) -> Result<DispatchTable> {
        let mut table = DispatchTable::default();

        for (path, method, handler) in self.entries {
            if !table.routes.contains_key(&path) {
                table.order.push(path.clone());
            }
            let route = table.routes.entry(path.clone()).or_default();
            if route.get(method).is_some() {
                return Err(Error::DuplicateRoute {
                    path,
                    method: method.to_string(),
                });
            }
            route.handlers.push((method, handler));
        }

        tracing::info!(
            paths = table.order.len(),
            handlers = table.len(),
            "Dispatch table built"
        );
        Ok(table)
    }
}
