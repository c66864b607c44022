//! RPC dispatcher: maps method names to asynchronous handlers.
//!
//! Handlers are registered by whoever builds the relay; the dispatcher
//! itself knows no method names. Invoking an unknown method never fails
//! synchronously: the returned future resolves to
//! [`Error::UnknownMethod`]. Handler failures come back as
//! [`Error::HandlerFailure`] so the caller can answer the peer with a
//! correlated error instead of unwinding.

use std::collections::HashMap;
use std::future::Future;

use futures_lite::future::{self, BoxedLocal, FutureExt};
use log::debug;
use serde_json::Value;

use crate::error::{Error, Result};

/// Boxed handler: argument in, local future of the JSON result out.
type Handler = Box<dyn Fn(Value) -> BoxedLocal<core::result::Result<Value, String>>>;

/// Name → handler table.
#[derive(Default)]
pub struct RpcDispatcher {
    methods: HashMap<String, Handler>,
}

impl RpcDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `method`, replacing any previous entry.
    pub fn register<F, Fut>(&mut self, method: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + 'static,
        Fut: Future<Output = core::result::Result<Value, String>> + 'static,
    {
        let method = method.into();
        debug!("RPC: registered '{}'", method);
        self.methods
            .insert(method, Box::new(move |arg| handler(arg).boxed_local()));
    }

    /// Start a call. The future is `'static`, so it can be spawned on the
    /// relay's executor without borrowing the dispatcher.
    pub fn invoke(&self, method: &str, argument: Value) -> BoxedLocal<Result<Value>> {
        match self.methods.get(method) {
            Some(handler) => {
                let call = handler(argument);
                async move { call.await.map_err(Error::HandlerFailure) }.boxed_local()
            }
            None => future::ready(Err(Error::UnknownMethod(method.to_owned()))).boxed_local(),
        }
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
