//! Router. Handlers are registered as [`tower_service::Service`]
//! implementations keyed by LSP method name; dispatch never decodes
//! `params` itself — it hands the still-raw [`RawParams`] straight to
//! whichever binding(s) are registered and lets each one opt into typed
//! decode on its own terms.
//!
//! Multiple bindings on the same method are legal and are run in
//! registration order; their replies are concatenated into a JSON array
//! unless there is exactly one binding, in which case its bare reply is
//! returned. If every binding on a fanned-out method errors, the first
//! error wins. When the caller supplies a partial-result token, each
//! binding's reply is additionally streamed out as a `$/progress`
//! notification as soon as it completes, rather than only appearing once
//! the whole fan-out has finished.
//!
//! Each binding lives behind its own `Rc<RefCell<_>>` rather than one
//! `RefCell` around the whole map, so dispatching one method never
//! requires holding a borrow across another method's await point —
//! looking bindings up is a short, synchronous step; running them is not.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use dls_lsp::progress::ProgressToken;
use dls_rpc::{error_code, RawParams, RequestId, ResponseError};
use serde_json::Value;
use tokio::sync::mpsc;
use tower_service::Service;

type BoxFuture = Pin<Box<dyn Future<Output = Result<Value, ResponseError>>>>;

/// A reply or notification bound for the client, written back by whoever
/// owns the stdout half of the transport.
pub enum OutboundMessage {
    Reply(RequestId, Result<Value, ResponseError>),
    Notification(String, Value),
}

pub type OutboundSender = mpsc::UnboundedSender<OutboundMessage>;

/// Type-erases a concrete `Service<RawParams, Response = Value, Error =
/// ResponseError>` so the Router can hold a heterogeneous list of
/// handlers behind one vtable.
trait ErasedBinding {
    fn call(&mut self, params: RawParams) -> BoxFuture;
}

struct Erased<S>(S);

impl<S> ErasedBinding for Erased<S>
where
    S: Service<RawParams, Response = Value, Error = ResponseError>,
    S::Future: 'static,
{
    fn call(&mut self, params: RawParams) -> BoxFuture {
        Box::pin(self.0.call(params))
    }
}

type Binding = Rc<RefCell<Box<dyn ErasedBinding>>>;

/// Registers handlers for request methods and dispatches incoming calls
/// to them.
#[derive(Default)]
pub struct Router {
    bindings: HashMap<String, Vec<Binding>>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` to handle `method`. A second registration for
    /// the same method fans out rather than replacing the first.
    pub fn register<S>(&mut self, method: impl Into<String>, service: S)
    where
        S: Service<RawParams, Response = Value, Error = ResponseError> + 'static,
        S::Future: 'static,
    {
        self.bindings
            .entry(method.into())
            .or_default()
            .push(Rc::new(RefCell::new(Box::new(Erased(service)))));
    }

    #[must_use]
    pub fn is_registered(&self, method: &str) -> bool {
        self.bindings.get(method).is_some_and(|b| !b.is_empty())
    }

    /// Snapshot the bindings registered for `method` as cheaply-cloned
    /// `Rc` handles — safe to hold across an await, unlike a borrow of
    /// the Router itself.
    #[must_use]
    pub(crate) fn bindings_for(&self, method: &str) -> Option<Vec<Binding>> {
        self.bindings.get(method).filter(|b| !b.is_empty()).cloned()
    }

    /// Dispatch a request to every binding registered for its method, in
    /// registration order. Returns `MethodNotFound` if nothing is
    /// registered.
    pub async fn dispatch(&self, method: &str, params: RawParams) -> Result<Value, ResponseError> {
        let bindings = self.bindings_for(method).ok_or_else(|| {
            ResponseError::new(error_code::METHOD_NOT_FOUND, format!("method not found: {method}"))
        })?;
        dispatch_bindings(&bindings, params, None).await
    }
}

async fn call_one(binding: &Binding, params: RawParams) -> Result<Value, ResponseError> {
    // The borrow only needs to live long enough to hand out the binding's
    // (owned, `'static`) future; it is not held across the `.await` below.
    let fut = binding.borrow_mut().call(params);
    fut.await
}

/// Run every binding in `bindings` against `params`, in registration
/// order. When `progress` carries a token, each binding's successful
/// reply is also sent as a `$/progress` notification as soon as it's
/// ready — useful for a fanned-out method like `workspace/symbol` where a
/// client would rather see results trickle in than wait for the slowest
/// binding.
pub(crate) async fn dispatch_bindings(
    bindings: &[Binding],
    params: RawParams,
    progress: Option<(ProgressToken, OutboundSender)>,
) -> Result<Value, ResponseError> {
    if bindings.len() == 1 {
        return call_one(&bindings[0], params).await;
    }

    let mut oks = Vec::with_capacity(bindings.len());
    let mut first_err = None;
    for binding in bindings {
        match call_one(binding, params.clone()).await {
            Ok(value) => {
                if let Some((token, out)) = &progress {
                    let chunk = serde_json::json!({"token": token, "value": value});
                    let _ = out.send(OutboundMessage::Notification("$/progress".to_string(), chunk));
                }
                oks.push(value);
            }
            Err(err) => {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
    }

    if oks.is_empty() {
        Err(first_err.expect("at least one binding ran"))
    } else if oks.len() == 1 {
        Ok(oks.into_iter().next().expect("checked len == 1"))
    } else {
        Ok(Value::Array(oks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::{Context, Poll};

    #[derive(Clone)]
    struct Echo(Value);

    impl Service<RawParams> for Echo {
        type Response = Value;
        type Error = ResponseError;
        type Future = Pin<Box<dyn Future<Output = Result<Value, ResponseError>>>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: RawParams) -> Self::Future {
            let value = self.0.clone();
            Box::pin(async move { Ok(value) })
        }
    }

    struct Failing;

    impl Service<RawParams> for Failing {
        type Response = Value;
        type Error = ResponseError;
        type Future = Pin<Box<dyn Future<Output = Result<Value, ResponseError>>>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: RawParams) -> Self::Future {
            Box::pin(async { Err(ResponseError::new(error_code::INTERNAL_ERROR, "boom")) })
        }
    }

    #[tokio::test]
    async fn unregistered_method_is_method_not_found() {
        let mut router = Router::new();
        let err = router
            .dispatch("textDocument/hover", RawParams::empty_object())
            .await
            .unwrap_err();
        assert_eq!(err.code, error_code::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn single_binding_returns_its_bare_value() {
        let mut router = Router::new();
        router.register("textDocument/hover", Echo(Value::String("ok".into())));
        let result = router
            .dispatch("textDocument/hover", RawParams::empty_object())
            .await
            .unwrap();
        assert_eq!(result, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn fanned_out_bindings_concatenate_in_registration_order() {
        let mut router = Router::new();
        router.register("workspace/symbol", Echo(Value::from(1)));
        router.register("workspace/symbol", Echo(Value::from(2)));
        let result = router
            .dispatch("workspace/symbol", RawParams::empty_object())
            .await
            .unwrap();
        assert_eq!(result, Value::Array(vec![Value::from(1), Value::from(2)]));
    }

    #[tokio::test]
    async fn first_error_wins_when_every_binding_fails() {
        let mut router = Router::new();
        router.register("workspace/symbol", Failing);
        router.register("workspace/symbol", Failing);
        let err = router
            .dispatch("workspace/symbol", RawParams::empty_object())
            .await
            .unwrap_err();
        assert_eq!(err.code, error_code::INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn partial_success_among_fanned_out_bindings_drops_the_error() {
        let mut router = Router::new();
        router.register("workspace/symbol", Echo(Value::from(1)));
        router.register("workspace/symbol", Failing);
        let result = router
            .dispatch("workspace/symbol", RawParams::empty_object())
            .await
            .unwrap();
        assert_eq!(result, Value::from(1));
    }
}
