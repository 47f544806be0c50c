//! Classification and execution of intercepted interface calls.
//!
//! A [`MethodDispatcher`] owns one built [`ContractBinding`] and a chain
//! specific [`ChainHandler`]. Calls are classified in a fixed order: special
//! method, event subscription, read-only query, transaction. Everything but
//! event subscriptions runs on a tokio task and is handed back as a
//! [`CallHandle`].

mod special;

pub use special::{big_integer_argument, contract_arguments, special_argument, string_collection_argument};

use crate::error::{CallError, ConvertError, Error, Result};
use crate::ids::MethodId;
use crate::metadata::{Chain, ContractBinding, EventBinding, MethodBinding};
use crate::result::Reply;
use crate::subscription::EventSubscription;
use crate::types::Value;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tracing::debug;

/// Chain specific execution of dispatched calls.
#[async_trait]
pub trait ChainHandler<C: Chain>: Send + Sync + 'static {
    /// Names of the special methods this chain routes out of band.
    fn special_methods(&self) -> &'static [&'static str];

    /// Runs the special method `name`.
    async fn special(
        &self,
        name: &str,
        binding: Arc<ContractBinding<C>>,
        method: &MethodBinding<C>,
        args: Vec<Value>,
    ) -> Result<Reply>;

    /// Issues a read-only call.
    async fn query(&self, binding: &ContractBinding<C>, method: &MethodBinding<C>, args: Vec<Value>) -> Result<Reply>;

    /// Issues a state changing call.
    async fn transact(&self, binding: &ContractBinding<C>, method: &MethodBinding<C>, args: Vec<Value>) -> Result<Reply>;

    /// Creates a lazy subscription handle for an event.
    fn subscribe(
        &self,
        binding: Arc<ContractBinding<C>>,
        event: &EventBinding<C>,
        args: Vec<Value>,
    ) -> Result<EventSubscription>;
}

/// Pending result of a dispatched call.
#[derive(Debug)]
pub struct CallHandle {
    inner: JoinHandle<Result<Reply>>,
}

impl CallHandle {
    fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<Reply>> + Send + 'static,
    {
        Self {
            inner: tokio::spawn(future),
        }
    }

    /// Whether the call has finished.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl Future for CallHandle {
    type Output = Result<Reply>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(Error::Call(CallError::Worker { message: e.to_string() })),
        })
    }
}

/// Outcome of dispatching one call.
#[derive(Debug)]
pub enum Invocation {
    /// A call running on a worker task.
    Call(CallHandle),
    /// A lazy event subscription.
    Events(EventSubscription),
}

impl Invocation {
    /// Waits for the call to finish.
    pub async fn reply(self) -> Result<Reply> {
        match self {
            Invocation::Call(handle) => handle.await,
            Invocation::Events(subscription) => Err(CallError::invalid_call(format!(
                "event method for '{}' does not produce a reply",
                subscription.event()
            ))
            .into()),
        }
    }

    /// The subscription handle of an event method.
    pub fn into_subscription(self) -> Result<EventSubscription> {
        match self {
            Invocation::Events(subscription) => Ok(subscription),
            Invocation::Call(_) => Err(CallError::invalid_call("method does not subscribe to an event").into()),
        }
    }
}

/// Dispatches interface calls against one contract binding.
pub struct MethodDispatcher<C: Chain, H: ChainHandler<C>> {
    handler: Arc<H>,
    binding: Arc<ContractBinding<C>>,
}

impl<C: Chain, H: ChainHandler<C>> Clone for MethodDispatcher<C, H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            binding: Arc::clone(&self.binding),
        }
    }
}

impl<C: Chain, H: ChainHandler<C>> MethodDispatcher<C, H> {
    /// Creates a dispatcher.
    pub fn new(handler: H, binding: Arc<ContractBinding<C>>) -> Self {
        Self {
            handler: Arc::new(handler),
            binding,
        }
    }

    /// The contract binding calls are dispatched against.
    pub fn binding(&self) -> &Arc<ContractBinding<C>> {
        &self.binding
    }

    /// The chain handler.
    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Classifies and starts a call.
    pub fn invoke(&self, method: &MethodId, args: Vec<Value>) -> Result<Invocation> {
        if let Some(binding) = self.binding.method(method) {
            check_argument_count(binding.parameters().len(), args.len())?;

            if binding.is_special_method() {
                let name = binding.contract_method_name();
                if !self.handler.special_methods().iter().any(|m| *m == name) {
                    return Err(CallError::invalid_call(format!("Unexpected special method '{}' found!", name)).into());
                }
                debug!("Dispatching special method '{}' of '{}'", name, self.binding.identifier());
                let kind = CallKind::Special(name.to_string());
                return Ok(Invocation::Call(self.spawn(method, kind, args)));
            }
        }

        if let Some(event) = self.binding.event_for_method(method) {
            check_argument_count(event.parameters().len(), args.len())?;
            debug!("Creating subscription for event '{}'", event.event_name());
            return self
                .handler
                .subscribe(Arc::clone(&self.binding), event, args)
                .map(Invocation::Events);
        }

        let binding = self.binding.method(method).ok_or_else(|| unbound(method, &self.binding))?;
        let kind = if binding.is_read_only() {
            debug!("Dispatching query '{}'", binding.contract_method_name());
            CallKind::Query
        } else {
            debug!("Dispatching transaction '{}'", binding.contract_method_name());
            CallKind::Transaction
        };
        Ok(Invocation::Call(self.spawn(method, kind, args)))
    }

    /// Dispatches a call and waits for its reply.
    pub async fn call(&self, method: &MethodId, args: Vec<Value>) -> Result<Reply> {
        self.invoke(method, args)?.reply().await
    }

    /// Dispatches an event method and returns its subscription handle.
    pub fn events(&self, method: &MethodId, args: Vec<Value>) -> Result<EventSubscription> {
        self.invoke(method, args)?.into_subscription()
    }

    fn spawn(&self, method: &MethodId, kind: CallKind, args: Vec<Value>) -> CallHandle {
        let handler = Arc::clone(&self.handler);
        let contract = Arc::clone(&self.binding);
        let method = method.clone();
        CallHandle::spawn(async move {
            let binding = contract.method(&method).ok_or_else(|| unbound(&method, &contract))?;
            match kind {
                CallKind::Special(name) => handler.special(&name, Arc::clone(&contract), binding, args).await,
                CallKind::Query => handler.query(&contract, binding, args).await,
                CallKind::Transaction => handler.transact(&contract, binding, args).await,
            }
        })
    }
}

enum CallKind {
    Special(String),
    Query,
    Transaction,
}

fn unbound<C: Chain>(method: &MethodId, contract: &ContractBinding<C>) -> CallError {
    CallError::invalid_call(format!(
        "Method '{}' is not bound on contract '{}'",
        method,
        contract.identifier()
    ))
}

fn check_argument_count(declared: usize, actual: usize) -> Result<()> {
    if declared == actual {
        Ok(())
    } else {
        Err(ConvertError::ArgumentCount { declared, actual }.into())
    }
}
