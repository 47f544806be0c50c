//! End to end dispatch against a recording chain handler.

use async_trait::async_trait;
use chainbind_core::builder::{EventFieldOutline, EventOutline, MethodOutline, ParameterOutline};
use chainbind_core::dispatch::{contract_arguments, special_argument};
use chainbind_core::error::BuildError;
use chainbind_core::interface::ContractMethodConfig;
use chainbind_core::prelude::*;
use chainbind_core::{CallError, Chain, ContractBinding, ConvertError, EventBinding, EventSubscription, Invocation, MethodBinding};
use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Recording;

impl Chain for Recording {
    const NAME: &'static str = "recording";
    type Contract = ();
    type Method = ();
    type Parameter = ();
    type Event = ();
    type EventField = ();
}

struct NoSchema;

impl ChainSchema<Recording> for NoSchema {
    fn method(&self, _: &MethodOutline) -> std::result::Result<(), BuildError> {
        Ok(())
    }

    fn parameter(&self, _: &MethodOutline, _: &(), _: &ParameterOutline) -> std::result::Result<(), BuildError> {
        Ok(())
    }

    fn event(&self, _: &EventOutline) -> std::result::Result<(), BuildError> {
        Ok(())
    }

    fn event_field(&self, _: &EventOutline, _: &(), _: &EventFieldOutline) -> std::result::Result<(), BuildError> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingHandler {
    calls: Mutex<Vec<(String, String, Vec<Value>)>>,
}

impl RecordingHandler {
    fn record(&self, kind: &str, method: &MethodBinding<Recording>, args: Vec<Value>) -> Value {
        let contract_args = contract_arguments(method, args);
        self.calls
            .lock()
            .push((kind.to_string(), method.contract_method_name().to_string(), contract_args));
        Value::from(kind)
    }
}

#[async_trait]
impl ChainHandler<Recording> for RecordingHandler {
    fn special_methods(&self) -> &'static [&'static str] {
        &["deploy"]
    }

    async fn special(
        &self,
        name: &str,
        _binding: Arc<ContractBinding<Recording>>,
        method: &MethodBinding<Recording>,
        args: Vec<Value>,
    ) -> chainbind_core::Result<Reply> {
        Ok(Reply::Value(self.record(name, method, args)))
    }

    async fn query(
        &self,
        _binding: &ContractBinding<Recording>,
        method: &MethodBinding<Recording>,
        args: Vec<Value>,
    ) -> chainbind_core::Result<Reply> {
        Ok(Reply::Value(self.record("query", method, args)))
    }

    async fn transact(
        &self,
        _binding: &ContractBinding<Recording>,
        method: &MethodBinding<Recording>,
        args: Vec<Value>,
    ) -> chainbind_core::Result<Reply> {
        let gas = special_argument(method, &args, "gasprice").cloned();
        let value = self.record("transact", method, args);
        Ok(Reply::Wrapped(CallResult::recorded(
            Value::List(vec![value, gas.unwrap_or(Value::Null)]),
            "0xblock",
            "0xtx",
        )))
    }

    fn subscribe(
        &self,
        _binding: Arc<ContractBinding<Recording>>,
        event: &EventBinding<Recording>,
        args: Vec<Value>,
    ) -> chainbind_core::Result<EventSubscription> {
        let from = special_argument(event, &args, "fromBlock").cloned().unwrap_or(Value::Null);
        Ok(EventSubscription::new(event.event_name(), move || {
            Ok(futures::stream::iter(vec![Ok(Reply::Value(from.clone()))]).boxed())
        }))
    }
}

fn token() -> ContractInterface {
    ContractInterface::new("Token")
        .method(
            MethodSignature::new(
                "deploy",
                vec![ParameterSignature::new("supply", NativeType::Long)],
                ReturnSignature::void(),
            )
            .contract_method(ContractMethodConfig {
                special_method: true,
                ..Default::default()
            }),
        )
        .method(
            MethodSignature::new(
                "balance",
                vec![ParameterSignature::new("owner", NativeType::String)],
                ReturnSignature::of(NativeType::Long),
            )
            .contract_method(ContractMethodConfig {
                name: Some("balanceOf".to_string()),
                read_only: true,
                ..Default::default()
            }),
        )
        .method(MethodSignature::new(
            "transfer",
            vec![
                ParameterSignature::new("to", NativeType::String),
                ParameterSignature::new("gasPrice", NativeType::BigInteger).special("gasPrice"),
                ParameterSignature::new("amount", NativeType::Long),
            ],
            ReturnSignature::of(NativeType::String).wrapped().asynchronous(),
        ))
        .method(
            MethodSignature::new("burn", vec![], ReturnSignature::void()).contract_method(ContractMethodConfig {
                special_method: true,
                ..Default::default()
            }),
        )
        .method(MethodSignature::new(
            "onTransfer",
            vec![ParameterSignature::new("from", NativeType::Long).event_parameter("fromBlock")],
            ReturnSignature::events("Transferred"),
        ))
        .event_type(EventTypeDescriptor::new(
            "Transferred",
            vec![FieldSignature::new("amount", NativeType::Long)],
        ))
}

fn dispatcher() -> MethodDispatcher<Recording, RecordingHandler> {
    let mut builder = ContractBindingBuilder::<Recording>::new(token()).unwrap();
    builder.method("transfer", &[NativeType::String, NativeType::BigInteger, NativeType::Long]).unwrap();
    builder.event("onTransfer", &[NativeType::Long]).unwrap();
    let binding = builder.build(&NoSchema, ()).unwrap();
    MethodDispatcher::new(RecordingHandler::default(), binding)
}

#[tokio::test]
async fn test_calls_are_classified_in_order() {
    let dispatcher = dispatcher();

    let deploy = MethodId::new("deploy", &[NativeType::Long]);
    assert_eq!(dispatcher.call(&deploy, vec![Value::Long(100)]).await.unwrap(), Reply::Value(Value::from("deploy")));

    let balance = MethodId::new("balance", &[NativeType::String]);
    let reply = dispatcher.call(&balance, vec![Value::from("alice")]).await.unwrap();
    assert_eq!(reply, Reply::Value(Value::from("query")));

    let transfer = MethodId::new("transfer", &[NativeType::String, NativeType::BigInteger, NativeType::Long]);
    let invocation = dispatcher
        .invoke(&transfer, vec![Value::from("bob"), Value::Int(5), Value::Long(10)])
        .unwrap();
    let wrapped = invocation.reply().await.unwrap().into_wrapped().unwrap();
    assert_eq!(wrapped.transaction_hash.as_deref(), Some("0xtx"));
    assert_eq!(wrapped.data, Value::List(vec![Value::from("transact"), Value::Int(5)]));

    let calls = dispatcher.handler().calls.lock().clone();
    assert_eq!(
        calls,
        vec![
            ("deploy".to_string(), "deploy".to_string(), vec![Value::Long(100)]),
            ("query".to_string(), "balanceOf".to_string(), vec![Value::from("alice")]),
            ("transact".to_string(), "transfer".to_string(), vec![Value::from("bob"), Value::Long(10)]),
        ]
    );
}

#[tokio::test]
async fn test_event_methods_return_lazy_subscriptions() {
    let dispatcher = dispatcher();
    let on_transfer = MethodId::new("onTransfer", &[NativeType::Long]);

    let invocation = dispatcher.invoke(&on_transfer, vec![Value::Long(42)]).unwrap();
    assert!(matches!(invocation, Invocation::Events(_)));
    let subscription = invocation.into_subscription().unwrap();
    assert_eq!(subscription.event(), "onTransfer");

    let events: Vec<_> = subscription.subscribe().unwrap().collect().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_ref().unwrap(), &Reply::Value(Value::Long(42)));
    assert!(dispatcher.handler().calls.lock().is_empty());
}

#[tokio::test]
async fn test_argument_count_and_unknown_special_methods_are_rejected() {
    let dispatcher = dispatcher();

    let balance = MethodId::new("balance", &[NativeType::String]);
    let err = dispatcher.call(&balance, vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        chainbind_core::Error::Convert(ConvertError::ArgumentCount { declared: 1, actual: 0 })
    ));

    let burn = MethodId::new("burn", &[]);
    let err = dispatcher.call(&burn, vec![]).await.unwrap_err();
    assert!(matches!(err, chainbind_core::Error::Call(CallError::InvalidCall { .. })));
    assert!(err.to_string().contains("Unexpected special method 'burn' found!"));

    let unknown = MethodId::new("mint", &[]);
    assert!(dispatcher.call(&unknown, vec![]).await.is_err());
}
