//! Private transaction routing of Quorum bindings.

use async_trait::async_trait;
use chainbind_core::prelude::*;
use chainbind_core::{CallError, ContractBinding};
use chainbind_ethereum::abi::AbiValue;
use chainbind_ethereum::api::{
    Deployment, EventLogApi, EventLogRequest, EventLogStream, FunctionCall, TransactionParams, Web3ContractApi,
};
use chainbind_ethereum::contract_info;
use chainbind_quorum::{private_for, Quorum, QuorumContractBuilder, QuorumHandler};
use num_bigint::BigInt;
use parking_lot::Mutex;
use std::result::Result;
use std::sync::Arc;

const ABI: &str = r#"[
    {"type":"constructor","inputs":[]},
    {"type":"function","name":"store","inputs":[{"name":"value","type":"uint256"}],"outputs":[]}
]"#;

const NODE_A: &str = "BULeR8JyUWhiuuCMU/HLA0Q5pzkYT+cHII3ZKBey3Bo=";
const NODE_B: &str = "QfeDAys9MPDs2XHExtc84jKGHxZg/aj52DTh0vtA3Xc=";

#[derive(Default)]
struct RecordingApi {
    params: Mutex<Vec<TransactionParams>>,
}

impl EventLogApi for RecordingApi {
    fn event_logs(&self, _: EventLogRequest) -> Result<EventLogStream, CallError> {
        Err(CallError::client("no logs"))
    }
}

#[async_trait]
impl Web3ContractApi for RecordingApi {
    async fn call(&self, _: FunctionCall) -> Result<Vec<AbiValue>, CallError> {
        Ok(vec![])
    }

    async fn transact(&self, _: FunctionCall, params: TransactionParams) -> Result<CallResult<Vec<AbiValue>>, CallError> {
        self.params.lock().push(params);
        Ok(CallResult::recorded(vec![], "0xblock", "0xtx"))
    }

    async fn deploy(&self, _: Deployment, params: TransactionParams) -> Result<CallResult<String>, CallError> {
        self.params.lock().push(params);
        Ok(CallResult::recorded("0x0a".to_string(), "0xblock", "0xtx"))
    }
}

fn interface() -> ContractInterface {
    ContractInterface::new("Storage")
        .method(MethodSignature::new("deploy", vec![], ReturnSignature::void()))
        .method(MethodSignature::new(
            "store",
            vec![
                ParameterSignature::new("privateFor", NativeType::list(NativeType::String)).special("privateFor"),
                ParameterSignature::new("gasPrice", NativeType::Long).special("gasPrice"),
                ParameterSignature::new("value", NativeType::Long),
            ],
            ReturnSignature::void(),
        ))
}

fn binding(defaults: &[&str], address: Option<&str>) -> Arc<ContractBinding<Quorum>> {
    let mut builder = QuorumContractBuilder::new(interface()).unwrap();
    builder.private_for(defaults.iter().copied());
    builder.with_abi(ABI).unwrap().with_binary("0x6080");
    if let Some(address) = address {
        builder.at_address(address);
    }
    builder.deployment_method("deploy", &[]).unwrap();
    builder
        .method(
            "store",
            &[NativeType::list(NativeType::String), NativeType::Long, NativeType::Long],
        )
        .unwrap();
    builder.build().unwrap()
}

fn store() -> MethodId {
    MethodId::new(
        "store",
        &[NativeType::list(NativeType::String), NativeType::Long, NativeType::Long],
    )
}

#[tokio::test]
async fn test_private_for_argument_overrides_contract_default() {
    let api = Arc::new(RecordingApi::default());
    let dispatcher = MethodDispatcher::new(QuorumHandler::new(api.clone()), binding(&[NODE_A], Some("0x01")));
    assert_eq!(private_for(dispatcher.binding()), &[NODE_A.to_string()]);

    let recipients = Value::List(vec![Value::from(NODE_B)]);
    dispatcher
        .call(&store(), vec![recipients, Value::Long(99), Value::Long(7)])
        .await
        .unwrap();
    dispatcher
        .call(&store(), vec![Value::Null, Value::Null, Value::Long(7)])
        .await
        .unwrap();

    let params = api.params.lock();
    assert_eq!(params[0].private_for, Some(vec![NODE_B.to_string()]));
    assert_eq!(params[1].private_for, Some(vec![NODE_A.to_string()]));
    assert_eq!(params[0].gas_price, BigInt::from(0));
}

#[tokio::test]
async fn test_transactions_without_recipients_are_public() {
    let api = Arc::new(RecordingApi::default());
    let dispatcher = MethodDispatcher::new(QuorumHandler::new(api.clone()), binding(&[], None));

    dispatcher.call(&MethodId::new("deploy", &[]), vec![]).await.unwrap();
    assert_eq!(contract_info(dispatcher.binding()).address.get(), Some("0x0a"));

    dispatcher
        .call(&store(), vec![Value::Null, Value::Null, Value::Long(7)])
        .await
        .unwrap();

    let params = api.params.lock();
    assert_eq!(params.len(), 2);
    assert!(params.iter().all(|p| p.private_for.is_none()));
}
