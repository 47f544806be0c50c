//! Execution of dispatched calls on ABI chains.

use crate::abi::normalize_address;
use crate::api::{
    BlockParameter, ContractGasProvider, Deployment, EventLogApi, EventLogRequest, FunctionCall, StaticGasProvider,
    TransactionParams, Web3ContractApi,
};
use crate::converter::AbiArgumentConverter;
use crate::metadata::{contract_info, AbiChain, Ethereum};
use crate::special::{DEPLOYMENT_METHOD, FROM_BLOCK, GAS_LIMIT, GAS_PRICE, TO_BLOCK, VALUE};
use async_trait::async_trait;
use chainbind_core::dispatch::{big_integer_argument, contract_arguments, special_argument};
use chainbind_core::result::unrecorded_reply;
use chainbind_core::{
    CallError, CallResult, ChainHandler, ContractBinding, DeploymentError, EventBinding, EventSubscription,
    MethodBinding, Reply, Result, TypeConverters, Value,
};
use futures::StreamExt;
use num_bigint::BigInt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Deploys, calls and subscribes through a [`Web3ContractApi`].
///
/// Shared by every chain following the Ethereum ABI; the chain specific
/// handlers only decide the [`TransactionParams`].
#[derive(Clone)]
pub struct AbiCallExecutor {
    api: Arc<dyn Web3ContractApi>,
    converter: AbiArgumentConverter,
}

impl AbiCallExecutor {
    /// Creates an executor.
    pub fn new(api: Arc<dyn Web3ContractApi>, converter: AbiArgumentConverter) -> Self {
        Self { api, converter }
    }

    /// The contract API.
    pub fn api(&self) -> &Arc<dyn Web3ContractApi> {
        &self.api
    }

    /// The argument converter.
    pub fn converter(&self) -> &AbiArgumentConverter {
        &self.converter
    }

    /// Deploys the contract and records its address.
    pub async fn deploy<C: AbiChain>(
        &self,
        binding: &ContractBinding<C>,
        method: &MethodBinding<C>,
        args: Vec<Value>,
        params: TransactionParams,
    ) -> Result<Reply> {
        let contract = binding.identifier();
        let info = contract_info(binding);
        if info.address.is_set() {
            return Err(DeploymentError::address_already_set(contract).into());
        }
        let binary = info
            .binary
            .clone()
            .ok_or_else(|| DeploymentError::missing_artifact(contract, "contract binary"))?;
        let constructor_arguments = self
            .converter
            .convert_arguments(method.contract_parameters(), contract_arguments(method, args))?;

        info!("Deploying contract '{}'", contract);
        let deployment = Deployment {
            binary,
            constructor_arguments,
        };
        let result = self
            .api
            .deploy(deployment, params)
            .await
            .map_err(|e| DeploymentError::rejected_with(contract, e.to_string(), e))?;
        info.address.set(contract, result.data.clone())?;
        info!("Contract '{}' deployed at {}", contract, result.data);

        let value = if method.is_void_return() {
            Value::Unit
        } else {
            Value::String(result.data.clone())
        };
        Ok(Reply::new(result.map(|_| value), method.uses_result_wrapper()))
    }

    /// Builds the function call of `method`.
    pub fn function_call<C: AbiChain>(
        &self,
        binding: &ContractBinding<C>,
        method: &MethodBinding<C>,
        args: Vec<Value>,
    ) -> Result<FunctionCall> {
        let address = deployed_address(binding)?;
        let inputs = self
            .converter
            .convert_arguments(method.contract_parameters(), contract_arguments(method, args))?;
        Ok(FunctionCall {
            contract_address: address,
            name: method.contract_method_name().to_string(),
            inputs,
            outputs: method.chain().outputs().to_vec(),
        })
    }

    /// Executes a read-only function.
    pub async fn query<C: AbiChain>(
        &self,
        binding: &ContractBinding<C>,
        method: &MethodBinding<C>,
        args: Vec<Value>,
    ) -> Result<Reply> {
        let call = self.function_call(binding, method, args)?;
        debug!("Preparing readonly function call '{}()'", call.name);
        let results = self.api.call(call).await?;
        let value = self.converter.convert_method_result(method, results)?;
        Ok(unrecorded_reply(value, method.uses_result_wrapper()))
    }

    /// Sends a transaction calling `method`.
    pub async fn transact<C: AbiChain>(
        &self,
        binding: &ContractBinding<C>,
        method: &MethodBinding<C>,
        args: Vec<Value>,
        params: TransactionParams,
    ) -> Result<Reply> {
        let call = self.function_call(binding, method, args)?;
        let name = call.name.clone();
        debug!("Preparing function call '{}()'", name);
        let result = self.api.transact(call, params).await.map_err(|e| {
            error!("Failed to invoke function '{}' of contract '{}'! {}", name, binding.identifier(), e);
            e
        })?;
        let result = result.try_map(|results| self.converter.convert_method_result(method, results))?;
        Ok(Reply::new(result, method.uses_result_wrapper()))
    }

    /// Creates a lazy subscription to `event`.
    ///
    /// The contract address is read when a stream is opened, so events of a
    /// contract deployed after this call are still reachable.
    pub fn subscribe<C: AbiChain>(
        &self,
        binding: Arc<ContractBinding<C>>,
        event: &EventBinding<C>,
        args: Vec<Value>,
    ) -> Result<EventSubscription> {
        let from_block = BlockParameter::from_argument(special_argument(event, &args, FROM_BLOCK));
        let to_block = BlockParameter::from_argument(special_argument(event, &args, TO_BLOCK));
        let api = Arc::clone(&self.api);
        let converter = self.converter.clone();
        let event = event.clone();

        Ok(EventSubscription::new(event.event_name().to_string(), move || {
            let request = EventLogRequest {
                contract_address: deployed_address(&binding)?,
                event: event.chain().abi.clone(),
                from_block,
                to_block,
            };
            debug!(
                "Subscribing to event '{}' of {} ({} to {})",
                event.event_name(),
                request.contract_address,
                from_block,
                to_block
            );
            let logs = api.event_logs(request)?;
            let converter = converter.clone();
            let event = event.clone();
            Ok(logs
                .map(move |log| -> Result<Reply> {
                    let log = log?;
                    let data = converter.create_event_object(&event, &log.values)?;
                    let result = CallResult::recorded(data, log.block_hash, log.transaction_hash);
                    Ok(Reply::new(result, event.uses_event_wrapper()))
                })
                .boxed())
        }))
    }
}

fn deployed_address<C: AbiChain>(binding: &ContractBinding<C>) -> std::result::Result<String, CallError> {
    contract_info(binding)
        .address
        .get()
        .map(normalize_address)
        .ok_or_else(|| CallError::invalid_call("Contract address is not set in contract info"))
}

/// Reads the gas and value special arguments of a call.
pub fn transaction_params<C: AbiChain>(
    gas_provider: &dyn ContractGasProvider,
    method: &MethodBinding<C>,
    args: &[Value],
) -> TransactionParams {
    let name = method.contract_method_name();
    TransactionParams {
        gas_price: big_integer_argument(special_argument(method, args, GAS_PRICE), || gas_provider.gas_price(name)),
        gas_limit: big_integer_argument(special_argument(method, args, GAS_LIMIT), || gas_provider.gas_limit(name)),
        value: special_argument(method, args, VALUE).map(|value| big_integer_argument(Some(value), BigInt::default)),
        private_for: None,
    }
}

/// [`ChainHandler`] for Ethereum.
pub struct EthereumHandler {
    executor: AbiCallExecutor,
    gas_provider: Arc<dyn ContractGasProvider>,
}

impl EthereumHandler {
    /// Creates a handler with the default gas provider and an empty converter registry.
    pub fn new(api: Arc<dyn Web3ContractApi>) -> Self {
        Self {
            executor: AbiCallExecutor::new(api, AbiArgumentConverter::default()),
            gas_provider: Arc::new(StaticGasProvider::default()),
        }
    }

    /// Replaces the gas provider.
    pub fn with_gas_provider(mut self, gas_provider: Arc<dyn ContractGasProvider>) -> Self {
        self.gas_provider = gas_provider;
        self
    }

    /// Replaces the type converter registry.
    pub fn with_converters(mut self, converters: Arc<TypeConverters>) -> Self {
        self.executor = AbiCallExecutor::new(Arc::clone(self.executor.api()), AbiArgumentConverter::new(converters));
        self
    }

    /// The shared call executor.
    pub fn executor(&self) -> &AbiCallExecutor {
        &self.executor
    }
}

#[async_trait]
impl ChainHandler<Ethereum> for EthereumHandler {
    fn special_methods(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_METHOD]
    }

    async fn special(
        &self,
        name: &str,
        binding: Arc<ContractBinding<Ethereum>>,
        method: &MethodBinding<Ethereum>,
        args: Vec<Value>,
    ) -> Result<Reply> {
        if name != DEPLOYMENT_METHOD {
            return Err(CallError::invalid_call(format!("Unexpected special method '{}' found!", name)).into());
        }
        let params = transaction_params(self.gas_provider.as_ref(), method, &args);
        self.executor.deploy(&binding, method, args, params).await
    }

    async fn query(
        &self,
        binding: &ContractBinding<Ethereum>,
        method: &MethodBinding<Ethereum>,
        args: Vec<Value>,
    ) -> Result<Reply> {
        self.executor.query(binding, method, args).await
    }

    async fn transact(
        &self,
        binding: &ContractBinding<Ethereum>,
        method: &MethodBinding<Ethereum>,
        args: Vec<Value>,
    ) -> Result<Reply> {
        let params = transaction_params(self.gas_provider.as_ref(), method, &args);
        self.executor.transact(binding, method, args, params).await
    }

    fn subscribe(
        &self,
        binding: Arc<ContractBinding<Ethereum>>,
        event: &EventBinding<Ethereum>,
        args: Vec<Value>,
    ) -> Result<EventSubscription> {
        self.executor.subscribe(binding, event, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::AbiValue;
    use crate::api::EventLogStream;
    use crate::builder::EthereumContractBuilder;
    use chainbind_core::prelude::*;
    use chainbind_core::Error;
    use parking_lot::Mutex;

    const ABI: &str = r#"[
        {"type":"constructor","inputs":[{"name":"greeting","type":"string"}]},
        {"type":"function","name":"setGreeting","inputs":[{"name":"greeting","type":"string"}],"outputs":[]}
    ]"#;

    #[derive(Default)]
    struct RecordingApi {
        deployments: Mutex<Vec<(Deployment, TransactionParams)>>,
        transactions: Mutex<Vec<(FunctionCall, TransactionParams)>>,
    }

    impl EventLogApi for RecordingApi {
        fn event_logs(&self, _request: EventLogRequest) -> std::result::Result<EventLogStream, CallError> {
            Err(CallError::client("no logs"))
        }
    }

    #[async_trait]
    impl Web3ContractApi for RecordingApi {
        async fn call(&self, _call: FunctionCall) -> std::result::Result<Vec<AbiValue>, CallError> {
            Ok(vec![])
        }

        async fn transact(
            &self,
            call: FunctionCall,
            params: TransactionParams,
        ) -> std::result::Result<CallResult<Vec<AbiValue>>, CallError> {
            self.transactions.lock().push((call, params));
            Ok(CallResult::recorded(vec![], "0xblock", "0xtx"))
        }

        async fn deploy(
            &self,
            deployment: Deployment,
            params: TransactionParams,
        ) -> std::result::Result<CallResult<String>, CallError> {
            self.deployments.lock().push((deployment, params));
            Ok(CallResult::recorded("0xc0ffee".to_string(), "0xblock", "0xtx"))
        }
    }

    fn interface() -> ContractInterface {
        ContractInterface::new("Greeter")
            .identifier("greeter")
            .method(MethodSignature::new(
                "deploy",
                vec![
                    ParameterSignature::new("gasLimit", NativeType::Long).special("gasLimit"),
                    ParameterSignature::new("greeting", NativeType::String),
                ],
                ReturnSignature::of(NativeType::String),
            ))
            .method(MethodSignature::new(
                "setGreeting",
                vec![
                    ParameterSignature::new("value", NativeType::BigInteger).special("value"),
                    ParameterSignature::new("greeting", NativeType::String),
                ],
                ReturnSignature::void(),
            ))
    }

    fn binding(binary: Option<&str>, address: Option<&str>) -> Arc<ContractBinding<Ethereum>> {
        let mut builder = EthereumContractBuilder::<Ethereum>::new(interface()).unwrap();
        builder.with_abi(ABI).unwrap();
        if let Some(binary) = binary {
            builder.with_binary(binary);
        }
        if let Some(address) = address {
            builder.at_address(address);
        }
        builder
            .deployment_method("deploy", &[NativeType::Long, NativeType::String])
            .unwrap();
        builder.build().unwrap()
    }

    fn deploy_id() -> MethodId {
        MethodId::new("deploy", &[NativeType::Long, NativeType::String])
    }

    #[tokio::test]
    async fn test_deploy_records_address_once() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = MethodDispatcher::new(EthereumHandler::new(api.clone()), binding(Some("0x6080"), None));

        let reply = dispatcher
            .call(&deploy_id(), vec![Value::Long(500_000), Value::from("hello")])
            .await
            .unwrap();
        assert_eq!(reply, Reply::Value(Value::from("0xc0ffee")));
        assert_eq!(contract_info(dispatcher.binding()).address.get(), Some("0xc0ffee"));
        {
            let deployments = api.deployments.lock();
            let (deployment, params) = &deployments[0];
            assert_eq!(deployment.constructor_arguments, vec![AbiValue::String("hello".to_string())]);
            assert_eq!(params.gas_limit, BigInt::from(500_000));
            assert_eq!(params.gas_price, BigInt::from(StaticGasProvider::GAS_PRICE));
        }

        let err = dispatcher
            .call(&deploy_id(), vec![Value::Null, Value::from("again")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Deployment(DeploymentError::AddressAlreadySet { .. })));
    }

    #[tokio::test]
    async fn test_deploy_requires_binary() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = MethodDispatcher::new(EthereumHandler::new(api), binding(None, None));
        let err = dispatcher
            .call(&deploy_id(), vec![Value::Null, Value::from("hello")])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot deploy contract 'greeter', contract binary is not set in contract info."
        );
    }

    #[tokio::test]
    async fn test_transact_reads_value_and_requires_address() {
        let api = Arc::new(RecordingApi::default());
        let id = MethodId::new("setGreeting", &[NativeType::BigInteger, NativeType::String]);

        let dispatcher = MethodDispatcher::new(EthereumHandler::new(api.clone()), binding(None, None));
        let err = dispatcher
            .call(&id, vec![Value::Null, Value::from("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Contract address is not set in contract info"));

        let dispatcher = MethodDispatcher::new(EthereumHandler::new(api.clone()), binding(None, Some("abc")));
        let reply = dispatcher
            .call(&id, vec![Value::Int(42), Value::from("hi")])
            .await
            .unwrap();
        assert_eq!(reply, Reply::Value(Value::Unit));

        let transactions = api.transactions.lock();
        let (call, params) = &transactions[0];
        assert_eq!(call.contract_address, "0xabc");
        assert_eq!(call.inputs, vec![AbiValue::String("hi".to_string())]);
        assert_eq!(params.value, Some(BigInt::from(42)));
    }
}
