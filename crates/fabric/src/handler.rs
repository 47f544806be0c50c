//! Execution of dispatched calls on a Fabric channel.

use crate::api::{FabricContractApi, ProposalOptions};
use crate::converter::FabricArgumentConverter;
use crate::metadata::{contract_info, Fabric};
use crate::special::{INSTALL_METHOD, INSTANTIATE_METHOD, TARGET_PEERS, USER};
use crate::user::FabricUser;
use async_trait::async_trait;
use chainbind_core::dispatch::{contract_arguments, special_argument, string_collection_argument};
use chainbind_core::result::unrecorded_reply;
use chainbind_core::{
    CallError, CallResult, ChainHandler, ContractBinding, EventBinding, EventSubscription, MethodBinding, Reply,
    Result, TypeConverters, Value,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Peers a call is sent to.
///
/// Peers named by the `targetPeers` argument win over the contract's default
/// peers; `None` means every peer of the channel.
pub fn target_peers(
    binding: &ContractBinding<Fabric>,
    method: &MethodBinding<Fabric>,
    args: &[Value],
) -> std::result::Result<Option<Vec<String>>, CallError> {
    let requested = match special_argument(method, args, TARGET_PEERS) {
        Some(value) => string_collection_argument(Some(value)).ok_or_else(|| {
            CallError::invalid_call(format!(
                "Unexpected type of additional field '{}', expected a collection of peer names, got '{}'",
                TARGET_PEERS,
                value.native_type()
            ))
        })?,
        None => Vec::new(),
    };
    let peers = if requested.is_empty() {
        contract_info(binding).target_peers.clone()
    } else {
        requested
    };
    Ok((!peers.is_empty()).then_some(peers))
}

fn proposal_options(
    binding: &ContractBinding<Fabric>,
    method: &MethodBinding<Fabric>,
    args: &[Value],
) -> std::result::Result<ProposalOptions, CallError> {
    Ok(ProposalOptions {
        target_peers: target_peers(binding, method, args)?,
        user: FabricUser::from_argument(special_argument(method, args, USER))?,
    })
}

/// [`ChainHandler`] for Hyperledger Fabric.
#[derive(Clone)]
pub struct FabricHandler {
    api: Arc<dyn FabricContractApi>,
    converter: FabricArgumentConverter,
}

impl FabricHandler {
    /// Creates a handler with the default string converters.
    pub fn new(api: Arc<dyn FabricContractApi>) -> Self {
        Self {
            api,
            converter: FabricArgumentConverter::default(),
        }
    }

    /// Replaces the type converter registry.
    pub fn with_converters(mut self, converters: Arc<TypeConverters>) -> Self {
        self.converter = FabricArgumentConverter::new(converters);
        self
    }

    /// The contract API.
    pub fn api(&self) -> &Arc<dyn FabricContractApi> {
        &self.api
    }

    /// The argument converter.
    pub fn converter(&self) -> &FabricArgumentConverter {
        &self.converter
    }
}

#[async_trait]
impl ChainHandler<Fabric> for FabricHandler {
    fn special_methods(&self) -> &'static [&'static str] {
        &[INSTALL_METHOD, INSTANTIATE_METHOD]
    }

    async fn special(
        &self,
        name: &str,
        binding: Arc<ContractBinding<Fabric>>,
        method: &MethodBinding<Fabric>,
        args: Vec<Value>,
    ) -> Result<Reply> {
        let contract = contract_info(&binding);
        let options = proposal_options(&binding, method, &args)?;
        match name {
            INSTALL_METHOD => {
                info!("Preparing to install chaincode '{}'", contract.chaincode_id);
                self.api.install(contract, options).await?;
            }
            INSTANTIATE_METHOD => {
                let arguments = self
                    .converter
                    .convert_arguments(method.contract_parameters(), contract_arguments(method, args))?;
                info!("Preparing to instantiate chaincode '{}'", contract.chaincode_id);
                self.api.instantiate(contract, arguments, options).await?;
            }
            other => {
                return Err(CallError::invalid_call(format!("Unexpected special method '{}' found!", other)).into());
            }
        }
        Ok(unrecorded_reply(Value::Unit, method.uses_result_wrapper()))
    }

    async fn query(
        &self,
        binding: &ContractBinding<Fabric>,
        method: &MethodBinding<Fabric>,
        args: Vec<Value>,
    ) -> Result<Reply> {
        let options = proposal_options(binding, method, &args)?;
        let arguments = self
            .converter
            .convert_arguments(method.contract_parameters(), contract_arguments(method, args))?;
        let function = method.contract_method_name();
        debug!("Querying chaincode function '{}'", function);
        let payload = self
            .api
            .query(contract_info(binding), function, arguments, options)
            .await?;
        let value = self.converter.convert_method_result(method, payload)?;
        Ok(unrecorded_reply(value, method.uses_result_wrapper()))
    }

    async fn transact(
        &self,
        binding: &ContractBinding<Fabric>,
        method: &MethodBinding<Fabric>,
        args: Vec<Value>,
    ) -> Result<Reply> {
        let options = proposal_options(binding, method, &args)?;
        let arguments = self
            .converter
            .convert_arguments(method.contract_parameters(), contract_arguments(method, args))?;
        let contract = contract_info(binding);
        let function = method.contract_method_name();
        let result = self
            .api
            .invoke(contract, function, arguments, options)
            .await
            .map_err(|e| {
                error!(
                    "Failed to invoke function '{}' of chaincode '{}': {}",
                    function, contract.chaincode_id, e
                );
                e
            })?;
        let result = result.try_map(|payload| self.converter.convert_method_result(method, payload))?;
        Ok(Reply::new(result, method.uses_result_wrapper()))
    }

    fn subscribe(
        &self,
        binding: Arc<ContractBinding<Fabric>>,
        event: &EventBinding<Fabric>,
        _args: Vec<Value>,
    ) -> Result<EventSubscription> {
        let api = Arc::clone(&self.api);
        let converter = self.converter.clone();
        let event = event.clone();

        Ok(EventSubscription::new(event.event_name().to_string(), move || {
            debug!(
                "Subscribing to chaincode event '{}' of '{}'",
                event.event_name(),
                contract_info(&binding).chaincode_id
            );
            let events = api.chaincode_events(contract_info(&binding), event.event_name())?;
            let converter = converter.clone();
            let event = event.clone();
            Ok(events
                .map(move |item| -> Result<Reply> {
                    let item = item?;
                    let data = converter.create_event_object(&event, item.payload)?;
                    let result = CallResult {
                        data,
                        block_hash: item.block_hash,
                        transaction_hash: Some(item.transaction_id),
                    };
                    Ok(Reply::new(result, event.uses_event_wrapper()))
                })
                .boxed())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChaincodeEventStream;
    use crate::builder::FabricContractBuilder;
    use crate::metadata::{ChaincodeId, FabricContract};
    use chainbind_core::prelude::*;
    use chainbind_core::{DeploymentError, Error, MethodDispatcher, MethodId};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingApi {
        calls: Mutex<Vec<(String, Vec<String>, ProposalOptions)>>,
    }

    #[async_trait]
    impl FabricContractApi for RecordingApi {
        fn chaincode_events(
            &self,
            _contract: &FabricContract,
            _event_name: &str,
        ) -> std::result::Result<ChaincodeEventStream, CallError> {
            Err(CallError::client("no events"))
        }

        async fn install(
            &self,
            _contract: &FabricContract,
            options: ProposalOptions,
        ) -> std::result::Result<(), DeploymentError> {
            self.calls.lock().push(("install".to_string(), vec![], options));
            Ok(())
        }

        async fn instantiate(
            &self,
            _contract: &FabricContract,
            arguments: Vec<String>,
            options: ProposalOptions,
        ) -> std::result::Result<(), DeploymentError> {
            self.calls.lock().push(("init".to_string(), arguments, options));
            Ok(())
        }

        async fn invoke(
            &self,
            _contract: &FabricContract,
            function: &str,
            arguments: Vec<String>,
            options: ProposalOptions,
        ) -> std::result::Result<CallResult<String>, CallError> {
            self.calls.lock().push((function.to_string(), arguments, options));
            Ok(CallResult::recorded("true".to_string(), "block-1", "tx-1"))
        }

        async fn query(
            &self,
            _contract: &FabricContract,
            function: &str,
            arguments: Vec<String>,
            options: ProposalOptions,
        ) -> std::result::Result<String, CallError> {
            self.calls.lock().push((function.to_string(), arguments, options));
            Ok("42".to_string())
        }
    }

    fn ledger() -> ContractInterface {
        ContractInterface::new("Ledger")
            .method(MethodSignature::new(
                "instantiate",
                vec![
                    ParameterSignature::new("peers", NativeType::list(NativeType::String)).special("targetPeers"),
                    ParameterSignature::new("supply", NativeType::Long),
                ],
                ReturnSignature::void(),
            ))
            .method(MethodSignature::new(
                "balance",
                vec![ParameterSignature::new("account", NativeType::String)],
                ReturnSignature::of(NativeType::Long),
            ))
            .method(MethodSignature::new(
                "mint",
                vec![
                    ParameterSignature::new("peers", NativeType::named("Peers")).special("targetPeers"),
                    ParameterSignature::new("amount", NativeType::Int),
                ],
                ReturnSignature::of(NativeType::Bool).wrapped(),
            ))
    }

    fn dispatcher(api: Arc<RecordingApi>) -> MethodDispatcher<Fabric, FabricHandler> {
        let mut builder = FabricContractBuilder::new(ledger()).unwrap();
        builder
            .chaincode_id(ChaincodeId::new("ledger", "1"))
            .endorsement_policy("identities: []")
            .target_peers(["peer0"]);
        builder
            .instantiate_method("instantiate", &[NativeType::list(NativeType::String), NativeType::Long])
            .unwrap();
        builder.method("balance", &[NativeType::String]).unwrap().read_only(true);
        builder
            .method("mint", &[NativeType::named("Peers"), NativeType::Int])
            .unwrap();
        MethodDispatcher::new(FabricHandler::new(api), builder.build().unwrap())
    }

    #[tokio::test]
    async fn test_instantiate_converts_init_arguments() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = dispatcher(Arc::clone(&api));
        let id = MethodId::new("instantiate", &[NativeType::list(NativeType::String), NativeType::Long]);
        let peers = Value::List(vec![Value::from("peer1")]);

        let reply = dispatcher.call(&id, vec![peers, Value::Long(1000)]).await.unwrap();
        assert_eq!(reply.value(), &Value::Unit);

        let calls = api.calls.lock();
        assert_eq!(calls[0].0, "init");
        assert_eq!(calls[0].1, vec!["1000".to_string()]);
        assert_eq!(calls[0].2.target_peers, Some(vec!["peer1".to_string()]));
    }

    #[tokio::test]
    async fn test_query_falls_back_to_contract_peers() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = dispatcher(Arc::clone(&api));

        let reply = dispatcher
            .call(&MethodId::new("balance", &[NativeType::String]), vec![Value::from("alice")])
            .await
            .unwrap();
        assert_eq!(reply.value(), &Value::Long(42));

        let calls = api.calls.lock();
        assert_eq!(calls[0].0, "balance");
        assert_eq!(calls[0].2.target_peers, Some(vec!["peer0".to_string()]));
        assert_eq!(calls[0].2.user, None);
    }

    #[tokio::test]
    async fn test_transact_returns_recorded_result() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = dispatcher(Arc::clone(&api));
        let id = MethodId::new("mint", &[NativeType::named("Peers"), NativeType::Int]);

        let reply = dispatcher.call(&id, vec![Value::Null, Value::Int(5)]).await.unwrap();
        let result = reply.into_wrapped().unwrap();
        assert_eq!(result.data, Value::Bool(true));
        assert_eq!(result.block_hash.as_deref(), Some("block-1"));
        assert_eq!(result.transaction_hash.as_deref(), Some("tx-1"));
        assert_eq!(api.calls.lock()[0].1, vec!["5".to_string()]);

        let err = dispatcher
            .call(&id, vec![Value::Int(3), Value::Int(5)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Call(CallError::InvalidCall { .. })));
        assert!(err.to_string().contains("Unexpected type of additional field 'targetPeers'"));
    }
}
