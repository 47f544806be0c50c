//! Execution of dispatched calls on Quorum.

use crate::metadata::Quorum;
use async_trait::async_trait;
use chainbind_core::dispatch::{special_argument, string_collection_argument};
use chainbind_core::{
    CallError, ChainHandler, ContractBinding, EventBinding, EventSubscription, MethodBinding, Reply, Result,
    TypeConverters, Value,
};
use chainbind_ethereum::api::{ContractGasProvider, StaticGasProvider, TransactionParams, Web3ContractApi};
use chainbind_ethereum::handler::transaction_params;
use chainbind_ethereum::special::DEPLOYMENT_METHOD;
use chainbind_ethereum::{AbiArgumentConverter, AbiCallExecutor};
use num_bigint::BigInt;
use num_traits::Zero;
use std::sync::Arc;
use tracing::debug;

/// Special argument naming the recipients of a private transaction.
pub const PRIVATE_FOR: &str = "privateFor";

/// [`ChainHandler`] for Quorum.
///
/// Transactions are sent with a zero gas price. Recipients come from the
/// `privateFor` argument, else from the contract's default list; without
/// either the transaction is public.
pub struct QuorumHandler {
    executor: AbiCallExecutor,
    gas_provider: Arc<dyn ContractGasProvider>,
}

impl QuorumHandler {
    /// Creates a handler with the default gas limit and an empty converter registry.
    pub fn new(api: Arc<dyn Web3ContractApi>) -> Self {
        Self {
            executor: AbiCallExecutor::new(api, AbiArgumentConverter::default()),
            gas_provider: Arc::new(StaticGasProvider::default()),
        }
    }

    /// Replaces the gas provider; only its gas limits are used.
    pub fn with_gas_provider(mut self, gas_provider: Arc<dyn ContractGasProvider>) -> Self {
        self.gas_provider = gas_provider;
        self
    }

    /// Replaces the type converter registry.
    pub fn with_converters(mut self, converters: Arc<TypeConverters>) -> Self {
        self.executor = AbiCallExecutor::new(Arc::clone(self.executor.api()), AbiArgumentConverter::new(converters));
        self
    }

    fn transaction_params(
        &self,
        binding: &ContractBinding<Quorum>,
        method: &MethodBinding<Quorum>,
        args: &[Value],
    ) -> TransactionParams {
        let private_for = string_collection_argument(special_argument(method, args, PRIVATE_FOR)).or_else(|| {
            let defaults = &binding.chain().private_for;
            (!defaults.is_empty()).then(|| defaults.clone())
        });
        debug!(
            "Transaction '{}' is {}",
            method.contract_method_name(),
            if private_for.is_some() { "private" } else { "public" }
        );
        TransactionParams {
            gas_price: BigInt::zero(),
            private_for,
            ..transaction_params(self.gas_provider.as_ref(), method, args)
        }
    }
}

#[async_trait]
impl ChainHandler<Quorum> for QuorumHandler {
    fn special_methods(&self) -> &'static [&'static str] {
        &[DEPLOYMENT_METHOD]
    }

    async fn special(
        &self,
        name: &str,
        binding: Arc<ContractBinding<Quorum>>,
        method: &MethodBinding<Quorum>,
        args: Vec<Value>,
    ) -> Result<Reply> {
        if name != DEPLOYMENT_METHOD {
            return Err(CallError::invalid_call(format!("Unexpected special method '{}' found!", name)).into());
        }
        let params = self.transaction_params(&binding, method, &args);
        self.executor.deploy(&binding, method, args, params).await
    }

    async fn query(
        &self,
        binding: &ContractBinding<Quorum>,
        method: &MethodBinding<Quorum>,
        args: Vec<Value>,
    ) -> Result<Reply> {
        self.executor.query(binding, method, args).await
    }

    async fn transact(
        &self,
        binding: &ContractBinding<Quorum>,
        method: &MethodBinding<Quorum>,
        args: Vec<Value>,
    ) -> Result<Reply> {
        let params = self.transaction_params(binding, method, &args);
        self.executor.transact(binding, method, args, params).await
    }

    fn subscribe(
        &self,
        binding: Arc<ContractBinding<Quorum>>,
        event: &EventBinding<Quorum>,
        args: Vec<Value>,
    ) -> Result<EventSubscription> {
        self.executor.subscribe(binding, event, args)
    }
}
