use super::{ChainSchema, MethodOutline, ParameterOutline};
use crate::error::BuildError;
use crate::ids::ParameterId;
use crate::interface::{MethodSignature, ParameterSignature};
use crate::metadata::{Chain, MethodBinding, ParameterBinding};
use crate::types::NativeType;

/// Overrides for a single method parameter.
#[derive(Debug, Clone)]
pub struct ParameterBindingBuilder {
    index: usize,
    signature: ParameterSignature,
    converter: Option<String>,
    pass_as: Option<NativeType>,
    special_argument: Option<String>,
}

impl ParameterBindingBuilder {
    fn new(index: usize, signature: ParameterSignature) -> Self {
        let config = signature.contract_parameter.clone().unwrap_or_default();
        Self {
            index,
            converter: config.converter,
            pass_as: config.pass_as,
            special_argument: signature.special_argument.clone(),
            signature,
        }
    }

    /// Position within the declared signature.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Declared parameter.
    pub fn signature(&self) -> &ParameterSignature {
        &self.signature
    }

    /// Sets the converter applied to the argument.
    pub fn converter<S: Into<String>>(&mut self, converter: S) -> &mut Self {
        self.converter = Some(converter.into());
        self
    }

    /// Passes the argument as `ty`, converting it through the registry.
    pub fn pass_as(&mut self, ty: NativeType) -> &mut Self {
        self.pass_as = Some(ty);
        self
    }

    /// Tags the parameter as a special argument.
    pub fn special_argument<S: Into<String>>(&mut self, tag: S) -> &mut Self {
        self.special_argument = Some(tag.into());
        self
    }

    fn outline(&self, method: &MethodSignature) -> ParameterOutline {
        ParameterOutline {
            id: ParameterId::new(method.id(), self.index),
            name: self.signature.name.clone(),
            ty: self.signature.ty.clone(),
            converter: self.converter.clone(),
            pass_as: self.pass_as.clone(),
            special_argument: self.special_argument.clone(),
        }
    }
}

/// Builds the [`MethodBinding`] of one declared method.
#[derive(Debug)]
pub struct MethodBindingBuilder<C: Chain> {
    signature: MethodSignature,
    contract_method_name: Option<String>,
    read_only: bool,
    special_method: bool,
    result_converter: Option<String>,
    parameters: Vec<ParameterBindingBuilder>,
    built: Option<MethodBinding<C>>,
}

impl<C: Chain> MethodBindingBuilder<C> {
    pub(crate) fn new(signature: MethodSignature) -> Self {
        let config = signature.contract_method.clone().unwrap_or_default();
        let parameters = signature
            .parameters
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, parameter)| ParameterBindingBuilder::new(index, parameter))
            .collect();
        Self {
            contract_method_name: config.name,
            read_only: config.read_only,
            special_method: config.special_method,
            result_converter: config.converter,
            parameters,
            signature,
            built: None,
        }
    }

    /// Declared method.
    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// Sets the remote method name.
    pub fn name<S: Into<String>>(&mut self, name: S) -> &mut Self {
        self.contract_method_name = Some(name.into());
        self
    }

    /// Issues the method as a query.
    pub fn read_only(&mut self, read_only: bool) -> &mut Self {
        self.read_only = read_only;
        self
    }

    /// Routes the method to a chain specific operation.
    pub fn special_method(&mut self, special_method: bool) -> &mut Self {
        self.special_method = special_method;
        self
    }

    /// Sets the converter applied to results.
    pub fn result_converter<S: Into<String>>(&mut self, converter: S) -> &mut Self {
        self.result_converter = Some(converter.into());
        self
    }

    /// The builder of the parameter at `index`.
    pub fn parameter(&mut self, index: usize) -> Result<&mut ParameterBindingBuilder, BuildError> {
        let count = self.parameters.len();
        let method = self.signature.id();
        self.parameters.get_mut(index).ok_or_else(|| {
            BuildError::invalid_argument(format!(
                "Could not provide builder for parameter at position {} of method '{}', it declares {} parameters",
                index, method, count
            ))
        })
    }

    /// The builder of the parameter named `name`.
    pub fn parameter_named(&mut self, name: &str) -> Result<&mut ParameterBindingBuilder, BuildError> {
        let method = self.signature.id();
        self.parameters
            .iter_mut()
            .find(|p| p.signature.name == name)
            .ok_or_else(|| {
                BuildError::invalid_argument(format!("Could not find parameter '{}' on method '{}'", name, method))
            })
    }

    /// Outline of the method as configured so far.
    pub fn outline(&self) -> MethodOutline {
        MethodOutline {
            id: self.signature.id(),
            contract_method_name: self
                .contract_method_name
                .clone()
                .unwrap_or_else(|| self.signature.name.clone()),
            read_only: self.read_only,
            special_method: self.special_method,
            asynchronous: self.signature.returns.asynchronous,
            result_type: self.signature.returns.ty.clone(),
            wrapped: self.signature.returns.wrapped,
            result_converter: self.result_converter.clone(),
            parameters: self.parameters.iter().map(|p| p.outline(&self.signature)).collect(),
        }
    }

    /// Builds the method binding.
    pub fn build<S>(&mut self, schema: &S) -> Result<&MethodBinding<C>, BuildError>
    where
        S: ChainSchema<C> + ?Sized,
    {
        if self.built.is_some() {
            return Err(BuildError::AlreadyBuilt);
        }
        if self.signature.returns.observable {
            return Err(BuildError::invalid_state(format!(
                "Method '{}' returns an event subscription, bind it as an event",
                self.signature.id()
            )));
        }

        let outline = self.outline();
        let chain = schema.method(&outline)?;
        let parameters = outline
            .parameters
            .iter()
            .map(|p| {
                Ok(ParameterBinding {
                    chain: schema.parameter(&outline, &chain, p)?,
                    id: p.id.clone(),
                    name: p.name.clone(),
                    ty: p.ty.clone(),
                    converter: p.converter.clone(),
                    pass_as: p.pass_as.clone(),
                    special_argument: p.special_argument.clone(),
                })
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        let binding = MethodBinding {
            id: outline.id,
            contract_method_name: outline.contract_method_name,
            read_only: outline.read_only,
            special_method: outline.special_method,
            asynchronous: outline.asynchronous,
            result_type: outline.result_type,
            wrapped: outline.wrapped,
            result_converter: outline.result_converter,
            parameters,
            chain,
        };
        Ok(&*self.built.insert(binding))
    }

    /// Whether [`build`](Self::build) ran.
    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    /// The built method binding.
    pub fn binding(&self) -> Result<&MethodBinding<C>, BuildError> {
        self.built.as_ref().ok_or_else(|| BuildError::not_built("MethodBinding"))
    }
}
