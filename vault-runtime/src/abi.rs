//! Encoding of loosely typed arguments against artifact ABIs.
//!
//! Parameter types always come from the compiled artifact, so a script never
//! hard-codes a constructor or initializer signature.

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, Param};
use alloy::primitives::{Bytes, U256};

use crate::artifacts::Artifact;
use crate::descriptor::{ArgValue, ReferenceResolver};
use crate::error::DeployError;

/// Coerce one argument to the declared parameter type, resolving references.
pub fn coerce(
    arg: &ArgValue,
    ty: &DynSolType,
    resolver: &dyn ReferenceResolver,
    required_by: &str,
) -> Result<DynSolValue, DeployError> {
    let value = match (arg, ty) {
        (ArgValue::Ref(name), DynSolType::Address) => {
            DynSolValue::Address(resolver.resolve_address(name, required_by)?)
        }
        (ArgValue::Address(addr), DynSolType::Address) => DynSolValue::Address(*addr),
        (ArgValue::Uint(v), DynSolType::Uint(bits)) => {
            if v.bit_len() > *bits {
                return Err(DeployError::AbiError(format!(
                    "{required_by}: value {v} does not fit in uint{bits}"
                )));
            }
            DynSolValue::Uint(*v, *bits)
        }
        (ArgValue::Bool(b), DynSolType::Bool) => DynSolValue::Bool(*b),
        (ArgValue::Str(s), DynSolType::String) => DynSolValue::String(s.clone()),
        (ArgValue::Bytes(b), DynSolType::Bytes) => DynSolValue::Bytes(b.to_vec()),
        (ArgValue::Array(items), DynSolType::Array(inner)) => DynSolValue::Array(
            items
                .iter()
                .map(|item| coerce(item, inner, resolver, required_by))
                .collect::<Result<_, _>>()?,
        ),
        (ArgValue::Array(items), DynSolType::FixedArray(inner, len)) if items.len() == *len => {
            DynSolValue::FixedArray(
                items
                    .iter()
                    .map(|item| coerce(item, inner, resolver, required_by))
                    .collect::<Result<_, _>>()?,
            )
        }
        (arg, ty) => {
            return Err(DeployError::AbiError(format!(
                "{required_by}: cannot pass {arg:?} as {}",
                ty.sol_type_name()
            )));
        }
    };
    Ok(value)
}

fn coerce_params(
    params: &[Param],
    args: &[ArgValue],
    resolver: &dyn ReferenceResolver,
    required_by: &str,
) -> Result<Vec<DynSolValue>, DeployError> {
    if params.len() != args.len() {
        return Err(DeployError::AbiError(format!(
            "{required_by}: expected {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param.resolve().map_err(|e| {
                DeployError::AbiError(format!("{required_by}: bad parameter type {}: {e}", param.ty))
            })?;
            coerce(arg, &ty, resolver, required_by)
        })
        .collect()
}

/// Pick the overload of `method` taking `arity` arguments.
pub fn select_function<'a>(
    artifact: &'a Artifact,
    method: &str,
    arity: usize,
) -> Result<&'a Function, DeployError> {
    let overloads = artifact.abi.function(method).ok_or_else(|| {
        DeployError::AbiError(format!("{} has no function '{method}'", artifact.name))
    })?;
    overloads
        .iter()
        .find(|f| f.inputs.len() == arity)
        .ok_or_else(|| {
            DeployError::AbiError(format!(
                "{}.{method} has no overload taking {arity} arguments",
                artifact.name
            ))
        })
}

/// Selector-prefixed calldata for `method(args)`.
pub fn encode_call(
    artifact: &Artifact,
    method: &str,
    args: &[ArgValue],
    resolver: &dyn ReferenceResolver,
    required_by: &str,
) -> Result<Bytes, DeployError> {
    let function = select_function(artifact, method, args.len())?;
    let values = coerce_params(&function.inputs, args, resolver, required_by)?;
    let data = function
        .abi_encode_input(&values)
        .map_err(|e| DeployError::AbiError(format!("{required_by}: {e}")))?;
    Ok(Bytes::from(data))
}

/// Creation bytecode followed by the ABI-encoded constructor arguments.
pub fn encode_deployment(
    artifact: &Artifact,
    args: &[ArgValue],
    resolver: &dyn ReferenceResolver,
    required_by: &str,
) -> Result<Bytes, DeployError> {
    if !artifact.is_deployable() {
        return Err(DeployError::ArtifactError(format!(
            "{} has no creation bytecode",
            artifact.name
        )));
    }

    let mut init_code = artifact.bytecode.to_vec();
    match &artifact.abi.constructor {
        Some(constructor) => {
            let values = coerce_params(&constructor.inputs, args, resolver, required_by)?;
            let encoded = constructor
                .abi_encode_input(&values)
                .map_err(|e| DeployError::AbiError(format!("{required_by}: {e}")))?;
            init_code.extend_from_slice(&encoded);
        }
        None if args.is_empty() => {}
        None => {
            return Err(DeployError::AbiError(format!(
                "{required_by}: {} has no constructor but {} arguments were given",
                artifact.name,
                args.len()
            )));
        }
    }
    Ok(Bytes::from(init_code))
}

/// Decode the return data of `method` called with `arity` arguments.
pub fn decode_output(
    artifact: &Artifact,
    method: &str,
    arity: usize,
    data: &[u8],
) -> Result<Vec<DynSolValue>, DeployError> {
    let function = select_function(artifact, method, arity)?;
    function
        .abi_decode_output(data)
        .map_err(|e| DeployError::AbiError(format!("{}.{method} output: {e}", artifact.name)))
}

/// The first return value as an unsigned integer.
pub fn first_uint(values: &[DynSolValue]) -> Result<U256, DeployError> {
    values
        .first()
        .and_then(DynSolValue::as_uint)
        .map(|(value, _)| value)
        .ok_or_else(|| DeployError::AbiError(format!("expected a uint return value, got {values:?}")))
}
