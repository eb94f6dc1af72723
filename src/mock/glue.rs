//! Dispatch glue for doubles.
//!
//! These free functions are what a proxy generator would emit into each
//! forwarded method: wrap the arguments, dispatch, and translate the outcome
//! into the method's return type. Library errors surface as panics on
//! infallible signatures (the misuse site is inside the test); thrown
//! payloads propagate verbatim, either as the `Err` of a `Result` surface or
//! by resuming the unwind with the stored payload.

use std::panic;

use crate::handler::{self, Dispatched};
use crate::invocation::MethodDescriptor;
use crate::mock::defaults::{self, MockDefault};
use crate::mock::MockRef;
use crate::values::{ArgValue, ReturnValue, ThrownValue};
use crate::MockError;

fn extract_or_panic<R: Clone + 'static>(method: MethodDescriptor, value: ReturnValue) -> R {
    match value.extract::<R>() {
        Some(value) => value,
        None => panic::panic_any(MockError::InvalidArgument(format!(
            "the rule serving {} stored a {} but the method returns {}",
            method,
            value.type_name(),
            std::any::type_name::<R>()
        ))),
    }
}

/// Forward a method returning `R`.
pub fn call<R>(mock: &MockRef, method: MethodDescriptor, args: Vec<ArgValue>) -> R
where
    R: MockDefault + Clone + Send + Sync + 'static,
{
    match handler::dispatch(mock, method, args) {
        Ok(Dispatched::Value(value)) => extract_or_panic(method, value),
        Ok(Dispatched::Raised(thrown)) => panic::resume_unwind(thrown.panic_payload()),
        Ok(Dispatched::Unstubbed) | Ok(Dispatched::Zero) => defaults::cached::<R>(),
        Err(err) => panic::panic_any(err),
    }
}

fn raise_or_err<E: Clone + 'static>(thrown: ThrownValue) -> E {
    match thrown.extract::<E>() {
        Some(err) => err,
        // Not the method's error type: propagate verbatim instead.
        None => panic::resume_unwind(thrown.panic_payload()),
    }
}

/// Forward a method returning `Result<R, E>`. A thrown payload of type `E`
/// becomes `Err(e)`; a stubbed `Result` is passed through as stored.
pub fn try_call<R, E>(
    mock: &MockRef,
    method: MethodDescriptor,
    args: Vec<ArgValue>,
) -> Result<R, E>
where
    R: MockDefault + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    match handler::dispatch(mock, method, args) {
        Ok(Dispatched::Value(value)) => {
            if let Some(ok) = value.extract::<R>() {
                Ok(ok)
            } else if let Some(result) = value.extract::<Result<R, E>>() {
                result
            } else {
                panic::panic_any(MockError::InvalidArgument(format!(
                    "the rule serving {} stored a {} but the method returns Result<{}, {}>",
                    method,
                    value.type_name(),
                    std::any::type_name::<R>(),
                    std::any::type_name::<E>()
                )))
            }
        }
        Ok(Dispatched::Raised(thrown)) => Err(raise_or_err(thrown)),
        Ok(Dispatched::Unstubbed) | Ok(Dispatched::Zero) => Ok(defaults::cached::<R>()),
        Err(err) => panic::panic_any(err),
    }
}

/// Forward a spy method returning `R`: unstubbed calls run the real
/// subject. During capture the subject is *not* invoked; the zero value
/// keeps the capture side-effect free.
pub fn spy_call<R>(
    mock: &MockRef,
    method: MethodDescriptor,
    args: Vec<ArgValue>,
    delegate: impl FnOnce() -> R,
) -> R
where
    R: MockDefault + Clone + Send + Sync + 'static,
{
    match handler::dispatch(mock, method, args) {
        Ok(Dispatched::Value(value)) => extract_or_panic(method, value),
        Ok(Dispatched::Raised(thrown)) => panic::resume_unwind(thrown.panic_payload()),
        Ok(Dispatched::Unstubbed) => delegate(),
        Ok(Dispatched::Zero) => defaults::cached::<R>(),
        Err(err) => panic::panic_any(err),
    }
}

/// Forward a spy method returning `Result<R, E>`.
pub fn spy_try_call<R, E>(
    mock: &MockRef,
    method: MethodDescriptor,
    args: Vec<ArgValue>,
    delegate: impl FnOnce() -> Result<R, E>,
) -> Result<R, E>
where
    R: MockDefault + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    match handler::dispatch(mock, method, args) {
        Ok(Dispatched::Value(value)) => {
            if let Some(ok) = value.extract::<R>() {
                Ok(ok)
            } else if let Some(result) = value.extract::<Result<R, E>>() {
                result
            } else {
                panic::panic_any(MockError::InvalidArgument(format!(
                    "the rule serving {} stored a {} but the method returns Result<{}, {}>",
                    method,
                    value.type_name(),
                    std::any::type_name::<R>(),
                    std::any::type_name::<E>()
                )))
            }
        }
        Ok(Dispatched::Raised(thrown)) => Err(raise_or_err(thrown)),
        Ok(Dispatched::Unstubbed) => delegate(),
        Ok(Dispatched::Zero) => Ok(defaults::cached::<R>()),
        Err(err) => panic::panic_any(err),
    }
}
