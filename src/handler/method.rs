//! Adapters from typed Rust functions to type-erased handlers.
//!
//! Async bodies implement [`AsyncMethod`], blocking bodies [`SyncMethod`].
//! Both are implemented for closures of up to eight [`WireType`] arguments
//! returning `anyhow::Result<R>` where `R: WireType`.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ConvertError;
use crate::value::{TypeRef, Value, WireType};

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of running a bound method.
pub type InvokeResult = Result<Value, InvokeError>;

/// Failure while running a method body.
#[derive(Debug)]
pub enum InvokeError {
    /// The method body returned an error.
    Failed(anyhow::Error),
    /// The returned value could not be turned into a wire value.
    Unserializable(ConvertError),
}

/// A converted argument could not be materialized as the parameter type.
#[derive(Debug, thiserror::Error)]
#[error("argument {index}: {source}")]
pub struct BindError {
    /// Zero-based parameter position.
    pub index: usize,
    #[source]
    pub source: ConvertError,
}

/// Type-erased method body.
pub trait Handler: Send + Sync + 'static {
    /// Bind converted arguments and return the invocation future.
    ///
    /// Binding happens before the future is polled so argument failures can be
    /// told apart from failures of the method itself.
    fn bind(&self, arguments: Vec<Value>) -> Result<BoxFuture<'static, InvokeResult>, BindError>;
}

/// An async function usable as a method body.
pub trait AsyncMethod<Args>: Send + Sync + Sized + 'static {
    /// Declared parameter types, in order.
    fn parameter_types() -> Vec<TypeRef>;

    fn return_type() -> TypeRef;

    fn into_handler(self) -> Arc<dyn Handler>;
}

/// A blocking function usable as a method body.
///
/// Bodies run on tokio's blocking thread pool, so they may block without
/// stalling other exchanges.
pub trait SyncMethod<Args>: Send + Sync + Sized + 'static {
    /// Declared parameter types, in order.
    fn parameter_types() -> Vec<TypeRef>;

    fn return_type() -> TypeRef;

    fn into_handler(self) -> Arc<dyn Handler>;
}

/// Handler wrapping an async function.
pub struct AsyncFn<F, Args, R> {
    f: Arc<F>,
    _marker: PhantomData<fn(Args) -> R>,
}

/// Handler wrapping a blocking function.
pub struct SyncFn<F, Args, R> {
    f: Arc<F>,
    _marker: PhantomData<fn(Args) -> R>,
}

fn check_arity(actual: usize, expected: usize) -> Result<(), BindError> {
    if actual != expected {
        return Err(BindError {
            index: actual.min(expected),
            source: ConvertError::Arity { expected, actual },
        });
    }
    Ok(())
}

fn next_argument<T: WireType>(
    arguments: &mut impl Iterator<Item = (usize, Value)>,
) -> Result<T, BindError> {
    let Some((index, value)) = arguments.next() else {
        return Err(BindError {
            index: 0,
            source: ConvertError::Arity {
                expected: 1,
                actual: 0,
            },
        });
    };
    T::from_value(value).map_err(|source| BindError { index, source })
}

/// Run a blocking body on tokio's blocking pool. A panic in the body is
/// resumed on the awaiting task.
async fn run_blocking<R, F>(body: F) -> Result<R, InvokeError>
where
    F: FnOnce() -> anyhow::Result<R> + Send + 'static,
    R: Send + 'static,
{
    match tokio::task::spawn_blocking(body).await {
        Ok(result) => result.map_err(InvokeError::Failed),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(InvokeError::Failed(anyhow::Error::new(e))),
    }
}

macro_rules! one {
    ($arg:ident) => {
        1
    };
}

macro_rules! impl_methods {
    ($($arg:ident),*) => {
        impl<F, Fut, R, $($arg,)*> AsyncMethod<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
            R: WireType,
            $($arg: WireType,)*
        {
            fn parameter_types() -> Vec<TypeRef> {
                vec![$($arg::type_ref()),*]
            }

            fn return_type() -> TypeRef {
                R::type_ref()
            }

            fn into_handler(self) -> Arc<dyn Handler> {
                Arc::new(AsyncFn::<F, ($($arg,)*), R> {
                    f: Arc::new(self),
                    _marker: PhantomData,
                })
            }
        }

        impl<F, Fut, R, $($arg,)*> Handler for AsyncFn<F, ($($arg,)*), R>
        where
            F: Fn($($arg),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
            R: WireType,
            $($arg: WireType,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn bind(&self, arguments: Vec<Value>) -> Result<BoxFuture<'static, InvokeResult>, BindError> {
                check_arity(arguments.len(), 0 $(+ one!($arg))*)?;
                let mut arguments = arguments.into_iter().enumerate();
                $(let $arg = next_argument::<$arg>(&mut arguments)?;)*

                let f = Arc::clone(&self.f);
                Ok(Box::pin(async move {
                    let result = (*f)($($arg),*).await.map_err(InvokeError::Failed)?;
                    result.into_value().map_err(InvokeError::Unserializable)
                }))
            }
        }

        impl<F, R, $($arg,)*> SyncMethod<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> anyhow::Result<R> + Send + Sync + 'static,
            R: WireType,
            $($arg: WireType,)*
        {
            fn parameter_types() -> Vec<TypeRef> {
                vec![$($arg::type_ref()),*]
            }

            fn return_type() -> TypeRef {
                R::type_ref()
            }

            fn into_handler(self) -> Arc<dyn Handler> {
                Arc::new(SyncFn::<F, ($($arg,)*), R> {
                    f: Arc::new(self),
                    _marker: PhantomData,
                })
            }
        }

        impl<F, R, $($arg,)*> Handler for SyncFn<F, ($($arg,)*), R>
        where
            F: Fn($($arg),*) -> anyhow::Result<R> + Send + Sync + 'static,
            R: WireType,
            $($arg: WireType,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn bind(&self, arguments: Vec<Value>) -> Result<BoxFuture<'static, InvokeResult>, BindError> {
                check_arity(arguments.len(), 0 $(+ one!($arg))*)?;
                let mut arguments = arguments.into_iter().enumerate();
                $(let $arg = next_argument::<$arg>(&mut arguments)?;)*

                let f = Arc::clone(&self.f);
                Ok(Box::pin(async move {
                    let result = run_blocking(move || (*f)($($arg),*)).await?;
                    result.into_value().map_err(InvokeError::Unserializable)
                }))
            }
        }
    };
}

impl_methods!();
impl_methods!(A1);
impl_methods!(A1, A2);
impl_methods!(A1, A2, A3);
impl_methods!(A1, A2, A3, A4);
impl_methods!(A1, A2, A3, A4, A5);
impl_methods!(A1, A2, A3, A4, A5, A6);
impl_methods!(A1, A2, A3, A4, A5, A6, A7);
impl_methods!(A1, A2, A3, A4, A5, A6, A7, A8);
