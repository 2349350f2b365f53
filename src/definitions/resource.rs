use crate::{DynSvc, InjectError, InjectResult, Service, Svc};
use async_trait::async_trait;
use futures::future::BoxFuture;

/// A resource with an asynchronous lifecycle.
///
/// Scoped resources are produced by factories registered with
/// [`scoped`](crate::scoped). When the owning scope is resolved, the
/// resource is entered to produce its target service; when the scope
/// closes, the resource is exited in reverse construction order. If the
/// scope is closing because of an error, that error is passed to
/// [`exit`](ScopedResource::exit).
///
/// ## Example
///
/// ```
/// use scoped_injector::{InjectError, InjectResult, ScopedResource};
///
/// struct Connection;
///
/// struct ConnectionResource {
///     url: String,
/// }
///
/// #[scoped_injector::async_trait]
/// impl ScopedResource for ConnectionResource {
///     type Target = Connection;
///
///     async fn enter(&mut self) -> InjectResult<Connection> {
///         // open the connection
///         Ok(Connection)
///     }
///
///     async fn exit(
///         &mut self,
///         _error: Option<&InjectError>,
///     ) -> InjectResult<()> {
///         // close the connection
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ScopedResource: Send + 'static {
    /// The service produced when this resource is entered.
    type Target: Service;

    /// Acquires the resource, producing the service instance.
    async fn enter(&mut self) -> InjectResult<Self::Target>;

    /// Releases the resource. `error` is the error the scope is closing
    /// with, if any.
    async fn exit(&mut self, error: Option<&InjectError>) -> InjectResult<()>;
}

/// A [`ScopedResource`] wrapping a plain value. Entering yields the value
/// and exiting does nothing.
pub struct ValueResource<T: Service>(Option<T>);

impl<T: Service> ValueResource<T> {
    /// Wraps a value in a no-op resource.
    #[must_use]
    pub fn new(value: T) -> Self {
        ValueResource(Some(value))
    }
}

#[async_trait]
impl<T: Service> ScopedResource for ValueResource<T> {
    type Target = T;

    async fn enter(&mut self) -> InjectResult<T> {
        self.0.take().ok_or_else(|| {
            InjectError::InternalError(format!(
                "value resource for {} was entered twice",
                std::any::type_name::<T>()
            ))
        })
    }

    async fn exit(&mut self, _error: Option<&InjectError>) -> InjectResult<()> {
        Ok(())
    }
}

/// A type-erased, entered-at-most-once view of a scoped resource. Resolution
/// stores one handle per constructed component so that teardown can exit it
/// later without knowing the target type.
#[async_trait]
pub trait ResourceHandle: Send {
    /// Acquires the resource, producing the erased service instance.
    async fn enter(&mut self) -> InjectResult<DynSvc>;

    /// Releases the resource.
    async fn exit(&mut self, error: Option<&InjectError>) -> InjectResult<()>;
}

/// Adapts a [`ScopedResource`] into an erased [`ResourceHandle`]. The erased
/// instance is stored double-wrapped (`Svc<Svc<Target>>`) so that retrieval
/// can downcast to `Svc<Target>` uniformly for sized and unsized targets.
pub(crate) struct TypedHandle<S: ScopedResource> {
    resource: S,
    entered: bool,
}

impl<S: ScopedResource> TypedHandle<S> {
    pub(crate) fn new(resource: S) -> Self {
        TypedHandle {
            resource,
            entered: false,
        }
    }
}

#[async_trait]
impl<S: ScopedResource> ResourceHandle for TypedHandle<S> {
    async fn enter(&mut self) -> InjectResult<DynSvc> {
        if self.entered {
            return Err(InjectError::InternalError(format!(
                "resource for {} was entered twice",
                std::any::type_name::<S::Target>()
            )));
        }

        self.entered = true;
        let target = self.resource.enter().await?;
        Ok(Svc::new(Svc::new(target)) as DynSvc)
    }

    async fn exit(&mut self, error: Option<&InjectError>) -> InjectResult<()> {
        self.resource.exit(error).await
    }
}

/// A [`ResourceHandle`] over a not-yet-awaited future, used by
/// [`async_factory`](crate::async_factory). Entering awaits the future and
/// exiting does nothing.
pub(crate) struct FutureHandle<R: Service> {
    future: Option<BoxFuture<'static, R>>,
}

impl<R: Service> FutureHandle<R> {
    pub(crate) fn new(future: BoxFuture<'static, R>) -> Self {
        FutureHandle {
            future: Some(future),
        }
    }
}

#[async_trait]
impl<R: Service> ResourceHandle for FutureHandle<R> {
    async fn enter(&mut self) -> InjectResult<DynSvc> {
        let future = self.future.take().ok_or_else(|| {
            InjectError::InternalError(format!(
                "async factory for {} was entered twice",
                std::any::type_name::<R>()
            ))
        })?;

        let target = future.await;
        Ok(Svc::new(Svc::new(target)) as DynSvc)
    }

    async fn exit(&mut self, _error: Option<&InjectError>) -> InjectResult<()> {
        Ok(())
    }
}
