use crate::interface;
use downcast_rs::impl_downcast;
use std::any::{Any, TypeId};

/// A reference-counted pointer holding a service. Services are shared between
/// their dependents, so instances are always handed out behind an
/// [`Arc<T>`](std::sync::Arc).
pub type Svc<T> = std::sync::Arc<T>;

/// A service pointer holding an instance of `dyn Service`.
pub type DynSvc = Svc<dyn Service>;

/// Implemented automatically on types that are capable of being a service.
///
/// Services must be `Send + Sync + 'static` so that instances can be shared
/// across await points and downcast back to their concrete types.
pub trait Service: downcast_rs::DowncastSync {}
impl<T: ?Sized + downcast_rs::DowncastSync> Service for T {}

interface!(Service);

impl_downcast!(sync Service);

/// A result from attempting to resolve dependencies and construct services.
pub type InjectResult<T> = Result<T, crate::InjectError>;

/// Type information about a service.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
}

impl ServiceInfo {
    /// Creates a [`ServiceInfo`] for the given type.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Gets the [`TypeId`] for this service.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the type name of this service.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}
