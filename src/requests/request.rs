use crate::{
    ArgumentSource, Dependency, DependencyKind, InjectResult, Service,
    ServiceInfo, Svc,
};

/// A request for a value from a resolution pass. Factory and callable
/// parameters are requests: the dependency they declare drives validation
/// and construction ordering, and the request itself is performed against
/// the live instances when the factory is invoked.
pub trait Request: Sized {
    /// The dependency this request declares, if any.
    fn dependency() -> Option<Dependency>;

    /// Performs the request.
    fn request(source: &ArgumentSource<'_>) -> InjectResult<Self>;
}

/// Requests a single instance of `S`. Exactly one live instance must
/// satisfy `S` (under the default [`ResolutionMode`](crate::ResolutionMode)).
impl<S: ?Sized + Service> Request for Svc<S> {
    fn dependency() -> Option<Dependency> {
        Some(Dependency::new(ServiceInfo::of::<S>(), DependencyKind::Direct))
    }

    fn request(source: &ArgumentSource<'_>) -> InjectResult<Self> {
        source.get_one::<S>()
    }
}

/// Requests a single instance of `S` if any live instance satisfies it.
/// Absence is not an error.
impl<S: ?Sized + Service> Request for Option<Svc<S>> {
    fn dependency() -> Option<Dependency> {
        Some(Dependency::new(
            ServiceInfo::of::<S>(),
            DependencyKind::Optional,
        ))
    }

    fn request(source: &ArgumentSource<'_>) -> InjectResult<Self> {
        source.get_optional::<S>()
    }
}

/// Requests every live instance satisfying `S`, in construction order. An
/// empty collection is not an error.
impl<S: ?Sized + Service> Request for Vec<Svc<S>> {
    fn dependency() -> Option<Dependency> {
        Some(Dependency::new(
            ServiceInfo::of::<S>(),
            DependencyKind::Collection,
        ))
    }

    fn request(source: &ArgumentSource<'_>) -> InjectResult<Self> {
        source.get_all::<S>()
    }
}
