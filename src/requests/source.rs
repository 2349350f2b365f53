use crate::{ArgMap, DynSvc, InjectError, InjectResult, Service, ServiceInfo, Svc};
use std::collections::HashMap;

/// How requests that match more than one live instance are resolved.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ResolutionMode {
    /// A request for a single instance fails with
    /// [`InjectError::AmbiguousResult`] when several instances satisfy the
    /// requested type.
    #[default]
    RequireUnique,

    /// A request for a single instance resolves to the earliest-constructed
    /// matching instance.
    FirstMatch,
}

/// The live instances indexed by satisfied type.
pub(crate) type InstanceMap = HashMap<ServiceInfo, Vec<DynSvc>>;

/// A read-only view of the instances visible to a factory or bound
/// callable: the live components of the scope being resolved, plus any
/// caller-provided arguments.
pub struct ArgumentSource<'a> {
    instances: &'a InstanceMap,
    arguments: Option<&'a ArgMap>,
    mode: ResolutionMode,
}

impl<'a> ArgumentSource<'a> {
    pub(crate) fn new(
        instances: &'a InstanceMap,
        arguments: Option<&'a ArgMap>,
        mode: ResolutionMode,
    ) -> Self {
        ArgumentSource {
            instances,
            arguments,
            mode,
        }
    }

    /// Gets an instance of the requested type.
    ///
    /// Fails with [`InjectError::ComponentNotFound`] when no live instance
    /// satisfies the type. When several do, the outcome depends on the
    /// context's [`ResolutionMode`].
    pub fn get_one<T: ?Sized + Service>(&self) -> InjectResult<Svc<T>> {
        self.get_optional::<T>()?.ok_or_else(|| {
            InjectError::ComponentNotFound {
                service_info: ServiceInfo::of::<T>(),
            }
        })
    }

    /// Gets an instance of the requested type, or [`None`] when no live
    /// instance satisfies it.
    pub fn get_optional<T: ?Sized + Service>(
        &self,
    ) -> InjectResult<Option<Svc<T>>> {
        let mut instances = self.get_all::<T>()?;
        match (instances.len(), self.mode) {
            (0, _) => Ok(None),
            (1, _) | (_, ResolutionMode::FirstMatch) => {
                Ok(Some(instances.swap_remove(0)))
            }
            (count, ResolutionMode::RequireUnique) => {
                Err(InjectError::AmbiguousResult {
                    service_info: ServiceInfo::of::<T>(),
                    count,
                })
            }
        }
    }

    /// Gets every live instance satisfying the requested type, in
    /// construction order.
    pub fn get_all<T: ?Sized + Service>(&self) -> InjectResult<Vec<Svc<T>>> {
        self.instances
            .get(&ServiceInfo::of::<T>())
            .into_iter()
            .flatten()
            .map(downcast_instance::<T>)
            .collect()
    }

    /// Gets a caller-provided argument of the given type, if one was bound.
    #[must_use]
    pub fn argument<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.arguments.and_then(ArgMap::get::<T>)
    }
}

fn downcast_instance<T: ?Sized + Service>(
    instance: &DynSvc,
) -> InjectResult<Svc<T>> {
    instance
        .clone()
        .downcast_arc::<Svc<T>>()
        .map(|instance| (*instance).clone())
        .map_err(|_| {
            InjectError::InternalError(format!(
                "the stored instance for {} has the wrong type",
                ServiceInfo::of::<T>().name()
            ))
        })
}
