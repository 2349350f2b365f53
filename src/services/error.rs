use crate::{ContextState, ServiceInfo};
use std::error::Error;
use thiserror::Error;

/// An error that has occurred during registration, validation, construction,
/// or teardown of services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InjectError {
    /// No definition satisfies the requested type.
    #[error("{} has no satisfying definition", .service_info.name())]
    ComponentNotFound {
        /// The service that was requested.
        service_info: ServiceInfo,
    },

    /// A definition's required dependency has no satisfying definition.
    #[error(
        "{} has no satisfying definition (required by {})",
        .dependency_info.name(),
        .service_info.name()
    )]
    MissingDependency {
        /// The service whose dependency is missing.
        service_info: ServiceInfo,

        /// The dependency that has no satisfying definition.
        dependency_info: ServiceInfo,
    },

    /// The dependency graph admits no construction order.
    #[error(
        "the dependency graph has no valid construction order [{}]",
        fmt_cycle(.cycle)
    )]
    CycleDetected {
        /// The services involved in the cycle.
        cycle: Vec<ServiceInfo>,
    },

    /// A container-scoped definition depends on a type satisfied by a
    /// function-scoped definition.
    #[error(
        "container-scoped {} depends on {}, which is satisfied by a \
         function-scoped definition",
        .service_info.name(),
        .dependency_info.name()
    )]
    ScopeViolation {
        /// The container-scoped service with the invalid dependency.
        service_info: ServiceInfo,

        /// The dependency satisfied by a function-scoped definition.
        dependency_info: ServiceInfo,
    },

    /// A definition depends on the same type both as a collection and as a
    /// single instance.
    #[error(
        "{} depends on {} both as a collection and as a single instance",
        .service_info.name(),
        .dependency_info.name()
    )]
    ConflictingDependencyKinds {
        /// The service with the conflicting dependency declarations.
        service_info: ServiceInfo,

        /// The type declared under more than one dependency kind.
        dependency_info: ServiceInfo,
    },

    /// The same factory or instance was registered twice.
    #[error("{} is already registered", .service_info.name())]
    DuplicateRegistration {
        /// The service provided by the duplicated source.
        service_info: ServiceInfo,
    },

    /// A request expecting at most one match found several.
    #[error(
        "{} is satisfied by {count} live instances (did you mean to request \
         a Vec<Svc<T>> instead?)",
        .service_info.name()
    )]
    AmbiguousResult {
        /// The service that was requested.
        service_info: ServiceInfo,

        /// The number of live instances that matched.
        count: usize,
    },

    /// A factory or resource failed during construction of a service.
    #[error("an error occurred during activation of {}", .service_info.name())]
    ActivationFailed {
        /// The service that was being constructed.
        service_info: ServiceInfo,

        /// The error returned by the factory.
        #[source]
        inner: Box<dyn Error + Send + Sync>,
    },

    /// An operation was attempted in a lifecycle state that does not allow
    /// it.
    #[error("{operation} is not allowed while the context is {state:?}")]
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,

        /// The state the context was in.
        state: ContextState,
    },

    /// An unexpected error has occurred. This is usually caused by a bug in
    /// the library itself.
    #[error("an unexpected error occurred: {0}")]
    InternalError(String),
}

fn fmt_cycle(cycle: &[ServiceInfo]) -> String {
    let mut joined = String::new();
    for item in cycle.iter().rev() {
        if !joined.is_empty() {
            joined.push_str(" -> ");
        }
        joined.push_str(item.name());
    }
    joined
}
