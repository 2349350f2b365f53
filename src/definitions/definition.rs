use crate::{ArgumentSource, DynSvc, InjectResult, ResourceHandle, ServiceInfo};
use std::any::TypeId;
use std::fmt::{Debug, Formatter};

/// The lifetime scope of a component.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Scope {
    /// One instance for the whole life of the context. Constructed eagerly
    /// when the context is entered and torn down when it exits.
    /// Container-scoped components may only depend on other container-scoped
    /// components.
    Container,

    /// A fresh instance per function scope. Constructed when a function
    /// scope is resolved and torn down when that scope closes.
    /// Function-scoped components may depend on any scope.
    Function,
}

/// How a dependency slot is resolved.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum DependencyKind {
    /// Must resolve to exactly one instance.
    Direct,

    /// Resolves to zero or one instance. Absence yields `None`.
    Optional,

    /// Resolves to every live instance of the element type. Absence yields
    /// an empty collection.
    Collection,
}

/// A single declared dependency of a definition.
#[derive(Clone, Copy, Debug)]
pub struct Dependency {
    info: ServiceInfo,
    kind: DependencyKind,
}

impl Dependency {
    /// Creates a new dependency declaration on the given type.
    #[must_use]
    pub fn new(info: ServiceInfo, kind: DependencyKind) -> Self {
        Dependency { info, kind }
    }

    /// The depended-on type. For collections, this is the element type.
    #[must_use]
    pub fn info(&self) -> ServiceInfo {
        self.info
    }

    /// How this dependency is resolved.
    #[must_use]
    pub fn kind(&self) -> DependencyKind {
        self.kind
    }
}

/// Identity of the source a definition was registered from, used to reject
/// duplicate registrations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum SourceKey {
    /// A factory function, identified by its type.
    Factory(TypeId),

    /// A constant instance, identified by its pointer.
    Instance(usize),
}

pub(crate) type ErasedFactory = Box<
    dyn Fn(&ArgumentSource<'_>) -> InjectResult<Box<dyn ResourceHandle>>
        + Send
        + Sync,
>;

/// Casts a constructed instance to one of its satisfied types. The
/// satisfaction table is computed once, at registration time.
pub(crate) type Caster =
    Box<dyn Fn(&DynSvc) -> InjectResult<DynSvc> + Send + Sync>;

/// An immutable record describing one registered component: the types it
/// satisfies, the types it depends on, its normalized factory, and its
/// scope.
///
/// Definitions are created by registering a [`Definition`](crate::Definition)
/// with a [`ContextBuilder`](crate::ContextBuilder) and never change
/// afterwards. Many definitions may satisfy the same type (multi-binding);
/// each definition's factory is invoked exactly once per resolution pass,
/// never once per satisfied type.
pub struct ComponentDefinition {
    pub(crate) provides: ServiceInfo,
    pub(crate) satisfied: Vec<(ServiceInfo, Caster)>,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) scope: Scope,
    pub(crate) factory: ErasedFactory,
    pub(crate) source: SourceKey,
}

impl ComponentDefinition {
    /// The primary type this definition provides.
    #[must_use]
    pub fn provides(&self) -> ServiceInfo {
        self.provides
    }

    /// The scope this definition's instances live in.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Every type this definition satisfies, the primary type included.
    pub fn satisfied_types(&self) -> impl Iterator<Item = ServiceInfo> + '_ {
        self.satisfied.iter().map(|(info, _)| *info)
    }

    /// The declared dependencies of this definition.
    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// The types this definition's construction depends on, collection
    /// element types included.
    pub(crate) fn dependency_types(
        &self,
    ) -> impl Iterator<Item = ServiceInfo> + '_ {
        self.dependencies.iter().map(Dependency::info)
    }
}

impl Debug for ComponentDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("provides", &self.provides.name())
            .field("scope", &self.scope)
            .field(
                "satisfied",
                &self
                    .satisfied
                    .iter()
                    .map(|(info, _)| info.name())
                    .collect::<Vec<_>>(),
            )
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
