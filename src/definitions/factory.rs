use crate::{
    ArgumentSource, Caster, ComponentDefinition, Dependency, DynSvc,
    ErasedFactory, FutureHandle, InjectError, InjectResult, InterfaceFor,
    Request, ResourceHandle, Scope, ScopedResource, Service, ServiceInfo,
    SourceKey, Svc, TypedHandle, ValueResource,
};
use std::any::TypeId;
use std::future::Future;
use std::marker::PhantomData;

/// A factory for creating instances of a service. Any function that takes
/// up to 12 [`Request`] parameters and returns a value implements this
/// trait automatically.
///
/// The dependencies a factory declares are derived from its parameter
/// list: `Svc<T>` declares a direct dependency on `T`, `Option<Svc<T>>` an
/// optional one, and `Vec<Svc<T>>` a collection dependency on every live
/// instance of `T`. [`Arg<T>`](crate::Arg) parameters declare no
/// dependency and are filled from caller-provided arguments instead.
pub trait ServiceFactory<D>: Send + Sync + 'static {
    /// The type of value produced by this factory.
    type Result;

    /// The dependencies declared by this factory's parameter list.
    fn dependencies() -> Vec<Dependency>;

    /// Invokes this factory, requesting each parameter from the given
    /// source.
    fn invoke(&self, source: &ArgumentSource<'_>) -> InjectResult<Self::Result>;
}

macro_rules! impl_service_factory {
    ($($type_name:ident),*) => {
        impl<F, R $(, $type_name)*> ServiceFactory<($($type_name,)*)> for F
        where
            F: Fn($($type_name),*) -> R + Send + Sync + 'static,
            R: 'static,
            $($type_name: Request,)*
        {
            type Result = R;

            #[allow(unused_mut)]
            fn dependencies() -> Vec<Dependency> {
                let mut dependencies = Vec::new();
                $(
                    if let Some(dependency) = <$type_name as Request>::dependency() {
                        dependencies.push(dependency);
                    }
                )*
                dependencies
            }

            #[allow(unused_variables)]
            fn invoke(
                &self,
                source: &ArgumentSource<'_>,
            ) -> InjectResult<Self::Result> {
                Ok(self($(<$type_name as Request>::request(source)?),*))
            }
        }
    };
}

impl_service_factory!();
impl_service_factory!(D1);
impl_service_factory!(D1, D2);
impl_service_factory!(D1, D2, D3);
impl_service_factory!(D1, D2, D3, D4);
impl_service_factory!(D1, D2, D3, D4, D5);
impl_service_factory!(D1, D2, D3, D4, D5, D6);
impl_service_factory!(D1, D2, D3, D4, D5, D6, D7);
impl_service_factory!(D1, D2, D3, D4, D5, D6, D7, D8);
impl_service_factory!(D1, D2, D3, D4, D5, D6, D7, D8, D9);
impl_service_factory!(D1, D2, D3, D4, D5, D6, D7, D8, D9, D10);
impl_service_factory!(D1, D2, D3, D4, D5, D6, D7, D8, D9, D10, D11);
impl_service_factory!(D1, D2, D3, D4, D5, D6, D7, D8, D9, D10, D11, D12);

/// A not-yet-registered component providing `C`. Created by [`factory`],
/// [`async_factory`], [`fallible_factory`], [`scoped`], or [`constant`],
/// then refined with [`in_scope`](Definition::in_scope) and
/// [`with_interface`](Definition::with_interface) before being registered
/// with a [`ContextBuilder`](crate::ContextBuilder).
///
/// ## Example
///
/// ```
/// use scoped_injector::{factory, Scope, Service, Svc};
///
/// struct Config;
/// struct Database(Svc<Config>);
///
/// trait Storage: Service {}
/// impl Storage for Database {}
/// scoped_injector::interface!(Storage);
///
/// let definition = factory(|config: Svc<Config>| Database(config))
///     .in_scope(Scope::Container)
///     .with_interface::<dyn Storage>();
/// ```
pub struct Definition<C: Service> {
    provides: ServiceInfo,
    satisfied: Vec<(ServiceInfo, Caster)>,
    dependencies: Vec<Dependency>,
    scope: Scope,
    factory: ErasedFactory,
    source: SourceKey,
    marker: PhantomData<fn() -> C>,
}

impl<C: Service> Definition<C> {
    fn new(
        dependencies: Vec<Dependency>,
        factory: ErasedFactory,
        source: SourceKey,
    ) -> Self {
        let provides = ServiceInfo::of::<C>();
        let identity: Caster = Box::new(|instance| Ok(instance.clone()));
        Definition {
            provides,
            satisfied: vec![(provides, identity)],
            dependencies,
            scope: Scope::Container,
            factory,
            source,
            marker: PhantomData,
        }
    }

    /// Sets the scope this definition's instances live in. Definitions are
    /// container-scoped unless told otherwise.
    #[must_use]
    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Declares that this definition also satisfies the interface `I`.
    /// Requests for `I` will then resolve to this definition's instance,
    /// which is constructed once and shared across all of its satisfied
    /// types.
    #[must_use]
    pub fn with_interface<I>(mut self) -> Self
    where
        I: ?Sized + InterfaceFor<C>,
    {
        let caster: Caster = Box::new(|instance: &DynSvc| {
            let concrete = instance
                .clone()
                .downcast_arc::<Svc<C>>()
                .map_err(|_| mismatched_instance(ServiceInfo::of::<C>()))?;
            Ok(Svc::new(I::from_svc((*concrete).clone())) as DynSvc)
        });

        self.satisfied.push((ServiceInfo::of::<I>(), caster));
        self
    }

    pub(crate) fn into_component(self) -> ComponentDefinition {
        ComponentDefinition {
            provides: self.provides,
            satisfied: self.satisfied,
            dependencies: self.dependencies,
            scope: self.scope,
            factory: self.factory,
            source: self.source,
        }
    }
}

fn mismatched_instance(service_info: ServiceInfo) -> InjectError {
    InjectError::InternalError(format!(
        "the stored instance for {} has the wrong type",
        service_info.name()
    ))
}

fn as_missing_dependency(
    provides: ServiceInfo,
    error: InjectError,
) -> InjectError {
    match error {
        InjectError::ComponentNotFound { service_info } => {
            InjectError::MissingDependency {
                service_info: provides,
                dependency_info: service_info,
            }
        }
        other => other,
    }
}

/// Creates a definition from a synchronous factory function. The factory's
/// parameters declare its dependencies.
///
/// ## Example
///
/// ```
/// use scoped_injector::{factory, Svc};
///
/// struct Config;
/// struct Database(Svc<Config>);
///
/// let definition = factory(|config: Svc<Config>| Database(config));
/// ```
pub fn factory<D, F>(function: F) -> Definition<F::Result>
where
    F: ServiceFactory<D>,
    F::Result: Service,
{
    let provides = ServiceInfo::of::<F::Result>();
    let dependencies = F::dependencies();
    let source = SourceKey::Factory(TypeId::of::<F>());
    let erased: ErasedFactory = Box::new(move |args| {
        let value = function
            .invoke(args)
            .map_err(|error| as_missing_dependency(provides, error))?;
        Ok(Box::new(TypedHandle::new(ValueResource::new(value)))
            as Box<dyn ResourceHandle>)
    });

    Definition::new(dependencies, erased, source)
}

/// Creates a definition from a factory function returning a future. The
/// future is awaited during resolution of the owning scope.
///
/// ## Example
///
/// ```
/// use scoped_injector::async_factory;
///
/// struct Database;
///
/// async fn connect() -> Database {
///     Database
/// }
///
/// let definition = async_factory(connect);
/// ```
pub fn async_factory<D, F, R>(function: F) -> Definition<R>
where
    F: ServiceFactory<D>,
    F::Result: Future<Output = R> + Send + 'static,
    R: Service,
{
    let provides = ServiceInfo::of::<R>();
    let dependencies = F::dependencies();
    let source = SourceKey::Factory(TypeId::of::<F>());
    let erased: ErasedFactory = Box::new(move |args| {
        let future = function
            .invoke(args)
            .map_err(|error| as_missing_dependency(provides, error))?;
        Ok(Box::new(FutureHandle::new(Box::pin(future)))
            as Box<dyn ResourceHandle>)
    });

    Definition::new(dependencies, erased, source)
}

/// Creates a definition from a factory function that can fail. A returned
/// error aborts the resolution pass with
/// [`InjectError::ActivationFailed`], and components constructed earlier in
/// the pass are torn down in reverse order.
///
/// ## Example
///
/// ```
/// use scoped_injector::fallible_factory;
///
/// struct Config;
///
/// fn load_config() -> Result<Config, std::io::Error> {
///     Ok(Config)
/// }
///
/// let definition = fallible_factory(load_config);
/// ```
pub fn fallible_factory<D, F, R, E>(function: F) -> Definition<R>
where
    F: ServiceFactory<D, Result = Result<R, E>>,
    R: Service,
    E: std::error::Error + Send + Sync + 'static,
{
    let provides = ServiceInfo::of::<R>();
    let dependencies = F::dependencies();
    let source = SourceKey::Factory(TypeId::of::<F>());
    let erased: ErasedFactory = Box::new(move |args| {
        let value = function
            .invoke(args)
            .map_err(|error| as_missing_dependency(provides, error))?
            .map_err(|inner| InjectError::ActivationFailed {
                service_info: provides,
                inner: Box::new(inner),
            })?;
        Ok(Box::new(TypedHandle::new(ValueResource::new(value)))
            as Box<dyn ResourceHandle>)
    });

    Definition::new(dependencies, erased, source)
}

/// Creates a definition from a factory function returning a
/// [`ScopedResource`]. The resource is entered during resolution to
/// produce the service and exited when the owning scope closes, in reverse
/// construction order.
pub fn scoped<D, F, S>(function: F) -> Definition<S::Target>
where
    F: ServiceFactory<D, Result = S>,
    S: ScopedResource,
{
    let provides = ServiceInfo::of::<S::Target>();
    let dependencies = F::dependencies();
    let source = SourceKey::Factory(TypeId::of::<F>());
    let erased: ErasedFactory = Box::new(move |args| {
        let resource = function
            .invoke(args)
            .map_err(|error| as_missing_dependency(provides, error))?;
        Ok(Box::new(TypedHandle::new(resource)) as Box<dyn ResourceHandle>)
    });

    Definition::new(dependencies, erased, source)
}

/// Creates a definition from an existing instance. Every resolution of the
/// definition yields a pointer to the same instance.
///
/// ## Example
///
/// ```
/// use scoped_injector::constant;
///
/// struct Config {
///     url: String,
/// }
///
/// let definition = constant(Config {
///     url: "localhost:5432".to_owned(),
/// });
/// ```
pub fn constant<C: Service>(value: C) -> Definition<C> {
    let instance = Svc::new(value);
    let source = SourceKey::Instance(Svc::as_ptr(&instance) as usize);
    let erased: ErasedFactory = Box::new(move |_| {
        Ok(Box::new(ConstantHandle {
            instance: instance.clone(),
        }) as Box<dyn ResourceHandle>)
    });

    Definition::new(Vec::new(), erased, source)
}

struct ConstantHandle<C: Service> {
    instance: Svc<C>,
}

#[async_trait::async_trait]
impl<C: Service> ResourceHandle for ConstantHandle<C> {
    async fn enter(&mut self) -> InjectResult<DynSvc> {
        Ok(Svc::new(self.instance.clone()) as DynSvc)
    }

    async fn exit(&mut self, _error: Option<&InjectError>) -> InjectResult<()> {
        Ok(())
    }
}
