use crate::resolve::{
    index_instances, is_container_scope, is_function_scope, resolve_scope,
    teardown_scope, ResolvedComponent,
};
use crate::validate::validate;
use crate::{
    ArgumentSource, ComponentDefinition, ContextBuilder, InjectError,
    InjectResult, InstanceMap, ResolutionMode, Service, ServiceInfo, Svc,
};
use std::collections::HashSet;

/// The lifecycle state of a [`Context`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ContextState {
    /// Built but not yet entered. No instances exist yet.
    Initializing,

    /// Entered. Container-scoped instances are live and can be resolved.
    Servicing,

    /// Exited. All instances have been torn down.
    Closed,
}

/// A container of services, resolved and torn down as a unit.
///
/// A context moves through three states. It is built
/// ([`Initializing`](ContextState::Initializing)), entered exactly once
/// ([`enter`](Context::enter)), serves instances while
/// [`Servicing`](ContextState::Servicing), and is exited exactly once
/// ([`exit`](Context::exit)), after which it is
/// [`Closed`](ContextState::Closed) for good. Entering validates the whole
/// dependency graph, then eagerly constructs every container-scoped
/// definition in dependency order. Exiting tears those instances down in
/// strict reverse construction order.
///
/// Function-scoped definitions are not constructed on enter; they come to
/// life per [`function_scope`](Context::function_scope) or per bound
/// callable invocation.
pub struct Context {
    definitions: Vec<ComponentDefinition>,
    mode: ResolutionMode,
    state: ContextState,
    order: Vec<usize>,
    components: Vec<Svc<ResolvedComponent>>,
    instances: InstanceMap,
}

impl Context {
    /// Creates a builder for a new context.
    #[must_use]
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub(crate) fn from_parts(
        definitions: Vec<ComponentDefinition>,
        mode: ResolutionMode,
    ) -> Self {
        Context {
            definitions,
            mode,
            state: ContextState::Initializing,
            order: Vec::new(),
            components: Vec::new(),
            instances: InstanceMap::new(),
        }
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Enters the context: validates the dependency graph, then constructs
    /// every container-scoped definition in dependency order.
    ///
    /// If validation fails, nothing is constructed. If a construction
    /// fails partway, the instances constructed so far are torn down in
    /// reverse order and the construction error is returned; the context
    /// can not be entered again afterwards.
    pub async fn enter(&mut self) -> InjectResult<()> {
        if self.state != ContextState::Initializing {
            return Err(InjectError::InvalidState {
                operation: "enter",
                state: self.state,
            });
        }

        self.state = ContextState::Closed;
        let order = validate(&self.definitions)?;
        let components = resolve_scope(
            &self.definitions,
            &order,
            is_container_scope,
            &[],
            self.mode,
        )
        .await?;

        tracing::debug!(components = components.len(), "context entered");
        self.instances = index_instances(&components);
        self.order = order;
        self.components = components;
        self.state = ContextState::Servicing;
        Ok(())
    }

    /// Exits the context, tearing down every container-scoped instance in
    /// strict reverse construction order. `error` is the error the context
    /// is closing because of, if any; it is passed through to each
    /// resource's exit.
    ///
    /// Every instance is torn down even when one teardown fails; the first
    /// teardown failure is returned after the sweep completes.
    pub async fn exit(
        &mut self,
        error: Option<&InjectError>,
    ) -> InjectResult<()> {
        if self.state != ContextState::Servicing {
            return Err(InjectError::InvalidState {
                operation: "exit",
                state: self.state,
            });
        }

        self.state = ContextState::Closed;
        self.instances.clear();
        let components = std::mem::take(&mut self.components);
        let result = teardown_scope(&components, error).await;
        tracing::debug!("context exited");
        result
    }

    /// Gets an instance of the requested type from the live
    /// container-scoped instances.
    ///
    /// Fails with [`InjectError::ComponentNotFound`] when nothing
    /// satisfies the type; when several instances do, the outcome depends
    /// on the context's [`ResolutionMode`]. Function-scoped definitions
    /// are not visible here; resolve those through
    /// [`function_scope`](Context::function_scope) or
    /// [`bind`](Context::bind).
    pub fn get_instance<T: ?Sized + Service>(&self) -> InjectResult<Svc<T>> {
        self.ensure_servicing("get_instance")?;
        self.source().get_one::<T>()
    }

    /// Gets every live container-scoped instance satisfying the requested
    /// type, in construction order.
    pub fn get_instances<T: ?Sized + Service>(
        &self,
    ) -> InjectResult<Vec<Svc<T>>> {
        self.ensure_servicing("get_instances")?;
        self.source().get_all::<T>()
    }

    /// Gets an instance of the requested type, or [`None`] when nothing
    /// satisfies it.
    pub fn get_optional_instance<T: ?Sized + Service>(
        &self,
    ) -> InjectResult<Option<Svc<T>>> {
        self.ensure_servicing("get_optional_instance")?;
        self.source().get_optional::<T>()
    }

    /// Every type satisfied by at least one registered definition, in
    /// first-registration order.
    #[must_use]
    pub fn get_satisfied_types(&self) -> Vec<ServiceInfo> {
        let mut seen = HashSet::new();
        self.definitions
            .iter()
            .flat_map(ComponentDefinition::satisfied_types)
            .filter(|info| seen.insert(*info))
            .collect()
    }

    /// Opens a function scope: constructs every function-scoped definition
    /// in dependency order, on top of the live container-scoped instances.
    ///
    /// The returned scope must be closed with
    /// [`FunctionScope::close`], which tears its instances down in reverse
    /// construction order. Dropping an unclosed scope leaks its resources.
    pub async fn function_scope(&self) -> InjectResult<FunctionScope<'_>> {
        self.ensure_servicing("function_scope")?;
        let components = resolve_scope(
            &self.definitions,
            &self.order,
            is_function_scope,
            &self.components,
            self.mode,
        )
        .await?;

        Ok(FunctionScope::new(self.components.len(), components, self.mode))
    }

    fn ensure_servicing(
        &self,
        operation: &'static str,
    ) -> InjectResult<()> {
        if self.state == ContextState::Servicing {
            Ok(())
        } else {
            Err(InjectError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn source(&self) -> ArgumentSource<'_> {
        ArgumentSource::new(&self.instances, None, self.mode)
    }
}

/// A short-lived scope of function-scoped instances, layered over a
/// servicing [`Context`].
///
/// The scope sees both its own instances and the context's container-scoped
/// ones. It owns only the instances it constructed: closing the scope exits
/// those in reverse construction order and never touches the parent's.
///
/// ## Example
///
/// ```no_run
/// use scoped_injector::{Context, InjectResult};
///
/// struct Worker;
///
/// # async fn example(context: &Context) -> InjectResult<()> {
/// let scope = context.function_scope().await?;
/// let worker = scope.get_instance::<Worker>()?;
/// // ... use the worker ...
/// # let _ = worker;
/// scope.close(None).await?;
/// # Ok(())
/// # }
/// ```
pub struct FunctionScope<'a> {
    components: Vec<Svc<ResolvedComponent>>,
    instances: InstanceMap,
    mode: ResolutionMode,
    owned_from: usize,
    closed: bool,
    marker: std::marker::PhantomData<&'a Context>,
}

impl FunctionScope<'_> {
    fn new(
        owned_from: usize,
        components: Vec<Svc<ResolvedComponent>>,
        mode: ResolutionMode,
    ) -> Self {
        let instances = index_instances(&components);
        FunctionScope {
            components,
            instances,
            mode,
            owned_from,
            closed: false,
            marker: std::marker::PhantomData,
        }
    }

    /// Gets an instance of the requested type from the instances visible
    /// to this scope.
    pub fn get_instance<T: ?Sized + Service>(&self) -> InjectResult<Svc<T>> {
        self.source(None).get_one::<T>()
    }

    /// Gets every visible instance satisfying the requested type, in
    /// construction order. Container-scoped instances come before this
    /// scope's own.
    pub fn get_instances<T: ?Sized + Service>(
        &self,
    ) -> InjectResult<Vec<Svc<T>>> {
        self.source(None).get_all::<T>()
    }

    /// Gets an instance of the requested type, or [`None`] when nothing
    /// visible satisfies it.
    pub fn get_optional_instance<T: ?Sized + Service>(
        &self,
    ) -> InjectResult<Option<Svc<T>>> {
        self.source(None).get_optional::<T>()
    }

    /// Closes the scope, exiting the instances it constructed in strict
    /// reverse construction order. `error` is the error the scope is
    /// closing because of, if any; it is passed through to each resource's
    /// exit.
    ///
    /// Every owned instance is exited even when one exit fails; the first
    /// failure is returned after the sweep completes.
    pub async fn close(
        mut self,
        error: Option<&InjectError>,
    ) -> InjectResult<()> {
        self.closed = true;
        teardown_scope(&self.components[self.owned_from..], error).await
    }

    pub(crate) fn source<'s>(
        &'s self,
        arguments: Option<&'s crate::ArgMap>,
    ) -> ArgumentSource<'s> {
        ArgumentSource::new(&self.instances, arguments, self.mode)
    }
}

impl Drop for FunctionScope<'_> {
    fn drop(&mut self) {
        let leaked = !self.closed
            && self.components[self.owned_from..]
                .iter()
                .any(|component| component.has_handle());
        if leaked {
            tracing::warn!(
                "a function scope was dropped without being closed; its \
                 resources were not exited",
            );
        }
    }
}
