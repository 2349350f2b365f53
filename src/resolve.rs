//! Scope resolution: walking the construction order, invoking factories,
//! and tearing constructed components back down.

use crate::{
    ArgumentSource, ComponentDefinition, DynSvc, InjectError, InjectResult,
    InstanceMap, ResolutionMode, ResourceHandle, Scope, ServiceInfo, Svc,
};
use std::sync::{Mutex, PoisonError};

/// A constructed component: the instance under each of its satisfied
/// types, plus the resource handle to exit when the owning scope closes.
///
/// The handle is taken at most once. Parent components are shared into
/// child scopes by pointer, so a child scope closing never exits a
/// component it did not construct.
pub(crate) struct ResolvedComponent {
    pub(crate) provides: ServiceInfo,
    pub(crate) satisfied: Vec<(ServiceInfo, DynSvc)>,
    handle: Mutex<Option<Box<dyn ResourceHandle>>>,
}

impl ResolvedComponent {
    pub(crate) fn take_handle(&self) -> Option<Box<dyn ResourceHandle>> {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub(crate) fn has_handle(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

pub(crate) fn is_container_scope(definition: &ComponentDefinition) -> bool {
    definition.scope() == Scope::Container
}

pub(crate) fn is_function_scope(definition: &ComponentDefinition) -> bool {
    definition.scope() == Scope::Function
}

/// Indexes the satisfied instances of the given components by type, in
/// construction order.
pub(crate) fn index_instances(
    components: &[Svc<ResolvedComponent>],
) -> InstanceMap {
    let mut instances = InstanceMap::new();
    for component in components {
        for (info, instance) in &component.satisfied {
            instances.entry(*info).or_default().push(instance.clone());
        }
    }

    instances
}

/// Resolves one scope: constructs every definition selected by `filter`,
/// in `order`, on top of the already-live `parent` components.
///
/// Returns the parent components followed by the newly constructed ones.
/// If any construction fails, the components this pass already constructed
/// are torn down in reverse order (the parent's are left alone) and the
/// construction error is returned.
pub(crate) async fn resolve_scope(
    definitions: &[ComponentDefinition],
    order: &[usize],
    filter: fn(&ComponentDefinition) -> bool,
    parent: &[Svc<ResolvedComponent>],
    mode: ResolutionMode,
) -> InjectResult<Vec<Svc<ResolvedComponent>>> {
    let mut components = parent.to_vec();
    let mut instances = index_instances(parent);
    let owned_from = components.len();
    for &index in order {
        let definition = &definitions[index];
        if !filter(definition) {
            continue;
        }

        match construct(definition, &instances, mode).await {
            Ok(component) => {
                for (info, instance) in &component.satisfied {
                    instances.entry(*info).or_default().push(instance.clone());
                }

                components.push(Svc::new(component));
            }
            Err(error) => {
                tracing::debug!(
                    service = definition.provides().name(),
                    %error,
                    "construction failed, unwinding scope",
                );
                if let Err(teardown_error) =
                    teardown_scope(&components[owned_from..], Some(&error))
                        .await
                {
                    tracing::warn!(
                        %teardown_error,
                        "teardown failed while unwinding a failed scope",
                    );
                }

                return Err(error);
            }
        }
    }

    Ok(components)
}

async fn construct(
    definition: &ComponentDefinition,
    instances: &InstanceMap,
    mode: ResolutionMode,
) -> InjectResult<ResolvedComponent> {
    let source = ArgumentSource::new(instances, None, mode);
    let mut handle = (definition.factory)(&source)?;
    let instance = handle.enter().await?;
    let satisfied: InjectResult<Vec<_>> = definition
        .satisfied
        .iter()
        .map(|(info, caster)| Ok((*info, caster(&instance)?)))
        .collect();
    let satisfied = match satisfied {
        Ok(satisfied) => satisfied,
        Err(error) => {
            if let Err(exit_error) = handle.exit(Some(&error)).await {
                tracing::warn!(
                    service = definition.provides().name(),
                    %exit_error,
                    "teardown failed after a cast error",
                );
            }

            return Err(error);
        }
    };

    tracing::debug!(
        service = definition.provides().name(),
        scope = ?definition.scope(),
        "constructed",
    );
    Ok(ResolvedComponent {
        provides: definition.provides(),
        satisfied,
        handle: Mutex::new(Some(handle)),
    })
}

/// Exits the given components in reverse construction order. `error` is
/// the error the scope is closing with, if any.
///
/// Every component is exited even when an earlier exit fails; the first
/// failure is returned after the sweep completes. Components whose handle
/// was already taken are skipped.
pub(crate) async fn teardown_scope(
    components: &[Svc<ResolvedComponent>],
    error: Option<&InjectError>,
) -> InjectResult<()> {
    let mut first_failure = None;
    for component in components.iter().rev() {
        let Some(mut handle) = component.take_handle() else {
            continue;
        };

        match handle.exit(error).await {
            Ok(()) => {
                tracing::debug!(
                    service = component.provides.name(),
                    "torn down",
                );
            }
            Err(exit_error) => {
                tracing::warn!(
                    service = component.provides.name(),
                    %exit_error,
                    "teardown failed",
                );
                if first_failure.is_none() {
                    first_failure = Some(exit_error);
                }
            }
        }
    }

    first_failure.map_or(Ok(()), Err)
}
