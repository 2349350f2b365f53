//! Whole-graph validation, run once when a context is entered.
//!
//! Checks run in a fixed order so that error reporting is deterministic:
//! unsatisfiable direct dependencies first, then scope violations, then
//! cycles. The construction order computed by the cycle check is returned
//! for reuse by resolution.

use crate::graph::{provider_index, toposort};
use crate::{
    ComponentDefinition, Dependency, DependencyKind, InjectError,
    InjectResult, Scope, ServiceInfo,
};
use std::collections::HashMap;

pub(crate) fn validate(
    definitions: &[ComponentDefinition],
) -> InjectResult<Vec<usize>> {
    let providers = provider_index(definitions);
    detect_conflicting_kinds(definitions)?;
    detect_missing_dependencies(definitions, &providers)?;
    detect_scope_violations(definitions, &providers)?;
    toposort(definitions, &providers)
}

/// A type may not be depended on both as a collection and as a single
/// instance by the same definition.
fn detect_conflicting_kinds(
    definitions: &[ComponentDefinition],
) -> InjectResult<()> {
    for definition in definitions {
        for dependency in definition.dependencies() {
            let conflicting = definition.dependencies().iter().any(|other| {
                other.info() == dependency.info()
                    && (other.kind() == DependencyKind::Collection)
                        != (dependency.kind() == DependencyKind::Collection)
            });
            if conflicting {
                return Err(InjectError::ConflictingDependencyKinds {
                    service_info: definition.provides(),
                    dependency_info: dependency.info(),
                });
            }
        }
    }

    Ok(())
}

/// Every direct dependency must have at least one satisfying definition.
/// Optional and collection dependencies tolerate absence.
fn detect_missing_dependencies(
    definitions: &[ComponentDefinition],
    providers: &HashMap<ServiceInfo, Vec<usize>>,
) -> InjectResult<()> {
    for definition in definitions {
        for dependency in definition.dependencies() {
            if dependency.kind() == DependencyKind::Direct
                && !providers.contains_key(&dependency.info())
            {
                return Err(InjectError::MissingDependency {
                    service_info: definition.provides(),
                    dependency_info: dependency.info(),
                });
            }
        }
    }

    Ok(())
}

/// A container-scoped definition must not depend on a type satisfied by
/// any function-scoped definition, whatever the dependency kind. A
/// function-scoped instance cannot outlive its scope, so handing one to a
/// longer-lived consumer would dangle.
fn detect_scope_violations(
    definitions: &[ComponentDefinition],
    providers: &HashMap<ServiceInfo, Vec<usize>>,
) -> InjectResult<()> {
    for definition in definitions {
        if definition.scope() != Scope::Container {
            continue;
        }

        for info in definition.dependencies().iter().map(Dependency::info) {
            let Some(sources) = providers.get(&info) else {
                continue;
            };

            let escaping = sources
                .iter()
                .any(|&index| definitions[index].scope() != Scope::Container);
            if escaping {
                return Err(InjectError::ScopeViolation {
                    service_info: definition.provides(),
                    dependency_info: info,
                });
            }
        }
    }

    Ok(())
}
