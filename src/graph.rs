//! Dependency graph construction and ordering.
//!
//! Nodes are definition indices rather than types so that several
//! definitions satisfying the same type stay distinct. Edges point from
//! provider to consumer: a definition that depends on `T` gains an edge
//! from every definition satisfying `T`, collection dependencies included.

use crate::{ComponentDefinition, InjectError, InjectResult, ServiceInfo};
use std::collections::{HashMap, HashSet, VecDeque};

/// The definitions satisfying each type, in registration order.
pub(crate) fn provider_index(
    definitions: &[ComponentDefinition],
) -> HashMap<ServiceInfo, Vec<usize>> {
    let mut providers: HashMap<ServiceInfo, Vec<usize>> = HashMap::new();
    for (index, definition) in definitions.iter().enumerate() {
        for info in definition.satisfied_types() {
            providers.entry(info).or_default().push(index);
        }
    }

    providers
}

/// Orders the definitions so that every definition comes after all of its
/// providers. Ties are broken by registration order, so the result is
/// deterministic for a fixed registration sequence.
///
/// Fails with [`InjectError::CycleDetected`] when the graph admits no such
/// order. Dependencies on types nothing satisfies contribute no edges;
/// missing required dependencies are reported by validation, not here.
pub(crate) fn toposort(
    definitions: &[ComponentDefinition],
    providers: &HashMap<ServiceInfo, Vec<usize>>,
) -> InjectResult<Vec<usize>> {
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); definitions.len()];
    let mut in_degree = vec![0usize; definitions.len()];
    let mut edges = HashSet::new();
    for (consumer, definition) in definitions.iter().enumerate() {
        for info in definition.dependency_types() {
            let Some(sources) = providers.get(&info) else {
                continue;
            };

            for &provider in sources {
                if edges.insert((provider, consumer)) {
                    dependents[provider].push(consumer);
                    in_degree[consumer] += 1;
                }
            }
        }
    }

    // Seeding the queue in index order and visiting dependents in index
    // order keeps ties in registration order.
    let mut queue: VecDeque<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(index, _)| index)
        .collect();
    let mut sorted = Vec::with_capacity(definitions.len());
    while let Some(index) = queue.pop_front() {
        sorted.push(index);
        for &dependent in &dependents[index] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if sorted.len() == definitions.len() {
        Ok(sorted)
    } else {
        Err(InjectError::CycleDetected {
            cycle: cyclic_core(definitions, &dependents, &in_degree),
        })
    }
}

/// Narrows the definitions left unsorted by a failed toposort to the ones
/// actually participating in a cycle. The residue also contains acyclic
/// dependents downstream of a cycle; peeling away residual nodes with no
/// residual dependents, repeatedly, strips them off.
fn cyclic_core(
    definitions: &[ComponentDefinition],
    dependents: &[Vec<usize>],
    in_degree: &[usize],
) -> Vec<ServiceInfo> {
    let mut stuck: Vec<bool> =
        in_degree.iter().map(|&degree| degree > 0).collect();
    let mut out_degree = vec![0usize; definitions.len()];
    let mut providers_of: Vec<Vec<usize>> =
        vec![Vec::new(); definitions.len()];
    for (provider, targets) in dependents.iter().enumerate() {
        if !stuck[provider] {
            continue;
        }

        for &dependent in targets {
            if stuck[dependent] {
                out_degree[provider] += 1;
                providers_of[dependent].push(provider);
            }
        }
    }

    let mut peel: VecDeque<usize> = (0..definitions.len())
        .filter(|&index| stuck[index] && out_degree[index] == 0)
        .collect();
    while let Some(index) = peel.pop_front() {
        stuck[index] = false;
        for &provider in &providers_of[index] {
            if stuck[provider] {
                out_degree[provider] -= 1;
                if out_degree[provider] == 0 {
                    peel.push_back(provider);
                }
            }
        }
    }

    (0..definitions.len())
        .filter(|&index| stuck[index])
        .map(|index| definitions[index].provides())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{factory, Svc};

    struct Leaf;
    struct Branch(#[allow(dead_code)] Svc<Leaf>);

    #[test]
    fn providers_come_before_their_consumers() {
        let definitions = vec![
            factory(|leaf: Svc<Leaf>| Branch(leaf)).into_component(),
            factory(|| Leaf).into_component(),
        ];

        let providers = provider_index(&definitions);
        let sorted = toposort(&definitions, &providers).unwrap();
        assert_eq!(vec![1, 0], sorted);
    }

    #[test]
    fn independent_definitions_keep_registration_order() {
        let definitions = vec![
            factory(|| Leaf).into_component(),
            factory(|leaf: Svc<Leaf>| Branch(leaf)).into_component(),
            factory(String::new).into_component(),
        ];

        let providers = provider_index(&definitions);
        let sorted = toposort(&definitions, &providers).unwrap();
        assert_eq!(vec![0, 1, 2], sorted);
    }

    #[test]
    fn cycle_errors_exclude_downstream_dependents() {
        struct Yolk(#[allow(dead_code)] Svc<Shell>);
        struct Shell(#[allow(dead_code)] Svc<Yolk>);
        struct Omelette(#[allow(dead_code)] Svc<Yolk>);

        let definitions = vec![
            factory(|shell: Svc<Shell>| Yolk(shell)).into_component(),
            factory(|yolk: Svc<Yolk>| Shell(yolk)).into_component(),
            factory(|yolk: Svc<Yolk>| Omelette(yolk)).into_component(),
        ];

        let providers = provider_index(&definitions);
        let InjectError::CycleDetected { cycle } =
            toposort(&definitions, &providers).unwrap_err()
        else {
            panic!("expected a cycle");
        };
        assert_eq!(2, cycle.len());
        assert!(cycle.contains(&crate::ServiceInfo::of::<Yolk>()));
        assert!(cycle.contains(&crate::ServiceInfo::of::<Shell>()));
        assert!(!cycle.contains(&crate::ServiceInfo::of::<Omelette>()));
    }

    #[test]
    fn self_dependencies_are_cycles() {
        struct Recursive(#[allow(dead_code)] Svc<Recursive>);

        let definitions = vec![factory(|inner: Svc<Recursive>| {
            Recursive(inner)
        })
        .into_component()];

        let providers = provider_index(&definitions);
        let error = toposort(&definitions, &providers).unwrap_err();
        assert!(
            matches!(error, InjectError::CycleDetected { ref cycle } if cycle.len() == 1)
        );
    }
}
