use crate::{
    ArgumentSource, Dependency, InjectError, InjectResult, Request,
    ServiceInfo,
};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

/// A caller-provided argument to a bound callable.
///
/// `Arg<T>` parameters are not dependencies: they declare nothing to the
/// validator and are filled from the values bound with
/// [`BoundCallable::with_arg`](crate::BoundCallable::with_arg) rather than
/// from live instances. Requesting an argument that the caller did not
/// bind fails the call.
///
/// ## Example
///
/// ```no_run
/// use scoped_injector::{Arg, Context, InjectResult, Svc};
///
/// struct Mailer;
///
/// async fn send_welcome(mailer: Svc<Mailer>, user_id: Arg<u64>) -> u64 {
///     *user_id
/// }
///
/// # async fn example(context: &Context) -> InjectResult<()> {
/// let sent_to = context.bind(send_welcome).with_arg(42u64).call().await?;
/// assert_eq!(sent_to, 42);
/// # Ok(())
/// # }
/// ```
pub struct Arg<T>(T);

impl<T> Arg<T> {
    /// Consumes the argument, returning the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Arg<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Clone + Send + Sync + 'static> Request for Arg<T> {
    fn dependency() -> Option<Dependency> {
        None
    }

    fn request(source: &ArgumentSource<'_>) -> InjectResult<Self> {
        source
            .argument::<T>()
            .map(Arg)
            .ok_or_else(|| InjectError::ComponentNotFound {
                service_info: ServiceInfo::of::<Arg<T>>(),
            })
    }
}

/// The values bound to a callable, keyed by type. Binding a second value
/// of the same type replaces the first.
#[derive(Default)]
pub(crate) struct ArgMap {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ArgMap {
    pub(crate) fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub(crate) fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::ArgMap;

    #[test]
    fn later_values_replace_earlier_ones() {
        let mut arguments = ArgMap::default();
        arguments.insert(1_u32);
        arguments.insert(2_u32);
        arguments.insert("name");

        assert_eq!(Some(2_u32), arguments.get::<u32>());
        assert_eq!(Some("name"), arguments.get::<&str>());
        assert_eq!(None, arguments.get::<u64>());
    }
}
