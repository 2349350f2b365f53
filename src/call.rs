use crate::{ArgMap, Context, InjectResult, ServiceFactory};
use std::future::Future;
use std::marker::PhantomData;

impl Context {
    /// Binds an async function's dependencies to this context without
    /// calling it yet. Caller-provided [`Arg`](crate::Arg) values can be
    /// attached with [`BoundCallable::with_arg`] before the call.
    pub fn bind<D, F>(&self, function: F) -> BoundCallable<'_, D, F>
    where
        F: ServiceFactory<D>,
        F::Result: Future,
    {
        BoundCallable {
            context: self,
            function,
            arguments: ArgMap::default(),
            marker: PhantomData,
        }
    }

    /// Calls an async function with its dependencies resolved from this
    /// context. Shorthand for [`bind`](Context::bind) followed by
    /// [`call`](BoundCallable::call).
    ///
    /// ## Example
    ///
    /// ```no_run
    /// use scoped_injector::{Context, InjectResult, Svc};
    ///
    /// struct Database;
    ///
    /// async fn count_users(database: Svc<Database>) -> usize {
    ///     0
    /// }
    ///
    /// # async fn example(context: &Context) -> InjectResult<()> {
    /// let users = context.call(count_users).await?;
    /// # let _ = users;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<D, F>(
        &self,
        function: F,
    ) -> InjectResult<<F::Result as Future>::Output>
    where
        F: ServiceFactory<D>,
        F::Result: Future,
    {
        self.bind(function).call().await
    }
}

/// An async function bound to a [`Context`], ready to be called with its
/// dependencies resolved.
///
/// Each call opens a fresh function scope: function-scoped definitions are
/// constructed for the call and torn down when it completes, whether the
/// function's parameters resolved or not. Direct `Svc<T>` parameters that
/// nothing satisfies fail the call with
/// [`InjectError::ComponentNotFound`](crate::InjectError::ComponentNotFound);
/// `Option<Svc<T>>` parameters resolve to [`None`] instead.
pub struct BoundCallable<'a, D, F> {
    context: &'a Context,
    function: F,
    arguments: ArgMap,
    marker: PhantomData<fn(D)>,
}

impl<D, F> BoundCallable<'_, D, F>
where
    F: ServiceFactory<D>,
    F::Result: Future,
{
    /// Attaches a caller-provided value, filling the function's
    /// `Arg<T>` parameter of the same type. Attaching a second value of
    /// the same type replaces the first.
    ///
    /// Bound values are only visible to `Arg<T>` parameters; they never
    /// shadow registered definitions.
    #[must_use]
    pub fn with_arg<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.arguments.insert(value);
        self
    }

    /// Calls the function, resolving each parameter from the live
    /// instances and the bound arguments.
    ///
    /// The function scope opened for the call is closed before this
    /// returns, in both the success and the failure path.
    pub async fn call(&self) -> InjectResult<<F::Result as Future>::Output> {
        let scope = self.context.function_scope().await?;
        let invocation = {
            let source = scope.source(Some(&self.arguments));
            self.function.invoke(&source)
        };

        match invocation {
            Ok(future) => {
                let output = future.await;
                scope.close(None).await?;
                Ok(output)
            }
            Err(error) => {
                if let Err(teardown_error) = scope.close(Some(&error)).await {
                    tracing::warn!(
                        %teardown_error,
                        "teardown failed after a failed call",
                    );
                }

                Err(error)
            }
        }
    }
}
