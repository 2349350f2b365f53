use crate::{ComponentDefinition, Definition, Service};

/// A collection of definitions that can be registered with a
/// [`ContextBuilder`](crate::ContextBuilder) in one call. Modules let
/// related registrations live next to the code they wire up.
///
/// Modules can be created manually or, more conveniently, with the
/// [`define_module!`](crate::define_module) macro.
#[derive(Default)]
pub struct Module {
    definitions: Vec<ComponentDefinition>,
}

impl Module {
    /// Creates an empty module.
    #[must_use]
    pub fn new() -> Self {
        Module::default()
    }

    /// Adds a definition to this module. Duplicate sources are detected
    /// when the module is registered, not here.
    pub fn provide<C: Service>(&mut self, definition: Definition<C>) {
        self.definitions.push(definition.into_component());
    }

    pub(crate) fn into_components(self) -> Vec<ComponentDefinition> {
        self.definitions
    }
}

/// Defines a module from a list of definitions.
///
/// ## Example
///
/// ```
/// use scoped_injector::{
///     constant, define_module, factory, Context, InjectResult, Scope, Svc,
/// };
///
/// struct Config;
/// struct Database(Svc<Config>);
///
/// # fn main() -> InjectResult<()> {
/// let module = define_module! {
///     services = [
///         constant(Config),
///         factory(|config: Svc<Config>| Database(config))
///             .in_scope(Scope::Container),
///     ],
/// };
///
/// let mut builder = Context::builder();
/// builder.add_module(module)?;
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! define_module {
    {
        services = [
            $($service:expr),* $(,)?
        ] $(,)?
    } => {
        {
            let mut module = $crate::Module::new();
            $(module.provide($service);)*
            module
        }
    };
}
