use crate::{
    ComponentDefinition, Context, Definition, InjectError, InjectResult,
    Module, ResolutionMode, Service, SourceKey,
};
use std::collections::HashSet;

/// A builder for a [`Context`].
///
/// Definitions are collected in registration order, which later drives
/// tie-breaking in the construction order. Registering the same factory or
/// the same constant instance twice is rejected immediately; the rest of
/// validation runs when the built context is entered.
///
/// ## Example
///
/// ```
/// use scoped_injector::{constant, factory, Context, InjectResult, Svc};
///
/// struct Config;
/// struct Database(Svc<Config>);
///
/// # fn main() -> InjectResult<()> {
/// let mut builder = Context::builder();
/// builder.provide(constant(Config))?;
/// builder.provide(factory(|config: Svc<Config>| Database(config)))?;
/// let context = builder.build();
/// # let _ = context;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ContextBuilder {
    definitions: Vec<ComponentDefinition>,
    sources: HashSet<SourceKey>,
    mode: ResolutionMode,
}

impl ContextBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        ContextBuilder::default()
    }

    /// Registers a definition.
    ///
    /// Fails with [`InjectError::DuplicateRegistration`] if the
    /// definition's factory or constant instance was already registered.
    pub fn provide<C: Service>(
        &mut self,
        definition: Definition<C>,
    ) -> InjectResult<()> {
        self.provide_component(definition.into_component())
    }

    /// Registers every definition collected in a [`Module`].
    pub fn add_module(&mut self, module: Module) -> InjectResult<()> {
        for component in module.into_components() {
            self.provide_component(component)?;
        }

        Ok(())
    }

    /// Sets how requests matching several live instances are resolved.
    /// Contexts require unique matches unless told otherwise.
    pub fn set_resolution_mode(&mut self, mode: ResolutionMode) {
        self.mode = mode;
    }

    /// Builds the context. The context must be entered before instances
    /// can be resolved from it.
    #[must_use]
    pub fn build(self) -> Context {
        Context::from_parts(self.definitions, self.mode)
    }

    fn provide_component(
        &mut self,
        component: ComponentDefinition,
    ) -> InjectResult<()> {
        if !self.sources.insert(component.source) {
            return Err(InjectError::DuplicateRegistration {
                service_info: component.provides(),
            });
        }

        tracing::debug!(
            service = component.provides().name(),
            scope = ?component.scope(),
            "registered",
        );
        self.definitions.push(component);
        Ok(())
    }
}
