//! # Scoped runtime dependency injection.
//!
//! This crate is a dependency-resolution and lifecycle engine for an
//! inversion-of-control container. Components are registered up front as
//! *definitions*: a factory, the types it satisfies, and the scope it lives
//! in. When a [`Context`] is entered, the engine builds a dependency graph
//! over every registered definition, validates it, and constructs instances
//! in a deterministic topological order. When the context exits, instances
//! are torn down in the exact reverse of the order they were constructed.
//!
//! Services are held in thread-safe reference-counted pointers ([`Svc<T>`] is
//! [`Arc<T>`](std::sync::Arc)), and resource acquisition is asynchronous:
//! factories produce [`ScopedResource`] handles whose `enter`/`exit` calls
//! are awaited one at a time, in dependency order.
//!
//! ## Scopes
//!
//! Every definition lives in one of two scopes:
//!
//! - **[Container](Scope::Container):** constructed once, eagerly, when the
//!   context is entered, and torn down when the context exits. This is the
//!   default scope.
//! - **[Function](Scope::Function):** constructed afresh for each function
//!   scope (or each bound-callable invocation) and torn down when that scope
//!   closes.
//!
//! Container-scoped components may only depend on other container-scoped
//! components; this is checked before any factory runs, along with missing
//! dependencies and dependency cycles. A context that fails validation never
//! constructs anything.
//!
//! ## Dependency kinds
//!
//! A factory parameter's type decides how it is resolved:
//!
//! - `Svc<T>`: required, must resolve to exactly one instance (see
//!   [`ResolutionMode`] for relaxing uniqueness),
//! - `Option<Svc<T>>`: zero or one instance, `None` on a miss,
//! - `Vec<Svc<T>>`: every live instance satisfying `T`, possibly empty.
//!
//! ## Interfaces
//!
//! A definition satisfies its concrete type and any trait objects declared
//! via [`Definition::with_interface`]. Traits are marked as injectable with
//! the [`interface!`] macro, and the satisfaction table is built once at
//! registration time; no type-hierarchy probing happens during resolution.
//!
//! ## Example
//!
//! ```
//! use scoped_injector::{
//!     constant, factory, interface, Context, InjectResult, Service, Svc,
//! };
//!
//! struct Config {
//!     url: String,
//! }
//!
//! trait Database: Service {
//!     fn url(&self) -> &str;
//! }
//!
//! struct SqlDatabase {
//!     config: Svc<Config>,
//! }
//!
//! impl Database for SqlDatabase {
//!     fn url(&self) -> &str {
//!         &self.config.url
//!     }
//! }
//!
//! interface!(Database);
//!
//! fn make_database(config: Svc<Config>) -> SqlDatabase {
//!     SqlDatabase { config }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> InjectResult<()> {
//!     let mut builder = Context::builder();
//!     builder.provide(constant(Config {
//!         url: "sqlite::memory:".into(),
//!     }))?;
//!     builder.provide(
//!         factory(make_database).with_interface::<dyn Database>(),
//!     )?;
//!
//!     let mut context = builder.build();
//!     context.enter().await?;
//!
//!     let database: Svc<dyn Database> = context.get_instance()?;
//!     assert_eq!("sqlite::memory:", database.url());
//!
//!     context.exit(None).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Calling functions with injected arguments
//!
//! Arbitrary async functions can be bound to a context with
//! [`Context::bind`]. Each invocation runs a fresh function-scope resolution
//! pass layered on top of the live container-scoped instances, injects the
//! function's parameters, and always tears the function scope down again
//! after the call returns, even when the call fails. Caller-supplied values
//! are threaded through [`Arg<T>`] parameters and are never shadowed by
//! injected ones.

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![warn(missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::needless_doctest_main
)]

mod builder;
mod call;
mod context;
mod definitions;
mod graph;
mod module;
mod requests;
mod resolve;
mod services;
mod validate;

pub use builder::*;
pub use call::*;
pub use context::*;
pub use definitions::*;
pub use module::*;
pub use requests::*;
pub use services::*;

/// Re-exported for implementing [`ScopedResource`] on your own types.
pub use async_trait::async_trait;

#[cfg(test)]
mod tests;
