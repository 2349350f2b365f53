use crate::{Service, Svc};

/// Implemented for trait objects.
pub trait Interface: Service {}

/// Marker trait that indicates that a type is an interface for another type.
///
/// Each `dyn Trait` is an interface for the types that implement it. This
/// trait should usually be implemented by the [`interface!`] macro, and is
/// primarily used to enforce stronger type checking when declaring the
/// satisfied types of a definition.
pub trait InterfaceFor<S>: Interface
where
    S: Service,
{
    #[doc(hidden)]
    fn from_svc(service: Svc<S>) -> Svc<Self>;
}

/// Marks a trait as being an interface for other types. This means that a
/// definition whose concrete type implements the trait can declare it as a
/// satisfied type via [`Definition::with_interface`](crate::Definition::with_interface),
/// and requests for `dyn Trait` can resolve to that definition's instance.
///
/// The trait must be a subtrait of [`Send`] and [`Sync`] so that service
/// pointers can be downcast, and instances of it must have a `'static`
/// lifetime. Both can be had easily by making the trait a subtrait of
/// [`Service`].
///
/// ## Example
///
/// ```
/// use scoped_injector::{interface, Service};
///
/// struct Bar;
///
/// trait Foo: Service {}
/// impl Foo for Bar {}
///
/// // Definitions providing `Bar` can now satisfy `dyn Foo`.
/// interface!(Foo);
/// ```
#[macro_export]
macro_rules! interface {
    ($interface:tt) => {
        impl $crate::Interface for dyn $interface {}

        impl<T: $interface> $crate::InterfaceFor<T> for dyn $interface {
            fn from_svc(service: $crate::Svc<T>) -> $crate::Svc<Self> {
                service
            }
        }
    };
}
