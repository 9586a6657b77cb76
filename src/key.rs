//! Interface tokens for structural (interface-typed) service matching.
//!
//! Rust has no runtime interface table, so modules that provide a service
//! under an interface declare the interfaces they satisfy explicitly at
//! registration time (see Design Notes in SPEC_FULL.md). An `InterfaceKey`
//! is the token a `ServiceConsumer` names when it requires "any service that
//! satisfies `dyn Foo`" rather than a specific name.

use std::any::TypeId;

/// A token identifying a trait (interface) a service instance satisfies.
///
/// Two tokens for the same trait compare equal regardless of where they were
/// constructed, mirroring `ferrous-di`'s `Key::Trait` hot-path equality.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceKey {
    type_id: TypeId,
    name: &'static str,
}

impl InterfaceKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<InterfaceMarker<T>>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The fully-qualified interface type name, used verbatim in cycle-error
    /// annotations (`interface:pkg.Foo`).
    pub fn display_name(&self) -> &'static str {
        self.name
    }
}

// TypeId::of::<dyn Trait>() is not directly nameable pre-stabilization of
// trait object TypeIds in a `const` position usable here; instead each
// interface gets a distinct marker type so TypeId::of is well-defined and
// stable per `T`.
struct InterfaceMarker<T: ?Sized>(std::marker::PhantomData<T>);

impl PartialEq for InterfaceKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}
impl Eq for InterfaceKey {}

impl std::hash::Hash for InterfaceKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}
