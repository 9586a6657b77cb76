//! Config provider family (C4): four policies sharing a single-method
//! reader contract, differing in aliasing and concurrency.

use arc_swap::ArcSwap;
use std::any::Any;
use std::sync::{Arc, RwLock};

/// Shared reader contract: `get_config() -> value`.
///
/// All four policies implement this; callers that only need to read hold a
/// `dyn ConfigProvider<T>` and never observe which policy backs it.
pub trait ConfigProvider<T>: Send + Sync {
    fn get_config(&self) -> Arc<T>;
}

/// Recursively duplicates `value`. In Rust, values are not aliased by
/// default, so deep copy reduces to the `Clone` bound: `Vec`/`HashMap`/`Box`/
/// `Option` already clone their owned contents. `Arc`/`Rc` fields clone by
/// reference (shared pointer), matching the spec's own carve-out that
/// channels, functions, and raw pointers are copied by reference rather than
/// duplicated.
pub fn deep_clone<T: Clone>(value: &T) -> T {
    value.clone()
}

/// Returns the same reference each call. No dedicated writer; consumers may
/// mutate the returned value (discouraged), which is not safe under
/// concurrent access — callers needing a writable value should prefer
/// [`CowProvider`] or [`ImmutableProvider`].
#[derive(Debug)]
pub struct SharedProvider<T> {
    value: Arc<T>,
}

impl<T> SharedProvider<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(value),
        }
    }
}

impl<T: Send + Sync> ConfigProvider<T> for SharedProvider<T> {
    fn get_config(&self) -> Arc<T> {
        Arc::clone(&self.value)
    }
}

/// Returns a fresh deep copy on every read; each reader owns its copy and
/// concurrent mutation of returned values can never interfere.
#[derive(Debug)]
pub struct IsolatedProvider<T: Clone> {
    value: T,
}

impl<T: Clone> IsolatedProvider<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + Send + Sync> ConfigProvider<T> for IsolatedProvider<T> {
    fn get_config(&self) -> Arc<T> {
        Arc::new(deep_clone(&self.value))
    }
}

/// Lock-free atomic cell: reads never block and never observe a torn mix of
/// old and new state. `update_config` stores the new value atomically.
#[derive(Debug)]
pub struct ImmutableProvider<T> {
    cell: ArcSwap<T>,
}

impl<T> ImmutableProvider<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: ArcSwap::from_pointee(value),
        }
    }

    pub fn update_config(&self, new_value: T) {
        self.cell.store(Arc::new(new_value));
    }
}

impl<T: Send + Sync> ConfigProvider<T> for ImmutableProvider<T> {
    fn get_config(&self) -> Arc<T> {
        self.cell.load_full()
    }
}

/// `get_config()` returns the current reference under a reader lock;
/// `get_mutable_config()` returns a deep copy disjoint from what any reader
/// sees; `update_original(new)` swaps the canonical value under a writer
/// lock.
#[derive(Debug)]
pub struct CowProvider<T: Clone> {
    current: RwLock<Arc<T>>,
}

impl<T: Clone> CowProvider<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    pub fn get_mutable_config(&self) -> T {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        deep_clone(&guard)
    }

    pub fn update_original(&self, new_value: T) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(new_value);
    }
}

impl<T: Clone + Send + Sync> ConfigProvider<T> for CowProvider<T> {
    fn get_config(&self) -> Arc<T> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }
}

/// Type-erased handle to a `ConfigProvider<T>`, for storage in the
/// heterogeneous `sectionKey -> ConfigProvider` map (§3) and the tenant
/// overlay (§4.9), where `T` differs per section and can't appear in the
/// map's value type directly.
pub trait AnyConfigProvider: Send + Sync {
    fn get_config_any(&self) -> Arc<dyn Any + Send + Sync>;
}

impl<T, P> AnyConfigProvider for P
where
    T: Send + Sync + 'static,
    P: ConfigProvider<T> + 'static,
{
    fn get_config_any(&self) -> Arc<dyn Any + Send + Sync> {
        self.get_config() as Arc<dyn Any + Send + Sync>
    }
}

/// Downcasts an erased provider's current value back to `T`. Returns `None`
/// if the section was registered with a different concrete type than the
/// caller expects.
pub fn downcast_config<T: Send + Sync + 'static>(
    provider: &dyn AnyConfigProvider,
) -> Option<Arc<T>> {
    provider.get_config_any().downcast::<T>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Features {
        flags: std::collections::HashMap<String, bool>,
    }

    fn features(pairs: &[(&str, bool)]) -> Features {
        Features {
            flags: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn shared_returns_identical_reference() {
        let p = SharedProvider::new(features(&[("f1", true)]));
        let a = p.get_config();
        let b = p.get_config();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn isolated_mutation_does_not_leak() {
        let original = features(&[("f1", true)]);
        let p = IsolatedProvider::new(original.clone());
        let a = p.get_config();
        let mut mutated = (*a).clone();
        mutated.flags.insert("f1".into(), false);
        let b = p.get_config();
        assert_eq!(*b, original);
        assert_ne!(mutated, *b);
    }

    #[test]
    fn immutable_update_is_visible_to_subsequent_reads_only() {
        let p = ImmutableProvider::new(features(&[("f1", true)]));
        let before = p.get_config();
        p.update_config(features(&[("f1", false)]));
        let after = p.get_config();
        assert_eq!(*before, features(&[("f1", true)]));
        assert_eq!(*after, features(&[("f1", false)]));
    }

    #[test]
    fn erased_provider_downcasts_to_concrete_type() {
        let p: Arc<dyn AnyConfigProvider> = Arc::new(SharedProvider::new(features(&[("f1", true)])));
        let typed: Arc<Features> = downcast_config(p.as_ref()).expect("downcast");
        assert_eq!(*typed, features(&[("f1", true)]));
    }

    #[test]
    fn cow_get_mutable_is_disjoint_until_committed() {
        let p = CowProvider::new(features(&[("f1", true)]));
        let mut mutable = p.get_mutable_config();
        mutable.flags.insert("f1".into(), false);
        assert_eq!(*p.get_config(), features(&[("f1", true)]));
        p.update_original(mutable);
        assert_eq!(*p.get_config(), features(&[("f1", false)]));
    }
}
