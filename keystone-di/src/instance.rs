//! Instance pointers and type identifiers shared by the whole crate.
//!
//! Every value handed out by an [Injector](crate::injector::Injector) is an [InstancePtr]. Since
//! mappings are stored in a type-erased table, values travel internally as [InstanceAnyPtr]s, which
//! always wrap an `InstancePtr<T>` for the mapped type `T`. This allows mapping unsized types, like
//! `dyn Trait`, the same way as concrete ones.

use crate::error::InjectorError;
use std::any::{type_name, Any, TypeId};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Shared pointer to an injected instance.
pub type InstancePtr<T> = Rc<T>;

/// Type-erased pointer to an injected instance. Contains an `InstancePtr<T>`.
pub type InstanceAnyPtr = Rc<dyn Any>;

/// Identifier of an injectable type, used as the mapping key. Two keys are equal iff they denote
/// the same type; the name is kept for diagnostics only.
#[derive(Clone, Copy, Debug)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for TypeKey {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeKey {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Display for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Erases the type of given instance, so it can be stored in a mapping.
#[inline]
pub fn erase<T: ?Sized + 'static>(instance: InstancePtr<T>) -> InstanceAnyPtr {
    Rc::new(instance) as InstanceAnyPtr
}

/// Restores the type of an instance previously erased with [erase].
pub fn downcast<T: ?Sized + 'static>(
    instance: &InstanceAnyPtr,
) -> Result<InstancePtr<T>, InjectorError> {
    instance
        .downcast_ref::<InstancePtr<T>>()
        .cloned()
        .ok_or_else(|| InjectorError::IncompatibleInstance(TypeKey::of::<T>()))
}

#[cfg(test)]
mod tests {
    use crate::error::InjectorError;
    use crate::instance::{downcast, erase, InstancePtr, TypeKey};
    use std::fmt::Debug;

    trait TestTrait: Debug {
        fn value(&self) -> i8;
    }

    #[derive(Debug)]
    struct TestImpl;

    impl TestTrait for TestImpl {
        fn value(&self) -> i8 {
            5
        }
    }

    #[test]
    fn should_compare_keys_by_type() {
        assert_eq!(TypeKey::of::<i8>(), TypeKey::of::<i8>());
        assert_ne!(TypeKey::of::<i8>(), TypeKey::of::<u8>());
        assert_ne!(TypeKey::of::<dyn TestTrait>(), TypeKey::of::<TestImpl>());
        assert!(TypeKey::of::<dyn TestTrait>().name().contains("TestTrait"));
    }

    #[test]
    fn should_restore_erased_trait_objects() {
        let instance = InstancePtr::new(TestImpl) as InstancePtr<dyn TestTrait>;
        let erased = erase(instance.clone());

        let restored = downcast::<dyn TestTrait>(&erased).unwrap();
        assert_eq!(restored.value(), 5);
        assert!(InstancePtr::ptr_eq(&restored, &instance));
    }

    #[test]
    fn should_reject_incompatible_downcast() {
        let erased = erase(InstancePtr::new(1i8));

        assert_eq!(
            downcast::<u8>(&erased).unwrap_err(),
            InjectorError::IncompatibleInstance(TypeKey::of::<u8>())
        );
    }
}
