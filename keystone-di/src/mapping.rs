//! Mappings bind a type to a resolution strategy, which decides how values are produced:
//!
//! * [value](InjectionMapping::to_value) - always returns the same, given instance
//! * [factory](InjectionMapping::to_factory) - calls a factory function on each request
//! * [type](InjectionMapping::to_type) - instantiates a new [Injectable] on each request
//! * [singleton](InjectionMapping::to_singleton) - instantiates an [Injectable] on first request
//! and reuses it for the remaining lifetime of the mapping
//!
//! Mappings are always created by an [Injector] and belong to it exclusively. A mapping can be
//! [sealed](InjectionMapping::seal), which prevents it from being changed, overridden or removed,
//! until its owning injector is destroyed.

use crate::component::Injectable;
use crate::error::InjectorError;
use crate::injector::{Injector, WeakInjector};
use crate::instance::{erase, InstanceAnyPtr, InstancePtr, TypeKey};
use derivative::Derivative;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

type FactoryFunction = Rc<dyn Fn(&Injector) -> Result<InstanceAnyPtr, InjectorError>>;

/// Credential authorizing unsealing of mappings. Each injector has its own, which cannot be
/// obtained outside this crate.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct SealKey(u64);

impl SealKey {
    pub(crate) fn generate() -> Self {
        static NEXT_KEY: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Derivative, Clone)]
#[derivative(Debug)]
enum ResolutionStrategy {
    Value(InstanceAnyPtr),
    Factory(#[derivative(Debug = "ignore")] FactoryFunction),
    Singleton(#[derivative(Debug = "ignore")] FactoryFunction),
    Injector,
}

#[derive(Derivative)]
#[derivative(Debug)]
struct MappingState {
    owner_type: TypeKey,
    #[derivative(Debug = "ignore")]
    injector: WeakInjector,
    #[derivative(Debug = "ignore")]
    seal_key: SealKey,
    sealed: Cell<bool>,
    destroyed: Cell<bool>,
    strategy: RefCell<Option<ResolutionStrategy>>,
    singleton: RefCell<Option<InstanceAnyPtr>>,
}

/// Binding of a type to a resolution strategy within an [Injector]. See module documentation for
/// details.
#[derive(Clone, Debug)]
pub struct InjectionMapping {
    state: Rc<MappingState>,
}

impl InjectionMapping {
    pub(crate) fn new(owner_type: TypeKey, injector: WeakInjector, seal_key: SealKey) -> Self {
        Self::with_strategy(owner_type, injector, seal_key, None, false)
    }

    /// Creates a sealed mapping resolving to the owning injector itself.
    pub(crate) fn new_injector_mapping(injector: WeakInjector, seal_key: SealKey) -> Self {
        Self::with_strategy(
            TypeKey::of::<Injector>(),
            injector,
            seal_key,
            Some(ResolutionStrategy::Injector),
            true,
        )
    }

    fn with_strategy(
        owner_type: TypeKey,
        injector: WeakInjector,
        seal_key: SealKey,
        strategy: Option<ResolutionStrategy>,
        sealed: bool,
    ) -> Self {
        Self {
            state: Rc::new(MappingState {
                owner_type,
                injector,
                seal_key,
                sealed: Cell::new(sealed),
                destroyed: Cell::new(false),
                strategy: RefCell::new(strategy),
                singleton: Default::default(),
            }),
        }
    }

    /// Type this mapping is registered for.
    #[inline]
    pub fn owner_type(&self) -> TypeKey {
        self.state.owner_type
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.state.sealed.get()
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.state.destroyed.get()
    }

    /// Checks if both handles point to the same mapping.
    #[inline]
    pub fn ptr_eq(&self, other: &InjectionMapping) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Always returns the given value.
    pub fn to_value<T: ?Sized + 'static>(
        &self,
        value: InstancePtr<T>,
    ) -> Result<&Self, InjectorError> {
        self.check_provided_type::<T>()?;
        self.set_strategy(ResolutionStrategy::Value(erase(value)))
    }

    /// Calls given factory on each request. The factory receives the owning injector.
    pub fn to_factory<T, F>(&self, factory: F) -> Result<&Self, InjectorError>
    where
        T: ?Sized + 'static,
        F: Fn(&Injector) -> Result<InstancePtr<T>, InjectorError> + 'static,
    {
        self.check_provided_type::<T>()?;
        self.set_strategy(ResolutionStrategy::Factory(Rc::new(move |injector| {
            factory(injector).map(erase)
        })))
    }

    /// Instantiates a new `C` on each request.
    pub fn to_type<C: Injectable>(&self) -> Result<&Self, InjectorError> {
        self.to_type_as::<C, C>(|instance| instance)
    }

    /// Instantiates a new `C` on each request and casts it to the mapped type, e.g.
    /// `dyn Trait`.
    pub fn to_type_as<T, C>(
        &self,
        cast: fn(InstancePtr<C>) -> InstancePtr<T>,
    ) -> Result<&Self, InjectorError>
    where
        T: ?Sized + 'static,
        C: Injectable,
    {
        self.check_provided_type::<T>()?;
        self.set_strategy(ResolutionStrategy::Factory(Self::instantiating(cast)))
    }

    /// Instantiates `C` on first request and reuses it afterwards.
    pub fn to_singleton<C: Injectable>(&self) -> Result<&Self, InjectorError> {
        self.to_singleton_as::<C, C>(|instance| instance)
    }

    /// Instantiates `C` on first request, casts it to the mapped type, e.g. `dyn Trait`, and reuses
    /// it afterwards.
    pub fn to_singleton_as<T, C>(
        &self,
        cast: fn(InstancePtr<C>) -> InstancePtr<T>,
    ) -> Result<&Self, InjectorError>
    where
        T: ?Sized + 'static,
        C: Injectable,
    {
        self.check_provided_type::<T>()?;
        self.set_strategy(ResolutionStrategy::Singleton(Self::instantiating(cast)))
    }

    /// Prevents the mapping from being changed, overridden or removed.
    pub fn seal(&self) -> Result<&Self, InjectorError> {
        self.check_destroyed()?;
        self.state.sealed.set(true);
        Ok(self)
    }

    /// Unseals the mapping, if given key matches the key of the owning injector.
    pub fn unseal(&self, key: SealKey) -> Result<&Self, InjectorError> {
        self.check_destroyed()?;

        if key != self.state.seal_key {
            return Err(InjectorError::Authorization(self.state.owner_type));
        }

        self.state.sealed.set(false);
        Ok(self)
    }

    /// Returns a value according to the current resolution strategy.
    pub fn injected_value(&self) -> Result<InstanceAnyPtr, InjectorError> {
        self.check_destroyed()?;

        let strategy = self
            .state
            .strategy
            .borrow()
            .clone()
            .ok_or(InjectorError::MissingResolutionStrategy(self.state.owner_type))?;

        trace!("Resolving value for {}", self.state.owner_type);

        match strategy {
            ResolutionStrategy::Value(value) => Ok(value),
            ResolutionStrategy::Factory(factory) => factory(&self.injector()?),
            ResolutionStrategy::Singleton(factory) => {
                if let Some(instance) = self.state.singleton.borrow().as_ref() {
                    return Ok(instance.clone());
                }

                // failed construction leaves the mapping uncached
                let instance = factory(&self.injector()?)?;
                *self.state.singleton.borrow_mut() = Some(instance.clone());

                Ok(instance)
            }
            ResolutionStrategy::Injector => Ok(erase(InstancePtr::new(self.injector()?))),
        }
    }

    pub(crate) fn destroy(&self) {
        self.state.destroyed.set(true);
        self.state.strategy.borrow_mut().take();
        self.state.singleton.borrow_mut().take();
    }

    fn instantiating<T, C>(cast: fn(InstancePtr<C>) -> InstancePtr<T>) -> FactoryFunction
    where
        T: ?Sized + 'static,
        C: Injectable,
    {
        Rc::new(move |injector| {
            injector
                .instantiate_instance::<C>()
                .map(|instance| erase(cast(InstancePtr::new(instance))))
        })
    }

    fn set_strategy(&self, strategy: ResolutionStrategy) -> Result<&Self, InjectorError> {
        self.check_destroyed()?;

        if self.is_sealed() {
            return Err(InjectorError::SealedMappingOverride(self.state.owner_type));
        }

        *self.state.strategy.borrow_mut() = Some(strategy);
        self.state.singleton.borrow_mut().take();

        Ok(self)
    }

    fn check_provided_type<T: ?Sized + 'static>(&self) -> Result<(), InjectorError> {
        let provided = TypeKey::of::<T>();
        if provided != self.state.owner_type {
            return Err(InjectorError::IncompatibleMapping {
                mapped: self.state.owner_type,
                provided,
            });
        }

        Ok(())
    }

    #[inline]
    fn check_destroyed(&self) -> Result<(), InjectorError> {
        if self.is_destroyed() {
            Err(InjectorError::DestroyedMapping(self.state.owner_type))
        } else {
            Ok(())
        }
    }

    #[inline]
    fn injector(&self) -> Result<Injector, InjectorError> {
        self.state
            .injector
            .upgrade()
            .ok_or(InjectorError::DestroyedInjector)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::InjectorError;
    use crate::injector::Injector;
    use crate::instance::{downcast, InstancePtr, TypeKey};
    use crate::mapping::SealKey;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn should_return_fixed_value() {
        let injector = Injector::new().unwrap();
        let value = InstancePtr::new(5i8);

        let mapping = injector.map::<i8>().unwrap();
        mapping.to_value(value.clone()).unwrap();

        let first = downcast::<i8>(&mapping.injected_value().unwrap()).unwrap();
        let second = downcast::<i8>(&mapping.injected_value().unwrap()).unwrap();
        assert!(InstancePtr::ptr_eq(&first, &value));
        assert!(InstancePtr::ptr_eq(&second, &value));
    }

    #[test]
    fn should_call_factory_on_each_request() {
        let injector = Injector::new().unwrap();
        let calls = Rc::new(Cell::new(0));

        let factory_calls = calls.clone();
        let mapping = injector.map::<i8>().unwrap();
        mapping
            .to_factory(move |_| {
                factory_calls.set(factory_calls.get() + 1);
                Ok(InstancePtr::new(1i8))
            })
            .unwrap();

        let first = downcast::<i8>(&mapping.injected_value().unwrap()).unwrap();
        let second = downcast::<i8>(&mapping.injected_value().unwrap()).unwrap();
        assert!(!InstancePtr::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn should_reject_incompatible_value() {
        let injector = Injector::new().unwrap();
        let mapping = injector.map::<i8>().unwrap();

        assert_eq!(
            mapping.to_value(InstancePtr::new(1u8)).unwrap_err(),
            InjectorError::IncompatibleMapping {
                mapped: TypeKey::of::<i8>(),
                provided: TypeKey::of::<u8>(),
            }
        );
    }

    #[test]
    fn should_require_strategy() {
        let injector = Injector::new().unwrap();
        let mapping = injector.map::<i8>().unwrap();

        assert_eq!(
            mapping.injected_value().unwrap_err(),
            InjectorError::MissingResolutionStrategy(TypeKey::of::<i8>())
        );
    }

    #[test]
    fn should_not_change_sealed_mapping() {
        let injector = Injector::new().unwrap();
        let mapping = injector.map::<i8>().unwrap();
        mapping.to_value(InstancePtr::new(1i8)).unwrap().seal().unwrap();

        assert!(mapping.is_sealed());
        assert_eq!(
            mapping.to_value(InstancePtr::new(2i8)).unwrap_err(),
            InjectorError::SealedMappingOverride(TypeKey::of::<i8>())
        );
    }

    #[test]
    fn should_unseal_with_owner_key_only() {
        let injector = Injector::new().unwrap();
        let mapping = injector.map::<i8>().unwrap();
        mapping.seal().unwrap();

        assert_eq!(
            mapping.unseal(SealKey::generate()).unwrap_err(),
            InjectorError::Authorization(TypeKey::of::<i8>())
        );
        assert!(mapping.is_sealed());

        mapping.unseal(injector.seal_key()).unwrap();
        assert!(!mapping.is_sealed());
    }

    #[test]
    fn should_reject_operations_on_destroyed_mapping() {
        let injector = Injector::new().unwrap();
        let mapping = injector.map::<i8>().unwrap();
        mapping.to_value(InstancePtr::new(1i8)).unwrap();

        injector.unmap::<i8>().unwrap();

        assert!(mapping.is_destroyed());
        assert_eq!(
            mapping.injected_value().unwrap_err(),
            InjectorError::DestroyedMapping(TypeKey::of::<i8>())
        );
        assert_eq!(
            mapping.seal().unwrap_err(),
            InjectorError::DestroyedMapping(TypeKey::of::<i8>())
        );
    }

    #[test]
    fn should_generate_distinct_keys() {
        assert_ne!(SealKey::generate(), SealKey::generate());
    }
}
