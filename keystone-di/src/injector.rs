//! Core functionality for resolving dependencies and creating [Injectable] instances.
//!
//! An [Injector] maps types to [InjectionMapping]s, which decide how values are produced. When a
//! type is not mapped directly in an injector, its parent is consulted, and so on, which makes it
//! possible to build hierarchies where [sub-injectors](Injector::create_sub_injector) shadow
//! mappings of their ancestors only for themselves:
//!
//! ```
//! use keystone_di::injector::Injector;
//! use keystone_di::instance::InstancePtr;
//!
//! let injector = Injector::new().unwrap();
//! injector
//!     .map::<String>()
//!     .unwrap()
//!     .to_value(InstancePtr::new("parent".to_string()))
//!     .unwrap()
//!     .seal()
//!     .unwrap();
//!
//! let child = injector.create_sub_injector().unwrap();
//! assert_eq!(*child.get::<String>().unwrap(), "parent");
//!
//! // sealed in the parent, but still possible to shadow in the child
//! child
//!     .map::<String>()
//!     .unwrap()
//!     .to_value(InstancePtr::new("child".to_string()))
//!     .unwrap();
//! assert_eq!(*child.get::<String>().unwrap(), "child");
//! assert_eq!(*injector.get::<String>().unwrap(), "parent");
//! ```
//!
//! Every injector has a sealed mapping of [Injector] to itself, so components can request the
//! injector which created them.

use crate::component::{ConstructorArguments, Injectable, InjectionTarget};
use crate::config::InjectorConfig;
use crate::error::{InjectorError, MetadataRegistryError};
use crate::event::{
    EventDispatcher, MappingEvent, MAPPING_CREATED, MAPPING_DESTROYED, MAPPING_OVERRIDE,
};
use crate::instance::{downcast, InstanceAnyPtr, InstancePtr, TypeKey};
use crate::mapping::{InjectionMapping, SealKey};
use crate::metadata::{MetadataProvider, PropertyInjection, StaticMetadataRegistry, TypeMetadata};
use derivative::Derivative;
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, info, trace, warn};

pub type MetadataProviderPtr = Rc<dyn MetadataProvider>;

/// Builder for [Injector] with sensible defaults, for easy construction.
pub struct InjectorBuilder {
    metadata_provider: MetadataProviderPtr,
    config: InjectorConfig,
}

impl InjectorBuilder {
    /// Creates a new builder with a default configuration and a [StaticMetadataRegistry].
    pub fn new() -> Result<Self, MetadataRegistryError> {
        Ok(Self {
            metadata_provider: Rc::new(StaticMetadataRegistry::new(true)?),
            config: Default::default(),
        })
    }

    /// Sets new [MetadataProvider].
    pub fn with_metadata_provider(mut self, metadata_provider: MetadataProviderPtr) -> Self {
        self.metadata_provider = metadata_provider;
        self
    }

    /// Sets new configuration.
    pub fn with_config(mut self, config: InjectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds resulting root [Injector].
    pub fn build(self) -> Injector {
        Injector::create(None, self.metadata_provider, self.config)
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct InjectorState {
    mappings: RefCell<FxHashMap<TypeKey, InjectionMapping>>,
    parent: Option<Injector>,
    #[derivative(Debug = "ignore")]
    seal_key: SealKey,
    destroyed: Cell<bool>,
    #[derivative(Debug = "ignore")]
    events: EventDispatcher<MappingEvent>,
    #[derivative(Debug = "ignore")]
    metadata_provider: MetadataProviderPtr,
    config: InjectorConfig,
    types_under_construction: RefCell<FxHashSet<TypeKey>>,
}

/// Non-owning handle to an [Injector], held by its mappings.
pub(crate) struct WeakInjector(Weak<InjectorState>);

impl WeakInjector {
    #[inline]
    pub(crate) fn upgrade(&self) -> Option<Injector> {
        self.0.upgrade().map(|state| Injector { state })
    }
}

struct ConstructionGuard<'a> {
    types_under_construction: &'a RefCell<FxHashSet<TypeKey>>,
    type_key: TypeKey,
}

impl<'a> ConstructionGuard<'a> {
    fn enter(
        types_under_construction: &'a RefCell<FxHashSet<TypeKey>>,
        type_key: TypeKey,
    ) -> Result<Self, InjectorError> {
        if !types_under_construction.borrow_mut().insert(type_key) {
            return Err(InjectorError::DependencyCycle(type_key));
        }

        Ok(Self {
            types_under_construction,
            type_key,
        })
    }
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        self.types_under_construction
            .borrow_mut()
            .remove(&self.type_key);
    }
}

/// Dependency provider owning a table of [InjectionMapping]s, with an optional parent for
/// mappings not present directly. Cloning produces another handle to the same injector. See module
/// documentation for details.
#[derive(Clone, Debug)]
pub struct Injector {
    state: Rc<InjectorState>,
}

impl Injector {
    /// Creates a new root injector with default configuration.
    pub fn new() -> Result<Self, MetadataRegistryError> {
        InjectorBuilder::new().map(InjectorBuilder::build)
    }

    fn create(
        parent: Option<Injector>,
        metadata_provider: MetadataProviderPtr,
        config: InjectorConfig,
    ) -> Self {
        let injector = Self {
            state: Rc::new(InjectorState {
                mappings: Default::default(),
                parent,
                seal_key: SealKey::generate(),
                destroyed: Cell::new(false),
                events: Default::default(),
                metadata_provider,
                config,
                types_under_construction: Default::default(),
            }),
        };

        let mapping =
            InjectionMapping::new_injector_mapping(injector.downgrade(), injector.state.seal_key);
        injector
            .state
            .mappings
            .borrow_mut()
            .insert(mapping.owner_type(), mapping);

        injector
    }

    /// Parent injector used for mappings not present in this one.
    #[inline]
    pub fn parent(&self) -> Option<&Injector> {
        self.state.parent.as_ref()
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.state.destroyed.get()
    }

    /// Channel announcing [MappingEvent]s.
    #[inline]
    pub fn events(&self) -> &EventDispatcher<MappingEvent> {
        &self.state.events
    }

    #[inline]
    pub fn config(&self) -> &InjectorConfig {
        &self.state.config
    }

    /// Checks if both handles point to the same injector.
    #[inline]
    pub fn ptr_eq(&self, other: &Injector) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    #[inline]
    pub(crate) fn seal_key(&self) -> SealKey {
        self.state.seal_key
    }

    #[inline]
    pub(crate) fn downgrade(&self) -> WeakInjector {
        WeakInjector(Rc::downgrade(&self.state))
    }

    /// Creates a new injector with this one as its parent. The child shares configuration and
    /// metadata with the parent.
    pub fn create_sub_injector(&self) -> Result<Injector, InjectorError> {
        self.check_destroyed()?;

        debug!("Creating sub-injector.");

        Ok(Self::create(
            Some(self.clone()),
            self.state.metadata_provider.clone(),
            self.state.config.clone(),
        ))
    }

    /// Maps given type, returning the new mapping for configuration. An existing unsealed mapping
    /// gets replaced.
    #[inline]
    pub fn map<T: ?Sized + 'static>(&self) -> Result<InjectionMapping, InjectorError> {
        self.map_by_key(TypeKey::of::<T>())
    }

    /// Type-erased version of [Injector::map].
    pub fn map_by_key(&self, type_key: TypeKey) -> Result<InjectionMapping, InjectorError> {
        self.check_destroyed()?;

        if let Some(existing) = self.direct_mapping(type_key) {
            if existing.is_sealed() {
                return Err(InjectorError::SealedMappingOverride(type_key));
            }

            if !self.state.config.allow_mapping_override {
                return Err(InjectorError::MappingOverrideDisallowed(type_key));
            }

            if self.state.config.warn_on_mapping_override {
                warn!("Overriding existing mapping of type {type_key}.");
            }

            if self.state.events.has_event_listener(MAPPING_OVERRIDE) {
                self.state.events.notify(&MappingEvent::new(
                    MAPPING_OVERRIDE,
                    type_key,
                    existing,
                ));
            }

            self.unmap_by_key(type_key)?;
        }

        let mapping = InjectionMapping::new(type_key, self.downgrade(), self.state.seal_key);
        self.state
            .mappings
            .borrow_mut()
            .insert(type_key, mapping.clone());

        debug!("Mapped type {type_key}.");

        self.state.events.notify(&MappingEvent::new(
            MAPPING_CREATED,
            type_key,
            mapping.clone(),
        ));

        Ok(mapping)
    }

    /// Removes the direct mapping of given type.
    #[inline]
    pub fn unmap<T: ?Sized + 'static>(&self) -> Result<(), InjectorError> {
        self.unmap_by_key(TypeKey::of::<T>())
    }

    /// Type-erased version of [Injector::unmap].
    pub fn unmap_by_key(&self, type_key: TypeKey) -> Result<(), InjectorError> {
        self.check_destroyed()?;

        let mapping = self
            .direct_mapping(type_key)
            .ok_or(InjectorError::UnknownMapping(type_key))?;

        if mapping.is_sealed() {
            return Err(InjectorError::SealedMappingRemoval(type_key));
        }

        mapping.destroy();
        self.state.mappings.borrow_mut().remove(&type_key);

        debug!("Unmapped type {type_key}.");

        self.state
            .events
            .notify(&MappingEvent::new(MAPPING_DESTROYED, type_key, mapping));

        Ok(())
    }

    /// Checks if this injector has its own mapping for given type.
    #[inline]
    pub fn has_direct_mapping<T: ?Sized + 'static>(&self) -> Result<bool, InjectorError> {
        self.has_direct_mapping_by_key(TypeKey::of::<T>())
    }

    /// Type-erased version of [Injector::has_direct_mapping].
    pub fn has_direct_mapping_by_key(&self, type_key: TypeKey) -> Result<bool, InjectorError> {
        self.check_destroyed()?;
        Ok(self.state.mappings.borrow().contains_key(&type_key))
    }

    /// Checks if this injector or any of its ancestors has a mapping for given type.
    #[inline]
    pub fn has_mapping<T: ?Sized + 'static>(&self) -> Result<bool, InjectorError> {
        self.has_mapping_by_key(TypeKey::of::<T>())
    }

    /// Type-erased version of [Injector::has_mapping].
    pub fn has_mapping_by_key(&self, type_key: TypeKey) -> Result<bool, InjectorError> {
        self.check_destroyed()?;

        let mut injector = Some(self);
        while let Some(current) = injector {
            if current.has_direct_mapping_by_key(type_key)? {
                return Ok(true);
            }

            injector = current.parent();
        }

        Ok(false)
    }

    /// Returns the mapping for given type from exactly this injector. Ancestors are not searched,
    /// which prevents accidental changes of their mappings, when only this injector should be
    /// affected.
    #[inline]
    pub fn mapping<T: ?Sized + 'static>(&self) -> Result<InjectionMapping, InjectorError> {
        self.mapping_by_key(TypeKey::of::<T>())
    }

    /// Type-erased version of [Injector::mapping].
    pub fn mapping_by_key(&self, type_key: TypeKey) -> Result<InjectionMapping, InjectorError> {
        self.check_destroyed()?;
        self.direct_mapping(type_key)
            .ok_or(InjectorError::UnknownMapping(type_key))
    }

    /// Returns a value for given type from the nearest injector, starting with this one, which has
    /// a mapping for it.
    pub fn get<T: ?Sized + 'static>(&self) -> Result<InstancePtr<T>, InjectorError> {
        self.get_by_key(TypeKey::of::<T>())
            .and_then(|instance| downcast(&instance))
    }

    /// Type-erased version of [Injector::get]. The result contains an `InstancePtr<T>`.
    pub fn get_by_key(&self, type_key: TypeKey) -> Result<InstanceAnyPtr, InjectorError> {
        self.check_destroyed()?;

        if !self.has_mapping_by_key(type_key)? {
            return Err(InjectorError::UnknownMapping(type_key));
        }

        let mut injector = Some(self);
        while let Some(current) = injector {
            if current.has_direct_mapping_by_key(type_key)? {
                return current.mapping_by_key(type_key)?.injected_value();
            }

            injector = current.parent();
        }

        Err(InjectorError::UnknownMapping(type_key))
    }

    /// Creates an instance of given type with constructor arguments and properties injected
    /// according to its metadata. Post-construct methods are called after injection.
    pub fn instantiate_instance<C: Injectable>(&self) -> Result<C, InjectorError> {
        self.check_destroyed()?;

        let type_key = TypeKey::of::<C>();
        let _guard = ConstructionGuard::enter(&self.state.types_under_construction, type_key)?;

        trace!("Instantiating {type_key}.");

        // even without own metadata, an instance might have injectable bases
        let arguments = match self.state.metadata_provider.type_descriptor(type_key) {
            Some(metadata) => self.resolve_constructor_arguments(type_key, &metadata)?,
            None => ConstructorArguments::empty(type_key),
        };

        let mut instance = C::construct(arguments)?;
        self.inject_into(&mut instance)?;

        Ok(instance)
    }

    /// Injects properties described by the metadata of the target and its bases, and calls
    /// post-construct methods afterwards. Targets without metadata are left untouched.
    pub fn inject_into(&self, target: &mut dyn InjectionTarget) -> Result<(), InjectorError> {
        self.check_destroyed()?;

        let type_chain = target.type_chain();
        let Some(&owner) = type_chain.first() else {
            return Ok(());
        };

        let Some(inherited_metadata) = self
            .state
            .metadata_provider
            .inherited_metadata(&type_chain)
        else {
            return Ok(());
        };

        for injection in merge_property_injections(&inherited_metadata) {
            let is_present = self.has_mapping_by_key(injection.type_key)?;
            if !is_present && !injection.is_optional {
                return Err(InjectorError::MissingDependency {
                    dependency: injection.type_key,
                    owner,
                });
            }

            if is_present {
                target.inject_property(&injection.name, self.get_by_key(injection.type_key)?)?;
            }
        }

        for method in merge_methods(&inherited_metadata, |metadata| {
            &metadata.post_construct_methods
        }) {
            trace!("Calling post-construct method {method} of {owner}.");
            target.invoke_lifecycle_method(&method)?;
        }

        Ok(())
    }

    /// Calls pre-destroy methods described by the metadata of the target and its bases. Mappings
    /// are not affected.
    pub fn destroy_instance(&self, target: &mut dyn InjectionTarget) -> Result<(), InjectorError> {
        self.check_destroyed()?;

        let type_chain = target.type_chain();
        let Some(inherited_metadata) = self
            .state
            .metadata_provider
            .inherited_metadata(&type_chain)
        else {
            return Ok(());
        };

        for method in merge_methods(&inherited_metadata, |metadata| &metadata.pre_destroy_methods) {
            trace!("Calling pre-destroy method {method}.");
            target.invoke_lifecycle_method(&method)?;
        }

        Ok(())
    }

    /// Removes all direct mappings, including sealed ones, and marks this injector as destroyed.
    /// Any further operation will fail. Sub-injectors are not destroyed.
    pub fn destroy(&self) -> Result<(), InjectorError> {
        self.check_destroyed()?;

        // listeners of destroyed mappings can still map new types
        loop {
            let next = self.state.mappings.borrow().values().next().cloned();
            let Some(mapping) = next else {
                break;
            };

            if mapping.is_sealed() {
                mapping.unseal(self.state.seal_key)?;
            }

            self.unmap_by_key(mapping.owner_type())?;
        }

        self.state.destroyed.set(true);

        info!("Injector destroyed.");

        Ok(())
    }

    fn resolve_constructor_arguments(
        &self,
        owner: TypeKey,
        metadata: &TypeMetadata,
    ) -> Result<ConstructorArguments, InjectorError> {
        let mut arguments = ConstructorArguments::empty(owner);

        for argument in &metadata.constructor_arguments {
            let is_present = self.has_mapping_by_key(argument.type_key)?;
            if !is_present && !argument.is_optional {
                return Err(InjectorError::MissingDependency {
                    dependency: argument.type_key,
                    owner,
                });
            }

            let value = if is_present {
                Some(self.get_by_key(argument.type_key)?)
            } else {
                None
            };

            arguments.push(argument.type_key, value);
        }

        Ok(arguments)
    }

    #[inline]
    fn direct_mapping(&self, type_key: TypeKey) -> Option<InjectionMapping> {
        self.state.mappings.borrow().get(&type_key).cloned()
    }

    #[inline]
    fn check_destroyed(&self) -> Result<(), InjectorError> {
        if self.is_destroyed() {
            Err(InjectorError::DestroyedInjector)
        } else {
            Ok(())
        }
    }
}

/// Joins property injections from all levels. The first definition of a name wins, unless a later
/// one is optional - then the injection becomes optional.
fn merge_property_injections(inherited_metadata: &[TypeMetadata]) -> Vec<PropertyInjection> {
    let mut injections: Vec<PropertyInjection> = vec![];
    let mut positions: FxHashMap<&str, usize> = Default::default();

    for injection in inherited_metadata
        .iter()
        .flat_map(|metadata| metadata.property_injections.iter())
    {
        if let Some(&position) = positions.get(injection.name.as_str()) {
            if injection.is_optional && !injections[position].is_optional {
                injections[position] = injection.clone();
            }
        } else {
            positions.insert(&injection.name, injections.len());
            injections.push(injection.clone());
        }
    }

    injections
}

fn merge_methods<F>(inherited_metadata: &[TypeMetadata], methods: F) -> Vec<String>
where
    F: Fn(&TypeMetadata) -> &Vec<String>,
{
    inherited_metadata
        .iter()
        .flat_map(|metadata| methods(metadata).iter())
        .unique()
        .cloned()
        .collect_vec()
}
