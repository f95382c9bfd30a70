//! Functionality related to describing injection requirements of types. An
//! [Injector](crate::injector::Injector) doesn't inspect types by itself - it asks a
//! [MetadataProvider] what needs to be injected. Metadata can be registered automatically, when
//! deriving [Injectable](crate::component::Injectable), or manually.

use crate::error::MetadataRegistryError;
use crate::instance::TypeKey;
use fxhash::FxHashMap;
use itertools::Itertools;
#[cfg(test)]
use mockall::automock;

/// Description of a single constructor argument.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ConstructorArgument {
    pub type_key: TypeKey,
    pub is_optional: bool,
}

/// Description of a property which should be injected after construction.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PropertyInjection {
    pub name: String,
    pub type_key: TypeKey,
    pub is_optional: bool,
}

/// Injection requirements of a single type. Types with embedded bases have one [TypeMetadata] per
/// chain level, which get merged when injecting.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeMetadata {
    pub type_key: TypeKey,

    /// Arguments in the order expected by the constructor.
    pub constructor_arguments: Vec<ConstructorArgument>,

    pub property_injections: Vec<PropertyInjection>,

    /// Methods to call after all properties are injected.
    pub post_construct_methods: Vec<String>,

    /// Methods to call when an instance is about to be discarded.
    pub pre_destroy_methods: Vec<String>,
}

impl TypeMetadata {
    /// Creates metadata without any injection requirements.
    pub fn new(type_key: TypeKey) -> Self {
        Self {
            type_key,
            constructor_arguments: vec![],
            property_injections: vec![],
            post_construct_methods: vec![],
            pre_destroy_methods: vec![],
        }
    }
}

/// Source of [TypeMetadata] consulted by injectors.
#[cfg_attr(test, automock)]
pub trait MetadataProvider {
    /// Checks if there's metadata registered directly for given type.
    fn has_metadata(&self, type_key: TypeKey) -> bool;

    /// Returns metadata registered directly for given type.
    fn type_descriptor(&self, type_key: TypeKey) -> Option<TypeMetadata>;

    /// Returns metadata for every type in given chain (as reported by
    /// [InjectionTarget::type_chain](crate::component::InjectionTarget::type_chain)), starting
    /// with the most derived one. Returns `None` if no type in the chain has metadata.
    fn inherited_metadata(&self, type_chain: &[TypeKey]) -> Option<Vec<TypeMetadata>>;
}

/// Registry of type metadata initialized from statically registered definitions.
#[derive(Clone, Debug, Default)]
pub struct StaticMetadataRegistry {
    metadata: FxHashMap<TypeKey, TypeMetadata>,
    allow_metadata_overriding: bool,
}

impl StaticMetadataRegistry {
    /// Creates a registry containing metadata of all derived injectable types.
    pub fn new(allow_metadata_overriding: bool) -> Result<Self, MetadataRegistryError> {
        let mut registry = Self {
            metadata: Default::default(),
            allow_metadata_overriding,
        };

        for metadata in inventory::iter::<internal::TypeMetadataRegisterer>
            .into_iter()
            .map(|registerer| (registerer.register)())
            .collect_vec()
        {
            registry.register(metadata)?;
        }

        Ok(registry)
    }

    /// Adds metadata for a type. Fails when the type already has metadata and overriding is not
    /// allowed.
    pub fn register(&mut self, metadata: TypeMetadata) -> Result<(), MetadataRegistryError> {
        if !self.allow_metadata_overriding && self.metadata.contains_key(&metadata.type_key) {
            return Err(MetadataRegistryError::DuplicateTypeMetadata(
                metadata.type_key.name().to_string(),
            ));
        }

        self.metadata.insert(metadata.type_key, metadata);
        Ok(())
    }

    /// Returns a copy of all registered metadata.
    #[inline]
    pub fn all_metadata(&self) -> FxHashMap<TypeKey, TypeMetadata> {
        self.metadata.clone()
    }
}

impl MetadataProvider for StaticMetadataRegistry {
    #[inline]
    fn has_metadata(&self, type_key: TypeKey) -> bool {
        self.metadata.contains_key(&type_key)
    }

    #[inline]
    fn type_descriptor(&self, type_key: TypeKey) -> Option<TypeMetadata> {
        self.metadata.get(&type_key).cloned()
    }

    fn inherited_metadata(&self, type_chain: &[TypeKey]) -> Option<Vec<TypeMetadata>> {
        let chain = type_chain
            .iter()
            .filter_map(|type_key| self.metadata.get(type_key))
            .cloned()
            .collect_vec();

        if chain.is_empty() {
            None
        } else {
            Some(chain)
        }
    }
}

#[doc(hidden)]
pub mod internal {
    use crate::metadata::TypeMetadata;
    use inventory::collect;
    pub use inventory::submit;

    pub struct TypeMetadataRegisterer {
        pub register: fn() -> TypeMetadata,
    }

    collect!(TypeMetadataRegisterer);
}
