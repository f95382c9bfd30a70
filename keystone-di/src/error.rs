use crate::instance::TypeKey;
use thiserror::Error;

/// Errors related to managing mappings and creating instances.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum InjectorError {
    #[error("Injector instance is already destroyed!")]
    DestroyedInjector,
    #[error("Mapping of type {0} is already destroyed!")]
    DestroyedMapping(TypeKey),
    #[error("Sealed mapping of type {0} override is attempted!")]
    SealedMappingOverride(TypeKey),
    #[error("Cannot unmap sealed mapping of type: {0}!")]
    SealedMappingRemoval(TypeKey),
    #[error("Overriding existing mapping of type {0} is not allowed!")]
    MappingOverrideDisallowed(TypeKey),
    #[error("No mapping could be located for {0}")]
    UnknownMapping(TypeKey),
    #[error("Dependency of type: {dependency} for {owner} could not be found in Injector!")]
    MissingDependency { dependency: TypeKey, owner: TypeKey },
    #[error("Unauthorized attempt to unseal mapping of type: {0}")]
    Authorization(TypeKey),
    #[error("Mapping of type {0} has no resolution strategy")]
    MissingResolutionStrategy(TypeKey),
    #[error("Cannot provide value of type {provided} for mapping of type {mapped}")]
    IncompatibleMapping { mapped: TypeKey, provided: TypeKey },
    #[error("Tried to downcast instance to incompatible type: {0}")]
    IncompatibleInstance(TypeKey),
    #[error("Detected dependency cycle for: {0}")]
    DependencyCycle(TypeKey),
    #[error("Type {target} has no injection point named: {name}")]
    UnknownInjectionPoint { target: TypeKey, name: String },
    #[error("Type {target} has no lifecycle method named: {name}")]
    UnknownLifecycleMethod { target: TypeKey, name: String },
    #[error("Error constructing {target}: {reason}")]
    ConstructionFailed { target: TypeKey, reason: String },
}

/// Errors related to dispatching events.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum EventDispatcherError {
    #[error("Event type cannot be empty")]
    InvalidEventType,
}

/// Errors related to metadata registries.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum MetadataRegistryError {
    #[error("Attempted to re-register metadata for type: {0}")]
    DuplicateTypeMetadata(String),
}
