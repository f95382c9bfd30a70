//! Injectable components are types which the [Injector](crate::injector::Injector) knows how to
//! construct, fill with injected properties and drive through their lifecycle. What exactly needs to
//! be injected is described by [TypeMetadata](crate::metadata::TypeMetadata), while the types
//! themselves expose capabilities needed to apply it: [Injectable::construct] and
//! [InjectionTarget].
//!
//! ## Deriving components
//!
//! For convenience, both traits and the accompanying metadata can be automatically derived, if the
//! `derive` feature is enabled:
//!
//! ```
//! use keystone_di::instance::InstancePtr;
//! use keystone_di::Injectable;
//!
//! #[derive(Default)]
//! struct Logger;
//!
//! #[derive(Injectable, Default)]
//! struct BaseService {
//!     // property injection - filled after construction
//!     #[inject(property, optional)]
//!     logger: Option<InstancePtr<Logger>>,
//! }
//!
//! #[derive(Injectable)]
//! #[injectable(post_construct = ["init"], pre_destroy = ["close"])]
//! struct Service {
//!     // required constructor argument
//!     #[inject]
//!     logger: InstancePtr<Logger>,
//!     // optional constructor argument - None when not mapped
//!     #[inject]
//!     fallback: Option<InstancePtr<Logger>>,
//!     // "base class" whose injection points and lifecycle methods are inherited
//!     #[inject(base)]
//!     base: BaseService,
//!     #[inject(default = "initial_retries")]
//!     retries: u8,
//!     // not injected at all - Default::default()
//!     started: bool,
//! }
//!
//! fn initial_retries() -> u8 {
//!     3
//! }
//!
//! impl Service {
//!     fn init(&mut self) {
//!         self.started = true;
//!     }
//!
//!     fn close(&mut self) {
//!         self.started = false;
//!     }
//! }
//! ```
//!
//! ### Supported `#[injectable]` struct configuration
//!
//! * `post_construct = ["name"]` - methods (`fn(&mut self)`) to call after all properties are
//! injected
//! * `pre_destroy = ["name"]` - methods (`fn(&mut self)`) to call when an instance is destroyed
//!
//! ### Supported `#[inject]` field configuration
//!
//! * no arguments - constructor argument; `InstancePtr<T>` is required, while
//! `Option<InstancePtr<T>>` is optional
//! * `property` - property injection; the field must be an `Option<InstancePtr<T>>`
//! * `property, optional` - optional property injection
//! * `base` - an embedded injectable value (must implement `Default`), which acts as a base type
//! * `default = "expr"` - call `expr()` for initialization
//!
//! Fields without the attribute are initialized with `Default::default()`.

use crate::error::InjectorError;
use crate::instance::{downcast, InstanceAnyPtr, InstancePtr, TypeKey};

/// Capabilities of an already constructed instance, used for property injection and lifecycle
/// methods invocation.
pub trait InjectionTarget: 'static {
    /// Returns the type of this instance, followed by the types of all embedded bases, starting with
    /// the most derived one.
    fn type_chain(&self) -> Vec<TypeKey>;

    /// Assigns an injected value to a property with given name. The value contains an
    /// `InstancePtr<T>` for the type declared in metadata.
    fn inject_property(&mut self, name: &str, value: InstanceAnyPtr) -> Result<(), InjectorError>;

    /// Invokes a lifecycle method with given name.
    fn invoke_lifecycle_method(&mut self, name: &str) -> Result<(), InjectorError>;
}

/// Base trait for types which can be instantiated by an [Injector](crate::injector::Injector).
pub trait Injectable: InjectionTarget + Sized {
    /// Creates an instance using constructor arguments resolved according to metadata.
    fn construct(arguments: ConstructorArguments) -> Result<Self, InjectorError>;
}

#[derive(Clone, Debug)]
struct ResolvedArgument {
    type_key: TypeKey,
    value: Option<InstanceAnyPtr>,
}

/// Constructor arguments resolved in the order declared by
/// [TypeMetadata::constructor_arguments](crate::metadata::TypeMetadata::constructor_arguments).
/// Absent optional dependencies are represented as missing values.
#[derive(Clone, Debug)]
pub struct ConstructorArguments {
    owner: TypeKey,
    arguments: Vec<ResolvedArgument>,
}

impl ConstructorArguments {
    /// Creates an empty argument list for types without metadata.
    pub fn empty(owner: TypeKey) -> Self {
        Self {
            owner,
            arguments: vec![],
        }
    }

    pub(crate) fn push(&mut self, type_key: TypeKey, value: Option<InstanceAnyPtr>) {
        self.arguments.push(ResolvedArgument { type_key, value });
    }

    /// Type which is being constructed.
    #[inline]
    pub fn owner(&self) -> TypeKey {
        self.owner
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Type declared for the argument at given position.
    pub fn type_key(&self, index: usize) -> Option<TypeKey> {
        self.arguments.get(index).map(|argument| argument.type_key)
    }

    /// Returns the argument at given position, failing if it's absent.
    pub fn required<T: ?Sized + 'static>(
        &self,
        index: usize,
    ) -> Result<InstancePtr<T>, InjectorError> {
        self.optional::<T>(index)?
            .ok_or_else(|| InjectorError::MissingDependency {
                dependency: TypeKey::of::<T>(),
                owner: self.owner,
            })
    }

    /// Returns the argument at given position, if present.
    pub fn optional<T: ?Sized + 'static>(
        &self,
        index: usize,
    ) -> Result<Option<InstancePtr<T>>, InjectorError> {
        self.arguments
            .get(index)
            .and_then(|argument| argument.value.as_ref())
            .map(downcast::<T>)
            .transpose()
    }
}
