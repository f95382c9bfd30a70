//! Hierarchical dependency injection based on explicit type mappings.
//!
//! An [Injector](injector::Injector) holds a table of [mappings](mapping::InjectionMapping), each
//! binding a type to a strategy deciding how values of that type are produced: a fixed value, a
//! factory function, a new instance per request or a lazily created singleton. Injectors form a tree
//! in which lookups fall back to ancestors, so [sub-injectors](injector::Injector::create_sub_injector)
//! can shadow mappings locally without affecting anything else.
//!
//! Types instantiated by an injector are [Injectable](component::Injectable). Their injection
//! requirements - constructor arguments, injected properties and lifecycle methods - are described
//! by [metadata](metadata::TypeMetadata), which is automatically registered when deriving
//! [Injectable](component::Injectable).
//!
//! ```
//! use keystone_di::injector::Injector;
//! use keystone_di::instance::InstancePtr;
//! use keystone_di::Injectable;
//!
//! trait Greeter {
//!     fn greet(&self) -> String;
//! }
//!
//! #[derive(Injectable)]
//! struct EnglishGreeter;
//!
//! impl Greeter for EnglishGreeter {
//!     fn greet(&self) -> String {
//!         "Hello!".to_string()
//!     }
//! }
//!
//! #[derive(Injectable)]
//! struct Reception {
//!     #[inject]
//!     greeter: InstancePtr<dyn Greeter>,
//! }
//!
//! let injector = Injector::new().unwrap();
//! injector
//!     .map::<dyn Greeter>()
//!     .unwrap()
//!     .to_singleton_as::<dyn Greeter, EnglishGreeter>(|greeter| greeter as InstancePtr<dyn Greeter>)
//!     .unwrap();
//!
//! let reception = injector.instantiate_instance::<Reception>().unwrap();
//! assert_eq!(reception.greeter.greet(), "Hello!");
//! ```
//!
//! ### Features
//!
//! * `derive` - automatically derive [Injectable](component::Injectable) with its metadata
//! (enabled by default)

pub mod component;
pub mod config;
pub mod error;
pub mod event;
pub mod injector;
pub mod instance;
pub mod mapping;
pub mod metadata;

#[cfg(feature = "derive")]
pub use keystone_di_derive::Injectable;
