//! Infrastructure layer: boundary traits and dependency wiring

pub mod di;
pub mod traits;

pub use di::service_container::ServiceContainer;
pub use traits::{FactoryRegistry, FnFactory, InstanceFactory, FACTORY_REGISTRY_SERVICE};
