//! Backend selection: the registry of loaded engines and the loader that fills it.

pub mod loader;
pub mod registry;

pub use loader::{BackendFactory, NativeBackendFactory, load_registry};
pub use registry::{BackendRegistry, EngineKind, HealthStatus};
