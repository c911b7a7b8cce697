pub mod driver;
pub mod id;
pub mod registry;
pub mod service;

pub use driver::Driver;
pub use registry::{AgentRegistry, SharedAgentRegistry};
pub use service::AgentService;
