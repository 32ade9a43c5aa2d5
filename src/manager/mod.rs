pub mod ports;
pub mod rest;
pub mod testing;
pub mod types;

pub use ports::ManagerPort;
pub use rest::RestManagerClient;
pub use testing::{ExecutionScript, InMemoryManager, ManagerCall};
pub use types::{Execution, ExecutionRequest, Node, NodeInstance, NodeInstanceUpdate};
