pub mod adapters;
pub mod types;
pub mod worklist;

pub use adapters::{
    WorkflowContext, WorkflowNodeInstance, entities_from_deployment, entities_from_workflow,
};
pub use types::{Entity, PropertyBag};
pub use worklist::{EntityIndex, ProjectBacklog, Worklist, WorklistDump};
