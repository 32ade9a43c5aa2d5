pub mod chain;
pub mod context;
pub mod dispatcher;
pub mod extract;
pub mod handlers;

pub use chain::{boxed, chain_for_mode, parallel_chain, simple_chain};
pub use context::{DEFAULT_OPERATION_NAME, RsmContext, ValueKind};
pub use dispatcher::Engine;
pub use extract::{KeyStrategy, extract_values};
pub use handlers::{
    ExecutionResultUsageHandler, ExecutionStartUsageHandler, Handler, HandlerChain, NoopHandler,
    OpenstackQuotaHandler, ProjectHandler, ResultHandler, SimpleQuotaHandler, SimpleUsageHandler,
};
