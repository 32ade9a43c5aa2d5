use crate::{
    config::EngineMode,
    engine::handlers::{
        ExecutionResultUsageHandler, ExecutionStartUsageHandler, Handler, HandlerChain, NoopHandler,
        OpenstackQuotaHandler, ProjectHandler, ResultHandler, SimpleQuotaHandler,
        SimpleUsageHandler,
    },
};

pub fn boxed<H: Handler + 'static>(handler: H) -> Box<dyn Handler> {
    Box::new(handler)
}

/// One pass that waits on every usage operation in turn, then a pass that
/// publishes results.
pub fn simple_chain() -> Vec<HandlerChain> {
    vec![
        vec![
            boxed(NoopHandler),
            boxed(ProjectHandler),
            boxed(OpenstackQuotaHandler),
            boxed(SimpleQuotaHandler),
            boxed(SimpleUsageHandler),
        ],
        vec![boxed(ResultHandler)],
    ]
}

/// Starts all usage operations in one pass and collects them two passes
/// later, so quota collection overlaps with the remote work.
pub fn parallel_chain() -> Vec<HandlerChain> {
    vec![
        vec![boxed(ProjectHandler)],
        vec![boxed(ExecutionStartUsageHandler)],
        vec![boxed(OpenstackQuotaHandler), boxed(SimpleQuotaHandler)],
        vec![boxed(ExecutionResultUsageHandler)],
        vec![boxed(ResultHandler)],
    ]
}

pub fn chain_for_mode(mode: EngineMode) -> Vec<HandlerChain> {
    match mode {
        EngineMode::Simple => simple_chain(),
        EngineMode::Parallel => parallel_chain(),
    }
}
