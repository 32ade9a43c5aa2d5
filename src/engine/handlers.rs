use async_trait::async_trait;
use serde_json::Value;

use crate::{
    engine::{
        context::{RsmContext, ValueKind},
        extract::{KeyStrategy, SYSTEM_NAME_OPENSTACK, extract_values},
    },
    entity::types::{
        NODE_TYPE_PROJECT, NODE_TYPE_QUOTA, NODE_TYPE_RESULT, NODE_TYPE_USAGE, PropertyBag,
    },
    error::RsmError,
    resources::key::GLOBAL_PROJECT,
};

/// One step of a handler chain. The dispatcher calls `handle` on the first
/// handler whose `can_handle` accepts the current entity.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_handle(&self, ctx: &RsmContext) -> bool;

    async fn handle(&self, ctx: &mut RsmContext) -> Result<(), RsmError>;
}

pub type HandlerChain = Vec<Box<dyn Handler>>;

fn current_type_is(ctx: &RsmContext, entity_type: &str) -> bool {
    ctx.current().is_ok_and(|entity| entity.is_of_type(entity_type))
}

/// Records every value `bag` yields for the current entity.
fn collect_values(
    ctx: &mut RsmContext,
    bag: &PropertyBag,
    kind: ValueKind,
    strategy: &KeyStrategy,
) -> Result<usize, RsmError> {
    let entity = ctx.current()?;
    if entity.system_name().is_none() {
        tracing::warn!(
            target: "rsm.handler",
            entity_id = %entity.id(),
            kind = kind.as_str(),
            "entity_without_system_name"
        );
        return Ok(0);
    }

    let values = extract_values(entity, bag, strategy);
    let recorded = values.len();
    for (resource_name, amount) in values {
        ctx.record(kind, &resource_name, amount)?;
    }
    Ok(recorded)
}

/// Folds a usage operation result into the current entity and the ledger.
/// An empty result means the wait timed out, so usage stays unknown.
fn fold_usage_result(ctx: &mut RsmContext, result: PropertyBag) -> Result<(), RsmError> {
    if result.is_empty() {
        tracing::warn!(
            target: "rsm.handler",
            entity_id = %ctx.current()?.id(),
            "usage_result_empty"
        );
        return Ok(());
    }

    ctx.set_current_runtime_properties(result.clone())?;
    collect_values(ctx, &result, ValueKind::Usage, &KeyStrategy::GENERAL)?;
    Ok(())
}

/// Catches entities without a resource-management type.
pub struct NoopHandler;

#[async_trait]
impl Handler for NoopHandler {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn can_handle(&self, ctx: &RsmContext) -> bool {
        ctx.current().is_ok_and(|entity| entity.entity_type().is_none())
    }

    async fn handle(&self, ctx: &mut RsmContext) -> Result<(), RsmError> {
        tracing::info!(
            target: "rsm.handler",
            entity_id = %ctx.current()?.id(),
            "entity_type_not_supported"
        );
        Ok(())
    }
}

/// Discovers child projects. Only entities of the global project are
/// resolved, so discovery never goes deeper than one level.
pub struct ProjectHandler;

#[async_trait]
impl Handler for ProjectHandler {
    fn name(&self) -> &'static str {
        "project"
    }

    fn can_handle(&self, ctx: &RsmContext) -> bool {
        current_type_is(ctx, NODE_TYPE_PROJECT)
            && ctx
                .current_project()
                .is_ok_and(|project| project == GLOBAL_PROJECT)
    }

    async fn handle(&self, ctx: &mut RsmContext) -> Result<(), RsmError> {
        ctx.resolve_project().await?;
        Ok(())
    }
}

pub struct SimpleQuotaHandler;

#[async_trait]
impl Handler for SimpleQuotaHandler {
    fn name(&self) -> &'static str {
        "simple_quota"
    }

    fn can_handle(&self, ctx: &RsmContext) -> bool {
        current_type_is(ctx, NODE_TYPE_QUOTA)
    }

    async fn handle(&self, ctx: &mut RsmContext) -> Result<(), RsmError> {
        let runtime_properties = ctx.current()?.runtime_properties().clone();
        collect_values(
            ctx,
            &runtime_properties,
            ValueKind::Quota,
            &KeyStrategy::GENERAL,
        )?;
        Ok(())
    }
}

/// Quota entities of OpenStack systems, whose quota sets are nested per
/// service component.
pub struct OpenstackQuotaHandler;

#[async_trait]
impl Handler for OpenstackQuotaHandler {
    fn name(&self) -> &'static str {
        "openstack_quota"
    }

    fn can_handle(&self, ctx: &RsmContext) -> bool {
        current_type_is(ctx, NODE_TYPE_QUOTA)
            && ctx.current().is_ok_and(|entity| {
                entity
                    .system_name()
                    .is_some_and(|name| name.contains(SYSTEM_NAME_OPENSTACK))
            })
    }

    async fn handle(&self, ctx: &mut RsmContext) -> Result<(), RsmError> {
        let runtime_properties = ctx.current()?.runtime_properties().clone();
        collect_values(
            ctx,
            &runtime_properties,
            ValueKind::Quota,
            &KeyStrategy::OPENSTACK,
        )?;
        Ok(())
    }
}

/// Starts the usage operation and waits for it before moving on.
pub struct SimpleUsageHandler;

#[async_trait]
impl Handler for SimpleUsageHandler {
    fn name(&self) -> &'static str {
        "simple_usage"
    }

    fn can_handle(&self, ctx: &RsmContext) -> bool {
        current_type_is(ctx, NODE_TYPE_USAGE)
    }

    async fn handle(&self, ctx: &mut RsmContext) -> Result<(), RsmError> {
        let result = ctx.run_execution(true).await?.unwrap_or_default();
        fold_usage_result(ctx, result)
    }
}

pub struct ExecutionStartUsageHandler;

#[async_trait]
impl Handler for ExecutionStartUsageHandler {
    fn name(&self) -> &'static str {
        "execution_start_usage"
    }

    fn can_handle(&self, ctx: &RsmContext) -> bool {
        current_type_is(ctx, NODE_TYPE_USAGE)
    }

    async fn handle(&self, ctx: &mut RsmContext) -> Result<(), RsmError> {
        ctx.run_execution(false).await?;
        Ok(())
    }
}

pub struct ExecutionResultUsageHandler;

#[async_trait]
impl Handler for ExecutionResultUsageHandler {
    fn name(&self) -> &'static str {
        "execution_result_usage"
    }

    fn can_handle(&self, ctx: &RsmContext) -> bool {
        current_type_is(ctx, NODE_TYPE_USAGE)
    }

    async fn handle(&self, ctx: &mut RsmContext) -> Result<(), RsmError> {
        let result = ctx.execution_result().await?;
        match result {
            Some(result) => fold_usage_result(ctx, result),
            None => {
                tracing::warn!(
                    target: "rsm.handler",
                    entity_id = %ctx.current()?.id(),
                    "usage_execution_not_started"
                );
                Ok(())
            }
        }
    }
}

/// Marks result entities and publishes the diagnostic dump to them.
pub struct ResultHandler;

#[async_trait]
impl Handler for ResultHandler {
    fn name(&self) -> &'static str {
        "result"
    }

    fn can_handle(&self, ctx: &RsmContext) -> bool {
        current_type_is(ctx, NODE_TYPE_RESULT)
    }

    async fn handle(&self, ctx: &mut RsmContext) -> Result<(), RsmError> {
        let entity_id = ctx.current()?.id().to_string();
        ctx.add_result_entity(&entity_id);

        let data = single_property("data", ctx.dump());
        ctx.set_runtime_properties(&entity_id, data).await?;

        tracing::info!(
            target: "rsm.handler",
            entity_id = %entity_id,
            "result_data_published"
        );
        Ok(())
    }
}

pub(crate) fn single_property(name: &str, value: Value) -> PropertyBag {
    let mut properties = PropertyBag::new();
    properties.insert(name.to_string(), value);
    properties
}
