//local shortcuts
use crate::*;

//third-party shortcuts
use async_trait::async_trait;

//standard shortcuts
use std::collections::HashMap;
use std::time::SystemTime;

//-------------------------------------------------------------------------------------------------------------------

/// Which chain a [`MiddlewareContext`] is travelling through.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Direction
{
    Send,
    Receive,
}

//-------------------------------------------------------------------------------------------------------------------

/// Mutable state threaded through one middleware chain invocation.
#[derive(Debug, Clone)]
pub struct MiddlewareContext
{
    pub data        : serde_json::Value,
    pub direction   : Direction,
    pub msg_type    : Option<String>,
    pub id          : Option<String>,
    pub timestamp   : SystemTime,
    pub meta        : HashMap<String, serde_json::Value>,
    /// When set `true` by a middleware, no further middleware or terminal action runs; the call completes normally.
    pub should_skip : bool,
}

impl MiddlewareContext
{
    /// Start a new context for `data` travelling in `direction`.
    pub fn new(data: serde_json::Value, direction: Direction) -> Self
    {
        let msg_type = data.get("type").and_then(|v| v.as_str()).map(str::to_string);
        let id = data.get("id").and_then(|v| v.as_str()).map(str::to_string);
        Self{ data, direction, msg_type, id, timestamp: SystemTime::now(), meta: HashMap::new(), should_skip: false }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// One layer of the onion-model middleware chain.
///
/// Implementations do pre-work, call `next`, then do post-work on unwind — the classic onion model. A middleware
/// that wants to short-circuit the chain sets `ctx.should_skip = true` instead of calling `next`.
#[async_trait]
pub trait Middleware: Send + Sync
{
    /// Process `ctx`, then call `next(ctx)` to continue the chain (or don't, to stop it).
    async fn handle(
        &self,
        ctx  : MiddlewareContext,
        next : NextFn<'_>,
    ) -> Result<MiddlewareContext, RuntimeError>;
}

/// The continuation passed to a [`Middleware`]; calling it runs the remainder of the chain.
pub type NextFn<'a> = Box<
    dyn FnOnce(MiddlewareContext) -> futures_next::BoxFuture<'a, Result<MiddlewareContext, RuntimeError>> + Send + 'a
>;

/// A tiny boxed-future alias so this module doesn't need a dependency on the `futures` crate just for one type.
mod futures_next
{
    pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
}

//-------------------------------------------------------------------------------------------------------------------

/// Two independent middleware chains: `send` and `receive`.
///
/// Execution is folded into an indexed driver rather than literal recursive closures, so the native call stack
/// depth is bounded by the driver's own recursion (one frame per layer, same as the logical chain depth) and
/// cancellation / `should_skip` are observable at every layer boundary.
#[derive(Default)]
pub struct MiddlewarePipeline
{
    send_chain    : Vec<std::sync::Arc<dyn Middleware>>,
    receive_chain : Vec<std::sync::Arc<dyn Middleware>>,
}

impl std::fmt::Debug for MiddlewarePipeline
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("MiddlewarePipeline")
            .field("send_len", &self.send_chain.len())
            .field("receive_len", &self.receive_chain.len())
            .finish()
    }
}

impl MiddlewarePipeline
{
    /// Make an empty pipeline.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Register `mw` on both the send and receive chains.
    pub fn use_middleware(&mut self, mw: std::sync::Arc<dyn Middleware>)
    {
        self.send_chain.push(mw.clone());
        self.receive_chain.push(mw);
    }

    /// Register `mw` on the send chain only.
    pub fn use_send(&mut self, mw: std::sync::Arc<dyn Middleware>)
    {
        self.send_chain.push(mw);
    }

    /// Register `mw` on the receive chain only.
    pub fn use_receive(&mut self, mw: std::sync::Arc<dyn Middleware>)
    {
        self.receive_chain.push(mw);
    }

    /// Run the send chain, then `terminal` unless a middleware set `should_skip`.
    ///
    /// Returns `Ok(None)` if the chain was skipped (terminal action did not run); `Ok(Some(ctx))` with the final
    /// context otherwise.
    pub async fn run_send(&self, ctx: MiddlewareContext) -> Result<Option<MiddlewareContext>, RuntimeError>
    {
        Self::drive(&self.send_chain, 0, ctx).await
    }

    /// Run the receive chain. The terminal action is a no-op; the caller reads `ctx.data` from the result.
    pub async fn run_receive(&self, ctx: MiddlewareContext) -> Result<Option<MiddlewareContext>, RuntimeError>
    {
        Self::drive(&self.receive_chain, 0, ctx).await
    }

    fn drive<'a>(
        chain : &'a [std::sync::Arc<dyn Middleware>],
        index : usize,
        ctx   : MiddlewareContext,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Option<MiddlewareContext>, RuntimeError>> + Send + 'a>>
    {
        Box::pin(async move
        {
            if ctx.should_skip { return Ok(None); }

            let Some(layer) = chain.get(index) else { return Ok(Some(ctx)); };

            let next: NextFn<'a> = Box::new(move |ctx: MiddlewareContext|
            {
                Box::pin(async move
                {
                    match Self::drive(chain, index + 1, ctx).await?
                    {
                        Some(ctx) => Ok(ctx),
                        // downstream skipped; surface as an internal sentinel by reusing should_skip
                        None => Ok(MiddlewareContext{ should_skip: true, ..MiddlewareContext::new(serde_json::Value::Null, Direction::Send) }),
                    }
                })
            });

            let result = layer.handle(ctx, next).await?;
            if result.should_skip { return Ok(None); }
            Ok(Some(result))
        })
    }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------
