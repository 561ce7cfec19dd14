//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// One registered route: a dot-segmented pattern, its handler, and ordering metadata.
struct RouteEntry
{
    pattern  : String,
    segments : Vec<String>,
    priority : i32,
    once     : bool,
    handler  : Box<dyn Fn(&serde_json::Value) + Send + Sync>,
}

impl std::fmt::Debug for RouteEntry
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("RouteEntry")
            .field("pattern", &self.pattern)
            .field("priority", &self.priority)
            .field("once", &self.once)
            .finish()
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Pattern- and channel-based fan-out of inbound messages.
///
/// A message is classified by its `type` field (matched against registered dot-segmented patterns) and an optional
/// `channel` field (gated by subscription). `*` matches exactly one segment; `**` matches any number of segments
/// (including zero). Routes fire in descending priority order, ties broken by registration order; `once` routes
/// self-remove after their first invocation. A handler that panics is isolated and does not stop later handlers.
#[derive(Default)]
pub struct Router
{
    routes        : Vec<RouteEntry>,
    subscriptions : std::collections::HashSet<String>,
    default       : Option<Box<dyn Fn(&serde_json::Value) + Send + Sync>>,
    next_seq      : u64,
}

impl std::fmt::Debug for Router
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Router")
            .field("route_count", &self.routes.len())
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

impl Router
{
    /// Make a new, empty router.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Register `handler` on `pattern` at `priority` (higher runs first; ties resolve to insertion order).
    pub fn on(&mut self, pattern: impl Into<String>, priority: i32, handler: impl Fn(&serde_json::Value) + Send + Sync + 'static)
    {
        self.insert(pattern.into(), priority, false, Box::new(handler));
    }

    /// Register `handler` on `pattern`, removed automatically after its first invocation.
    pub fn once(&mut self, pattern: impl Into<String>, priority: i32, handler: impl Fn(&serde_json::Value) + Send + Sync + 'static)
    {
        self.insert(pattern.into(), priority, true, Box::new(handler));
    }

    fn insert(&mut self, pattern: String, priority: i32, once: bool, handler: Box<dyn Fn(&serde_json::Value) + Send + Sync>)
    {
        let segments = pattern.split('.').map(str::to_string).collect();
        self.routes.push(RouteEntry{ pattern, segments, priority, once, handler });
        self.next_seq += 1;
        // stable sort by descending priority; Vec::push preserves insertion order for ties under a stable sort
        self.routes.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Remove every route registered on `pattern`.
    pub fn off(&mut self, pattern: &str)
    {
        self.routes.retain(|r| r.pattern != pattern);
    }

    /// Set the fallback handler invoked when no route matches.
    pub fn set_default(&mut self, handler: impl Fn(&serde_json::Value) + Send + Sync + 'static)
    {
        self.default = Some(Box::new(handler));
    }

    /// Mark `channel` as subscribed, so channel-bearing messages on it are routed.
    pub fn subscribe(&mut self, channel: impl Into<String>)
    {
        self.subscriptions.insert(channel.into());
    }

    /// Remove a channel subscription.
    pub fn unsubscribe(&mut self, channel: &str)
    {
        self.subscriptions.remove(channel);
    }

    /// Whether `channel` currently has a subscription.
    pub fn is_subscribed(&self, channel: &str) -> bool
    {
        self.subscriptions.contains(channel)
    }

    /// Route `message` to every matching handler in priority order, or the default handler if none match.
    ///
    /// If `message.channel` is set and not subscribed, routing is skipped entirely (the message is still delivered
    /// as the generic `message` event by the facade, outside this router's concern). Each matched handler's panic
    /// is caught and logged; later handlers still run. Returns whether any handler (including the default) ran.
    pub fn route(&mut self, message: &serde_json::Value) -> bool
    {
        if let Some(channel) = message.get("channel").and_then(|v| v.as_str())
        {
            if !self.subscriptions.contains(channel)
            {
                return false;
            }
        }

        let msg_type = message.get("type").and_then(|v| v.as_str()).unwrap_or("");
        let msg_segments: Vec<&str> = msg_type.split('.').collect();

        let matched_indices: Vec<usize> = self.routes.iter().enumerate()
            .filter(|(_, r)| segments_match(&r.segments, &msg_segments))
            .map(|(i, _)| i)
            .collect();

        if matched_indices.is_empty()
        {
            if let Some(default) = &self.default
            {
                invoke_isolated(default.as_ref(), message);
                return true;
            }
            return false;
        }

        for idx in &matched_indices
        {
            invoke_isolated(self.routes[*idx].handler.as_ref(), message);
        }

        // remove `once` routes that fired, highest index first so earlier indices stay valid
        for idx in matched_indices.into_iter().rev()
        {
            if self.routes[idx].once
            {
                self.routes.remove(idx);
            }
        }

        true
    }

    /// Number of routes currently registered (across all patterns).
    pub fn route_count(&self) -> usize
    {
        self.routes.len()
    }
}

fn invoke_isolated(handler: &(dyn Fn(&serde_json::Value) + Send + Sync), message: &serde_json::Value)
{
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(message)));
    if let Err(panic) = result
    {
        tracing::error!(?panic, "router handler panicked");
    }
}

/// Whether a dot-segmented pattern matches a dot-segmented message type. `*` consumes exactly one segment; `**`
/// consumes any number (including zero) of remaining segments.
fn segments_match(pattern: &[String], message: &[&str]) -> bool
{
    match (pattern.first(), message.first())
    {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some(p), _) if p == "**" =>
        {
            // try consuming 0, 1, 2, ... segments with the rest of the pattern
            for skip in 0..=message.len()
            {
                if segments_match(&pattern[1..], &message[skip..])
                {
                    return true;
                }
            }
            false
        }
        (Some(_), None) => false,
        (Some(p), Some(m)) =>
        {
            if p == "*" || p == m
            {
                segments_match(&pattern[1..], &message[1..])
            }
            else
            {
                false
            }
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------
