//local shortcuts
use crate::*;

//third-party shortcuts
use tokio::sync::oneshot;
use tokio_util::time::{delay_queue, DelayQueue};

//standard shortcuts
use std::collections::HashMap;
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// Config for the [`RpcCorrelator`].
#[derive(Debug, Clone)]
pub struct RpcConfig
{
    /// Timeout applied to a request when none is given explicitly. Defaults to 10 seconds.
    pub default_timeout: Duration,
    /// Whether pending requests should be re-sent after a successful reconnect instead of rejected on disconnect.
    /// Defaults to `false`: pending requests are rejected the moment the session is lost.
    pub resend_on_reconnect: bool,
}

impl Default for RpcConfig
{
    fn default() -> Self
    {
        Self{ default_timeout: Duration::from_secs(10), resend_on_reconnect: false }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// The resolution of a request: either the paired response payload, or a rejection reason.
#[derive(Debug)]
pub enum RpcOutcome
{
    Resolved(serde_json::Value),
    Rejected(RuntimeError),
}

struct Entry
{
    payload   : serde_json::Value,
    responder : oneshot::Sender<RpcOutcome>,
    timer_key : delay_queue::Key,
}

//-------------------------------------------------------------------------------------------------------------------

/// Request/response pairing with timeout, realized as a completion the caller awaits rather than a callback pair.
///
/// `request` hands back the assigned id (so the caller can dispatch `{..., id}` over the wire) and a
/// [`oneshot::Receiver`] that resolves once a matching response arrives, the request times out, or it is cancelled.
pub struct RpcCorrelator
{
    config  : RpcConfig,
    entries : HashMap<String, Entry>,
    timers  : DelayQueue<String>,
}

impl std::fmt::Debug for RpcCorrelator
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("RpcCorrelator").field("pending_count", &self.entries.len()).finish()
    }
}

impl RpcCorrelator
{
    /// Make a new correlator from `config`.
    pub fn new(config: RpcConfig) -> Self
    {
        Self{ config, entries: HashMap::new(), timers: DelayQueue::new() }
    }

    /// Current configuration.
    pub fn config(&self) -> &RpcConfig
    {
        &self.config
    }

    /// Begin a request: allocates `id`, arms a timeout timer for `timeout.unwrap_or(default_timeout)`, and returns
    /// the id plus a receiver that completes with the eventual [`RpcOutcome`].
    pub fn request(
        &mut self,
        id      : String,
        payload : serde_json::Value,
        timeout : Option<Duration>,
    ) -> oneshot::Receiver<RpcOutcome>
    {
        let (tx, rx) = oneshot::channel();
        let timer_key = self.timers.insert(id.clone(), timeout.unwrap_or(self.config.default_timeout));
        self.entries.insert(id, Entry{ payload, responder: tx, timer_key });
        rx
    }

    /// Complete a pending request identified by `id` with an inbound response. `is_error` routes to a rejection.
    ///
    /// Returns `false` if no matching pending request exists (a stray or already-resolved response).
    pub fn complete(&mut self, id: &str, is_error: bool, value: serde_json::Value) -> bool
    {
        let Some(entry) = self.entries.remove(id) else { return false; };
        self.timers.remove(&entry.timer_key);
        let outcome = if is_error
        {
            RpcOutcome::Rejected(RuntimeError::new(RuntimeErrorKind::Protocol, format!("rpc error response: {value}")))
        }
        else
        {
            RpcOutcome::Resolved(value)
        };
        let _ = entry.responder.send(outcome);
        true
    }

    /// Reject and remove a single pending request with a caller-supplied reason.
    pub fn cancel(&mut self, id: &str, reason: &str)
    {
        if let Some(entry) = self.entries.remove(id)
        {
            self.timers.remove(&entry.timer_key);
            let _ = entry.responder.send(RpcOutcome::Rejected(RuntimeError::new(RuntimeErrorKind::State, reason.to_string())));
        }
    }

    /// Reject and remove every pending request with the same reason, called on session loss.
    pub fn cancel_all(&mut self, reason: &str)
    {
        for (_, entry) in self.entries.drain()
        {
            let _ = entry.responder.send(RpcOutcome::Rejected(RuntimeError::new(RuntimeErrorKind::State, reason.to_string())));
        }
        self.timers.clear();
    }

    /// Payloads of all pending requests, for an optional resend-on-reconnect pass (see [`RpcConfig::resend_on_reconnect`]).
    pub fn pending_payloads(&self) -> Vec<(String, serde_json::Value)>
    {
        self.entries.iter().map(|(id, e)| (id.clone(), e.payload.clone())).collect()
    }

    /// Number of requests currently pending.
    pub fn pending_count(&self) -> usize
    {
        self.entries.len()
    }

    /// Await the next timeout firing, rejecting and removing that entry.
    ///
    /// Returns `None` once no timers remain armed. Intended for a `tokio::select!` branch, like [`AckTracker::next_timeout`](crate::AckTracker::next_timeout).
    pub async fn next_timeout(&mut self) -> Option<String>
    {
        let expired = std::future::poll_fn(|cx| self.timers.poll_expired(cx)).await?;
        let id = expired.into_inner();
        if let Some(entry) = self.entries.remove(&id)
        {
            let _ = entry.responder.send(RpcOutcome::Rejected(RuntimeError::timeout("rpc request", self.config.default_timeout)));
        }
        Some(id)
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[tokio::test]
    async fn complete_resolves_the_receiver()
    {
        let mut rpc = RpcCorrelator::new(RpcConfig::default());
        let rx = rpc.request("r1".to_string(), serde_json::json!({ "op": "ping" }), None);
        assert!(rpc.complete("r1", false, serde_json::json!({ "ok": true })));

        match rx.await.unwrap()
        {
            RpcOutcome::Resolved(v) => assert_eq!(v, serde_json::json!({ "ok": true })),
            RpcOutcome::Rejected(e) => panic!("expected resolution, got rejection: {e}"),
        }
    }

    #[tokio::test]
    async fn error_response_rejects()
    {
        let mut rpc = RpcCorrelator::new(RpcConfig::default());
        let rx = rpc.request("r1".to_string(), serde_json::json!({}), None);
        rpc.complete("r1", true, serde_json::json!({ "message": "nope" }));

        match rx.await.unwrap()
        {
            RpcOutcome::Rejected(_) => {}
            RpcOutcome::Resolved(v) => panic!("expected rejection, got resolution: {v}"),
        }
    }

    #[tokio::test]
    async fn stray_completion_is_a_noop()
    {
        let mut rpc = RpcCorrelator::new(RpcConfig::default());
        assert!(!rpc.complete("ghost", false, serde_json::json!(null)));
    }

    #[tokio::test]
    async fn cancel_all_rejects_every_pending_request_with_the_same_reason()
    {
        let mut rpc = RpcCorrelator::new(RpcConfig::default());
        let rx1 = rpc.request("a".to_string(), serde_json::json!({}), None);
        let rx2 = rpc.request("b".to_string(), serde_json::json!({}), None);
        rpc.cancel_all("connection lost");

        for rx in [rx1, rx2]
        {
            match rx.await.unwrap()
            {
                RpcOutcome::Rejected(e) => assert!(format!("{e}").contains("connection lost")),
                RpcOutcome::Resolved(_) => panic!("expected rejection"),
            }
        }
        assert_eq!(rpc.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_request_times_out()
    {
        let mut rpc = RpcCorrelator::new(RpcConfig{ default_timeout: Duration::from_millis(10), ..RpcConfig::default() });
        let rx = rpc.request("a".to_string(), serde_json::json!({}), None);

        tokio::time::advance(Duration::from_millis(11)).await;
        let timed_out_id = rpc.next_timeout().await.unwrap();
        assert_eq!(timed_out_id, "a");

        match rx.await.unwrap()
        {
            RpcOutcome::Rejected(e) => assert_eq!(e.kind(), RuntimeErrorKind::Timeout),
            RpcOutcome::Resolved(_) => panic!("expected timeout rejection"),
        }
    }

    #[test]
    fn resend_on_reconnect_defaults_to_false()
    {
        assert!(!RpcConfig::default().resend_on_reconnect);
    }
}

//-------------------------------------------------------------------------------------------------------------------
