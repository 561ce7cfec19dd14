//local shortcuts
use crate::*;

//third-party shortcuts
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

//standard shortcuts
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

//-------------------------------------------------------------------------------------------------------------------

/// Await `deadline` if set, otherwise never resolve. Lets every timer-driven subsystem be a plain `Option<Instant>`
/// field polled directly as a `tokio::select!` branch instead of juggling `Option<Sleep>` futures by hand.
async fn sleep_until_opt(deadline: Option<Instant>)
{
    match deadline
    {
        Some(instant) => tokio::time::sleep_until(instant).await,
        None => std::future::pending().await,
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// The single background task driving one runtime instance.
///
/// Every subsystem overlay (queue, ack, rpc, router, batch, dedup, monitor, heartbeat, reconnect) is owned
/// exclusively by this task; the only way another task observes or mutates state is through the command channel or
/// the published [`RuntimeSnapshot`]. This is the "single logical task runner" realization: there is never a second
/// place that could race with this one over connection state, pending acks, or the outbox.
pub(crate) struct RuntimeTask
{
    config        : RuntimeConfig,
    adapter       : Box<dyn TransportAdapter>,
    state_machine : ConnectionStateMachine,
    session       : Session,
    reconnect     : ReconnectController,
    heartbeat     : HeartbeatController,
    queue         : MessageQueue,
    middleware    : MiddlewarePipeline,
    codec         : CodecChain,
    ack           : AckTracker,
    rpc           : RpcCorrelator,
    router        : Router,
    batch         : BatchSender,
    dedup         : Deduplicator,
    monitor       : PerformanceMonitor,
    id_gen        : IdGenerator,
    event_bus     : EventBus<RuntimeEvent>,

    commands : mpsc::Receiver<Command>,
    events   : broadcast::Sender<RuntimeEvent>,
    snapshot : Arc<RwLock<RuntimeSnapshot>>,

    heartbeat_deadline             : Option<Instant>,
    heartbeat_timeout_deadline     : Option<Instant>,
    reconnect_deadline             : Option<Instant>,
    dedup_sweep_deadline           : Option<Instant>,
    reconnect_sequence_started_at  : Option<Instant>,
}

impl RuntimeTask
{
    fn emit(&mut self, event: RuntimeEvent)
    {
        self.event_bus.emit(event.name(), &event);
        // no subscribers is the common case for a fire-and-forget event (e.g. nobody called `events()` yet); not an error
        let _ = self.events.send(event);
    }

    fn transition(&mut self, new_state: ConnectionState) -> StateChange
    {
        let change = self.state_machine.transition(new_state);
        self.emit(RuntimeEvent::from(change));
        change
    }

    /// Refresh the snapshot every observer reads from. Called once per select-loop iteration.
    fn publish(&mut self)
    {
        let stats = self.queue.get_stats();
        self.monitor.set_queue_usage(stats.bytes, self.queue.config().max_size);
        let metrics = self.monitor.report();

        let mut snapshot = self.snapshot.write().unwrap();
        snapshot.state = self.state_machine.state();
        snapshot.queue_size = stats.len;
        snapshot.metrics = metrics;
    }

    fn arm_next_heartbeat(&mut self)
    {
        self.heartbeat_deadline = if self.heartbeat.config().enabled
        {
            Some(Instant::now() + self.heartbeat.config().interval)
        }
        else
        {
            None
        };
    }

    /// Send `payload` through the send middleware chain and codec, then hand it to the adapter.
    ///
    /// Bypassed entirely by [`RuntimeTask::handle_send_binary`]; this is the path for every JSON-shaped message,
    /// including internally-generated ones (heartbeat probes, ack retries, rpc requests, batch envelopes).
    async fn raw_send_value(&mut self, payload: &serde_json::Value) -> Result<(), RuntimeError>
    {
        let ctx = MiddlewareContext::new(payload.clone(), Direction::Send);
        let data = match self.middleware.run_send(ctx).await?
        {
            Some(ctx) => ctx.data,
            None => return Ok(()), // a middleware set should_skip; treated as a silent, successful no-op
        };

        let frame = self.codec.encode(&data)?;
        self.adapter.send(AdapterMessage::Text(frame)).await
    }

    //-------------------------------------------------------------------------------------------------------------
    // connection lifecycle

    async fn handle_connect(&mut self, respond: tokio::sync::oneshot::Sender<Result<(), RuntimeError>>)
    {
        let state = self.state_machine.state();
        if state.is_destroyed()
        {
            let _ = respond.send(Err(RuntimeError::new(RuntimeErrorKind::State, "runtime has been destroyed")));
            return;
        }
        if matches!(state, ConnectionState::Connecting | ConnectionState::Connected)
        {
            let _ = respond.send(Ok(()));
            return;
        }

        self.transition(ConnectionState::Connecting);
        match tokio::time::timeout(self.config.connect_timeout, self.adapter.connect()).await
        {
            Ok(Ok(())) =>
            {
                self.on_connected_success().await;
                let _ = respond.send(Ok(()));
            }
            Ok(Err(err)) => self.handle_initial_connect_failure(err, respond).await,
            Err(_) =>
            {
                let err = RuntimeError::timeout("connect", self.config.connect_timeout);
                self.handle_initial_connect_failure(err, respond).await;
            }
        }
    }

    /// An initial (non-reconnect) connect attempt failed. When reconnect is enabled the failure is absorbed into the
    /// reconnect loop and the caller's `connect()` still resolves `Ok`, matching a reconnect-aware client's contract
    /// that `connect()` means "start trying", not "block until one attempt succeeds".
    async fn handle_initial_connect_failure(&mut self, err: RuntimeError, respond: tokio::sync::oneshot::Sender<Result<(), RuntimeError>>)
    {
        self.monitor.record_error(err.to_string());
        if self.reconnect.enabled() && self.reconnect.attempts_remaining()
        {
            self.begin_reconnect_wait();
            let _ = respond.send(Ok(()));
        }
        else
        {
            self.transition(ConnectionState::Disconnected);
            self.emit(RuntimeEvent::Error{ message: err.to_string(), timestamp: SystemTime::now() });
            let _ = respond.send(Err(err));
        }
    }

    async fn on_connected_success(&mut self)
    {
        self.transition(ConnectionState::Connected);
        self.emit(RuntimeEvent::Open);
        self.reconnect_sequence_started_at = None;
        self.arm_next_heartbeat();
        self.flush_queue().await;

        if self.config.rpc.resend_on_reconnect
        {
            for (_id, payload) in self.rpc.pending_payloads()
            {
                let _ = self.raw_send_value(&payload).await;
            }
        }
    }

    async fn flush_queue(&mut self)
    {
        while self.state_machine.state().is_connected()
        {
            let Some(item) = self.queue.dequeue() else { break; };
            match self.raw_send_value(&item.payload).await
            {
                Ok(()) =>
                {
                    self.session.record_sent();
                    self.monitor.record_sent();
                }
                Err(err) =>
                {
                    tracing::warn!(?err, id = %item.id, "failed to flush queued message; re-enqueueing");
                    // the retry counter resets to 0 here since `enqueue` always makes a fresh item; an acceptable
                    // simplification over carrying the original retry count through re-insertion.
                    let _ = self.queue.enqueue(item.payload, item.priority);
                    break;
                }
            }
        }
    }

    async fn handle_disconnect_command(&mut self, code: Option<u16>, reason: Option<String>)
    {
        if self.state_machine.state().is_destroyed() { return; }

        self.reconnect_deadline = None;
        self.reconnect_sequence_started_at = None;
        self.reconnect.reset();

        self.transition(ConnectionState::Disconnecting);
        self.adapter.disconnect(code, reason.clone()).await;

        self.ack.cancel_all();
        self.rpc.cancel_all("connection closed by caller");
        self.heartbeat_deadline = None;
        self.heartbeat_timeout_deadline = None;

        self.transition(ConnectionState::Disconnected);
        self.emit(RuntimeEvent::Close{
            code: code.unwrap_or(1000),
            reason: reason.unwrap_or_default(),
            was_clean: true,
            timestamp: SystemTime::now(),
        });
    }

    /// Session loss reported by the adapter (a `Close` or fatal `Error` event), as opposed to a caller-requested
    /// disconnect. Cancels in-flight reliability state and either schedules a reconnect or settles as disconnected.
    async fn handle_session_loss(&mut self, code: u16, reason: String, was_clean: bool)
    {
        let state = self.state_machine.state();
        if matches!(state, ConnectionState::Disconnected | ConnectionState::Destroyed) { return; }

        if !self.config.rpc.resend_on_reconnect
        {
            self.rpc.cancel_all("connection lost");
        }
        self.ack.cancel_all();
        self.heartbeat_deadline = None;
        self.heartbeat_timeout_deadline = None;

        self.emit(RuntimeEvent::Close{ code, reason, was_clean, timestamp: SystemTime::now() });

        if self.reconnect.enabled() && self.reconnect.attempts_remaining()
        {
            self.begin_reconnect_wait();
        }
        else
        {
            let attempt = self.reconnect.attempt();
            self.transition(ConnectionState::Disconnected);
            if self.reconnect.enabled()
            {
                self.emit(RuntimeEvent::ReconnectFailed{
                    attempts: attempt,
                    reason: "maximum reconnect attempts exhausted".to_string(),
                    timestamp: SystemTime::now(),
                });
            }
        }
    }

    fn begin_reconnect_wait(&mut self)
    {
        let delay = self.reconnect.next_delay();
        self.reconnect_deadline = Some(Instant::now() + delay);
        if self.reconnect_sequence_started_at.is_none()
        {
            self.reconnect_sequence_started_at = Some(Instant::now());
        }
        self.transition(ConnectionState::Reconnecting);
        self.emit(RuntimeEvent::Reconnecting{
            attempt: self.reconnect.attempt(),
            max_attempts: self.reconnect.config().max_attempts,
            delay,
            timestamp: SystemTime::now(),
        });
    }

    async fn attempt_reconnect(&mut self)
    {
        self.reconnect_deadline = None;
        match tokio::time::timeout(self.config.connect_timeout, self.adapter.connect()).await
        {
            Ok(Ok(())) =>
            {
                let attempts = self.reconnect.attempt();
                let duration = self.reconnect_sequence_started_at.map(|t| t.elapsed()).unwrap_or_default();
                self.reconnect.reset();
                self.session.record_reconnected();
                self.monitor.record_reconnect();
                self.on_connected_success().await;
                self.emit(RuntimeEvent::Reconnected{ attempts, duration, timestamp: SystemTime::now() });
            }
            Ok(Err(err)) =>
            {
                self.monitor.record_error(err.to_string());
                self.reconnect_fail_or_retry();
            }
            Err(_) =>
            {
                self.monitor.record_error("reconnect attempt timed out");
                self.reconnect_fail_or_retry();
            }
        }
    }

    fn reconnect_fail_or_retry(&mut self)
    {
        if self.reconnect.attempts_remaining()
        {
            self.begin_reconnect_wait();
        }
        else
        {
            let attempt = self.reconnect.attempt();
            self.transition(ConnectionState::Disconnected);
            self.reconnect_sequence_started_at = None;
            self.emit(RuntimeEvent::ReconnectFailed{
                attempts: attempt,
                reason: "maximum reconnect attempts exhausted".to_string(),
                timestamp: SystemTime::now(),
            });
        }
    }

    async fn handle_destroy(&mut self)
    {
        if self.state_machine.state().is_destroyed() { return; }

        self.reconnect_deadline = None;
        self.heartbeat_deadline = None;
        self.heartbeat_timeout_deadline = None;

        self.adapter.disconnect(Some(1000), Some("destroyed".to_string())).await;
        self.ack.cancel_all();
        self.rpc.cancel_all("runtime destroyed");
        self.queue.clear();
        self.batch.destroy(|dropped|
        {
            if !dropped.is_empty()
            {
                tracing::debug!(count = dropped.len(), "dropping buffered batch messages on destroy");
            }
        });

        self.transition(ConnectionState::Destroyed);
        self.emit(RuntimeEvent::Close{ code: 1000, reason: "destroyed".to_string(), was_clean: true, timestamp: SystemTime::now() });
    }

    //-------------------------------------------------------------------------------------------------------------
    // outbound commands

    async fn handle_send(&mut self, payload: serde_json::Value, options: SendOptions) -> Result<(), RuntimeError>
    {
        if self.state_machine.state().is_destroyed()
        {
            return Err(RuntimeError::new(RuntimeErrorKind::State, "runtime has been destroyed"));
        }

        let payload = if options.ack
        {
            self.tag_with_id(payload)
        }
        else
        {
            payload
        };

        if self.state_machine.state().is_connected()
        {
            match self.raw_send_value(&payload).await
            {
                Ok(()) =>
                {
                    self.session.record_sent();
                    self.monitor.record_sent();
                    if options.ack
                    {
                        if let Some(id) = payload.get("id").and_then(|v| v.as_str())
                        {
                            let ack_options = options.ack_options.unwrap_or(self.config.ack);
                            self.ack.register(id.to_string(), payload.clone(), ack_options);
                        }
                    }
                    return Ok(());
                }
                Err(err) => return self.enqueue_or_fail(payload, options.priority, err),
            }
        }

        self.enqueue_or_fail(payload, options.priority, RuntimeError::new(RuntimeErrorKind::State, "not connected"))
    }

    fn enqueue_or_fail(&mut self, payload: serde_json::Value, priority: Priority, dispatch_err: RuntimeError) -> Result<(), RuntimeError>
    {
        if !self.config.queue.enabled
        {
            return Err(dispatch_err);
        }
        self.queue.enqueue(payload, priority).map(|_id| ())
    }

    fn tag_with_id(&self, mut payload: serde_json::Value) -> serde_json::Value
    {
        if payload.get("id").and_then(|v| v.as_str()).is_some()
        {
            return payload;
        }
        let id = self.id_gen.next_id();
        match payload.as_object_mut()
        {
            Some(obj) => { obj.insert("id".to_string(), serde_json::Value::String(id)); payload }
            None => serde_json::json!({ "id": id, "payload": payload }),
        }
    }

    async fn handle_send_binary(&mut self, bytes: Vec<u8>) -> Result<(), RuntimeError>
    {
        if !self.state_machine.state().is_connected()
        {
            return Err(RuntimeError::new(RuntimeErrorKind::State, "not connected"));
        }
        self.adapter.send(AdapterMessage::Binary(bytes)).await?;
        self.session.record_sent();
        self.monitor.record_sent();
        Ok(())
    }

    async fn handle_send_batched(&mut self, payload: serde_json::Value) -> Result<(), RuntimeError>
    {
        if !self.config.batch_enabled
        {
            return Err(RuntimeError::new(RuntimeErrorKind::State, "batch sending is not enabled"));
        }
        let must_flush = self.batch.add(payload);
        if must_flush
        {
            self.flush_batch().await;
        }
        Ok(())
    }

    async fn flush_batch(&mut self)
    {
        let mut drained = None;
        self.batch.flush(|batch| drained = Some(batch));
        let Some(messages) = drained else { return; };
        if messages.is_empty() { return; }

        let envelope = serde_json::json!({ "type": "batch", "messages": messages });
        match self.raw_send_value(&envelope).await
        {
            Ok(()) =>
            {
                self.session.record_sent();
                self.monitor.record_sent();
            }
            Err(err) =>
            {
                tracing::warn!(?err, "batch flush dispatch failed; buffered messages are dropped");
                self.monitor.record_error(err.to_string());
            }
        }
    }

    async fn handle_request(
        &mut self,
        payload  : serde_json::Value,
        timeout  : Option<std::time::Duration>,
    ) -> Result<tokio::sync::oneshot::Receiver<RpcOutcome>, RuntimeError>
    {
        if !self.state_machine.state().is_connected()
        {
            return Err(RuntimeError::new(RuntimeErrorKind::State, "not connected"));
        }

        let id = self.id_gen.next_id();
        let payload = match payload.as_object()
        {
            Some(_) => self.tag_with_id_forced(payload, &id),
            None => serde_json::json!({ "id": id, "payload": payload }),
        };

        let rx = self.rpc.request(id.clone(), payload.clone(), timeout);
        match self.raw_send_value(&payload).await
        {
            Ok(()) =>
            {
                self.session.record_sent();
                self.monitor.record_sent();
                Ok(rx)
            }
            Err(err) =>
            {
                self.rpc.cancel(&id, &err.to_string());
                Err(err)
            }
        }
    }

    fn tag_with_id_forced(&self, mut payload: serde_json::Value, id: &str) -> serde_json::Value
    {
        if let Some(obj) = payload.as_object_mut()
        {
            obj.insert("id".to_string(), serde_json::Value::String(id.to_string()));
        }
        payload
    }

    //-------------------------------------------------------------------------------------------------------------
    // inbound handling

    async fn handle_adapter_event(&mut self, event: AdapterEvent)
    {
        match event
        {
            AdapterEvent::Open =>
            {
                if self.state_machine.state() == ConnectionState::Connecting
                {
                    self.on_connected_success().await;
                }
            }
            AdapterEvent::Close{ code, reason, was_clean } => self.handle_session_loss(code, reason, was_clean).await,
            AdapterEvent::Error{ message } =>
            {
                self.monitor.record_error(message.clone());
                self.emit(RuntimeEvent::Error{ message, timestamp: SystemTime::now() });
            }
            AdapterEvent::Message(message) => self.handle_inbound_frame(message).await,
        }
    }

    async fn handle_inbound_frame(&mut self, frame: AdapterMessage)
    {
        let value = match frame
        {
            AdapterMessage::Binary(bytes) =>
            {
                use base64::Engine as _;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                self.session.record_received();
                self.monitor.record_received();
                self.emit(RuntimeEvent::Message{ data: serde_json::json!({ "binary": encoded }), timestamp: SystemTime::now() });
                return;
            }
            AdapterMessage::Text(text) =>
            {
                match self.codec.decode(&text)
                {
                    Ok(value) => value,
                    Err(err) =>
                    {
                        self.monitor.record_error(err.to_string());
                        self.emit(RuntimeEvent::Error{ message: err.to_string(), timestamp: SystemTime::now() });
                        return;
                    }
                }
            }
        };

        // every inbound frame passes through the receive chain first; only afterward is it classified as a
        // control frame (ack / rpc-response / pong) or an application message, so receive middleware can observe
        // and, for logging/metrics purposes, even transform control frames.
        let ctx = MiddlewareContext::new(value, Direction::Receive);
        let value = match self.middleware.run_receive(ctx).await
        {
            Ok(Some(ctx)) => ctx.data,
            Ok(None) => return, // a middleware set should_skip; silently drop
            Err(err) =>
            {
                self.monitor.record_error(err.to_string());
                self.emit(RuntimeEvent::Error{ message: err.to_string(), timestamp: SystemTime::now() });
                return;
            }
        };

        let msg_type = value.get("type").and_then(|v| v.as_str());

        if msg_type == Some("ack")
        {
            if let Some(id) = value.get("id").and_then(|v| v.as_str())
            {
                self.ack.on_ack(id);
            }
            return;
        }

        if msg_type == Some("rpc-response")
        {
            if let Some(id) = value.get("id").and_then(|v| v.as_str())
            {
                let is_error = value.get("error").is_some();
                let result = value.get("result").or_else(|| value.get("error")).cloned().unwrap_or(serde_json::Value::Null);
                self.rpc.complete(id, is_error, result);
            }
            return;
        }

        if self.heartbeat.is_pong(&value)
        {
            if let Some(sample) = self.heartbeat.on_pong()
            {
                self.session.record_latency(sample.rtt);
                self.monitor.record_latency(sample.rtt);
            }
            self.heartbeat_timeout_deadline = None;
            self.arm_next_heartbeat();
            self.emit(RuntimeEvent::Pong{ timestamp: SystemTime::now() });
            return;
        }

        if self.dedup.is_duplicate(&value)
        {
            tracing::debug!("dropping duplicate inbound message");
            return;
        }
        self.dedup.mark_processed(&value);

        self.router.route(&value);

        self.session.record_received();
        self.monitor.record_received();
        self.emit(RuntimeEvent::Message{ data: value, timestamp: SystemTime::now() });
    }

    //-------------------------------------------------------------------------------------------------------------
    // heartbeat

    async fn send_heartbeat_probe(&mut self)
    {
        if !self.heartbeat.config().enabled || !self.state_machine.state().is_connected() || self.heartbeat.is_probe_in_flight()
        {
            self.arm_next_heartbeat();
            return;
        }

        let probe = self.heartbeat.begin_probe();
        self.emit(RuntimeEvent::Ping{ message: probe.clone(), timestamp: SystemTime::now() });

        match self.raw_send_value(&probe).await
        {
            Ok(()) => self.heartbeat_timeout_deadline = Some(Instant::now() + self.heartbeat.config().timeout),
            Err(err) =>
            {
                tracing::warn!(?err, "failed to dispatch heartbeat probe");
                self.heartbeat.on_timeout();
                self.arm_next_heartbeat();
            }
        }
    }

    async fn handle_heartbeat_timeout(&mut self)
    {
        self.heartbeat_timeout_deadline = None;
        if !self.heartbeat.on_timeout() { return; }

        tracing::warn!("heartbeat timed out; treating the connection as lost");
        self.adapter.disconnect(Some(4001), Some("heartbeat timeout".to_string())).await;
        self.handle_session_loss(4001, "heartbeat timeout".to_string(), false).await;
    }

    //-------------------------------------------------------------------------------------------------------------
    // command dispatch

    async fn handle_command(&mut self, command: Command)
    {
        match command
        {
            Command::Connect{ respond } => self.handle_connect(respond).await,
            Command::Disconnect{ code, reason, respond } =>
            {
                self.handle_disconnect_command(code, reason).await;
                let _ = respond.send(());
            }
            Command::Send{ payload, options, respond } =>
            {
                let result = self.handle_send(payload, options).await;
                let _ = respond.send(result);
            }
            Command::SendBinary{ bytes, respond } =>
            {
                let result = self.handle_send_binary(bytes).await;
                let _ = respond.send(result);
            }
            Command::SendBatched{ payload, respond } =>
            {
                let result = self.handle_send_batched(payload).await;
                let _ = respond.send(result);
            }
            Command::Request{ payload, timeout, respond } =>
            {
                let result = self.handle_request(payload, timeout).await;
                let _ = respond.send(result);
            }
            Command::On{ pattern, priority, handler } => self.router.on(pattern, priority, handler),
            Command::Once{ pattern, priority, handler } => self.router.once(pattern, priority, handler),
            Command::Off{ pattern } => self.router.off(&pattern),
            Command::SetDefaultRoute{ handler } => self.router.set_default(handler),
            Command::Subscribe{ channel } => self.router.subscribe(channel),
            Command::Unsubscribe{ channel } => self.router.unsubscribe(&channel),
            Command::UseMiddleware{ scope, middleware } => match scope
            {
                MiddlewareScope::Both => self.middleware.use_middleware(middleware),
                MiddlewareScope::SendOnly => self.middleware.use_send(middleware),
                MiddlewareScope::ReceiveOnly => self.middleware.use_receive(middleware),
            },
            Command::ClearQueue => self.queue.clear(),
            Command::OnEvent{ event, handler } => self.event_bus.on(event, move |e: &RuntimeEvent| handler(e)),
            Command::OnceEvent{ event, handler } => self.event_bus.once(event, move |e: &RuntimeEvent| handler(e)),
            Command::OffEvent{ event } => self.event_bus.off(&event),
            Command::SetMaxEventListeners{ max } => self.event_bus.set_max_listeners(max),
            Command::RemoveAllEventListeners => self.event_bus.remove_all(),
            Command::Destroy{ respond } =>
            {
                self.handle_destroy().await;
                let _ = respond.send(());
            }
        }
    }

    async fn handle_ack_timer_event(&mut self, event: AckTimerEvent)
    {
        match event
        {
            AckTimerEvent::Retry{ id, payload } =>
            {
                tracing::debug!(%id, "retrying unacknowledged send");
                if let Err(err) = self.raw_send_value(&payload).await
                {
                    tracing::warn!(%id, ?err, "ack retry dispatch failed");
                }
            }
            AckTimerEvent::Exhausted{ id, payload: _ } =>
            {
                let message = format!("ack for message {id} was never received after exhausting retries");
                self.monitor.record_error(message.clone());
                self.emit(RuntimeEvent::Error{ message, timestamp: SystemTime::now() });
            }
        }
    }

    //-------------------------------------------------------------------------------------------------------------

    /// Drive this task until every [`RuntimeHandle`] is dropped or [`Command::Destroy`] is processed.
    pub(crate) async fn run(mut self)
    {
        loop
        {
            let adapter_active = matches!(self.state_machine.state(), ConnectionState::Connecting | ConnectionState::Connected);
            let batch_deadline = self.batch.deadline().map(Instant::from_std);

            tokio::select!
            {
                command = self.commands.recv() =>
                {
                    match command
                    {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }

                event = self.adapter.next_event(), if adapter_active =>
                {
                    if let Some(event) = event
                    {
                        self.handle_adapter_event(event).await;
                    }
                }

                _ = sleep_until_opt(self.heartbeat_deadline) => self.send_heartbeat_probe().await,

                _ = sleep_until_opt(self.heartbeat_timeout_deadline) => self.handle_heartbeat_timeout().await,

                _ = sleep_until_opt(self.reconnect_deadline) => self.attempt_reconnect().await,

                _ = sleep_until_opt(batch_deadline), if self.config.batch_enabled => self.flush_batch().await,

                _ = sleep_until_opt(self.dedup_sweep_deadline) =>
                {
                    self.dedup.sweep();
                    self.dedup_sweep_deadline = Some(Instant::now() + self.dedup.sweep_interval());
                }

                Some(timer_event) = self.ack.next_timeout() => self.handle_ack_timer_event(timer_event).await,

                Some(timed_out_id) = self.rpc.next_timeout() =>
                {
                    tracing::debug!(id = %timed_out_id, "rpc request timed out");
                }
            }

            self.publish();

            if self.state_machine.state().is_destroyed()
            {
                break;
            }
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Entry point for opening a new runtime instance.
pub struct Runtime;

impl Runtime
{
    /// Start the background task driving `adapter` under `config`, returning a cloneable handle and the task's
    /// `JoinHandle`. Construction never touches the network: no connect attempt happens until the caller (or, for a
    /// caller that wants eager connection, an immediate `handle.connect().await`) requests one.
    pub fn open(config: RuntimeConfig, adapter: impl TransportAdapter + 'static) -> (RuntimeHandle, tokio::task::JoinHandle<()>)
    {
        let (commands_tx, commands_rx, events_tx) = channel_pair();
        let snapshot = Arc::new(RwLock::new(RuntimeSnapshot::default()));
        let handle = RuntimeHandle::new(commands_tx, events_tx.clone(), snapshot.clone());

        let dedup = Deduplicator::new(config.dedup.clone());
        let dedup_sweep_deadline = Some(Instant::now() + dedup.sweep_interval());

        let task = RuntimeTask{
            ack           : AckTracker::new(),
            rpc           : RpcCorrelator::new(config.rpc.clone()),
            router        : Router::new(),
            batch         : BatchSender::new(config.batch),
            dedup,
            monitor       : PerformanceMonitor::new(config.monitor),
            id_gen        : IdGenerator::new(),
            event_bus     : EventBus::new(),
            queue         : MessageQueue::new(config.queue.clone()),
            middleware    : MiddlewarePipeline::new(),
            codec         : CodecChain::new(config.compression.clone(), config.encryption.clone()),
            heartbeat     : HeartbeatController::new(config.heartbeat.clone()),
            reconnect     : ReconnectController::new(config.reconnect.clone()),
            session       : Session::new(),
            state_machine : ConnectionStateMachine::new(),
            adapter       : Box::new(adapter),
            config,
            commands      : commands_rx,
            events        : events_tx,
            snapshot,
            heartbeat_deadline            : None,
            heartbeat_timeout_deadline    : None,
            reconnect_deadline            : None,
            dedup_sweep_deadline,
            reconnect_sequence_started_at : None,
        };

        let join = tokio::spawn(task.run());
        (handle, join)
    }
}

//-------------------------------------------------------------------------------------------------------------------
