//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// Aggregates every subsystem's configuration into the single value [`Runtime::open`](crate::Runtime::open) takes.
///
/// Transport selection (the endpoint, subprotocols, headers) is a property of the [`TransportAdapter`] instance
/// passed alongside this config, not of `RuntimeConfig` itself — the adapter already knows how to reach its
/// endpoint by the time it is handed to `Runtime::open`, matching how a `ClientFactory` is handed a pre-built
/// acceptor rather than a URL string.
#[derive(Debug, Clone)]
pub struct RuntimeConfig
{
    /// Deadline for one connect attempt (initial or reconnect) before it is treated as a [`RuntimeErrorKind::Timeout`].
    /// Defaults to 10 seconds.
    pub connect_timeout: Duration,
    /// Raises the runtime's own tracing spans from `info` to `debug`. Defaults to `false`.
    pub debug: bool,
    pub reconnect: ReconnectConfig,
    pub heartbeat: HeartbeatConfig,
    pub queue: QueueConfig,
    pub compression: CompressionConfig,
    pub encryption: EncryptionConfig,
    /// Applied when a caller sets [`SendOptions::ack`] without its own override. Defaults to [`AckOptions::default`].
    pub ack: AckOptions,
    pub rpc: RpcConfig,
    pub dedup: DedupConfig,
    /// Whether [`RuntimeHandle::send_batched`] is available at all. Defaults to `false`; batching is an opt-in
    /// overlay distinct from the ordered/queued/ack-tracked path [`RuntimeHandle::send`] uses.
    pub batch_enabled: bool,
    pub batch: BatchConfig,
    pub monitor: MonitorConfig,
}

impl Default for RuntimeConfig
{
    fn default() -> Self
    {
        Self{
            connect_timeout : Duration::from_secs(10),
            debug           : false,
            reconnect       : ReconnectConfig::default(),
            heartbeat       : HeartbeatConfig::default(),
            queue           : QueueConfig::default(),
            compression     : CompressionConfig::default(),
            encryption      : EncryptionConfig::default(),
            ack             : AckOptions::default(),
            rpc             : RpcConfig::default(),
            dedup           : DedupConfig::default(),
            batch_enabled   : false,
            batch           : BatchConfig::default(),
            monitor         : MonitorConfig::default(),
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Builds a [`RuntimeConfig`] field-by-field, in the spirit of how a `ClientFactory` composes a client's config.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigBuilder
{
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder
{
    /// Start from [`RuntimeConfig::default`].
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn connect_timeout(mut self, value: Duration) -> Self
    {
        self.config.connect_timeout = value;
        self
    }

    pub fn debug(mut self, value: bool) -> Self
    {
        self.config.debug = value;
        self
    }

    pub fn reconnect(mut self, value: ReconnectConfig) -> Self
    {
        self.config.reconnect = value;
        self
    }

    pub fn heartbeat(mut self, value: HeartbeatConfig) -> Self
    {
        self.config.heartbeat = value;
        self
    }

    pub fn queue(mut self, value: QueueConfig) -> Self
    {
        self.config.queue = value;
        self
    }

    pub fn compression(mut self, value: CompressionConfig) -> Self
    {
        self.config.compression = value;
        self
    }

    pub fn encryption(mut self, value: EncryptionConfig) -> Self
    {
        self.config.encryption = value;
        self
    }

    pub fn ack(mut self, value: AckOptions) -> Self
    {
        self.config.ack = value;
        self
    }

    pub fn rpc(mut self, value: RpcConfig) -> Self
    {
        self.config.rpc = value;
        self
    }

    pub fn dedup(mut self, value: DedupConfig) -> Self
    {
        self.config.dedup = value;
        self
    }

    pub fn batch_enabled(mut self, value: bool) -> Self
    {
        self.config.batch_enabled = value;
        self
    }

    pub fn batch(mut self, value: BatchConfig) -> Self
    {
        self.config.batch = value;
        self
    }

    pub fn monitor(mut self, value: MonitorConfig) -> Self
    {
        self.config.monitor = value;
        self
    }

    /// Finish building. Never fails: every field has a valid default.
    pub fn build(self) -> RuntimeConfig
    {
        self.config
    }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------
