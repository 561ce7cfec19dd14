//module tree
mod compression;
mod encryption;

//API exports
pub use compression::*;
pub use encryption::*;

//-------------------------------------------------------------------------------------------------------------------
//local shortcuts
use crate::*;

//third-party shortcuts
use base64::Engine as _;
use serde::{Deserialize, Serialize};

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// Config for the [`CodecChain`]'s compression stage. See [`compression`] for the algorithm implementations.
#[derive(Debug, Clone)]
pub struct CompressionConfig
{
    /// Whether compression is attempted at all. Defaults to `false`.
    pub enabled: bool,
    /// Minimum serialized payload size, in bytes, before compression is attempted. Defaults to 1024.
    pub threshold: usize,
    /// Which compressor to use. Defaults to [`CompressionAlgorithm::Deflate`].
    pub algorithm: CompressionAlgorithm,
}

impl Default for CompressionConfig
{
    fn default() -> Self
    {
        Self{ enabled: false, threshold: 1024, algorithm: CompressionAlgorithm::Deflate }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Config for the [`CodecChain`]'s encryption stage. See [`encryption`] for the cipher implementation.
#[derive(Debug, Clone)]
pub struct EncryptionConfig
{
    /// Whether encryption is applied at all. Defaults to `false`.
    pub enabled: bool,
    /// Which cipher to use. Only [`EncryptionAlgorithm::Aes256Gcm`] is currently recognized.
    pub algorithm: EncryptionAlgorithm,
    /// The 32-byte symmetric key. Required when `enabled`.
    pub key: Option<[u8; 32]>,
    /// An optional fixed 12-byte IV. Discouraged: when set, every message reuses the same IV, which breaks the
    /// authenticated-encryption security guarantee for anything beyond a single message. Defaults to `None`,
    /// meaning a fresh random IV is drawn per message.
    pub fixed_iv: Option<[u8; 12]>,
}

impl Default for EncryptionConfig
{
    fn default() -> Self
    {
        Self{ enabled: false, algorithm: EncryptionAlgorithm::Aes256Gcm, key: None, fixed_iv: None }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// The small envelope wrapping a codec-processed payload.
///
/// `compressed` records whether the compression stage ran, so the receive path knows whether to decompress before
/// or after decryption is irrelevant here (encryption always wraps the outermost layer), matching the base spec:
/// "a small envelope flag indicates whether compression was applied".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecEnvelope
{
    pub compressed : bool,
    pub encrypted  : bool,
    /// Base64-encoded payload: compressed bytes, encrypted bytes, or the raw JSON string, depending on the flags.
    pub body       : String,
}

//-------------------------------------------------------------------------------------------------------------------

/// Composes optional authenticated encryption and optional compression into a single send/receive transform.
///
/// Send order: stringify -> compress (if enabled and over threshold) -> encrypt (if enabled) -> envelope.
/// Receive order is the exact mirror.
#[derive(Debug, Default)]
pub struct CodecChain
{
    compression : CompressionConfig,
    encryption  : EncryptionConfig,
}

impl CodecChain
{
    /// Make a new chain from the given configs.
    pub fn new(compression: CompressionConfig, encryption: EncryptionConfig) -> Self
    {
        Self{ compression, encryption }
    }

    /// Replace the compression config.
    pub fn set_compression_config(&mut self, config: CompressionConfig)
    {
        self.compression = config;
    }

    /// Replace the encryption config.
    pub fn set_encryption_config(&mut self, config: EncryptionConfig)
    {
        self.encryption = config;
    }

    /// Encode `payload` into the text frame that should be sent over the wire.
    pub fn encode(&self, payload: &serde_json::Value) -> Result<String, RuntimeError>
    {
        let stringified = serde_json::to_string(payload)
            .map_err(|e| RuntimeError::with_source(RuntimeErrorKind::Protocol, "failed to stringify outbound payload", e))?;

        let mut bytes = stringified.into_bytes();
        let mut compressed = false;

        if self.compression.enabled && bytes.len() >= self.compression.threshold
        {
            bytes = compress(self.compression.algorithm, &bytes);
            compressed = true;
        }

        let mut encrypted = false;
        if self.encryption.enabled
        {
            let key = self.encryption.key.ok_or_else(||
                RuntimeError::new(RuntimeErrorKind::Encryption, "encryption enabled but no key configured"))?;
            bytes = encrypt(key, self.encryption.fixed_iv, &bytes)?;
            encrypted = true;
        }

        let envelope = CodecEnvelope{
            compressed, encrypted,
            body: base64::engine::general_purpose::STANDARD.encode(&bytes),
        };
        serde_json::to_string(&envelope)
            .map_err(|e| RuntimeError::with_source(RuntimeErrorKind::Protocol, "failed to serialize codec envelope", e))
    }

    /// Decode an inbound text frame back into the application payload.
    pub fn decode(&self, frame: &str) -> Result<serde_json::Value, RuntimeError>
    {
        let envelope: CodecEnvelope = serde_json::from_str(frame)
            .map_err(|e| RuntimeError::with_source(RuntimeErrorKind::Protocol, "malformed codec envelope", e))?;

        let mut bytes = base64::engine::general_purpose::STANDARD.decode(&envelope.body)
            .map_err(|e| RuntimeError::with_source(RuntimeErrorKind::Protocol, "malformed base64 in codec envelope", e))?;

        if envelope.encrypted
        {
            let key = self.encryption.key.ok_or_else(||
                RuntimeError::new(RuntimeErrorKind::Encryption, "received encrypted frame but no key configured"))?;
            bytes = decrypt(key, &bytes)?;
        }

        if envelope.compressed
        {
            bytes = decompress(self.compression.algorithm, &bytes)?;
        }

        let text = String::from_utf8(bytes)
            .map_err(|e| RuntimeError::with_source(RuntimeErrorKind::Protocol, "decoded payload was not valid utf8", e))?;
        serde_json::from_str(&text)
            .map_err(|e| RuntimeError::with_source(RuntimeErrorKind::Protocol, "decoded payload was not valid json", e))
    }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------
