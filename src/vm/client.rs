//! VM transport client.
//!
//! ## Design
//!
//! The external VM is an opaque RPC service. The [`VmClient`] trait is the
//! seam: the node talks to the trait, production wires in [`DvmClient`]
//! (length-prefixed JSON frames over TCP or a Unix domain socket), and
//! tests substitute [`crate::vm::stub::StubVm`] to simulate failures
//! deterministically.
//!
//! The call is synchronous by design - the enclosing transaction cannot
//! proceed until the VM answered or the retry budget ran out. Retries use a
//! fixed count and a fixed inter-attempt delay, both configuration
//! ([`VmConfig`]); timeouts apply per attempt.
//!
//! A [`VmError`] out of this module is a transport-level failure. It never
//! carries a partial result; the keeper escalates it to a consensus
//! failure.

use std::io::{self, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::thread;

use log::warn;
use thiserror::Error;

use crate::config::VmConfig;
use crate::vm::types::{VmRequest, VmResponse};

/// Upper bound on a single frame; anything larger is a malformed response.
const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

/// Transport-level failure talking to the VM.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    /// The configured address is not `tcp://...` or `unix://...`.
    #[error("invalid VM address {0:?}")]
    BadAddress(String),

    /// Connection could not be established.
    #[error("VM connect failed: {0}")]
    Connect(String),

    /// Read/write failure or per-attempt timeout.
    #[error("VM transport failure: {0}")]
    Io(String),

    /// The VM answered with bytes that do not decode to a response.
    #[error("malformed VM response: {0}")]
    Frame(String),

    /// Retry budget exhausted without a well-formed response.
    #[error("VM unavailable after {attempts} attempts: {last}")]
    Unavailable { attempts: u32, last: String },
}

/// The one capability the bridge needs from the outside world.
pub trait VmClient {
    /// Ship a request and block for the response.
    fn execute(&self, request: &VmRequest) -> Result<VmResponse, VmError>;
}

// ============================================================================
// Frame codec
// ============================================================================

/// Write one `u32`-length-prefixed frame.
pub fn write_frame(writer: &mut impl Write, payload: &[u8]) -> io::Result<()> {
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Read one `u32`-length-prefixed frame.
pub fn read_frame(reader: &mut impl Read) -> Result<Vec<u8>, VmError> {
    let mut len_bytes = [0u8; 4];
    reader
        .read_exact(&mut len_bytes)
        .map_err(|e| VmError::Io(e.to_string()))?;

    let len = u32::from_le_bytes(len_bytes);
    if len > MAX_FRAME_BYTES {
        return Err(VmError::Frame(format!("frame of {} bytes exceeds limit", len)));
    }

    let mut payload = vec![0u8; len as usize];
    reader
        .read_exact(&mut payload)
        .map_err(|e| VmError::Io(e.to_string()))?;
    Ok(payload)
}

// ============================================================================
// DvmClient
// ============================================================================

/// Socket client for the external VM process.
#[derive(Debug, Clone)]
pub struct DvmClient {
    config: VmConfig,
}

impl DvmClient {
    pub fn new(config: VmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// One connect/send/receive attempt.
    fn attempt(&self, payload: &[u8]) -> Result<Vec<u8>, VmError> {
        let address = &self.config.address;

        if let Some(target) = address.strip_prefix("tcp://") {
            let mut stream = TcpStream::connect(target).map_err(|e| {
                VmError::Connect(format!("{}: {}", target, e))
            })?;
            stream
                .set_read_timeout(Some(self.config.request_timeout))
                .and_then(|_| stream.set_write_timeout(Some(self.config.request_timeout)))
                .map_err(|e| VmError::Io(e.to_string()))?;
            return exchange(&mut stream, payload);
        }

        #[cfg(unix)]
        if let Some(path) = address.strip_prefix("unix://") {
            let mut stream = UnixStream::connect(path)
                .map_err(|e| VmError::Connect(format!("{}: {}", path, e)))?;
            stream
                .set_read_timeout(Some(self.config.request_timeout))
                .and_then(|_| stream.set_write_timeout(Some(self.config.request_timeout)))
                .map_err(|e| VmError::Io(e.to_string()))?;
            return exchange(&mut stream, payload);
        }

        Err(VmError::BadAddress(address.clone()))
    }
}

fn exchange<S: Read + Write>(stream: &mut S, payload: &[u8]) -> Result<Vec<u8>, VmError> {
    write_frame(stream, payload).map_err(|e| VmError::Io(e.to_string()))?;
    read_frame(stream)
}

impl VmClient for DvmClient {
    fn execute(&self, request: &VmRequest) -> Result<VmResponse, VmError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| VmError::Frame(e.to_string()))?;

        let mut last_error = VmError::Unavailable {
            attempts: 0,
            last: "no attempts made".to_string(),
        };

        for attempt in 1..=self.config.max_attempts {
            match self.attempt(&payload) {
                Ok(bytes) => {
                    // A syntactically broken response is NOT retried into
                    // oblivion silently - but it is still only a transport
                    // fault until the budget runs out.
                    match serde_json::from_slice::<VmResponse>(&bytes) {
                        Ok(response) => return Ok(response),
                        Err(e) => last_error = VmError::Frame(e.to_string()),
                    }
                }
                Err(e) => last_error = e,
            }

            warn!(
                "VM call attempt {}/{} failed: {}",
                attempt, self.config.max_attempts, last_error
            );
            if attempt < self.config.max_attempts {
                thread::sleep(self.config.retry_delay);
            }
        }

        Err(VmError::Unavailable {
            attempts: self.config.max_attempts,
            last: last_error.to_string(),
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
