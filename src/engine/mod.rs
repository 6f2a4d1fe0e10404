//! Protocol engine
//!
//! Owns one node's view of the network: its address, its role, the
//! acknowledgement flag and the single-slot inbound mailbox. The host calls
//! [`Engine::poll`] from its main loop; every call handles at most one
//! frame and never waits on the transport.

mod dispatch;

use std::time::Duration;

use thiserror::Error;

use crate::platform::Platform;
use crate::protocol::{
    Address, ControlKey, Destination, Frame, FrameReader, Message, Payload, ReaderStats, Value,
};
use crate::store::{AddressStore, StoreError};
use crate::transport::{Transport, TransportError};

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid local address: {0}")]
    InvalidAddress(Address),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Startup handshake settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// STARTED messages sent by an unassigned node before giving up
    pub handshake_attempts: u8,
    /// Wait after each STARTED before checking for an ACK
    pub retry_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            handshake_attempts: 5,
            retry_delay: Duration::from_millis(200),
        }
    }
}

/// An LLAP node
pub struct Engine<T, S, P> {
    transport: T,
    store: S,
    platform: P,
    config: EngineConfig,
    reader: FrameReader,
    /// Our address, `--` until assigned
    local_address: Address,
    /// Coordinators see every frame and answer STARTED
    coordinator: bool,
    /// REBOOT restarts the node instead of reloading the address
    rebootable: bool,
    /// An ACK arrived since the last send
    acknowledged: bool,
    /// Application message waiting for the host
    pending: Option<Message>,
    /// Address field of the last frame accepted
    last_remote: Option<Address>,
}

impl<T, S, P> Engine<T, S, P>
where
    T: Transport,
    S: AddressStore,
    P: Platform,
{
    pub fn new(transport: T, store: S, platform: P) -> Self {
        Self::with_config(transport, store, platform, EngineConfig::default())
    }

    pub fn with_config(transport: T, store: S, platform: P, config: EngineConfig) -> Self {
        Self {
            transport,
            store,
            platform,
            config,
            reader: FrameReader::new(),
            local_address: Address::Unassigned,
            coordinator: false,
            rebootable: false,
            acknowledged: false,
            pending: None,
            last_remote: None,
        }
    }

    /// Set the node's role. A coordinator always uses address `AA`, which
    /// is stored as well.
    pub fn set_coordinator(&mut self, coordinator: bool) -> EngineResult<()> {
        self.coordinator = coordinator;
        if coordinator {
            self.assign_address(Address::COORDINATOR)?;
        }
        Ok(())
    }

    pub fn is_coordinator(&self) -> bool {
        self.coordinator
    }

    /// Use and store a fixed address
    pub fn assign_address(&mut self, address: Address) -> EngineResult<()> {
        if address.is_broadcast() {
            return Err(EngineError::InvalidAddress(address));
        }
        self.local_address = address;
        self.store.save_local_address(address)?;
        Ok(())
    }

    /// Reset the coordinator's address pool to its first address
    pub fn reset_pool(&mut self) -> EngineResult<()> {
        self.store.reset_pool_counter()?;
        Ok(())
    }

    /// Load the stored address and announce the node.
    ///
    /// A node started this way restarts on REBOOT.
    pub fn begin(&mut self) -> EngineResult<()> {
        self.rebootable = true;
        self.local_address = self.store.load_local_address()?;
        self.handshake()
    }

    /// Store `address` and announce the node with it.
    ///
    /// REBOOT only reloads the address for a node started this way.
    pub fn begin_with_address(&mut self, address: Address) -> EngineResult<()> {
        self.assign_address(address)?;
        self.handshake()
    }

    /// Send STARTED. Without an address the message is retried, with a
    /// delay and a poll after each attempt, until an ACK arrives or the
    /// attempts run out. With an address it is sent once.
    fn handshake(&mut self) -> EngineResult<()> {
        let started = ControlKey::Started.keyword();

        if !self.local_address.is_unassigned() {
            tracing::info!("Node {} started", self.local_address);
            self.send(started, Value::Empty, Destination::Local)?;
            return Ok(());
        }

        self.acknowledged = false;
        let mut attempts = 0;
        while !self.acknowledged && attempts < self.config.handshake_attempts {
            self.send(started, Value::Empty, Destination::Local)?;
            self.platform.delay(self.config.retry_delay);
            self.poll()?;
            attempts += 1;
        }

        if self.acknowledged {
            tracing::info!("STARTED acknowledged after {} attempt(s)", attempts);
        } else {
            tracing::warn!("No coordinator answered after {} STARTED attempts", attempts);
        }
        Ok(())
    }

    /// Check the transport for one inbound frame and handle it.
    ///
    /// Does nothing while an application message is waiting in the mailbox.
    pub fn poll(&mut self) -> EngineResult<()> {
        if self.pending.is_some() {
            return Ok(());
        }
        if let Some(frame) = self.reader.poll(&mut self.transport) {
            self.dispatch(frame)?;
        }
        Ok(())
    }

    /// Send `key` followed by `value`.
    ///
    /// Returns `Ok(false)` without sending anything when a fixed-point value
    /// does not fit in the payload. Key and value together are truncated to
    /// 9 bytes. Clears the acknowledgement flag.
    pub fn send<'a>(
        &mut self,
        key: &str,
        value: impl Into<Value<'a>>,
        destination: Destination,
    ) -> EngineResult<bool> {
        let Some(text) = value.into().render() else {
            tracing::debug!("Value for {} does not fit in the payload, not sent", key);
            return Ok(false);
        };

        let address = match destination {
            Destination::Local => self.local_address,
            Destination::Broadcast => Address::Broadcast,
            Destination::Node(address) => address,
        };
        self.write_frame(&Frame::encode(address, key, &text))?;
        self.acknowledged = false;
        Ok(true)
    }

    fn write_frame(&mut self, frame: &Frame) -> EngineResult<()> {
        tracing::trace!("-> {}", frame);
        self.transport.write_bytes(frame.as_bytes())?;
        self.transport.flush()?;
        Ok(())
    }

    /// An application message is waiting
    pub fn available(&self) -> bool {
        self.pending.is_some()
    }

    /// An ACK arrived since the last send
    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    pub fn local_address(&self) -> Address {
        self.local_address
    }

    /// Address field of the last frame this node accepted
    pub fn remote_address(&self) -> Option<Address> {
        self.last_remote
    }

    /// Take the waiting application message, freeing the mailbox
    pub fn take_message(&mut self) -> Option<Message> {
        self.pending.take()
    }

    /// Take only the payload of the waiting message
    pub fn take_body(&mut self) -> Option<Payload> {
        self.take_message().map(|message| message.payload)
    }

    pub fn is_rebootable(&self) -> bool {
        self.rebootable
    }

    pub fn reader_stats(&self) -> ReaderStats {
        self.reader.stats()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Tear the engine down, handing back its collaborators
    pub fn into_parts(self) -> (T, S, P) {
        (self.transport, self.store, self.platform)
    }
}
