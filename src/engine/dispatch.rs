//! Inbound frame dispatch
//!
//! Filters frames by address, then runs the control-key state machine.
//! Anything that is not a control key is handed to the application through
//! the single-slot mailbox.

use super::{Engine, EngineResult};
use crate::platform::Platform;
use crate::pool;
use crate::protocol::{Address, ControlKey, Destination, Frame, Message, Payload, Value};
use crate::store::AddressStore;
use crate::transport::Transport;

impl<T, S, P> Engine<T, S, P>
where
    T: Transport,
    S: AddressStore,
    P: Platform,
{
    pub(super) fn dispatch(&mut self, frame: Frame) -> EngineResult<()> {
        let (address, payload) = frame.decode();
        let Some(remote) = address else {
            tracing::debug!("Dropping frame with malformed address: {}", frame);
            return Ok(());
        };

        if !self.accepts(remote) {
            tracing::trace!("Frame for {} ignored by {}", remote, self.local_address);
            return Ok(());
        }

        tracing::trace!("<- {}", frame);
        self.last_remote = Some(remote);

        match payload.control_key() {
            Some(ControlKey::Hello) => self.answer_hello(frame),
            Some(ControlKey::Started) if self.coordinator => self.welcome(remote),
            Some(ControlKey::ChangeDeviceId) if !self.coordinator => {
                self.change_device_id(frame, payload)
            }
            Some(ControlKey::Reboot) if !self.coordinator => self.reboot(),
            Some(ControlKey::Ack) => {
                self.acknowledged = true;
                Ok(())
            }
            Some(key) => {
                tracing::trace!("{} not handled in this role", key);
                Ok(())
            }
            None => {
                self.deliver(Message::new(remote, payload));
                Ok(())
            }
        }
    }

    /// Coordinators see everything; nodes only broadcasts and their own
    /// address
    fn accepts(&self, remote: Address) -> bool {
        self.coordinator || remote.is_broadcast() || remote == self.local_address
    }

    /// Reply to a presence probe with our own address in the frame
    fn answer_hello(&mut self, frame: Frame) -> EngineResult<()> {
        self.write_frame(&frame.with_address(self.local_address))
    }

    /// Acknowledge a STARTED node and, if it has no address, give it one
    fn welcome(&mut self, remote: Address) -> EngineResult<()> {
        let to = Destination::Node(remote);
        self.send(ControlKey::Ack.keyword(), Value::Empty, to)?;

        if remote.is_unassigned() {
            let address = pool::allocate(&mut self.store)?;
            tracing::info!("Assigning address {} to new node", address);

            let text = address.to_string();
            self.send(ControlKey::ChangeDeviceId.keyword(), Value::Text(&text), to)?;
            self.send(ControlKey::Reboot.keyword(), Value::Empty, to)?;
        }
        Ok(())
    }

    /// Echo the request and store the new address; it is used after the
    /// next REBOOT
    fn change_device_id(&mut self, frame: Frame, payload: Payload) -> EngineResult<()> {
        self.write_frame(&frame)?;

        let bytes = payload.as_bytes();
        match Address::node([bytes[7], bytes[8]]) {
            Some(address) => {
                tracing::info!("New address {} stored, pending reboot", address);
                self.store.save_local_address(address)?;
            }
            None => {
                tracing::debug!("Ignoring CHDEVID with invalid address: {}", payload);
            }
        }
        Ok(())
    }

    fn reboot(&mut self) -> EngineResult<()> {
        if self.rebootable {
            self.platform.restart();
        } else {
            self.local_address = self.store.load_local_address()?;
            tracing::info!("Reloaded local address {}", self.local_address);
        }
        Ok(())
    }

    /// Put an application message in the mailbox unless one is waiting
    fn deliver(&mut self, message: Message) {
        if self.pending.is_some() {
            tracing::debug!("Mailbox full, dropping {} from {}", message.payload, message.remote);
            return;
        }
        self.pending = Some(message);
    }
}
