//! LLAPMesh - LLAP protocol engine for small serial networks
//!
//! Nodes exchange 12-byte key/value frames over a shared serial link. One
//! coordinator hands out 2-letter addresses to nodes that join without one.
//!
//! ```no_run
//! use llapmesh::{Destination, Engine, MemoryStore, MemoryTransport, StdPlatform, Value};
//!
//! # fn main() -> Result<(), llapmesh::EngineError> {
//! let mut node = Engine::new(MemoryTransport::new(), MemoryStore::new(), StdPlatform::new());
//! node.begin()?;
//! loop {
//!     node.poll()?;
//!     if let Some(message) = node.take_message() {
//!         println!("{} from {}", message.payload, message.remote);
//!         node.send("ACK", Value::Empty, Destination::Local)?;
//!     }
//! }
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod platform;
pub mod pool;
pub mod protocol;
pub mod store;
pub mod transport;

pub use engine::{Engine, EngineConfig, EngineError, EngineResult};
pub use platform::{Platform, StdPlatform};
pub use protocol::{Address, ControlKey, Destination, Frame, Message, Payload, Value};
pub use store::{AddressStore, FileStore, MemoryStore};
pub use transport::{MemoryTransport, StreamTransport, Transport};
