//! Adapters between the synchronous and asynchronous worlds. Each one
//! propagates cancellation cooperatively: a cancelled stream ends cleanly, and
//! the consumer observes no error unless the underlying source raised one.

mod bridge;
mod buffer;
mod poller;
mod throttle;

pub use self::bridge::{iter_stream, IterStream};
pub use self::buffer::{bounded, BoundedBuffer, BufferConfig, FullMode};
pub use self::poller::{poll, poll_until, Poller};
pub use self::throttle::{throttle, Throttle};
