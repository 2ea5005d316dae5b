//! Production-grade streaming readers over files and byte streams: an
//! RFC-4180-strict CSV reader with schema and type inference, a streaming
//! JSON element reader, and a hardened YAML reader, all sharing the error
//! substrate, metrics and progress contracts of the [`ops`] crate.
//!
//! Sync readers are plain `Iterator`s of `Result<T, ReadError>`; the async
//! entry points in [`read`] bridge them onto `futures::Stream` via
//! [`unify::iter_stream`]. The first `Err` a reader yields is terminal: it
//! will not be polled again.

mod chars;
mod error;

pub mod csv;
pub mod input;
pub mod json;
pub mod profile;
pub mod read;
pub mod text;
pub mod yaml;

pub use self::error::ReadError;
pub use self::input::Input;

pub use ops::{ErrorAction, ErrorKind, Origin, ReadOptions};
