pub mod base91;
pub mod codec;
pub mod error;
pub mod media;
pub mod slot;

pub use codec::{checksum, decode, encode, fit_nearest, WireVersion, MAX_PAYLOAD};
pub use error::Sep39Error;
pub use media::{parse, render, MediaDescriptor};
pub use slot::{Slot, KEY_LIMIT, VALUE_LIMIT};
