use thiserror::Error;

/// Everything that can go wrong while packing or unpacking a SEP-39 slot
/// sequence.  All variants are local validation failures: nothing here is
/// retriable, and no partial result is ever returned alongside one.
#[derive(Error, Debug)]
pub enum Sep39Error {
    #[error("payload of {len} bytes exceeds the SEP-39 maximum of {max}")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("invalid media descriptor token {token:?} (whitespace, '=', ';' and ',' are reserved)")]
    InvalidDescriptor { token: String },
    #[error("descriptor {index} needs a size parameter s=... (only the last descriptor may omit it)")]
    MissingSizeParameter { index: usize },
    #[error("malformed metadata segment {segment:?}")]
    MalformedMetadata { segment: String },
    #[error("invalid SEP-39 frame: first slot key begins with {found:?}")]
    InvalidFrame { found: String },
    #[error("invalid metadata length field: {reason}")]
    InvalidLength { reason: String },
    #[error("metadata truncated: declared {declared} characters, slots carry {got}")]
    TruncatedMetadata { declared: usize, got: usize },
    #[error("{descriptors} descriptor(s) cannot be satisfied by {remaining} remaining payload byte(s) (missing s=... sizes?)")]
    AttachmentCountMismatch { descriptors: usize, remaining: usize },
    #[error("attachment {index} checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { index: usize, expected: u32, actual: u32 },
    /// A slot key byte outside the basE91 alphabet (or outside ASCII entirely).
    #[error("invalid basE91 byte {byte:#04x} in slot key")]
    InvalidEncoding { byte: u8 },
    /// The header plus payload needed more slots than the two-character
    /// base-36 index can address.
    #[error("slot sequence needs index {index}, beyond the two-character base-36 range 0..={max}")]
    SlotIndexOverflow { index: usize, max: usize },
}
