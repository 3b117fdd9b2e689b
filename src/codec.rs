//! The SEP-39 slot packer and unpacker.
//!
//! # Wire layout
//! A frame header (version digit, metadata length, metadata string) is
//! laid across slots at a fixed split: 62 header characters in the key after
//! the two-character index, 64 in the value, i.e. 126 header characters per
//! slot, uninterpreted ASCII.  The payload follows in binary mode: basE91
//! text greedily fitted into whatever key capacity remains, raw bytes in the
//! values.  The decoder recomputes the header/binary boundary from the
//! declared metadata length alone; no pointer is stored.
//!
//! # Revisions
//! Two length-field conventions exist on the wire.  Revision 1 is a fixed
//! six-digit zero-padded count.  Revision 2, the canonical form, is a
//! self-delimiting digit run where a leading `0` terminates the field
//! immediately.  [`encode`] takes the revision explicitly; [`decode`]
//! dispatches on the version digit and accepts both.

use crate::base91::{decode91, encode91};
use crate::error::Sep39Error;
use crate::media::{self, MediaDescriptor};
use crate::slot::{encode_index, Slot, INDEX_WIDTH, KEY_LIMIT, MAX_INDEX, VALUE_LIMIT};

/// Exclusive upper bound on payload size (and on metadata length).
pub const MAX_PAYLOAD: usize = 126_000;
/// Header characters carried in a slot key after the index prefix.
pub const HEADER_KEY_SPAN: usize = KEY_LIMIT - INDEX_WIDTH;
/// Header characters carried per full slot.
pub const HEADER_SLOT_SPAN: usize = HEADER_KEY_SPAN + VALUE_LIMIT;
/// The metadata length field never needs more than six digits.
const LENGTH_DIGITS_MAX: usize = 6;

// ── Wire revisions ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireVersion {
    /// Legacy: fixed six-digit zero-padded metadata length.
    V1,
    /// Canonical: self-delimiting digits, leading `0` terminates the field.
    V2,
}

impl WireVersion {
    pub fn digit(self) -> char {
        match self {
            WireVersion::V1 => '1',
            WireVersion::V2 => '2',
        }
    }

    pub fn from_digit(c: char) -> Option<Self> {
        match c {
            '1' => Some(WireVersion::V1),
            '2' => Some(WireVersion::V2),
            _ => None,
        }
    }
}

/// CRC32 of `data`, as declared in `c` parameters.
pub fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

// ── Encode ───────────────────────────────────────────────────────────────────

/// Pack `data`, described by `descriptors`, into a slot sequence.
///
/// Every descriptor except the last must declare its size (`s=`); without it
/// the decoder cannot locate attachment boundaries.
pub fn encode(
    data: &[u8],
    descriptors: &[MediaDescriptor],
    version: WireVersion,
) -> Result<Vec<Slot>, Sep39Error> {
    if data.len() >= MAX_PAYLOAD {
        return Err(Sep39Error::PayloadTooLarge { len: data.len(), max: MAX_PAYLOAD });
    }
    for (index, descriptor) in descriptors.iter().enumerate() {
        if index + 1 < descriptors.len() && descriptor.param(media::PARAM_SIZE).is_none() {
            return Err(Sep39Error::MissingSizeParameter { index });
        }
    }

    let metadata = media::render(descriptors)?;
    if metadata.len() >= MAX_PAYLOAD {
        return Err(Sep39Error::PayloadTooLarge { len: metadata.len(), max: MAX_PAYLOAD });
    }
    let header = frame_header(&metadata, version)?;

    // Header slots: plain ASCII at the fixed 62+64 split.
    let mut slots = Vec::new();
    let mut pos = 0;
    while pos < header.len() {
        let key_end = (pos + HEADER_KEY_SPAN).min(header.len());
        let value_end = (key_end + VALUE_LIMIT).min(header.len());
        let mut key = next_index(slots.len())?;
        key.push_str(&header[pos..key_end]);
        slots.push(Slot { key, value: header.as_bytes()[key_end..value_end].to_vec() });
        pos = value_end;
    }

    // Top off the final header slot with the start of the payload: basE91
    // text into the key's spare characters, raw bytes into the value's.
    let mut data = data;
    if let Some(last) = slots.last_mut() {
        let (encoded, consumed) = fit_nearest(data, KEY_LIMIT - last.key.len());
        last.key.push_str(&encoded);
        data = &data[consumed..];
        let take = (VALUE_LIMIT - last.value.len()).min(data.len());
        last.value.extend_from_slice(&data[..take]);
        data = &data[take..];
    }

    // Pure binary slots for the remainder.
    while !data.is_empty() {
        let mut key = next_index(slots.len())?;
        let (encoded, consumed) = fit_nearest(data, KEY_LIMIT - INDEX_WIDTH);
        key.push_str(&encoded);
        data = &data[consumed..];
        let take = VALUE_LIMIT.min(data.len());
        slots.push(Slot { key, value: data[..take].to_vec() });
        data = &data[take..];
    }

    Ok(slots)
}

fn next_index(index: usize) -> Result<String, Sep39Error> {
    encode_index(index).ok_or(Sep39Error::SlotIndexOverflow { index, max: MAX_INDEX })
}

fn frame_header(metadata: &str, version: WireVersion) -> Result<String, Sep39Error> {
    let length_field = match version {
        WireVersion::V1 => format!("{:06}", metadata.len()),
        WireVersion::V2 => {
            let field = metadata.len().to_string();
            // A short length field followed by a digit-initial metadata
            // string would be swallowed into the length on decode.  No IANA
            // top-level media type begins with a digit, so reject rather
            // than emit an unparseable frame.
            if field.len() < LENGTH_DIGITS_MAX
                && metadata.as_bytes().first().is_some_and(|b| b.is_ascii_digit())
            {
                let token = metadata.split(',').next().unwrap_or(metadata);
                return Err(Sep39Error::InvalidDescriptor { token: token.to_string() });
            }
            field
        }
    };
    Ok(format!("{}{}{}", version.digit(), length_field, metadata))
}

/// basE91-encode the longest prefix of `data` whose encoding fits within
/// `budget` characters.  Returns the encoded text and the byte count consumed.
///
/// basE91 never beats ~10% overhead, so `ceil(budget / 1.10)` bounds the
/// longest prefix that could possibly fit; the scan walks down from there
/// and terminates at zero.  Encoded length is monotone in prefix length, so
/// the first fit found is the longest.
pub fn fit_nearest(data: &[u8], budget: usize) -> (String, usize) {
    let optimistic = (budget * 10).div_ceil(11);
    let mut take = optimistic.min(data.len());
    while take > 0 {
        let encoded = encode91(&data[..take]);
        if encoded.len() <= budget {
            return (encoded, take);
        }
        take -= 1;
    }
    (String::new(), 0)
}

// ── Decode ───────────────────────────────────────────────────────────────────

/// Unpack a slot sequence back into its descriptors and attachments.
///
/// With an empty descriptor list the whole byte stream is returned as a
/// single anonymous attachment.
pub fn decode(slots: &[Slot]) -> Result<(Vec<MediaDescriptor>, Vec<Vec<u8>>), Sep39Error> {
    let first = slots
        .first()
        .ok_or_else(|| Sep39Error::InvalidFrame { found: String::new() })?;
    for slot in slots {
        if let Some(&byte) = slot.key.as_bytes().iter().find(|b| !b.is_ascii()) {
            return Err(Sep39Error::InvalidEncoding { byte });
        }
    }

    let key = first.key.as_str();
    let version = key
        .strip_prefix("00")
        .and_then(|rest| rest.chars().next())
        .and_then(WireVersion::from_digit)
        .ok_or_else(|| Sep39Error::InvalidFrame { found: key.chars().take(3).collect() })?;

    let field = key.get(INDEX_WIDTH + 1..).unwrap_or("");
    let (metadata_len, length_width) = parse_length(field, version)?;

    let metadata = reassemble_metadata(slots, length_width, metadata_len)?;
    let descriptors = media::parse(&metadata)?;

    // Recompute where binary mode begins: the header is exactly
    // 1 (version) + length field + metadata characters, laid out at
    // HEADER_SLOT_SPAN characters per slot.
    let header_chars = 1 + length_width + metadata_len;
    let start_slot = header_chars / HEADER_SLOT_SPAN;
    let offset = header_chars % HEADER_SLOT_SPAN;

    let mut binary = Vec::new();
    if let Some(slot) = slots.get(start_slot) {
        let key_cut = INDEX_WIDTH + offset.min(HEADER_KEY_SPAN);
        let value_cut = offset.saturating_sub(HEADER_KEY_SPAN);
        binary.append(&mut decode91(tail(&slot.key, key_cut))?);
        binary.extend_from_slice(&slot.value[value_cut.min(slot.value.len())..]);
        for slot in &slots[start_slot + 1..] {
            binary.append(&mut decode91(tail(&slot.key, INDEX_WIDTH))?);
            binary.extend_from_slice(&slot.value);
        }
    }

    split_attachments(descriptors, binary)
}

fn parse_length(field: &str, version: WireVersion) -> Result<(usize, usize), Sep39Error> {
    let (value, width) = match version {
        WireVersion::V1 => {
            let digits = field.get(..LENGTH_DIGITS_MAX).ok_or_else(|| Sep39Error::InvalidLength {
                reason: format!("fixed-width field truncated: {field:?}"),
            })?;
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Sep39Error::InvalidLength {
                    reason: format!("expected six digits, found {digits:?}"),
                });
            }
            (decimal(digits), LENGTH_DIGITS_MAX)
        }
        WireVersion::V2 => {
            let bytes = field.as_bytes();
            match bytes.first() {
                None => {
                    return Err(Sep39Error::InvalidLength { reason: "empty length field".to_string() })
                }
                Some(b) if !b.is_ascii_digit() => {
                    return Err(Sep39Error::InvalidLength {
                        reason: format!("expected a digit, found {:?}", *b as char),
                    })
                }
                // A leading zero always terminates the field: the only
                // metadata length it can open is zero itself.
                Some(&b'0') => (0, 1),
                Some(_) => {
                    let width = bytes
                        .iter()
                        .take(LENGTH_DIGITS_MAX)
                        .take_while(|b| b.is_ascii_digit())
                        .count();
                    (decimal(&field[..width]), width)
                }
            }
        }
    };
    if value >= MAX_PAYLOAD {
        return Err(Sep39Error::InvalidLength {
            reason: format!("declared length {value} exceeds the {MAX_PAYLOAD} cap"),
        });
    }
    Ok((value, width))
}

/// Parse a run of ASCII digits.  Callers have already validated the bytes;
/// six digits cannot overflow usize.
fn decimal(digits: &str) -> usize {
    digits.bytes().fold(0, |acc, b| acc * 10 + (b - b'0') as usize)
}

fn reassemble_metadata(
    slots: &[Slot],
    length_width: usize,
    metadata_len: usize,
) -> Result<String, Sep39Error> {
    let truncated = |got: usize| Sep39Error::TruncatedMetadata { declared: metadata_len, got };

    // Slot 0 first: key characters after index + version + length field,
    // then value characters.
    let first = &slots[0];
    let mut metadata = String::with_capacity(metadata_len);
    let key_rest = tail(&first.key, INDEX_WIDTH + 1 + length_width);
    metadata.push_str(&key_rest[..key_rest.len().min(metadata_len)]);
    let from_value = (metadata_len - metadata.len()).min(first.value.len());
    metadata.push_str(ascii(&first.value[..from_value])?);

    // Each further slot carries exactly HEADER_SLOT_SPAN characters; the
    // final one contributes only the exact remaining count, never more.
    let remaining = metadata_len - metadata.len();
    if remaining > 0 {
        let full_slots = remaining / HEADER_SLOT_SPAN;
        let partial = remaining % HEADER_SLOT_SPAN;
        let mut index = 1;
        for _ in 0..full_slots {
            let slot = slots.get(index).ok_or_else(|| truncated(metadata.len()))?;
            metadata.push_str(tail(&slot.key, INDEX_WIDTH));
            metadata.push_str(ascii(&slot.value)?);
            index += 1;
        }
        if partial > 0 {
            let slot = slots.get(index).ok_or_else(|| truncated(metadata.len()))?;
            let from_key = partial.min(HEADER_KEY_SPAN);
            let key_rest = tail(&slot.key, INDEX_WIDTH);
            metadata.push_str(&key_rest[..from_key.min(key_rest.len())]);
            let from_value = (partial - from_key).min(slot.value.len());
            metadata.push_str(ascii(&slot.value[..from_value])?);
        }
    }

    if metadata.len() != metadata_len {
        return Err(truncated(metadata.len()));
    }
    Ok(metadata)
}

fn split_attachments(
    descriptors: Vec<MediaDescriptor>,
    binary: Vec<u8>,
) -> Result<(Vec<MediaDescriptor>, Vec<Vec<u8>>), Sep39Error> {
    if descriptors.is_empty() {
        return Ok((descriptors, vec![binary]));
    }

    let mut attachments = Vec::with_capacity(descriptors.len());
    let mut stream = binary.as_slice();
    for (index, descriptor) in descriptors.iter().enumerate() {
        let size = match descriptor.declared_size()? {
            Some(size) => size,
            // Only the final descriptor may claim the remainder.
            None if index + 1 == descriptors.len() => stream.len(),
            None => {
                return Err(Sep39Error::AttachmentCountMismatch {
                    descriptors: descriptors.len(),
                    remaining: stream.len(),
                })
            }
        };
        if size > stream.len() {
            return Err(Sep39Error::AttachmentCountMismatch {
                descriptors: descriptors.len(),
                remaining: stream.len(),
            });
        }
        let (attachment, rest) = stream.split_at(size);
        if let Some(expected) = descriptor.declared_checksum()? {
            let actual = checksum(attachment);
            if expected != actual {
                return Err(Sep39Error::ChecksumMismatch { index, expected, actual });
            }
        }
        attachments.push(attachment.to_vec());
        stream = rest;
    }
    Ok((descriptors, attachments))
}

/// `&key[from..]`, clamped.  Keys are validated ASCII before use, so any
/// in-range cut lands on a character boundary.
fn tail(key: &str, from: usize) -> &str {
    key.get(from.min(key.len())..).unwrap_or("")
}

fn ascii(bytes: &[u8]) -> Result<&str, Sep39Error> {
    if !bytes.is_ascii() {
        return Err(Sep39Error::MalformedMetadata {
            segment: String::from_utf8_lossy(bytes).into_owned(),
        });
    }
    Ok(std::str::from_utf8(bytes).unwrap_or_default())
}
