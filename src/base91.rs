//! basE91 binary-to-text codec (Joachim Henke's scheme).
//!
//! The packer leans on two properties of this encoding:
//!   - The output is strictly longer than the input for any non-empty input
//!     (13 or 14 payload bits per two output characters).
//!   - Expansion is bounded: never worse than 16/13 ≈ 1.231×, never better
//!     than 16/14 ≈ 1.143×.  The near-fit search in [`crate::codec`] uses the
//!     1.10 optimistic divisor as a safe upper start because of the latter.
//!
//! The decoder is strict: any byte outside the 91-character alphabet is an
//! error, not skipped.  Slot keys are produced by this crate; a stray byte
//! means corruption.

use crate::error::Sep39Error;

const ALPHABET: &[u8; 91] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!#$%&()*+,./:;<=>?@[]^_`{|}~\"";

const DECODE_TABLE: [u8; 256] = {
    let mut table = [0xFF; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// basE91-encode `data`.
pub fn encode91(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 16 / 13 + 2);
    let mut queue: u32 = 0;
    let mut nbits: u32 = 0;

    for &byte in data {
        queue |= (byte as u32) << nbits;
        nbits += 8;
        if nbits > 13 {
            // 13-bit values above 88 stand alone; smaller ones take a 14th
            // bit so that every character pair carries at least 13 bits.
            let mut v = queue & 8191;
            if v > 88 {
                queue >>= 13;
                nbits -= 13;
            } else {
                v = queue & 16383;
                queue >>= 14;
                nbits -= 14;
            }
            out.push(ALPHABET[(v % 91) as usize] as char);
            out.push(ALPHABET[(v / 91) as usize] as char);
        }
    }

    if nbits > 0 {
        out.push(ALPHABET[(queue % 91) as usize] as char);
        if nbits > 7 || queue > 90 {
            out.push(ALPHABET[(queue / 91) as usize] as char);
        }
    }
    out
}

/// basE91-decode `text` back into bytes.
pub fn decode91(text: &str) -> Result<Vec<u8>, Sep39Error> {
    let mut out = Vec::with_capacity(text.len() * 14 / 16 + 1);
    let mut queue: u32 = 0;
    let mut nbits: u32 = 0;
    let mut low: Option<u32> = None;

    for byte in text.bytes() {
        let digit = DECODE_TABLE[byte as usize];
        if digit == 0xFF {
            return Err(Sep39Error::InvalidEncoding { byte });
        }
        match low.take() {
            None => low = Some(digit as u32),
            Some(l) => {
                let v = l + digit as u32 * 91;
                queue |= v << nbits;
                nbits += if (v & 8191) > 88 { 13 } else { 14 };
                while nbits >= 8 {
                    out.push((queue & 0xFF) as u8);
                    queue >>= 8;
                    nbits -= 8;
                }
            }
        }
    }

    // A dangling character carries the final partial byte.
    if let Some(l) = low {
        out.push(((queue | (l << nbits)) & 0xFF) as u8);
    }
    Ok(out)
}
