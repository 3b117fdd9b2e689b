//! Media descriptors and the comma-and-semicolon metadata language.
//!
//! A metadata string is an ordered sequence of descriptors, each rendered as
//! `type/subtype;key=value;key=value` and joined with `,`.  Two parameter
//! keys are reserved: `s` (declared attachment size in bytes, decimal) and
//! `c` (declared CRC32, decimal).  Everything else is opaque pass-through
//! metadata such as a display name.

use crate::error::Sep39Error;

/// Reserved parameter key: declared attachment size in bytes.
pub const PARAM_SIZE: &str = "s";
/// Reserved parameter key: declared CRC32 checksum, decimal.
pub const PARAM_CHECKSUM: &str = "c";

/// One attachment's media type plus its ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub type_subtype: String,
    /// Insertion-ordered; rendering preserves the order the caller set.
    pub params: Vec<(String, String)>,
}

impl MediaDescriptor {
    pub fn new(type_subtype: impl Into<String>) -> Self {
        Self { type_subtype: type_subtype.into(), params: Vec::new() }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn with_size(self, size: usize) -> Self {
        self.with_param(PARAM_SIZE, size.to_string())
    }

    pub fn with_checksum(self, crc: u32) -> Self {
        self.with_param(PARAM_CHECKSUM, crc.to_string())
    }

    /// First value recorded under `key`, if any.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The declared `s` parameter, parsed.
    pub fn declared_size(&self) -> Result<Option<usize>, Sep39Error> {
        self.parsed_param(PARAM_SIZE)
    }

    /// The declared `c` parameter, parsed.
    pub fn declared_checksum(&self) -> Result<Option<u32>, Sep39Error> {
        self.parsed_param(PARAM_CHECKSUM)
    }

    fn parsed_param<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, Sep39Error> {
        match self.param(key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| Sep39Error::MalformedMetadata {
                segment: format!("{key}={raw}"),
            }),
        }
    }
}

/// Serialize descriptors into a metadata string.
///
/// Every token is validated: the separator characters and whitespace are
/// reserved by the format and are not escaped.
pub fn render(descriptors: &[MediaDescriptor]) -> Result<String, Sep39Error> {
    let mut groups = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        check_token(&descriptor.type_subtype)?;
        let mut group = descriptor.type_subtype.clone();
        for (key, value) in &descriptor.params {
            check_token(key)?;
            if !value.is_empty() {
                check_token(value)?;
            }
            group.push(';');
            group.push_str(key);
            group.push('=');
            group.push_str(value);
        }
        groups.push(group);
    }
    Ok(groups.join(","))
}

/// Parse a metadata string back into descriptors.  The empty string parses
/// to an empty list.
pub fn parse(metadata: &str) -> Result<Vec<MediaDescriptor>, Sep39Error> {
    if metadata.is_empty() {
        return Ok(Vec::new());
    }
    let mut descriptors = Vec::new();
    for group in metadata.split(',') {
        let mut segments = group.split(';');
        let type_subtype = segments.next().unwrap_or_default();
        if type_subtype.is_empty() {
            return Err(Sep39Error::MalformedMetadata { segment: group.to_string() });
        }
        let mut params = Vec::new();
        for segment in segments {
            let Some((key, value)) = segment.split_once('=') else {
                return Err(Sep39Error::MalformedMetadata { segment: segment.to_string() });
            };
            if key.is_empty() {
                return Err(Sep39Error::MalformedMetadata { segment: segment.to_string() });
            }
            params.push((key.to_string(), value.to_string()));
        }
        descriptors.push(MediaDescriptor { type_subtype: type_subtype.to_string(), params });
    }
    Ok(descriptors)
}

fn check_token(token: &str) -> Result<(), Sep39Error> {
    let reserved = |c: char| c.is_whitespace() || c == '=' || c == ';' || c == ',';
    if token.is_empty() || !token.is_ascii() || token.chars().any(reserved) {
        return Err(Sep39Error::InvalidDescriptor { token: token.to_string() });
    }
    Ok(())
}
