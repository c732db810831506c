//! Toolkit-native value types that cross the host boundary.
//!
//! Hosts exchange text as UTF-16 code units; internally the scene keeps
//! UTF-8. The conversions in this module are the only place the bridge
//! re-encodes, so the round-trip rules live here: well-formed text survives
//! unchanged, unpaired surrogates decode to U+FFFD.

use url::Url;

use crate::error::SceneError;

/// Text value as the scene stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SceneText(String);

impl SceneText {
    /// The empty text value.
    pub fn new() -> Self {
        Self(String::new())
    }

    /// Decode a buffer of UTF-16 code units. Unpaired surrogates become
    /// U+FFFD so the result is always scalar text.
    pub fn from_utf16_units(units: &[u16]) -> Self {
        let text: String = char::decode_utf16(units.iter().copied())
            .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        Self(text)
    }

    /// Number of UTF-16 code units this value occupies when marshalled.
    pub fn utf16_len(&self) -> usize {
        self.0.encode_utf16().count()
    }

    /// Write the value into `dest` as UTF-16 code units without a
    /// terminator. Returns the number of units written; `dest` is expected
    /// to hold at least [`utf16_len`](Self::utf16_len) units.
    pub fn copy_to_utf16(&self, dest: &mut [u16]) -> usize {
        let mut written = 0;
        for (slot, unit) in dest.iter_mut().zip(self.0.encode_utf16()) {
            *slot = unit;
            written += 1;
        }
        written
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for SceneText {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SceneText {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for SceneText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// URL value backed by the WHATWG parser, so hosts get the same
/// normalization the scene loader applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneUrl(Url);

impl SceneUrl {
    /// Parse an absolute URL from text.
    pub fn parse(input: &str) -> Result<Self, SceneError> {
        Ok(Self(Url::parse(input)?))
    }

    /// Parse the content of a text value as a URL.
    pub fn from_text(text: &SceneText) -> Result<Self, SceneError> {
        Self::parse(text.as_str())
    }

    /// Serialized form, as a text value ready to marshal back to the host.
    pub fn to_text(&self) -> SceneText {
        SceneText::from(self.0.as_str())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl From<Url> for SceneUrl {
    fn from(value: Url) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SceneUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}
