//! Request parameters shared by the dump commands.
//!
//! The IDE sends a frame index, the inames it currently shows expanded and a
//! map of display formats keyed by iname or by type name. Keys that contain
//! `,` or `:` themselves (template type names) are sent hex encoded with a
//! `hex:` prefix.

use std::collections::HashMap;

use crate::error::{ProtocolError, ProtocolResult};

/// Display format requested for a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum DisplayFormat
{
    /// Let the dumper decide
    #[default]
    Automatic,
    Hexadecimal,
    Decimal,
    Octal,
    Binary,
    /// Show strings in a separate window: adds the complete value as `editvalue`
    SeparateWindow,
}

impl DisplayFormat
{
    /// Decode the wire code.
    ///
    /// ## Errors
    ///
    /// Returns [`ProtocolError::UnknownFormat`] for unknown codes.
    pub fn from_code(code: u32) -> ProtocolResult<Self>
    {
        match code {
            0 => Ok(Self::Automatic),
            1 => Ok(Self::Hexadecimal),
            2 => Ok(Self::Decimal),
            3 => Ok(Self::Octal),
            4 => Ok(Self::Binary),
            5 => Ok(Self::SeparateWindow),
            other => Err(ProtocolError::UnknownFormat(other)),
        }
    }

    /// Render an integer in this format, `None` when the format does not
    /// apply to integers.
    #[must_use]
    pub fn format_integer(self, value: i64, size: u64) -> Option<String>
    {
        // Reinterpret negative values at their natural width
        let bits = size.clamp(1, 8) * 8;
        let unsigned = if bits == 64 {
            value as u64
        } else {
            (value as u64) & ((1u64 << bits) - 1)
        };
        match self {
            Self::Hexadecimal => Some(format!("0x{unsigned:x}")),
            Self::Decimal => Some(value.to_string()),
            Self::Octal => Some(format!("0{unsigned:o}")),
            Self::Binary => Some(format!("0b{unsigned:b}")),
            Self::Automatic | Self::SeparateWindow => None,
        }
    }
}

/// Display formats keyed by iname (`local.x`) or type name (`QString`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatMap
{
    entries: HashMap<String, DisplayFormat>,
}

impl FormatMap
{
    /// Parse `key:code,key:code`. Keys may be `hex:`-prefixed.
    ///
    /// ## Errors
    ///
    /// Returns an error for entries without a code, unknown codes or bad hex.
    pub fn parse(text: &str) -> ProtocolResult<Self>
    {
        let mut entries = HashMap::new();
        for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, code) = entry
                .rsplit_once(':')
                .ok_or_else(|| ProtocolError::InvalidFormatEntry(entry.to_string()))?;
            let code: u32 = code
                .parse()
                .map_err(|_| ProtocolError::InvalidFormatEntry(entry.to_string()))?;
            let key = match key.strip_prefix("hex:") {
                Some(encoded) => String::from_utf8_lossy(&hex::decode(encoded)?).into_owned(),
                None => key.to_string(),
            };
            entries.insert(key, DisplayFormat::from_code(code)?);
        }
        Ok(Self { entries })
    }

    /// Add or replace a format.
    pub fn insert(&mut self, key: impl Into<String>, format: DisplayFormat)
    {
        self.entries.insert(key.into(), format);
    }

    /// Format for a node: the iname entry wins over the type entry.
    #[must_use]
    pub fn lookup(&self, iname: &str, type_name: &str) -> DisplayFormat
    {
        self.entries
            .get(iname)
            .or_else(|| self.entries.get(type_name))
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}

/// Split a comma separated iname list, dropping empty items.
#[must_use]
pub fn parse_iname_list(text: &str) -> Vec<String>
{
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Parameters of a locals or watches dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpRequest
{
    /// Thread the frame belongs to, `None` for the engine's current thread
    pub thread: Option<u64>,
    /// Stack frame index
    pub frame: u32,
    /// Inames shown expanded in the IDE
    pub expanded: Vec<String>,
    /// Inames of variables not initialized at the current location
    pub uninitialized: Vec<String>,
    pub formats: FormatMap,
    /// Dump only this subtree instead of the whole scope
    pub partial: Option<String>,
}

impl DumpRequest
{
    /// Request for a frame with everything else defaulted.
    #[must_use]
    pub fn for_frame(frame: u32) -> Self
    {
        Self {
            frame,
            ..Self::default()
        }
    }

    /// Builder-style: set the expanded inames.
    #[must_use]
    pub fn with_expanded<I, S>(mut self, inames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expanded = inames.into_iter().map(Into::into).collect();
        self
    }
}
