//! Writer for the GDBMI-like aggregate syntax used in payloads.
//!
//! Fields are `key="value"` pairs, tuples are `{...}` and lists `[...]`,
//! elements separated by commas. Only `"` and `\` are escaped in values; all
//! other characters are expected to be printable already (callers hex/base64
//! encode anything else).

use std::fmt::{self, Write as _};

/// Incremental writer for GDBMI-style aggregates.
#[derive(Debug, Default)]
pub struct GdbmiWriter
{
    buf: String,
    // One entry per open aggregate: whether an element was already written.
    open: Vec<bool>,
    at_start: bool,
}

impl GdbmiWriter
{
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self
    {
        Self {
            buf: String::new(),
            open: Vec::new(),
            at_start: true,
        }
    }

    fn separator(&mut self)
    {
        match self.open.last_mut() {
            Some(written) => {
                if *written {
                    self.buf.push(',');
                }
                *written = true;
            }
            None => {
                if !self.at_start {
                    self.buf.push(',');
                }
                self.at_start = false;
            }
        }
    }

    fn key(&mut self, key: Option<&str>)
    {
        self.separator();
        if let Some(key) = key {
            self.buf.push_str(key);
            self.buf.push('=');
        }
    }

    /// Write `key="value"`, escaping the value.
    pub fn field(&mut self, key: &str, value: impl fmt::Display) -> &mut Self
    {
        self.key(Some(key));
        self.buf.push('"');
        let text = value.to_string();
        escape_into(&mut self.buf, &text);
        self.buf.push('"');
        self
    }

    /// Write `key="0x..."` for an address.
    pub fn hex_field(&mut self, key: &str, value: u64) -> &mut Self
    {
        self.key(Some(key));
        let _ = write!(self.buf, "\"0x{value:x}\"");
        self
    }

    /// Open a tuple, optionally named.
    pub fn begin_tuple(&mut self, key: Option<&str>) -> &mut Self
    {
        self.key(key);
        self.buf.push('{');
        self.open.push(false);
        self
    }

    /// Close the innermost tuple.
    pub fn end_tuple(&mut self) -> &mut Self
    {
        self.open.pop();
        self.buf.push('}');
        self
    }

    /// Open a list, optionally named.
    pub fn begin_list(&mut self, key: Option<&str>) -> &mut Self
    {
        self.key(key);
        self.buf.push('[');
        self.open.push(false);
        self
    }

    /// Close the innermost list.
    pub fn end_list(&mut self) -> &mut Self
    {
        self.open.pop();
        self.buf.push(']');
        self
    }

    /// Take the written text.
    #[must_use]
    pub fn finish(self) -> String
    {
        debug_assert!(self.open.is_empty(), "unbalanced GDBMI aggregate");
        self.buf
    }
}

/// Escape `"` and `\` for use inside a quoted GDBMI value.
#[must_use]
pub fn escape(value: &str) -> String
{
    let mut out = String::with_capacity(value.len());
    escape_into(&mut out, value);
    out
}

fn escape_into(out: &mut String, value: &str)
{
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_fields_and_nesting()
    {
        let mut writer = GdbmiWriter::new();
        writer.field("token", 1);
        writer.begin_list(Some("data"));
        writer.begin_tuple(None).field("name", "a").end_tuple();
        writer.begin_tuple(None).field("name", "b").hex_field("addr", 0x10).end_tuple();
        writer.end_list();
        assert_eq!(
            writer.finish(),
            r#"token="1",data=[{name="a"},{name="b",addr="0x10"}]"#
        );
    }

    #[test]
    fn test_escaping()
    {
        assert_eq!(escape(r#""hi" \o/"#), r#"\"hi\" \\o/"#);
        let mut writer = GdbmiWriter::new();
        writer.field("value", "\"x\"");
        assert_eq!(writer.finish(), r#"value="\"x\"""#);
    }
}
