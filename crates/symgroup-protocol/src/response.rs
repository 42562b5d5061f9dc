//! Response lines and chunking.
//!
//! Every command produces exactly one response, written as one or more lines
//! of the shape
//!
//! ```text
//! <token>|<R|N>|<remaining chunks>|<command>|<payload>
//! ```
//!
//! `R` marks success and `N` failure (the payload is then the error text).
//! Payloads longer than the chunk size are split over several lines; the
//! remaining-chunk counter counts down to 0 on the last line.

use crate::error::{ProtocolError, ProtocolResult};

/// Outcome of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind
{
    Success,
    Failure,
}

impl ResponseKind
{
    const fn marker(self) -> char
    {
        match self {
            Self::Success => 'R',
            Self::Failure => 'N',
        }
    }
}

/// A complete response before chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response
{
    pub token: u32,
    pub kind: ResponseKind,
    pub command: String,
    pub payload: String,
}

impl Response
{
    #[must_use]
    pub fn success(token: u32, command: impl Into<String>, payload: impl Into<String>) -> Self
    {
        Self {
            token,
            kind: ResponseKind::Success,
            command: command.into(),
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn failure(token: u32, command: impl Into<String>, message: impl Into<String>) -> Self
    {
        Self {
            token,
            kind: ResponseKind::Failure,
            command: command.into(),
            payload: message.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool
    {
        self.kind == ResponseKind::Success
    }

    /// Serialize into wire lines, splitting the payload into chunks of at
    /// most `chunk_size` bytes (never inside a UTF-8 sequence).
    #[must_use]
    pub fn to_lines(&self, chunk_size: usize) -> Vec<String>
    {
        let chunks = split_payload(&self.payload, chunk_size.max(1));
        let total = chunks.len();
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                format!(
                    "{}|{}|{}|{}|{}",
                    self.token,
                    self.kind.marker(),
                    total - i - 1,
                    self.command,
                    chunk
                )
            })
            .collect()
    }
}

fn split_payload(payload: &str, chunk_size: usize) -> Vec<&str>
{
    if payload.len() <= chunk_size {
        return vec![payload];
    }
    let mut chunks = Vec::new();
    let mut rest = payload;
    while !rest.is_empty() {
        let mut end = chunk_size.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // chunk_size smaller than one character
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

/// Reassembles chunked response lines.
#[derive(Debug, Default)]
pub struct Reassembler
{
    pending: Option<Response>,
}

impl Reassembler
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Feed one line; returns the complete response once the last chunk
    /// arrived.
    ///
    /// ## Errors
    ///
    /// Returns [`ProtocolError::MalformedLine`] if the line does not have the
    /// expected shape.
    pub fn push(&mut self, line: &str) -> ProtocolResult<Option<Response>>
    {
        let malformed = || ProtocolError::MalformedLine(line.to_string());
        let mut parts = line.splitn(5, '|');
        let token: u32 = parts.next().and_then(|t| t.parse().ok()).ok_or_else(malformed)?;
        let kind = match parts.next() {
            Some("R") => ResponseKind::Success,
            Some("N") => ResponseKind::Failure,
            _ => return Err(malformed()),
        };
        let remaining: usize = parts.next().and_then(|r| r.parse().ok()).ok_or_else(malformed)?;
        let command = parts.next().ok_or_else(malformed)?;
        let payload = parts.next().ok_or_else(malformed)?;

        match &mut self.pending {
            Some(pending) if pending.token == token => pending.payload.push_str(payload),
            _ => {
                self.pending = Some(Response {
                    token,
                    kind,
                    command: command.to_string(),
                    payload: payload.to_string(),
                });
            }
        }
        if remaining == 0 {
            return Ok(self.pending.take());
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_single_line()
    {
        let lines = Response::success(7, "locals", "locals=[]").to_lines(1024);
        assert_eq!(lines, vec!["7|R|0|locals|locals=[]"]);
    }

    #[test]
    fn test_failure_line()
    {
        let lines = Response::failure(3, "assign", "No such node local.q").to_lines(1024);
        assert_eq!(lines, vec!["3|N|0|assign|No such node local.q"]);
    }

    #[test]
    fn test_chunking_counts_down()
    {
        let response = Response::success(1, "locals", "abcdefghij");
        let lines = response.to_lines(4);
        assert_eq!(lines, vec!["1|R|2|locals|abcd", "1|R|1|locals|efgh", "1|R|0|locals|ij"]);

        let mut reassembler = Reassembler::new();
        assert_eq!(reassembler.push(&lines[0]).unwrap(), None);
        assert_eq!(reassembler.push(&lines[1]).unwrap(), None);
        assert_eq!(reassembler.push(&lines[2]).unwrap(), Some(response));
    }

    #[test]
    fn test_chunking_respects_char_boundaries()
    {
        let payload = "a\u{e9}\u{e9}b";
        let lines = Response::success(1, "x", payload).to_lines(2);
        let mut reassembler = Reassembler::new();
        let mut result = None;
        for line in &lines {
            result = reassembler.push(line).unwrap();
        }
        assert_eq!(result.unwrap().payload, payload);
    }

    #[test]
    fn test_malformed_line()
    {
        let mut reassembler = Reassembler::new();
        assert!(reassembler.push("garbage").is_err());
        assert!(reassembler.push("1|X|0|cmd|").is_err());
    }
}
