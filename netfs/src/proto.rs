//! Wire protocol: NUL-delimited frames over one TCP stream.
//!
//! A request is a single line, `verb [arg1 [arg2]]` followed by CRLF; a
//! response carries a status line, a `Length` header, a blank line and the
//! body. Both directions terminate each message with a NUL byte.

use std::io::{self, ErrorKind, Read, Write};

use blockfs::Status;

/// Terminates every message on the wire.
pub const FRAME_END: u8 = 0;

/// A parsed client command. Arities are fixed; anything that does not match
/// a known verb and shape fails to parse and is answered with
/// `COMMAND_NOT_FOUND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Mkdir(String),
    Cd(String),
    Home,
    Rmdir(String),
    Ls,
    Create(String),
    Append(String, String),
    Cat(String),
    Head(String, usize),
    Rm(String),
    Stat(String),
}

impl Request {
    /// Parses one request line. Line endings are tolerated and stripped.
    pub fn parse(line: &str) -> Option<Request> {
        let argv: Vec<&str> = line.split_whitespace().collect();
        let request = match argv.as_slice() {
            ["ls"] => Request::Ls,
            ["home"] => Request::Home,
            ["mkdir", name] => Request::Mkdir(name.to_string()),
            ["cd", name] => Request::Cd(name.to_string()),
            ["rmdir", name] => Request::Rmdir(name.to_string()),
            ["create", name] => Request::Create(name.to_string()),
            ["cat", name] => Request::Cat(name.to_string()),
            ["rm", name] => Request::Rm(name.to_string()),
            ["stat", name] => Request::Stat(name.to_string()),
            ["append", name, data] => Request::Append(name.to_string(), data.to_string()),
            ["head", name, size] => Request::Head(name.to_string(), size.parse().ok()?),
            _ => return None,
        };
        Some(request)
    }

    /// Renders the request line for the wire, CRLF included.
    pub fn encode(&self) -> String {
        match self {
            Request::Ls => "ls\r\n".to_string(),
            Request::Home => "home\r\n".to_string(),
            Request::Mkdir(name) => format!("mkdir {name}\r\n"),
            Request::Cd(name) => format!("cd {name}\r\n"),
            Request::Rmdir(name) => format!("rmdir {name}\r\n"),
            Request::Create(name) => format!("create {name}\r\n"),
            Request::Cat(name) => format!("cat {name}\r\n"),
            Request::Rm(name) => format!("rm {name}\r\n"),
            Request::Stat(name) => format!("stat {name}\r\n"),
            Request::Append(name, data) => format!("append {name} {data}\r\n"),
            Request::Head(name, size) => format!("head {name} {size}\r\n"),
        }
    }
}

/// A decoded server reply: the command status and the verbatim body bytes.
#[derive(Debug, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub body: Vec<u8>,
}

impl Response {
    /// Renders the response message (without the frame terminator).
    pub fn encode(status: Status, body: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "{} {}\r\nLength: {}\r\n\r\n",
            status.code(),
            status.symbol(),
            body.len()
        )
        .into_bytes();
        out.extend_from_slice(body);
        out
    }

    /// Parses a received frame back into status and body.
    pub fn decode(frame: &[u8]) -> io::Result<Response> {
        let bad = |what: &str| io::Error::new(ErrorKind::InvalidData, format!("malformed response: {what}"));

        let header_end = frame
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .ok_or_else(|| bad("missing header terminator"))?;
        let header =
            std::str::from_utf8(&frame[..header_end]).map_err(|_| bad("non-text header"))?;

        let mut lines = header.split("\r\n");
        let code = lines
            .next()
            .and_then(|line| line.split_whitespace().next())
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| bad("bad status line"))?;
        let status = Status::from_code(code).ok_or_else(|| bad("unknown status code"))?;

        let length = lines
            .next()
            .and_then(|line| line.strip_prefix("Length: "))
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| bad("bad length header"))?;

        let body = &frame[header_end + 4..];
        if body.len() != length {
            return Err(bad("body length mismatch"));
        }
        Ok(Response {
            status,
            body: body.to_vec(),
        })
    }
}

/// Reads one frame, up to but excluding the NUL terminator. Returns `None`
/// on end-of-stream before any byte arrives (the peer hung up cleanly).
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut frame = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte)? == 0 {
            if frame.is_empty() {
                return Ok(None);
            }
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                "connection closed mid-message",
            ));
        }
        if byte[0] == FRAME_END {
            return Ok(Some(frame));
        }
        frame.push(byte[0]);
    }
}

/// Writes one frame, appending the NUL terminator.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    writer.write_all(payload)?;
    writer.write_all(&[FRAME_END])?;
    writer.flush()
}
