//! Minimal STOMP 1.2 frame codec.
//!
//! Covers what a subscriber needs: `CONNECT`, `SUBSCRIBE`, `DISCONNECT` out,
//! `CONNECTED`, `MESSAGE`, `RECEIPT`, `ERROR` in. Heart-beat EOLs decode to
//! `None`.

use crate::channel::TransportError;
use std::fmt;
use std::time::Duration;

/// Heart-beat interval offered in both directions on `CONNECT`.
pub const DEFAULT_HEART_BEAT: Duration = Duration::from_secs(10);

/// Missed inbound beats tolerated before the connection counts as dead.
const SILENCE_TOLERANCE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "CONNECT" | "STOMP" => Command::Connect,
            "CONNECTED" => Command::Connected,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            _ => return None,
        })
    }

    // Header values of CONNECT and CONNECTED frames are not escaped.
    fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: String::new() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// `CONNECT` carrying the bearer token.
    ///
    /// `heart_beat` is offered for both directions; zero turns heart-beating
    /// off.
    pub fn connect(host: &str, token: &str, heart_beat: Duration) -> Self {
        let ms = heart_beat.as_millis();
        Frame::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header("heart-beat", format!("{ms},{ms}"))
            .with_header("Authorization", format!("Bearer {token}"))
    }

    /// `SUBSCRIBE` to `/topic/{topic}`.
    pub fn subscribe(id: &str, topic: &str) -> Self {
        Frame::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", format!("/topic/{topic}"))
            .with_header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Frame::new(Command::Unsubscribe).with_header("id", id)
    }

    pub fn disconnect() -> Self {
        Frame::new(Command::Disconnect)
    }

    /// First value of `name`; repeated headers keep the first occurrence.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decodes one frame from a text message.
    ///
    /// Returns `Ok(None)` for a heart-beat (only line endings).
    pub fn decode(text: &str) -> Result<Option<Frame>, TransportError> {
        let text = text.trim_start_matches(['\r', '\n']);
        if text.is_empty() || text == "\0" {
            return Ok(None);
        }

        let (head, rest) = split_head(text)
            .ok_or_else(|| TransportError::Protocol("frame has no header terminator".into()))?;
        let mut lines = head.lines();
        let command_line = lines.next().unwrap_or_default().trim_end_matches('\r');
        let command = Command::parse(command_line)
            .ok_or_else(|| TransportError::Protocol(format!("unknown command {command_line:?}")))?;

        let unescape = command.escapes_headers();
        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| TransportError::Protocol(format!("malformed header {line:?}")))?;
            if unescape {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let frame = Frame { command, headers, body: String::new() };
        let body = match frame.header("content-length") {
            Some(len) => {
                let len: usize = len
                    .parse()
                    .map_err(|_| TransportError::Protocol(format!("bad content-length {len:?}")))?;
                rest.get(..len)
                    .ok_or_else(|| TransportError::Protocol("body shorter than content-length".into()))?
            }
            None => rest.split('\0').next().unwrap_or_default(),
        };
        Ok(Some(Frame { body: body.to_string(), ..frame }))
    }
}

/// Heart-beat intervals agreed with the broker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartBeat {
    /// How often the client must send something.
    pub send_every: Option<Duration>,
    /// How long the broker may stay silent before the connection is dropped.
    pub expect_within: Option<Duration>,
}

impl HeartBeat {
    /// Combines the interval offered on `CONNECT` with the broker's
    /// `CONNECTED` header. Each direction runs at the slower of the two
    /// sides, and only when both sides want it.
    pub fn negotiate(offered: Duration, connected: &Frame) -> Result<Self, TransportError> {
        let offered = offered.as_millis() as u64;
        let (server_sends, server_wants) = match connected.header("heart-beat") {
            Some(value) => parse_heart_beat(value)?,
            None => (0, 0),
        };
        let agree = |ours: u64, theirs: u64| {
            (ours > 0 && theirs > 0).then(|| Duration::from_millis(ours.max(theirs)))
        };
        Ok(Self {
            send_every: agree(offered, server_wants),
            expect_within: agree(offered, server_sends).map(|d| d * SILENCE_TOLERANCE),
        })
    }
}

fn parse_heart_beat(value: &str) -> Result<(u64, u64), TransportError> {
    let bad = || TransportError::Protocol(format!("bad heart-beat {value:?}"));
    let (sends, wants) = value.split_once(',').ok_or_else(bad)?;
    Ok((
        sends.trim().parse().map_err(|_| bad())?,
        wants.trim().parse().map_err(|_| bad())?,
    ))
}

// Splits at the first blank line, whichever line ending it uses.
fn split_head(text: &str) -> Option<(&str, &str)> {
    let lf = text.find("\n\n").map(|i| (i, 2));
    let crlf = text.find("\r\n\r\n").map(|i| (i, 4));
    let (i, len) = match (lf, crlf) {
        (Some(a), Some(b)) => a.min(b),
        (a, b) => a.or(b)?,
    };
    Some((&text[..i], &text[i + len..]))
}

fn escape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_header(s: &str) -> Result<String, TransportError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(TransportError::Protocol(format!(
                    "invalid header escape \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}
