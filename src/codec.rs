//! Wire framing for AMI packets: a run of `Name: Value\r\n` lines terminated by a blank line.
//!
//! Shaped after the house's own line codec (`titanirc-codec`'s `Decoder`/`Encoder` pair), but
//! scanning for the two-CRLF packet delimiter instead of a single line delimiter. There is no
//! maximum frame length: a single AMI packet (an action, response, or event) is bounded enough
//! in practice that an unbounded scan is safe.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::packet::Packet;

const DELIMITER: &[u8] = b"\r\n\r\n";

/// A `tokio_util::codec::{Decoder, Encoder}` for the AMI packet format.
#[derive(Debug, Default, Clone, Copy)]
pub struct Codec {
    /// Set once the first packet (the connect banner) has been framed, so later framing knows
    /// a header-less first line is no longer tolerated.
    seen_banner: bool,
}

impl Codec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for Codec {
    type Item = Packet;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(end) = find_subslice(src, DELIMITER) else {
            return Ok(None);
        };

        let frame = src.split_to(end + DELIMITER.len());
        let body = &frame[..frame.len() - DELIMITER.len()];

        let packet = decode_body(body, !self.seen_banner);
        self.seen_banner = true;

        Ok(Some(packet))
    }
}

impl Encoder<Packet> for Codec {
    type Error = std::io::Error;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        for (name, value) in item.iter() {
            for v in value.values() {
                dst.put_slice(name.as_bytes());
                dst.put_slice(b": ");
                dst.put_slice(v.as_bytes());
                dst.put_slice(b"\r\n");
            }
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Parses the header lines of one packet. `allow_bannerless_first_line` tolerates a first line
/// with no `": "` delimiter (the `Asterisk Call Manager/<version>` banner) and stores it under
/// the synthetic `Banner` header; anywhere else, such a line is dropped with a debug log.
fn decode_body(body: &[u8], allow_bannerless_first_line: bool) -> Packet {
    let mut packet = Packet::new();
    let text = String::from_utf8_lossy(body);

    for (i, line) in text.split("\r\n").enumerate() {
        if line.is_empty() {
            continue;
        }

        match line.split_once(": ") {
            Some((name, value)) => {
                packet.insert(name.to_string(), value.to_string());
            }
            None if i == 0 && allow_bannerless_first_line => {
                packet.insert("Banner", line.to_string());
            }
            None => {
                debug!(line, "dropping line with no ': ' delimiter");
            }
        }
    }

    packet
}

/// Searches `haystack` for `needle`, returning the index of the first match.
fn find_subslice(haystack: &BytesMut, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }

    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Encodes a single packet to bytes, for call sites that don't go through a `Framed` sink (e.g.
/// the login handshake, which writes before the `Framed` is fully wired up).
#[must_use]
pub fn encode(packet: &Packet) -> BytesMut {
    let mut buf = BytesMut::new();
    for (name, value) in packet.iter() {
        for v in value.values() {
            buf.put_slice(name.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(v.as_bytes());
            buf.put_slice(b"\r\n");
        }
    }
    buf.put_slice(b"\r\n");
    buf
}

/// Decodes a single, already-delimited packet body (without the trailing blank line): used by
/// tests and by the session handshake, which slices the banner line out manually.
#[must_use]
pub fn decode_one(body: &[u8]) -> Packet {
    decode_body(body, true)
}
