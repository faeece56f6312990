//! The login handshake: submit `Action: Login`, read the banner and the authentication reply.

use futures::{SinkExt, TryStreamExt};
use tracing::{info, instrument, warn};

use crate::error::Error;
use crate::id_generator::IdGenerator;
use crate::packet::Packet;
use crate::transport::PacketReader;

/// The outcome of a successful login: the negotiated banner string and any trailing packets that
/// arrived bundled with the auth reply (there shouldn't be any, but nothing forbids it).
pub struct LoginOutcome {
    pub banner: Option<String>,
}

/// Performs the login handshake over an already-connected, not-yet-split reader/writer pair.
///
/// Reads one packet for the banner (if the peer sends it standalone, as Asterisk does) or folds
/// it into the first packet via the codec's bannerless-first-line tolerance, then writes the
/// `Login` action and awaits the authentication reply.
#[instrument(skip_all)]
pub async fn login<W>(
    reader: &mut PacketReader,
    writer: &mut W,
    ids: &IdGenerator,
    username: &str,
    secret: &str,
) -> Result<LoginOutcome, Error>
where
    W: futures::Sink<Packet, Error = std::io::Error> + Unpin,
{
    let first = reader
        .try_next()
        .await?
        .ok_or_else(|| Error::ConnectionLost("connection closed before banner".to_string()))?;
    let banner = first.get_str("Banner").map(str::to_string);

    let mut login_packet = Packet::action("Login");
    login_packet.insert("Username", username);
    login_packet.insert("Secret", secret);
    login_packet.insert("ActionID", ids.next());

    writer
        .send(login_packet)
        .await
        .map_err(|e| Error::ConnectionLost(e.to_string()))?;

    // The banner may have been folded into the same packet as the reply if both arrived before
    // the first read, or the auth reply may be the very next packet; either is a legal framing.
    let reply = if banner.is_some() && first.contains("Response") {
        first
    } else {
        reader
            .try_next()
            .await?
            .ok_or_else(|| Error::ConnectionLost("connection closed during login".to_string()))?
    };

    let accepted = reply.get_str("Response") == Some("Success")
        && reply.get_str("Message") == Some("Authentication accepted");

    if !accepted {
        let message = reply
            .get_str("Message")
            .unwrap_or("authentication rejected")
            .to_string();
        warn!(%message, "login rejected");
        return Err(Error::AuthFailed(message));
    }

    info!(banner = banner.as_deref().unwrap_or(""), "authenticated");
    Ok(LoginOutcome { banner })
}
