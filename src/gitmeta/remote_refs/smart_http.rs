//! Git smart-HTTP ref advertisement client
//!
//! Performs the first request of a smart-HTTP fetch,
//! `GET <repo>/info/refs?service=git-upload-pack`, and decodes the pkt-line
//! framed v0/v1 advertisement into a [`RemoteInfo`].
//!
//! # Packet-line format
//!
//! Each packet line is prefixed with a 4-character hex length that includes
//! itself. `0000` is a flush packet; `0001` and `0002` are the v2 delimiter
//! and response-end packets and never appear in a v0/v1 advertisement.
//!
//! ```text
//! 001e# service=git-upload-pack\n
//! 0000
//! 00xx<oid> HEAD\0<capabilities>\n
//! 003f<oid> refs/heads/main\n
//! 0000
//! ```

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, trace};

use super::GitRemoteClient;
use super::models::{AdvertisedRef, RemoteInfo};

const ADVERTISEMENT_CONTENT_TYPE: &str = "application/x-git-upload-pack-advertisement";
const SERVICE_HEADER: &str = "# service=git-upload-pack";
const EMPTY_REPOSITORY_REF: &str = "capabilities^{}";
const HEAD_SYMREF_PREFIX: &str = "symref=HEAD:";

const USER_AGENT: &str = concat!("git/gitmeta-proxy-", env!("CARGO_PKG_VERSION"));

/// Errors raised while fetching or decoding a ref advertisement
#[derive(Debug, thiserror::Error)]
pub enum GitRemoteError {
    /// The request could not be sent or the connection failed
    #[error("Failed to reach remote: {0}")]
    Transport(String),

    /// The remote answered with a non-success status
    #[error("HTTP Error: {status} {reason}")]
    Http { status: u16, reason: String },

    /// The remote does not speak the smart protocol (e.g. dumb HTTP or an HTML page)
    #[error(
        "Remote did not reply using the \"smart\" HTTP protocol. Expected \"application/x-git-upload-pack-advertisement\" but received \"{0}\""
    )]
    NotSmartHttp(String),

    /// The advertisement body is malformed
    #[error("Invalid ref advertisement: {0}")]
    Protocol(String),
}

/// A single Git packet line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    Data(Vec<u8>),
    Flush,
    Delimiter,
    ResponseEnd,
}

/// Decodes a sequence of packet lines
///
/// Any malformed or truncated frame is an error.
pub fn decode_pkt_lines(data: &[u8]) -> Result<Vec<PktLine>, GitRemoteError> {
    let mut packets = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        if pos + 4 > data.len() {
            return Err(GitRemoteError::Protocol(format!(
                "truncated packet-line length at offset {}",
                pos
            )));
        }

        let len_hex = std::str::from_utf8(&data[pos..pos + 4]).map_err(|_| {
            GitRemoteError::Protocol(format!("non-UTF-8 packet-line length at offset {}", pos))
        })?;
        let pkt_len = usize::from_str_radix(len_hex, 16).map_err(|_| {
            GitRemoteError::Protocol(format!(
                "invalid packet-line length {:?} at offset {}",
                len_hex, pos
            ))
        })?;

        match pkt_len {
            0 => {
                trace!(offset = pos, "flush packet");
                packets.push(PktLine::Flush);
                pos += 4;
            }
            1 => {
                packets.push(PktLine::Delimiter);
                pos += 4;
            }
            2 => {
                packets.push(PktLine::ResponseEnd);
                pos += 4;
            }
            3 => {
                return Err(GitRemoteError::Protocol(format!(
                    "invalid packet-line length 0003 at offset {}",
                    pos
                )));
            }
            n => {
                if pos + n > data.len() {
                    return Err(GitRemoteError::Protocol(format!(
                        "truncated packet-line at offset {} (declared {}, available {})",
                        pos,
                        n,
                        data.len() - pos
                    )));
                }
                packets.push(PktLine::Data(data[pos + 4..pos + n].to_vec()));
                pos += n;
            }
        }
    }

    Ok(packets)
}

/// Parses a v0/v1 upload-pack ref advertisement
pub fn parse_advertisement(body: &[u8]) -> Result<RemoteInfo, GitRemoteError> {
    let packets = decode_pkt_lines(body)?;
    let mut packets = packets.into_iter().peekable();

    // Smart servers open with the service announcement and a flush.
    if let Some(PktLine::Data(first)) = packets.peek() {
        if String::from_utf8_lossy(first).trim_end() == SERVICE_HEADER {
            packets.next();
            if let Some(PktLine::Flush) = packets.peek() {
                packets.next();
            }
        }
    }

    let mut info = RemoteInfo::default();
    let mut first_ref = true;

    for packet in packets {
        let data = match packet {
            PktLine::Data(data) => data,
            PktLine::Flush => break,
            other => {
                return Err(GitRemoteError::Protocol(format!(
                    "unexpected {:?} in v0 advertisement",
                    other
                )));
            }
        };

        let line = String::from_utf8_lossy(&data);
        let line = line.trim_end_matches('\n');

        let ref_line = if first_ref {
            first_ref = false;
            match line.split_once('\0') {
                Some((ref_line, capabilities)) => {
                    info.capabilities = capabilities
                        .split(' ')
                        .filter(|c| !c.is_empty())
                        .map(String::from)
                        .collect();
                    ref_line
                }
                None => line,
            }
        } else {
            line
        };

        let (oid, name) = ref_line.split_once(' ').ok_or_else(|| {
            GitRemoteError::Protocol(format!("malformed ref line {:?}", ref_line))
        })?;
        if !is_object_id(oid) {
            return Err(GitRemoteError::Protocol(format!(
                "malformed object id {:?}",
                oid
            )));
        }

        if name == EMPTY_REPOSITORY_REF {
            continue;
        }
        info.refs.push(AdvertisedRef {
            name: name.to_string(),
            oid: oid.to_string(),
        });
    }

    info.head = info
        .capabilities
        .iter()
        .find_map(|c| c.strip_prefix(HEAD_SYMREF_PREFIX))
        .map(String::from);

    Ok(info)
}

fn is_object_id(oid: &str) -> bool {
    (oid.len() == 40 || oid.len() == 64) && oid.bytes().all(|b| b.is_ascii_hexdigit())
}

/// reqwest-backed [`GitRemoteClient`]
#[derive(Debug, Clone)]
pub struct SmartHttpClient {
    client: Client,
}

impl SmartHttpClient {
    pub fn new(client: Client) -> Self {
        SmartHttpClient { client }
    }

    fn construct_info_refs_url(url: &str) -> String {
        format!(
            "{}/info/refs?service=git-upload-pack",
            url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl GitRemoteClient for SmartHttpClient {
    async fn get_remote_info(&self, url: &str) -> Result<RemoteInfo, GitRemoteError> {
        let info_refs_url = Self::construct_info_refs_url(url);
        debug!(%info_refs_url, "requesting ref advertisement");

        let response = self
            .client
            .get(&info_refs_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| GitRemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GitRemoteError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with(ADVERTISEMENT_CONTENT_TYPE) {
            return Err(GitRemoteError::NotSmartHttp(content_type));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GitRemoteError::Transport(e.to_string()))?;

        let info = parse_advertisement(&body)?;
        debug!(
            %info_refs_url,
            refs = info.refs.len(),
            head = ?info.head,
            "parsed ref advertisement"
        );
        Ok(info)
    }
}
