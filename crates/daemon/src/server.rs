// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Line-delimited JSON request transport over a Unix socket.
//!
//! The envelope is the only transport-layer concern: a version tag wrapped
//! around the dispatcher's request. Requests are forwarded into the daemon
//! loop, which applies all mutations before sending the reply back, so a
//! failure writing the reply cannot desynchronise the queue.

use chime_common::dispatch::{DispatchError, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    sync::{mpsc, oneshot},
};

/// Protocol version carried in every request envelope.
pub const PROTOCOL_VERSION: u32 = 1;

/// Versioned wrapper around a dispatcher request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Protocol version; mismatches are rejected.
    pub version: u32,
    /// The wrapped request.
    #[serde(flatten)]
    pub request: Request,
}

/// A parsed request awaiting its reply from the daemon loop.
#[derive(Debug)]
pub struct ServerRequest {
    /// The request to dispatch.
    pub request: Request,
    /// Channel the loop answers on.
    pub reply: oneshot::Sender<Result<Response, DispatchError>>,
}

/// Serialises a dispatch result into a reply line.
#[must_use]
pub fn reply_line(result: &Result<Response, DispatchError>) -> String {
    match result {
        Ok(response) => serde_json::to_string(response)
            .unwrap_or_else(|e| error_line(&format!("reply serialization failed: {e}"))),
        Err(e) => error_line(&e.to_string()),
    }
}

fn error_line(message: &str) -> String {
    json!({ "result": "error", "message": message }).to_string()
}

/// Accepts connections and forwards their requests into the daemon loop.
pub async fn serve(listener: UnixListener, tx: mpsc::UnboundedSender<ServerRequest>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, tx).await {
                        log::debug!("Client connection ended: {e}");
                    }
                });
            }
            Err(e) => {
                log::error!("Accept failed: {e}");
                return;
            }
        }
    }
}

async fn handle_connection(
    stream: UnixStream,
    tx: mpsc::UnboundedSender<ServerRequest>,
) -> anyhow::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Envelope>(&line) {
            Ok(envelope) if envelope.version == PROTOCOL_VERSION => {
                let (reply_tx, reply_rx) = oneshot::channel();
                tx.send(ServerRequest {
                    request: envelope.request,
                    reply: reply_tx,
                })?;
                match reply_rx.await {
                    Ok(result) => reply_line(&result),
                    Err(_) => error_line("daemon shutting down"),
                }
            }
            Ok(envelope) => error_line(&format!(
                "unsupported protocol version {}",
                envelope.version
            )),
            Err(e) => error_line(&format!("malformed request: {e}")),
        };

        write.write_all(reply.as_bytes()).await?;
        write.write_all(b"\n").await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_envelope_parsing() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"version":1,"op":"get_snooze"}"#).unwrap();
        assert_eq!(envelope.version, 1);
        assert_eq!(envelope.request, Request::GetSnooze);
    }

    #[rstest]
    fn test_envelope_roundtrip() {
        let envelope = Envelope {
            version: PROTOCOL_VERSION,
            request: Request::DelEvent { cookie: 33 },
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }

    #[rstest]
    fn test_reply_line_success() {
        let line = reply_line(&Ok(Response::Snooze { minutes: 10 }));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["result"], "snooze");
        assert_eq!(value["minutes"], 10);
    }

    #[rstest]
    fn test_reply_line_error() {
        let line = reply_line(&Err(DispatchError::InvalidSnooze));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["result"], "error");
        assert!(value["message"].as_str().unwrap().contains("positive"));
    }
}
