use std::future::Future;
use std::io;

use statuscast_core::display::status_line;
use statuscast_net::{Datagram, MulticastListener};
use tracing::{info, warn};

/// Render one received datagram as a console line.
pub fn describe(datagram: &Datagram, raw: bool) -> Option<String> {
    if raw {
        return Some(String::from_utf8_lossy(&datagram.payload).into_owned());
    }
    match datagram.decode() {
        Ok(message) => {
            let at = message
                .captured_at()
                .map(|t| t.format("%H:%M:%S%.3f").to_string())
                .unwrap_or_else(|| message.server_timestamp_ms.to_string());
            Some(format!(
                "{at} {} [{}] {}",
                datagram.from,
                message.server_id,
                status_line(&message.status)
            ))
        }
        Err(e) => {
            warn!(from = %datagram.from, "Ignoring undecodable datagram: {e}");
            None
        }
    }
}

/// Print datagrams until `shutdown` resolves or `count` have been received.
pub async fn listen(
    listener: &MulticastListener,
    raw: bool,
    count: Option<u64>,
    shutdown: impl Future<Output = ()>,
) -> io::Result<u64> {
    tokio::pin!(shutdown);
    let mut received = 0u64;
    loop {
        let datagram = tokio::select! {
            () = &mut shutdown => break,
            datagram = listener.recv() => datagram?,
        };
        received += 1;
        if let Some(line) = describe(&datagram, raw) {
            println!("{line}");
        }
        if count.is_some_and(|max| received >= max) {
            break;
        }
    }
    info!(received, group = %listener.group(), "Stopped listening");
    Ok(received)
}
