//! Endpoint helpers.

use std::env;

/// Address the engine listens on out of the box.
pub static DEFAULT_HOST: &str = "localhost:8080";

/// Well-known path of the engine's event socket.
pub static EVENT_PATH: &str = "/ws";

/// Engine host from `LSMVIEW_HOST`, falling back to `DEFAULT_HOST`.
pub fn default_host() -> String {
    match env::var("LSMVIEW_HOST") {
        Ok(host) if !host.trim().is_empty() => host.trim().to_string(),
        _ => DEFAULT_HOST.to_string(),
    }
}

/// WebSocket URL of the event socket for `host`. A host already given as a
/// `ws://` or `wss://` URL is used as the base.
pub fn endpoint_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("ws://") || host.starts_with("wss://") {
        if host.ends_with(EVENT_PATH) {
            host.to_string()
        } else {
            format!("{}{}", host, EVENT_PATH)
        }
    } else {
        format!("ws://{}{}", host, EVENT_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_host_gets_scheme_and_path() {
        assert_eq!(endpoint_url("localhost:8080"), "ws://localhost:8080/ws");
        assert_eq!(endpoint_url("10.0.0.7:9000/"), "ws://10.0.0.7:9000/ws");
    }

    #[test]
    fn url_host_keeps_scheme() {
        assert_eq!(endpoint_url("wss://engine.example"), "wss://engine.example/ws");
        assert_eq!(endpoint_url("ws://engine:8080/ws"), "ws://engine:8080/ws");
    }
}
