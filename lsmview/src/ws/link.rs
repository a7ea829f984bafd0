//! Link
//!
//! A link is one attempt at a duplex channel to the engine. `Connector`
//! opens links; each link reports what happens to it as `LinkNotice`s on a
//! shared crossbeam channel, tagged with the generation it was opened under
//! so that notices from a superseded link can be told apart.
//!
//! `WsConnector` runs every link on its own thread using the blocking
//! `tungstenite` client, over TLS for `wss://` endpoints. The socket gets a
//! short read timeout so that the thread can interleave reads with frames
//! queued for sending. Dropping the `Link` handle closes the outbound queue,
//! which the thread takes as the signal to close the socket and exit quietly.

use crossbeam::channel;
use std::io;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

/// What happened on a link. A link that fails always reports `Error`
/// followed by `Closed`; a link that ends cleanly only reports `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Message(String),
    Error(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNotice {
    pub generation: u64,
    pub event: LinkEvent,
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("connection thread is gone")]
    Disconnected,
}

/// Outbound half of a link.
pub trait Link {
    /// Hand a text frame to the link. This never waits on the network.
    fn send_text(&self, text: String) -> Result<(), LinkError>;
}

/// Opens links to an endpoint.
pub trait Connector {
    type Link: Link;

    fn open(&mut self, endpoint: &str, generation: u64) -> Self::Link;
}

/// Default read timeout, bounding how long a queued frame waits to go out.
pub static DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// `Connector` over real WebSockets.
pub struct WsConnector {
    notices: channel::Sender<LinkNotice>,
    poll_interval: Duration,
}

impl WsConnector {
    pub fn new(notices: channel::Sender<LinkNotice>) -> WsConnector {
        WsConnector {
            notices,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> WsConnector {
        self.poll_interval = poll_interval;
        self
    }
}

/// Handle to a link thread.
pub struct WsLink {
    tx: channel::Sender<String>,
}

impl Link for WsLink {
    fn send_text(&self, text: String) -> Result<(), LinkError> {
        self.tx.send(text).map_err(|_| LinkError::Disconnected)
    }
}

impl Connector for WsConnector {
    type Link = WsLink;

    fn open(&mut self, endpoint: &str, generation: u64) -> WsLink {
        let (tx, rx) = channel::unbounded::<String>();
        let notifier = Notifier {
            dest: self.notices.clone(),
            generation,
        };
        let endpoint = endpoint.to_string();
        let poll_interval = self.poll_interval;
        let spawned = thread::Builder::new()
            .name(format!("ws-link-{}", generation))
            .spawn(move || link_thread(endpoint, rx, notifier, poll_interval));
        if let Err(err) = spawned {
            let notifier = Notifier {
                dest: self.notices.clone(),
                generation,
            };
            notifier.send(LinkEvent::Error(format!("failed to start link thread: {}", err)));
            notifier.send(LinkEvent::Closed);
        }
        WsLink { tx }
    }
}

struct Notifier {
    dest: channel::Sender<LinkNotice>,
    generation: u64,
}

impl Notifier {
    /// False once nobody is listening anymore.
    fn send(&self, event: LinkEvent) -> bool {
        self.dest
            .send(LinkNotice {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    fn fail(&self, reason: String) {
        self.send(LinkEvent::Error(reason));
        self.send(LinkEvent::Closed);
    }
}

fn set_read_timeout(
    socket: &WebSocket<MaybeTlsStream<TcpStream>>,
    timeout: Duration,
) -> io::Result<()> {
    match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout)),
        MaybeTlsStream::NativeTls(stream) => stream.get_ref().set_read_timeout(Some(timeout)),
        _ => Ok(()),
    }
}

fn is_timeout(err: &tungstenite::Error) -> bool {
    match err {
        tungstenite::Error::Io(e) => {
            matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
        }
        _ => false,
    }
}

fn link_thread(
    endpoint: String,
    outbound: channel::Receiver<String>,
    notifier: Notifier,
    poll_interval: Duration,
) {
    use channel::TryRecvError;

    let mut socket = match tungstenite::connect(endpoint.as_str()) {
        Ok((socket, _response)) => socket,
        Err(err) => {
            notifier.fail(err.to_string());
            return;
        }
    };
    if let Err(err) = set_read_timeout(&socket, poll_interval) {
        notifier.fail(format!("failed to configure socket: {}", err));
        return;
    }
    if !notifier.send(LinkEvent::Opened) {
        let _ = socket.close(None);
        return;
    }

    'ioloop: loop {
        loop {
            match outbound.try_recv() {
                Ok(text) => {
                    if let Err(err) = socket.send(Message::text(text)) {
                        notifier.fail(err.to_string());
                        break 'ioloop;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Superseded or shutting down: nobody cares how this ends.
                    debug!(generation = notifier.generation, "link handle dropped, closing");
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    break 'ioloop;
                }
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if !notifier.send(LinkEvent::Message(text)) {
                    let _ = socket.close(None);
                    break 'ioloop;
                }
            }
            Ok(Message::Close(frame)) => {
                // tungstenite answers the close; the next read reports it done.
                debug!(generation = notifier.generation, ?frame, "peer closed link");
            }
            Ok(_) => {}
            Err(err) if is_timeout(&err) => {}
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                notifier.send(LinkEvent::Closed);
                break 'ioloop;
            }
            Err(err) => {
                warn!(generation = notifier.generation, %err, "link failed");
                notifier.fail(err.to_string());
                break 'ioloop;
            }
        }
    }
}
