use std::collections::HashSet;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use driver::server::{handle_client_request, Request};
use geo_protocol::errors::ProtocolError;
use geo_protocol::frame::{read_frame_bytes, Envelope, Frame};
use geo_protocol::messages::error::Error;
use geo_protocol::Serializable;
use geo_store::{QueryEvent, QueryId};
use logger::{Color, Logger};

use crate::errors::NodeError;
use crate::Node;

/// One client connected to the node.
///
/// Requests are read and answered on the worker thread running [`run`];
/// events of the connection's queries are written by a forwarder thread.
/// Both write through `writer`, and a response is always written while the
/// request that produced it still holds the writer, so the events a request
/// triggers never overtake its response.
///
/// [`run`]: ClientConnection::run
pub(crate) struct ClientConnection {
    node: Arc<Mutex<Node>>,
    reader: TcpStream,
    writer: Arc<Mutex<TcpStream>>,
    peer: SocketAddr,
    log: Logger,
    started: bool,
    queries: HashSet<QueryId>,
    events: Sender<QueryEvent>,
    forwarder: Option<JoinHandle<()>>,
}

impl ClientConnection {
    pub(crate) fn new(node: Arc<Mutex<Node>>, stream: TcpStream) -> Result<Self, NodeError> {
        let peer = stream.peer_addr()?;
        let log = node.lock()?.get_logger();
        let writer = Arc::new(Mutex::new(stream.try_clone()?));

        let (events, events_rx) = mpsc::channel();
        let forwarder_writer = Arc::clone(&writer);
        let forwarder_log = log.clone();
        let forwarder = thread::Builder::new()
            .name(format!("events-{}", peer))
            .spawn(move || forward_events(events_rx, forwarder_writer, forwarder_log))
            .map_err(|_| NodeError::ThreadError)?;

        Ok(Self {
            node,
            reader: stream,
            writer,
            peer,
            log,
            started: false,
            queries: HashSet::new(),
            events,
            forwarder: Some(forwarder),
        })
    }

    /// Serves the client until it disconnects. Its queries are cancelled on the way out.
    pub(crate) fn run(mut self) -> Result<(), NodeError> {
        self.log
            .info(&format!("Client {} connected", self.peer), Color::Blue, true)?;

        let result = self.serve_requests();
        self.close();

        self.log
            .info(&format!("Client {} disconnected", self.peer), Color::Blue, true)?;
        result
    }

    fn serve_requests(&mut self) -> Result<(), NodeError> {
        loop {
            let bytes = match read_frame_bytes(&mut self.reader) {
                Ok(bytes) => bytes,
                Err(ProtocolError::ConnectionClosed) => return Ok(()),
                Err(ProtocolError::IoError(e)) => return Err(NodeError::IoError(e)),
                Err(e) => {
                    // The frame boundaries are lost, nothing after this can be trusted.
                    self.reply(0, protocol_error(&format!("Unreadable frame: {}", e)))?;
                    return Err(NodeError::ProtocolError(e));
                }
            };

            let client_request = match handle_client_request(&bytes) {
                Ok(client_request) => client_request,
                Err(e) => {
                    self.log
                        .warn(&format!("Client {}: {}", self.peer, e), true)?;
                    self.reply(e.stream(), protocol_error(&e.to_string()))?;
                    continue;
                }
            };

            if client_request.tracing {
                self.log.info(
                    &format!(
                        "TRACE {} stream {}: {:?}",
                        self.peer, client_request.stream, client_request.request
                    ),
                    Color::Magenta,
                    false,
                )?;
            }

            self.handle(client_request.stream, client_request.request)?;
        }
    }

    fn handle(&mut self, stream: i16, request: Request) -> Result<(), NodeError> {
        if !self.started && request != Request::Startup {
            return self.reply(stream, protocol_error("STARTUP expected"));
        }

        self.log.info(
            &format!("{} requested {}", self.peer, describe(&request)),
            Color::Cyan,
            false,
        )?;
        if request == Request::Startup {
            self.started = true;
        }

        let mut writer = self.writer.lock()?;
        let response = {
            let mut node = self.node.lock()?;
            node.execute(request, &self.events, &mut self.queries)
        };
        writer.write_all(&Envelope::new(stream, response).to_bytes()?)?;
        writer.flush()?;

        Ok(())
    }

    fn reply(&self, stream: i16, frame: Frame) -> Result<(), NodeError> {
        let mut writer = self.writer.lock()?;
        writer.write_all(&Envelope::new(stream, frame).to_bytes()?)?;
        writer.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        if let Ok(mut node) = self.node.lock() {
            node.forget_queries(&self.queries);
        }
        self.queries.clear();

        let _ = self.reader.shutdown(Shutdown::Both);

        // Dropping the last sender ends the forwarder.
        let (closed, _) = mpsc::channel();
        self.events = closed;
        if let Some(forwarder) = self.forwarder.take() {
            if forwarder.join().is_err() {
                self.log
                    .error(&format!("Event forwarder of {} panicked", self.peer), true)
                    .ok();
            }
        }
    }
}

/// Writes every event of the connection's queries as an `Event` frame.
fn forward_events(events: Receiver<QueryEvent>, writer: Arc<Mutex<TcpStream>>, log: Logger) {
    for event in events {
        let bytes = match Envelope::event(event).to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                log.error(&format!("Failed to encode event: {}", e), true).ok();
                continue;
            }
        };

        let Ok(mut writer) = writer.lock() else {
            return;
        };
        if writer.write_all(&bytes).is_err() {
            return;
        }
    }
}

fn protocol_error(message: &str) -> Frame {
    Frame::Error(Error::ProtocolError(message.to_string()))
}

fn describe(request: &Request) -> String {
    match request {
        Request::Startup => "STARTUP".to_string(),
        Request::SetLocation(set) => format!("SET_LOCATION {} {}", set.key, set.point),
        Request::GetLocation(key) => format!("GET_LOCATION {}", key),
        Request::RemoveLocation(key) => format!("REMOVE_LOCATION {}", key),
        Request::Query(query) => format!("QUERY {} {} km", query.center, query.radius_km),
        Request::UpdateQuery(update) => format!(
            "UPDATE_QUERY {} {} {} km",
            update.query_id, update.center, update.radius_km
        ),
        Request::CancelQuery(query_id) => format!("CANCEL_QUERY {}", query_id),
    }
}
