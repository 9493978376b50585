use std::{
    collections::HashMap,
    env,
    io::Write,
    net::{Shutdown, SocketAddr, TcpStream},
    sync::{
        atomic::{AtomicI16, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
    time::Duration,
};
pub mod server;

use geo_protocol::{
    errors::ProtocolError,
    frame::{Envelope, Frame},
    header::EVENT_STREAM,
    messages::{
        self,
        location::{LocationKey, SetLocation},
        outcome::Outcome,
        query::{CancelQuery, Query, UpdateQuery},
    },
    Serializable,
};
use geo_store::{GeoPoint, QueryEvent, QueryId};

/// Default address of a geo node.
pub const DEFAULT_NODE_ADDR: &str = "127.0.0.1:17990";

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug)]
pub enum ClientError {
    /// The node answered with an error frame.
    ServerError(messages::error::Error),
    ConnectionError,
    AddrError,
    TimeoutError,
    InvalidFrame,
    IOError,
    SerializationError,
    DeserializationError,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::ServerError(error) => write!(f, "Node error: {}", error),
            ClientError::ConnectionError => write!(f, "Connection to the node failed or was closed"),
            ClientError::AddrError => write!(f, "Invalid node address"),
            ClientError::TimeoutError => write!(f, "The node did not answer in time"),
            ClientError::InvalidFrame => write!(f, "Unexpected frame from the node"),
            ClientError::IOError => write!(f, "I/O error talking to the node"),
            ClientError::SerializationError => write!(f, "Could not encode the request"),
            ClientError::DeserializationError => write!(f, "Could not decode the response"),
        }
    }
}

impl std::error::Error for ClientError {}

/// Where the reader thread sends what it reads.
#[derive(Default)]
struct Routes {
    /// Callers waiting for the response on a stream.
    responses: HashMap<i16, Sender<Frame>>,
    /// Event channels of `Query` requests whose id is not known yet.
    pending_queries: HashMap<i16, Sender<QueryEvent>>,
    /// Event channels of running queries.
    subscriptions: HashMap<QueryId, Sender<QueryEvent>>,
    closed: bool,
}

/// A connection to a geo node.
///
/// Requests may be issued from several threads at once; each one travels on
/// its own stream id. A background thread reads every frame sent by the node,
/// hands responses to the caller waiting on that stream and query events to
/// the channel returned by [`GeoClient::query`].
pub struct GeoClient {
    writer: Mutex<TcpStream>,
    routes: Arc<Mutex<Routes>>,
    next_stream: AtomicI16,
    tracing: bool,
    reader: Option<JoinHandle<()>>,
}

impl GeoClient {
    /// Creates a connection with the node at `addr` and performs the handshake.
    ///
    /// The `NODE_ADDR` environment variable, when set, takes precedence over `addr`.
    pub fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let addr = if let Ok(var) = env::var("NODE_ADDR") {
            var.parse().map_err(|_| ClientError::AddrError)?
        } else {
            addr
        };

        let mut stream = TcpStream::connect(addr).map_err(|_| ClientError::ConnectionError)?;
        stream
            .set_write_timeout(Some(RESPONSE_TIMEOUT))
            .map_err(|_| ClientError::TimeoutError)?;

        startup(&mut stream)?;

        let reader_stream = stream.try_clone().map_err(|_| ClientError::IOError)?;
        let routes = Arc::new(Mutex::new(Routes::default()));
        let reader_routes = Arc::clone(&routes);
        let reader = thread::spawn(move || read_frames(reader_stream, reader_routes));

        Ok(Self {
            writer: Mutex::new(stream),
            routes,
            next_stream: AtomicI16::new(1),
            tracing: false,
            reader: Some(reader),
        })
    }

    /// Asks the node to log every request of this client in full.
    pub fn set_tracing(&mut self, tracing: bool) {
        self.tracing = tracing;
    }

    pub fn set_location(&self, key: &str, point: GeoPoint) -> Result<(), ClientError> {
        let frame = Frame::SetLocation(SetLocation::new(key.to_string(), point));
        match self.request(frame)? {
            Outcome::Void => Ok(()),
            _ => Err(ClientError::InvalidFrame),
        }
    }

    pub fn get_location(&self, key: &str) -> Result<Option<GeoPoint>, ClientError> {
        let frame = Frame::GetLocation(LocationKey::new(key.to_string()));
        match self.request(frame)? {
            Outcome::Location(point) => Ok(point),
            _ => Err(ClientError::InvalidFrame),
        }
    }

    pub fn remove_location(&self, key: &str) -> Result<(), ClientError> {
        let frame = Frame::RemoveLocation(LocationKey::new(key.to_string()));
        match self.request(frame)? {
            Outcome::Void => Ok(()),
            _ => Err(ClientError::InvalidFrame),
        }
    }

    /// Starts a live query over the circle of `radius_km` around `center`.
    ///
    /// # Returns
    /// The query id and the channel its events arrive on. The keys already
    /// inside the circle arrive as `Entered` events followed by `Ready`.
    /// The channel disconnects when the query is cancelled or the connection
    /// is lost.
    pub fn query(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<(QueryId, Receiver<QueryEvent>), ClientError> {
        let (events_tx, events_rx) = mpsc::channel();
        let stream = self.next_stream();
        let (response_tx, response_rx) = mpsc::channel();

        {
            let mut routes = self.routes()?;
            routes.responses.insert(stream, response_tx);
            routes.pending_queries.insert(stream, events_tx);
        }

        let frame = Frame::Query(Query::new(center, radius_km));
        let response = self.send_and_wait(stream, frame, response_rx);
        if response.is_err() {
            self.routes()?.pending_queries.remove(&stream);
        }

        match into_outcome(response?)? {
            Outcome::QueryStarted(query_id) => Ok((query_id, events_rx)),
            _ => Err(ClientError::InvalidFrame),
        }
    }

    /// Moves or resizes a running query. Its events keep arriving on the same channel.
    pub fn update_query(
        &self,
        query_id: QueryId,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<(), ClientError> {
        let frame = Frame::UpdateQuery(UpdateQuery::new(query_id, center, radius_km));
        match self.request(frame)? {
            Outcome::Void => Ok(()),
            _ => Err(ClientError::InvalidFrame),
        }
    }

    /// Stops a query. Its channel is disconnected even if the node no longer knew it.
    pub fn cancel_query(&self, query_id: QueryId) -> Result<(), ClientError> {
        let result = self.request(Frame::CancelQuery(CancelQuery::new(query_id)));
        self.routes()?.subscriptions.remove(&query_id);

        match result? {
            Outcome::Void => Ok(()),
            _ => Err(ClientError::InvalidFrame),
        }
    }

    fn request(&self, frame: Frame) -> Result<Outcome, ClientError> {
        let stream = self.next_stream();
        let (response_tx, response_rx) = mpsc::channel();
        self.routes()?.responses.insert(stream, response_tx);

        into_outcome(self.send_and_wait(stream, frame, response_rx)?)
    }

    fn send_and_wait(
        &self,
        stream: i16,
        frame: Frame,
        response_rx: Receiver<Frame>,
    ) -> Result<Frame, ClientError> {
        if let Err(error) = self.send(stream, frame) {
            self.routes()?.responses.remove(&stream);
            return Err(error);
        }

        match response_rx.recv_timeout(RESPONSE_TIMEOUT) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => {
                self.routes()?.responses.remove(&stream);
                Err(ClientError::TimeoutError)
            }
            Err(RecvTimeoutError::Disconnected) => Err(ClientError::ConnectionError),
        }
    }

    fn send(&self, stream: i16, frame: Frame) -> Result<(), ClientError> {
        let bytes = Envelope::new(stream, frame)
            .with_tracing(self.tracing)
            .to_bytes()
            .map_err(|_| ClientError::SerializationError)?;

        let mut writer = self.writer.lock().map_err(|_| ClientError::IOError)?;
        writer.write_all(&bytes).map_err(|_| ClientError::IOError)
    }

    fn routes(&self) -> Result<MutexGuard<'_, Routes>, ClientError> {
        let routes = self.routes.lock().map_err(|_| ClientError::IOError)?;
        if routes.closed {
            return Err(ClientError::ConnectionError);
        }
        Ok(routes)
    }

    /// Stream ids are positive; negative ones belong to the node.
    fn next_stream(&self) -> i16 {
        self.next_stream.fetch_add(1, Ordering::Relaxed) & i16::MAX
    }
}

impl Drop for GeoClient {
    fn drop(&mut self) {
        if let Ok(writer) = self.writer.lock() {
            let _ = writer.shutdown(Shutdown::Both);
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

fn startup(stream: &mut TcpStream) -> Result<(), ClientError> {
    let startup = Envelope::new(0, Frame::Startup)
        .to_bytes()
        .map_err(|_| ClientError::SerializationError)?;
    stream
        .write_all(&startup)
        .map_err(|_| ClientError::IOError)?;

    stream
        .set_read_timeout(Some(RESPONSE_TIMEOUT))
        .map_err(|_| ClientError::TimeoutError)?;
    let response = Envelope::read_from(stream).map_err(|error| match error {
        ProtocolError::IoError(_) => ClientError::TimeoutError,
        ProtocolError::ConnectionClosed => ClientError::ConnectionError,
        _ => ClientError::DeserializationError,
    })?;
    stream
        .set_read_timeout(None)
        .map_err(|_| ClientError::IOError)?;

    match response.frame {
        Frame::Ready => Ok(()),
        Frame::Error(error) => Err(ClientError::ServerError(error)),
        _ => Err(ClientError::InvalidFrame),
    }
}

fn into_outcome(frame: Frame) -> Result<Outcome, ClientError> {
    match frame {
        Frame::Result(outcome) => Ok(outcome),
        Frame::Error(error) => Err(ClientError::ServerError(error)),
        _ => Err(ClientError::InvalidFrame),
    }
}

/// Body of the reader thread. Runs until the connection is closed.
fn read_frames(mut stream: TcpStream, routes: Arc<Mutex<Routes>>) {
    while let Ok(envelope) = Envelope::read_from(&mut stream) {
        let Ok(mut routes) = routes.lock() else {
            return;
        };

        if envelope.stream == EVENT_STREAM {
            if let Frame::Event(event) = envelope.frame {
                route_event(&mut routes, event);
            }
            continue;
        }

        match &envelope.frame {
            Frame::Result(Outcome::QueryStarted(query_id)) => {
                if let Some(events) = routes.pending_queries.remove(&envelope.stream) {
                    routes.subscriptions.insert(*query_id, events);
                }
            }
            _ => {
                routes.pending_queries.remove(&envelope.stream);
            }
        }

        if let Some(waiter) = routes.responses.remove(&envelope.stream) {
            let _ = waiter.send(envelope.frame);
        }
    }

    if let Ok(mut routes) = routes.lock() {
        routes.closed = true;
        routes.responses.clear();
        routes.pending_queries.clear();
        routes.subscriptions.clear();
    }
}

fn route_event(routes: &mut Routes, event: QueryEvent) {
    let query_id = event.query_id;
    let delivered = match routes.subscriptions.get(&query_id) {
        Some(events) => events.send(event).is_ok(),
        None => return,
    };
    if !delivered {
        routes.subscriptions.remove(&query_id);
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use geo_protocol::frame::read_frame_bytes;
    use uuid::Uuid;

    use super::*;

    /// Accepts one client, answers the handshake and then runs `script`.
    fn fake_node<F>(script: F) -> (SocketAddr, JoinHandle<()>)
    where
        F: FnOnce(TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let startup = Envelope::read_from(&mut stream).unwrap();
            assert_eq!(startup.frame, Frame::Startup);
            stream
                .write_all(&Envelope::new(startup.stream, Frame::Ready).to_bytes().unwrap())
                .unwrap();
            script(stream);
        });
        (addr, handle)
    }

    fn reply(stream: &mut TcpStream, envelope: Envelope) {
        stream.write_all(&envelope.to_bytes().unwrap()).unwrap();
    }

    #[test]
    fn get_location_round_trip() {
        let point = GeoPoint::new(-34.6, -58.4).unwrap();
        let (addr, node) = fake_node(move |mut stream| {
            let request = Envelope::read_from(&mut stream).unwrap();
            assert_eq!(
                request.frame,
                Frame::GetLocation(LocationKey::new("25".to_string()))
            );
            reply(
                &mut stream,
                Envelope::new(request.stream, Frame::Result(Outcome::Location(Some(point)))),
            );
        });

        let client = GeoClient::connect(addr).unwrap();
        assert_eq!(client.get_location("25").unwrap(), Some(point));

        drop(client);
        node.join().unwrap();
    }

    #[test]
    fn tracing_marks_every_request() {
        let (addr, node) = fake_node(|mut stream| {
            for traced in [false, true] {
                let request = Envelope::read_from(&mut stream).unwrap();
                assert_eq!(request.flags.tracing, traced);
                reply(
                    &mut stream,
                    Envelope::new(request.stream, Frame::Result(Outcome::Void)),
                );
            }
        });

        let mut client = GeoClient::connect(addr).unwrap();
        client.remove_location("1").unwrap();
        client.set_tracing(true);
        client.remove_location("1").unwrap();

        drop(client);
        node.join().unwrap();
    }

    #[test]
    fn error_frames_become_server_errors() {
        let (addr, node) = fake_node(|mut stream| {
            let request = Envelope::read_from(&mut stream).unwrap();
            reply(
                &mut stream,
                Envelope::new(
                    request.stream,
                    Frame::Error(messages::error::Error::InvalidKey("empty".to_string())),
                ),
            );
        });

        let client = GeoClient::connect(addr).unwrap();
        let point = GeoPoint::new(0.0, 0.0).unwrap();
        assert!(matches!(
            client.set_location("", point),
            Err(ClientError::ServerError(messages::error::Error::InvalidKey(_)))
        ));

        drop(client);
        node.join().unwrap();
    }

    #[test]
    fn query_events_are_routed_to_their_channel() {
        let query_id = Uuid::new_v4();
        let point = GeoPoint::new(1.0, 1.0).unwrap();
        let (addr, node) = fake_node(move |mut stream| {
            let request = Envelope::read_from(&mut stream).unwrap();
            assert!(matches!(request.frame, Frame::Query(_)));
            reply(
                &mut stream,
                Envelope::new(request.stream, Frame::Result(Outcome::QueryStarted(query_id))),
            );
            reply(&mut stream, Envelope::event(QueryEvent::entered(query_id, "4", point)));
            reply(&mut stream, Envelope::event(QueryEvent::ready(query_id)));
            // Events of unknown queries are dropped.
            reply(&mut stream, Envelope::event(QueryEvent::ready(Uuid::new_v4())));
            // Keep the connection open until the client hangs up.
            let _ = read_frame_bytes(&mut stream);
        });

        let client = GeoClient::connect(addr).unwrap();
        let (id, events) = client.query(point, 2.5).unwrap();

        assert_eq!(id, query_id);
        let timeout = Duration::from_secs(2);
        assert_eq!(
            events.recv_timeout(timeout).unwrap(),
            QueryEvent::entered(query_id, "4", point)
        );
        assert_eq!(
            events.recv_timeout(timeout).unwrap(),
            QueryEvent::ready(query_id)
        );

        drop(client);
        node.join().unwrap();
        assert!(events.recv().is_err());
    }

    #[test]
    fn silent_node_times_out() {
        let (addr, node) = fake_node(|mut stream| {
            let _ = read_frame_bytes(&mut stream);
            let _ = read_frame_bytes(&mut stream);
        });

        let client = GeoClient::connect(addr).unwrap();
        assert!(matches!(
            client.remove_location("1"),
            Err(ClientError::TimeoutError)
        ));

        drop(client);
        node.join().unwrap();
    }

    #[test]
    fn lost_connection_fails_requests() {
        let (addr, node) = fake_node(|stream| drop(stream));
        let client = GeoClient::connect(addr).unwrap();
        node.join().unwrap();

        assert!(client.get_location("1").is_err());
    }
}
