// Local modules first
mod connection;
pub mod errors;
pub mod storage_engine;

// Standard libraries
use std::collections::HashSet;
use std::env;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

// External libraries
use connection::ClientConnection;
use driver::server::Request;
use errors::NodeError;
use geo_protocol::frame::Frame;
use geo_protocol::messages::error::Error;
use geo_protocol::messages::outcome::Outcome;
use geo_store::{GeoDatabase, QueryEvent, QueryId};
use logger::{Color, Logger};
use storage_engine::StorageEngine;
use threadpool::ThreadPool;

/// Address used when neither the command line nor `GEO_NODE_ADDR` name one.
pub const DEFAULT_NODE_ADDR: &str = "127.0.0.1:17990";

/// Number of client connections served at the same time.
const CLIENT_WORKERS: usize = 16;

/// A server hosting a geo-indexed store and its live queries.
pub struct Node {
    addr: SocketAddr,
    database: GeoDatabase,
    storage_engine: StorageEngine,
    logger: Logger,
}

impl Node {
    /// Creates a new `Node`.
    ///
    /// # Parameters
    /// - `addr`: Address the node listens on. Also names its snapshot and log files.
    /// - `storage_path`: Directory holding the snapshot (`geo_<addr>.csv`) and
    ///   the log file (`node_<addr>.log`). Created if missing.
    ///
    /// # Returns
    /// The node, with the store loaded from the snapshot if one exists.
    ///
    /// # Errors
    /// Fails if the directory cannot be created, the snapshot cannot be read
    /// or the log file cannot be opened.
    pub fn new(addr: SocketAddr, storage_path: PathBuf) -> Result<Node, NodeError> {
        std::fs::create_dir_all(&storage_path)?;

        let logger = Logger::new(&storage_path, &format!("node_{}", addr))?;
        let storage_engine = StorageEngine::new(storage_path, addr.to_string());
        let store = storage_engine.load()?;

        logger.info(
            &format!(
                "Loaded {} locations from {}",
                store.len(),
                storage_engine.snapshot_path().display()
            ),
            Color::Green,
            true,
        )?;

        Ok(Node {
            addr,
            database: GeoDatabase::from_store(store),
            storage_engine,
            logger,
        })
    }

    /// The address from `GEO_NODE_ADDR`, or `fallback`.
    pub fn addr_from_env(fallback: SocketAddr) -> Result<SocketAddr, NodeError> {
        match env::var("GEO_NODE_ADDR") {
            Ok(var) => var.parse().map_err(|_| {
                NodeError::IoError(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("Invalid GEO_NODE_ADDR: {}", var),
                ))
            }),
            Err(_) => Ok(fallback),
        }
    }

    pub fn get_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn get_logger(&self) -> Logger {
        self.logger.clone()
    }

    pub fn database(&self) -> &GeoDatabase {
        &self.database
    }

    /// Binds the node's address and serves clients until the listener fails.
    pub fn start(node: Arc<Mutex<Node>>) -> Result<(), NodeError> {
        let addr = node.lock()?.get_addr();
        let listener = TcpListener::bind(addr)?;
        Self::serve(node, listener)
    }

    /// Serves every connection accepted by `listener` on a worker of the pool.
    pub fn serve(node: Arc<Mutex<Node>>, listener: TcpListener) -> Result<(), NodeError> {
        let log = node.lock()?.get_logger();
        log.info(
            &format!("Listening for clients on {}", listener.local_addr()?),
            Color::Green,
            true,
        )?;

        let pool = ThreadPool::new(CLIENT_WORKERS);

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let node_clone = Arc::clone(&node);
                    let log_client = log.clone();
                    pool.execute(move || {
                        if let Err(e) = ClientConnection::new(node_clone, stream).and_then(|c| c.run())
                        {
                            let message = format!("ERROR in CLIENT CONNECTION: {}", e);
                            log_client.error(&message, true).ok();
                        }
                    });
                }
                Err(e) => {
                    log.error(&format!("Error accepting client connection: {}", e), true)
                        .ok();
                }
            }
        }

        pool.join();
        Ok(())
    }

    /// Executes a request of an already started connection and builds the
    /// response frame.
    ///
    /// Query events for the connection go to `events`; the ids of its
    /// running queries are kept in `queries`.
    pub(crate) fn execute(
        &mut self,
        request: Request,
        events: &Sender<QueryEvent>,
        queries: &mut HashSet<QueryId>,
    ) -> Frame {
        let result = match request {
            Request::Startup => return Frame::Ready,
            Request::SetLocation(set) => self
                .database
                .set_location(&set.key, set.point)
                .map(|_| {
                    self.persist();
                    Outcome::Void
                }),
            Request::GetLocation(key) => Ok(Outcome::Location(self.database.get_location(&key))),
            Request::RemoveLocation(key) => {
                if self.database.remove_location(&key).is_some() {
                    self.persist();
                }
                Ok(Outcome::Void)
            }
            Request::Query(query) => self
                .database
                .query(query.center, query.radius_km, events.clone())
                .map(|query_id| {
                    queries.insert(query_id);
                    Outcome::QueryStarted(query_id)
                }),
            Request::UpdateQuery(update) => {
                if !queries.contains(&update.query_id) {
                    return unknown_query(update.query_id);
                }
                self.database
                    .update_query(update.query_id, update.center, update.radius_km)
                    .map(|_| Outcome::Void)
            }
            Request::CancelQuery(query_id) => {
                if !queries.remove(&query_id) {
                    return unknown_query(query_id);
                }
                self.database.cancel_query(query_id).map(|_| Outcome::Void)
            }
        };

        match result {
            Ok(outcome) => Frame::Result(outcome),
            Err(e) => {
                self.logger
                    .warn(&format!("Request rejected: {}", e), false)
                    .ok();
                Frame::Error(Error::from(&e))
            }
        }
    }

    /// Cancels queries of a connection that went away.
    pub(crate) fn forget_queries(&mut self, queries: &HashSet<QueryId>) {
        for query_id in queries {
            // Queries whose channel was already dropped are gone.
            let _ = self.database.cancel_query(*query_id);
        }
    }

    /// The write already happened in memory; a failed snapshot is only logged.
    fn persist(&self) {
        if let Err(e) = self.storage_engine.save(self.database.store()) {
            self.logger
                .error(&format!("Failed to save snapshot: {}", e), true)
                .ok();
        }
    }
}

fn unknown_query(query_id: QueryId) -> Frame {
    Frame::Error(Error::UnknownQuery(format!(
        "Query {} is not running on this connection",
        query_id
    )))
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use geo_protocol::messages::location::SetLocation;
    use geo_protocol::messages::query::{Query, UpdateQuery};
    use geo_store::GeoPoint;

    use super::*;

    fn test_node() -> (Node, PathBuf) {
        let root = std::env::temp_dir().join(format!("geo_node_{}", uuid::Uuid::new_v4()));
        let node = Node::new("127.0.0.1:17990".parse().unwrap(), root.clone()).unwrap();
        (node, root)
    }

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn writes_are_persisted_and_reloaded() {
        let (mut node, root) = test_node();
        let (events, _rx) = mpsc::channel();
        let mut queries = HashSet::new();

        let frame = node.execute(
            Request::SetLocation(SetLocation::new("25".to_string(), point(1.0, 2.0))),
            &events,
            &mut queries,
        );
        assert_eq!(frame, Frame::Result(Outcome::Void));
        assert!(root.join("geo_127_0_0_1_17990.csv").exists());
        assert!(root.join("node_127.0.0.1_17990.log").exists());

        drop(node);
        let reloaded = Node::new("127.0.0.1:17990".parse().unwrap(), root.clone()).unwrap();
        assert_eq!(
            reloaded.database().get_location("25"),
            Some(point(1.0, 2.0))
        );

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn store_errors_become_error_frames() {
        let (mut node, root) = test_node();
        let (events, _rx) = mpsc::channel();
        let mut queries = HashSet::new();

        let frame = node.execute(
            Request::SetLocation(SetLocation::new(String::new(), point(0.0, 0.0))),
            &events,
            &mut queries,
        );
        assert!(matches!(frame, Frame::Error(Error::InvalidKey(_))));

        let frame = node.execute(
            Request::Query(Query::new(point(0.0, 0.0), -1.0)),
            &events,
            &mut queries,
        );
        assert!(matches!(frame, Frame::Error(Error::InvalidRadius(_))));
        assert!(queries.is_empty());

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn queries_belong_to_their_connection() {
        let (mut node, root) = test_node();
        let (events, rx) = mpsc::channel();
        let mut mine = HashSet::new();
        let mut theirs = HashSet::new();

        let Frame::Result(Outcome::QueryStarted(query_id)) = node.execute(
            Request::Query(Query::new(point(0.0, 0.0), 2.5)),
            &events,
            &mut mine,
        ) else {
            panic!("expected a started query");
        };
        assert_eq!(rx.try_iter().count(), 1);

        let update = UpdateQuery::new(query_id, point(1.0, 1.0), 2.5);
        assert!(matches!(
            node.execute(Request::UpdateQuery(update.clone()), &events, &mut theirs),
            Frame::Error(Error::UnknownQuery(_))
        ));
        assert!(matches!(
            node.execute(Request::CancelQuery(query_id), &events, &mut theirs),
            Frame::Error(Error::UnknownQuery(_))
        ));

        assert_eq!(
            node.execute(Request::UpdateQuery(update), &events, &mut mine),
            Frame::Result(Outcome::Void)
        );
        node.forget_queries(&mine);
        assert_eq!(node.database().live_queries(), 0);

        std::fs::remove_dir_all(&root).unwrap();
    }
}
