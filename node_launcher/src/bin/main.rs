use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use geo_node::{Node, DEFAULT_NODE_ADDR};

/// Main entry point to start a geo node.
///
/// The node listens on the address given as first argument (127.0.0.1:17990
/// by default). `GEO_NODE_ADDR`, when set, takes precedence. Optionally, a custom path for
/// the node's snapshot and log can be provided as a second argument.
///
/// # Usage
///
/// ```sh
/// cargo run -- [node_addr] [custom_path]
/// ```
///
/// # Example Execution
///
/// ```sh
/// cargo run -- 127.0.0.1:17990 /path/to/node/storage
/// ```
///
/// # Errors
///
/// The program returns an error if:
/// - The number of arguments is incorrect.
/// - The provided address is invalid.
/// - The custom path (if provided) cannot be created.
/// - The node cannot load its snapshot or bind its address.
fn main() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();

    if args.len() > 3 {
        return Err("Usage: program [node_addr] [custom_path]".to_string());
    }

    let default_addr: SocketAddr = DEFAULT_NODE_ADDR
        .parse()
        .map_err(|_| "Invalid default address".to_string())?;
    let addr = match args.get(1) {
        Some(arg) => arg
            .parse::<SocketAddr>()
            .map_err(|_| format!("Invalid address: {}", arg))?,
        None => default_addr,
    };
    let addr = Node::addr_from_env(addr).map_err(|e| e.to_string())?;

    let path_buf = match args.get(2) {
        Some(custom_path) => {
            let custom_path = PathBuf::from(custom_path);
            if !custom_path.exists() {
                fs::create_dir_all(&custom_path).map_err(|_| {
                    format!("Failed to create directory at {}", custom_path.display())
                })?;
            }
            custom_path
        }
        None => env::current_dir()
            .map_err(|_| "Failed to determine the current directory".to_string())?,
    };

    let node = Arc::new(Mutex::new(
        Node::new(addr, path_buf).map_err(|e| e.to_string())?,
    ));

    Node::start(node).map_err(|e| e.to_string())?;

    Ok(())
}
