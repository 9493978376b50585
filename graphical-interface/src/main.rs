use std::env;

use sightings::{
    Config, FixedLocationProvider, GeoBackend, LocalBackend, MapSession, RemoteBackend,
    SightingService,
};

/// Starts the map.
///
/// # Usage
///
/// ```sh
/// cargo run -p graphical-interface -- [--local]
/// ```
///
/// Without `--local` the sightings live on the node at `NODE_ADDR`.
fn main() -> Result<(), String> {
    let config = Config::from_env().map_err(|e| e.to_string())?;
    let logger = config.logger("pokefinder").map_err(|e| e.to_string())?;

    let local = match env::args().nth(1).as_deref() {
        None => false,
        Some("--local") => true,
        Some(_) => return Err("Usage: pokefinder [--local]".to_string()),
    };

    if local {
        let service = SightingService::new(LocalBackend::new(), logger.clone());
        start(&config, service, logger)
    } else {
        let backend = RemoteBackend::connect(config.node_addr).map_err(|e| {
            format!("Failed to connect to the node at {}: {}", config.node_addr, e)
        })?
        .with_tracing(config.trace);
        start(&config, SightingService::new(backend, logger.clone()), logger)
    }
}

fn start<B: GeoBackend + 'static>(
    config: &Config,
    service: SightingService<B>,
    logger: logger::Logger,
) -> Result<(), String> {
    let session = MapSession::new(
        service,
        config.location,
        config.marker_policy,
        logger.clone(),
    );
    let provider = FixedLocationProvider::new(config.location);

    graphical_interface::run(session, provider, logger).map_err(|e| e.to_string())
}
