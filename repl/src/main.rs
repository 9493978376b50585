mod command;

use std::env;
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;

use command::{Command, HELP};
use logger::Logger;
use sightings::{
    Config, FixedLocationProvider, GeoBackend, LocalBackend, LocationProvider, MapSession, Marker,
    RemoteBackend, SightingService,
};

/// Line interface to the map session.
///
/// # Usage
///
/// ```sh
/// cargo run -p repl -- [--local | --node <addr>]
/// ```
fn main() -> Result<(), String> {
    let config = Config::from_env().map_err(|e| e.to_string())?;
    let logger = config.logger("pokefinder_repl").map_err(|e| e.to_string())?;

    let args: Vec<String> = env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] => run_remote(&config, config.node_addr, logger),
        ["--node", addr] => {
            let addr: SocketAddr = addr.parse().map_err(|_| format!("Invalid address: {}", addr))?;
            run_remote(&config, addr, logger)
        }
        ["--local"] => {
            let service = SightingService::new(LocalBackend::new(), logger.clone());
            run(&config, service, logger)
        }
        _ => Err("Usage: repl [--local | --node <addr>]".to_string()),
    }
}

fn run_remote(config: &Config, addr: SocketAddr, logger: Logger) -> Result<(), String> {
    let backend = RemoteBackend::connect(addr)
        .map_err(|e| format!("Failed to connect to the node at {}: {}", addr, e))?
        .with_tracing(config.trace);
    run(config, SightingService::new(backend, logger.clone()), logger)
}

fn run<B: GeoBackend>(
    config: &Config,
    service: SightingService<B>,
    logger: Logger,
) -> Result<(), String> {
    let mut provider = FixedLocationProvider::new(config.location);
    let mut session = MapSession::new(service, config.location, config.marker_policy, logger);

    session.on_appear(&mut provider);
    if let Some(location) = provider.current_location() {
        if let Err(e) = session.on_user_location_updated(location) {
            eprintln!("{}", e);
        }
    }

    let mut rng = rand::thread_rng();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    println!("{}", HELP);
    loop {
        report_changes(session.pump_events());
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line.map_err(|e| e.to_string())?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };

        match command {
            Command::Spot => match session.spot_random_pokemon(&mut rng) {
                Ok(sighting) => println!(
                    "Spotted Pokemon #{} at {}",
                    sighting.pokemon, sighting.coordinate
                ),
                Err(e) => eprintln!("{}", e),
            },
            Command::Pan(center) => match session.on_region_changed(center) {
                Ok(()) => println!("Map centered on {}", center),
                Err(e) => eprintln!("{}", e),
            },
            Command::Locate(location) => match session.on_user_location_updated(location) {
                Ok(Some(region)) => println!("Map centered on you at {}", region.center),
                Ok(None) => println!("You are at {}", location),
                Err(e) => eprintln!("{}", e),
            },
            Command::Markers => {
                report_changes(session.pump_events());
                print_markers(&session.markers().markers());
            }
            Command::Tap(pokemon) => {
                session.pump_events();
                let marker = session
                    .markers()
                    .find(pokemon)
                    .next()
                    .map(|sighting| Marker::Sighting(*sighting));
                match marker.and_then(|marker| session.on_callout_tapped(&marker)) {
                    Some(directions) => println!(
                        "{} ({}): {}",
                        directions.name,
                        directions.destination,
                        directions.maps_url()
                    ),
                    None => eprintln!("Pokemon #{} is not on the map", pokemon),
                }
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(()),
        }
    }
}

fn report_changes(changed: usize) {
    if changed > 0 {
        println!("({} marker changes)", changed);
    }
}

fn print_markers(markers: &[Marker]) {
    if markers.is_empty() {
        println!("No markers");
    }
    for marker in markers {
        let style = marker.style();
        println!(
            "{:<12} {:<24} sprite={} view={}",
            marker.title(),
            marker.coordinate().to_string(),
            style.sprite,
            style.reuse_identifier
        );
    }
}
