mod map;
mod plugins;
mod state;
mod widgets;

use logger::Logger;
use map::PokeFinderApp;
use sightings::{FixedLocationProvider, GeoBackend, MapSession};

/// Opens the map window and runs it until it is closed.
pub fn run<B: GeoBackend + 'static>(
    session: MapSession<B>,
    provider: FixedLocationProvider,
    logger: Logger,
) -> Result<(), eframe::Error> {
    eframe::run_native(
        "PokeFinder",
        Default::default(),
        Box::new(move |cc| {
            Ok(Box::new(PokeFinderApp::new(
                cc.egui_ctx.clone(),
                session,
                provider,
                logger,
            )))
        }),
    )
}
