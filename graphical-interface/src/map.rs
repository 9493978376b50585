use std::{cell::RefCell, rc::Rc, time::Duration};

use egui::Context;
use egui_extras::install_image_loaders;
use geo_store::GeoPoint;
use logger::Logger;
use rand::rngs::ThreadRng;
use sightings::{FixedLocationProvider, GeoBackend, LocationProvider, MapSession};
use walkers::{HttpOptions, HttpTiles, Map, MapMemory, Position, Tiles};

use crate::{
    plugins,
    state::SelectionState,
    widgets::{CalloutAction, WidgetCallout},
};

const UPDATE_TICK_MS: u64 = 250;
/// Roughly the 2 km span the map opens with.
const INITIAL_ZOOM: f64 = 15.;
/// Centers closer than this are the same region, in degrees.
const CENTER_EPSILON: f64 = 1e-6;

/// The map screen: tiles, the markers of the session and the controls on top.
pub struct PokeFinderApp<B: GeoBackend> {
    tiles: Box<dyn Tiles>,
    map_memory: MapMemory,
    selection_state: Rc<RefCell<SelectionState>>,
    callout_widget: Option<WidgetCallout>,
    session: MapSession<B>,
    provider: FixedLocationProvider,
    rng: ThreadRng,
    status: Option<String>,
    logger: Logger,
}

impl<B: GeoBackend> PokeFinderApp<B> {
    pub fn new(
        egui_ctx: Context,
        mut session: MapSession<B>,
        mut provider: FixedLocationProvider,
        logger: Logger,
    ) -> Self {
        install_image_loaders(&egui_ctx);
        let mut initial_map_memory = MapMemory::default();
        let _ = initial_map_memory.set_zoom(INITIAL_ZOOM);

        session.on_appear(&mut provider);
        session.on_authorization_changed(provider.authorization_status());

        Self {
            tiles: Box::new(HttpTiles::with_options(
                walkers::sources::OpenStreetMap,
                HttpOptions::default(),
                egui_ctx.to_owned(),
            )),
            map_memory: initial_map_memory,
            selection_state: Rc::new(RefCell::new(SelectionState::new())),
            callout_widget: None,
            session,
            provider,
            rng: rand::thread_rng(),
            status: None,
            logger,
        }
    }

    fn update_user_location(&mut self) {
        let Some(location) = self.provider.current_location() else {
            return;
        };
        match self.session.on_user_location_updated(location) {
            // The map follows the session's region again.
            Ok(Some(_)) => self.map_memory.follow_my_position(),
            Ok(None) => {}
            Err(e) => self.status = Some(format!("Could not watch sightings: {}", e)),
        }
    }

    /// Re-queries once the user let go of a map that now shows another place.
    fn check_region(&mut self, ctx: &Context) {
        let Some(position) = self.map_memory.detached() else {
            return;
        };
        if ctx.input(|i| i.pointer.any_down()) {
            return;
        }
        let Ok(center) = GeoPoint::new(position.lat(), position.lon()) else {
            return;
        };
        if !moved(self.session.region().center, center) {
            return;
        }

        self.status = match self.session.on_region_changed(center) {
            Ok(()) => None,
            Err(e) => Some(format!("Could not watch sightings: {}", e)),
        };
    }

    fn spot_random_pokemon(&mut self) {
        self.status = match self.session.spot_random_pokemon(&mut self.rng) {
            Ok(sighting) => {
                self.logger
                    .info(
                        &format!("Spotted Pokemon #{}", sighting.pokemon),
                        logger::Color::Green,
                        false,
                    )
                    .ok();
                None
            }
            Err(e) => Some(format!("Could not record the sighting: {}", e)),
        };
    }

    fn show_callout(&mut self, ctx: &Context) {
        let selected_marker = self.selection_state.borrow().marker;
        let Some(marker) = selected_marker else {
            self.callout_widget = None;
            return;
        };

        let stale = self
            .callout_widget
            .as_ref()
            .map_or(true, |widget| widget.selected_marker != marker);
        if stale {
            self.callout_widget = Some(WidgetCallout::new(marker));
        }
        let Some(widget) = &mut self.callout_widget else {
            return;
        };

        match widget.show(ctx) {
            CalloutAction::None => {}
            CalloutAction::Close => {
                self.selection_state.borrow_mut().marker = None;
                self.callout_widget = None;
            }
            CalloutAction::Directions => {
                if let Some(directions) = self.session.on_callout_tapped(&marker) {
                    ctx.open_url(egui::OpenUrl::new_tab(directions.maps_url()));
                }
            }
        }
    }
}

impl<B: GeoBackend> eframe::App for PokeFinderApp<B> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_user_location();
        self.check_region(ctx);
        self.session.pump_events();

        let markers = self.session.markers().markers();
        self.selection_state.borrow_mut().retain_shown(&markers);

        ctx.request_repaint_after(Duration::from_millis(UPDATE_TICK_MS));

        let rimless = egui::Frame {
            fill: ctx.style().visuals.panel_fill,
            ..Default::default()
        };

        egui::CentralPanel::default()
            .frame(rimless)
            .show(ctx, |ui| {
                let region = self.session.region();
                let my_position =
                    Position::from_lat_lon(region.center.latitude(), region.center.longitude());

                let tiles = self.tiles.as_mut();
                let marker_plugin = plugins::Markers::new(&markers, self.selection_state.clone());

                let map = Map::new(Some(tiles), &mut self.map_memory, my_position)
                    .with_plugin(marker_plugin);

                ui.add(map);

                self.show_callout(ctx);

                egui::Area::new("spot_button".into())
                    .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -10.0])
                    .show(ctx, |ui| {
                        let button_size = [200.0, 60.0];

                        if ui
                            .add_sized(
                                button_size,
                                egui::Button::new("Spot Random Pokemon").rounding(10.0),
                            )
                            .clicked()
                        {
                            self.spot_random_pokemon();
                        }
                    });

                egui::Area::new("status".into())
                    .anchor(egui::Align2::LEFT_BOTTOM, [10.0, -10.0])
                    .show(ctx, |ui| {
                        ui.label(
                            egui::RichText::new(format!(
                                "{} sightings nearby",
                                self.session.markers().sightings().len()
                            ))
                            .size(16.0),
                        );
                        if let Some(status) = &self.status {
                            ui.colored_label(egui::Color32::RED, status);
                        }
                    });
            });
    }
}

fn moved(from: GeoPoint, to: GeoPoint) -> bool {
    (from.latitude() - to.latitude()).abs() > CENTER_EPSILON
        || (from.longitude() - to.longitude()).abs() > CENTER_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_drifts_are_not_region_changes() {
        let center = GeoPoint::new(-34.6037, -58.3816).unwrap();

        assert!(!moved(center, GeoPoint::new(-34.6037001, -58.3816).unwrap()));
        assert!(moved(center, GeoPoint::new(-34.61, -58.3816).unwrap()));
        assert!(moved(center, GeoPoint::new(-34.6037, -58.39).unwrap()));
    }
}
