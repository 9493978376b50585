use std::{cell::RefCell, rc::Rc};

use egui::{include_image, Align2, Color32, FontId, Image, Rect, Response, Vec2};
use sightings::Marker;
use walkers::{Plugin, Position, Projector};

use crate::state::SelectionState;

/// Draws the user and every sighting on the map.
pub struct Markers<'a> {
    markers: &'a [Marker],
    selection_state: Rc<RefCell<SelectionState>>,
}

impl<'a> Markers<'a> {
    pub fn new(markers: &'a [Marker], selection_state: Rc<RefCell<SelectionState>>) -> Self {
        Self {
            markers,
            selection_state,
        }
    }
}

impl Plugin for Markers<'_> {
    fn run(self: Box<Self>, ui: &mut egui::Ui, _response: &Response, projector: &Projector) {
        for marker in self.markers {
            draw(marker, ui, projector, &mut self.selection_state.borrow_mut());
        }
    }
}

fn draw(
    marker: &Marker,
    ui: &mut egui::Ui,
    projector: &Projector,
    selection_state: &mut SelectionState,
) {
    let coordinate = marker.coordinate();
    let position = Position::from_lat_lon(coordinate.latitude(), coordinate.longitude());
    let screen_position = projector.project(position).to_pos2();

    let symbol_size = Vec2::new(30.0, 30.0);
    let rect = Rect::from_center_size(screen_position, symbol_size);

    let response = ui.allocate_rect(rect, egui::Sense::click());
    let selected = selection_state.marker.as_ref() == Some(marker);

    let image = match marker {
        Marker::User(_) => Image::new(include_image!("../../assets/ash.svg")),
        Marker::Sighting(_) if response.hovered() || selected => {
            Image::new(include_image!("../../assets/pokeball-selected.svg"))
        }
        Marker::Sighting(_) => Image::new(include_image!("../../assets/pokeball.svg")),
    }
    .fit_to_exact_size(symbol_size);

    ui.put(rect, image);

    // The sprite name is the Pokémon number, shown under the ball.
    if let Marker::Sighting(sighting) = marker {
        ui.painter().text(
            screen_position + Vec2::new(0.0, symbol_size.y / 2.0 + 2.0),
            Align2::CENTER_TOP,
            format!("#{}", sighting.pokemon),
            FontId::proportional(13.0),
            Color32::BLACK,
        );
    }

    if response.clicked() {
        selection_state.toggle_marker_selection(marker);
    }
}
