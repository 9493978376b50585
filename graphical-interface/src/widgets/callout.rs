use sightings::Marker;

/// What the user did with an open callout.
#[derive(Debug, PartialEq)]
pub enum CalloutAction {
    None,
    Close,
    Directions,
}

/// The callout of a selected marker: its title, where it is and, for
/// sightings, a button asking for directions.
pub struct WidgetCallout {
    pub selected_marker: Marker,
}

impl WidgetCallout {
    pub fn new(selected_marker: Marker) -> Self {
        Self { selected_marker }
    }

    pub fn show(&mut self, ctx: &egui::Context) -> CalloutAction {
        let mut open = true;
        let mut action = CalloutAction::None;
        let style = self.selected_marker.style();
        let coordinate = self.selected_marker.coordinate();

        egui::Window::new(self.selected_marker.title())
            .resizable(false)
            .collapsible(false)
            .open(&mut open)
            .fixed_pos([20.0, 20.0])
            .show(ctx, |ui| {
                ui.add_space(10.0);
                ui.label(
                    egui::RichText::new(format!(
                        "{:.5}, {:.5}",
                        coordinate.latitude(),
                        coordinate.longitude()
                    ))
                    .size(16.0),
                );

                if style.callout.is_some() {
                    ui.add_space(10.0);
                    let button =
                        egui::Button::new(egui::RichText::new("🗺 Directions").size(16.0))
                            .rounding(10.0);
                    if ui.add(button).clicked() {
                        action = CalloutAction::Directions;
                    }
                }
            });

        if !open {
            return CalloutAction::Close;
        }
        action
    }
}
