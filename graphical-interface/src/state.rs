use sightings::Marker;

/// Tracks the marker whose callout is open.
pub struct SelectionState {
    pub marker: Option<Marker>,
}

impl SelectionState {
    pub fn new() -> SelectionState {
        Self { marker: None }
    }

    /// If the provided marker is already selected, it will be deselected.
    /// Otherwise, it will be selected.
    pub fn toggle_marker_selection(&mut self, marker: &Marker) {
        if self.marker.as_ref() == Some(marker) {
            self.marker = None;
        } else {
            self.marker = Some(*marker);
        }
    }

    /// Drops the selection once its marker left the map.
    pub fn retain_shown(&mut self, shown: &[Marker]) {
        if let Some(marker) = &self.marker {
            if !shown.contains(marker) {
                self.marker = None;
            }
        }
    }
}
