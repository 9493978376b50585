use geo_store::GeoPoint;

/// Whether the app may read the user's location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    /// Location may be read while the app is in use.
    AuthorizedWhenInUse,
    Denied,
}

/// Supplies the user's location and the permission to read it.
pub trait LocationProvider {
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Asks for "while in use" access. The answer is reported later through
    /// `MapSession::on_authorization_changed`.
    fn request_when_in_use_authorization(&mut self);

    fn current_location(&self) -> Option<GeoPoint>;
}

/// A provider with a fixed position, for desktops without location services.
#[derive(Debug, Clone)]
pub struct FixedLocationProvider {
    location: GeoPoint,
    status: AuthorizationStatus,
    /// Status granted when authorization is requested.
    grants: AuthorizationStatus,
    requests: usize,
}

impl FixedLocationProvider {
    /// A provider that already has permission.
    pub fn new(location: GeoPoint) -> Self {
        Self {
            location,
            status: AuthorizationStatus::AuthorizedWhenInUse,
            grants: AuthorizationStatus::AuthorizedWhenInUse,
            requests: 0,
        }
    }

    /// A provider that has not been asked yet and answers requests with `grants`.
    pub fn undetermined(location: GeoPoint, grants: AuthorizationStatus) -> Self {
        Self {
            location,
            status: AuthorizationStatus::NotDetermined,
            grants,
            requests: 0,
        }
    }

    /// How many times authorization was requested.
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl LocationProvider for FixedLocationProvider {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.status
    }

    fn request_when_in_use_authorization(&mut self) {
        self.requests += 1;
        self.status = self.grants;
    }

    fn current_location(&self) -> Option<GeoPoint> {
        match self.status {
            AuthorizationStatus::AuthorizedWhenInUse => Some(self.location),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_is_hidden_until_authorized() {
        let here = GeoPoint::new(1.0, 1.0).unwrap();
        let mut provider =
            FixedLocationProvider::undetermined(here, AuthorizationStatus::AuthorizedWhenInUse);

        assert_eq!(provider.current_location(), None);
        provider.request_when_in_use_authorization();

        assert_eq!(provider.requests(), 1);
        assert_eq!(
            provider.authorization_status(),
            AuthorizationStatus::AuthorizedWhenInUse
        );
        assert_eq!(provider.current_location(), Some(here));
    }
}
