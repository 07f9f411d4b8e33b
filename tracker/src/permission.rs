use shared::PermissionStatus;

use crate::source::PositionSource;

/// One-shot location authorization.
///
/// The first [`PermissionGate::request_access`] asks the source; afterwards
/// the resolved status is returned as-is. `Denied` is final for the session.
#[derive(Debug, Clone, Copy)]
pub struct PermissionGate {
    status: PermissionStatus,
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionGate {
    pub fn new() -> Self {
        Self {
            status: PermissionStatus::Unknown,
        }
    }

    pub fn status(&self) -> PermissionStatus {
        self.status
    }

    pub fn is_granted(&self) -> bool {
        self.status == PermissionStatus::Granted
    }

    pub async fn request_access<S: PositionSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> PermissionStatus {
        if self.status != PermissionStatus::Unknown {
            return self.status;
        }

        self.status = match source.request_access().await {
            Ok(PermissionStatus::Granted) => PermissionStatus::Granted,
            Ok(_) => PermissionStatus::Denied,
            Err(err) => {
                tracing::warn!("location permission request failed: {err}");
                PermissionStatus::Denied
            }
        };
        tracing::info!("location permission resolved: {:?}", self.status);
        self.status
    }
}
