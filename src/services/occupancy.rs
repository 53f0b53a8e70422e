use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::PropertyStatus;
use crate::repository::{PropertyRepository, TenantRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OccupancySync {
    Synchronized {
        status: PropertyStatus,
        active_tenants: u64,
    },
    /// `under_maintenance` is set by staff and never cleared here.
    SkippedMaintenance,
    /// The property vanished before or during the sync.
    SkippedPropertyNotFound,
}

/// Recompute a property's status from its active tenant count.
///
/// Runs unconditionally after every tenant write instead of diffing old and
/// new tenant state.
pub async fn sync_property_occupancy<S>(store: &S, property_id: &str) -> AppResult<OccupancySync>
where
    S: PropertyRepository + TenantRepository,
{
    let Some(property) = store.get_property(property_id).await? else {
        debug!(property_id, "Occupancy sync skipped: property not found");
        return Ok(OccupancySync::SkippedPropertyNotFound);
    };
    if property.status == PropertyStatus::UnderMaintenance {
        debug!(property_id, "Occupancy sync skipped: property under maintenance");
        return Ok(OccupancySync::SkippedMaintenance);
    }

    let active_tenants = store.count_active_tenants(property_id).await?;
    let status = if active_tenants > 0 {
        PropertyStatus::Occupied
    } else {
        PropertyStatus::Vacant
    };

    // Staff may have switched the property to maintenance since the read
    // above; the guarded write reports that instead of overwriting it.
    match store.set_occupancy_status(property_id, status).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(property_id, "Occupancy sync skipped: property entered maintenance");
            return Ok(OccupancySync::SkippedMaintenance);
        }
        Err(AppError::NotFound(_)) => return Ok(OccupancySync::SkippedPropertyNotFound),
        Err(error) => return Err(error),
    }

    debug!(
        property_id,
        status = status.as_str(),
        active_tenants,
        "Occupancy synchronized"
    );
    Ok(OccupancySync::Synchronized {
        status,
        active_tenants,
    })
}
