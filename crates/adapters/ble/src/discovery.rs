//! Attribute-table ordering.
//!
//! btleplug hands services back as a set sorted by UUID, which loses the
//! order of the peer's attribute table. Services named by the device profile
//! are put back at their profile position; anything else follows in the order
//! reported, so an unexpected service still shows up as a count mismatch.

use bristlebot_domain::profile::{DEVICE_PROFILE, DiscoveredService};
use uuid::Uuid;

/// Order raw `(service, characteristics)` pairs for validation.
pub fn order_services<I>(services: I) -> Vec<DiscoveredService>
where
    I: IntoIterator<Item = (Uuid, Vec<Uuid>)>,
{
    let mut known = Vec::new();
    let mut unknown = Vec::new();
    for (uuid, characteristics) in services {
        let service = DiscoveredService::new(uuid, characteristics);
        match DEVICE_PROFILE.position_of(uuid) {
            Some(position) => known.push((position, service)),
            None => unknown.push(service),
        }
    }
    known.sort_by_key(|(position, _)| *position);
    known
        .into_iter()
        .map(|(_, service)| service)
        .chain(unknown)
        .collect()
}
