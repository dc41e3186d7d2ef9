//! Nearest-region resolver
//!
//! Maps a GPS coordinate to the closest catalog region by great-circle
//! distance. Linear scan: catalogs hold tens to low hundreds of regions.

use rozgar_common::{Coordinate, Region};
use serde::Serialize;

use crate::error::DataError;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Closest region to a queried coordinate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestRegion {
    pub region: Region,
    pub distance_km: f64,
    /// Heuristic match confidence in (0, 1], higher when closer
    pub confidence: f64,
}

/// Great-circle distance in kilometres (haversine, spherical Earth)
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Clamp guards asin against rounding just above 1.0 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Confidence bands by distance
pub fn confidence_for_distance(distance_km: f64) -> f64 {
    match distance_km {
        d if d < 10.0 => 0.95,
        d if d < 25.0 => 0.85,
        d if d < 50.0 => 0.70,
        d if d < 100.0 => 0.50,
        _ => 0.30,
    }
}

/// Find the region nearest to `point`.
///
/// Ties go to the region encountered first in `regions`.
pub fn nearest_region(regions: &[Region], point: &Coordinate) -> Result<NearestRegion, DataError> {
    let mut best: Option<(&Region, f64)> = None;

    for region in regions {
        let distance = haversine_km(point, &region.coordinate);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((region, distance)),
        }
    }

    let (region, distance_km) = best.ok_or(DataError::NoRegionsAvailable)?;

    tracing::debug!(
        region_id = %region.id,
        distance_km = distance_km,
        "Resolved nearest region"
    );

    Ok(NearestRegion {
        region: region.clone(),
        distance_km,
        confidence: confidence_for_distance(distance_km),
    })
}
