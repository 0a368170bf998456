//! Decoration of nearest-neighbor hits with the administrative hierarchy
//! and alternate names.

use std::collections::HashMap;

use revgeo_geocoder_models::{AdminCode, AdminEntry, AlternateNamesMap, GeocodedCity, IndexedCity};

/// The loaded side tables. Any table may be absent when configuration
/// disabled it; decoration for that level is then skipped silently.
#[derive(Debug, Default)]
pub(crate) struct SideTables {
    pub admin1: Option<HashMap<String, AdminEntry>>,
    pub admin2: Option<HashMap<String, AdminEntry>>,
    pub admin3: Option<HashMap<String, AdminEntry>>,
    pub admin4: Option<HashMap<String, AdminEntry>>,
    pub alternate_names: Option<AlternateNamesMap>,
}

/// Builds a decorated result for one hit.
///
/// Every lookup key is assembled from the raw code strings captured off
/// the record, never from already-substituted fields; a resolved admin1
/// object must not leak into the admin2 key.
pub(crate) fn decorate(city: &IndexedCity, distance_km: f64, tables: &SideTables) -> GeocodedCity {
    let mut result = GeocodedCity::from_record(&city.record);
    let record = &city.record;

    let cc = record.country_code.as_str();
    let a1 = record.admin1_code.as_deref().unwrap_or("");
    let a2 = record.admin2_code.as_deref().unwrap_or("");
    let a3 = record.admin3_code.as_deref().unwrap_or("");
    let a4 = record.admin4_code.as_deref().unwrap_or("");

    if let Some(table) = &tables.admin1 {
        if let Some(entry) = table.get(&format!("{cc}.{a1}")) {
            result.admin1_code = AdminCode::Resolved(entry.clone());
        }
    }
    if let Some(table) = &tables.admin2 {
        if let Some(entry) = table.get(&format!("{cc}.{a1}.{a2}")) {
            result.admin2_code = AdminCode::Resolved(entry.clone());
        }
    }
    if let Some(table) = &tables.admin3 {
        if let Some(entry) = table.get(&format!("{cc}.{a1}.{a2}.{a3}")) {
            result.admin3_code = AdminCode::Resolved(entry.clone());
        }
    }
    if let Some(table) = &tables.admin4 {
        if let Some(entry) = table.get(&format!("{cc}.{a1}.{a2}.{a3}.{a4}")) {
            result.admin4_code = AdminCode::Resolved(entry.clone());
        }
    }

    if let Some(names) = &tables.alternate_names {
        if let Some(by_language) = names.get(&record.geoname_id) {
            result.alternate_name = Some(by_language.clone());
        }
    }

    result.distance = distance_km;
    result
}
