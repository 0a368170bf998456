//! Tab-separated record decoders for the five GeoNames dump schemas.
//!
//! All five parsers run over the `csv` crate configured for the GeoNames
//! format: tab delimiter, no header row, and quoting disabled — the dumps
//! contain unescaped quotes, so quote processing must be off. Malformed
//! rows are dropped silently and parsing continues; nothing aborts on a
//! bad row.
//!
//! The cities dump is read into a buffer and decoded in one pass; the
//! other files are streamed line-at-a-time.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use revgeo_geocoder_models::{
    AdminEntry, AlternateName, AlternateNamesMap, CityRecord, IndexedCity,
};
use serde::Deserialize;

/// Admin3/admin4 side tables produced by one allCountries scan.
pub type Admin3And4 = (
    HashMap<String, AdminEntry>,
    HashMap<String, AdminEntry>,
);

fn tsv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(reader)
}

/// Maps an empty column to `None`.
fn opt(column: String) -> Option<String> {
    if column.is_empty() {
        None
    } else {
        Some(column)
    }
}

/// One raw 19-column row of a cities or allCountries dump.
#[derive(Debug, Deserialize)]
struct RawGeoNameRow {
    geoname_id: String,
    name: String,
    ascii_name: String,
    alternate_names: String,
    latitude: String,
    longitude: String,
    feature_class: String,
    feature_code: String,
    country_code: String,
    cc2: String,
    admin1_code: String,
    admin2_code: String,
    admin3_code: String,
    admin4_code: String,
    population: String,
    elevation: String,
    dem: String,
    timezone: String,
    modification_date: String,
}

impl RawGeoNameRow {
    /// Converts to an indexed city record.
    ///
    /// Returns `None` when the coordinates do not parse as finite floats
    /// in range; such rows are skipped, not fatal.
    fn into_indexed(self) -> Option<IndexedCity> {
        let latitude: f64 = self.latitude.trim().parse().ok()?;
        let longitude: f64 = self.longitude.trim().parse().ok()?;
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }

        Some(IndexedCity {
            record: CityRecord {
                geoname_id: self.geoname_id,
                name: self.name,
                ascii_name: self.ascii_name,
                alternate_names: opt(self.alternate_names),
                latitude: self.latitude,
                longitude: self.longitude,
                feature_class: self.feature_class,
                feature_code: self.feature_code,
                country_code: self.country_code,
                cc2: opt(self.cc2),
                admin1_code: opt(self.admin1_code),
                admin2_code: opt(self.admin2_code),
                admin3_code: opt(self.admin3_code),
                admin4_code: opt(self.admin4_code),
                population: self.population,
                elevation: opt(self.elevation),
                dem: self.dem,
                timezone: self.timezone,
                modification_date: self.modification_date,
            },
            latitude,
            longitude,
        })
    }
}

/// Parses a cities dump into the corpus.
///
/// The whole file is buffered before decoding. With `populated_only` set
/// (used for per-country dumps, which carry every feature class) rows
/// whose feature class is not `P` are dropped.
///
/// # Errors
///
/// Returns an error if the file cannot be read. Malformed rows are
/// skipped.
pub fn parse_cities(path: &Path, populated_only: bool) -> Result<Vec<IndexedCity>, ParseError> {
    let contents = std::fs::read(path).map_err(|e| ParseError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_cities_from(contents.as_slice(), populated_only))
}

fn parse_cities_from(reader: impl Read, populated_only: bool) -> Vec<IndexedCity> {
    let mut cities = Vec::new();

    for result in tsv_reader(reader).deserialize::<RawGeoNameRow>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::trace!("  skipping malformed city row: {e}");
                continue;
            }
        };

        if populated_only && row.feature_class != "P" {
            continue;
        }

        if let Some(city) = row.into_indexed() {
            cities.push(city);
        }
    }

    cities
}

/// One raw 4-column row of an admin1/admin2 codes dump.
#[derive(Debug, Deserialize)]
struct RawAdminCodeRow {
    concatenated_codes: String,
    name: String,
    ascii_name: String,
    geoname_id: String,
}

/// Parses an admin1 or admin2 codes dump (shared 4-column schema) into a
/// map keyed on the concatenated code.
///
/// # Errors
///
/// Returns an error if the file cannot be opened. Malformed rows are
/// skipped.
pub fn parse_admin_codes(path: &Path) -> Result<HashMap<String, AdminEntry>, ParseError> {
    let file = std::fs::File::open(path).map_err(|e| ParseError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_admin_codes_from(file))
}

fn parse_admin_codes_from(reader: impl Read) -> HashMap<String, AdminEntry> {
    let mut table = HashMap::new();

    for result in tsv_reader(reader).deserialize::<RawAdminCodeRow>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::trace!("  skipping malformed admin code row: {e}");
                continue;
            }
        };

        if row.concatenated_codes.is_empty() {
            continue;
        }

        table.insert(
            row.concatenated_codes,
            AdminEntry {
                name: row.name,
                ascii_name: row.ascii_name,
                geoname_id: row.geoname_id,
            },
        );
    }

    table
}

/// Scans the allCountries dump for `ADM3`/`ADM4` rows and builds the
/// admin3 and admin4 side tables.
///
/// Keys are the dotted code chains (`CC.A1.A2.A3` and `CC.A1.A2.A3.A4`,
/// empty columns contributing empty segments). Progress is logged every
/// 100 000 rows — the dump is large.
///
/// # Errors
///
/// Returns an error if the file cannot be opened. Malformed rows are
/// skipped.
pub fn parse_admin3_and_4(path: &Path) -> Result<Admin3And4, ParseError> {
    let file = std::fs::File::open(path).map_err(|e| ParseError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_admin3_and_4_from(file))
}

fn parse_admin3_and_4_from(reader: impl Read) -> Admin3And4 {
    let mut admin3 = HashMap::new();
    let mut admin4 = HashMap::new();
    let mut scanned = 0u64;

    for result in tsv_reader(reader).deserialize::<RawGeoNameRow>() {
        scanned += 1;
        if scanned.is_multiple_of(100_000) {
            log::info!("  scanned {scanned} allCountries rows...");
        }

        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::trace!("  skipping malformed allCountries row: {e}");
                continue;
            }
        };

        let entry = || AdminEntry {
            name: row.name.clone(),
            ascii_name: row.ascii_name.clone(),
            geoname_id: row.geoname_id.clone(),
        };

        match row.feature_code.as_str() {
            "ADM3" => {
                let key = format!(
                    "{}.{}.{}.{}",
                    row.country_code, row.admin1_code, row.admin2_code, row.admin3_code
                );
                admin3.insert(key, entry());
            }
            "ADM4" => {
                let key = format!(
                    "{}.{}.{}.{}.{}",
                    row.country_code,
                    row.admin1_code,
                    row.admin2_code,
                    row.admin3_code,
                    row.admin4_code
                );
                admin4.insert(key, entry());
            }
            _ => {}
        }
    }

    log::info!(
        "  allCountries scan complete: {} admin3, {} admin4 entries",
        admin3.len(),
        admin4.len()
    );

    (admin3, admin4)
}

/// Flag columns are presence-based: set unless empty or literally `"0"`.
fn flag_set(column: &str) -> bool {
    !column.is_empty() && column != "0"
}

/// Parses the alternate names dump into `geoNameId -> isoLanguage ->`
/// name entries.
///
/// Rows with an empty `isoLanguage` are dropped. Later rows for the same
/// (id, language) pair overwrite earlier ones, matching the dump's own
/// ordering. The dump may carry trailing from/to period columns; they are
/// ignored.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a record cannot be
/// framed. Malformed rows are skipped.
pub fn parse_alternate_names(path: &Path) -> Result<AlternateNamesMap, ParseError> {
    let file = std::fs::File::open(path).map_err(|e| ParseError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_alternate_names_from(file))
}

fn parse_alternate_names_from(reader: impl Read) -> AlternateNamesMap {
    let mut names: AlternateNamesMap = HashMap::new();
    let mut reader = tsv_reader(reader);
    let mut record = csv::StringRecord::new();

    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {}
            Err(e) => {
                log::trace!("  skipping malformed alternate name row: {e}");
                continue;
            }
        }

        let geoname_id = record.get(1).unwrap_or("");
        let iso_language = record.get(2).unwrap_or("");
        if geoname_id.is_empty() || iso_language.is_empty() {
            continue;
        }

        let entry = AlternateName {
            alt_name: record.get(3).unwrap_or("").to_string(),
            is_preferred_name: flag_set(record.get(4).unwrap_or("")),
            is_short_name: flag_set(record.get(5).unwrap_or("")),
            is_colloquial: flag_set(record.get(6).unwrap_or("")),
            is_historic: flag_set(record.get(7).unwrap_or("")),
        };

        names
            .entry(geoname_id.to_string())
            .or_default()
            .insert(iso_language.to_string(), entry);
    }

    names
}

/// Errors from dump file parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// I/O error reading a dump file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
