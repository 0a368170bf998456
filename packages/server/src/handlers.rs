//! HTTP handler functions for the reverse geocoder API.

use actix_web::{HttpResponse, web};
use revgeo_geocoder::Point;
use revgeo_server_models::{ApiError, ApiHealth};

use crate::AppState;

/// `GET /healthcheck`
///
/// Answers 200 as soon as the process is up, whether or not the engine
/// has finished loading.
pub async fn healthcheck() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /deep-healthcheck`
///
/// Answers 200 once initialization has resolved, 503 before that.
pub async fn deep_healthcheck(state: web::Data<AppState>) -> HttpResponse {
    if state.engine.get().is_some() {
        HttpResponse::Ok().json(ApiHealth {
            healthy: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    } else {
        HttpResponse::ServiceUnavailable()
            .json(ApiError::new("reverse geocoder is still initializing"))
    }
}

/// `GET /geocode?latitude=…&longitude=…&maxResults=…`
///
/// `latitude`/`longitude` repeat pairwise for batch queries. Responds
/// 400 when the pair counts mismatch, either value is missing, or a
/// value does not coerce to a finite number; 503 before the engine is
/// ready.
pub async fn geocode(
    state: web::Data<AppState>,
    query: web::Query<Vec<(String, String)>>,
) -> HttpResponse {
    let Some(engine) = state.engine.get() else {
        return HttpResponse::ServiceUnavailable()
            .json(ApiError::new("reverse geocoder is still initializing"));
    };

    let (points, max_results) = match parse_geocode_query(&query) {
        Ok(parsed) => parsed,
        Err(message) => return HttpResponse::BadRequest().json(ApiError::new(message)),
    };

    let results = engine.lookup(&points, max_results);
    if results.iter().any(Option::is_none) {
        return HttpResponse::BadRequest()
            .json(ApiError::new("latitude/longitude must be finite numbers"));
    }

    HttpResponse::Ok().json(results)
}

/// Coerces the raw query pair list into a point batch.
///
/// Decimal-string coercion lives here at the boundary; the engine only
/// ever sees normalized floats.
fn parse_geocode_query(pairs: &[(String, String)]) -> Result<(Vec<Point>, usize), String> {
    let mut latitudes: Vec<f64> = Vec::new();
    let mut longitudes: Vec<f64> = Vec::new();
    let mut max_results = 1usize;

    for (key, value) in pairs {
        match key.as_str() {
            "latitude" => latitudes.push(parse_coordinate("latitude", value)?),
            "longitude" => longitudes.push(parse_coordinate("longitude", value)?),
            "maxResults" => {
                max_results = value
                    .parse()
                    .map_err(|_| format!("invalid maxResults: {value}"))?;
            }
            _ => {}
        }
    }

    if latitudes.is_empty() {
        return Err("latitude is required".to_string());
    }
    if longitudes.is_empty() {
        return Err("longitude is required".to_string());
    }
    if latitudes.len() != longitudes.len() {
        return Err(format!(
            "latitude/longitude counts differ: {} vs {}",
            latitudes.len(),
            longitudes.len()
        ));
    }

    let points = latitudes
        .into_iter()
        .zip(longitudes)
        .map(|(latitude, longitude)| Point::new(latitude, longitude))
        .collect();

    Ok((points, max_results))
}

fn parse_coordinate(name: &str, value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid {name}: {value}"))?;
    if !parsed.is_finite() {
        return Err(format!("invalid {name}: {value}"));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn single_pair_parses_with_default_max_results() {
        let (points, max_results) =
            parse_geocode_query(&pairs(&[("latitude", "48.5"), ("longitude", "9.1")])).unwrap();

        assert_eq!(points.len(), 1);
        assert!((points[0].latitude - 48.5).abs() < 1e-12);
        assert!((points[0].longitude - 9.1).abs() < 1e-12);
        assert_eq!(max_results, 1);
    }

    #[test]
    fn repeated_pairs_build_a_batch_in_order() {
        let (points, max_results) = parse_geocode_query(&pairs(&[
            ("latitude", "48.5"),
            ("longitude", "9.1"),
            ("latitude", "42.1"),
            ("longitude", "3.1"),
            ("maxResults", "2"),
        ]))
        .unwrap();

        assert_eq!(points.len(), 2);
        assert!((points[1].latitude - 42.1).abs() < 1e-12);
        assert_eq!(max_results, 2);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let err = parse_geocode_query(&pairs(&[
            ("latitude", "48.5"),
            ("latitude", "42.1"),
            ("longitude", "9.1"),
        ]))
        .unwrap_err();
        assert!(err.contains("counts differ"));
    }

    #[test]
    fn missing_values_are_rejected() {
        assert!(parse_geocode_query(&pairs(&[("latitude", "48.5")])).is_err());
        assert!(parse_geocode_query(&pairs(&[("longitude", "9.1")])).is_err());
        assert!(parse_geocode_query(&[]).is_err());
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        let err = parse_geocode_query(&pairs(&[
            ("latitude", "north"),
            ("longitude", "9.1"),
        ]))
        .unwrap_err();
        assert!(err.contains("invalid latitude"));

        let err = parse_geocode_query(&pairs(&[
            ("latitude", "48.5"),
            ("longitude", "NaN"),
        ]))
        .unwrap_err();
        assert!(err.contains("invalid longitude"));
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let (points, _) = parse_geocode_query(&pairs(&[
            ("latitude", "48.5"),
            ("longitude", "9.1"),
            ("callback", "jsonp"),
        ]))
        .unwrap();
        assert_eq!(points.len(), 1);
    }
}
