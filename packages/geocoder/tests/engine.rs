//! End-to-end engine scenarios over a small fixture corpus.
//!
//! The fixtures are seeded as stable cache files (`<base>.txt`) under a
//! temp dump directory, so initialization never touches the network —
//! the configured base URL points at a closed port to prove it.

use std::path::{Path, PathBuf};

use revgeo_geocoder::{AdminCode, GeocoderConfig, Point, ReverseGeocoder};

/// A base URL nothing listens on; every test must run entirely from the
/// seeded cache.
const UNREACHABLE: &str = "http://127.0.0.1:9";

const CITIES: &str = concat!(
    "2922530\tGomaringen\tGomaringen\tGomaringa\t48.45366\t9.09644\tP\tPPLA4\tDE\t\t01\t083\t8416\t08416016\t8400\t\t430\tEurope/Berlin\t2019-02-26\n",
    "2863941\tNehren\tNehren\t\t48.42787\t9.06762\tP\tPPLA4\tDE\t\t01\t083\t8416\t08416037\t4100\t\t410\tEurope/Berlin\t2019-02-26\n",
    "3038638\tAlbons\tAlbons\t\t42.10569\t3.08457\tP\tPPL\tES\t\t56\tGI\t17001\t\t595\t\t14\tEurope/Madrid\t2012-03-04\n",
    "3108286\tla Tallada d'Empordà\tla Tallada d'Emporda\t\t42.0775\t3.05583\tP\tPPL\tES\t\t56\tGI\t17196\t\t430\t\t18\tEurope/Madrid\t2012-03-04\n",
);

const ADMIN1: &str = concat!(
    "DE.01\tBaden-Württemberg\tBaden-Wuerttemberg\t2953481\n",
    "ES.56\tCatalonia\tCatalonia\t3336901\n",
);

const ADMIN2: &str = concat!(
    "DE.01.083\tRegierungsbezirk Tübingen\tRegierungsbezirk Tuebingen\t3214106\n",
    "ES.56.GI\tGirona\tGirona\t6355230\n",
);

const ALL_COUNTRIES: &str = concat!(
    "3220743\tLandkreis Tübingen\tLandkreis Tuebingen\t\t48.5\t9.05\tA\tADM3\tDE\t\t01\t083\t8416\t\t0\t\t400\tEurope/Berlin\t2019-01-01\n",
    "6555970\tGomaringen\tGomaringen\t\t48.45\t9.09\tA\tADM4\tDE\t\t01\t083\t8416\t08416016\t8400\t\t430\tEurope/Berlin\t2019-01-01\n",
);

const ALTERNATE_NAMES: &str = concat!(
    "1\t2922530\tde\tGomaringen\t1\t\t\t\n",
    "2\t2922530\ten\tGomaringen\t\t\t\t\n",
    "3\t3038638\tca\tAlbons\t1\t\t\t\n",
);

fn seed(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("revgeo_engine_tests").join(name);
    let _ = std::fs::remove_dir_all(&dir);

    seed_file(&dir.join("cities"), "cities1000.txt", CITIES);
    seed_file(&dir.join("admin1_codes"), "admin1CodesASCII.txt", ADMIN1);
    seed_file(&dir.join("admin2_codes"), "admin2Codes.txt", ADMIN2);
    seed_file(&dir.join("all_countries"), "allCountries.txt", ALL_COUNTRIES);
    seed_file(
        &dir.join("alternate_names"),
        "alternateNames.txt",
        ALTERNATE_NAMES,
    );

    dir
}

fn seed_file(folder: &Path, name: &str, contents: &str) {
    std::fs::create_dir_all(folder).unwrap();
    std::fs::write(folder.join(name), contents).unwrap();
}

fn config(dump_directory: PathBuf) -> GeocoderConfig {
    GeocoderConfig {
        dump_directory,
        geonames_url: UNREACHABLE.to_string(),
        ..GeocoderConfig::default()
    }
}

#[tokio::test]
async fn nearest_city_is_fully_decorated() {
    let dir = seed("decorated");
    let geocoder = ReverseGeocoder::init(config(dir.clone())).await.unwrap();
    assert_eq!(geocoder.num_cities(), 4);

    let results = geocoder.lookup(&[Point::new(48.466_667, 9.133_333)], 1);
    assert_eq!(results.len(), 1);

    let hits = results[0].as_ref().unwrap();
    assert_eq!(hits.len(), 1);

    let hit = &hits[0];
    assert_eq!(hit.name, "Gomaringen");
    assert_eq!(hit.country_code, "DE");
    assert!(hit.distance > 2.5 && hit.distance < 3.7, "got {}", hit.distance);

    let AdminCode::Resolved(admin1) = &hit.admin1_code else {
        panic!("admin1 not resolved");
    };
    assert_eq!(admin1.name, "Baden-Württemberg");
    assert_eq!(admin1.geoname_id, "2953481");

    let AdminCode::Resolved(admin2) = &hit.admin2_code else {
        panic!("admin2 not resolved");
    };
    assert_eq!(admin2.name, "Regierungsbezirk Tübingen");

    assert!(hit.admin3_code.is_resolved());
    assert!(hit.admin4_code.is_resolved());

    let names = hit.alternate_name.as_ref().unwrap();
    assert!(names["de"].is_preferred_name);
    assert!(!names["en"].is_preferred_name);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn multiple_results_come_back_nearest_first() {
    let dir = seed("nearest_first");
    let geocoder = ReverseGeocoder::init(config(dir.clone())).await.unwrap();

    let results = geocoder.lookup(&[Point::new(42.083_333, 3.1)], 2);
    let hits = results[0].as_ref().unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].name, "Albons");
    assert_eq!(hits[1].name, "la Tallada d'Empordà");
    assert!(hits[0].distance < hits[1].distance);
    assert!(hits[0].distance > 2.0 && hits[0].distance < 3.5);
    assert!(hits[1].distance > 3.0 && hits[1].distance < 4.5);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn batch_results_align_with_input_order() {
    let dir = seed("batch");
    let geocoder = ReverseGeocoder::init(config(dir.clone())).await.unwrap();

    let results = geocoder.lookup(
        &[
            Point::new(48.466_667, 9.133_333),
            Point::new(42.083_333, 3.1),
        ],
        1,
    );

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap()[0].name, "Gomaringen");
    assert_eq!(results[1].as_ref().unwrap()[0].name, "Albons");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn disabled_admin1_table_leaves_raw_codes() {
    let dir = seed("no_admin1");
    let mut config = config(dir.clone());
    config.load.admin1 = false;

    let geocoder = ReverseGeocoder::init(config).await.unwrap();
    let hits = geocoder
        .lookup_point(Point::new(48.466_667, 9.133_333), 1)
        .unwrap();

    assert_eq!(
        hits[0].admin1_code,
        AdminCode::Raw(Some("01".to_string()))
    );
    // Other levels still resolve, keyed off the raw code chain
    assert!(hits[0].admin2_code.is_resolved());
    assert!(hits[0].admin4_code.is_resolved());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn ill_formed_point_yields_a_null_slot() {
    let dir = seed("bad_point");
    let geocoder = ReverseGeocoder::init(config(dir.clone())).await.unwrap();

    let results = geocoder.lookup(
        &[
            Point::new(f64::NAN, 9.0),
            Point::new(48.466_667, 9.133_333),
        ],
        1,
    );

    assert_eq!(results.len(), 2);
    assert!(results[0].is_none());
    assert!(results[1].is_some());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn lookup_one_defaults_to_a_single_result() {
    let dir = seed("lookup_one");
    let geocoder = ReverseGeocoder::init(config(dir.clone())).await.unwrap();

    let point = Point::new(48.466_667, 9.133_333);
    let one = geocoder.lookup_one(point).unwrap();
    let explicit = geocoder.lookup_point(point, 1).unwrap();

    assert_eq!(one.len(), 1);
    assert_eq!(one[0].geoname_id, explicit[0].geoname_id);
    assert!((one[0].distance - explicit[0].distance).abs() < 1e-12);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn max_results_beyond_corpus_returns_everything_sorted() {
    let dir = seed("beyond_corpus");
    let geocoder = ReverseGeocoder::init(config(dir.clone())).await.unwrap();

    let hits = geocoder
        .lookup_point(Point::new(48.45, 9.09), 100)
        .unwrap();

    assert_eq!(hits.len(), 4);
    for window in hits.windows(2) {
        assert!(window[0].distance <= window[1].distance);
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn empty_corpus_returns_empty_hit_lists() {
    let dir = std::env::temp_dir()
        .join("revgeo_engine_tests")
        .join("empty_corpus");
    let _ = std::fs::remove_dir_all(&dir);
    seed_file(&dir.join("cities"), "cities1000.txt", "");
    seed_file(&dir.join("admin1_codes"), "admin1CodesASCII.txt", "");
    seed_file(&dir.join("admin2_codes"), "admin2Codes.txt", "");
    seed_file(&dir.join("all_countries"), "allCountries.txt", "");
    seed_file(&dir.join("alternate_names"), "alternateNames.txt", "");

    let geocoder = ReverseGeocoder::init(config(dir.clone())).await.unwrap();
    assert_eq!(geocoder.num_cities(), 0);

    let results = geocoder.lookup(&[Point::new(0.0, 0.0)], 1);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_ref().unwrap().len(), 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn reinit_on_the_same_day_reuses_the_cache() {
    let dir = seed("reinit");

    // Both inits run against an unreachable host, so a cache miss on
    // either would fail loudly.
    let first = ReverseGeocoder::init(config(dir.clone())).await.unwrap();
    let second = ReverseGeocoder::init(config(dir.clone())).await.unwrap();

    assert_eq!(first.num_cities(), second.num_cities());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn results_serialize_wire_compatible_json() {
    let dir = seed("wire_json");
    let geocoder = ReverseGeocoder::init(config(dir.clone())).await.unwrap();

    let hits = geocoder
        .lookup_point(Point::new(48.466_667, 9.133_333), 1)
        .unwrap();
    let json = serde_json::to_value(&hits[0]).unwrap();

    assert_eq!(json["geoNameId"], "2922530");
    // Raw column text survives as strings
    assert_eq!(json["latitude"], "48.45366");
    // Resolved admin level is an object, not a string
    assert_eq!(json["admin1Code"]["name"], "Baden-Württemberg");
    assert!(json["distance"].is_f64());
    assert_eq!(json["alternateName"]["de"]["altName"], "Gomaringen");

    let _ = std::fs::remove_dir_all(&dir);
}
