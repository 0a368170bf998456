//! GeoNames dump cache.
//!
//! Produces, for each dataset, a readable local file whose contents match
//! the upstream dump of the current UTC day. Files are cached on disk
//! under a `<baseName>_<YYYY-MM-DD>.txt` name and refreshed when the date
//! rolls over; a bare `<baseName>.txt` acts as a stable cache for
//! pre-warmed images and is never refreshed.

use std::path::{Path, PathBuf};

use chrono::Utc;
use futures::StreamExt as _;
use tokio::io::AsyncWriteExt as _;

/// Fetches and caches GeoNames dump files under a base URL.
pub struct DumpCache {
    base_url: String,
    client: reqwest::Client,
}

impl DumpCache {
    /// Creates a cache that fetches from `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self, DumpError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("revgeo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DumpError::Http)?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Returns a local path for `base_name`, downloading it if this UTC
    /// day's copy is not cached yet.
    ///
    /// `archive_name` is the remote file name, either `<base>.txt`
    /// (streamed directly) or `<base>.zip`; for a zip, `inner_name` names
    /// the single entry to extract. After a successful download every
    /// other file in `folder` is removed, so only the current day's copy
    /// is retained.
    ///
    /// # Errors
    ///
    /// Returns an error for non-200 responses, transport failures, an
    /// unexpected archive layout, or filesystem failures. No retry is
    /// attempted.
    pub async fn ensure(
        &self,
        folder: &Path,
        base_name: &str,
        archive_name: &str,
        inner_name: Option<&str>,
    ) -> Result<PathBuf, DumpError> {
        let today = Utc::now().format("%Y-%m-%d");
        let dated_name = format!("{base_name}_{today}.txt");
        let dated = folder.join(&dated_name);

        if dated.exists() {
            log::debug!("Dump cache hit: {}", dated.display());
            return Ok(dated);
        }

        let stable = folder.join(format!("{base_name}.txt"));
        if stable.exists() {
            log::debug!("Stable dump cache hit: {}", stable.display());
            return Ok(stable);
        }

        tokio::fs::create_dir_all(folder)
            .await
            .map_err(|e| DumpError::Io {
                path: folder.display().to_string(),
                source: e,
            })?;

        let url = format!("{}/{archive_name}", self.base_url);
        let download = folder.join(format!("{base_name}.download"));
        self.download_file(&url, &download).await?;

        if let Some(inner_name) = inner_name {
            let zip_path = download.clone();
            let inner = inner_name.to_string();
            let dest = dated.clone();
            tokio::task::spawn_blocking(move || extract_zip_entry(&zip_path, &inner, &dest))
                .await??;

            let _ = tokio::fs::remove_file(&download).await;
        } else {
            tokio::fs::rename(&download, &dated)
                .await
                .map_err(|e| DumpError::Io {
                    path: dated.display().to_string(),
                    source: e,
                })?;
        }

        sweep_stale_files(folder, &dated_name).await?;

        Ok(dated)
    }

    /// Streams a URL to a local path with progress logging.
    async fn download_file(&self, url: &str, dest: &Path) -> Result<u64, DumpError> {
        log::info!("Downloading {url}");
        log::info!("  -> {}", dest.display());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(DumpError::Http)?;

        if !response.status().is_success() {
            return Err(DumpError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let total_size = response.content_length();
        if let Some(size) = total_size {
            #[allow(clippy::cast_precision_loss)]
            let mb = size as f64 / 1_048_576.0;
            log::info!("  file size: {mb:.1} MB");
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| DumpError::Io {
                path: dest.display().to_string(),
                source: e,
            })?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_log_mb: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(DumpError::Http)?;
            file.write_all(&chunk).await.map_err(|e| DumpError::Io {
                path: dest.display().to_string(),
                source: e,
            })?;
            downloaded += chunk.len() as u64;

            // Log progress every 100 MB
            let current_mb = downloaded / (100 * 1_048_576);
            if current_mb > last_log_mb {
                last_log_mb = current_mb;
                #[allow(clippy::cast_precision_loss)]
                let mb = downloaded as f64 / 1_048_576.0;
                if let Some(total) = total_size {
                    #[allow(clippy::cast_precision_loss)]
                    let pct = (downloaded as f64 / total as f64) * 100.0;
                    log::info!("  downloaded {mb:.0} MB ({pct:.0}%)");
                } else {
                    log::info!("  downloaded {mb:.0} MB");
                }
            }
        }

        file.flush().await.map_err(|e| DumpError::Io {
            path: dest.display().to_string(),
            source: e,
        })?;

        #[allow(clippy::cast_precision_loss)]
        let mb = downloaded as f64 / 1_048_576.0;
        log::info!("  download complete: {mb:.1} MB");

        Ok(downloaded)
    }
}

/// Extracts the single archive entry named `inner_name` to `dest`.
///
/// The output is written to a temp file first and renamed into place so
/// an interrupted extraction never leaves a readable partial dump.
fn extract_zip_entry(zip_path: &Path, inner_name: &str, dest: &Path) -> Result<(), DumpError> {
    let file = std::fs::File::open(zip_path).map_err(|e| DumpError::Io {
        path: zip_path.display().to_string(),
        source: e,
    })?;

    let mut archive = zip::ZipArchive::new(file).map_err(|e| DumpError::Io {
        path: zip_path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;

    let matching = archive
        .file_names()
        .filter(|name| *name == inner_name)
        .count();
    if matching != 1 {
        return Err(DumpError::ArchiveUnexpected {
            expected: inner_name.to_string(),
            found: matching,
        });
    }

    let mut entry = archive.by_name(inner_name).map_err(|e| DumpError::Io {
        path: zip_path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;

    let tmp_path = dest.with_extension("txt.tmp");
    let mut out = std::fs::File::create(&tmp_path).map_err(|e| DumpError::Io {
        path: tmp_path.display().to_string(),
        source: e,
    })?;

    std::io::copy(&mut entry, &mut out).map_err(|e| DumpError::Io {
        path: dest.display().to_string(),
        source: e,
    })?;

    std::fs::rename(&tmp_path, dest).map_err(|e| DumpError::Io {
        path: dest.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Removes every file in `folder` other than `keep`.
///
/// Runs after a successful download so superseded daily dumps do not
/// accumulate.
async fn sweep_stale_files(folder: &Path, keep: &str) -> Result<(), DumpError> {
    let mut entries = tokio::fs::read_dir(folder)
        .await
        .map_err(|e| DumpError::Io {
            path: folder.display().to_string(),
            source: e,
        })?;

    while let Some(entry) = entries.next_entry().await.map_err(|e| DumpError::Io {
        path: folder.display().to_string(),
        source: e,
    })? {
        let path = entry.path();
        if path.is_file() && entry.file_name() != keep {
            log::debug!("Removing stale dump file {}", path.display());
            let _ = tokio::fs::remove_file(&path).await;
        }
    }

    Ok(())
}

/// Errors from dump cache operations.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The archive did not contain exactly the expected entry.
    #[error("expected {expected}, found {found} file(s)")]
    ArchiveUnexpected {
        /// Entry name that was expected.
        expected: String,
        /// Number of matching entries actually present.
        found: usize,
    },

    /// I/O error reading or writing the cache.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Async task join error.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("revgeo_dump_tests").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// A base URL nothing listens on; cache hits must not touch it.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    #[tokio::test]
    async fn daily_cache_hit_skips_the_network() {
        let dir = test_dir("daily_hit");
        let today = Utc::now().format("%Y-%m-%d");
        let dated = dir.join(format!("cities1000_{today}.txt"));
        std::fs::write(&dated, "cached").unwrap();

        let cache = DumpCache::new(UNREACHABLE).unwrap();
        let path = cache
            .ensure(&dir, "cities1000", "cities1000.zip", Some("cities1000.txt"))
            .await
            .unwrap();

        assert_eq!(path, dated);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "cached");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn stable_cache_hit_skips_the_network() {
        let dir = test_dir("stable_hit");
        let stable = dir.join("admin1CodesASCII.txt");
        std::fs::write(&stable, "stable").unwrap();

        let cache = DumpCache::new(UNREACHABLE).unwrap();
        let path = cache
            .ensure(&dir, "admin1CodesASCII", "admin1CodesASCII.txt", None)
            .await
            .unwrap();

        assert_eq!(path, stable);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_file_fails_with_http_error() {
        let dir = test_dir("download_fails");

        let cache = DumpCache::new(UNREACHABLE).unwrap();
        let result = cache
            .ensure(&dir, "cities1000", "cities1000.zip", Some("cities1000.txt"))
            .await;

        assert!(matches!(result, Err(DumpError::Http(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    fn write_test_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_the_single_matching_entry() {
        let dir = test_dir("zip_extract");
        let zip_path = dir.join("cities1000.zip");
        write_test_zip(
            &zip_path,
            &[
                ("readme.txt", b"ignore me"),
                ("cities1000.txt", b"1\tCity\tCity\t\t1.0\t2.0\n"),
            ],
        );

        let dest = dir.join("cities1000_2026-08-02.txt");
        extract_zip_entry(&zip_path, "cities1000.txt", &dest).unwrap();
        assert_eq!(
            std::fs::read(&dest).unwrap(),
            b"1\tCity\tCity\t\t1.0\t2.0\n"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_entry_reports_expected_and_found() {
        let dir = test_dir("zip_missing");
        let zip_path = dir.join("allCountries.zip");
        write_test_zip(&zip_path, &[("other.txt", b"x")]);

        let dest = dir.join("allCountries_2026-08-02.txt");
        let err = extract_zip_entry(&zip_path, "allCountries.txt", &dest).unwrap_err();
        assert!(matches!(
            err,
            DumpError::ArchiveUnexpected { found: 0, .. }
        ));
        assert_eq!(
            err.to_string(),
            "expected allCountries.txt, found 0 file(s)"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn sweep_keeps_only_the_current_file() {
        let dir = test_dir("sweep");
        std::fs::write(dir.join("cities1000_2026-01-01.txt"), "old").unwrap();
        std::fs::write(dir.join("cities1000.download"), "tmp").unwrap();
        std::fs::write(dir.join("cities1000_2026-08-02.txt"), "new").unwrap();

        sweep_stale_files(&dir, "cities1000_2026-08-02.txt")
            .await
            .unwrap();

        let remaining: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(remaining, vec!["cities1000_2026-08-02.txt".to_string()]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
