//! Seed list of product URLs to probe
//!
//! Stored as a one-column CSV with a `URL` header.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedListError {
    #[error("seed list {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("seed list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct SeedRow {
    #[serde(rename = "URL")]
    url: String,
}

#[derive(Debug, Clone)]
pub struct SeedList {
    path: PathBuf,
}

impl SeedList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored URLs in file order; a missing file is an empty list
    pub fn load(&self) -> Result<Vec<String>, SeedListError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path).map_err(|source| SeedListError::Csv {
            path: self.path.clone(),
            source,
        })?;

        let mut urls = Vec::new();
        for row in reader.deserialize::<SeedRow>() {
            let row = row.map_err(|source| SeedListError::Csv {
                path: self.path.clone(),
                source,
            })?;
            let url = row.url.trim();
            if !url.is_empty() && !urls.iter().any(|u| u == url) {
                urls.push(url.to_string());
            }
        }
        Ok(urls)
    }

    /// Replace the stored list
    pub fn save(&self, urls: &[String]) -> Result<(), SeedListError> {
        let io_error = |source| SeedListError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(io_error)?;

        let tmp = NamedTempFile::new_in(&dir).map_err(io_error)?;
        let mut writer = csv::Writer::from_writer(tmp);
        writer.write_record(["URL"]).map_err(|source| SeedListError::Csv {
            path: self.path.clone(),
            source,
        })?;
        for url in urls {
            writer.write_record([url]).map_err(|source| SeedListError::Csv {
                path: self.path.clone(),
                source,
            })?;
        }

        let tmp = writer.into_inner().map_err(|e| io_error(e.into_error()))?;
        tmp.persist(&self.path).map_err(|e| io_error(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_seed_list_is_empty() {
        let dir = TempDir::new().unwrap();
        let seeds = SeedList::new(dir.path().join("product_urls.csv"));
        assert!(seeds.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_keeps_order() {
        let dir = TempDir::new().unwrap();
        let seeds = SeedList::new(dir.path().join("nested").join("product_urls.csv"));
        let urls = vec![
            "https://www.takealot.com/b/PLID2".to_string(),
            "https://www.takealot.com/a/PLID1".to_string(),
        ];
        seeds.save(&urls).unwrap();

        assert_eq!(seeds.load().unwrap(), urls);
        let text = fs::read_to_string(seeds.path()).unwrap();
        assert!(text.starts_with("URL\n"));
    }

    #[test]
    fn test_load_skips_blank_and_duplicate_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("product_urls.csv");
        fs::write(&path, "URL\nhttps://x/1\n\"\"\nhttps://x/1\nhttps://x/2\n").unwrap();

        assert_eq!(SeedList::new(path).load().unwrap(), vec!["https://x/1", "https://x/2"]);
    }
}
