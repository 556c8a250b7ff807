//! Torrent storage daemon capability (tonutils-storage)

pub mod client;
pub mod error;

pub use client::TonutilsStorageClient;
pub use error::DaemonError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One file inside a bag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagFile {
    pub index: u32,
    pub name: String,
    pub size: u64,
}

/// Download progress of a bag as reported by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagDetails {
    pub bag_id: String,
    #[serde(default)]
    pub header_loaded: bool,
    #[serde(default)]
    pub downloaded: u64,
    #[serde(default)]
    pub size: u64,
    /// Directory the bag is stored under
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub dir_name: String,
    #[serde(default)]
    pub files: Vec<BagFile>,
}

impl BagDetails {
    /// Every byte of the bag has been fetched
    pub fn is_fully_downloaded(&self) -> bool {
        self.size > 0 && self.downloaded == self.size
    }

    pub fn file_indexes(&self) -> Vec<u32> {
        self.files.iter().map(|file| file.index).collect()
    }

    /// Local path of a listed file
    pub fn file_path(&self, file: &BagFile) -> PathBuf {
        Path::new(&self.path).join(&self.dir_name).join(&file.name)
    }
}

/// Download request for a bag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddBagRequest {
    pub bag_id: String,
    pub path: String,
    pub files: Vec<u32>,
    pub download_all: bool,
}

impl AddBagRequest {
    /// Fetch only the header
    pub fn header(bag_id: &str, path: &str) -> Self {
        Self {
            bag_id: bag_id.to_string(),
            path: path.to_string(),
            files: Vec::new(),
            download_all: false,
        }
    }

    /// Fetch the listed files
    pub fn files(bag_id: &str, path: &str, files: Vec<u32>) -> Self {
        Self {
            bag_id: bag_id.to_string(),
            path: path.to_string(),
            files,
            download_all: true,
        }
    }
}

/// Trait for the daemon that downloads and seeds bags
#[async_trait]
pub trait StorageDaemon: Send + Sync + std::fmt::Debug {
    /// Details of a bag; `None` when the daemon does not know it yet
    async fn bag_details(&self, bag_id: &str) -> Result<Option<BagDetails>, DaemonError>;

    /// Ask the daemon to start or extend a download
    async fn add_bag(&self, request: &AddBagRequest) -> Result<(), DaemonError>;
}
