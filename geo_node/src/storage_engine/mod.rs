use std::fs;
use std::path::PathBuf;

use geo_store::{GeoPoint, GeoStore};
use serde::{Deserialize, Serialize};

pub mod errors;
use errors::StorageEngineError;

/// One stored key per CSV row. The geohash is informative: it is recomputed
/// when the snapshot is loaded.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct SnapshotRecord {
    key: String,
    latitude: f64,
    longitude: f64,
    geohash: String,
}

/// Keeps the node's store on disk as a CSV snapshot.
pub struct StorageEngine {
    root: PathBuf,
    addr: String,
}

impl StorageEngine {
    /// Creates a new instance of `StorageEngine`.
    ///
    /// # Arguments
    /// - `root`: The directory where the snapshot lives.
    /// - `addr`: The node address, used to name the snapshot file.
    pub fn new(root: PathBuf, addr: String) -> Self {
        Self { root, addr }
    }

    /// `{root}/geo_{addr}.csv`, with `.` and `:` replaced by `_`.
    pub fn snapshot_path(&self) -> PathBuf {
        let addr_str = self.addr.replace(['.', ':'], "_");
        self.root.join(format!("geo_{}.csv", addr_str))
    }

    /// Loads the snapshot into a fresh store. A missing snapshot yields an
    /// empty store.
    pub fn load(&self) -> Result<GeoStore, StorageEngineError> {
        let mut store = GeoStore::new();
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(store);
        }

        let mut reader =
            csv::Reader::from_path(&path).map_err(|_| StorageEngineError::FileReadFailed)?;

        for (index, result) in reader.deserialize::<SnapshotRecord>().enumerate() {
            let row = index + 1;
            let record =
                result.map_err(|e| StorageEngineError::InvalidRecord(row, e.to_string()))?;
            let point = GeoPoint::new(record.latitude, record.longitude)
                .map_err(|e| StorageEngineError::InvalidRecord(row, e.to_string()))?;
            store
                .set_location(&record.key, point)
                .map_err(|e| StorageEngineError::InvalidRecord(row, e.to_string()))?;
        }

        Ok(store)
    }

    /// Writes every stored key to a temporary file and then swaps it with the
    /// snapshot, so a crash never leaves a half-written snapshot behind.
    pub fn save(&self, store: &GeoStore) -> Result<(), StorageEngineError> {
        fs::create_dir_all(&self.root).map_err(|_| StorageEngineError::DirectoryCreationFailed)?;

        let path = self.snapshot_path();
        let temp_path = path.with_extension("csv.tmp");

        let mut records: Vec<SnapshotRecord> = store
            .iter()
            .map(|(key, point)| SnapshotRecord {
                key: key.to_string(),
                latitude: point.latitude(),
                longitude: point.longitude(),
                geohash: store.geohash_of(key).unwrap_or_default().to_string(),
            })
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));

        {
            let mut writer = csv::Writer::from_path(&temp_path)
                .map_err(|_| StorageEngineError::FileWriteFailed)?;
            for record in records {
                writer
                    .serialize(record)
                    .map_err(|_| StorageEngineError::FileWriteFailed)?;
            }
            writer
                .flush()
                .map_err(|_| StorageEngineError::FileWriteFailed)?;
        }

        fs::rename(&temp_path, &path).map_err(|_| StorageEngineError::FileReplacementFailed)
    }
}
