// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk format for the vector index and identifier map.
//!
//! Vector index file layout (little-endian):
//!
//! ```text
//! magic     [u8; 4]   "SGVI"
//! version   u32
//! dimension u32
//! count     u64
//! payload   count * dimension * f32
//! checksum  [u8; 32]  blake3 of everything above
//! ```
//!
//! The identifier map is JSON. It records the blake3 hash of the index file it
//! was written with, so a map can never be paired with a foreign index, and the
//! embedding model and dimension the vectors came from.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use super::{FlatIndex, IdentifierMap};
use crate::errors::ArtifactError;

const INDEX_MAGIC: &[u8; 4] = b"SGVI";
const INDEX_VERSION: u32 = 1;
const ID_MAP_VERSION: u32 = 2;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;
const CHECKSUM_LEN: usize = 32;

/// Locations of the two persisted artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub index: PathBuf,
    pub id_map: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: impl AsRef<Path>, index_file: &str, id_map_file: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            index: dir.join(index_file),
            id_map: dir.join(id_map_file),
        }
    }

    pub fn exist(&self) -> bool {
        self.index.is_file() && self.id_map.is_file()
    }
}

/// Header fields of a vector index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub version: u32,
    pub dimension: usize,
    pub count: u64,
}

/// Both artifacts after cross-checking, plus the model that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub index: FlatIndex,
    pub ids: IdentifierMap,
    pub model_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct IdMapFile {
    version: u32,
    count: usize,
    model_id: String,
    dimension: usize,
    index_checksum: String,
    ids: Vec<String>,
}

/// Persist both artifacts, recording `model_id` as the model that embedded
/// the vectors.
///
/// Both files are staged next to their targets and only renamed into place
/// once both are fully written. A previous index is kept aside until the
/// identifier map is in place, so a failed save leaves the old pair intact.
pub fn save_artifacts(
    paths: &ArtifactPaths,
    index: &FlatIndex,
    ids: &IdentifierMap,
    model_id: &str,
) -> Result<(), ArtifactError> {
    if ids.len() != index.len() {
        return Err(ArtifactError::LengthMismatch {
            ids: ids.len(),
            vectors: index.len(),
        });
    }

    let index_bytes = encode_index(index);
    let id_map = IdMapFile {
        version: ID_MAP_VERSION,
        count: ids.len(),
        model_id: model_id.to_string(),
        dimension: index.dimension(),
        index_checksum: blake3::hash(&index_bytes).to_hex().to_string(),
        ids: ids.ids().to_vec(),
    };
    let id_map_bytes = serde_json::to_vec(&id_map).map_err(|source| ArtifactError::Json {
        path: paths.id_map.clone(),
        source,
    })?;

    let index_tmp = staging_path(&paths.index);
    let id_map_tmp = staging_path(&paths.id_map);

    let staged = write_file(&index_tmp, &index_bytes)
        .and_then(|_| write_file(&id_map_tmp, &id_map_bytes));
    if let Err(err) = staged {
        let _ = fs::remove_file(&index_tmp);
        let _ = fs::remove_file(&id_map_tmp);
        return Err(err);
    }

    let backup = backup_path(&paths.index);
    let had_previous = paths.index.is_file();
    if had_previous {
        if let Err(source) = fs::rename(&paths.index, &backup) {
            let _ = fs::remove_file(&index_tmp);
            let _ = fs::remove_file(&id_map_tmp);
            return Err(ArtifactError::Io {
                path: paths.index.clone(),
                source,
            });
        }
    }

    let swapped = fs::rename(&index_tmp, &paths.index)
        .map_err(|source| ArtifactError::Io {
            path: paths.index.clone(),
            source,
        })
        .and_then(|_| {
            fs::rename(&id_map_tmp, &paths.id_map).map_err(|source| ArtifactError::Io {
                path: paths.id_map.clone(),
                source,
            })
        });

    if let Err(err) = swapped {
        let _ = fs::remove_file(&index_tmp);
        let _ = fs::remove_file(&id_map_tmp);
        if had_previous {
            if let Err(restore) = fs::rename(&backup, &paths.index) {
                tracing::error!(
                    "failed to restore previous index from {}: {}",
                    backup.display(),
                    restore
                );
            }
        } else {
            let _ = fs::remove_file(&paths.index);
        }
        return Err(err);
    }

    if had_previous {
        let _ = fs::remove_file(&backup);
    }
    Ok(())
}

/// Load and cross-check both artifacts.
pub fn load_artifacts(paths: &ArtifactPaths) -> Result<Artifacts, ArtifactError> {
    let index_bytes = read_file(&paths.index)?;
    let index = decode_index(&paths.index, &index_bytes)?;

    let id_map_bytes = read_file(&paths.id_map)?;
    let id_map: IdMapFile =
        serde_json::from_slice(&id_map_bytes).map_err(|source| ArtifactError::Json {
            path: paths.id_map.clone(),
            source,
        })?;
    if id_map.version != ID_MAP_VERSION {
        return Err(ArtifactError::UnsupportedVersion {
            path: paths.id_map.clone(),
            version: id_map.version,
        });
    }
    if id_map.count != id_map.ids.len() {
        return Err(ArtifactError::Truncated {
            path: paths.id_map.clone(),
            expected: id_map.count as u64,
            actual: id_map.ids.len() as u64,
        });
    }
    if id_map.ids.len() != index.len() {
        return Err(ArtifactError::LengthMismatch {
            ids: id_map.ids.len(),
            vectors: index.len(),
        });
    }
    if id_map.index_checksum != blake3::hash(&index_bytes).to_hex().as_str() {
        return Err(ArtifactError::IndexChecksumMismatch);
    }
    if id_map.dimension != index.dimension() {
        return Err(ArtifactError::DimensionMismatch {
            id_map: id_map.dimension,
            index: index.dimension(),
        });
    }

    Ok(Artifacts {
        index,
        ids: IdentifierMap::from(id_map.ids),
        model_id: id_map.model_id,
    })
}

/// Read only the header of a vector index file.
pub fn read_index_header(path: &Path) -> Result<IndexHeader, ArtifactError> {
    let mut header = [0u8; HEADER_LEN];
    let mut file = File::open(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let actual = file.metadata().map(|m| m.len()).unwrap_or(0);
    file.read_exact(&mut header)
        .map_err(|_| ArtifactError::Truncated {
            path: path.to_path_buf(),
            expected: HEADER_LEN as u64,
            actual,
        })?;
    parse_header(path, &header)
}

fn encode_index(index: &FlatIndex) -> Vec<u8> {
    let raw = index.raw();
    let mut bytes = Vec::with_capacity(HEADER_LEN + raw.len() * 4 + CHECKSUM_LEN);
    bytes.extend_from_slice(INDEX_MAGIC);
    bytes.extend_from_slice(&INDEX_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(index.dimension() as u32).to_le_bytes());
    bytes.extend_from_slice(&(index.len() as u64).to_le_bytes());
    for value in raw {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    let checksum = blake3::hash(&bytes);
    bytes.extend_from_slice(checksum.as_bytes());
    bytes
}

fn decode_index(path: &Path, bytes: &[u8]) -> Result<FlatIndex, ArtifactError> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(ArtifactError::Truncated {
            path: path.to_path_buf(),
            expected: (HEADER_LEN + CHECKSUM_LEN) as u64,
            actual: bytes.len() as u64,
        });
    }
    let header = parse_header(path, &bytes[..HEADER_LEN])?;

    let payload_len = header
        .count
        .checked_mul(header.dimension as u64)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| ArtifactError::Truncated {
            path: path.to_path_buf(),
            expected: u64::MAX,
            actual: bytes.len() as u64,
        })?;
    let expected = HEADER_LEN as u64 + payload_len + CHECKSUM_LEN as u64;
    if bytes.len() as u64 != expected {
        return Err(ArtifactError::Truncated {
            path: path.to_path_buf(),
            expected,
            actual: bytes.len() as u64,
        });
    }

    let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if blake3::hash(body).as_bytes() != checksum {
        return Err(ArtifactError::ChecksumMismatch {
            path: path.to_path_buf(),
        });
    }

    let data = body[HEADER_LEN..]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(FlatIndex::from_raw(header.dimension, data)?)
}

fn parse_header(path: &Path, header: &[u8]) -> Result<IndexHeader, ArtifactError> {
    if &header[0..4] != INDEX_MAGIC {
        return Err(ArtifactError::BadMagic {
            path: path.to_path_buf(),
        });
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != INDEX_VERSION {
        return Err(ArtifactError::UnsupportedVersion {
            path: path.to_path_buf(),
            version,
        });
    }
    let dimension = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
    let mut count = [0u8; 8];
    count.copy_from_slice(&header[12..20]);

    Ok(IndexHeader {
        version,
        dimension,
        count: u64::from_le_bytes(count),
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    fs::write(path, bytes).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MODEL: &str = "test-model";

    fn sample() -> (FlatIndex, IdentifierMap) {
        let mut index = FlatIndex::new(3).unwrap();
        index
            .add(&[
                vec![0.1, 0.2, 0.3],
                vec![-1.5, 0.0, 2.25],
                vec![7.0, 8.0, 9.0],
            ])
            .unwrap();
        let ids = IdentifierMap::from(vec!["11".to_string(), "22".to_string(), "33".to_string()]);
        (index, ids)
    }

    fn paths(dir: &Path) -> ArtifactPaths {
        ArtifactPaths::in_dir(dir, "vector_index.bin", "id_map.json")
    }

    #[test]
    fn save_then_load_is_equivalent() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());
        let (index, ids) = sample();

        save_artifacts(&paths, &index, &ids, MODEL).unwrap();
        assert!(paths.exist());
        assert!(!staging_path(&paths.index).exists());
        assert!(!staging_path(&paths.id_map).exists());

        let loaded = load_artifacts(&paths).unwrap();
        assert_eq!(loaded.index, index);
        assert_eq!(loaded.ids, ids);
        assert_eq!(loaded.model_id, MODEL);
        let loaded_index = loaded.index;

        let query = [-1.5, 0.0, 2.0];
        assert_eq!(
            loaded_index.search(&query, 3).unwrap(),
            index.search(&query, 3).unwrap()
        );
    }

    #[test]
    fn header_reports_shape() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());
        let (index, ids) = sample();
        save_artifacts(&paths, &index, &ids, MODEL).unwrap();

        let header = read_index_header(&paths.index).unwrap();
        assert_eq!(header.dimension, 3);
        assert_eq!(header.count, 3);
        assert_eq!(header.version, INDEX_VERSION);
    }

    #[test]
    fn save_refuses_mismatched_lengths() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());
        let (index, _) = sample();
        let ids = IdentifierMap::from(vec!["only-one".to_string()]);

        let err = save_artifacts(&paths, &index, &ids, MODEL).unwrap_err();
        assert!(matches!(err, ArtifactError::LengthMismatch { ids: 1, vectors: 3 }));
        assert!(!paths.index.exists());
        assert!(!paths.id_map.exists());
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());
        let (index, ids) = sample();
        save_artifacts(&paths, &index, &ids, MODEL).unwrap();

        let mut bytes = fs::read(&paths.index).unwrap();
        bytes[HEADER_LEN + 1] ^= 0xFF;
        fs::write(&paths.index, bytes).unwrap();

        assert!(matches!(
            load_artifacts(&paths),
            Err(ArtifactError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn truncated_index_is_rejected() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());
        let (index, ids) = sample();
        save_artifacts(&paths, &index, &ids, MODEL).unwrap();

        let bytes = fs::read(&paths.index).unwrap();
        fs::write(&paths.index, &bytes[..bytes.len() - 5]).unwrap();

        assert!(matches!(
            load_artifacts(&paths),
            Err(ArtifactError::Truncated { .. })
        ));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());
        fs::write(&paths.index, vec![0u8; 64]).unwrap();

        assert!(matches!(
            read_index_header(&paths.index),
            Err(ArtifactError::BadMagic { .. })
        ));
    }

    #[test]
    fn id_map_length_mismatch_is_fatal() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());
        let (index, ids) = sample();
        save_artifacts(&paths, &index, &ids, MODEL).unwrap();

        let mut id_map: serde_json::Value =
            serde_json::from_slice(&fs::read(&paths.id_map).unwrap()).unwrap();
        id_map["ids"].as_array_mut().unwrap().pop();
        id_map["count"] = serde_json::json!(2);
        fs::write(&paths.id_map, serde_json::to_vec(&id_map).unwrap()).unwrap();

        assert!(matches!(
            load_artifacts(&paths),
            Err(ArtifactError::LengthMismatch { ids: 2, vectors: 3 })
        ));
    }

    #[test]
    fn id_map_from_other_build_is_rejected() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());
        let (index, ids) = sample();
        save_artifacts(&paths, &index, &ids, MODEL).unwrap();
        let stale_map = fs::read(&paths.id_map).unwrap();

        let mut other = FlatIndex::new(3).unwrap();
        other
            .add(&[vec![1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0], vec![3.0, 3.0, 3.0]])
            .unwrap();
        save_artifacts(&paths, &other, &ids, MODEL).unwrap();
        fs::write(&paths.id_map, stale_map).unwrap();

        assert!(matches!(
            load_artifacts(&paths),
            Err(ArtifactError::IndexChecksumMismatch)
        ));
    }

    #[test]
    fn missing_files_report_path() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());
        match load_artifacts(&paths) {
            Err(ArtifactError::Io { path, .. }) => assert_eq!(path, paths.index),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn id_map_dimension_must_match_index() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());
        let (index, ids) = sample();
        save_artifacts(&paths, &index, &ids, MODEL).unwrap();

        let mut id_map: serde_json::Value =
            serde_json::from_slice(&fs::read(&paths.id_map).unwrap()).unwrap();
        assert_eq!(id_map["model_id"], MODEL);
        assert_eq!(id_map["dimension"], 3);
        id_map["dimension"] = serde_json::json!(4);
        fs::write(&paths.id_map, serde_json::to_vec(&id_map).unwrap()).unwrap();

        assert!(matches!(
            load_artifacts(&paths),
            Err(ArtifactError::DimensionMismatch { id_map: 4, index: 3 })
        ));
    }

    #[test]
    fn failed_id_map_swap_keeps_previous_index() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());
        let (index, ids) = sample();
        save_artifacts(&paths, &index, &ids, MODEL).unwrap();
        let previous_index = fs::read(&paths.index).unwrap();

        // A non-empty directory in place of the identifier map makes its rename fail.
        fs::remove_file(&paths.id_map).unwrap();
        fs::create_dir(&paths.id_map).unwrap();
        fs::write(paths.id_map.join("keep"), b"x").unwrap();

        let mut other = FlatIndex::new(3).unwrap();
        other
            .add(&[vec![1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0], vec![3.0, 3.0, 3.0]])
            .unwrap();
        assert!(matches!(
            save_artifacts(&paths, &other, &ids, MODEL),
            Err(ArtifactError::Io { .. })
        ));

        assert_eq!(fs::read(&paths.index).unwrap(), previous_index);
        assert!(!staging_path(&paths.index).exists());
        assert!(!staging_path(&paths.id_map).exists());
        assert!(!backup_path(&paths.index).exists());
    }

    #[test]
    fn first_save_failure_leaves_no_index() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());
        let (index, ids) = sample();
        fs::create_dir(&paths.id_map).unwrap();
        fs::write(paths.id_map.join("keep"), b"x").unwrap();

        assert!(save_artifacts(&paths, &index, &ids, MODEL).is_err());
        assert!(!paths.index.exists());
        assert!(!staging_path(&paths.index).exists());
    }
}
