//! JSON-backed device registry.

use std::collections::HashSet;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use twocold_types::{DeviceEdit, DeviceRecord, Floor};

use crate::defaults::default_records;
use crate::error::{Error, Result};

/// Device metadata backed by a JSON file.
///
/// The file is read once, on first use, and kept in memory for the lifetime
/// of the registry. If it does not exist yet it is created from the seed set.
/// Every edit rewrites the whole file through a temporary file in the same
/// directory, so readers of the file never see a partial set.
#[derive(Debug)]
pub struct DeviceRegistry {
    path: PathBuf,
    records: Option<Vec<DeviceRecord>>,
}

impl DeviceRegistry {
    /// Use the registry file at `path`. Nothing is read until first use.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            records: None,
        }
    }

    /// Use the default registry location.
    pub fn open_default() -> Self {
        Self::open(crate::default_store_path())
    }

    /// Location of the registry file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file has been read into memory.
    pub fn is_loaded(&self) -> bool {
        self.records.is_some()
    }

    /// All records, loading or seeding the file on first call.
    pub fn load(&mut self) -> Result<&[DeviceRecord]> {
        Ok(self.loaded()?.as_slice())
    }

    /// Records on `floor`, in file order.
    pub fn list(&mut self, floor: Floor) -> Result<Vec<DeviceRecord>> {
        Ok(self
            .loaded()?
            .iter()
            .filter(|r| r.floor == floor)
            .cloned()
            .collect())
    }

    /// The record addressed by `(floor, id)`.
    pub fn get(&mut self, floor: Floor, id: u32) -> Result<DeviceRecord> {
        self.loaded()?
            .iter()
            .find(|r| r.matches(floor, id))
            .cloned()
            .ok_or(Error::DeviceNotFound { floor, id })
    }

    /// Replace the name and place of a record and persist the whole set.
    ///
    /// The in-memory set changes only once the new file is in place. On
    /// failure both the file and the cached set are left as they were.
    pub fn edit(&mut self, floor: Floor, id: u32, edit: &DeviceEdit) -> Result<DeviceRecord> {
        edit.validate()?;
        let path = self.path.clone();
        let records = self.loaded()?;

        let index = records
            .iter()
            .position(|r| r.matches(floor, id))
            .ok_or(Error::DeviceNotFound { floor, id })?;

        let mut updated = records.clone();
        updated[index] = updated[index].with_edit(edit);
        write_records(&path, &updated)?;

        info!(
            "Device {} on floor {} is now '{}' in '{}'",
            id, floor, edit.name, edit.place
        );
        let record = updated[index].clone();
        *records = updated;
        Ok(record)
    }

    fn loaded(&mut self) -> Result<&mut Vec<DeviceRecord>> {
        if self.records.is_none() {
            let records = read_or_seed(&self.path)?;
            self.records = Some(records);
        }
        Ok(self.records.get_or_insert_with(Vec::new))
    }
}

fn read_or_seed(path: &Path) -> Result<Vec<DeviceRecord>> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let records: Vec<DeviceRecord> = serde_json::from_slice(&bytes)?;
            check_unique(&records)?;
            debug!("Loaded {} devices from {}", records.len(), path.display());
            Ok(records)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let records = default_records();
            info!(
                "Creating device registry at {} with {} devices",
                path.display(),
                records.len()
            );
            write_records(path, &records)?;
            Ok(records)
        }
        Err(e) => Err(Error::Io(e)),
    }
}

fn check_unique(records: &[DeviceRecord]) -> Result<()> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert((record.floor, record.id)) {
            return Err(Error::DuplicateDevice {
                floor: record.floor,
                id: record.id,
            });
        }
    }
    Ok(())
}

/// Write `records` to `path` via a synced temporary file and a rename.
fn write_records(path: &Path, records: &[DeviceRecord]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.exists() {
        std::fs::create_dir_all(&parent).map_err(|e| Error::CreateDirectory {
            path: parent.clone(),
            source: e,
        })?;
    }

    let mut file = NamedTempFile::new_in(&parent)?;
    serde_json::to_writer_pretty(&mut file, records)?;
    file.write_all(b"\n")?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> (TempDir, DeviceRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = DeviceRegistry::open(dir.path().join("devices.json"));
        (dir, registry)
    }

    fn write_json(path: &Path, json: &str) {
        std::fs::write(path, json).unwrap();
    }

    #[test]
    fn test_open_is_lazy() {
        let (dir, registry) = registry();
        assert!(!registry.is_loaded());
        assert!(!dir.path().join("devices.json").exists());
    }

    #[test]
    fn test_first_load_seeds_and_persists() {
        let (_dir, mut registry) = registry();

        assert_eq!(registry.load().unwrap().len(), 18);
        assert!(registry.is_loaded());
        assert!(registry.path().exists());

        let mut reopened = DeviceRegistry::open(registry.path());
        assert_eq!(reopened.list(Floor::Eighth).unwrap().len(), 14);
        assert_eq!(reopened.list(Floor::Fifth).unwrap().len(), 4);
    }

    #[test]
    fn test_persisted_format() {
        let (_dir, mut registry) = registry();
        registry.load().unwrap();

        let json = std::fs::read_to_string(registry.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let first = &value[0];
        assert_eq!(first["id"], 2);
        assert_eq!(first["floor"], 8);
        assert_eq!(first["commandIndex"], 0);
        assert_eq!(first["place"], "D&R");
        // Pretty-printed
        assert!(json.contains("\n  "));
    }

    #[test]
    fn test_list_keeps_file_order() {
        let (_dir, mut registry) = registry();
        let ids: Vec<u32> = registry
            .list(Floor::Fifth)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![10, 11, 12, 14]);
    }

    #[test]
    fn test_edit_persists_across_instances() {
        let (_dir, mut registry) = registry();
        let edit = DeviceEdit::new("X", "Y");

        let record = registry.edit(Floor::Eighth, 5, &edit).unwrap();
        assert_eq!(record.name, "X");
        assert_eq!(record.place, "Y");
        assert_eq!(record.command_index, 18);

        let mut reopened = DeviceRegistry::open(registry.path());
        let loaded = reopened.get(Floor::Eighth, 5).unwrap();
        assert_eq!(loaded, record);
        // Other records are untouched
        assert_eq!(reopened.get(Floor::Eighth, 4).unwrap().name, "Светлана");
    }

    #[test]
    fn test_edit_not_found_leaves_file_unchanged() {
        let (_dir, mut registry) = registry();
        registry.load().unwrap();
        let before = std::fs::read(registry.path()).unwrap();

        let err = registry
            .edit(Floor::Fifth, 99, &DeviceEdit::new("X", "Y"))
            .unwrap_err();

        assert!(matches!(
            err,
            Error::DeviceNotFound {
                floor: Floor::Fifth,
                id: 99
            }
        ));
        assert_eq!(std::fs::read(registry.path()).unwrap(), before);
    }

    #[test]
    fn test_edit_rejects_invalid_labels() {
        let (_dir, mut registry) = registry();
        registry.load().unwrap();
        let before = std::fs::read(registry.path()).unwrap();

        let err = registry
            .edit(Floor::Eighth, 5, &DeviceEdit::new("", "HR"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEdit(_)));
        assert_eq!(err.to_string(), "Name cannot be empty");
        assert_eq!(std::fs::read(registry.path()).unwrap(), before);
    }

    #[test]
    fn test_same_id_on_both_floors() {
        let (_dir, mut registry) = registry();
        registry
            .edit(Floor::Fifth, 10, &DeviceEdit::new("Yura", "Unix"))
            .unwrap();
        assert_eq!(registry.get(Floor::Eighth, 10).unwrap().name, "Даша");
        assert_eq!(registry.get(Floor::Fifth, 10).unwrap().name, "Yura");
    }

    #[test]
    fn test_existing_file_is_not_reseeded() {
        let (dir, _) = registry();
        let path = dir.path().join("devices.json");
        write_json(
            &path,
            r#"[{"id": 1, "floor": 5, "place": "Lab", "name": "Only", "commandIndex": 3}]"#,
        );

        let mut registry = DeviceRegistry::open(&path);
        assert_eq!(registry.load().unwrap().len(), 1);
        assert!(registry.list(Floor::Eighth).unwrap().is_empty());
    }

    #[test]
    fn test_cache_is_not_reread() {
        let (_dir, mut registry) = registry();
        registry.load().unwrap();
        write_json(registry.path(), "[]");

        assert_eq!(registry.list(Floor::Eighth).unwrap().len(), 14);
    }

    #[test]
    fn test_duplicate_devices_rejected() {
        let (dir, _) = registry();
        let path = dir.path().join("devices.json");
        write_json(
            &path,
            r#"[
                {"id": 1, "floor": 5, "place": "A", "name": "A", "commandIndex": 0},
                {"id": 1, "floor": 5, "place": "B", "name": "B", "commandIndex": 6}
            ]"#,
        );

        let err = DeviceRegistry::open(&path).load().unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateDevice {
                floor: Floor::Fifth,
                id: 1
            }
        ));
    }

    #[test]
    fn test_corrupt_file() {
        let (dir, _) = registry();
        let path = dir.path().join("devices.json");
        write_json(&path, "{ not json");

        let mut registry = DeviceRegistry::open(&path);
        assert!(matches!(registry.load(), Err(Error::Serialization(_))));
        assert!(!registry.is_loaded());
    }

    #[test]
    fn test_unknown_floor_in_file() {
        let (dir, _) = registry();
        let path = dir.path().join("devices.json");
        write_json(
            &path,
            r#"[{"id": 1, "floor": 3, "place": "A", "name": "A", "commandIndex": 0}]"#,
        );
        assert!(DeviceRegistry::open(&path).load().is_err());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("devices.json");

        let mut registry = DeviceRegistry::open(&path);
        registry.load().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_no_temporary_files_left_behind() {
        let (dir, mut registry) = registry();
        registry
            .edit(Floor::Eighth, 2, &DeviceEdit::new("A", "B"))
            .unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
