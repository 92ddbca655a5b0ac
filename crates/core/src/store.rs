//! Generic cache-and-flush record store.
//!
//! A [`RecordStore`] owns the in-memory collection for one entity type and mirrors it to a
//! single CSV file. Reads return owned clones; every mutation rewrites the whole file.

use crate::csv_format::{read_rows, write_rows};
use crate::models::Record;
use crate::{ClinicError, ClinicResult};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct RecordStore<T: Record> {
    path: PathBuf,
    cache: Vec<T>,
    loaded: bool,
}

impl<T: Record> RecordStore<T> {
    /// Creates an unloaded store backed by `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Vec::new(),
            loaded: false,
        }
    }

    /// Creates the store and loads it immediately.
    pub fn open(path: impl Into<PathBuf>) -> ClinicResult<Self> {
        let mut store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Populates the cache from disk. A no-op once loaded.
    ///
    /// A missing file is treated as an empty store and a header-only file is created in its
    /// place. Rows that decode but fail validation are dropped without a warning.
    pub fn load(&mut self) -> ClinicResult<()> {
        if self.loaded {
            return Ok(());
        }

        let exists = self.path.exists();
        let rows = read_rows::<T::Row>(T::KIND, &self.path)?;

        let total = rows.len();
        self.cache = rows
            .into_iter()
            .filter_map(T::from_row)
            .filter(Record::is_valid)
            .collect();
        self.loaded = true;

        if !exists {
            write_rows::<T::Row>(T::KIND, &self.path, T::HEADER, &[])?;
            tracing::info!(
                "created empty {} store at {}",
                T::KIND,
                self.path.display()
            );
        } else {
            tracing::info!(
                "loaded {} {} records from {} ({} rows excluded)",
                self.cache.len(),
                T::KIND,
                self.path.display(),
                total - self.cache.len()
            );
        }

        Ok(())
    }

    /// Discards the cache and reads the file again.
    pub fn reload(&mut self) -> ClinicResult<()> {
        self.loaded = false;
        self.cache.clear();
        self.load()
    }

    /// Rewrites the file from the cache.
    pub fn flush(&mut self) -> ClinicResult<()> {
        self.load()?;
        self.write_cache()
    }

    fn write_cache(&self) -> ClinicResult<()> {
        let rows: Vec<T::Row> = self.cache.iter().map(Record::to_row).collect();
        write_rows(T::KIND, &self.path, T::HEADER, &rows)?;
        tracing::debug!(
            "flushed {} {} records to {}",
            rows.len(),
            T::KIND,
            self.path.display()
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Linear lookup by id. A blank id finds nothing.
    pub fn find_by_id(&mut self, id: &str) -> ClinicResult<Option<T>> {
        self.load()?;
        if id.trim().is_empty() {
            return Ok(None);
        }
        Ok(self.cache.iter().find(|e| e.id() == id).cloned())
    }

    pub fn find_all(&mut self) -> ClinicResult<Vec<T>> {
        self.load()?;
        Ok(self.cache.clone())
    }

    pub fn find_where(&mut self, predicate: impl Fn(&T) -> bool) -> ClinicResult<Vec<T>> {
        self.load()?;
        Ok(self.cache.iter().filter(|e| predicate(e)).cloned().collect())
    }

    pub fn exists_by_id(&mut self, id: &str) -> ClinicResult<bool> {
        Ok(self.find_by_id(id)?.is_some())
    }

    pub fn count(&mut self) -> ClinicResult<usize> {
        self.load()?;
        Ok(self.cache.len())
    }

    /// Borrowed view of the cache for read-only scans. Loads first.
    pub fn records(&mut self) -> ClinicResult<&[T]> {
        self.load()?;
        Ok(&self.cache)
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Validates `entity`, replaces the record with the same id (or appends), then flushes.
    ///
    /// If the flush fails the cache is restored, so memory and disk stay in step.
    pub fn save(&mut self, entity: T) -> ClinicResult<T> {
        self.load()?;
        entity.validate()?;

        let previous = match self.cache.iter().position(|e| e.id() == entity.id()) {
            Some(index) => Some((
                index,
                std::mem::replace(&mut self.cache[index], entity.clone()),
            )),
            None => {
                self.cache.push(entity.clone());
                None
            }
        };

        if let Err(e) = self.write_cache() {
            match previous {
                Some((index, old)) => self.cache[index] = old,
                None => {
                    self.cache.pop();
                }
            }
            return Err(e);
        }

        Ok(entity)
    }

    /// Replaces the whole collection with the valid members of `entities`, then flushes.
    pub fn save_all(&mut self, entities: Vec<T>) -> ClinicResult<()> {
        self.load()?;
        let before = entities.len();
        let kept: Vec<T> = entities.into_iter().filter(Record::is_valid).collect();
        if kept.len() < before {
            tracing::warn!(
                "dropping {} invalid {} records from bulk save",
                before - kept.len(),
                T::KIND
            );
        }

        let previous = std::mem::replace(&mut self.cache, kept);
        if let Err(e) = self.write_cache() {
            self.cache = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Removes the record with `id` and flushes. Absent ids are a `NotFound` error.
    pub fn delete_by_id(&mut self, id: &str) -> ClinicResult<T> {
        self.load()?;
        let index = self
            .cache
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| ClinicError::not_found(T::KIND, id))?;

        let removed = self.cache.remove(index);
        if let Err(e) = self.write_cache() {
            self.cache.insert(index, removed);
            return Err(e);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Facility, FacilityType};
    use crate::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn facility(id: &str, capacity: u32) -> Facility {
        Facility {
            id: id.into(),
            name: format!("Facility {id}"),
            facility_type: FacilityType::Clinic,
            address: "1 Test Lane".into(),
            postcode: "AB1 2CD".into(),
            phone_number: None,
            email: None,
            opening_hours: Some("Mon-Fri 08:00-18:00".into()),
            manager_name: None,
            capacity,
            specialities: vec![],
        }
    }

    fn store_in(temp_dir: &TempDir) -> RecordStore<Facility> {
        RecordStore::new(temp_dir.path().join("facilities.csv"))
    }

    #[test]
    fn test_missing_file_creates_header_only_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = store_in(&temp_dir);
        assert_eq!(store.count().expect("count"), 0);

        let text = fs::read_to_string(store.path()).expect("file created");
        assert_eq!(
            text.trim_end(),
            "facility_id,facility_name,facility_type,address,postcode,phone_number,email,opening_hours,manager_name,capacity,specialities_offered"
        );
    }

    #[test]
    fn test_save_upserts_by_id() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = store_in(&temp_dir);

        store.save(facility("F1", 10)).expect("insert");
        store.save(facility("F2", 20)).expect("insert");
        store.save(facility("F1", 99)).expect("replace");

        let all = store.find_all().expect("find_all");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "F1");
        assert_eq!(all[0].capacity, 99);

        let mut reopened = store_in(&temp_dir);
        assert_eq!(reopened.find_all().expect("reload"), all);
    }

    #[test]
    fn test_save_rejects_invalid_entity_without_writing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = store_in(&temp_dir);
        store.save(facility("F1", 10)).expect("insert");

        let err = store.save(facility("F2", 0)).unwrap_err();
        assert!(matches!(err, ClinicError::Validation { .. }));
        assert_eq!(store.count().expect("count"), 1);
    }

    #[test]
    fn test_find_all_returns_copies() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = store_in(&temp_dir);
        store.save(facility("F1", 10)).expect("insert");

        let mut copy = store.find_all().expect("find_all");
        copy[0].capacity = 1;
        copy.clear();

        let fresh = store.find_by_id("F1").expect("lookup").expect("present");
        assert_eq!(fresh.capacity, 10);
    }

    #[test]
    fn test_blank_id_finds_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = store_in(&temp_dir);
        store.save(facility("F1", 10)).expect("insert");
        assert_eq!(store.find_by_id("   ").expect("lookup"), None);
        assert!(!store.exists_by_id("").expect("exists"));
    }

    #[test]
    fn test_delete_missing_id_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = store_in(&temp_dir);
        let err = store.delete_by_id("F404").unwrap_err();
        assert!(matches!(err, ClinicError::NotFound { .. }));

        store.save(facility("F1", 10)).expect("insert");
        let removed = store.delete_by_id("F1").expect("delete");
        assert_eq!(removed.id, "F1");
        assert_eq!(store.count().expect("count"), 0);
    }

    #[test]
    fn test_save_all_filters_invalid_records() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = store_in(&temp_dir);
        store.save(facility("OLD", 5)).expect("insert");

        store
            .save_all(vec![facility("F1", 1), facility("F2", 0), facility("F3", 3)])
            .expect("save_all");

        let ids: Vec<_> = store
            .find_all()
            .expect("find_all")
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec!["F1", "F3"]);
    }

    #[test]
    fn test_load_skips_bad_rows_and_invalid_records() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("facilities.csv");
        fs::write(
            &path,
            "facility_id,facility_name,facility_type,address,postcode,phone_number,email,opening_hours,manager_name,capacity,specialities_offered\n\
             F1,Good,Clinic,1 Road,AB1,,,,,10,\n\
             F2,Unknown type,Pharmacy,1 Road,AB1,,,,,10,\n\
             F3,Zero capacity,Clinic,1 Road,AB1,,,,,0,\n\
             F4,No postcode,Clinic,1 Road,,,,,,10,\n\
             F5,\"Quoted, name\",GP Surgery,\"2 \"\"Old\"\" Road\",AB2,,,,,5,Cardiology|Oncology\n",
        )
        .expect("write fixture");

        let mut store = RecordStore::<Facility>::open(&path).expect("open");
        let all = store.find_all().expect("find_all");
        let ids: Vec<_> = all.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["F1", "F5"]);
        assert_eq!(all[1].name, "Quoted, name");
        assert_eq!(all[1].address, "2 \"Old\" Road");
        assert_eq!(all[1].specialities.len(), 2);
    }

    #[test]
    fn test_load_is_idempotent_until_reload() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = store_in(&temp_dir);
        store.save(facility("F1", 10)).expect("insert");

        let first = store.find_all().expect("first");
        store.load().expect("second load");
        assert_eq!(store.find_all().expect("second"), first);

        // External edit is invisible until reload.
        let mut other = store_in(&temp_dir);
        other.save(facility("F2", 20)).expect("insert elsewhere");
        assert_eq!(store.count().expect("count"), 1);
        store.reload().expect("reload");
        assert_eq!(store.count().expect("count"), 2);
    }

    /// Swaps the backing file for a directory so the next rewrite fails.
    fn block_writes(path: &Path) {
        fs::remove_file(path).expect("remove file");
        fs::create_dir(path).expect("create blocking dir");
    }

    #[test]
    fn test_failed_flush_leaves_cache_unchanged() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = store_in(&temp_dir);
        store.save(facility("F1", 10)).expect("insert");
        store.save(facility("F2", 20)).expect("insert");
        let before = store.find_all().expect("find_all");

        block_writes(store.path());

        let err = store.save(facility("F3", 30)).unwrap_err();
        assert!(matches!(err, ClinicError::DataSave { .. }));
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(store.count().expect("count"), 2);

        let err = store.save(facility("F1", 99)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);

        let err = store.delete_by_id("F2").unwrap_err();
        assert!(matches!(err, ClinicError::DataSave { .. }));

        let err = store.save_all(vec![facility("F9", 1)]).unwrap_err();
        assert!(matches!(err, ClinicError::DataSave { .. }));

        assert_eq!(store.find_all().expect("find_all"), before);
    }

    #[test]
    fn test_unreadable_path_is_a_load_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let not_a_dir = temp_dir.path().join("facilities.csv");
        fs::write(&not_a_dir, "plain file").expect("write");

        let mut store = RecordStore::<Facility>::new(not_a_dir.join("facilities.csv"));
        let err = store.count().unwrap_err();
        assert!(matches!(err, ClinicError::DataLoad { .. }));
        assert_eq!(err.kind(), ErrorKind::Persistence);

        let err = RecordStore::<Facility>::open(not_a_dir.join("other.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_padded_and_multiline_text_round_trips() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = store_in(&temp_dir);

        let mut padded = facility("F1", 10);
        padded.name = "  Riverside  ".into();
        padded.address = "Unit 4\nMill Lane\n".into();
        padded.opening_hours = Some(" 24/7 ".into());
        store.save(padded.clone()).expect("insert");

        let mut reopened = store_in(&temp_dir);
        let loaded = reopened.find_by_id("F1").expect("lookup").expect("present");
        assert_eq!(loaded, padded);
    }
}
