use tracing::warn;

use crate::domain::{Directory, LocalPokemon, Pokemon};
use crate::error::DexError;
use crate::storage::Storage;

/// In-memory ordered collection of caught pokemon plus the staged slot
/// holding the last successful fetch that has not been caught yet.
///
/// The collection is unique by identifier and kept sorted by the directory
/// order key; the staged slot is never persisted.
pub struct AppData {
    storage: Box<dyn Storage>,
    pokemons: Vec<LocalPokemon>,
    staged: Option<Pokemon>,
}

impl AppData {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self {
            storage,
            pokemons: Vec::new(),
            staged: None,
        }
    }

    /// Populate the collection from durable bytes. A missing or corrupt blob
    /// degrades to an empty collection rather than failing startup.
    pub fn load(&mut self) {
        match self.storage.load() {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<LocalPokemon>>(&bytes) {
                Ok(pokemons) => self.pokemons = pokemons,
                Err(err) => {
                    warn!("corrupt collection blob, starting empty: {err}");
                    self.pokemons = Vec::new();
                }
            },
            Ok(None) => self.pokemons = Vec::new(),
            Err(err) => {
                warn!("failed to load collection, starting empty: {err}");
                self.pokemons = Vec::new();
            }
        }
        self.sort_by_order();
    }

    pub fn save(&self) -> Result<(), DexError> {
        self.storage.save(&Self::encode(&self.pokemons)?)
    }

    /// Stable re-sort by the directory order key. Idempotent.
    pub fn sort_by_order(&mut self) {
        self.pokemons.sort_by_key(LocalPokemon::sort_key);
    }

    pub fn stage(&mut self, pokemon: Pokemon) {
        self.staged = Some(pokemon);
    }

    pub fn clear_staged(&mut self) {
        self.staged = None;
    }

    pub fn staged(&self) -> Option<&Pokemon> {
        self.staged.as_ref()
    }

    /// True iff no caught pokemon carries this identifier. Evaluated against
    /// the collection as it stands, so callers check before committing.
    pub fn is_new_species(&self, pokemon: &Pokemon) -> bool {
        !self.pokemons.iter().any(|local| local.id == pokemon.id)
    }

    /// Promote a remote record into the collection. Committing an identifier
    /// that is already present is a no-op returning the existing record.
    /// The appended, re-sorted collection is persisted before it is
    /// installed in memory, so a failed save leaves the collection exactly
    /// as it was and a retry attempts the save again.
    pub fn commit(&mut self, pokemon: &Pokemon) -> Result<LocalPokemon, DexError> {
        if let Some(existing) = self.pokemons.iter().find(|local| local.id == pokemon.id) {
            return Ok(existing.clone());
        }
        let local = LocalPokemon::from_remote(pokemon);
        let mut next = self.pokemons.clone();
        next.push(local.clone());
        next.sort_by_key(LocalPokemon::sort_key);
        self.storage.save(&Self::encode(&next)?)?;
        self.pokemons = next;
        Ok(local)
    }

    /// Bounds-checked by the slice itself: out-of-range indices panic, since
    /// callers are expected to check `all().len()` first.
    pub fn at(&self, index: usize) -> &LocalPokemon {
        &self.pokemons[index]
    }

    pub fn all(&self) -> &[LocalPokemon] {
        &self.pokemons
    }

    pub fn directory(&self) -> Directory {
        Directory::from_collection(&self.pokemons)
    }

    fn encode(pokemons: &[LocalPokemon]) -> Result<Vec<u8>, DexError> {
        serde_json::to_vec_pretty(pokemons).map_err(|err| DexError::Storage(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use assert_matches::assert_matches;

    use super::*;
    use crate::domain::{Species, Sprites};

    #[derive(Clone, Default)]
    struct MemoryStorage {
        blob: Arc<Mutex<Option<Vec<u8>>>>,
        broken: Arc<Mutex<bool>>,
    }

    impl MemoryStorage {
        fn set_broken(&self, broken: bool) {
            *self.broken.lock().unwrap() = broken;
        }
    }

    impl Storage for MemoryStorage {
        fn load(&self) -> Result<Option<Vec<u8>>, DexError> {
            Ok(self.blob.lock().unwrap().clone())
        }

        fn save(&self, bytes: &[u8]) -> Result<(), DexError> {
            if *self.broken.lock().unwrap() {
                return Err(DexError::Storage("disk full".to_string()));
            }
            *self.blob.lock().unwrap() = Some(bytes.to_vec());
            Ok(())
        }
    }

    fn remote(id: u32, name: &str, order: i32) -> Pokemon {
        Pokemon {
            id,
            name: name.to_string(),
            order,
            weight: 60,
            height: 4,
            sprites: Sprites::default(),
            species: Species {
                name: name.to_string(),
                url: format!("https://example.test/species/{id}/"),
            },
        }
    }

    #[test]
    fn commit_appends_and_sorts() {
        let mut data = AppData::new(Box::new(MemoryStorage::default()));
        data.commit(&remote(25, "pikachu", 35)).unwrap();
        data.commit(&remote(1, "bulbasaur", 1)).unwrap();
        let names: Vec<&str> = data.all().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["bulbasaur", "pikachu"]);
    }

    #[test]
    fn commit_duplicate_is_noop() {
        let mut data = AppData::new(Box::new(MemoryStorage::default()));
        let first = data.commit(&remote(25, "pikachu", 35)).unwrap();
        let second = data.commit(&remote(25, "pikachu", 35)).unwrap();
        assert_eq!(data.all().len(), 1);
        assert_eq!(first.caught_at, second.caught_at);
    }

    #[test]
    fn failed_save_leaves_collection_unchanged() {
        let storage = MemoryStorage::default();
        storage.set_broken(true);
        let mut data = AppData::new(Box::new(storage.clone()));

        let pikachu = remote(25, "pikachu", 35);
        let err = data.commit(&pikachu).unwrap_err();
        assert_matches!(err, DexError::Storage(_));
        assert!(data.all().is_empty());
        assert!(storage.blob.lock().unwrap().is_none());
        assert!(data.is_new_species(&pikachu));
    }

    #[test]
    fn commit_retries_save_after_failure() {
        let storage = MemoryStorage::default();
        storage.set_broken(true);
        let mut data = AppData::new(Box::new(storage.clone()));

        let pikachu = remote(25, "pikachu", 35);
        data.commit(&pikachu).unwrap_err();

        storage.set_broken(false);
        let caught = data.commit(&pikachu).unwrap();
        assert_eq!(caught.id, 25);
        assert_eq!(data.all().len(), 1);
        assert!(storage.blob.lock().unwrap().is_some());
    }

    #[test]
    fn new_species_flips_after_commit() {
        let mut data = AppData::new(Box::new(MemoryStorage::default()));
        let pikachu = remote(25, "pikachu", 35);
        assert!(data.is_new_species(&pikachu));
        data.commit(&pikachu).unwrap();
        assert!(!data.is_new_species(&pikachu));
    }

    #[test]
    fn sort_is_idempotent_and_breaks_ties_by_id() {
        let mut data = AppData::new(Box::new(MemoryStorage::default()));
        data.commit(&remote(10001, "deoxys-attack", -1)).unwrap();
        data.commit(&remote(10002, "deoxys-defense", -1)).unwrap();
        data.commit(&remote(1, "bulbasaur", 1)).unwrap();
        let before: Vec<u32> = data.all().iter().map(|p| p.id).collect();
        data.sort_by_order();
        let after: Vec<u32> = data.all().iter().map(|p| p.id).collect();
        assert_eq!(before, after);
        assert_eq!(after, vec![10001, 10002, 1]);
    }

    #[test]
    fn load_round_trips_collection() {
        let storage = MemoryStorage::default();
        let mut data = AppData::new(Box::new(storage.clone()));
        data.commit(&remote(25, "pikachu", 35)).unwrap();
        data.commit(&remote(1, "bulbasaur", 1)).unwrap();

        let mut reloaded = AppData::new(Box::new(storage));
        reloaded.load();
        assert_eq!(reloaded.all(), data.all());
    }

    #[test]
    fn load_corrupt_blob_starts_empty() {
        let storage = MemoryStorage::default();
        storage.save(b"{ not json").unwrap();
        let mut data = AppData::new(Box::new(storage));
        data.load();
        assert!(data.all().is_empty());
    }

    #[test]
    fn staged_slot_is_not_persisted() {
        let storage = MemoryStorage::default();
        let mut data = AppData::new(Box::new(storage.clone()));
        data.stage(remote(25, "pikachu", 35));
        data.save().unwrap();

        let mut reloaded = AppData::new(Box::new(storage));
        reloaded.load();
        assert!(reloaded.staged().is_none());
        assert!(reloaded.all().is_empty());
    }

    #[test]
    #[should_panic]
    fn at_out_of_range_panics() {
        let data = AppData::new(Box::new(MemoryStorage::default()));
        let _ = data.at(0);
    }
}
