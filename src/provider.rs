use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, error, info};

use crate::app_data::AppData;
use crate::domain::{Directory, LocalPokemon, Pokemon, PokemonId, ScreenPokemon};
use crate::service::SearchService;
use crate::storage::Storage;

/// Observer for search and catch outcomes. `error_message` is `None` on
/// success. Callbacks run on the fetch worker thread but are serialized
/// under the provider's state lock, so they never overlap and always see
/// the staged slot consistent with the outcome they report. Callbacks must
/// not call back into the provider.
pub trait Notifier: Send {
    fn data_received(&self, error_message: Option<String>);
}

struct Shared {
    data: Mutex<AppData>,
    notifier: Mutex<Option<Box<dyn Notifier>>>,
    // Identity of the current in-flight search. A completion whose token no
    // longer matches arrived after a newer search started and is dropped.
    generation: AtomicU64,
}

/// Coordinates fetcher, record store and storage: single-flight search with
/// supersession, staged result, explicit catch to commit and persist.
pub struct DataProvider {
    service: Arc<dyn SearchService>,
    shared: Arc<Shared>,
}

impl DataProvider {
    pub fn new(service: Arc<dyn SearchService>, storage: Box<dyn Storage>) -> Self {
        Self {
            service,
            shared: Arc::new(Shared {
                data: Mutex::new(AppData::new(storage)),
                notifier: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Single-slot observer registration; replaces any previous observer.
    pub fn set_notifier(&self, notifier: Box<dyn Notifier>) {
        *self.shared.notifier.lock().unwrap() = Some(notifier);
    }

    /// Load the persisted collection and sort it. Call once before use.
    pub fn start(&self) {
        let mut data = self.shared.data.lock().unwrap();
        data.load();
        data.sort_by_order();
    }

    /// Start a fetch for `id`. Clears the staged slot and supersedes any
    /// in-flight search; the old search's late result is silently dropped.
    /// The outcome is delivered through the registered notifier.
    pub fn search(&self, id: PokemonId) {
        let token = {
            let mut data = self.shared.data.lock().unwrap();
            data.clear_staged();
            self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        let service = Arc::clone(&self.service);
        let shared = Arc::clone(&self.shared);
        thread::spawn(move || {
            let result = service.search(id);

            let mut data = shared.data.lock().unwrap();
            if shared.generation.load(Ordering::SeqCst) != token {
                debug!(identifier = id.value(), "stale search result dropped");
                return;
            }
            let error_message = match result {
                Ok(pokemon) => {
                    info!(identifier = id.value(), name = %pokemon.name, "search succeeded");
                    data.stage(pokemon);
                    None
                }
                Err(err) => {
                    error!(identifier = id.value(), "search failed: {err}");
                    Some(err.to_string())
                }
            };
            // Notify while still holding the state lock so the staged slot
            // cannot change between the outcome and its delivery.
            if let Some(notifier) = shared.notifier.lock().unwrap().as_ref() {
                notifier.data_received(error_message);
            }
            drop(data);
        });
    }

    /// Commit the staged pokemon into the durable collection. No-op when
    /// nothing is staged. Save failures are reported through the notifier,
    /// the same path fetch errors take.
    pub fn catch_pokemon(&self) -> Option<LocalPokemon> {
        let mut data = self.shared.data.lock().unwrap();
        let staged = data.staged().cloned()?;

        let (caught, error_message) = match data.commit(&staged) {
            Ok(local) => {
                info!(identifier = local.id, name = %local.name, "pokemon caught");
                (Some(local), None)
            }
            Err(err) => {
                error!("failed to persist collection: {err}");
                (None, Some(err.to_string()))
            }
        };
        if let Some(notifier) = self.shared.notifier.lock().unwrap().as_ref() {
            notifier.data_received(error_message);
        }
        caught
    }

    /// True iff the staged pokemon is not yet in the collection; false when
    /// nothing is staged.
    pub fn new_species(&self) -> bool {
        let data = self.shared.data.lock().unwrap();
        match data.staged() {
            Some(staged) => data.is_new_species(staged),
            None => false,
        }
    }

    pub fn staged_pokemon(&self) -> Option<Pokemon> {
        self.shared.data.lock().unwrap().staged().cloned()
    }

    /// Display projection of the staged pokemon, if any.
    pub fn pokemon(&self) -> Option<ScreenPokemon> {
        self.shared
            .data
            .lock()
            .unwrap()
            .staged()
            .map(ScreenPokemon::from_remote)
    }

    /// Panics when `index` is out of range; check `pokemons().len()` first.
    pub fn pokemon_at(&self, index: usize) -> LocalPokemon {
        self.shared.data.lock().unwrap().at(index).clone()
    }

    pub fn pokemons(&self) -> Vec<LocalPokemon> {
        self.shared.data.lock().unwrap().all().to_vec()
    }

    pub fn directory(&self) -> Directory {
        self.shared.data.lock().unwrap().directory()
    }
}
