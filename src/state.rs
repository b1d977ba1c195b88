use crate::cache::QueryCache;
use crate::config::Config;
use crate::db::TransactionStore;

pub struct AppState {
    pub config: Config,
    pub store: TransactionStore,
    pub cache: QueryCache,
}

impl AppState {
    pub fn new(config: Config, store: TransactionStore) -> Self {
        let cache = QueryCache::new(&config);

        Self {
            config,
            store,
            cache,
        }
    }
}
