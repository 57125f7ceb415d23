//! CLI command implementations.

pub mod business;
pub mod search;
pub mod stats;
pub mod sync;

use std::sync::Arc;

use hamlet_directory::analytics::{EventBatcher, EventSink, SupabaseSink, Tracker};
use hamlet_directory::config::DirectoryConfig;
use hamlet_directory::device::DeviceIdentity;
use hamlet_directory::remote::SupabaseClient;
use hamlet_directory::store::LocalStore;
use hamlet_directory::sync::SyncService;

/// Everything a command needs, built once per invocation.
pub struct Context {
    pub config: DirectoryConfig,
    pub identity: DeviceIdentity,
    pub client: SupabaseClient,
    pub sync: SyncService,
    pub tracker: Tracker,
}

impl Context {
    /// Load configuration and wire up the client stack.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, the cache database, or the
    /// device flags cannot be set up.
    pub async fn init() -> hamlet_directory::Result<Self> {
        let config = DirectoryConfig::from_env()?;

        // Identity first: it creates the data directory on first run.
        let identity = DeviceIdentity::load_or_create(&config.data_dir)?;

        let store = LocalStore::open(&config.database_path()).await?;
        let client = SupabaseClient::new(&config.supabase)?;
        let sync = SyncService::new(store, Arc::new(client.clone()));

        let batcher = if config.analytics_enabled {
            let sink: Arc<dyn EventSink> = Arc::new(SupabaseSink::new(&config.supabase)?);
            EventBatcher::new(sink)
        } else {
            EventBatcher::disabled()
        };
        let tracker = Tracker::new(batcher, identity.device_id.clone());

        Ok(Self {
            config,
            identity,
            client,
            sync,
            tracker,
        })
    }
}
