//! # Service context
//!
//! SPEC §9 "Global singletons: ... pass an explicit `Services` context
//! through the call graph; create exactly one per process at `main`."
//! SPEC_FULL.md §10.4. `Services` owns the loaded configuration and the
//! constructed containers (Volatile always, Persisted/Channels when their
//! required configuration is present), and routes an easy-interface path's
//! leading `base` segment (SPEC §6) to the container that owns it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use jazz_elements::adapters::Volatile;
use jazz_elements::domain::config::{ChannelsConfig, ClusterConfig, LmdbConfig, OneShotConfig};
use jazz_elements::Container;
use jazz_types::{Config, Lifecycle, StatusCode};

#[cfg(feature = "persisted")]
use jazz_elements::adapters::Persisted;

#[cfg(feature = "channels")]
use jazz_elements::adapters::Channels;

/// `base` name routed to the RAM container (SPEC §9 "Ram").
const RAM_BASE: &str = "ram";
/// `base` name routed to the LMDB container (SPEC §9 "Lmdb").
const LMDB_BASE: &str = "lmdb";
/// `base` names Channels itself recognises (SPEC §4.6).
const CHANNELS_BASES: &[&str] = &["file", "http", "0-mq", "bash"];

/// The one context object every request handler borrows from. Built once in
/// `main`, shut down once on ctrl-c. `containers` is behind a `RwLock` so
/// `shutdown` can run against a shared `Arc<Services>` — the HTTP server
/// holds clones of that `Arc` for the lifetime of the listener, so by the
/// time shutdown runs nothing else has exclusive access to `Services`.
pub struct Services {
    pub config: Config,
    containers: RwLock<HashMap<&'static str, Arc<dyn Container>>>,
}

impl Services {
    /// Build every container the loaded configuration asks for. Volatile is
    /// unconditional (SPEC §4.5 "always available, no configuration
    /// required"); Persisted needs `MDB_PERSISTENCE_PATH` and is skipped
    /// (logged, not fatal) if it fails to open, the same way an
    /// unconfigured base is simply unused rather than a startup error.
    pub fn build(config: Config) -> Result<Self, StatusCode> {
        let one_shot = OneShotConfig::from_config(&config);
        let mut containers: HashMap<&'static str, Arc<dyn Container>> = HashMap::new();

        let volatile = Arc::new(Volatile::new(
            RAM_BASE,
            one_shot.max_transactions,
            one_shot.warn_block_kbytes * 1024,
            one_shot.error_block_kbytes * 1024,
        ));
        containers.insert(RAM_BASE, volatile as Arc<dyn Container>);

        // `MDB_PERSISTENCE_PATH` is the only genuinely required Persisted
        // key (SPEC §6); both its absence and an LMDB open failure leave
        // `lmdb` un-routed rather than fail the whole node, the same as
        // Channels below, since a node might only ever serve `ram`.
        #[cfg(feature = "persisted")]
        match LmdbConfig::from_config(&config).and_then(|lmdb| {
            Persisted::open(
                LMDB_BASE,
                &lmdb,
                one_shot.max_transactions,
                one_shot.warn_block_kbytes * 1024,
                one_shot.error_block_kbytes * 1024,
            )
        }) {
            Ok(p) => {
                containers.insert(LMDB_BASE, Arc::new(p) as Arc<dyn Container>);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Persisted container not started, lmdb base disabled");
            }
        }

        #[cfg(feature = "channels")]
        {
            let channels_cfg = ChannelsConfig::from_config(&config)?;
            let cluster_cfg = ClusterConfig::from_config(&config, 32);
            let c: Arc<dyn Container> = Arc::new(Channels::new(
                channels_cfg,
                cluster_cfg,
                one_shot.max_transactions,
                one_shot.warn_block_kbytes * 1024,
                one_shot.error_block_kbytes * 1024,
            ));
            for base in CHANNELS_BASES {
                containers.insert(base, c.clone());
            }
        }

        Ok(Services {
            config,
            containers: RwLock::new(containers),
        })
    }

    /// Resolve the leading `base` segment of an easy-interface path (SPEC
    /// §6 grammar `//base/entity[/key[.attribute]]`) to the container that
    /// owns it. `BaseForbidden` covers both an unknown base and a real but
    /// un-started one (SPEC §7 "the base is disabled by configuration").
    pub fn route(&self, path: &str) -> Result<Arc<dyn Container>, StatusCode> {
        let base = path
            .trim_start_matches('/')
            .split('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| StatusCode::ParsingNames {
                input: path.to_string(),
            })?;
        self.containers
            .read()
            .unwrap()
            .get(base)
            .cloned()
            .ok_or(StatusCode::BaseForbidden)
    }

    /// Release every container (SPEC §5 "releases resources in reverse
    /// initialisation order"). Callable through a shared `&Services` since
    /// the HTTP listener only ever holds an `Arc<Services>`, never a `&mut`.
    pub fn release(&self) {
        self.containers.write().unwrap().clear();
        tracing::info!("containers released");
    }
}

impl Lifecycle for Services {
    fn start(&mut self) -> Result<(), StatusCode> {
        let bases: Vec<_> = self.containers.read().unwrap().keys().copied().collect();
        tracing::info!(?bases, "containers started");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), StatusCode> {
        self.release();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn minimal_config(lmdb_path: &str) -> Config {
        let mut map: Map<String, String> = Map::new();
        map.insert("MDB_PERSISTENCE_PATH".into(), lmdb_path.into());
        Config::from_map(map)
    }

    #[test]
    fn routes_ram_and_lmdb_bases() {
        let dir = tempfile::tempdir().unwrap();
        let services = Services::build(minimal_config(dir.path().to_str().unwrap())).unwrap();
        assert!(services.route("//ram/entity/key").is_ok());
        assert!(services.route("//lmdb/entity/key").is_ok());
        assert!(matches!(
            services.route("//nope/entity/key"),
            Err(StatusCode::BaseForbidden)
        ));
    }

    #[test]
    fn release_drops_all_containers() {
        let dir = tempfile::tempdir().unwrap();
        let services = Services::build(minimal_config(dir.path().to_str().unwrap())).unwrap();
        services.release();
        assert!(matches!(
            services.route("//ram/entity/key"),
            Err(StatusCode::BaseForbidden)
        ));
    }
}
