//! # Configuration value objects
//!
//! SPEC §6 ("Recognised keys") and SPEC_FULL.md §11 (cluster node table).
//! These are typed views over a loaded `jazz_types::Config`; parsing a file
//! is `jazz_types::config`'s job, this module only knows the key names.

use std::collections::HashMap;

use jazz_types::{Config, StatusCode};

/// LMDB environment settings (SPEC §4.4, §6).
#[derive(Debug, Clone)]
pub struct LmdbConfig {
    pub persistence_path: String,
    pub map_size_mb: u64,
    pub max_readers: u32,
    pub max_dbs: u32,
    pub fixed_map: bool,
    pub write_map: bool,
    pub no_meta_sync: bool,
    pub no_sync: bool,
    pub map_async: bool,
    pub no_lock: bool,
    pub no_rd_ahead: bool,
    pub no_mem_init: bool,
}

impl LmdbConfig {
    pub fn from_config(cfg: &Config) -> Result<Self, StatusCode> {
        let max_dbs: u32 = cfg
            .get_string_or("MDB_ENV_SET_MAXDBS", "16")
            .parse()
            .map_err(|_| StatusCode::BadConfig {
                key: "MDB_ENV_SET_MAXDBS".into(),
            })?;
        if max_dbs > 32 {
            return Err(StatusCode::BadConfig {
                key: "MDB_ENV_SET_MAXDBS exceeds 32".into(),
            });
        }
        Ok(LmdbConfig {
            persistence_path: cfg.get_string("MDB_PERSISTENCE_PATH")?.to_string(),
            map_size_mb: cfg
                .get_string_or("MDB_ENV_SET_MAPSIZE", "1024")
                .parse()
                .unwrap_or(1024),
            max_readers: cfg
                .get_string_or("MDB_ENV_SET_MAXREADERS", "126")
                .parse()
                .unwrap_or(126),
            max_dbs,
            fixed_map: cfg.get_bool("MDB_FIXEDMAP").unwrap_or(false),
            write_map: cfg.get_bool("MDB_WRITEMAP").unwrap_or(false),
            no_meta_sync: cfg.get_bool("MDB_NOMETASYNC").unwrap_or(false),
            no_sync: cfg.get_bool("MDB_NOSYNC").unwrap_or(false),
            map_async: cfg.get_bool("MDB_MAPASYNC").unwrap_or(false),
            no_lock: cfg.get_bool("MDB_NOLOCK").unwrap_or(false),
            no_rd_ahead: cfg.get_bool("MDB_NORDAHEAD").unwrap_or(false),
            no_mem_init: cfg.get_bool("MDB_NOMEMINIT").unwrap_or(false),
        })
    }
}

/// Channels' per-medium enable flags and file-level permission (SPEC §4.6, §6).
#[derive(Debug, Clone)]
pub struct ChannelsConfig {
    pub enable_zeromq_client: bool,
    pub enable_http_client: bool,
    pub enable_bash_exec: bool,
    /// 0 = disabled, 1 = read, 2 = read/write, 3 = read/write/overwrite/delete.
    pub enable_file_level: u8,
    pub filesystem_root: String,
}

impl ChannelsConfig {
    pub fn from_config(cfg: &Config) -> Result<Self, StatusCode> {
        let enable_file_level: u8 = cfg
            .get_string_or("ENABLE_FILE_LEVEL", "0")
            .parse()
            .map_err(|_| StatusCode::BadConfig {
                key: "ENABLE_FILE_LEVEL".into(),
            })?;
        if enable_file_level > 3 {
            return Err(StatusCode::BadConfig {
                key: "ENABLE_FILE_LEVEL out of range 0..=3".into(),
            });
        }
        Ok(ChannelsConfig {
            enable_zeromq_client: cfg.get_bool("ENABLE_ZEROMQ_CLIENT").unwrap_or(false),
            enable_http_client: cfg.get_bool("ENABLE_HTTP_CLIENT").unwrap_or(false),
            enable_bash_exec: cfg.get_bool("ENABLE_BASH_EXEC").unwrap_or(false),
            enable_file_level,
            filesystem_root: cfg.get_string_or("FILESYSTEM_ROOT", "/tmp/jazz"),
        })
    }
}

/// One-shot (Volatile/transaction-pool) allocation budget (SPEC §4.3, §6).
#[derive(Debug, Clone)]
pub struct OneShotConfig {
    pub max_transactions: u32,
    pub warn_block_kbytes: u64,
    pub error_block_kbytes: u64,
}

impl OneShotConfig {
    pub fn from_config(cfg: &Config) -> Self {
        OneShotConfig {
            max_transactions: cfg
                .get_string_or("ONE_SHOT_MAX_TRANSACTIONS", "1024")
                .parse()
                .unwrap_or(1024),
            warn_block_kbytes: cfg
                .get_string_or("ONE_SHOT_WARN_BLOCK_KBYTES", "65536")
                .parse()
                .unwrap_or(65536),
            error_block_kbytes: cfg
                .get_string_or("ONE_SHOT_ERROR_BLOCK_KBYTES", "262144")
                .parse()
                .unwrap_or(262144),
        }
    }
}

/// One cluster peer: `ip:port` reachable under a node name
/// (SPEC_FULL.md §11, `JAZZ_NODE_NAME_i`/`JAZZ_NODE_IP_i`/`JAZZ_NODE_PORT_i`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterPeer {
    pub ip: String,
    pub port: u16,
}

/// Resolves a cluster node name to `ip:port`, used by Channels'
/// `forward_get`/`forward_put`/`forward_del` (SPEC §4.6).
#[derive(Debug, Clone, Default)]
pub struct ClusterConfig {
    pub my_name: Option<String>,
    peers: HashMap<String, ClusterPeer>,
}

impl ClusterConfig {
    /// Scan `JAZZ_NODE_NAME_i`/`JAZZ_NODE_IP_i`/`JAZZ_NODE_PORT_i` for
    /// `i = 0..max_nodes`, stopping at the first missing name.
    pub fn from_config(cfg: &Config, max_nodes: u32) -> Self {
        let my_name = cfg.get_string("JAZZ_NODE_MY_NAME").ok().map(str::to_string);
        let mut peers = HashMap::new();
        for i in 0..max_nodes {
            let name_key = format!("JAZZ_NODE_NAME_{i}");
            let Ok(name) = cfg.get_string(&name_key) else {
                break;
            };
            let ip_key = format!("JAZZ_NODE_IP_{i}");
            let port_key = format!("JAZZ_NODE_PORT_{i}");
            let (Ok(ip), Ok(port)) = (cfg.get_string(&ip_key), cfg.get_int(&port_key)) else {
                break;
            };
            peers.insert(
                name.to_string(),
                ClusterPeer {
                    ip: ip.to_string(),
                    port: port as u16,
                },
            );
        }
        ClusterConfig { my_name, peers }
    }

    pub fn resolve(&self, node_name: &str) -> Option<String> {
        self.peers
            .get(node_name)
            .map(|p| format!("{}:{}", p.ip, p.port))
    }
}

/// Top-level storage configuration bundling the above, mirroring the
/// teacher's `StorageConfig` grouping.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub lmdb: LmdbConfig,
    pub channels: ChannelsConfig,
    pub one_shot: OneShotConfig,
    pub cluster: ClusterConfig,
}

impl StorageConfig {
    pub fn from_config(cfg: &Config) -> Result<Self, StatusCode> {
        Ok(StorageConfig {
            lmdb: LmdbConfig::from_config(cfg)?,
            channels: ChannelsConfig::from_config(cfg)?,
            one_shot: OneShotConfig::from_config(cfg),
            cluster: ClusterConfig::from_config(cfg, 32),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn cfg_from(pairs: &[(&str, &str)]) -> Config {
        let map: Map<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_map(map)
    }

    #[test]
    fn cluster_config_resolves_known_peer() {
        let cfg = cfg_from(&[
            ("JAZZ_NODE_MY_NAME", "alpha"),
            ("JAZZ_NODE_NAME_0", "beta"),
            ("JAZZ_NODE_IP_0", "10.0.0.2"),
            ("JAZZ_NODE_PORT_0", "8090"),
        ]);
        let cluster = ClusterConfig::from_config(&cfg, 8);
        assert_eq!(cluster.resolve("beta"), Some("10.0.0.2:8090".to_string()));
        assert_eq!(cluster.resolve("gamma"), None);
    }

    #[test]
    fn lmdb_config_rejects_too_many_dbs() {
        let cfg = cfg_from(&[
            ("MDB_PERSISTENCE_PATH", "/var/jazz"),
            ("MDB_ENV_SET_MAXDBS", "64"),
        ]);
        assert!(LmdbConfig::from_config(&cfg).is_err());
    }
}
