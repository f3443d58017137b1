use std::env;

use crate::blockchain::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD};

/// Node settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub node_name: String,
    pub difficulty: u32,
    pub mining_reward: u64,
    /// Base URLs of peers, e.g. `http://127.0.0.1:8081`.
    pub peers: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            node_name: "node1".to_string(),
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: DEFAULT_MINING_REWARD,
            peers: Vec::new(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl NodeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values fall back to
    /// the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(lookup("PORT"), defaults.port),
            node_name: lookup("NODE_NAME").unwrap_or(defaults.node_name),
            difficulty: parse_or(lookup("DIFFICULTY"), defaults.difficulty),
            mining_reward: parse_or(lookup("MINING_REWARD"), defaults.mining_reward),
            peers: lookup("PEERS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(NodeConfig::from_lookup(|_| None), NodeConfig::default());
    }

    #[test]
    fn values_are_parsed_and_bad_ones_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9001"),
            ("DIFFICULTY", "two"),
            ("MINING_REWARD", "25"),
            ("PEERS", "http://a:1, ,http://b:2"),
            ("NODE_NAME", "alice"),
        ]);
        let cfg = NodeConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.port, 9001);
        assert_eq!(cfg.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(cfg.mining_reward, 25);
        assert_eq!(cfg.node_name, "alice");
        assert_eq!(cfg.peers, vec!["http://a:1", "http://b:2"]);
    }
}
