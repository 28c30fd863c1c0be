//! Where a swarm finds its game servers.
//!
//! The live server list is an external service; this module only pins
//! down its boundary: a [`ServerRecord`] per server and a
//! [`ServerDirectory`] that yields them. [`StaticDirectory`] covers the
//! common cases of a fixed fleet and tests.

use serde::{Deserialize, Serialize};

/// One advertised game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    /// WebSocket URL the server accepts connections on.
    pub address: String,
    /// Which mode this server runs ("ffa", "tdm", "dom", …).
    pub game_type: String,
}

/// A source of game servers.
///
/// Implementations that consult a remote listing should log and return
/// an empty list on failure; the swarm treats "no servers" as an error
/// at its own level.
pub trait ServerDirectory {
    fn servers(
        &self,
    ) -> impl std::future::Future<Output = Vec<ServerRecord>> + Send;
}

/// A fixed list of servers, known up front.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    records: Vec<ServerRecord>,
}

impl StaticDirectory {
    pub fn new(records: Vec<ServerRecord>) -> Self {
        Self { records }
    }

    /// Convenience for a fleet of same-mode servers given as URLs.
    pub fn from_addresses(
        addresses: impl IntoIterator<Item = impl Into<String>>,
        game_type: impl Into<String>,
    ) -> Self {
        let game_type = game_type.into();
        Self {
            records: addresses
                .into_iter()
                .map(|address| ServerRecord {
                    address: address.into(),
                    game_type: game_type.clone(),
                })
                .collect(),
        }
    }
}

impl ServerDirectory for StaticDirectory {
    async fn servers(&self) -> Vec<ServerRecord> {
        self.records.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_record_json_shape() {
        // The external listing uses camelCase keys.
        let json = r#"[{"address":"wss://eu1.example:443","gameType":"ffa"}]"#;
        let records: Vec<ServerRecord> =
            serde_json::from_str(json).expect("parse");
        assert_eq!(
            records,
            vec![ServerRecord {
                address: "wss://eu1.example:443".into(),
                game_type: "ffa".into(),
            }]
        );
    }

    #[test]
    fn test_server_record_round_trips() {
        let record = ServerRecord {
            address: "ws://127.0.0.1:8080".into(),
            game_type: "tdm".into(),
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains("\"gameType\":\"tdm\""));
    }

    #[tokio::test]
    async fn test_static_directory_yields_its_records() {
        let dir = StaticDirectory::from_addresses(
            ["ws://a:1", "ws://b:2"],
            "ffa",
        );
        let servers = dir.servers().await;
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].address, "ws://a:1");
        assert_eq!(servers[1].game_type, "ffa");
    }
}
