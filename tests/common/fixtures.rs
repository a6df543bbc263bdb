//! Canned configuration and user lists.

use seerr_sync::config::{ServerConfig, SyncConfig, TargetConfig};
use seerr_sync::identity::SourceType;

pub const PLEX_ID: &str = "Plex Server 1";
pub const JELLYFIN_ID: &str = "Jellyfin Home";
pub const EMBY_ID: &str = "Emby Backup";

pub fn target_config() -> TargetConfig {
    TargetConfig::new("http://localhost:5055", "seerr-api-key")
}

pub fn plex_server() -> ServerConfig {
    ServerConfig::new(PLEX_ID, SourceType::Plex, "http://localhost:32400", "plex-token")
}

pub fn jellyfin_server() -> ServerConfig {
    ServerConfig::new(
        JELLYFIN_ID,
        SourceType::Jellyfin,
        "http://localhost:8096",
        "jellyfin-key",
    )
}

pub fn emby_server() -> ServerConfig {
    ServerConfig::new(EMBY_ID, SourceType::Emby, "http://localhost:8920", "emby-key")
}

/// Plex and Jellyfin enabled, removal off.
pub fn two_server_config() -> SyncConfig {
    SyncConfig::new(target_config())
        .with_server(plex_server())
        .with_server(jellyfin_server())
}

/// A dashboard-style JSON document covering every server type.
pub fn dashboard_json() -> &'static str {
    r#"{
        "target": { "url": " http://localhost:5055 ", "api_key": "seerr-api-key" },
        "media_servers": [
            { "id": "Plex Server 1", "type": "plex", "url": "http://localhost:32400",
              "token": "plex-token", "password_suffix": "2025", "request_limit": 10 },
            { "id": "Jellyfin Home", "type": "jellyfin", "url": "http://localhost:8096",
              "token": "jellyfin-key" },
            { "id": "Emby Backup", "type": "emby", "url": "http://localhost:8920",
              "token": "emby-key", "enabled": false }
        ],
        "remove_missing": true,
        "deletion_safety": "skip_unconfirmed",
        "default_request_limit": 5,
        "sync_interval_minutes": 30
    }"#
}

pub const PLEX_USERS: [&str; 2] = ["alice", "bob"];
pub const JELLYFIN_USERS: [&str; 2] = ["ALICE", "carol"];
