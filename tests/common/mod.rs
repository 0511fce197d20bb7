//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use geo_authz::config::ListenerConfig;
use geo_authz::context::{CheckRequest, Coordinates};
use geo_authz::geo::{GeoDatabase, GeoError, GeoRecord};
use geo_authz::{DecisionEngine, HttpServer, Shutdown};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// In-memory geo database keyed by IP.
#[derive(Default)]
pub struct FixedGeo {
    records: HashMap<IpAddr, GeoRecord>,
}

impl FixedGeo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ip: &str, record: GeoRecord) -> Self {
        self.records.insert(ip.parse().unwrap(), record);
        self
    }
}

impl GeoDatabase for FixedGeo {
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>, GeoError> {
        Ok(self.records.get(&ip).cloned())
    }

    fn edition(&self) -> &str {
        "fixed"
    }
}

/// A city-edition record at the given point.
pub fn located(country_code: &str, latitude: f64, longitude: f64) -> GeoRecord {
    GeoRecord {
        country_code: Some(country_code.to_string()),
        coordinates: Some(Coordinates::new(latitude, longitude)),
        ..GeoRecord::default()
    }
}

/// Axis-aligned rectangle feature. GeoJSON positions are `[lon, lat]`.
pub fn rectangle(name: &str, min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Value {
    json!({
        "type": "Feature",
        "properties": { "name": name },
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [min_lon, min_lat],
                [max_lon, min_lat],
                [max_lon, max_lat],
                [min_lon, max_lat],
                [min_lon, min_lat]
            ]]
        }
    })
}

pub fn feature_collection(features: Vec<Value>) -> String {
    json!({ "type": "FeatureCollection", "features": features }).to_string()
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn check_from(source: &str) -> CheckRequest {
    CheckRequest {
        request_id: "test-request".to_string(),
        source_address: source.to_string(),
        method: "GET".to_string(),
        path: "/".to_string(),
        headers: HashMap::new(),
    }
}

/// Serve `engine` on an ephemeral port. Trigger the returned `Shutdown` to stop.
pub async fn start_server(engine: DecisionEngine) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(Arc::new(engine), &ListenerConfig::default());

    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    (addr, shutdown)
}
