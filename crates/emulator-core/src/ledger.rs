//! Ledger collaborator: the asset store contracts read and write
//!
//! The engine never touches the ledger itself; it hands a `&mut dyn Ledger`
//! to contract logic. [`AssetLedger`] is an in-memory stand-in where every
//! `put` appends a new version (age) of the asset.

use std::collections::HashMap;

use serde_json::Value;

/// One version of an asset
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Asset {
    pub id: String,
    /// Version number, starting at 0
    pub age: u32,
    pub data: Value,
}

impl Asset {
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "asset_id": self.id,
            "age": self.age,
            "data": self.data,
        })
    }
}

/// Order in which [`Ledger::scan`] returns versions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionOrder {
    Ascending,
    #[default]
    Descending,
}

/// Selects versions of a single asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFilter {
    pub id: String,
    /// Inclusive lower bound on age
    pub start_version: Option<u32>,
    /// Exclusive upper bound on age
    pub end_version: Option<u32>,
    /// Maximum number of versions; 0 means unlimited
    pub limit: u32,
    pub order: VersionOrder,
}

impl AssetFilter {
    pub fn new(id: impl Into<String>) -> Self {
        AssetFilter {
            id: id.into(),
            start_version: None,
            end_version: None,
            limit: 0,
            order: VersionOrder::default(),
        }
    }

    pub fn with_start_version(mut self, start: u32) -> Self {
        self.start_version = Some(start);
        self
    }

    pub fn with_end_version(mut self, end: u32) -> Self {
        self.end_version = Some(end);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_order(mut self, order: VersionOrder) -> Self {
        self.order = order;
        self
    }

    fn admits(&self, age: u32) -> bool {
        self.start_version.map_or(true, |start| age >= start)
            && self.end_version.map_or(true, |end| age < end)
    }
}

/// Asset storage as seen by contract logic
pub trait Ledger {
    /// Latest version of `id`, if it exists
    fn get(&mut self, id: &str) -> Option<Asset>;

    /// Append a new version of `id`
    fn put(&mut self, id: &str, data: Value);

    fn scan(&mut self, filter: &AssetFilter) -> Vec<Asset>;
}

/// In-memory, append-versioned ledger
#[derive(Debug, Clone, Default)]
pub struct AssetLedger {
    assets: HashMap<String, Vec<Value>>,
}

impl AssetLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for AssetLedger {
    fn get(&mut self, id: &str) -> Option<Asset> {
        let versions = self.assets.get(id)?;
        let data = versions.last()?.clone();
        Some(Asset {
            id: id.to_string(),
            age: (versions.len() - 1) as u32,
            data,
        })
    }

    fn put(&mut self, id: &str, data: Value) {
        tracing::debug!(asset_id = id, "ledger put");
        self.assets.entry(id.to_string()).or_default().push(data);
    }

    fn scan(&mut self, filter: &AssetFilter) -> Vec<Asset> {
        let Some(versions) = self.assets.get(&filter.id) else {
            return Vec::new();
        };

        let mut assets: Vec<Asset> = versions
            .iter()
            .enumerate()
            .map(|(age, data)| (age as u32, data))
            .filter(|(age, _)| filter.admits(*age))
            .map(|(age, data)| Asset {
                id: filter.id.clone(),
                age,
                data: data.clone(),
            })
            .collect();

        if filter.order == VersionOrder::Descending {
            assets.reverse();
        }
        if filter.limit > 0 {
            assets.truncate(filter.limit as usize);
        }
        assets
    }
}
