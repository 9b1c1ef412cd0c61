//! Records served by the API and consumed by the client.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Error, Result};

/// A record type stored under one collection name.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name. Also the route prefix, e.g. `cdn` and `cdn/{key}`.
    const NAME: &'static str;

    /// Key the record is stored under.
    fn key(&self) -> String;

    /// Check required fields before a create or update is persisted.
    fn validate(&self) -> Result<()>;

    /// Record the time of the last write.
    fn stamp(&mut self, _now: DateTime<Utc>) {}
}

/// Records addressed by an integral id that the store may assign.
pub trait Int64Keyed: Resource {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

/// Records addressed by a unique name.
pub trait NameKeyed: Resource {
    fn set_name(&mut self, name: String);
}

/// Records addressed by two string keys (association tables).
pub trait PairKeyed: Resource {
    fn set_pair(&mut self, key0: String, key1: String);
}

/// Store key of a two-part record.
pub fn composite_key(key0: &str, key1: &str) -> String {
    format!("{}/{}", key0, key1)
}

fn require(field: &str, value: &str, resource: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{}: '{}' cannot be blank", resource, field)));
    }
    Ok(())
}

/// A content delivery network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cdn {
    pub name: String,
    pub domain_name: String,
    #[serde(default)]
    pub dnssec_enabled: bool,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Resource for Cdn {
    const NAME: &'static str = "cdn";

    fn key(&self) -> String {
        self.name.clone()
    }

    fn validate(&self) -> Result<()> {
        require("name", &self.name, Self::NAME)?;
        require("domainName", &self.domain_name, Self::NAME)?;
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::validation(format!(
                "cdn: 'name' can only contain alphanumerics, '-' and '_': {}",
                self.name
            )));
        }
        Ok(())
    }

    fn stamp(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(now);
    }
}

impl NameKeyed for Cdn {
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// An autonomous system number mapped to a cache group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asn {
    #[serde(default)]
    pub id: i64,
    pub asn: u32,
    pub cachegroup: String,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Resource for Asn {
    const NAME: &'static str = "asn";

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn validate(&self) -> Result<()> {
        if self.asn == 0 {
            return Err(Error::validation("asn: 'asn' must be a positive number"));
        }
        require("cachegroup", &self.cachegroup, Self::NAME)
    }

    fn stamp(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(now);
    }
}

impl Int64Keyed for Asn {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// A group of caches sharing a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cachegroup {
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub parent_cachegroup: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Resource for Cachegroup {
    const NAME: &'static str = "cachegroup";

    fn key(&self) -> String {
        self.name.clone()
    }

    fn validate(&self) -> Result<()> {
        require("name", &self.name, Self::NAME)?;
        require("shortName", &self.short_name, Self::NAME)?;
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(Error::validation(format!(
                    "cachegroup: 'latitude' must be a number between -90 and 90, got {}",
                    lat
                )));
            }
        }
        if let Some(lon) = self.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(Error::validation(format!(
                    "cachegroup: 'longitude' must be a number between -180 and 180, got {}",
                    lon
                )));
            }
        }
        Ok(())
    }

    fn stamp(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(now);
    }
}

impl NameKeyed for Cachegroup {
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

/// A server status such as `ONLINE` or `REPORTED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Resource for Status {
    const NAME: &'static str = "status";

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn validate(&self) -> Result<()> {
        require("name", &self.name, Self::NAME)
    }

    fn stamp(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(now);
    }
}

impl Int64Keyed for Status {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// Assignment of a server to a delivery service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryServiceServer {
    pub deliveryservice: String,
    pub server: String,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Resource for DeliveryServiceServer {
    const NAME: &'static str = "deliveryservice_server";

    fn key(&self) -> String {
        composite_key(&self.deliveryservice, &self.server)
    }

    fn validate(&self) -> Result<()> {
        require("deliveryservice", &self.deliveryservice, Self::NAME)?;
        require("server", &self.server, Self::NAME)
    }

    fn stamp(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(now);
    }
}

impl PairKeyed for DeliveryServiceServer {
    fn set_pair(&mut self, key0: String, key1: String) {
        self.deliveryservice = key0;
        self.server = key1;
    }
}
