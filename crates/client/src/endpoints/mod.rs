//! Per-resource calls, thin wrappers over [`Session`]'s envelope helpers.

mod asn;
mod cachegroup;
mod cdn;
mod deliveryservice_server;
mod ping;
mod status;

use std::time::Duration;

use traffic_ops_core::{
    types::{Alerts, ReqInf, Resource, API_BASE},
    Error,
};

use crate::error::{ClientResult, RequestError};
use crate::session::Session;

/// Percent-encode one path segment.
pub(crate) fn segment(raw: &str) -> String {
    // byte_serialize writes spaces as '+' and a literal '+' as %2B.
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn collection_path<R: Resource>() -> String {
    format!("{}/{}", API_BASE, R::NAME)
}

fn record_path<R: Resource>(key: &str) -> String {
    format!("{}/{}/{}", API_BASE, R::NAME, key)
}

impl Session {
    /// Every record of a resource.
    pub async fn get_all<R: Resource>(&self) -> ClientResult<(Vec<R>, ReqInf)> {
        self.get(&collection_path::<R>()).await
    }

    /// Every record of a resource, served from the cache while younger than `ttl`.
    pub async fn get_all_cached<R: Resource>(&self, ttl: Duration) -> ClientResult<(Vec<R>, ReqInf)> {
        self.get_cached(&collection_path::<R>(), ttl).await
    }

    /// One record by its already-encoded key path.
    pub async fn get_one<R: Resource>(&self, key: &str) -> ClientResult<(R, ReqInf)> {
        let (mut records, info) = self.get::<Vec<R>>(&record_path::<R>(key)).await?;
        match records.pop() {
            Some(record) => Ok((record, info)),
            None => Err(RequestError::new(
                Error::not_found(format!("{} '{}'", R::NAME, key)),
                info.remote_addr,
            )),
        }
    }

    pub async fn create<R: Resource>(&self, record: &R) -> ClientResult<(Alerts, ReqInf)> {
        self.post(&collection_path::<R>(), record).await
    }

    pub async fn update<R: Resource>(&self, key: &str, record: &R) -> ClientResult<(Alerts, ReqInf)> {
        self.put(&record_path::<R>(key), record).await
    }

    pub async fn remove<R: Resource>(&self, key: &str) -> ClientResult<(Alerts, ReqInf)> {
        self.delete(&record_path::<R>(key)).await
    }
}
