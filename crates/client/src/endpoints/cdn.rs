use std::time::Duration;

use traffic_ops_core::types::{Alerts, Cdn, ReqInf};

use super::segment;
use crate::error::ClientResult;
use crate::session::Session;

impl Session {
    pub async fn get_cdns(&self) -> ClientResult<(Vec<Cdn>, ReqInf)> {
        self.get_all().await
    }

    pub async fn get_cdns_cached(&self, ttl: Duration) -> ClientResult<(Vec<Cdn>, ReqInf)> {
        self.get_all_cached(ttl).await
    }

    pub async fn get_cdn_by_name(&self, name: &str) -> ClientResult<(Cdn, ReqInf)> {
        self.get_one(&segment(name)).await
    }

    pub async fn create_cdn(&self, cdn: &Cdn) -> ClientResult<(Alerts, ReqInf)> {
        self.create(cdn).await
    }

    pub async fn update_cdn_by_name(&self, name: &str, cdn: &Cdn) -> ClientResult<(Alerts, ReqInf)> {
        self.update(&segment(name), cdn).await
    }

    pub async fn delete_cdn_by_name(&self, name: &str) -> ClientResult<(Alerts, ReqInf)> {
        self.remove::<Cdn>(&segment(name)).await
    }
}
