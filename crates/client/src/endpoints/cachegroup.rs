use std::time::Duration;

use traffic_ops_core::types::{Alerts, Cachegroup, ReqInf};

use super::segment;
use crate::error::ClientResult;
use crate::session::Session;

impl Session {
    pub async fn get_cachegroups(&self) -> ClientResult<(Vec<Cachegroup>, ReqInf)> {
        self.get_all().await
    }

    pub async fn get_cachegroups_cached(&self, ttl: Duration) -> ClientResult<(Vec<Cachegroup>, ReqInf)> {
        self.get_all_cached(ttl).await
    }

    pub async fn get_cachegroup_by_name(&self, name: &str) -> ClientResult<(Cachegroup, ReqInf)> {
        self.get_one(&segment(name)).await
    }

    pub async fn create_cachegroup(&self, cachegroup: &Cachegroup) -> ClientResult<(Alerts, ReqInf)> {
        self.create(cachegroup).await
    }

    pub async fn update_cachegroup_by_name(
        &self,
        name: &str,
        cachegroup: &Cachegroup,
    ) -> ClientResult<(Alerts, ReqInf)> {
        self.update(&segment(name), cachegroup).await
    }

    pub async fn delete_cachegroup_by_name(&self, name: &str) -> ClientResult<(Alerts, ReqInf)> {
        self.remove::<Cachegroup>(&segment(name)).await
    }
}
