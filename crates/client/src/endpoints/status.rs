use std::time::Duration;

use traffic_ops_core::types::{Alerts, ReqInf, Status};

use crate::error::ClientResult;
use crate::session::Session;

impl Session {
    pub async fn get_statuses(&self) -> ClientResult<(Vec<Status>, ReqInf)> {
        self.get_all().await
    }

    pub async fn get_statuses_cached(&self, ttl: Duration) -> ClientResult<(Vec<Status>, ReqInf)> {
        self.get_all_cached(ttl).await
    }

    pub async fn get_status_by_id(&self, id: i64) -> ClientResult<(Status, ReqInf)> {
        self.get_one(&id.to_string()).await
    }

    /// Create a status. Leave `id` at 0 to have the server assign one.
    pub async fn create_status(&self, status: &Status) -> ClientResult<(Alerts, ReqInf)> {
        self.create(status).await
    }

    pub async fn update_status_by_id(&self, id: i64, status: &Status) -> ClientResult<(Alerts, ReqInf)> {
        self.update(&id.to_string(), status).await
    }

    pub async fn delete_status_by_id(&self, id: i64) -> ClientResult<(Alerts, ReqInf)> {
        self.remove::<Status>(&id.to_string()).await
    }
}
