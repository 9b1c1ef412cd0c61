use std::time::Duration;

use traffic_ops_core::types::{Alerts, Asn, ReqInf};

use crate::error::ClientResult;
use crate::session::Session;

impl Session {
    pub async fn get_asns(&self) -> ClientResult<(Vec<Asn>, ReqInf)> {
        self.get_all().await
    }

    pub async fn get_asns_cached(&self, ttl: Duration) -> ClientResult<(Vec<Asn>, ReqInf)> {
        self.get_all_cached(ttl).await
    }

    pub async fn get_asn_by_id(&self, id: i64) -> ClientResult<(Asn, ReqInf)> {
        self.get_one(&id.to_string()).await
    }

    /// Create an ASN. Leave `id` at 0 to have the server assign one.
    pub async fn create_asn(&self, asn: &Asn) -> ClientResult<(Alerts, ReqInf)> {
        self.create(asn).await
    }

    pub async fn update_asn_by_id(&self, id: i64, asn: &Asn) -> ClientResult<(Alerts, ReqInf)> {
        self.update(&id.to_string(), asn).await
    }

    pub async fn delete_asn_by_id(&self, id: i64) -> ClientResult<(Alerts, ReqInf)> {
        self.remove::<Asn>(&id.to_string()).await
    }
}
