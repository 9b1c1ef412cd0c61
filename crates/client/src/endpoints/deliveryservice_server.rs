use std::time::Duration;

use traffic_ops_core::types::{Alerts, DeliveryServiceServer, ReqInf};

use super::segment;
use crate::error::ClientResult;
use crate::session::Session;

fn pair(deliveryservice: &str, server: &str) -> String {
    format!("{}/{}", segment(deliveryservice), segment(server))
}

impl Session {
    pub async fn get_deliveryservice_servers(&self) -> ClientResult<(Vec<DeliveryServiceServer>, ReqInf)> {
        self.get_all().await
    }

    pub async fn get_deliveryservice_servers_cached(
        &self,
        ttl: Duration,
    ) -> ClientResult<(Vec<DeliveryServiceServer>, ReqInf)> {
        self.get_all_cached(ttl).await
    }

    pub async fn get_deliveryservice_server(
        &self,
        deliveryservice: &str,
        server: &str,
    ) -> ClientResult<(DeliveryServiceServer, ReqInf)> {
        self.get_one(&pair(deliveryservice, server)).await
    }

    /// Assign a server to a delivery service.
    pub async fn create_deliveryservice_server(
        &self,
        assignment: &DeliveryServiceServer,
    ) -> ClientResult<(Alerts, ReqInf)> {
        self.create(assignment).await
    }

    pub async fn delete_deliveryservice_server(
        &self,
        deliveryservice: &str,
        server: &str,
    ) -> ClientResult<(Alerts, ReqInf)> {
        self.remove::<DeliveryServiceServer>(&pair(deliveryservice, server)).await
    }
}
