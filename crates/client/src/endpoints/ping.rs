use serde_json::Value;

use traffic_ops_core::types::{ReqInf, API_BASE};

use crate::error::{ClientResult, RequestError};
use crate::session::Session;

impl Session {
    /// `GET /api/2.0/ping`. Works without logging in.
    pub async fn ping(&self) -> ClientResult<(Value, ReqInf)> {
        let path = format!("{}/ping", API_BASE);
        let (bytes, info) = self.request(reqwest::Method::GET, &path, None).await?;
        let body = serde_json::from_slice(&bytes)
            .map_err(|e| RequestError::new(e.into(), info.remote_addr))?;
        Ok((body, info))
    }
}
