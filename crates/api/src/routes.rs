//! The route table served by Traffic Ops.

use traffic_ops_core::{
    types::{ApiMethod, Asn, Cachegroup, Cdn, DeliveryServiceServer, Int64Keyed, NameKeyed, PairKeyed, Status},
    Result,
};

use crate::dispatch::{self, DispatchTable, DispatchTableBuilder};
use crate::handlers;

fn int64_resource<R: Int64Keyed>(builder: DispatchTableBuilder) -> DispatchTableBuilder {
    let keyed = format!("{}/{{key}}", R::NAME);
    builder
        .route(R::NAME, ApiMethod::Get, dispatch::empty(handlers::list_by_id::<R>))
        .route(R::NAME, ApiMethod::Post, dispatch::body(handlers::create_with_id::<R>))
        .route(keyed.clone(), ApiMethod::Get, dispatch::int64_key(handlers::get_by_id::<R>))
        .route(keyed.clone(), ApiMethod::Put, dispatch::int64_key_body(handlers::update_by_id::<R>))
        .route(keyed, ApiMethod::Delete, dispatch::int64_key(handlers::delete_by_id::<R>))
}

fn named_resource<R: NameKeyed>(builder: DispatchTableBuilder) -> DispatchTableBuilder {
    let keyed = format!("{}/{{key}}", R::NAME);
    builder
        .route(R::NAME, ApiMethod::Get, dispatch::empty(handlers::list::<R>))
        .route(R::NAME, ApiMethod::Post, dispatch::body(handlers::create::<R>))
        .route(keyed.clone(), ApiMethod::Get, dispatch::string_key(handlers::get_by_name::<R>))
        .route(keyed.clone(), ApiMethod::Put, dispatch::string_key_body(handlers::update_by_name::<R>))
        .route(keyed, ApiMethod::Delete, dispatch::string_key(handlers::delete_by_name::<R>))
}

fn pair_resource<R: PairKeyed>(builder: DispatchTableBuilder) -> DispatchTableBuilder {
    let keyed = format!("{}/{{key0}}/{{key1}}", R::NAME);
    builder
        .route(R::NAME, ApiMethod::Get, dispatch::empty(handlers::list::<R>))
        .route(R::NAME, ApiMethod::Post, dispatch::body(handlers::create::<R>))
        .route(keyed.clone(), ApiMethod::Get, dispatch::string_string_keys(handlers::get_pair::<R>))
        .route(keyed, ApiMethod::Delete, dispatch::string_string_keys(handlers::delete_pair::<R>))
}

/// Build the full table of resource routes.
pub fn default_table() -> Result<DispatchTable> {
    let builder = DispatchTable::builder();
    let builder = named_resource::<Cdn>(builder);
    let builder = int64_resource::<Asn>(builder);
    let builder = named_resource::<Cachegroup>(builder);
    let builder = int64_resource::<Status>(builder);
    let builder = pair_resource::<DeliveryServiceServer>(builder);
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_resource_is_registered() {
        let table = default_table().unwrap();
        assert_eq!(table.len(), 24);

        let paths: Vec<&str> = table.paths().collect();
        assert_eq!(paths[0], "cdn");
        assert_eq!(paths[1], "cdn/{key}");
        assert!(paths.contains(&"deliveryservice_server/{key0}/{key1}"));

        assert_eq!(
            table.allowed_methods("asn/{key}").unwrap().to_string(),
            "GET,PUT,DELETE"
        );
        assert_eq!(table.allowed_methods("status").unwrap().to_string(), "GET,POST");
    }
}
