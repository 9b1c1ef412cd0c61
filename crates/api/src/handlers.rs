//! Generic CRUD handlers shared by every resource type.
//!
//! Each function has one of the typed signatures the adapters in
//! [`crate::dispatch`] understand; `routes` wires them per resource.

use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use traffic_ops_core::{
    traits::Datastore,
    types::{composite_key, HandlerOutput, Int64Keyed, NameKeyed, PairKeyed, Resource},
    Error, Result,
};

fn decode<R: Resource>(body: &Bytes) -> Result<R> {
    serde_json::from_slice(body)
        .map_err(|e| Error::invalid_request(format!("malformed {} body: {}", R::NAME, e)))
}

fn from_doc<R: Resource>(doc: Value) -> Result<R> {
    serde_json::from_value(doc)
        .map_err(|e| Error::storage(format!("corrupt {} record: {}", R::NAME, e)))
}

async fn fetch<R: Resource>(store: &dyn Datastore, key: &str) -> Result<HandlerOutput<R>> {
    match store.get(R::NAME, key).await? {
        Some(doc) => Ok(HandlerOutput::Collection(vec![from_doc(doc)?])),
        None => Err(Error::not_found(format!("{} '{}'", R::NAME, key))),
    }
}

async fn persist_new<R: Resource>(store: &dyn Datastore, mut record: R) -> Result<HandlerOutput<R>> {
    record.validate()?;
    record.stamp(Utc::now());

    let key = record.key();
    let rows = store
        .insert(R::NAME, &key, serde_json::to_value(&record)?)
        .await?;
    if rows == 0 {
        return Err(Error::validation(format!("{} '{}' already exists", R::NAME, key)));
    }

    tracing::info!(resource = R::NAME, key = %key, "Created record");
    Ok(HandlerOutput::Mutation {
        rows_affected: rows,
        record: Some(record),
    })
}

async fn replace<R: Resource>(store: &dyn Datastore, mut record: R) -> Result<HandlerOutput<R>> {
    record.validate()?;
    record.stamp(Utc::now());

    let key = record.key();
    let rows = store
        .update(R::NAME, &key, serde_json::to_value(&record)?)
        .await?;
    if rows == 0 {
        return Err(Error::not_found(format!("{} '{}'", R::NAME, key)));
    }

    tracing::info!(resource = R::NAME, key = %key, "Updated record");
    Ok(HandlerOutput::Mutation {
        rows_affected: rows,
        record: Some(record),
    })
}

async fn remove<R: Resource>(store: &dyn Datastore, key: &str) -> Result<HandlerOutput<R>> {
    let rows = store.delete(R::NAME, key).await?;
    if rows == 0 {
        return Err(Error::not_found(format!("{} '{}'", R::NAME, key)));
    }

    tracing::info!(resource = R::NAME, key = key, "Deleted record");
    Ok(HandlerOutput::Mutation {
        rows_affected: rows,
        record: None,
    })
}

// =============================================================================
// Collection
// =============================================================================

async fn load_all<R: Resource>(store: &dyn Datastore) -> Result<Vec<R>> {
    store
        .list(R::NAME)
        .await?
        .into_iter()
        .map(from_doc)
        .collect()
}

/// `GET {resource}`: every record, ordered by key.
pub async fn list<R: Resource>(store: Arc<dyn Datastore>) -> Result<HandlerOutput<R>> {
    Ok(HandlerOutput::Collection(load_all(store.as_ref()).await?))
}

/// `GET {resource}` for id-keyed records, in numeric id order.
pub async fn list_by_id<R: Int64Keyed>(store: Arc<dyn Datastore>) -> Result<HandlerOutput<R>> {
    let mut records: Vec<R> = load_all(store.as_ref()).await?;
    records.sort_by_key(|r| r.id());
    Ok(HandlerOutput::Collection(records))
}

/// `POST {resource}` for id-keyed records. An id of 0 is replaced by the
/// next id from the store; an explicit id pushes the sequence past it.
pub async fn create_with_id<R: Int64Keyed>(body: Bytes, store: Arc<dyn Datastore>) -> Result<HandlerOutput<R>> {
    let mut record: R = decode(&body)?;
    match record.id() {
        0 => record.set_id(store.next_id(R::NAME).await?),
        id => store.observe_id(R::NAME, id).await?,
    }
    persist_new(store.as_ref(), record).await
}

/// `POST {resource}` for records keyed by their own fields.
pub async fn create<R: Resource>(body: Bytes, store: Arc<dyn Datastore>) -> Result<HandlerOutput<R>> {
    let record: R = decode(&body)?;
    persist_new(store.as_ref(), record).await
}

// =============================================================================
// Int64 keyed
// =============================================================================

pub async fn get_by_id<R: Int64Keyed>(id: i64, store: Arc<dyn Datastore>) -> Result<HandlerOutput<R>> {
    fetch(store.as_ref(), &id.to_string()).await
}

/// The id in the path wins over any id in the body.
pub async fn update_by_id<R: Int64Keyed>(id: i64, body: Bytes, store: Arc<dyn Datastore>) -> Result<HandlerOutput<R>> {
    let mut record: R = decode(&body)?;
    record.set_id(id);
    replace(store.as_ref(), record).await
}

pub async fn delete_by_id<R: Int64Keyed>(id: i64, store: Arc<dyn Datastore>) -> Result<HandlerOutput<R>> {
    remove::<R>(store.as_ref(), &id.to_string()).await
}

// =============================================================================
// Name keyed
// =============================================================================

pub async fn get_by_name<R: NameKeyed>(name: String, store: Arc<dyn Datastore>) -> Result<HandlerOutput<R>> {
    fetch(store.as_ref(), &name).await
}

/// Renames are not supported: the path name is written into the record.
pub async fn update_by_name<R: NameKeyed>(name: String, body: Bytes, store: Arc<dyn Datastore>) -> Result<HandlerOutput<R>> {
    let mut record: R = decode(&body)?;
    record.set_name(name);
    replace(store.as_ref(), record).await
}

pub async fn delete_by_name<R: NameKeyed>(name: String, store: Arc<dyn Datastore>) -> Result<HandlerOutput<R>> {
    remove::<R>(store.as_ref(), &name).await
}

// =============================================================================
// Pair keyed
// =============================================================================

pub async fn get_pair<R: PairKeyed>(key0: String, key1: String, store: Arc<dyn Datastore>) -> Result<HandlerOutput<R>> {
    fetch(store.as_ref(), &composite_key(&key0, &key1)).await
}

pub async fn delete_pair<R: PairKeyed>(key0: String, key1: String, store: Arc<dyn Datastore>) -> Result<HandlerOutput<R>> {
    remove::<R>(store.as_ref(), &composite_key(&key0, &key1)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_ops_core::types::{Asn, Cdn, DeliveryServiceServer};
    use traffic_ops_store::InMemoryDatastore;

    fn store() -> Arc<dyn Datastore> {
        Arc::new(InMemoryDatastore::new())
    }

    fn body(v: serde_json::Value) -> Bytes {
        Bytes::from(v.to_string())
    }

    #[tokio::test]
    async fn create_assigns_ids_in_sequence() {
        let store = store();
        for n in [64512u32, 64513] {
            create_with_id::<Asn>(body(serde_json::json!({"asn": n, "cachegroup": "cg1"})), store.clone())
                .await
                .unwrap();
        }

        let HandlerOutput::Collection(all) = list::<Asn>(store.clone()).await.unwrap() else {
            panic!("expected a collection");
        };
        assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(all.iter().all(|a| a.last_updated.is_some()));
    }

    #[tokio::test]
    async fn explicit_ids_are_skipped_by_the_sequence() {
        let store = store();
        create_with_id::<Asn>(body(serde_json::json!({"id": 1, "asn": 64512, "cachegroup": "cg1"})), store.clone())
            .await
            .unwrap();
        create_with_id::<Asn>(body(serde_json::json!({"id": 5, "asn": 64515, "cachegroup": "cg1"})), store.clone())
            .await
            .unwrap();

        let created = create_with_id::<Asn>(body(serde_json::json!({"asn": 64516, "cachegroup": "cg1"})), store.clone())
            .await
            .unwrap();
        let HandlerOutput::Mutation { record: Some(record), .. } = created else {
            panic!("expected a created record");
        };
        assert_eq!(record.id, 6);
    }

    #[tokio::test]
    async fn id_keyed_listings_are_in_numeric_order() {
        let store = store();
        for id in [10, 2, 1] {
            create_with_id::<Asn>(
                body(serde_json::json!({"id": id, "asn": 64500 + id, "cachegroup": "cg1"})),
                store.clone(),
            )
            .await
            .unwrap();
        }

        let HandlerOutput::Collection(all) = list_by_id::<Asn>(store).await.unwrap() else {
            panic!("expected a collection");
        };
        assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2, 10]);
    }

    #[tokio::test]
    async fn malformed_body_names_the_resource() {
        let err = create::<Cdn>(Bytes::from_static(b"{\"name\":"), store())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(err.to_string().contains("malformed cdn body"));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = store();
        let cdn = serde_json::json!({"name": "cdn1", "domainName": "example.com"});
        create::<Cdn>(body(cdn.clone()), store.clone()).await.unwrap();
        let err = create::<Cdn>(body(cdn), store).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn update_and_delete_missing_records_are_not_found() {
        let store = store();
        let cdn = serde_json::json!({"name": "ignored", "domainName": "example.com"});
        let err = update_by_name::<Cdn>("cdn9".into(), body(cdn), store.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = delete_by_id::<Asn>(3, store).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn pair_records_round_trip_through_the_store() {
        let store = store();
        create::<DeliveryServiceServer>(
            body(serde_json::json!({"deliveryservice": "demo1", "server": "edge01"})),
            store.clone(),
        )
        .await
        .unwrap();

        let found = get_pair::<DeliveryServiceServer>("demo1".into(), "edge01".into(), store.clone())
            .await
            .unwrap();
        assert!(matches!(found, HandlerOutput::Collection(ref v) if v.len() == 1));

        let deleted = delete_pair::<DeliveryServiceServer>("demo1".into(), "edge01".into(), store.clone())
            .await
            .unwrap();
        assert_eq!(
            deleted,
            HandlerOutput::Mutation {
                rows_affected: 1,
                record: None
            }
        );
    }
}
