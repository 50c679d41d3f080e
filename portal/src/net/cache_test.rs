use super::*;

fn page_key(resource: &str, page: &str) -> QueryKey {
    QueryKey::with_params(resource, &[("page".to_owned(), page.to_owned())])
}

#[test]
fn put_then_get_returns_value() {
    let cache = QueryCache::new(Duration::from_secs(60));
    cache.put(page_key("trips", "1"), serde_json::json!({"data": []}));
    assert_eq!(cache.get(&page_key("trips", "1")), Some(serde_json::json!({"data": []})));
    assert_eq!(cache.get(&page_key("trips", "2")), None);
}

#[test]
fn invalidate_drops_every_param_combination_of_resource() {
    let cache = QueryCache::new(Duration::from_secs(60));
    cache.put(page_key("events", "1"), serde_json::json!(1));
    cache.put(page_key("events", "2"), serde_json::json!(2));
    cache.put(QueryKey::new("inboxes"), serde_json::json!(3));

    assert_eq!(cache.invalidate("events"), 2);
    assert_eq!(cache.len(), 1);
    assert!(cache.get(&QueryKey::new("inboxes")).is_some());
}

#[test]
fn invalidate_unknown_resource_is_noop() {
    let cache = QueryCache::new(Duration::from_secs(60));
    cache.put(QueryKey::new("messages"), serde_json::json!([]));
    assert_eq!(cache.invalidate("message"), 0);
    assert_eq!(cache.len(), 1);
}

#[test]
fn zero_ttl_disables_storage() {
    let cache = QueryCache::new(Duration::ZERO);
    cache.put(QueryKey::new("trips"), serde_json::json!([]));
    assert!(cache.is_empty());
    assert_eq!(cache.get(&QueryKey::new("trips")), None);
}

#[test]
fn expired_entry_is_evicted_on_read() {
    let cache = QueryCache::new(Duration::from_millis(1));
    cache.put(QueryKey::new("trips"), serde_json::json!([]));
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(cache.get(&QueryKey::new("trips")), None);
    assert!(cache.is_empty());
}

#[test]
fn clones_share_entries() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let other = cache.clone();
    other.put(QueryKey::new("kiosks"), serde_json::json!([]));
    assert_eq!(cache.len(), 1);
    cache.clear();
    assert!(other.is_empty());
}

#[test]
fn put_prunes_expired_entries_of_other_keys() {
    let cache = QueryCache::new(Duration::from_millis(20));
    cache.put(page_key("trips", "1"), serde_json::json!(1));
    cache.put(page_key("bookings", "4"), serde_json::json!(4));
    std::thread::sleep(Duration::from_millis(40));

    cache.put(page_key("trips", "2"), serde_json::json!(2));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&page_key("trips", "2")), Some(serde_json::json!(2)));
}
