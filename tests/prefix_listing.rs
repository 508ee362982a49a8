//! Prefix listing is a raw string comparison, not segment-aware.

use pathvault::{generate_key, EnvelopeCipher, Principal, SecretStore};

fn seeded() -> SecretStore {
    let store = SecretStore::in_memory(EnvelopeCipher::new(generate_key().unwrap()).unwrap());
    let admin = Principal::from("admin");
    for path in ["/db/user", "/dbadmin/user", "/database/user", "/app/key"] {
        store.create(path, "v", &admin).unwrap();
    }
    store
}

fn paths(store: &SecretStore, prefix: &str) -> Vec<String> {
    store
        .list_by_prefix(prefix, &"reader".into())
        .unwrap()
        .into_iter()
        .map(|r| r.path)
        .collect()
}

#[test]
fn test_prefix_crosses_segment_boundaries() {
    let store = seeded();

    // "/db" is not treated as a directory: "/dbadmin/user" matches too.
    assert_eq!(paths(&store, "/db"), vec!["/db/user", "/dbadmin/user"]);

    // A trailing slash is how a caller asks for one segment.
    assert_eq!(paths(&store, "/db/"), vec!["/db/user"]);

    // Raw comparison: "/database" does not start with "/db".
    assert_eq!(paths(&store, "/da"), vec!["/database/user"]);
}

#[test]
fn test_empty_and_root_prefix_list_everything() {
    let store = seeded();
    assert_eq!(paths(&store, "").len(), 4);
    assert_eq!(paths(&store, "/").len(), 4);
}

#[test]
fn test_listing_is_stable() {
    let store = seeded();
    assert_eq!(paths(&store, "/"), paths(&store, "/"));
    assert!(paths(&store, "/nothing-here").is_empty());
}

#[test]
fn test_listing_reflects_deletes() {
    let store = seeded();
    let admin = Principal::from("admin");
    let victim = store.get_by_path("/db/user", &admin).unwrap();
    store.delete(&victim.id, &admin).unwrap();

    assert_eq!(paths(&store, "/db"), vec!["/dbadmin/user"]);
}
