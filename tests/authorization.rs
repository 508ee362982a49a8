//! Capability gating: denials happen first and leave the store untouched.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pathvault::policy::{self, Target};
use pathvault::{
    generate_key, Capability, EnvelopeCipher, InMemoryBackend, Principal,
    PrivilegedPrincipalPolicy, SecretId, SecretStore, VaultError,
};

fn cipher() -> EnvelopeCipher {
    EnvelopeCipher::new(generate_key().unwrap()).unwrap()
}

fn denied(result: Result<impl Sized, VaultError>, capability: Capability) -> bool {
    matches!(
        result,
        Err(VaultError::PermissionDenied { capability: c, .. }) if c == capability
    )
}

#[test]
fn test_non_privileged_writes_are_denied_without_effect() {
    let store = SecretStore::in_memory(cipher());
    let admin = Principal::from("admin");
    let bob = Principal::from("bob");

    let original = store.create("/team/api", "v1", &admin).unwrap();

    assert!(denied(store.create("/team/other", "x", &bob), Capability::Write));
    assert!(denied(store.update(&original.id, "hijacked", &bob), Capability::Write));
    assert!(denied(store.delete(&original.id, &bob), Capability::Delete));

    // Reads and listings are open to everyone under the reference policy.
    let listed = store.list_by_prefix("/team", &bob).unwrap();
    assert_eq!(listed.len(), 1);
    let current = store.get_by_id(&original.id, &bob).unwrap();
    assert_eq!(current, original);
    assert_eq!(
        store.cipher().decrypt(&current.envelope).unwrap().as_str(),
        "v1"
    );
}

#[test]
fn test_denied_delete_of_missing_record_reports_denial() {
    let store = SecretStore::in_memory(cipher());
    let ghost = SecretId::from(uuid::Uuid::nil());

    // The capability check wins over the existence check.
    assert!(denied(store.delete(&ghost, &"bob".into()), Capability::Delete));
    assert!(matches!(
        store.delete(&ghost, &"admin".into()),
        Err(VaultError::NotFound(_))
    ));
}

#[test]
fn test_custom_privileged_principal() {
    let store = SecretStore::new(
        cipher(),
        InMemoryBackend::new(),
        PrivilegedPrincipalPolicy::new("ops-bot"),
    );

    assert!(denied(store.create("/a", "1", &"admin".into()), Capability::Write));
    assert!(store.create("/a", "1", &"ops-bot".into()).is_ok());
}

#[test]
fn test_policy_substitution_sees_targets_and_capabilities() {
    // Team members may write under their own prefix only.
    let scoped = policy::from_fn(|principal, target, capability| match capability {
        Capability::Read | Capability::List => true,
        Capability::Write | Capability::Delete => match target {
            Target::Path(path) => path.starts_with(&format!("/{}/", principal)),
            Target::Id(_) | Target::Prefix(_) => principal.as_str() == "root",
        },
    });
    let store = SecretStore::new(cipher(), InMemoryBackend::new(), scoped);

    assert!(store.create("/alice/key", "a", &"alice".into()).is_ok());
    assert!(denied(store.create("/bob/key", "b", &"alice".into()), Capability::Write));
}

#[test]
fn test_policy_consulted_once_per_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let counting = policy::from_fn(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        true
    });
    let store = SecretStore::new(cipher(), InMemoryBackend::new(), counting);
    let anyone = Principal::from("anyone");

    let created = store.create("/x", "1", &anyone).unwrap();
    store.get_by_id(&created.id, &anyone).unwrap();
    store.get_by_id(&created.id, &anyone).unwrap();

    // No decision is cached between calls.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_list_denial() {
    let no_list = policy::from_fn(|_, _, capability| capability != Capability::List);
    let store = SecretStore::new(cipher(), InMemoryBackend::new(), no_list);
    assert!(denied(store.list_by_prefix("/", &"anyone".into()), Capability::List));
}
