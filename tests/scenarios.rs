use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use zonekv::{frame, AccessLevel, CredentialRegistry, Error, Operation, Store};

fn fixture(
    tmp: &tempfile::TempDir,
    roots: &[&str],
) -> Result<(Arc<CredentialRegistry>, Store)> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| "warn".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env))
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    let roots: Vec<PathBuf> = roots.iter().map(|name| tmp.path().join(name)).collect();
    let registry = Arc::new(CredentialRegistry::new(&roots)?);
    let store = Store::new(registry.clone());
    Ok((registry, store))
}

#[test]
fn private_namespaces_are_isolated_between_callers() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (registry, store) = fixture(&tmp, &["core"])?;
    let core = tmp.path().join("core");

    {
        let _a = frame::enter(core.join("alpha/lib.rs"));
        registry.register(AccessLevel::ReadWrite)?;
        store.set("x", "1")?;
    }
    {
        let _b = frame::enter(core.join("beta/lib.rs"));
        registry.register(AccessLevel::ReadWrite)?;
        assert_eq!(store.get("x")?, None);
        store.set("x", "2")?;
    }
    {
        let _a = frame::enter(core.join("alpha/lib.rs"));
        assert_eq!(store.get("x")?, Some("1".to_owned()));
    }
    Ok(())
}

#[test]
fn plugin_zone_cannot_escalate() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (registry, store) = fixture(&tmp, &["core", "plugins"])?;
    let _p = frame::enter(tmp.path().join("plugins/p1/main.rs"));

    let err = registry.register(AccessLevel::Admin).unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)));

    registry.register(AccessLevel::ReadOnly)?;
    let err = store.set("k", "v").unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)));
    assert_eq!(store.get("k")?.unwrap_or_default(), "");
    Ok(())
}

#[test]
fn admins_publish_and_plugins_only_read() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (registry, store) = fixture(&tmp, &["core", "plugins"])?;

    {
        let _admin = frame::enter(tmp.path().join("core/control/lib.rs"));
        registry.register(AccessLevel::Admin)?;
        store.readonly_set("cfg", "ON")?;
    }
    {
        let _plugin = frame::enter(tmp.path().join("plugins/p1/main.rs"));
        registry.register(AccessLevel::ReadWrite)?;
        assert_eq!(store.readonly_get("cfg")?, Some("ON".to_owned()));
        let err = store.readonly_set("cfg", "OFF").unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }
    {
        let _admin = frame::enter(tmp.path().join("core/control/lib.rs"));
        assert_eq!(store.readonly_get("cfg")?, Some("ON".to_owned()));
    }
    Ok(())
}

#[test]
fn nested_roots_resolve_to_the_most_specific_zone() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let a = tmp.path().join("a");
    let b = a.join("b");
    let registry = CredentialRegistry::new(&[a.clone(), b.clone()])?;

    let _frame = frame::enter(b.join("mod/x.rs"));
    let credential = registry.register(AccessLevel::ReadWrite)?;
    assert_eq!(credential.zone(), "b");
    assert_eq!(credential.name(), "mod");
    Ok(())
}

#[test]
fn reregistering_invalidates_the_previous_token() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (registry, _store) = fixture(&tmp, &["core"])?;
    let _frame = frame::enter(tmp.path().join("core/alpha/lib.rs"));

    let first = registry.register(AccessLevel::ReadOnly)?;
    let second = registry.register(AccessLevel::ReadWrite)?;
    assert_ne!(first.token(), second.token());
    assert_eq!(registry.count(), 1);
    assert_eq!(registry.token_of()?, second.token());

    let fetched = registry.fetch(Operation::Read)?;
    assert_eq!(fetched.token(), second.token());
    Ok(())
}

#[test]
fn shared_namespace_converges_and_enforces_levels() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (registry, store) = fixture(&tmp, &["core"])?;
    let core = tmp.path().join("core");

    {
        let _a = frame::enter(core.join("alpha/lib.rs"));
        registry.register(AccessLevel::ReadWrite)?;
        store.shared_set("x", "1")?;
    }
    {
        let _b = frame::enter(core.join("beta/lib.rs"));
        registry.register(AccessLevel::ReadOnly)?;
        assert_eq!(store.shared_get("x")?, Some("1".to_owned()));
        let err = store.shared_set("x", "2").unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }
    {
        let _a = frame::enter(core.join("alpha/lib.rs"));
        assert_eq!(store.shared_get("x")?, Some("1".to_owned()));
    }
    Ok(())
}

#[test]
fn calls_without_a_registered_frame_fail_closed() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (registry, store) = fixture(&tmp, &["core"])?;

    // this test file is not under a configured zone root
    let _frame = zonekv::callsite!();
    assert!(matches!(
        registry.register(AccessLevel::ReadOnly).unwrap_err(),
        Error::UnknownCaller
    ));
    assert!(matches!(store.set("k", "v").unwrap_err(), Error::UnknownCaller));
    assert!(!registry.validate(Operation::Read));
    Ok(())
}

#[test]
fn three_zone_deployment_behaves_per_zone() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (registry, store) = fixture(&tmp, &["core", "plugins", "engines"])?;

    {
        let _core = frame::enter(tmp.path().join("core/admin_service/admin.rs"));
        let credential = registry.register(AccessLevel::Admin)?;
        assert_eq!(credential.zone(), "core");
        store.shared_set("global_config", "admin_value")?;
        store.readonly_set("system_config", "readonly_value")?;
    }
    {
        // engines is a trusted zone, escalation is allowed
        let _engine = frame::enter(tmp.path().join("engines/indexer/run.rs"));
        let credential = registry.register(AccessLevel::Admin)?;
        assert_eq!(credential.zone(), "engines");
    }
    {
        let _plugin = frame::enter(tmp.path().join("plugins/user_plugin/plugin.rs"));
        assert!(matches!(
            registry.register(AccessLevel::Admin).unwrap_err(),
            Error::PermissionDenied(_)
        ));
        registry.register(AccessLevel::ReadWrite)?;

        store.shared_set("plugin_data", "plugin_value")?;
        assert_eq!(
            store.shared_get("global_config")?,
            Some("admin_value".to_owned())
        );
        assert_eq!(
            store.readonly_get("system_config")?,
            Some("readonly_value".to_owned())
        );
        assert!(matches!(
            store.readonly_set("plugin_config", "should_fail").unwrap_err(),
            Error::PermissionDenied(_)
        ));
    }
    {
        let _core = frame::enter(tmp.path().join("core/admin_service/admin.rs"));
        assert_eq!(
            store.shared_get("plugin_data")?,
            Some("plugin_value".to_owned())
        );
    }
    assert_eq!(registry.count(), 3);
    Ok(())
}

#[test]
fn write_only_callers_publish_without_reading() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (registry, store) = fixture(&tmp, &["core"])?;
    let _frame = frame::enter(tmp.path().join("core/collector/lib.rs"));
    registry.register(AccessLevel::WriteOnly)?;

    store.shared_set("metric", "42")?;
    assert!(matches!(
        store.shared_get("metric").unwrap_err(),
        Error::PermissionDenied(_)
    ));
    assert!(matches!(
        store.readonly_get("metric").unwrap_err(),
        Error::PermissionDenied(_)
    ));
    Ok(())
}

#[test]
fn shared_state_is_visible_across_threads() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let (registry, store) = fixture(&tmp, &["core"])?;
    let store = Arc::new(store);
    let core = tmp.path().join("core");

    let mut handles = Vec::new();
    for i in 0..4 {
        let registry = registry.clone();
        let store = store.clone();
        let file = core.join(format!("writer{}/lib.rs", i));
        handles.push(std::thread::spawn(move || {
            let _frame = frame::enter(&file);
            registry.register(AccessLevel::ReadWrite).unwrap();
            store
                .shared_set(&format!("slot{}", i), &i.to_string())
                .unwrap();
            store.set("mine", &i.to_string()).unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let _frame = frame::enter(core.join("reader/lib.rs"));
    registry.register(AccessLevel::ReadOnly)?;
    for i in 0..4 {
        assert_eq!(
            store.shared_get(&format!("slot{}", i))?,
            Some(i.to_string())
        );
    }
    // private writes of the workers stay private
    assert_eq!(store.get("mine")?, None);
    assert_eq!(registry.count(), 5);
    Ok(())
}
