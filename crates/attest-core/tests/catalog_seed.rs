use attest_core::catalog::CATALOG_SIZE;
use attest_core::model::{Category, ControlStatus};
use attest_core::storage::Store;

fn seeded() -> anyhow::Result<Store> {
    let store = Store::memory()?;
    store.init_schema()?;
    store.seed_controls()?;
    Ok(store)
}

#[test]
fn test_seed_is_idempotent() -> anyhow::Result<()> {
    let store = seeded()?;
    assert_eq!(store.seed_controls()?, 0);
    assert_eq!(store.list_controls(None)?.len(), CATALOG_SIZE);
    Ok(())
}

#[test]
fn test_all_controls_start_unassessed() -> anyhow::Result<()> {
    let store = seeded()?;
    for c in store.list_controls(None)? {
        assert_eq!(c.status, ControlStatus::NotAssessed, "{}", c.control_id);
        assert!(c.assessed_by.is_none());
        assert!(c.assessed_at.is_none());
    }
    Ok(())
}

#[test]
fn test_listing_orders_numeric_segments() -> anyhow::Result<()> {
    let store = seeded()?;
    let ids: Vec<_> = store
        .list_controls(None)?
        .into_iter()
        .map(|c| c.control_id)
        .collect();
    assert_eq!(ids.first().map(String::as_str), Some("A.5.1"));
    assert_eq!(ids.last().map(String::as_str), Some("A.8.34"));

    let pos = |id: &str| ids.iter().position(|x| x == id).unwrap();
    assert!(pos("A.5.2") < pos("A.5.10"));
    assert!(pos("A.5.37") < pos("A.6.1"));
    assert!(pos("A.8.9") < pos("A.8.10"));
    Ok(())
}

#[test]
fn test_category_filter_and_listing() -> anyhow::Result<()> {
    let store = seeded()?;
    let expected = [
        (Category::Organizational, 37),
        (Category::People, 8),
        (Category::Physical, 14),
        (Category::Technological, 34),
    ];
    for (cat, n) in expected {
        let controls = store.list_controls(Some(cat))?;
        assert_eq!(controls.len(), n, "{}", cat);
        assert!(controls.iter().all(|c| c.category == cat));
    }
    assert_eq!(
        store.list_categories()?,
        expected.iter().map(|(c, _)| *c).collect::<Vec<_>>()
    );
    Ok(())
}

#[test]
fn test_unknown_control_is_not_found() -> anyhow::Result<()> {
    let store = seeded()?;
    let err = store.get_control("A.9.1").unwrap_err();
    assert!(err.is_not_found());
    assert!(!store.control_exists("A.9.1")?);
    assert!(store.control_exists("A.8.34")?);
    Ok(())
}
