use attest_core::model::{Identity, NewRisk, RiskStatus, RiskUpdate};
use attest_core::risk::{RiskBanding, Severity};
use attest_core::storage::Store;

fn store() -> anyhow::Result<Store> {
    let store = Store::memory()?;
    store.init_schema()?;
    Ok(store)
}

fn new_risk(title: &str, likelihood: i64, impact: i64) -> NewRisk {
    NewRisk {
        title: title.into(),
        description: format!("{title} description"),
        likelihood,
        impact,
        mitigation: "review quarterly".into(),
        owner: "ciso".into(),
    }
}

#[test]
fn test_score_and_severity_for_every_rating_pair() -> anyhow::Result<()> {
    let store = store()?;
    let alice = Identity::new("alice")?;
    let banding = RiskBanding::DEFAULT;

    for l in 1..=5 {
        for i in 1..=5 {
            let r = store.add_risk(&new_risk(&format!("{l}x{i}"), l, i), &alice)?;
            let score = (l * i) as u8;
            assert_eq!(r.score(), score);
            let expected = if score >= 15 {
                Severity::High
            } else if score >= 8 {
                Severity::Medium
            } else {
                Severity::Low
            };
            assert_eq!(banding.severity_of(&r), expected, "{l}x{i}");
        }
    }

    let conn = store.conn.lock().unwrap();
    let mismatched: i64 = conn.query_row(
        "SELECT COUNT(*) FROM risks WHERE risk_score != likelihood * impact",
        [],
        |r| r.get(0),
    )?;
    assert_eq!(mismatched, 0);
    Ok(())
}

#[test]
fn test_out_of_range_ratings_write_nothing() -> anyhow::Result<()> {
    let store = store()?;
    let alice = Identity::new("alice")?;
    for (l, i) in [(0, 3), (6, 3), (3, 0), (3, 6), (-1, 2)] {
        let err = store.add_risk(&new_risk("bad", l, i), &alice).unwrap_err();
        assert!(err.is_invalid_input(), "{l}x{i}");
    }
    assert!(store
        .add_risk(&new_risk("   ", 3, 3), &alice)
        .unwrap_err()
        .is_invalid_input());
    assert!(store.list_risks()?.is_empty());
    Ok(())
}

#[test]
fn test_register_ordered_by_score_then_newest() -> anyhow::Result<()> {
    let store = store()?;
    let alice = Identity::new("alice")?;
    store.add_risk(&new_risk("low", 2, 3), &alice)?;
    store.add_risk(&new_risk("critical", 5, 5), &alice)?;
    store.add_risk(&new_risk("medium", 3, 3), &alice)?;
    store.add_risk(&new_risk("also low", 3, 2), &alice)?;

    let titles: Vec<_> = store.list_risks()?.into_iter().map(|r| r.title).collect();
    assert_eq!(titles, vec!["critical", "medium", "also low", "low"]);
    Ok(())
}

#[test]
fn test_new_risk_defaults() -> anyhow::Result<()> {
    let store = store()?;
    let r = store.add_risk(&new_risk("Data breach", 5, 3), &Identity::new("alice")?)?;
    assert_eq!(r.status, RiskStatus::Open);
    assert_eq!(r.created_by, "alice");
    assert_eq!(r.created_at, r.updated_at);
    assert_eq!(store.get_risk(r.id)?, r);
    Ok(())
}

#[test]
fn test_update_rescores_and_changes_status() -> anyhow::Result<()> {
    let store = store()?;
    let alice = Identity::new("alice")?;
    let bob = Identity::new("bob")?;
    let r = store.add_risk(&new_risk("Phishing", 4, 4), &alice)?;
    assert_eq!(RiskBanding::DEFAULT.severity_of(&r), Severity::High);

    let updated = store.update_risk(
        r.id,
        &RiskUpdate {
            title: "Phishing".into(),
            description: r.description.clone(),
            likelihood: 2,
            impact: 4,
            mitigation: "awareness training".into(),
            owner: "hr".into(),
            status: RiskStatus::Mitigated,
        },
        &bob,
    )?;
    assert_eq!(updated.score(), 8);
    assert_eq!(RiskBanding::DEFAULT.severity_of(&updated), Severity::Medium);
    assert_eq!(updated.status, RiskStatus::Mitigated);
    assert_eq!(updated.created_by, "alice");
    assert!(updated.updated_at >= r.updated_at);

    let bad = RiskUpdate {
        title: "Phishing".into(),
        likelihood: 9,
        impact: 1,
        ..Default::default()
    };
    assert!(store.update_risk(r.id, &bad, &bob).unwrap_err().is_invalid_input());
    assert_eq!(store.get_risk(r.id)?.score(), 8);

    let missing = RiskUpdate {
        title: "x".into(),
        likelihood: 1,
        impact: 1,
        ..Default::default()
    };
    assert!(store.update_risk(999, &missing, &bob).unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn test_delete_risk() -> anyhow::Result<()> {
    let store = store()?;
    let r = store.add_risk(&new_risk("Fire", 1, 5), &Identity::new("alice")?)?;
    store.delete_risk(r.id)?;
    assert!(store.get_risk(r.id).unwrap_err().is_not_found());
    assert!(store.delete_risk(r.id).unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn test_custom_banding() -> anyhow::Result<()> {
    let store = store()?;
    let r = store.add_risk(&new_risk("Outage", 3, 4), &Identity::new("alice")?)?;
    let strict = RiskBanding {
        high_min: 12,
        medium_min: 6,
    };
    assert_eq!(strict.severity_of(&r), Severity::High);
    assert_eq!(RiskBanding::DEFAULT.severity_of(&r), Severity::Medium);
    Ok(())
}
