use caseschema::audit::{EntityChangeObserver, FlatMap, InMemoryAuditPublisher};
use caseschema::{
    Attribute, AttributeType, ComputedAttribute, DynamicEntity, Result, SchemaRegistry, diff,
    diff_entities, flatten_excluding_computed,
};
use chrono::NaiveDate;

fn registry() -> Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry.define_schema(
        "Person",
        vec![
            Attribute::new("name", AttributeType::String),
            Attribute::new("birthDate", AttributeType::Date),
        ],
        vec![ComputedAttribute::new("age", AttributeType::Integer, "years_since(birthDate)")?],
        vec![],
    )?;
    registry.define_schema(
        "Household",
        vec![
            Attribute::new("head", AttributeType::entity("Person")),
            Attribute::new("city", AttributeType::String),
        ],
        vec![ComputedAttribute::new("age", AttributeType::Integer, "1")?],
        vec![],
    )?;
    registry.define_schema(
        "Application",
        vec![
            Attribute::new("household", AttributeType::entity("Household")),
            Attribute::new("status", AttributeType::String),
        ],
        vec![],
        vec![],
    )?;
    Ok(registry)
}

fn map(entries: &[(&str, &str)]) -> FlatMap {
    entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn application(registry: &SchemaRegistry) -> Result<DynamicEntity> {
    let mut app = DynamicEntity::new(registry.get("Application")?);
    app.set("status", "draft")?;
    app.set_or_create("household.city", "Lyon")?;
    app.set_or_create("household.head.name", "Ada")?;
    app.set_or_create(
        "household.head.birthDate",
        NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
    )?;
    Ok(app)
}

#[test]
fn test_flatten_excludes_computed_at_every_depth() -> Result<()> {
    let registry = registry()?;
    let app = application(&registry)?;

    let flat = flatten_excluding_computed(&app);
    assert_eq!(
        flat,
        map(&[
            ("household.city", "Lyon"),
            ("household.head.birthDate", "1990-04-02"),
            ("household.head.name", "Ada"),
            ("status", "draft"),
        ])
    );
    assert!(flat.keys().all(|key| !key.ends_with("age")));
    Ok(())
}

#[test]
fn test_diff_is_idempotent_and_symmetric() -> Result<()> {
    let samples = [
        map(&[]),
        map(&[("a", "1"), ("b", ""), ("c", "x")]),
        map(&[("a", "2"), ("c", "x"), ("d", "new")]),
        map(&[("b", "filled"), ("e", " ")]),
    ];

    for m in &samples {
        assert!(diff(m, m).is_empty());
    }
    for before in &samples {
        for after in &samples {
            let forward = diff(before, after);
            let backward = diff(after, before);
            assert_eq!(forward, backward.swapped());
        }
    }
    Ok(())
}

#[test]
fn test_entity_changes() -> Result<()> {
    let registry = registry()?;
    let before = application(&registry)?;
    let mut after = before.clone();
    after.set("status", "submitted")?;
    after.set("household.city", "")?;
    after.set("household.head.name", Option::<String>::None)?;

    let changes = diff_entities(&before, &after);
    assert_eq!(
        changes.changed().collect::<Vec<_>>(),
        vec![("status", "draft", "submitted")]
    );
    assert_eq!(
        changes.removed().collect::<Vec<_>>(),
        vec![("household.city", "Lyon"), ("household.head.name", "Ada")]
    );
    assert_eq!(changes.added().count(), 0);
    assert!(diff_entities(&after, &after).is_empty());
    Ok(())
}

#[test]
fn test_observer_publishes_only_changes() -> Result<()> {
    let registry = registry()?;
    let publisher = InMemoryAuditPublisher::new();
    let mut entity = application(&registry)?;
    let mut observer = EntityChangeObserver::new();

    observer.capture_before(&entity);
    assert!(!observer.finish_and_publish(&entity, "APP-1", "TRANSACTION_UPDATED", &publisher)?);

    observer.capture_before(&entity);
    entity.set("household.city", "Paris")?;
    assert!(observer.finish_and_publish(&entity, "APP-1", "TRANSACTION_UPDATED", &publisher)?);

    let events = publisher.events()?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].before, map(&[("household.city", "Lyon")]));
    assert_eq!(events[0].after, map(&[("household.city", "Paris")]));

    let as_json = serde_json::to_value(&events[0])?;
    assert_eq!(as_json["subjectId"], "APP-1");
    Ok(())
}
