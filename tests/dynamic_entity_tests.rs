use caseschema::{
    Attribute, AttributeType, ComputedAttribute, DynamicEntity, Result, SchemaError,
    SchemaRegistry, ValidatorConfig, Value,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

fn registry() -> Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry.define_schema(
        "Member",
        vec![
            Attribute::new("name", AttributeType::String),
            Attribute::new("birthDate", AttributeType::Date),
        ],
        vec![ComputedAttribute::new(
            "age",
            AttributeType::Integer,
            "years_since(birthDate)",
        )?],
        vec![],
    )?;
    registry.define_schema(
        "Household",
        vec![
            Attribute::new("head", AttributeType::entity("Member")),
            Attribute::new("members", AttributeType::list_of(AttributeType::entity("Member"))),
            Attribute::new("monthlyRent", AttributeType::Decimal),
            Attribute::new("rooms", AttributeType::Integer),
            Attribute::new("verified", AttributeType::Boolean),
        ],
        vec![ComputedAttribute::new(
            "rentPerRoom",
            AttributeType::Decimal,
            "monthlyRent / rooms",
        )?],
        vec![],
    )?;
    Ok(registry)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_set_get_round_trip() -> Result<()> {
    let registry = registry()?;
    let mut household = DynamicEntity::new(registry.get("Household")?);

    let cases: Vec<(&str, Value)> = vec![
        ("monthlyRent", Value::Decimal(Decimal::from_str("950.40").unwrap())),
        ("rooms", Value::Integer(3)),
        ("verified", Value::Boolean(true)),
        ("head.name", Value::from("Ada")),
        ("head.birthDate", Value::Date(date(1990, 5, 1))),
    ];

    for (path, value) in cases {
        household.set_or_create(path, value.clone())?;
        assert_eq!(household.get(path)?, value, "{path}");
    }
    Ok(())
}

#[test]
fn test_type_mismatch_leaves_entity_unchanged() -> Result<()> {
    let registry = registry()?;
    let mut household = DynamicEntity::new(registry.get("Household")?);
    household.set("rooms", 2i64)?;
    household.set_or_create("head.name", "Ada")?;
    let snapshot = household.clone();

    let attempts: Vec<(&str, Value)> = vec![
        ("rooms", Value::from("3")),
        ("rooms", Value::Decimal(Decimal::from_str("3.0").unwrap())),
        ("monthlyRent", Value::Integer(900)),
        ("verified", Value::from("true")),
        ("head.birthDate", Value::from("1990-05-01")),
        ("head", Value::from("Ada")),
    ];

    for (path, value) in attempts {
        let result = household.set_or_create(path, value);
        assert!(matches!(result, Err(SchemaError::TypeMismatch(_))), "{path}");
        assert_eq!(household, snapshot);
    }

    // A failed write through an absent intermediate must not create it
    let mut fresh = DynamicEntity::new(registry.get("Household")?);
    assert!(fresh.set_or_create("head.birthDate", 5i64).is_err());
    assert!(fresh.is_empty());
    Ok(())
}

#[test]
fn test_path_errors() -> Result<()> {
    let registry = registry()?;
    let household = DynamicEntity::new(registry.get("Household")?);

    let err = household.get("nickname").unwrap_err();
    assert!(err.is_path_error());
    assert_eq!(household.get("head.name")?, Value::Null);

    // The same bad path fails the same way with and without a head present
    let unknown_nickname = |result: Result<Value>| {
        matches!(result, Err(SchemaError::UnknownAttribute(attr, schema)) if attr == "nickname" && schema == "Member")
    };
    assert!(unknown_nickname(household.get("head.nickname")));
    assert!(unknown_nickname(household.get("members[0].nickname")));

    let mut with_head = household.clone();
    with_head.set_or_create("head.name", "Ada")?;
    assert!(unknown_nickname(with_head.get("head.nickname")));

    let mut fresh = household.clone();
    assert!(matches!(
        fresh.set("head.nickname", "Ada"),
        Err(SchemaError::UnknownAttribute(attr, _)) if attr == "nickname"
    ));
    assert!(matches!(fresh.set("head.name", "Ada"), Err(SchemaError::TypeMismatch(_))));
    assert!(fresh.is_empty());
    assert!(matches!(with_head.get("rooms.count"), Err(SchemaError::TypeMismatch(_))));
    assert!(matches!(
        with_head.set("rentPerRoom", Value::Decimal(Decimal::ONE)),
        Err(SchemaError::ComputedAttributeNotSettable(_))
    ));
    Ok(())
}

#[test]
fn test_computed_attributes() -> Result<()> {
    let registry = registry()?;
    let mut household = DynamicEntity::new(registry.get("Household")?);
    household.set("monthlyRent", Decimal::from(900))?;
    household.set("rooms", 4i64)?;
    household.set_or_create("head.birthDate", date(2000, 3, 1))?;

    assert_eq!(
        household.evaluate_computed("rentPerRoom")?,
        Value::Decimal(Decimal::from(225))
    );

    let config = ValidatorConfig::new().today(date(2026, 10, 17));
    let head = household.get("head")?;
    let head = head.as_entity().unwrap();
    assert_eq!(head.evaluate_computed_with("age", &config)?, Value::Integer(26));

    household.set("rooms", 0i64)?;
    assert!(matches!(
        household.evaluate_computed("rentPerRoom"),
        Err(SchemaError::ExpressionEvaluation(_))
    ));
    Ok(())
}

#[test]
fn test_flatten_and_lists() -> Result<()> {
    let registry = registry()?;
    let mut household = DynamicEntity::new(registry.get("Household")?);
    household.set_or_create("members[0].name", "Ada")?;
    household.set_or_create("members[1].name", "Lee")?;
    household.set("members[1].birthDate", date(2010, 1, 1))?;
    household.set("verified", false)?;

    assert_eq!(household.get("members[1].name")?, Value::from("Lee"));
    assert!(household.set_or_create("members[5].name", "Zed").is_err());

    let flat = household.flatten_to_map();
    assert_eq!(flat["verified"], "false");
    assert_eq!(
        flat["members"],
        r#"[{"name":"Ada"}, {"birthDate":"2010-01-01","name":"Lee"}]"#
    );
    assert!(!flat.contains_key("rentPerRoom"));
    Ok(())
}

#[test]
fn test_blob_round_trip() -> Result<()> {
    let registry = registry()?;
    let schema = registry.get("Household")?;
    let blob = r#"{
        "head": { "name": "Ada", "birthDate": "1990-05-01", "age": 99 },
        "members": [{ "name": "Lee" }],
        "monthlyRent": 1200.75,
        "rooms": 3
    }"#;

    let household = DynamicEntity::from_json_str(schema.clone(), blob)?;
    assert_eq!(
        household.get("monthlyRent")?,
        Value::Decimal(Decimal::from_str("1200.75").unwrap())
    );
    assert!(household.to_json()["head"].get("age").is_none());

    let restored = DynamicEntity::from_json(schema.clone(), &household.to_json())?;
    assert_eq!(restored, household);

    let wrong = DynamicEntity::from_json_str(schema, r#"{ "rooms": "three" }"#);
    assert!(matches!(wrong, Err(SchemaError::TypeMismatch(_))));
    Ok(())
}

#[test]
fn test_nested_entities_keep_the_parent_child_version() -> Result<()> {
    let mut registry = registry()?;
    let household_v1 = registry.get("Household")?;
    registry.redefine_schema(
        "Member",
        vec![Attribute::new("fullName", AttributeType::String)],
        vec![],
        vec![],
    )?;

    let mut household = DynamicEntity::new(household_v1.clone());
    household.set_or_create("head.name", "Ada")?;
    assert_eq!(household.get("head")?.as_entity().unwrap().schema().version(), 1);
    assert!(household.set_or_create("head.fullName", "Ada Lovelace").is_err());

    let restored = DynamicEntity::from_json_str(household_v1, r#"{ "head": { "name": "Lee" } }"#)?;
    assert_eq!(restored.get("head.name")?, Value::from("Lee"));
    Ok(())
}
