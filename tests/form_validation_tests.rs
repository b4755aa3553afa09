use caseschema::form::ComponentProps;
use caseschema::{
    Attribute, AttributeType, DynamicEntity, FormComponent, FormConfiguration, FormValidator,
    Result, SchemaError, SchemaRegistry, ValidationErrorItem, ValidatorConfig,
};
use chrono::{Months, NaiveDate};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

fn registry() -> Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry.define_schema(
        "Dependent",
        vec![
            Attribute::new("name", AttributeType::String),
            Attribute::new("age", AttributeType::Integer),
        ],
        vec![],
        vec![],
    )?;
    registry.define_schema(
        "Application",
        vec![
            Attribute::new("income", AttributeType::Integer),
            Attribute::new("age", AttributeType::Integer),
            Attribute::new("guardianName", AttributeType::String),
            Attribute::new("moveInDate", AttributeType::Date),
            Attribute::new("email", AttributeType::String),
            Attribute::new("housing", AttributeType::String),
            Attribute::new("dependents", AttributeType::list_of(AttributeType::entity("Dependent"))),
        ],
        vec![],
        vec![],
    )?;
    Ok(registry)
}

fn run(entity: &DynamicEntity, components: Vec<FormComponent>) -> Result<Vec<ValidationErrorItem>> {
    FormValidator::new()
        .with_config(ValidatorConfig::new().today(today()))
        .validate(&FormConfiguration::new("Application", components), entity)
}

#[test]
fn test_negative_income_reports_min() -> Result<()> {
    let registry = registry()?;
    let mut entity = DynamicEntity::new(registry.get("Application")?);
    entity.set("income", -5i64)?;

    let errors = run(
        &entity,
        vec![FormComponent::keyed("income").with_props(ComponentProps::new().required().min(0))],
    )?;

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_kind, "min");
    assert_eq!(errors[0].control_key, "income");
    Ok(())
}

#[test]
fn test_hidden_subtree_is_exempt() -> Result<()> {
    let registry = registry()?;
    let mut entity = DynamicEntity::new(registry.get("Application")?);
    entity.set("age", 16i64)?;

    let form = FormConfiguration::from_json(
        r#"{
            "schemaKey": "Application",
            "components": [
                {
                    "expressions": { "hide": "model.age < 18" },
                    "fieldGroup": [
                        { "key": "guardianName", "props": { "required": true } }
                    ]
                }
            ]
        }"#,
    )?;

    let validator = FormValidator::new().with_config(ValidatorConfig::new().today(today()));
    assert!(validator.validate(&form, &entity)?.is_empty());

    entity.set("age", 30i64)?;
    let errors = validator.validate(&form, &entity)?;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_kind, "required");
    assert_eq!(errors[0].control_key, "guardianName");
    Ok(())
}

#[test]
fn test_relative_min_date() -> Result<()> {
    let registry = registry()?;
    let mut entity = DynamicEntity::new(registry.get("Application")?);
    let two_years_ago = today().checked_sub_months(Months::new(24)).unwrap();
    entity.set("moveInDate", two_years_ago)?;

    let component = FormComponent::keyed("moveInDate")
        .with_props(ComponentProps::new().relative_min_date("-1-year"));
    let errors = run(&entity, vec![component.clone()])?;

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_kind, "relativeMinDate");

    entity.set("moveInDate", today())?;
    assert!(run(&entity, vec![component])?.is_empty());
    Ok(())
}

#[test]
fn test_malformed_relative_unit_is_fatal() -> Result<()> {
    let registry = registry()?;
    let entity = DynamicEntity::new(registry.get("Application")?);

    let result = run(
        &entity,
        vec![FormComponent::keyed("moveInDate")
            .with_props(ComponentProps::new().relative_max_date("+3-fortnights"))],
    );

    match result {
        Err(err @ SchemaError::InvalidConfiguration(_)) => assert!(err.is_configuration_error()),
        other => panic!("expected configuration error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_independent_checks_accumulate() -> Result<()> {
    let registry = registry()?;
    let mut entity = DynamicEntity::new(registry.get("Application")?);
    entity.set("email", "not-an-email")?;
    entity.set("housing", "castle")?;

    let form = FormConfiguration::from_json(
        r#"{
            "schemaKey": "Application",
            "components": [
                {
                    "key": "email",
                    "props": { "maxLength": 5, "errorLabel": "Check the email" },
                    "validators": { "validation": ["email"] }
                },
                {
                    "key": "housing",
                    "props": { "options": [{ "key": "rent" }, { "key": "own" }] }
                }
            ]
        }"#,
    )?;
    let errors = FormValidator::new().validate(&form, &entity)?;

    assert_eq!(
        errors,
        vec![
            ValidationErrorItem::new("email", "maxLength", "Check the email"),
            ValidationErrorItem::new("email", "email", "Check the email"),
            ValidationErrorItem::new(
                "housing",
                "selectOptions",
                "'castle' is not one of the available options"
            ),
        ]
    );
    Ok(())
}

#[test]
fn test_repeating_section_prefixes_keys() -> Result<()> {
    let registry = registry()?;
    let mut entity = DynamicEntity::new(registry.get("Application")?);
    entity.set_or_create("dependents[0].name", "Ada")?;
    entity.set_or_create("dependents[1].age", 4i64)?;

    let section = FormComponent::keyed("dependents").with_children(vec![
        FormComponent::keyed("name").with_props(ComponentProps::new().required()),
    ]);
    let errors = run(&entity, vec![section])?;

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].control_key, "dependents[1].name");
    Ok(())
}

#[test]
fn test_validation_does_not_mutate_inputs() -> Result<()> {
    let registry = registry()?;
    let mut entity = DynamicEntity::new(registry.get("Application")?);
    entity.set("age", 12i64)?;
    let before = entity.clone();

    let form = FormConfiguration::new(
        "Application",
        vec![FormComponent::keyed("guardianName")
            .with_props(ComponentProps::new().required())
            .with_expression("hide", "age < 18")],
    );
    let original = form.clone();

    let errors = FormValidator::new().validate(&form, &entity)?;
    assert!(errors.is_empty());
    assert_eq!(form, original);
    assert_eq!(entity, before);
    Ok(())
}

#[test]
fn test_optional_chaining_and_missing_data() -> Result<()> {
    let registry = registry()?;
    let entity = DynamicEntity::new(registry.get("Application")?);

    let errors = run(
        &entity,
        vec![
            FormComponent::keyed("guardianName")
                .with_expression("require", "model?.age < 18"),
            FormComponent::keyed("email").with_expression("require", "model.age.value > 1"),
        ],
    )?;

    // `model.age` is null, so the ordering is false; reading through null is an error
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].control_key, "email");
    assert_eq!(errors[0].error_kind, "expression");
    Ok(())
}

#[test]
fn test_income_above_max_reports_max() -> Result<()> {
    let registry = registry()?;
    let mut entity = DynamicEntity::new(registry.get("Application")?);
    entity.set("income", 250_000i64)?;

    let component = FormComponent::keyed("income").with_props(ComponentProps::new().min(0).max(100_000));
    let errors = run(&entity, vec![component.clone()])?;
    assert_eq!(
        errors,
        vec![ValidationErrorItem::new("income", "max", "Value must be at most 100000")]
    );

    entity.set("income", 100_000i64)?;
    assert!(run(&entity, vec![component])?.is_empty());
    Ok(())
}

#[test]
fn test_absolute_date_bounds() -> Result<()> {
    let registry = registry()?;
    let mut entity = DynamicEntity::new(registry.get("Application")?);
    let form = FormConfiguration::from_json(
        r#"{
            "schemaKey": "Application",
            "components": [
                { "key": "moveInDate", "props": { "minDate": "2021-01-01", "maxDate": "2027-01-01" } }
            ]
        }"#,
    )?;
    let validator = FormValidator::new().with_config(ValidatorConfig::new().today(today()));

    entity.set("moveInDate", NaiveDate::from_ymd_opt(2020, 6, 30).unwrap())?;
    assert_eq!(
        validator.validate(&form, &entity)?,
        vec![ValidationErrorItem::new("moveInDate", "minDate", "Date must be on or after 2021-01-01")]
    );

    entity.set("moveInDate", NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())?;
    assert_eq!(
        validator.validate(&form, &entity)?,
        vec![ValidationErrorItem::new("moveInDate", "maxDate", "Date must be on or before 2027-01-01")]
    );

    entity.set("moveInDate", NaiveDate::from_ymd_opt(2027, 1, 1).unwrap())?;
    assert!(validator.validate(&form, &entity)?.is_empty());
    Ok(())
}

#[test]
fn test_props_expression_targets() -> Result<()> {
    let registry = registry()?;
    let mut entity = DynamicEntity::new(registry.get("Application")?);
    entity.set("age", 16i64)?;

    let form = FormConfiguration::from_json(
        r#"{
            "schemaKey": "Application",
            "components": [
                {
                    "key": "email",
                    "props": { "required": true },
                    "expressionProperties": { "props.hidden": "model.age < 18" }
                },
                {
                    "key": "guardianName",
                    "expressionProperties": { "props.required": "model.age < 18" }
                }
            ]
        }"#,
    )?;
    let validator = FormValidator::new().with_config(ValidatorConfig::new().today(today()));

    assert_eq!(
        validator.validate(&form, &entity)?,
        vec![ValidationErrorItem::new("guardianName", "required", "This field is required")]
    );

    entity.set("age", 40i64)?;
    assert_eq!(
        validator.validate(&form, &entity)?,
        vec![ValidationErrorItem::new("email", "required", "This field is required")]
    );
    Ok(())
}

#[test]
fn test_require_inside_repeating_section() -> Result<()> {
    let registry = registry()?;
    let mut entity = DynamicEntity::new(registry.get("Application")?);
    entity.set("age", 17i64)?;
    entity.set_or_create("dependents[0].name", "Ada")?;
    entity.set_or_create("dependents[1].age", 4i64)?;
    entity.set_or_create("dependents[2].age", 7i64)?;

    let section = FormComponent::keyed("dependents").with_children(vec![
        FormComponent::keyed("name").with_expression("require", "model.age < 18"),
    ]);
    let errors = run(&entity, vec![section.clone()])?;

    let keys: Vec<_> = errors.iter().map(|e| e.control_key.as_str()).collect();
    assert_eq!(keys, vec!["dependents[1].name", "dependents[2].name"]);
    assert!(errors.iter().all(|e| e.error_kind == "required"));

    entity.set("age", 18i64)?;
    assert!(run(&entity, vec![section])?.is_empty());
    Ok(())
}

#[test]
fn test_component_keys_resolve_against_the_bound_version() -> Result<()> {
    let mut registry = SchemaRegistry::new();
    registry.define_schema("A", vec![Attribute::new("x", AttributeType::String)], vec![], vec![])?;
    let entity = DynamicEntity::new(registry.get("A")?);
    registry.redefine_schema(
        "A",
        vec![
            Attribute::new("x", AttributeType::String),
            Attribute::new("y", AttributeType::String),
        ],
        vec![],
        vec![],
    )?;

    let form = FormConfiguration::new("A", vec![FormComponent::keyed("y")]);
    let err = FormValidator::new().validate(&form, &entity).unwrap_err();
    assert!(err.is_configuration_error(), "{err:?}");

    let current = DynamicEntity::new(registry.get("A")?);
    assert!(FormValidator::new().validate(&form, &current)?.is_empty());
    Ok(())
}
