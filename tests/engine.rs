use jsdoc::parser::scanner;
use jsdoc::{DiagnosticKind, DocletModel, LinkState, Role, UnattachedReason};
use pretty_assertions::assert_eq;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn shapes() -> DocletModel {
    let text = std::fs::read_to_string(fixture_path("shapes.js")).unwrap();
    jsdoc::parse_source("shapes.js", &text).unwrap()
}

fn legacy() -> DocletModel {
    let text = std::fs::read_to_string(fixture_path("test.js")).unwrap();
    jsdoc::parse_source("test.js", &text).unwrap()
}

fn member_names(model: &DocletModel, class: &str) -> Vec<String> {
    model
        .members_of(class)
        .into_iter()
        .map(|s| s.name.clone())
        .collect()
}

// -- Scanner --

#[test]
fn spans_partition_the_fixture() {
    let text = std::fs::read_to_string(fixture_path("shapes.js")).unwrap();
    let spans: Vec<_> = scanner::scan(&text).collect();
    let mut end = 0;
    let mut rebuilt = String::new();
    for span in &spans {
        assert_eq!(span.span.start, end);
        rebuilt.push_str(span.text(&text));
        end = span.span.end;
    }
    assert_eq!(end, text.len());
    assert_eq!(rebuilt, text);
}

// -- Classes and members --

#[test]
fn classes_in_source_order() {
    let model = shapes();
    let classes: Vec<&str> = model.classes().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(classes, vec!["Shape", "Rectangle", "Square", "Circle"]);
}

#[test]
fn constructor_picks_up_documented_closures_only() {
    let model = shapes();
    let shape = model.get("Shape").unwrap();
    assert_eq!(shape.role, Role::Constructor);
    assert!(shape.is_constructor);
    assert_eq!(shape.location.line, 10);
    assert_eq!(
        shape.description,
        "Construct a new Shape object.\nShapes are never drawn directly."
    );

    let location = model.get("Shape#getLocation").unwrap();
    assert_eq!(location.role, Role::InstanceMethod);
    assert_eq!(
        location.returns.as_ref().and_then(|r| r.type_expr.as_deref()),
        Some("String")
    );
    assert_eq!(model.get("Shape#sides").unwrap().role, Role::InstanceProperty);

    let normalize = model.get("Shape~normalize").unwrap();
    assert_eq!(normalize.role, Role::PrivateInner);
    assert!(normalize.private);
}

#[test]
fn members_listed_in_source_order() {
    let model = shapes();
    assert_eq!(
        member_names(&model, "Shape"),
        vec![
            "Shape#getLocation",
            "Shape#sides",
            "Shape#color",
            "Shape#getColor",
            "Shape#setColor",
        ]
    );
    assert_eq!(member_names(&model, "Rectangle"), vec!["Rectangle#getWidth"]);
    assert_eq!(
        member_names(&model, "Circle"),
        vec!["Circle.PI", "Circle.getClassName"]
    );
}

#[test]
fn indirect_methods_take_over_implementation_doclets() {
    let model = shapes();

    let get = model.get("Shape#getColor").unwrap();
    assert_eq!(get.role, Role::InstanceMethod);
    assert_eq!(get.description, "Get the color for this Shape");
    assert_eq!(get.location.line, 44);
    assert_eq!(get.see.len(), 1);
    assert_eq!(get.see[0].target.name, "#setColor");
    assert_eq!(
        get.see[0].target.link,
        LinkState::Resolved("Shape#setColor".to_string())
    );

    let set = model.get("Shape#setColor").unwrap();
    let params: Vec<(&str, &str)> = set
        .params
        .iter()
        .map(|p| (p.name.as_str(), p.description.as_str()))
        .collect();
    assert_eq!(
        params,
        vec![
            ("color", "The color to set"),
            ("other", "A parameter the code does not declare"),
        ]
    );
    assert_eq!(set.signature, vec!["color"]);
    assert_eq!(set.throws[0].description, "InvalidColorException when the color is unknown");
    assert_eq!(
        set.implementation.as_ref().map(|r| &r.link),
        Some(&LinkState::Resolved("Shape_SetColor".to_string()))
    );

    assert!(model.get("Shape_GetColor").is_none());
    assert!(model.get("Shape_SetColor").is_none());
}

#[test]
fn free_functions_exclude_consumed_implementations() {
    let model = shapes();
    assert_eq!(model.free_functions(), ["UnattachedFunction", "translate"]);
    let f = model.get("UnattachedFunction").unwrap();
    assert_eq!(f.role, Role::FreeFunction);
    assert_eq!(f.owner, None);
    assert_eq!(f.params[0].type_expr.as_deref(), Some("Number"));
}

#[test]
fn inheritance_resolves_by_name() {
    let model = shapes();
    let rect = model.get("Rectangle").unwrap();
    assert_eq!(rect.base_class().and_then(|b| b.link.resolved()), Some("Shape"));

    let square = model.get("Square").unwrap();
    assert_eq!(
        square.base_class().and_then(|b| b.link.resolved()),
        Some("Rectangle")
    );
    let chain: Vec<&str> = model
        .ancestors("Square")
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(chain, vec!["Rectangle", "Shape"]);
}

#[test]
fn statics_and_synonyms() {
    let model = shapes();
    assert_eq!(model.get("Circle.PI").unwrap().role, Role::StaticProperty);
    let name = model.get("Circle.getClassName").unwrap();
    assert_eq!(name.role, Role::StaticMethod);
    assert_eq!(name.owner.as_deref(), Some("Circle"));
    assert_eq!(
        model.get("Circle").unwrap().deprecated.as_deref(),
        Some("use Ellipse")
    );

    let width = model.get("Rectangle#getWidth").unwrap();
    assert_eq!(width.returns.as_ref().unwrap().description, "The width");
    assert_eq!(model.get("Square").unwrap().params[0].name, "side");
}

#[test]
fn inline_links_resolve() {
    let model = shapes();
    let square = model.get("Square").unwrap();
    assert!(square.description.contains("{@link Rectangle}"));
    assert_eq!(
        square.links[0].link,
        LinkState::Resolved("Rectangle".to_string())
    );

    let translate = model.get("translate").unwrap();
    assert_eq!(
        translate.links[0].link,
        LinkState::Resolved("Shape#getColor".to_string())
    );
}

// -- Unattached comments and diagnostics --

#[test]
fn unattached_comments_are_kept() {
    let model = shapes();
    let unattached: Vec<(usize, UnattachedReason)> = model
        .unattached()
        .iter()
        .map(|u| (u.location.line, u.reason))
        .collect();
    assert_eq!(
        unattached,
        vec![
            (120, UnattachedReason::NoConstruct),
            (131, UnattachedReason::Unrecognized),
        ]
    );
}

#[test]
fn fixture_reports_only_informational_diagnostics() {
    let model = shapes();
    let kinds: Vec<DiagnosticKind> = model.diagnostics().iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![DiagnosticKind::UnrecognizedConstruct]);
    assert!(!model.has_warnings());
    assert_eq!(
        model.files()[0].overview.as_deref(),
        Some("Shapes used by the extraction tests.")
    );
}

#[test]
fn undocumented_inner_function_yields_nothing() {
    let src = "/** @constructor */\nfunction Shape() {\n  function privateFunction() {}\n  /** Inner */\n  this.innerFunction = function() {};\n}\n";
    let model = jsdoc::parse_source("a.js", src).unwrap();
    let names: Vec<&str> = model.symbols().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Shape", "Shape#innerFunction"]);
}

#[test]
fn bare_statement_is_unattached_not_fatal() {
    let model = jsdoc::parse_source("a.js", "/** Doc */\nfoo();\n").unwrap();
    assert!(model.is_empty());
    assert_eq!(model.unattached().len(), 1);
    assert_eq!(
        model.diagnostics()[0].kind,
        DiagnosticKind::UnrecognizedConstruct
    );
}

#[test]
fn malformed_comment_keeps_earlier_symbols() {
    let src = "/** Kept */\nfunction kept() {}\n/** never closed\nfunction lost() {}\n";
    let model = jsdoc::parse_source("a.js", src).unwrap();
    assert!(model.get("kept").is_some());
    assert!(model.get("lost").is_none());
    assert_eq!(model.diagnostics()[0].kind, DiagnosticKind::MalformedComment);
    assert!(model.has_warnings());
}

#[test]
fn model_serializes_roles_and_links() {
    let model = shapes();
    let json = serde_json::to_value(&model).unwrap();
    assert_eq!(json["symbols"]["Shape#getColor"]["role"], "instance-method");
    assert_eq!(
        json["symbols"]["Rectangle"]["class"]["base"]["link"]["target"],
        "Shape"
    );
    assert_eq!(json["free_functions"][1], "translate");
}

// -- Legacy parser test file --

#[test]
fn legacy_file_links_cleanly() {
    let model = legacy();
    assert!(model.diagnostics().is_empty());
    assert!(model.unattached().is_empty());
    assert_eq!(model.len(), 36);
    assert_eq!(model.free_functions(), ["UnattachedFunction"]);
    let classes: Vec<&str> = model.classes().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        classes,
        vec!["Shape", "Rectangle", "Square", "Circle", "Coordinate"]
    );
}

#[test]
fn legacy_prototype_usage_makes_classes() {
    let model = legacy();
    let rect = model.get("Rectangle").unwrap();
    assert_eq!(rect.role, Role::Constructor);
    assert!(!rect.is_constructor);
    assert_eq!(rect.base_class().and_then(|b| b.link.resolved()), Some("Shape"));
    assert_eq!(
        model.get("Square").unwrap().base_class().and_then(|b| b.link.resolved()),
        Some("Rectangle")
    );

    let coordinate = model.get("Coordinate").unwrap();
    assert_eq!(coordinate.role, Role::Constructor);
    assert_eq!(coordinate.base_class(), None);
    assert_eq!(
        member_names(&model, "Coordinate"),
        vec![
            "Coordinate#x",
            "Coordinate#y",
            "Coordinate#getX",
            "Coordinate#getY",
            "Coordinate#setX",
            "Coordinate#setY",
        ]
    );
}

#[test]
fn legacy_indirect_members_carry_their_doclets() {
    let model = legacy();
    let get = model.get("Shape#getColor").unwrap();
    assert_eq!(get.description, "Get the color of this shape");
    assert_eq!(get.see[0].target.name, "#setColor");
    assert_eq!(
        get.see[0].target.link,
        LinkState::Resolved("Shape#setColor".to_string())
    );

    let coords = model.get("Shape#setCoords").unwrap();
    assert_eq!(coords.params[0].name, "coordinates");
    assert_eq!(
        coords.params[0].description,
        "The coordinates to set for this Shape"
    );

    let set = model.get("Shape#setColor").unwrap();
    let params: Vec<&str> = set.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["color", "other"]);
    assert_eq!(set.throws.len(), 1);
    assert!(model.get("Shape_SetColor").is_none());
}

#[test]
fn legacy_static_and_instance_members() {
    let model = legacy();
    let class_name = model.get("Circle.getClassName").unwrap();
    assert_eq!(class_name.role, Role::StaticMethod);
    assert_eq!(class_name.description, "A class (static) method.");
    assert_eq!(class_name.params[0].name, "test");
    assert_eq!(model.get("Circle.PI").unwrap().role, Role::StaticProperty);
    assert_eq!(model.get("Circle#radius").unwrap().role, Role::InstanceProperty);
    assert_eq!(
        member_names(&model, "Circle"),
        vec![
            "Circle#radius",
            "Circle.PI",
            "Circle.getClassName",
            "Circle#getRadius",
            "Circle#setRadius",
        ]
    );
}

#[test]
fn legacy_constructor_closures() {
    let model = legacy();
    assert_eq!(
        member_names(&model, "Shape"),
        vec![
            "Shape#innerFunction",
            "Shape#anotherInner",
            "Shape#color",
            "Shape#border",
            "Shape#getCoords",
            "Shape#getColor",
            "Shape#setCoords",
            "Shape#setColor",
        ]
    );
    assert_eq!(
        model.get("Shape#anotherInner").unwrap().role,
        Role::InstanceMethod
    );

    let private = model.get("Shape~privateFunction").unwrap();
    assert_eq!(private.role, Role::PrivateInner);
    assert!(private.private);
    assert_eq!(private.owner.as_deref(), Some("Shape"));
    assert_eq!(
        private.description,
        "This is a private method, just used here as an example"
    );
}

#[test]
fn legacy_undocumented_assignments_in_constructor_bodies_yield_nothing() {
    let model = legacy();
    // `this.width = width` sits inside Rectangle's `if` blocks at lines 124-129.
    assert!(model
        .symbols()
        .all(|s| !(124..=129).contains(&s.location.line)));
    assert_eq!(model.get("Rectangle#width").unwrap().location.line, 138);
    assert_eq!(
        member_names(&model, "Rectangle"),
        vec![
            "Rectangle#width",
            "Rectangle#height",
            "Rectangle#rectFunction",
            "Rectangle#getWidth",
            "Rectangle#getHeight",
            "Rectangle#setWidth",
            "Rectangle#setHeight",
            "Rectangle#getArea",
        ]
    );
}
