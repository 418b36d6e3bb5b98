use sylva_dom::Document;
use sylva_query::{Lookup, QueryEngine, normalize};

fn fixture() -> QueryEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let document = Document::new();
    let root = document.root();

    let header = document.create_element("header");
    document.set_attribute(header, "id", "header");
    document.append_child(root, header);

    for _ in 0..2 {
        let button = document.create_element("button");
        document.add_class(button, "btn-primary");
        document.append_child(root, button);
    }

    let plain = document.create_element("div");
    document.append_child(root, plain);

    QueryEngine::new(document)
}

#[test]
fn names_normalize_to_selectors() {
    assert_eq!(normalize("idHeader"), "#header");
    assert_eq!(normalize("classBtnPrimary"), ".btn-primary");
    assert_eq!(normalize("btnPrimary"), ".btn-primary");
    assert_eq!(normalize("div"), "div");
    assert_eq!(normalize("myButton"), "#myButton");
    assert_eq!(normalize("#already"), "#already");
    assert_eq!(normalize(".kept .as-is"), ".kept .as-is");
}

#[test]
fn id_shaped_names_resolve_to_single_elements() {
    let engine = fixture();
    let Lookup::Element(header) = engine.get("idHeader") else {
        panic!("expected an element lookup");
    };
    assert_eq!(header.tag().as_deref(), Some("header"));
    assert_eq!(header.id().as_deref(), Some("header"));
}

#[test]
fn class_shaped_names_resolve_to_collections() {
    let engine = fixture();
    let Lookup::Collection(buttons) = engine.get("classBtnPrimary") else {
        panic!("expected a collection lookup");
    };
    assert_eq!(buttons.len(), 2);
    assert!(buttons.every(|button| button.has_class("btn-primary")));
}

#[test]
fn tag_shaped_names_resolve_to_collections() {
    let engine = fixture();
    let divs = engine.get("div").collection().unwrap();
    assert_eq!(divs.len(), 1);
    assert_eq!(divs.first().unwrap().tag().as_deref(), Some("div"));
}

#[test]
fn missing_id_lookups_resolve_to_none() {
    let engine = fixture();
    assert!(matches!(engine.get("myButton"), Lookup::None));
    assert!(engine.get("myButton").element().is_none());
}

#[test]
fn collection_helpers_behave_like_arrays() {
    let engine = fixture();
    let buttons = engine.query_all(".btn-primary");
    assert_eq!(buttons.len(), 2);
    assert_eq!(buttons.at(-1).unwrap().node(), buttons.last().unwrap().node());
    assert!(buttons.at(-3).is_none());
    assert!(buttons.get(2).is_none());

    let tags = buttons.map(|button| button.tag().unwrap_or_default());
    assert_eq!(tags, vec!["button", "button"]);

    let total = buttons.reduce(0_usize, |sum, _| sum + 1);
    assert_eq!(total, 2);

    assert!(buttons.some(|button| button.is_enabled()));
    assert!(buttons.find(|button| !button.is_enabled()).is_none());

    let mut visited = 0;
    buttons.for_each(|_| visited += 1);
    assert_eq!(visited, 2);

    let mut via_iterator = 0;
    for _ in &buttons {
        via_iterator += 1;
    }
    assert_eq!(via_iterator, 2);
}

#[test]
fn visibility_and_enablement_filters() {
    let engine = fixture();
    let document = engine.document().clone();
    let buttons = engine.query_all(".btn-primary");
    document.set_attribute(buttons.first().unwrap().node(), "hidden", "");
    document.set_attribute(buttons.last().unwrap().node(), "disabled", "");

    let buttons = engine.query_all(".btn-primary");
    assert_eq!(buttons.visible().len(), 1);
    assert_eq!(buttons.enabled().len(), 1);
    assert!(!buttons.visible().first().unwrap().is_enabled());
}

#[test]
fn within_narrows_to_a_subtree() {
    let _ = env_logger::builder().is_test(true).try_init();
    let document = Document::new();
    let root = document.root();
    let card = document.create_element("article");
    document.set_attribute(card, "id", "card");
    document.append_child(root, card);
    let inner = document.create_element("span");
    document.add_class(inner, "label");
    document.append_child(card, inner);
    let outer = document.create_element("span");
    document.add_class(outer, "label");
    document.append_child(root, outer);

    let engine = QueryEngine::new(document);
    assert_eq!(engine.query_all(".label").len(), 2);
    assert_eq!(engine.within_all(card, ".label").len(), 1);
    assert_eq!(engine.within(card, ".label").unwrap().node(), inner);

    let cards = engine.query_all("article");
    let labels = cards.within(".label");
    assert_eq!(labels.len(), 1);
    assert_eq!(labels.descriptor(), "article .label");
}
