use std::path::Path;

use proptest::prelude::*;
use schemagraph_model::Document;
use schemagraph_renumber::{
    output_paths, render_document, renumber, IdClass, RenumberError, RenumberOptions, Renumberer,
};
use serde_json::json;

fn sample() -> Document {
    Document::from_value(json!({
        "@id": "Schemas/1/",
        "events": [
            {"@id": "Events/1/Attack Start", "name": "Attack Start",
             "children": ["Events/2/Flee"],
             "outlinks": ["Events/99/External"],
             "entities": [{"@id": "Entities/5/", "name": "attacker"}],
             "participants": [
                {"@id": "Participants/7/", "roleName": "agent", "entity": "Entities/5/"},
                {"@id": "Participants/8/", "roleName": "place", "entity": "Entities/6/"}
             ],
             "relations": [
                {"@id": "Relations/3/", "name": "at",
                 "relationSubject": "Entities/5/", "relationObject": "Entities/6/"}
             ]},
            {"@id": "Events/2/Flee", "name": "Flee",
             "entities": [
                {"@id": "Entities/6/", "name": "place"},
                {"@id": "Entities/5/", "name": "attacker"}
             ]}
        ]
    }))
    .expect("sample document")
}

#[test]
fn renumbers_ids_and_rewrites_references() {
    let mut doc = sample();
    let mapping = renumber(&mut doc, &RenumberOptions::default()).unwrap();

    let top = &doc.events[0];
    assert_eq!(top.id, "resin:Events/20000/Attack_Start");
    assert_eq!(top.child_ids().collect::<Vec<_>>(), vec!["resin:Events/20001/Flee"]);
    // Undeclared targets are left alone.
    assert_eq!(top.outlink_list().to_vec(), vec!["Events/99/External".to_string()]);
    assert_eq!(top.entity_list()[0].id, "resin:Entities/10000/");

    let participants = top.participant_list();
    assert_eq!(participants[0].id, "resin:Participants/30000/");
    assert_eq!(participants[0].entity.as_deref(), Some("resin:Entities/10000/"));
    // Declared in a later event, still rewritten.
    assert_eq!(participants[1].entity.as_deref(), Some("resin:Entities/10001/"));

    let relation = &top.relation_list()[0];
    assert_eq!(relation.id, "resin:Relations/40000/");
    assert_eq!(relation.subject, "resin:Entities/10000/");
    assert_eq!(relation.object, "resin:Entities/10001/");

    let flee = &doc.events[1];
    assert_eq!(flee.id, "resin:Events/20001/Flee");
    let entity_ids: Vec<_> = flee.entity_list().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(entity_ids, vec!["resin:Entities/10001/", "resin:Entities/10000/"]);

    assert_eq!(mapping.get(IdClass::Entities, "Entities/5/"), Some("resin:Entities/10000/"));
    assert_eq!(
        mapping.to_csv(),
        "old_id,new_id\n\
         Events/1/Attack Start,resin:Events/20000/Attack_Start\n\
         Events/2/Flee,resin:Events/20001/Flee\n\
         Entities/5/,resin:Entities/10000/\n\
         Entities/6/,resin:Entities/10001/\n\
         Participants/7/,resin:Participants/30000/\n\
         Participants/8/,resin:Participants/30001/\n\
         Relations/3/,resin:Relations/40000/\n"
    );
}

#[test]
fn unknown_top_level_keys_survive() {
    let mut doc = sample();
    renumber(&mut doc, &RenumberOptions::default()).unwrap();
    assert_eq!(doc.fields.get("@id"), Some(&json!("Schemas/1/")));
}

#[test]
fn duplicate_new_id_fails_without_touching_the_document() {
    let mut doc = Document::from_value(json!({"events": [
        {"@id": "Events/Step", "name": "a"},
        {"@id": "Events/Step", "name": "b"}
    ]}))
    .unwrap();
    let before = doc.clone();

    let err = renumber(&mut doc, &RenumberOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        RenumberError::DuplicateId { ref new, .. } if new == "resin:Events/Step"
    ));
    assert_eq!(doc, before);
}

#[test]
fn nested_id_that_cannot_change_is_rejected() {
    let mut doc = Document::from_value(json!({"events": [
        {"@id": "Events/1/", "name": "a",
         "entities": [{"@id": "resin:Entities/thing", "name": "thing"}]}
    ]}))
    .unwrap();

    let err = renumber(&mut doc, &RenumberOptions::default()).unwrap_err();
    assert!(matches!(err, RenumberError::UnchangedId(ref id) if id == "resin:Entities/thing"));
}

#[test]
fn namespace_and_width_are_configurable() {
    let renumberer = Renumberer::new(RenumberOptions {
        namespace: "demo:".to_string(),
        width: 7,
    })
    .unwrap();
    assert_eq!(renumberer.canonical_id("Events/1/", 20000), "demo:Events/0020000/");
    assert_eq!(renumberer.canonical_id("demo:Events/3/x y", 7), "demo:Events/0000007/x_y");

    let defaults = Renumberer::new(RenumberOptions::default()).unwrap();
    // Wider numbers are never truncated.
    assert_eq!(defaults.canonical_id("Events/1/", 123456), "resin:Events/123456/");
    // Only the first digit run is replaced.
    assert_eq!(defaults.canonical_id("Events/1/Step 2", 20000), "resin:Events/20000/Step_2");
}

#[test]
fn counters_restart_for_every_document() {
    let renumberer = Renumberer::new(RenumberOptions::default()).unwrap();
    let mut first = sample();
    let mut second = sample();
    renumberer.renumber(&mut first).unwrap();
    renumberer.renumber(&mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn rendered_documents_use_four_space_indent() {
    let text = render_document(&sample()).unwrap();
    assert!(text.starts_with("{\n    \"events\": ["));
    let reparsed = Document::from_json_str(&text).unwrap();
    assert_eq!(reparsed, sample());
}

#[test]
fn outputs_sit_next_to_the_input() {
    let (doc, csv) = output_paths(Path::new("schemas/attack.json"));
    assert_eq!(doc, Path::new("schemas/attack_reordered.json"));
    assert_eq!(csv, Path::new("schemas/attack_id_mapping.csv"));
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn every_event_gets_a_distinct_canonical_id(count in 1usize..20) {
        let events: Vec<_> = (0..count)
            .map(|i| json!({"@id": format!("Events/{i}/Step {i}"), "name": format!("step {i}")}))
            .collect();
        let mut doc = Document::from_value(json!({"events": events})).unwrap();
        let mapping = renumber(&mut doc, &RenumberOptions::default()).unwrap();

        prop_assert_eq!(mapping.len(), count);
        for (i, event) in doc.events.iter().enumerate() {
            prop_assert_eq!(&event.id, &format!("resin:Events/{}/Step_{}", 20000 + i, i));
        }
    }
}
