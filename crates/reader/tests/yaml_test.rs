//! End-to-end YAML reader behavior: document and sequence-root modes, the
//! security filter, and type restriction.

use ops::{ErrorAction, ErrorKind, VecSink};
use reader::yaml::YamlOptions;
use reader::{Input, ReadOptions};
use serde::Deserialize;
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, PartialEq, Deserialize)]
struct Service {
    name: String,
    port: u16,
    #[serde(default)]
    replicas: u32,
}

fn services(content: &str, options: YamlOptions) -> Vec<Service> {
    reader::yaml::read::<Service>(Input::from_string(content), options)
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

#[test]
fn multi_document_input_emits_one_record_per_document() {
    let content = "name: api\nport: 8080\n---\nname: worker\nport: 9090\nreplicas: 3\n";
    let out = services(content, YamlOptions::default());
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].name, "api");
    assert_eq!(out[1].replicas, 3);
}

#[test]
fn a_sequence_root_emits_one_record_per_element() {
    let content = "- name: api\n  port: 8080\n- name: worker\n  port: 9090\n";
    let out = services(content, YamlOptions::default());
    assert_eq!(out.len(), 2);
    assert_eq!(out[1].name, "worker");
}

#[test]
fn aliases_are_blocked_and_the_next_document_still_parses() {
    let sink = Arc::new(VecSink::new());
    let options = YamlOptions {
        common: ReadOptions::new()
            .with_error_action(ErrorAction::Skip)
            .with_error_sink(sink.clone()),
        ..Default::default()
    };
    let content = "name: &n bad\nport: 1\n---\nname: good\nport: 2\n";
    let out = services(content, options);

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "good");
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error_type, ErrorKind::YamlSecurityError);
    assert!(records[0].message.contains("anchor"));
}

#[test]
fn aliases_resolve_in_permissive_mode() {
    #[derive(Debug, Deserialize)]
    struct Pair {
        a: i64,
        b: i64,
    }
    let options = YamlOptions::default().permissive();
    let out: Vec<Pair> = reader::yaml::read(Input::from_string("a: &x 5\nb: *x\n"), options)
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(out[0].a, 5);
    assert_eq!(out[0].b, 5);
}

#[test]
fn custom_tags_are_blocked_by_default() {
    let options = YamlOptions {
        common: ReadOptions::new().with_error_action(ErrorAction::Skip),
        ..Default::default()
    };
    let metrics = options.common.metrics.clone();
    let content = "name: !custom x\nport: 1\n---\nname: ok\nport: 2\n";
    let out = services(content, options);
    assert_eq!(out.len(), 1);
    assert_eq!(metrics.error_count(), 1);
}

#[test]
fn document_count_limits_are_enforced() {
    let options = YamlOptions {
        max_total_documents: 2,
        common: ReadOptions::new().with_error_action(ErrorAction::Stop),
        ..Default::default()
    };
    let metrics = options.common.metrics.clone();
    let content = "name: a\nport: 1\n---\nname: b\nport: 2\n---\nname: c\nport: 3\n";
    let out = services(content, options);
    assert_eq!(out.len(), 2);
    assert!(metrics.terminated_early());
    assert!(metrics.completed().is_none());
}

#[test]
fn type_restriction_rejects_types_outside_the_allowed_set() {
    #[derive(Debug, Deserialize)]
    struct Other {
        #[allow(dead_code)]
        name: String,
    }

    let mut allowed = HashSet::new();
    allowed.insert(TypeId::of::<Other>());
    let options = YamlOptions::default().with_allowed_types(allowed);

    let err = reader::yaml::read::<Service>(
        Input::from_string("name: a\nport: 1\n"),
        options,
    )
    .unwrap()
    .next()
    .unwrap()
    .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::TypeRestriction));
}

#[test]
fn a_document_that_does_not_fit_the_target_type_is_a_type_restriction() {
    let options = YamlOptions {
        common: ReadOptions::new().with_error_action(ErrorAction::Skip),
        ..Default::default()
    };
    let metrics = options.common.metrics.clone();
    let content = "just a scalar document\n---\nname: ok\nport: 5\n";
    let out = services(content, options);
    assert_eq!(out.len(), 1);
    assert_eq!(metrics.error_count(), 1);
}

#[test]
fn scalar_length_limits_apply() {
    let options = YamlOptions {
        max_node_scalar_length: 8,
        common: ReadOptions::new().with_error_action(ErrorAction::Skip),
        ..Default::default()
    };
    let metrics = options.common.metrics.clone();
    let content = "name: far-too-long-a-name\nport: 1\n---\nname: ok\nport: 2\n";
    let out = services(content, options);
    assert_eq!(out.len(), 1);
    assert_eq!(metrics.error_count(), 1);
}

#[test]
fn an_empty_input_completes_with_nothing() {
    let options = YamlOptions::default();
    let metrics = options.common.metrics.clone();
    let out: Vec<Result<Service, _>> =
        reader::yaml::read(Input::from_string(""), options).unwrap().collect();
    assert!(out.is_empty());
    assert!(metrics.completed().is_some());
}

#[test]
fn malformed_yaml_surfaces_as_a_yaml_exception() {
    let err = reader::yaml::read::<Service>(
        Input::from_string("name: [unclosed\n"),
        YamlOptions::default(),
    )
    .unwrap()
    .find_map(Result::err)
    .unwrap();
    assert_eq!(err.kind(), Some(ErrorKind::YamlException));
}
