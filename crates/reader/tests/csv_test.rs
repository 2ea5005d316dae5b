//! End-to-end CSV reader behavior: strict quoting, error actions, guard
//! rails, inference, mapping, and metrics.

use ops::{ErrorAction, ErrorKind, VecSink};
use reader::csv::{CsvOptions, QuoteMode, TypeTag};
use reader::{Input, ReadOptions};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

fn rows(content: &str, options: CsvOptions) -> Vec<Value> {
    reader::csv::read::<Value>(Input::from_string(content), options)
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

#[derive(Debug, PartialEq, Deserialize)]
struct Person {
    name: String,
    city: String,
}

#[test]
fn a_headered_file_materializes_typed_records() {
    let content = "name,city\nalice,tokyo\nbob,\"new york\"\n";
    let people: Vec<Person> =
        reader::csv::read(Input::from_string(content), CsvOptions::default())
            .unwrap()
            .map(Result::unwrap)
            .collect();
    assert_eq!(
        people,
        vec![
            Person {
                name: "alice".to_string(),
                city: "tokyo".to_string()
            },
            Person {
                name: "bob".to_string(),
                city: "new york".to_string()
            },
        ]
    );
}

#[test]
fn a_stray_quote_is_a_quote_error_at_line_one_record_one() {
    // Field three carries an unescaped quote; under Skip the row is dropped.
    let sink = Arc::new(VecSink::new());
    let options = CsvOptions {
        has_header: false,
        common: ReadOptions::new()
            .with_error_action(ErrorAction::Skip)
            .with_error_sink(sink.clone()),
        ..Default::default()
    };
    let metrics = options.common.metrics.clone();

    let out = rows("a,b,c\"x,d\n", options);
    assert!(out.is_empty());
    assert_eq!(metrics.error_count(), 1);
    assert_eq!(metrics.records_emitted(), 0);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error_type, ErrorKind::CsvQuoteError);
    assert_eq!(records[0].line, 1);
    assert_eq!(records[0].record, 1);
}

#[test]
fn throw_surfaces_the_first_quote_error() {
    let options = CsvOptions {
        has_header: false,
        ..Default::default()
    };
    let mut iter = reader::csv::read::<Value>(Input::from_string("ok,row\nbad\"row\n"), options)
        .unwrap();
    assert!(iter.next().unwrap().is_ok());
    let err = iter.next().unwrap().unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::CsvQuoteError));
    // The first error is terminal.
    assert!(iter.next().is_none());
}

#[test]
fn stop_ends_the_run_without_completion() {
    let options = CsvOptions {
        has_header: false,
        common: ReadOptions::new().with_error_action(ErrorAction::Stop),
        ..Default::default()
    };
    let metrics = options.common.metrics.clone();
    let out = rows("one,row\nbad\"quote\nnever,seen\n", options);
    assert_eq!(out.len(), 1);
    assert!(metrics.terminated_early());
    assert!(metrics.termination_error().is_some());
    assert!(metrics.completed().is_none());
}

#[test]
fn skip_keeps_reading_and_completion_is_stamped() {
    let options = CsvOptions {
        has_header: false,
        common: ReadOptions::new().with_error_action(ErrorAction::Skip),
        ..Default::default()
    };
    let metrics = options.common.metrics.clone();
    let out = rows("one,row\nbad\"quote\nstill,here\n", options);
    assert_eq!(out.len(), 2);
    assert_eq!(metrics.error_count(), 1);
    assert!(metrics.completed().is_some());
}

#[test]
fn max_columns_boundary_passes_at_the_limit_and_fails_one_over() {
    let options = CsvOptions {
        has_header: false,
        max_columns_per_row: 3,
        common: ReadOptions::new().with_error_action(ErrorAction::Skip),
        ..Default::default()
    };
    let metrics = options.common.metrics.clone();
    let out = rows("a,b,c\nd,e,f,g\n", options);
    assert_eq!(out.len(), 1);
    assert_eq!(metrics.error_count(), 1);
    assert_eq!(metrics.raw_records_parsed(), 2);
    assert_eq!(metrics.records_emitted(), 1);
    assert_eq!(metrics.lines_read(), 2);
}

#[test]
fn max_record_length_triggers_after_the_column_check() {
    let sink = Arc::new(VecSink::new());
    let options = CsvOptions {
        has_header: false,
        max_columns_per_row: 2,
        max_raw_record_length: 5,
        common: ReadOptions::new()
            .with_error_action(ErrorAction::Skip)
            .with_error_sink(sink.clone()),
        ..Default::default()
    };
    // Violates both rails; the column rail is checked first.
    rows("aaaaaa,b,c\n", options);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].message.contains("columns"));
}

#[test]
fn inference_types_columns_and_enforces_them() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Reading {
        sensor: String,
        value: i64,
        ok: bool,
    }

    let options = CsvOptions::default().with_inferred_types();
    let handle = options.clone();
    let content = "sensor,value,ok\na,1,true\nb,2,false\n";
    let readings: Vec<Reading> =
        reader::csv::read(Input::from_string(content), options)
            .unwrap()
            .map(Result::unwrap)
            .collect();
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].value, 1);
    assert!(readings[0].ok);

    assert_eq!(
        handle.inferred_types().unwrap(),
        vec![TypeTag::String, TypeTag::Integer, TypeTag::Boolean]
    );
}

#[test]
fn enforcement_failure_demotes_a_column_permanently() {
    let mut options = CsvOptions::default().with_inferred_types();
    options.schema_inference_sample_rows = 2;
    let content = "n\n1\n2\nnot-a-number\n3\n";
    let out = rows(content, options);
    // The offending row and every later row emit raw strings; earlier rows
    // already emitted as integers.
    assert_eq!(out[0]["n"], Value::from(1));
    assert_eq!(out[1]["n"], Value::from(2));
    assert_eq!(out[2]["n"], Value::from("not-a-number"));
    assert_eq!(out[3]["n"], Value::from("3"));
}

#[test]
fn missing_trailing_fields_pad_and_extra_fields_error_by_default() {
    let sink = Arc::new(VecSink::new());
    let options = CsvOptions {
        schema: Some(vec!["a".to_string(), "b".to_string()]),
        has_header: false,
        common: ReadOptions::new()
            .with_error_action(ErrorAction::Skip)
            .with_error_sink(sink.clone()),
        ..Default::default()
    };
    let out = rows("1\n1,2,3\n", options);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["a"], Value::from("1"));
    assert_eq!(out[0]["b"], Value::from(""));

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error_type, ErrorKind::SchemaError);
}

#[test]
fn extra_fields_truncate_when_allowed() {
    let options = CsvOptions {
        schema: Some(vec!["a".to_string()]),
        has_header: false,
        allow_extra_fields: true,
        ..Default::default()
    };
    let out = rows("1,2,3\n", options);
    assert_eq!(out, vec![serde_json::json!({"a": "1"})]);
}

#[test]
fn target_field_mapping_renames_columns_for_serde() {
    #[derive(Debug, Deserialize)]
    struct User {
        user_id: String,
        #[serde(default)]
        nickname: Option<String>,
    }

    let options = CsvOptions::default()
        .with_target_fields(vec!["user_id".to_string(), "nickname".to_string()]);
    let content = "USER-ID,nickname\n7,ace\n";
    let users: Vec<User> = reader::csv::read(Input::from_string(content), options)
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(users[0].user_id, "7");
    assert_eq!(users[0].nickname.as_deref(), Some("ace"));
}

#[test]
fn the_separator_is_detected_when_unset() {
    let options = CsvOptions::default().with_detected_separator();
    let out = rows("a;b\n1;2\n3;4\n", options);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["a"], Value::from("1"));
    assert_eq!(out[1]["b"], Value::from("4"));
}

#[test]
fn quoted_fields_round_trip_through_formatting_and_parsing() {
    let originals = vec![
        ("plain", "value"),
        ("comma, inside", "line\nbreak"),
        ("quote \" inside", "trailing "),
    ];
    let mut content = String::from("a,b\n");
    for (a, b) in &originals {
        content.push_str(&format!(
            "\"{}\",\"{}\"\n",
            a.replace('"', "\"\""),
            b.replace('"', "\"\"")
        ));
    }

    let out = rows(&content, CsvOptions::default());
    let parsed: Vec<(String, String)> = out
        .iter()
        .map(|row| {
            (
                row["a"].as_str().unwrap().to_string(),
                row["b"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    let expected: Vec<(String, String)> = originals
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
    assert_eq!(parsed, expected);
}

#[test]
fn raw_records_are_observed_when_capture_is_enabled() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let observer = seen.clone();
    let options = CsvOptions {
        has_header: false,
        capture_raw_record: true,
        raw_record_observer: Some(Arc::new(move |record_no, raw| {
            observer.lock().unwrap().push((record_no, raw.to_string()));
        })),
        ..Default::default()
    };
    rows("a,b\nc,d\n", options);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(1, "a,b".to_string()), (2, "c,d".to_string())]
    );
}

#[test]
fn an_empty_input_completes_without_records() {
    let options = CsvOptions::default();
    let metrics = options.common.metrics.clone();
    let out = rows("", options);
    assert!(out.is_empty());
    assert!(metrics.completed().is_some());
    assert_eq!(metrics.error_count(), 0);
}

#[test]
fn lenient_quote_mode_accepts_mid_field_quotes() {
    let options = CsvOptions {
        has_header: false,
        quote_mode: QuoteMode::Lenient,
        ..Default::default()
    };
    let out = rows("a,b\"c,d\"\n", options);
    assert_eq!(out[0]["Column2"], Value::from("bc,d"));
}

#[test]
fn cancellation_stops_without_completion() {
    let options = CsvOptions::default();
    options.common.cancellation.cancel();
    let metrics = options.common.metrics.clone();
    let out = rows("a\n1\n2\n", options);
    assert!(out.is_empty());
    assert!(metrics.completed().is_none());
}
