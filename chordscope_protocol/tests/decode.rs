use chordscope_protocol::{decode_chords, AnalyzeResponse, HistoryItem, HistoryResponse};
use serde_json::json;

#[test]
fn chords_decode_from_array_or_string() {
    let list = json!([
        { "chord": "C", "start_time": 0.0, "end_time": 2.0, "bar": 1, "next_chord": "G" },
        { "chord": "G", "start_time": 2.0, "end_time": 4.5, "bar": 1, "previous_chord": "C" }
    ]);
    let from_array = decode_chords(list.clone());
    let from_string = decode_chords(json!(list.to_string()));

    assert_eq!(from_array.len(), 2);
    assert_eq!(from_array, from_string);
    assert_eq!(from_array[0].next_chord.as_deref(), Some("G"));
    assert_eq!(from_array[1].previous_chord.as_deref(), Some("C"));
    assert_eq!(from_array[1].end_time, 4.5);
}

#[test]
fn malformed_chords_decode_to_empty() {
    for value in [
        json!(null),
        json!("not json at all"),
        json!("{\"chord\":\"C\"}"),
        json!(42),
        json!({ "chord": "C" }),
        json!([{ "chord": "C" }]),
    ] {
        assert!(decode_chords(value.clone()).is_empty(), "{value}");
    }
}

#[test]
fn camel_case_adjacency_is_accepted() {
    let chords = decode_chords(json!([
        { "chord": "Am", "start_time": 1, "end_time": 2, "prevChord": "F", "nextChord": "G" }
    ]));
    assert_eq!(chords[0].previous_chord.as_deref(), Some("F"));
    assert_eq!(chords[0].next_chord.as_deref(), Some("G"));
    assert_eq!(chords[0].bar, 0);
}

#[test]
fn history_item_tolerates_bad_chords_and_numeric_id() {
    let item: HistoryItem = serde_json::from_value(json!({
        "id": 17,
        "title": "Numbers",
        "chords": "garbage"
    }))
    .unwrap();
    assert_eq!(item.id.as_deref(), Some("17"));
    assert!(item.chords.is_empty());
    assert_eq!(item.identifier(), None, "only song_id addresses an item");

    let item: HistoryItem = serde_json::from_value(json!({
        "song_id": "  ",
        "job_id": "job-1",
        "title": "Blank",
        "chords": null
    }))
    .unwrap();
    assert_eq!(item.identifier(), None);
    assert_eq!(item.to_analysis().job_id.as_deref(), Some("job-1"));
}

#[test]
fn history_response_shapes() {
    let wrapped: HistoryResponse =
        serde_json::from_value(json!({ "history": [{ "song_id": "a", "title": "A" }] })).unwrap();
    let bare: HistoryResponse =
        serde_json::from_value(json!([{ "song_id": "b", "title": "B" }])).unwrap();

    assert_eq!(wrapped.into_items()[0].identifier(), Some("a"));
    assert_eq!(bare.into_items()[0].identifier(), Some("b"));

    let empty: HistoryResponse = serde_json::from_value(json!({ "history": [] })).unwrap();
    assert!(empty.into_items().is_empty());
}

#[test]
fn analyze_envelope_supplies_job_id() {
    let resp: AnalyzeResponse = serde_json::from_value(json!({
        "job_id": "outer",
        "analysis": { "key": "G", "tempo_bpm": 96.0, "chords": [] }
    }))
    .unwrap();
    let analysis = resp.into_analysis();
    assert_eq!(analysis.job_id.as_deref(), Some("outer"));
    assert_eq!(analysis.key.as_deref(), Some("G"));

    let resp: AnalyzeResponse = serde_json::from_value(json!({
        "job_id": "outer",
        "analysis": { "job_id": "inner", "chords": "[]" }
    }))
    .unwrap();
    assert_eq!(resp.into_analysis().job_id.as_deref(), Some("inner"));
}

#[test]
fn numeric_song_id_is_accepted() {
    let resp: HistoryResponse = serde_json::from_value(json!({
        "history": [
            { "song_id": 42, "title": "Numeric" },
            { "song_id": "s-2", "title": "Text" }
        ]
    }))
    .unwrap();
    let items = resp.into_items();
    assert_eq!(items[0].identifier(), Some("42"));
    assert_eq!(items[1].identifier(), Some("s-2"));
}

#[test]
fn untitled_history_item_has_no_title() {
    let item = HistoryItem {
        song_id: Some("s-1".to_string()),
        title: "  ".to_string(),
        ..HistoryItem::default()
    };
    assert_eq!(item.to_analysis().title, None);

    let item = HistoryItem {
        title: "Named".to_string(),
        ..HistoryItem::default()
    };
    assert_eq!(item.to_analysis().title.as_deref(), Some("Named"));
}
