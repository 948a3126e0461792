#![allow(missing_docs)]

use std::collections::BTreeMap;

use paged_array::PagedArray;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Row {
    id: u32,
    title: String,
}

fn rows(ids: std::ops::Range<u32>) -> Vec<Row> {
    ids.map(|id| Row {
        id,
        title: format!("row {id}"),
    })
    .collect()
}

#[test]
fn json_round_trip_preserves_shape_and_sparse_content() {
    let mut array: PagedArray<Row> = PagedArray::new(7, 3).unwrap();
    array.set_objects(rows(0..3), 0).unwrap();
    array.set_objects(rows(6..7), 2).unwrap();

    let json = serde_json::to_string(&array).unwrap();
    let decoded: PagedArray<Row> = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, array);
    assert!(!decoded.is_content_set(1).unwrap());
    assert_eq!(decoded.object_at(6).unwrap().title, "row 6");
    assert_eq!(decoded.object_at(4).unwrap(), &Row::default());
}

#[test]
fn decoded_copy_is_independent() {
    let mut array: PagedArray<Option<u8>> = PagedArray::new(4, 2).unwrap();
    array.set_objects(vec![Some(1), Some(2)], 0).unwrap();
    let mut decoded: PagedArray<Option<u8>> =
        serde_json::from_str(&serde_json::to_string(&array).unwrap()).unwrap();
    decoded.remove_objects(0).unwrap();
    assert!(array.is_content_set(0).unwrap());
}

#[derive(Serialize)]
struct Forged {
    total_count: usize,
    objects_per_page: usize,
    placeholder: u8,
    pages: BTreeMap<usize, Vec<u8>>,
}

fn decode(forged: Forged) -> Result<PagedArray<u8>, serde_json::Error> {
    serde_json::from_str(&serde_json::to_string(&forged).unwrap())
}

#[test]
fn decode_rejects_wrong_page_length() {
    let err = decode(Forged {
        total_count: 5,
        objects_per_page: 2,
        placeholder: 0,
        pages: BTreeMap::from([(2, vec![1, 2])]),
    })
    .unwrap_err();
    assert!(err.to_string().contains("page 2 expects 1 objects, got 2"));
}

#[test]
fn decode_rejects_page_past_end() {
    let err = decode(Forged {
        total_count: 5,
        objects_per_page: 2,
        placeholder: 0,
        pages: BTreeMap::from([(3, vec![1])]),
    })
    .unwrap_err();
    assert!(err.to_string().contains("page 3 out of range"));
}

#[test]
fn decode_rejects_zero_page_size() {
    let err = decode(Forged {
        total_count: 5,
        objects_per_page: 0,
        placeholder: 0,
        pages: BTreeMap::new(),
    })
    .unwrap_err();
    assert!(err.to_string().contains("greater than zero"));
}
