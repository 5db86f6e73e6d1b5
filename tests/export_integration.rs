// Library-level integration tests over real HDF5 fixtures written with
// the hdf5 crate into a tempdir.

use std::path::PathBuf;

use hdf5::types::VarLenUnicode;
use ndarray::{Array1, Array2};

use h5scope::api::{
    CancelToken, CellValue, ErrorKind, ExportOutcome, ExportRequest, Inspector, NodeKind,
    RowSelection, SampleData, SearchRequest,
};

fn string_array(values: &[&str]) -> Array1<VarLenUnicode> {
    Array1::from(
        values
            .iter()
            .map(|v| v.parse::<VarLenUnicode>().expect("varlen"))
            .collect::<Vec<_>>(),
    )
}

/// Stored table `df` with 8 rows: a float block (price, volume) plus an
/// integer block (time), columns ordered by axis0.
fn write_stored_table(file: &hdf5::File) {
    let group = file.create_group("df").expect("group");
    group
        .new_dataset_builder()
        .with_data(&string_array(&["time", "price", "volume"]))
        .create("axis0")
        .expect("axis0");
    group
        .new_dataset_builder()
        .with_data(&string_array(&["price", "volume"]))
        .create("block0_items")
        .expect("block0_items");
    let prices: Array2<f64> = Array2::from_shape_fn((8, 2), |(i, j)| {
        if j == 0 {
            1.5 + i as f64
        } else {
            10.0 * (i + 1) as f64
        }
    });
    group
        .new_dataset_builder()
        .with_data(&prices)
        .create("block0_values")
        .expect("block0_values");
    group
        .new_dataset_builder()
        .with_data(&string_array(&["time"]))
        .create("block1_items")
        .expect("block1_items");
    let times: Array1<i64> = Array1::from((0..8).map(|i| 100 + i).collect::<Vec<i64>>());
    group
        .new_dataset_builder()
        .with_data(&times)
        .create("block1_values")
        .expect("block1_values");
}

fn fixture(temp: &tempfile::TempDir) -> PathBuf {
    let path = temp.path().join("fixture.h5");
    let file = hdf5::File::create(&path).expect("create h5");
    write_stored_table(&file);
    drop(file);
    path
}

fn read_csv(path: &std::path::Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("open csv");
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            record
                .expect("record")
                .iter()
                .map(|cell| cell.to_string())
                .collect()
        })
        .collect();
    (headers, rows)
}

#[test]
fn stored_table_descriptor_reports_columns_and_rows() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = fixture(&temp);

    let inspector = Inspector::open(&path).expect("open");
    let descriptor = inspector.describe("df").expect("describe");
    assert_eq!(descriptor.kind, NodeKind::Table);
    assert_eq!(descriptor.columns, vec!["time", "price", "volume"]);
    assert_eq!(descriptor.row_count, Some(8));
    assert!(descriptor.is_exportable());
}

#[test]
fn compound_dataset_fields_become_columns() {
    #[derive(hdf5::H5Type, Clone)]
    #[repr(C)]
    struct Event {
        t: i64,
        v: f64,
    }

    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("compound.h5");
    let file = hdf5::File::create(&path).expect("create h5");
    let events: Array1<Event> = Array1::from(vec![
        Event { t: 1, v: 0.5 },
        Event { t: 2, v: 1.5 },
    ]);
    file.new_dataset_builder()
        .with_data(&events)
        .create("events")
        .expect("events");
    drop(file);

    let inspector = Inspector::open(&path).expect("open");
    let descriptor = inspector.describe("events").expect("describe");
    assert_eq!(descriptor.kind, NodeKind::Dataset);
    assert_eq!(descriptor.columns, vec!["t", "v"]);
    assert_eq!(descriptor.dtype, "compound[2]");
    assert_eq!(descriptor.row_count, Some(2));
}

#[test]
fn chunked_dataset_reports_storage_layout() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("chunked.h5");
    let file = hdf5::File::create(&path).expect("create h5");
    file.new_dataset_builder()
        .deflate(4)
        .chunk(4)
        .with_data(&Array1::from((0..16).map(|i| i as f64).collect::<Vec<f64>>()))
        .create("readings")
        .expect("readings");
    drop(file);

    let inspector = Inspector::open(&path).expect("open");
    let descriptor = inspector.describe("readings").expect("describe");
    assert_eq!(descriptor.chunk, Some(vec![4]));
    let compression = descriptor.compression.expect("compression");
    assert!(compression.contains("Deflate"), "filters: {compression}");

    // Contiguous storage reports neither.
    let plain = temp.path().join("plain.h5");
    let file = hdf5::File::create(&plain).expect("create h5");
    file.new_dataset_builder()
        .with_data(&Array1::from(vec![1.0f64, 2.0]))
        .create("flat")
        .expect("flat");
    drop(file);
    let descriptor = Inspector::open(&plain)
        .expect("open")
        .describe("flat")
        .expect("describe");
    assert_eq!(descriptor.chunk, None);
    assert_eq!(descriptor.compression, None);
}

#[test]
fn export_roundtrip_preserves_cell_values() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = fixture(&temp);
    let output = temp.path().join("out.csv");

    let inspector = Inspector::open(&path).expect("open");
    let mut request = ExportRequest::new("df", &output);
    request.chunk_rows = 3;
    let cancel = CancelToken::new();
    let outcome = inspector
        .export(&request, |_, _| {}, &cancel)
        .expect("export");
    match outcome {
        ExportOutcome::Complete {
            rows_written,
            chunks,
            columns,
            dropped_columns,
        } => {
            assert_eq!(rows_written, 8);
            assert_eq!(chunks, 3);
            assert_eq!(columns, vec!["time", "price", "volume"]);
            assert!(dropped_columns.is_empty());
        }
        other => panic!("expected completion, got {other:?}"),
    }

    let (headers, rows) = read_csv(&output);
    assert_eq!(headers, vec!["time", "price", "volume"]);
    assert_eq!(rows.len(), 8);
    assert_eq!(rows[0], vec!["100", "1.5", "10"]);
    assert_eq!(rows[7], vec!["107", "8.5", "80"]);
}

#[test]
fn sparse_selection_matches_sequential_filter() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = fixture(&temp);
    let output = temp.path().join("sparse.csv");

    let inspector = Inspector::open(&path).expect("open");
    let wanted = vec![0usize, 3, 6];
    let mut request = ExportRequest::new("df", &output);
    request.rows = RowSelection::Indices(wanted.clone());
    request.chunk_rows = 2;
    let cancel = CancelToken::new();
    inspector
        .export(&request, |_, _| {}, &cancel)
        .expect("export");

    let full = inspector.read("df", None).expect("full read");
    let (_, rows) = read_csv(&output);
    assert_eq!(rows.len(), wanted.len());
    for (out_row, &index) in rows.iter().zip(&wanted) {
        let expected: Vec<String> = full.rows()[index].iter().map(|c| c.render()).collect();
        assert_eq!(out_row, &expected);
    }
}

#[test]
fn cancelled_export_keeps_flushed_prefix() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = fixture(&temp);
    let output = temp.path().join("partial.csv");

    let inspector = Inspector::open(&path).expect("open");
    let mut request = ExportRequest::new("df", &output);
    request.chunk_rows = 2;
    let cancel = CancelToken::new();
    let trip = cancel.clone();
    let outcome = inspector
        .export(
            &request,
            move |_, message| {
                if message.starts_with("chunk 1/") {
                    trip.cancel();
                }
            },
            &cancel,
        )
        .expect("export");
    match outcome {
        ExportOutcome::Cancelled {
            chunks_written,
            rows_written,
        } => {
            assert_eq!(chunks_written, 1);
            assert_eq!(rows_written, 2);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }

    // Header plus exactly the rows of the flushed chunk.
    let (headers, rows) = read_csv(&output);
    assert_eq!(headers, vec!["time", "price", "volume"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "100");
    assert_eq!(rows[1][0], "101");
}

#[test]
fn export_progress_is_monotone_and_finishes_at_100() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = fixture(&temp);
    let output = temp.path().join("progress.csv");

    let inspector = Inspector::open(&path).expect("open");
    let mut request = ExportRequest::new("df", &output);
    request.chunk_rows = 2;
    let cancel = CancelToken::new();
    let mut reported: Vec<(f64, String)> = Vec::new();
    inspector
        .export(
            &request,
            |percent, message| reported.push((percent, message.to_string())),
            &cancel,
        )
        .expect("export");
    assert!(reported.windows(2).all(|pair| pair[0].0 <= pair[1].0));
    assert_eq!(reported.first().map(|(p, _)| *p), Some(0.0));
    assert_eq!(reported.last().map(|(p, _)| *p), Some(100.0));
    // The plan milestone names both chunk count and selected-row total.
    assert!(reported
        .iter()
        .any(|(_, m)| m == "planned 4 chunks covering 8 rows"));
}

#[test]
fn wide_rows_fall_back_to_first_column_sample() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("wide.h5");
    let file = hdf5::File::create(&path).expect("create h5");
    let wide: Array2<f64> = Array2::from_shape_fn((6, 50), |(i, j)| (i * 100 + j) as f64);
    file.new_dataset_builder()
        .with_data(&wide)
        .create("wide")
        .expect("wide");
    drop(file);

    let inspector = Inspector::open(&path).expect("open");
    let sample = inspector.sample("wide", 20).expect("sample");
    assert!(sample.truncated);
    match sample.data {
        SampleData::TwoD(rows) => {
            assert_eq!(rows.len(), 6);
            assert!(rows.iter().all(|row| row.len() == 1));
            assert_eq!(rows[0][0], CellValue::Float(0.0));
            assert_eq!(rows[5][0], CellValue::Float(500.0));
        }
        other => panic!("expected matrix sample, got {other:?}"),
    }
}

#[test]
fn search_returns_identical_matches_on_repeat() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = fixture(&temp);

    let inspector = Inspector::open(&path).expect("open");
    let request = SearchRequest::new("df", "price", "3.5");
    let cancel = CancelToken::new();
    let first = inspector
        .search(&request, |_, _| {}, &cancel)
        .expect("first search");
    let second = inspector
        .search(&request, |_, _| {}, &cancel)
        .expect("second search");

    assert!(!first.cancelled);
    assert_eq!(first.matches.n_rows(), 1);
    assert_eq!(first.matches.rows()[0][0].render(), "102");
    assert_eq!(first.matches, second.matches);
}

#[test]
fn search_on_missing_column_is_not_found() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = fixture(&temp);

    let inspector = Inspector::open(&path).expect("open");
    let request = SearchRequest::new("df", "ticker", "ABC");
    let cancel = CancelToken::new();
    let err = inspector
        .search(&request, |_, _| {}, &cancel)
        .expect_err("missing column");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn plain_group_is_not_exportable() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("groups.h5");
    let file = hdf5::File::create(&path).expect("create h5");
    let group = file.create_group("misc").expect("group");
    group
        .new_dataset_builder()
        .with_data(&Array1::from(vec![1.0f64, 2.0]))
        .create("unrelated")
        .expect("unrelated");
    drop(file);

    let inspector = Inspector::open(&path).expect("open");
    let descriptor = inspector.describe("misc").expect("describe");
    assert_eq!(descriptor.kind, NodeKind::Group);
    assert!(!descriptor.is_exportable());

    let output = temp.path().join("never.csv");
    let request = ExportRequest::new("misc", &output);
    let cancel = CancelToken::new();
    let err = inspector
        .export(&request, |_, _| {}, &cancel)
        .expect_err("not exportable");
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert!(!output.exists());
}

#[test]
fn fully_out_of_extent_selection_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = fixture(&temp);
    let output = temp.path().join("empty.csv");

    let inspector = Inspector::open(&path).expect("open");
    let mut request = ExportRequest::new("df", &output);
    request.rows = RowSelection::Indices(vec![100, 200]);
    let cancel = CancelToken::new();
    let err = inspector
        .export(&request, |_, _| {}, &cancel)
        .expect_err("out of extent");
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert!(!output.exists());
}

#[test]
fn read_range_is_clamped_to_extent() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = fixture(&temp);

    let inspector = Inspector::open(&path).expect("open");
    let table = inspector.read("df", Some((5, 100))).expect("read");
    assert_eq!(table.n_rows(), 3);
    assert_eq!(table.rows()[0][0], CellValue::Int(105));
}

#[test]
fn list_reports_tables_without_descending_into_them() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = fixture(&temp);

    let inspector = Inspector::open(&path).expect("open");
    let entries = inspector.list().expect("list");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "df");
    assert_eq!(entries[0].kind, NodeKind::Table);
}
