use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use stbench::downsample::{self, sample_size, DownsampleConfig, TileId};
use stbench::table::{read_parquet, write_parquet};
use stbench::{Error, Logger};

fn transcripts(rows: usize, offset: i64) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("transcript_id", DataType::Int64, false),
        Field::new("feature_name", DataType::Utf8, false),
        Field::new("x_location", DataType::Float64, false),
    ]));
    let ids: Vec<i64> = (0..rows as i64).map(|i| i + offset).collect();
    let genes: Vec<String> = (0..rows).map(|i| format!("gene{}", i % 7)).collect();
    let xs: Vec<f64> = (0..rows).map(|i| i as f64 * 0.25).collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(genes)),
            Arc::new(Float64Array::from(xs)),
        ],
    )
    .unwrap()
}

fn transcript_ids(batch: &RecordBatch) -> Vec<i64> {
    batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap()
        .values()
        .to_vec()
}

fn logger(dir: &Path) -> Logger {
    Logger::new(File::create(dir.join("downsample.log")).unwrap())
}

#[test]
fn writes_half_of_each_tile() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let rows = 101;
    write_parquet(&input.path().join("transcripts_x0_y0.parquet"), &transcripts(rows, 0)).unwrap();
    write_parquet(&input.path().join("transcripts_x1_y0.parquet"), &transcripts(rows, 1000)).unwrap();
    // Not a tile: must be ignored by the pattern.
    write_parquet(&input.path().join("cells_x0_y0.parquet"), &transcripts(3, 0)).unwrap();

    let config = DownsampleConfig::new(input.path()).with_output_dir(output.path());
    let outcomes = downsample::run(&config, &mut logger(output.path())).unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(sample_size(rows, 0.5), 50);
    for (outcome, name) in outcomes.iter().zip([
        "transcripts_downsample0.5_x0_y0.parquet",
        "transcripts_downsample0.5_x1_y0.parquet",
    ]) {
        assert_eq!(outcome.destination, output.path().join(name));
        assert_eq!(outcome.rows_in, rows);
        assert_eq!(outcome.rows_out, 50);

        let sampled = read_parquet(&outcome.destination).unwrap();
        assert_eq!(sampled.num_rows(), 50);
        assert_eq!(sampled.schema(), transcripts(0, 0).schema());
    }

    let first = read_parquet(&outcomes[0].destination).unwrap();
    let mut ids = transcript_ids(&first);
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 50);
    assert!(ids.iter().all(|&id| (0..rows as i64).contains(&id)));

    // Columns travel together with their row.
    let genes = first.column(1).as_any().downcast_ref::<StringArray>().unwrap();
    for (row, id) in transcript_ids(&first).into_iter().enumerate() {
        assert_eq!(genes.value(row), format!("gene{}", id % 7));
    }
}

#[test]
fn same_seed_selects_same_rows() {
    let input = tempfile::tempdir().unwrap();
    let out_a = tempfile::tempdir().unwrap();
    let out_b = tempfile::tempdir().unwrap();
    write_parquet(&input.path().join("transcripts_x2_y5.parquet"), &transcripts(64, 0)).unwrap();

    let run = |out: &Path| {
        let config = DownsampleConfig::new(input.path()).with_output_dir(out);
        downsample::run(&config, &mut logger(out)).unwrap();
        read_parquet(&out.join("transcripts_downsample0.5_x2_y5.parquet")).unwrap()
    };
    let a = run(out_a.path());
    let b = run(out_b.path());
    assert_eq!(a, b);

    let other_seed = DownsampleConfig::new(input.path())
        .with_output_dir(out_b.path())
        .with_seed(7);
    let outcome =
        downsample::downsample_file(&input.path().join("transcripts_x2_y5.parquet"), &other_seed)
            .unwrap();
    let c = read_parquet(&outcome.destination).unwrap();
    assert_ne!(transcript_ids(&a), transcript_ids(&c));
}

#[test]
fn empty_directory_is_a_no_op() {
    let input = tempfile::tempdir().unwrap();
    let config = DownsampleConfig::new(input.path()).with_output_dir(input.path());
    let outcomes = downsample::run(&config, &mut logger(input.path())).unwrap();
    assert!(outcomes.is_empty());
}

#[test]
fn corrupt_tile_stops_the_run() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("transcripts_x0_y0.parquet"), b"not parquet").unwrap();

    let config = DownsampleConfig::new(input.path()).with_output_dir(output.path());
    let err = downsample::run(&config, &mut logger(output.path())).unwrap_err();
    assert!(matches!(err, Error::Parquet(_)));
    assert!(!output
        .path()
        .join("transcripts_downsample0.5_x0_y0.parquet")
        .exists());
}

#[test]
fn odd_row_counts_round_half_to_even() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    // 5 * 0.5 = 2.5 -> 2 ; 7 * 0.5 = 3.5 -> 4
    write_parquet(&input.path().join("transcripts_x0_y1.parquet"), &transcripts(5, 0)).unwrap();
    write_parquet(&input.path().join("transcripts_x0_y2.parquet"), &transcripts(7, 0)).unwrap();

    let config = DownsampleConfig::new(input.path()).with_output_dir(output.path());
    let outcomes = downsample::run(&config, &mut logger(output.path())).unwrap();
    let by_tile: Vec<(TileId, usize)> = outcomes
        .into_iter()
        .map(|o| (o.tile, o.rows_out))
        .collect();
    assert_eq!(
        by_tile,
        vec![
            (TileId { x: "0".into(), y: "1".into() }, 2),
            (TileId { x: "0".into(), y: "2".into() }, 4),
        ]
    );
}

#[test]
fn suffixed_tile_names_are_processed() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_parquet(&input.path().join("transcripts_x0_y0.parquet"), &transcripts(10, 0)).unwrap();
    write_parquet(&input.path().join("transcripts_x1_y0_rep2.parquet"), &transcripts(10, 0)).unwrap();

    let config = DownsampleConfig::new(input.path()).with_output_dir(output.path());
    let outcomes = downsample::run(&config, &mut logger(output.path())).unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(
        outcomes[1].destination,
        output.path().join("transcripts_downsample0.5_x1_y0_rep2.parquet")
    );
    assert_eq!(read_parquet(&outcomes[1].destination).unwrap().num_rows(), 5);
}

#[test]
fn input_dir_with_glob_metacharacters() {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("run[1]");
    std::fs::create_dir(&input).unwrap();
    write_parquet(&input.join("transcripts_x0_y0.parquet"), &transcripts(4, 0)).unwrap();

    let config = DownsampleConfig::new(&input).with_output_dir(root.path());
    let outcomes = downsample::run(&config, &mut logger(root.path())).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].rows_out, 2);
}
