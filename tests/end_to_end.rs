//! End-to-end runs through the public API with the real codec backend.
//!
//! Each test builds its own input directory in a tempdir, runs a pipeline
//! over it and inspects what lands in the output directory.

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use retouch::batch::{Batch, UnitStatus};
use retouch::imaging::{ImageBackend, RustBackend};
use retouch::operations::OpContext;
use retouch::pipeline::{OperationDescriptor, Pipeline, PipelineError};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

const RED: [u8; 3] = [220, 30, 30];
const BLUE: [u8; 3] = [30, 30, 220];

/// Left half red, right half blue.
fn halves(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 { Rgb(RED) } else { Rgb(BLUE) }
    }))
}

fn close_to(actual: [u8; 3], expected: [u8; 3]) -> bool {
    actual
        .iter()
        .zip(expected.iter())
        .all(|(a, e)| (*a as i16 - *e as i16).abs() <= 40)
}

fn write(path: &Path, image: &DynamicImage) {
    image.save(path).unwrap();
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn resize_then_mirror_writes_same_name() {
    let tmp = tempfile::TempDir::new().unwrap();
    let input = tmp.path().join("input");
    let output = tmp.path().join("output");
    std::fs::create_dir_all(&input).unwrap();
    write(&input.join("x.jpg"), &halves(200, 100));

    let pipeline = Pipeline::from_descriptors(&[
        OperationDescriptor::new("Resize", json!({"height": 50, "width": 0})),
        OperationDescriptor::new("Flip", json!({"vertical": true})),
    ])
    .unwrap();

    let backend = RustBackend::new();
    let exts = vec!["jpg".to_string(), "png".to_string()];
    let mut batch = Batch::load(&input, &output, &exts, &backend).unwrap();
    let report = batch.run(Arc::new(pipeline), &backend, &OpContext::default(), None);

    assert_eq!(report.written(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(file_names(&output), vec!["x.jpg"]);

    let result = backend.decode(&output.join("x.jpg")).unwrap();
    assert_eq!(result.dimensions(), (100, 50));
    let rgb = result.to_rgb8();
    assert!(close_to(rgb.get_pixel(10, 25).0, BLUE));
    assert!(close_to(rgb.get_pixel(90, 25).0, RED));
}

#[test]
fn failing_unit_does_not_stop_the_batch() {
    let tmp = tempfile::TempDir::new().unwrap();
    let input = tmp.path().join("input");
    let output = tmp.path().join("output");
    std::fs::create_dir_all(&input).unwrap();
    write(&input.join("a.png"), &halves(40, 20));
    write(&input.join("b.png"), &halves(40, 20));

    // An empty crop region fails every unit at step 2; resize alone succeeds.
    let failing = Pipeline::from_descriptors(&[
        OperationDescriptor::new("Resize", json!({"width": 20})),
        OperationDescriptor::new("Crop", json!({"lt_position_rate": [1.0, 1.0]})),
    ])
    .unwrap();

    let backend = RustBackend::new();
    let exts = vec!["png".to_string()];
    let mut batch = Batch::load(&input, &output, &exts, &backend).unwrap();
    let report = batch.run(Arc::new(failing), &backend, &OpContext::default(), None);

    assert_eq!(report.failed(), 2);
    for outcome in &report.outcomes {
        let UnitStatus::Failed(reason) = &outcome.status else {
            panic!("expected failure, got {:?}", outcome.status);
        };
        assert!(reason.starts_with("Step 2 (Crop) failed"), "{reason}");
    }
    assert!(!output.join("a.png").exists());
}

#[test]
fn reconcile_drops_outputs_without_input() {
    let tmp = tempfile::TempDir::new().unwrap();
    let input = tmp.path().join("input");
    let output = tmp.path().join("output");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::create_dir_all(&output).unwrap();
    for name in ["a.png", "c.png"] {
        write(&input.join(name), &halves(8, 8));
    }
    for name in ["a.png", "b.png", "c.png"] {
        write(&output.join(name), &halves(8, 8));
    }

    let backend = RustBackend::new();
    let exts = vec!["png".to_string()];
    let mut batch = Batch::load(&input, &output, &exts, &backend).unwrap();

    let result = batch.reconcile(false).unwrap();
    assert_eq!(result.kept, vec!["a.png", "c.png"]);
    assert_eq!(result.removed, vec!["b.png"]);
    assert_eq!(batch.outputs, vec!["a.png", "c.png"]);
    assert!(output.join("b.png").exists());

    let result = batch.reconcile(true).unwrap();
    assert_eq!(result.pruned, 1);
    assert_eq!(file_names(&output), vec!["a.png", "c.png"]);
}

#[test]
fn pipeline_file_round_trip() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("steps.json");
    std::fs::write(
        &path,
        r#"[
            {"process": "rotate", "arg": {"rotate": 180}},
            {"name": "Background-Masking", "parameters": {"mode": "none"}}
        ]"#,
    )
    .unwrap();

    let pipeline = Pipeline::load(&path).unwrap();
    assert_eq!(pipeline.len(), 2);

    let image = halves(30, 10);
    let result = pipeline.apply(&image, &OpContext::default()).unwrap();
    assert_eq!(result.dimensions(), (30, 10));
    assert!(close_to(result.to_rgb8().get_pixel(5, 5).0, BLUE));
}

#[test]
fn unknown_operation_is_rejected_before_any_image() {
    let err = Pipeline::from_descriptors(&[OperationDescriptor::new("Sharpen", json!({}))])
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnknownOperation(name) if name == "Sharpen"));
}

#[test]
fn chained_noop_steps_leave_pixels_identical() {
    let pipeline = Pipeline::from_descriptors(&[
        OperationDescriptor::new("Resize", json!({"height": 0, "width": 0})),
        OperationDescriptor::new("Flip", json!({"vertical": false, "horizontal": false})),
        OperationDescriptor::new(
            "Crop",
            json!({"is_auto": false, "lt_position_rate": [0.0, 0.0], "crop_size_rate": [1.0, 1.0]}),
        ),
    ])
    .unwrap();

    let image = halves(37, 21);
    let result = pipeline.apply(&image, &OpContext::default()).unwrap();
    assert_eq!(result.dimensions(), image.dimensions());
    assert_eq!(result.as_bytes(), image.as_bytes());
}
