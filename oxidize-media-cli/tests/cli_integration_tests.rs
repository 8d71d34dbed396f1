//! Integration tests for the oxidize-media CLI
//!
//! Each test runs the built binary against files in a private temp
//! directory and checks the written output.

use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use lopdf::{dictionary, Document, Object, Stream};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{tempdir, TempDir};

fn cli_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_oxidize-media"))
}

/// Run the CLI with its staging directory inside `temp`.
fn run_cli(temp: &TempDir, args: &[&str]) -> Output {
    Command::new(cli_path())
        .arg("--temp-dir")
        .arg(temp.path().join("staging"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run CLI")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.path().join(name);
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([120, 10, 10, 255])))
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

/// A PDF whose page `n` has a MediaBox width of `100 + n`.
fn write_pdf(dir: &TempDir, name: &str, pages: usize) -> PathBuf {
    let mut document = Document::with_version("1.7");
    let pages_id = document.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for number in 1..=pages {
        let content_id = document.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(100 + number as i64),
                Object::Integer(100),
            ],
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let path = dir.path().join(name);
    document.save(&path).unwrap();
    path
}

fn page_numbers(path: &Path) -> Vec<i64> {
    let document = Document::load(path).unwrap();
    document
        .get_pages()
        .into_values()
        .map(|id| {
            let page = document.get_dictionary(id).unwrap();
            page.get(b"MediaBox").unwrap().as_array().unwrap()[2]
                .as_i64()
                .unwrap()
                - 100
        })
        .collect()
}

fn staging_is_empty(temp: &TempDir) -> bool {
    fs::read_dir(temp.path().join("staging"))
        .map(|entries| entries.count() == 0)
        .unwrap_or(true)
}

#[test]
fn test_cli_help() {
    let output = Command::new(cli_path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["compress", "resize", "merge", "split", "rotate", "sweep"] {
        assert!(stdout.contains(command), "help should list {command}");
    }
}

#[test]
fn test_cli_compress_to_webp() {
    let temp = tempdir().unwrap();
    let input = write_png(&temp, "in.png", 40, 30);
    let output_path = temp.path().join("out.webp");

    let output = run_cli(
        &temp,
        &[
            "compress",
            path_str(&input),
            "-o",
            path_str(&output_path),
            "--format",
            "webp",
            "--quality",
            "60",
        ],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let decoded = image::open(&output_path).unwrap();
    assert_eq!(decoded.dimensions(), (40, 30));
    assert!(staging_is_empty(&temp));
}

#[test]
fn test_cli_resize_and_ico() {
    let temp = tempdir().unwrap();
    let input = write_png(&temp, "in.png", 300, 150);
    let resized = temp.path().join("small.png");
    let icon = temp.path().join("icon.ico");

    let output = run_cli(
        &temp,
        &["resize", path_str(&input), "-o", path_str(&resized), "--width", "100"],
    );
    assert!(output.status.success());
    assert_eq!(image::open(&resized).unwrap().dimensions(), (100, 50));

    let output = run_cli(&temp, &["ico", path_str(&input), "-o", path_str(&icon)]);
    assert!(output.status.success());
    let bytes = fs::read(&icon).unwrap();
    let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Ico).unwrap();
    assert_eq!(decoded.dimensions(), (256, 256));
}

#[test]
fn test_cli_crop_out_of_bounds_fails() {
    let temp = tempdir().unwrap();
    let input = write_png(&temp, "in.png", 20, 20);
    let output_path = temp.path().join("crop.png");

    let output = run_cli(
        &temp,
        &[
            "crop",
            path_str(&input),
            "-o",
            path_str(&output_path),
            "--left",
            "15",
            "--width",
            "10",
            "--height",
            "10",
        ],
    );

    assert!(!output.status.success());
    assert!(!output_path.exists());
    assert!(staging_is_empty(&temp));
}

#[test]
fn test_cli_merge_split_organize_rotate() {
    let temp = tempdir().unwrap();
    let first = write_pdf(&temp, "a.pdf", 2);
    let second = write_pdf(&temp, "b.pdf", 3);
    let merged = temp.path().join("merged.pdf");
    let split = temp.path().join("split.pdf");
    let organized = temp.path().join("organized.pdf");
    let rotated = temp.path().join("rotated.pdf");

    let output = run_cli(
        &temp,
        &["merge", path_str(&first), path_str(&second), "-o", path_str(&merged)],
    );
    assert!(output.status.success());
    assert_eq!(page_numbers(&merged), vec![1, 2, 1, 2, 3]);

    let output = run_cli(
        &temp,
        &["split", path_str(&merged), "-o", path_str(&split), "--pages", "5,1,99"],
    );
    assert!(output.status.success());
    assert_eq!(page_numbers(&split), vec![3, 1]);

    let output = run_cli(
        &temp,
        &["organize", path_str(&second), "-o", path_str(&organized), "--order", "[3,1,1]"],
    );
    assert!(output.status.success());
    assert_eq!(page_numbers(&organized), vec![3, 1, 1]);

    let output = run_cli(
        &temp,
        &["rotate", path_str(&first), "-o", path_str(&rotated), "--angle", "180"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("rotated 2 pages 180 degrees"));
    assert!(staging_is_empty(&temp));
}

#[test]
fn test_cli_rejects_bad_angle() {
    let temp = tempdir().unwrap();
    let input = write_pdf(&temp, "in.pdf", 1);
    let output_path = temp.path().join("out.pdf");

    let output = run_cli(
        &temp,
        &["rotate", path_str(&input), "-o", path_str(&output_path), "--angle", "45"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid angle"));
}

#[test]
fn test_cli_sweep_on_empty_directory() {
    let temp = tempdir().unwrap();
    let output = run_cli(&temp, &["sweep"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("0 removed"));
}

#[test]
fn test_cli_missing_input_file() {
    let temp = tempdir().unwrap();
    let output = run_cli(
        &temp,
        &["compress", "/nonexistent/input.png", "-o", "/tmp/never.png"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));
}
