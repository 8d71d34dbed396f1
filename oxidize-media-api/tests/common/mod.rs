#![allow(dead_code)]

use std::io::{Cursor, Write};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use lopdf::{dictionary, Document, Object, Stream};
use oxidize_media_api::{app, ServerConfig};
use tempfile::TempDir;

pub const API_KEY: &str = "test-secret";
pub const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

/// App wired to a private temp directory and a known key.
pub fn test_app() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let config = ServerConfig::default()
        .with_api_key(API_KEY)
        .with_temp_dir(dir.path());
    (dir, app(&config))
}

pub fn leftover_files(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0)
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image =
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([30, 160, 90, 255])));
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

/// A PDF whose page `n` (1-based) has a MediaBox width of `100 + n`.
pub fn numbered_pdf(pages: usize) -> Vec<u8> {
    let mut document = Document::with_version("1.7");
    let pages_id = document.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(pages);
    for number in 1..=pages {
        let content = format!("BT /F1 18 Tf 10 50 Td (Page {number}) Tj ET");
        let content_id = document.add_object(Stream::new(dictionary! {}, content.into_bytes()));
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

    let mut output = Vec::new();
    document.save_to(&mut output).unwrap();
    output
}

/// Page numbers recovered from MediaBox widths.
pub fn page_numbers(pdf: &[u8]) -> Vec<i64> {
    let document = Document::load_mem(pdf).unwrap();
    document
        .get_pages()
        .into_values()
        .map(|id| {
            let page = document.get_dictionary(id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap() - 100
        })
        .collect()
}

pub fn page_rotations(pdf: &[u8]) -> Vec<i64> {
    let document = Document::load_mem(pdf).unwrap();
    document
        .get_pages()
        .into_values()
        .map(|id| {
            let page = document.get_dictionary(id).unwrap();
            page.get(b"Rotate").and_then(Object::as_i64).unwrap_or(0)
        })
        .collect()
}

/// One multipart part.
pub enum Part<'a> {
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        write!(body, "--{}\r\n", BOUNDARY).unwrap();
        match part {
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                write!(
                    body,
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    name, file_name
                )
                .unwrap();
                write!(body, "Content-Type: {}\r\n\r\n", content_type).unwrap();
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                write!(
                    body,
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                    name, value
                )
                .unwrap();
            }
        }
        write!(body, "\r\n").unwrap();
    }
    write!(body, "--{}--\r\n", BOUNDARY).unwrap();
    body
}

pub fn multipart_request(uri: &str, key: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri).header(
        "Content-Type",
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

pub fn image_part(data: &[u8]) -> Part<'_> {
    Part::File {
        name: "file",
        file_name: "image.png",
        content_type: "image/png",
        data,
    }
}

pub fn pdf_part<'a>(name: &'a str, data: &'a [u8]) -> Part<'a> {
    Part::File {
        name,
        file_name: "document.pdf",
        content_type: "application/pdf",
        data,
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
