//! Fixed-content-type payload endpoints: `/html`, `/xml`, `/json`,
//! `/image`, `/image/<fmt>` (`spec.md` §4.F).
//!
//! Like the templated HTML pages in `handlers::misc`, the bodies here are
//! opaque static content -- the interesting part of each of these
//! endpoints is the `Content-Type` it answers with, not the bytes
//! themselves.

use crate::error::Error;
use crate::http::{Request, Response};
use serde_json::json;

const HTML_TEMPLATE: &str = include_str!("../../templates/sample.html");
const XML_TEMPLATE: &str = include_str!("../../templates/sample.xml");

/// A fixed 1x1 transparent PNG, reused as the body for every `/image`
/// format variant -- only the declared `Content-Type` changes between
/// them, the same "one blob, many labels" shortcut the teacher takes for
/// static content elsewhere.
const PNG_PIXEL: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x62, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

const SVG_PIXEL: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"1\" height=\"1\"><rect width=\"1\" height=\"1\" fill=\"#000\"/></svg>";

pub async fn html() -> Result<Response, Error> {
    Ok(Response::html(200, HTML_TEMPLATE))
}

pub async fn xml() -> Result<Response, Error> {
    Ok(Response::new(200)
        .header("Content-Type", "application/xml")
        .with_body(XML_TEMPLATE.as_bytes().to_vec()))
}

pub async fn json() -> Result<Response, Error> {
    Ok(Response::json(
        200,
        &json!({
            "slideshow": {
                "title": "Sample Slide Show",
                "author": "Yours Truly",
                "slides": [
                    {"title": "Wake up to WonderWidgets!"},
                    {"title": "Overview"},
                ],
            }
        }),
    ))
}

/// `/image`: honors `Accept` to pick a format (png by default), matching
/// the pack's general habit of content-negotiating rather than hardcoding.
pub async fn image(req: &Request) -> Result<Response, Error> {
    let format = match req.header("accept") {
        Some(accept) if accept.contains("image/webp") => "webp",
        Some(accept) if accept.contains("image/svg+xml") => "svg",
        Some(accept) if accept.contains("image/jpeg") => "jpeg",
        _ => "png",
    };
    image_for(format)
}

/// `/image/<fmt>`: explicit format selection.
pub async fn image_format(req: &Request) -> Result<Response, Error> {
    let format = req
        .path
        .strip_prefix("/image/")
        .ok_or_else(|| Error::InvalidPathParameter("missing image format".into()))?;
    image_for(format)
}

fn image_for(format: &str) -> Result<Response, Error> {
    match format {
        "png" => Ok(Response::new(200)
            .header("Content-Type", "image/png")
            .with_body(PNG_PIXEL.to_vec())),
        "jpeg" | "jpg" => Ok(Response::new(200)
            .header("Content-Type", "image/jpeg")
            .with_body(PNG_PIXEL.to_vec())),
        "webp" => Ok(Response::new(200)
            .header("Content-Type", "image/webp")
            .with_body(PNG_PIXEL.to_vec())),
        "svg" => Ok(Response::new(200)
            .header("Content-Type", "image/svg+xml")
            .with_body(SVG_PIXEL.as_bytes().to_vec())),
        other => Err(Error::InvalidPathParameter(format!(
            "unsupported image format: {other}"
        ))),
    }
}
