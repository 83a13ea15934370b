//! Request-body parsing dispatch (`spec.md` §4.D).
//!
//! Mirrors the "what kind of body is this" switch every `/post`-family
//! endpoint needs: form-urlencoded, multipart, JSON, or a plain string,
//! each surfaced as its own field of the reflection JSON tree (`form`,
//! `files`, `json`, `data`) the way the original echo tool does, rather
//! than collapsed into one generic blob. `GET` and `DELETE` carry a body
//! on the wire in this crate (nothing refuses to read it) but it is never
//! parsed as form/multipart/json -- it is only ever exposed as raw
//! `data`, matching the design notes' documented method quirk.

use crate::error::Error;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub struct ParsedBody {
    pub form: HashMap<String, String>,
    pub files: HashMap<String, Vec<u8>>,
    pub json: Option<Value>,
    pub data: Vec<u8>,
}

impl ParsedBody {
    fn empty(data: Vec<u8>) -> Self {
        Self {
            form: HashMap::new(),
            files: HashMap::new(),
            json: None,
            data,
        }
    }
}

/// Parses `body` according to `content_type`, honoring the GET/DELETE
/// quirk: those methods always get the raw-data-only treatment regardless
/// of the declared content type.
pub async fn parse_body(method: &str, content_type: Option<&str>, body: Vec<u8>) -> Result<ParsedBody, Error> {
    if matches!(method, "GET" | "DELETE") {
        return Ok(ParsedBody::empty(body));
    }

    let content_type = match content_type {
        Some(ct) => ct,
        None => return Ok(ParsedBody::empty(body)),
    };

    let essence = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();

    match essence.as_str() {
        "application/x-www-form-urlencoded" => {
            let form = url::form_urlencoded::parse(&body).into_owned().collect();
            Ok(ParsedBody {
                form,
                files: HashMap::new(),
                json: None,
                data: Vec::new(),
            })
        }
        "multipart/form-data" => parse_multipart(content_type, body).await,
        "application/json" => {
            let json: Value = serde_json::from_slice(&body)
                .map_err(|e| Error::BadRequest(format!("invalid JSON body: {e}")))?;
            Ok(ParsedBody {
                form: HashMap::new(),
                files: HashMap::new(),
                json: Some(json),
                data: Vec::new(),
            })
        }
        ct if ct.starts_with("data:") => Ok(ParsedBody::empty(body)),
        _ => Ok(ParsedBody::empty(body)),
    }
}

async fn parse_multipart(content_type: &str, body: Vec<u8>) -> Result<ParsedBody, Error> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| Error::Multipart(e.to_string()))?;
    let stream = tokio_stream::once(Ok::<_, std::io::Error>(body));
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut form = HashMap::new();
    let mut files = HashMap::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let is_file = field.file_name().is_some();
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| Error::Multipart(e.to_string()))?
        {
            bytes.extend_from_slice(&chunk);
        }

        if is_file {
            files.insert(name, bytes);
        } else {
            form.insert(name, String::from_utf8_lossy(&bytes).into_owned());
        }
    }

    Ok(ParsedBody {
        form,
        files,
        json: None,
        data: Vec::new(),
    })
}

/// Builds the `"form"`/`"files"` JSON objects the reflection endpoints
/// embed in their response tree.
pub fn body_to_json(parsed: &ParsedBody) -> (Value, Value) {
    let form = Value::Object(
        parsed
            .form
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<_, _>>(),
    );
    let files = Value::Object(
        parsed
            .files
            .keys()
            .map(|k| (k.clone(), Value::String(format!("{} bytes", parsed.files[k].len()))))
            .collect::<Map<_, _>>(),
    );
    (form, files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_urlencoded_form() {
        let parsed = parse_body(
            "POST",
            Some("application/x-www-form-urlencoded"),
            b"a=1&b=two".to_vec(),
        )
        .await
        .unwrap();
        assert_eq!(parsed.form.get("a").unwrap(), "1");
        assert_eq!(parsed.form.get("b").unwrap(), "two");
    }

    #[tokio::test]
    async fn parses_json_body() {
        let parsed = parse_body("POST", Some("application/json"), br#"{"x":1}"#.to_vec())
            .await
            .unwrap();
        assert_eq!(parsed.json.unwrap()["x"], 1);
    }

    #[tokio::test]
    async fn get_and_delete_never_parse_body() {
        let parsed = parse_body(
            "GET",
            Some("application/json"),
            br#"{"x":1}"#.to_vec(),
        )
        .await
        .unwrap();
        assert!(parsed.json.is_none());
        assert_eq!(parsed.data, br#"{"x":1}"#);
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let err = parse_body("POST", Some("application/json"), b"{not json".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }
}
