//! `/links/<n>/<offset>` (`spec.md` §4.F): renders `n` sequential links, the
//! `offset`'th rendered as plain text instead of a link, so a crawler
//! following the chain can be tested against a self-terminating page.

use crate::error::Error;
use crate::http::{Request, Response};

pub async fn links(req: &Request) -> Result<Response, Error> {
    let rest = req
        .path
        .strip_prefix("/links/")
        .ok_or_else(|| Error::InvalidPathParameter("missing links parameters".into()))?;
    let mut parts = rest.splitn(2, '/');
    let n: u32 = parts
        .next()
        .ok_or_else(|| Error::InvalidPathParameter("missing link count".into()))?
        .parse()
        .map_err(|_| Error::InvalidPathParameter("invalid link count".into()))?;
    let offset: u32 = parts
        .next()
        .map(|v| v.parse())
        .transpose()
        .map_err(|_| Error::InvalidPathParameter("invalid link offset".into()))?
        .unwrap_or(0);

    let mut body = String::from("<html><head><title>Links</title></head><body>");
    for i in 0..n {
        if i == offset {
            body.push_str(&format!("{i} "));
        } else {
            body.push_str(&format!("<a href=\"/links/{n}/{i}\">{i}</a> "));
        }
    }
    body.push_str("</body></html>");

    Ok(Response::html(200, body))
}
