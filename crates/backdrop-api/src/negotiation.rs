//! Content negotiation: gallery page or image bytes, and which source to read.

use backdrop_core::{OutputFormat, PhotoName, SourceRequest};
use url::Url;

/// What a request should be answered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiated {
    Gallery,
    Image(SourceRequest),
}

/// Choose the response for a request whose inputs are already validated.
///
/// An explicit target (a named photo or a remote URL) is always served as an
/// image. Otherwise the `Accept` header decides between the gallery and a
/// random (or default) photo.
pub fn negotiate(
    name: Option<PhotoName>,
    remote: Option<Url>,
    catalog_enabled: bool,
    accept: Option<&str>,
    format: OutputFormat,
) -> Negotiated {
    if let Some(name) = name {
        return Negotiated::Image(SourceRequest::Named(name));
    }
    if let Some(url) = remote {
        return Negotiated::Image(SourceRequest::Remote(url));
    }

    if prefers_html(accept, format.to_mime_type()) {
        return Negotiated::Gallery;
    }

    if catalog_enabled {
        Negotiated::Image(SourceRequest::Random)
    } else {
        Negotiated::Image(SourceRequest::Default)
    }
}

/// One entry of an `Accept` header
#[derive(Debug, Clone, PartialEq)]
struct MediaRange {
    kind: String,
    subtype: String,
    q: f32,
}

impl MediaRange {
    /// How specifically this range names `mime`: 2 exact, 1 `type/*`, 0 `*/*`.
    fn specificity(&self, kind: &str, subtype: &str) -> Option<u8> {
        if self.kind == "*" && self.subtype == "*" {
            Some(0)
        } else if self.kind != kind {
            None
        } else if self.subtype == "*" {
            Some(1)
        } else if self.subtype == subtype {
            Some(2)
        } else {
            None
        }
    }
}

fn parse_accept(header: &str) -> Vec<MediaRange> {
    header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let (kind, subtype) = parts.next()?.trim().split_once('/')?;
            let (kind, subtype) = (kind.trim(), subtype.trim());
            if kind.is_empty() || subtype.is_empty() {
                return None;
            }

            let q = parts
                .filter_map(|param| param.trim().split_once('='))
                .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
                .and_then(|(_, value)| value.trim().parse::<f32>().ok())
                .map(|q| q.clamp(0.0, 1.0))
                .unwrap_or(1.0);

            Some(MediaRange {
                kind: kind.to_ascii_lowercase(),
                subtype: subtype.to_ascii_lowercase(),
                q,
            })
        })
        .collect()
}

/// q-value and header position of the most specific range matching `mime`.
fn best_match(ranges: &[MediaRange], mime: &str) -> Option<(f32, usize)> {
    let (kind, subtype) = mime.split_once('/')?;
    ranges
        .iter()
        .enumerate()
        .filter_map(|(index, range)| {
            range
                .specificity(kind, subtype)
                .map(|specificity| (specificity, index, range.q))
        })
        // Most specific wins; among equals the earliest entry
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, index, q)| (q, index))
}

/// Whether `accept` prefers an HTML page over `image_mime`.
///
/// HTML wins on a strictly higher q-value, or on an equal non-zero q-value
/// when its matching range is listed first. A missing header or a bare
/// `*/*` never prefers HTML.
pub fn prefers_html(accept: Option<&str>, image_mime: &str) -> bool {
    let Some(accept) = accept else {
        return false;
    };
    let ranges = parse_accept(accept);

    let Some((html_q, html_index)) = best_match(&ranges, "text/html") else {
        return false;
    };
    if html_q <= 0.0 {
        return false;
    }

    match best_match(&ranges, image_mime) {
        None => true,
        Some((image_q, image_index)) => {
            html_q > image_q || (html_q == image_q && html_index < image_index)
        }
    }
}
