//! HTML gallery of the photos in the catalog.

use std::collections::BTreeSet;

use backdrop_core::constants::GALLERY_THUMBNAIL_SIZE;
use maud::{html, Markup, DOCTYPE};

const GALLERY_CSS: &str = "main { display: flex; flex-wrap: wrap; gap: 4px; } img { display: block; }";

/// Render the gallery page for a catalog snapshot.
///
/// Each photo is shown as a square thumbnail served by this same service.
pub fn render(photos: &BTreeSet<String>, title: &str) -> String {
    base_document(
        title,
        html! {
            h1 { (title) }
            main {
                @for photo in photos {
                    img src=(thumbnail_src(photo)) alt=(photo) loading="lazy";
                }
            }
        },
    )
    .into_string()
}

fn thumbnail_src(photo: &str) -> String {
    format!(
        "/{}?w={size}&h={size}",
        photo,
        size = GALLERY_THUMBNAIL_SIZE
    )
}

fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                link rel="icon" type="image/png" href="/?t=png&w=200";
                style { (GALLERY_CSS) }
            }
            body {
                (content)
            }
        }
    }
}
