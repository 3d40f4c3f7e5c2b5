use bv_core::{Error, Result, ScrapedImage};
use scraper::{ElementRef, Html, Selector};
use url::Url;

const BLOCKS: [&str; 10] = ["h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "blockquote", "pre"];
const SKIPPED_ANCESTORS: [&str; 7] = ["script", "style", "noscript", "nav", "footer", "header", "aside"];

pub fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))
}

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Scraping(format!("Invalid selector {}: {:?}", css, e)))
}

pub fn extract_text(document: &Html, css: &str) -> Result<String> {
    let selector = selector(css)?;
    document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .ok_or_else(|| Error::Scraping(format!("No element found for selector: {}", css)))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_skipped(element: &ElementRef) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .map(|e| SKIPPED_ANCESTORS.contains(&e.name()))
            .unwrap_or(false)
    })
}

/// A block nested in another block is already part of the outer block's text.
fn inside_block(element: &ElementRef, root: Option<&ElementRef>) -> bool {
    element
        .ancestors()
        .take_while(|node| root.map_or(true, |r| node.id() != r.id()))
        .any(|node| {
            node.value()
                .as_element()
                .map(|e| BLOCKS.contains(&e.name()))
                .unwrap_or(false)
        })
}

/// The element content lives under, falling back to the whole document.
fn content_root<'a>(document: &'a Html, root: Option<&str>) -> Result<Option<ElementRef<'a>>> {
    match root {
        Some(css) => Ok(document.select(&selector(css)?).next()),
        None => Ok(None),
    }
}

/// Flattens a page to markdown-ish lines: headings keep `#` markers,
/// list items become `- ` bullets, everything else a paragraph.
pub fn html_to_text(document: &Html, root: Option<&str>) -> Result<String> {
    let blocks = selector(&BLOCKS.join(", "))?;
    let root = content_root(document, root)?;
    let elements: Vec<ElementRef> = match root {
        Some(root) => root.select(&blocks).collect(),
        None => document.select(&blocks).collect(),
    };

    let mut lines = Vec::new();
    for element in elements {
        if is_skipped(&element) || inside_block(&element, root.as_ref()) {
            continue;
        }
        let name = element.value().name();
        let text = collapse_whitespace(&element.text().collect::<String>());
        if text.is_empty() {
            continue;
        }
        let line = match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                format!("{} {}", "#".repeat(level), text)
            }
            "li" => format!("- {}", text),
            "blockquote" => format!("> {}", text),
            _ => text,
        };
        lines.push(line);
    }
    Ok(lines.join("\n\n"))
}

/// Up to `limit` images with absolute URLs.
pub fn extract_images(
    document: &Html,
    root: Option<&str>,
    base: &Url,
    limit: usize,
) -> Result<Vec<ScrapedImage>> {
    let img = selector("img")?;
    let root = content_root(document, root)?;
    let elements: Vec<ElementRef> = match root {
        Some(root) => root.select(&img).collect(),
        None => document.select(&img).collect(),
    };

    Ok(elements
        .into_iter()
        .filter_map(|el| {
            let src = el.value().attr("src")?.trim();
            if src.is_empty() || src.starts_with("data:") {
                return None;
            }
            let url = base.join(src).ok()?;
            Some(ScrapedImage {
                url: url.to_string(),
                alt_text: el.value().attr("alt").unwrap_or_default().trim().to_string(),
                caption: el.value().attr("title").map(|t| t.trim().to_string()),
            })
        })
        .take(limit)
        .collect())
}

/// Drops inline markup from API snippets such as `<span class="searchmatch">`.
pub fn strip_tags(fragment: &str) -> String {
    let document = Html::parse_fragment(fragment);
    collapse_whitespace(&document.root_element().text().collect::<String>())
}
