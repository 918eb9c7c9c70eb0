use std::sync::LazyLock;

use hoard_core::{AssetKind, AssetRef};
use regex::Regex;

const MAX_COMPONENT_LEN: usize = 160;
const DEFAULT_EXTENSION: &str = "jpg";

static PAGE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)_p(\d+)\.(jpg|jpeg|png|gif|webp)$").expect("page token pattern")
});

/// Deterministic file name for an asset: `{item}_p{page}.{ext}` for pages,
/// `{item}.archive.zip` for composites.
pub fn asset_file_name(asset: &AssetRef) -> String {
    let item = sanitize_component(asset.owner_item_id.as_str());
    match asset.kind {
        AssetKind::Composite => format!("{item}.archive.zip"),
        AssetKind::Static => {
            let (page, ext) = page_token(&asset.url)
                .unwrap_or_else(|| (asset.page_index, DEFAULT_EXTENSION.to_string()));
            format!("{item}_p{page}.{ext}")
        }
    }
}

/// Page index and lowercase extension encoded in an original-asset URL.
pub fn page_token(url: &str) -> Option<(u32, String)> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let captures = PAGE_TOKEN.captures(path)?;
    let page = captures.get(1)?.as_str().parse().ok()?;
    let ext = captures.get(2)?.as_str().to_ascii_lowercase();
    Some((page, ext))
}

/// Make an identifier safe to use as a single path component.
pub fn sanitize_component(input: &str) -> String {
    let cleaned: String = input
        .trim()
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();

    // Collapse runs of underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let mut name: String = compacted
        .trim_matches(&['_', ' ', '.'][..])
        .chars()
        .take(MAX_COMPONENT_LEN)
        .collect();
    if name.is_empty() {
        name = "unknown".to_string();
    }
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
