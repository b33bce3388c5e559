use std::fmt::Write;

use citation_core::{AppViewModel, BannerLevel, CitationRow};

const TEXT_WIDTH: usize = 32;
const URL_WIDTH: usize = 48;
const DOMAIN_WIDTH: usize = 24;

pub fn report(view: &AppViewModel, with_preview: bool) -> String {
    let mut out = String::new();
    if let Some(banner) = &view.banner {
        let tag = match banner.level {
            BannerLevel::Success => "ok",
            BannerLevel::Warning => "warning",
            BannerLevel::Error => "error",
        };
        let _ = writeln!(out, "[{tag}] {}", banner.message);
    }
    if let Some(path) = &view.export_path {
        let _ = writeln!(out, "Saved to {}", path.display());
    }
    if with_preview && !view.rows.is_empty() {
        out.push('\n');
        out.push_str(&preview_table(&view.rows));
    }
    out
}

pub fn preview_table(rows: &[CitationRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<TEXT_WIDTH$}  {:<URL_WIDTH$}  {:<DOMAIN_WIDTH$}  {:>3}  {:>5}",
        "Text", "URL", "Domain", "ID", "Conf"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<TEXT_WIDTH$}  {:<URL_WIDTH$}  {:<DOMAIN_WIDTH$}  {:>3}  {:>5}",
            clip(&row.text, TEXT_WIDTH),
            clip(&row.url, URL_WIDTH),
            clip(&row.domain, DOMAIN_WIDTH),
            row.citation_id,
            row.confidence
        );
    }
    out
}

/// Shortens `value` to at most `width` characters, marking the cut with `~`.
fn clip(value: &str, width: usize) -> String {
    let single_line: String = value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if single_line.chars().count() <= width {
        return single_line;
    }
    let mut clipped: String = single_line.chars().take(width.saturating_sub(1)).collect();
    clipped.push('~');
    clipped
}
