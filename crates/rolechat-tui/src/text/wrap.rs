//! Wrapping for plain and styled text.

use super::width::{char_width, visual_width};
use ratatui::{
    style::Style,
    text::{Line, Span},
};

/// Wrap plain text to `width` columns.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }
    textwrap::wrap(text, width)
        .into_iter()
        .map(std::borrow::Cow::into_owned)
        .collect()
}

/// Wrap each line to `width` columns, prefixing every output row with
/// `indent`. Empty input lines survive as indented blank rows.
pub fn wrap_lines(
    lines: impl IntoIterator<Item = Line<'static>>,
    width: usize,
    indent: &str,
) -> Vec<Line<'static>> {
    lines
        .into_iter()
        .flat_map(|line| wrap_styled(line, width, indent))
        .collect()
}

/// Greedy word wrap that keeps span styles. Words wider than a row are
/// broken at character boundaries.
pub fn wrap_styled(line: Line<'static>, width: usize, indent: &str) -> Vec<Line<'static>> {
    let line_style = line.style;
    let avail = width.saturating_sub(visual_width(indent)).max(1);
    let mut rows = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0;

    for span in line.spans {
        let style = span.style;
        for piece in span.content.split_inclusive(' ') {
            let word_width = visual_width(piece.trim_end_matches(' '));
            if used > 0 && used + word_width > avail {
                rows.push(finish_row(indent, std::mem::take(&mut current), line_style));
                used = 0;
                if piece.trim().is_empty() {
                    continue;
                }
            }
            if word_width > avail {
                for ch in piece.chars() {
                    let w = char_width(ch);
                    if used > 0 && used + w > avail {
                        rows.push(finish_row(indent, std::mem::take(&mut current), line_style));
                        used = 0;
                    }
                    push_text(&mut current, ch.encode_utf8(&mut [0; 4]), style);
                    used += w;
                }
                continue;
            }
            push_text(&mut current, piece, style);
            used += visual_width(piece);
        }
    }
    rows.push(finish_row(indent, current, line_style));
    rows
}

fn push_text(spans: &mut Vec<Span<'static>>, text: &str, style: Style) {
    match spans.last_mut() {
        Some(last) if last.style == style => last.content.to_mut().push_str(text),
        _ => spans.push(Span::styled(text.to_string(), style)),
    }
}

fn finish_row(indent: &str, mut spans: Vec<Span<'static>>, style: Style) -> Line<'static> {
    if !indent.is_empty() {
        spans.insert(0, Span::raw(indent.to_string()));
    }
    Line::from(spans).style(style)
}
