use crate::normalizer::{parse_groups, BlockGroup};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_KEY_TERMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(Requisitos|Especificaciones|Criterios|Objetivo|Alcance|Responsabilidades|Proceso|Materiales|Herramientas):",
    )
    .expect("valid key term regex")
});
static RE_MEASUREMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d+(?:\.\d+)?)(mm|cm|m|kg|g|L|ml)\b").expect("valid measurement regex")
});
static RE_NOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(NOTA|ADVERTENCIA|IMPORTANTE):").expect("valid note regex"));

/// Turns normalized marker text into presentational HTML.
///
/// Heading levels, list membership and table cell counts map one to one onto
/// `<h2>/<h3>`, `<ul><li>` and `<tr><td>` elements.
pub fn render_for_display(normalized: &str) -> String {
    parse_groups(normalized)
        .iter()
        .map(render_group)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_group(group: &BlockGroup) -> String {
    match group {
        BlockGroup::Heading { level, text } => {
            format!("<h{level}>{}</h{level}>", escape_html(text))
        }
        BlockGroup::List(items) => {
            let items = items
                .iter()
                .map(|item| format!("<li>{}</li>", decorate(item)))
                .collect::<String>();
            format!("<ul>{items}</ul>")
        }
        BlockGroup::Table(rows) => {
            let rows = rows
                .iter()
                .map(|cells| {
                    let cells = cells
                        .iter()
                        .map(|cell| format!("<td>{}</td>", escape_html(cell)))
                        .collect::<String>();
                    format!("<tr>{cells}</tr>")
                })
                .collect::<String>();
            format!("<table>{rows}</table>")
        }
        BlockGroup::Paragraph(lines) => {
            format!("<p>{}</p>", decorate(&lines.join(" ")))
        }
    }
}

fn decorate(text: &str) -> String {
    let escaped = escape_html(text);
    let emphasized = RE_KEY_TERMS.replace_all(&escaped, "<strong>$1:</strong>");
    let emphasized = RE_NOTE.replace_all(&emphasized, "<strong class=\"note\">$1:</strong>");
    RE_MEASUREMENT
        .replace_all(
            &emphasized,
            "<span class=\"measure\">$1</span><span class=\"unit\">$2</span>",
        )
        .into_owned()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
