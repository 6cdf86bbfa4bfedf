//! Line-oriented cleanup of raw page text into marker-annotated text.
//!
//! Structure detection is heuristic and lossy: each line is matched against an
//! ordered list of rules and the first rule that fires decides what the line
//! becomes. Output uses `## `/`### ` for headings, `- ` for list items and
//! `| a | b |` for table rows, with one blank line between blocks.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    ListItem(String),
    TableRow(Vec<String>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockGroup {
    Heading { level: u8, text: String },
    List(Vec<String>),
    Table(Vec<Vec<String>>),
    Paragraph(Vec<String>),
}

type LineRule = fn(&str) -> Option<Vec<Block>>;

const LINE_RULES: [LineRule; 7] = [
    heading_marker,
    list_marker,
    table_marker,
    numeric_row,
    caps_heading,
    label_heading,
    numbered_item,
];

const MIN_CAPS_HEADING_LETTERS: usize = 4;
const BULLETS: [char; 4] = ['•', '●', '▪', '◦'];
const ALLOWED_PUNCTUATION: &str = ".,:;!?-()[]_#|";

static RE_HEADING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{2,3}) (.+)$").expect("valid heading marker regex"));
static RE_LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^- (.+)$").expect("valid list marker regex"));
static RE_TABLE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|(.*)\|$").expect("valid table marker regex"));
static RE_NUMERIC_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+) (\d+) (\d+) (\d+)$").expect("valid numeric row regex")
});
static RE_CAPS_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\p{Lu}[\p{Lu} ]{2,}\p{Lu})([.:])(?: (.*))?$").expect("valid caps heading regex")
});
static RE_LABEL_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\p{Lu}[\p{L} ]{2,}):(?: (.*))?$").expect("valid label heading regex")
});
static RE_NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\. [^.]+\.").expect("valid numbered item regex"));
static RE_MEASUREMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?) (mm|cm|m|kg|g|L|ml)\b").expect("valid measurement regex")
});

pub fn normalize(raw: &str) -> String {
    render_groups(&parse_groups(raw))
}

pub fn parse_groups(text: &str) -> Vec<BlockGroup> {
    let mut groups = Vec::new();
    let mut current: Option<BlockGroup> = None;

    for raw_line in text.replace("\r\n", "\n").replace('\r', "\n").lines() {
        let canonical = canonicalize_accents(raw_line);
        for line in split_bullets(&canonical) {
            let tidy = tidy_line(&line);
            if tidy.is_empty() {
                close_group(&mut groups, &mut current);
                continue;
            }
            for block in classify(&tidy) {
                push_block(&mut groups, &mut current, block);
            }
        }
    }

    close_group(&mut groups, &mut current);
    groups
}

pub fn canonicalize_accents(text: &str) -> String {
    text.chars().map(canonical_char).collect()
}

fn canonical_char(c: char) -> char {
    match c {
        'à' | 'ä' | 'â' => 'á',
        'è' | 'ë' | 'ê' => 'é',
        'ì' | 'ï' | 'î' => 'í',
        'ò' | 'ö' | 'ô' => 'ó',
        'ù' | 'ü' | 'û' => 'ú',
        'À' | 'Ä' | 'Â' => 'Á',
        'È' | 'Ë' | 'Ê' => 'É',
        'Ì' | 'Ï' | 'Î' => 'Í',
        'Ò' | 'Ö' | 'Ô' => 'Ó',
        'Ù' | 'Ü' | 'Û' => 'Ú',
        other => other,
    }
}

fn split_bullets(line: &str) -> Vec<String> {
    if !line.contains(BULLETS) {
        return vec![line.to_string()];
    }

    let mut pieces = line.split(BULLETS);
    let mut lines = Vec::new();
    if let Some(lead) = pieces.next() {
        if !lead.trim().is_empty() {
            lines.push(lead.to_string());
        }
    }
    for piece in pieces {
        let item = piece.trim();
        if !item.is_empty() {
            lines.push(format!("- {item}"));
        }
    }
    lines
}

fn tidy_line(line: &str) -> String {
    let whitelisted: String = line
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(c) {
                c
            } else {
                ' '
            }
        })
        .collect();
    let collapsed = whitelisted.split_whitespace().collect::<Vec<_>>().join(" ");
    RE_MEASUREMENT.replace_all(&collapsed, "$1$2").into_owned()
}

fn classify(line: &str) -> Vec<Block> {
    LINE_RULES
        .iter()
        .find_map(|rule| rule(line))
        .unwrap_or_else(|| vec![Block::Text(line.to_string())])
}

fn heading_marker(line: &str) -> Option<Vec<Block>> {
    let captures = RE_HEADING_MARKER.captures(line)?;
    Some(vec![Block::Heading {
        level: captures[1].len() as u8,
        text: captures[2].to_string(),
    }])
}

fn list_marker(line: &str) -> Option<Vec<Block>> {
    let captures = RE_LIST_MARKER.captures(line)?;
    Some(vec![Block::ListItem(captures[1].to_string())])
}

fn table_marker(line: &str) -> Option<Vec<Block>> {
    let captures = RE_TABLE_MARKER.captures(line)?;
    let cells = captures[1]
        .split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if cells.is_empty() {
        Some(Vec::new())
    } else {
        Some(vec![Block::TableRow(cells)])
    }
}

fn numeric_row(line: &str) -> Option<Vec<Block>> {
    let captures = RE_NUMERIC_ROW.captures(line)?;
    let cells = (1..=4).map(|index| captures[index].to_string()).collect();
    Some(vec![Block::TableRow(cells)])
}

fn caps_heading(line: &str) -> Option<Vec<Block>> {
    let captures = RE_CAPS_HEADING.captures(line)?;
    let letters = captures[1].chars().filter(|c| c.is_alphabetic()).count();
    if letters < MIN_CAPS_HEADING_LETTERS {
        return None;
    }
    let mut blocks = vec![Block::Heading {
        level: 2,
        text: format!("{}{}", &captures[1], &captures[2]),
    }];
    if let Some(rest) = captures.get(3) {
        blocks.extend(classify(rest.as_str()));
    }
    Some(blocks)
}

fn label_heading(line: &str) -> Option<Vec<Block>> {
    let captures = RE_LABEL_HEADING.captures(line)?;
    let mut blocks = vec![Block::Heading {
        level: 3,
        text: format!("{}:", &captures[1]),
    }];
    if let Some(rest) = captures.get(2) {
        blocks.extend(classify(rest.as_str()));
    }
    Some(blocks)
}

fn numbered_item(line: &str) -> Option<Vec<Block>> {
    RE_NUMBERED_ITEM
        .is_match(line)
        .then(|| vec![Block::ListItem(line.to_string())])
}

fn push_block(groups: &mut Vec<BlockGroup>, current: &mut Option<BlockGroup>, block: Block) {
    match (current.as_mut(), block) {
        (Some(BlockGroup::Paragraph(lines)), Block::Text(text)) => lines.push(text),
        (Some(BlockGroup::List(items)), Block::ListItem(item)) => items.push(item),
        (Some(BlockGroup::Table(rows)), Block::TableRow(cells)) => rows.push(cells),
        (_, block) => {
            close_group(groups, current);
            *current = Some(match block {
                Block::Heading { level, text } => BlockGroup::Heading { level, text },
                Block::ListItem(item) => BlockGroup::List(vec![item]),
                Block::TableRow(cells) => BlockGroup::Table(vec![cells]),
                Block::Text(text) => BlockGroup::Paragraph(vec![text]),
            });
        }
    }
}

fn close_group(groups: &mut Vec<BlockGroup>, current: &mut Option<BlockGroup>) {
    if let Some(group) = current.take() {
        groups.push(group);
    }
}

fn render_groups(groups: &[BlockGroup]) -> String {
    groups
        .iter()
        .map(|group| match group {
            BlockGroup::Heading { level, text } => {
                format!("{} {text}", "#".repeat(usize::from(*level)))
            }
            BlockGroup::List(items) => items
                .iter()
                .map(|item| format!("- {item}"))
                .collect::<Vec<_>>()
                .join("\n"),
            BlockGroup::Table(rows) => rows
                .iter()
                .map(|cells| format!("| {} |", cells.join(" | ")))
                .collect::<Vec<_>>()
                .join("\n"),
            BlockGroup::Paragraph(lines) => lines.join("\n"),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [&str; 8] = [
        "ALAMBRADO Y CERCADO PERIMETRAL\n\nMateriales necesarios para alambrado:\n• Postes de madera tratada cada 3 metros\n• Alambre galvanizado calibre 12.5\n• Grampas galvanizadas",
        "PROCEDIMIENTO DE CONTROL:   Este documento  establece\r\n\r\n\r\n\r\nCódigo: PC-001\nVersión: 2.1",
        "1. Marcar el perímetro.\n2. Cavar hoyos de 60 cm de profundidad\n10 20 30 40\n| a | | b |",
        "Tolerancias dimensionales: ±0.1 mm\nAcabado superficial: Ra ≤ 3.2μm\n@- texto raro\nabc\n#- foo",
        "TÍTULO: Alcance del documento: el resto\n## ya marcado\n### otro\n- item\n- 3. lista.",
        "",
        "   \n\n   \n",
        "àèìòù ÀÈÌÒÙ ñ Ñ • • •\n||\n1 2 3 4 m\nAltura mínima 1.5 metros\nAB C.\nAB C: resto",
    ];

    #[test]
    fn normalize_is_idempotent_on_representative_inputs() {
        for sample in SAMPLES {
            let once = normalize(sample);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for input {sample:?}");
        }
    }

    #[test]
    fn accents_are_canonicalized() {
        assert_eq!(normalize("àäâ èëê ÒÖÔ ñ"), "ááá ééé ÓÓÓ ñ");
    }

    #[test]
    fn caps_line_with_colon_becomes_level_two_heading() {
        let normalized = normalize("ESPECIFICACIONES TÉCNICAS: altura mínima");
        assert_eq!(normalized, "## ESPECIFICACIONES TÉCNICAS:\n\naltura mínima");
    }

    #[test]
    fn caps_heading_needs_four_letters_not_counting_spaces() {
        assert_eq!(normalize("AB C."), "AB C.");
        assert_eq!(normalize("ABCD."), "## ABCD.");
        assert_eq!(normalize("A B C D."), "## A B C D.");
    }

    #[test]
    fn capitalized_label_becomes_level_three_heading() {
        let normalized = normalize("Herramientas requeridas:\n• Martillo\n• Nivel");
        assert_eq!(normalized, "### Herramientas requeridas:\n\n- Martillo\n- Nivel");
    }

    #[test]
    fn numbered_sentence_becomes_list_item() {
        assert_eq!(normalize("1. Marcar el perímetro."), "- 1. Marcar el perímetro.");
    }

    #[test]
    fn four_integers_become_table_row() {
        assert_eq!(normalize("10 20 30 40"), "| 10 | 20 | 30 | 40 |");
    }

    #[test]
    fn disallowed_characters_are_replaced_and_whitespace_collapsed() {
        assert_eq!(normalize("precio  $ 100 @ total\t!"), "precio 100 total !");
    }

    #[test]
    fn measurements_are_joined_without_touching_words() {
        assert_eq!(
            normalize("hoyos de 60 cm y 3 metros"),
            "hoyos de 60cm y 3 metros"
        );
    }

    #[test]
    fn excessive_blank_lines_collapse_to_one_paragraph_break() {
        assert_eq!(normalize("primero\n\n\n\n\nsegundo"), "primero\n\nsegundo");
    }

    #[test]
    fn groups_preserve_block_structure() {
        let groups = parse_groups("## Uno\n\n- a\n- b\n\n| 1 | 2 |\n\ntexto\nmas");
        assert_eq!(
            groups,
            vec![
                BlockGroup::Heading {
                    level: 2,
                    text: "Uno".to_string()
                },
                BlockGroup::List(vec!["a".to_string(), "b".to_string()]),
                BlockGroup::Table(vec![vec!["1".to_string(), "2".to_string()]]),
                BlockGroup::Paragraph(vec!["texto".to_string(), "mas".to_string()]),
            ]
        );
    }
}
