//! Side-by-side HTML diff of reference against hypothesis.
//!
//! Both sides are re-segmented into sentences so that the comparison is not
//! at the mercy of each provider's own line breaking, then aligned line by
//! line. The page embeds a media player for the item so a reviewer can
//! listen while reading.

use crate::text;
use std::fmt::Write as _;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum DiffError {
    #[error("failed to write diff artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Render the diff page and write it to `destination`.
pub fn render<R: AsRef<str>, H: AsRef<str>>(
    druid: &str,
    reference: &[R],
    hypothesis: &[H],
    destination: &Path,
) -> Result<(), DiffError> {
    let html = render_html(druid, reference, hypothesis);
    std::fs::write(destination, html)?;
    Ok(())
}

pub fn render_html<R: AsRef<str>, H: AsRef<str>>(
    druid: &str,
    reference: &[R],
    hypothesis: &[H],
) -> String {
    let from_lines = text::split_sentences(&text::strip_speaker_markers(reference));
    let to_lines = text::split_sentences(hypothesis);
    let rows = diff_rows(&from_lines, &to_lines);

    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    page.push_str("    <meta charset=\"utf-8\"/>\n");
    let _ = writeln!(page, "    <title>{}</title>", escape(druid));
    page.push_str(STYLE);
    page.push_str("</head>\n<body>\n\n");
    let _ = writeln!(
        page,
        "    <div style=\"height: 200px;\"><iframe style=\"position: fixed;\" \
         src=\"https://embed.stanford.edu/iframe?url=https://purl.stanford.edu/{druid}\" \
         height=\"200px\" width=\"100%\" title=\"Media viewer\" frameborder=\"0\" \
         marginwidth=\"0\" marginheight=\"0\" scrolling=\"no\" \
         allowfullscreen=\"allowfullscreen\" allow=\"clipboard-write\"></iframe></div>",
        druid = escape(druid)
    );

    page.push_str("    <table class=\"diff\">\n");
    page.push_str(
        "        <thead><tr><th colspan=\"2\">reference</th>\
         <th colspan=\"2\">transcript</th></tr></thead>\n",
    );
    page.push_str("        <tbody>\n");
    for row in rows {
        page.push_str("            <tr>");
        push_cell(&mut page, row.left);
        push_cell(&mut page, row.right);
        page.push_str("</tr>\n");
    }
    page.push_str("        </tbody>\n    </table>\n");
    page.push_str(LEGEND);
    page.push_str("</body>\n</html>\n");
    page
}

const STYLE: &str = "    <style>\n\
        table.diff { border: 1px solid #888; border-collapse: collapse; width: 100%; \
font-family: monospace; }\n\
        table.diff th { background: #e0e0e0; text-align: left; padding: 2px 6px; }\n\
        table.diff td { vertical-align: top; padding: 1px 6px; word-wrap: break-word; \
max-width: 40em; }\n\
        td.diff_header { background: #e0e0e0; text-align: right; color: #666; width: 3em; }\n\
        .diff_add { background-color: #aaffaa; }\n\
        .diff_chg { background-color: #ffff77; }\n\
        .diff_sub { background-color: #ffaaaa; }\n\
    </style>\n";

const LEGEND: &str = "    <table class=\"diff\" summary=\"Legends\">\n\
        <tr><th colspan=\"3\">Legends</th></tr>\n\
        <tr><td class=\"diff_add\">Added</td><td class=\"diff_chg\">Changed</td>\
<td class=\"diff_sub\">Deleted</td></tr>\n\
    </table>\n";

struct Row {
    left: Option<(usize, String)>,
    right: Option<(usize, String)>,
}

fn push_cell(page: &mut String, cell: Option<(usize, String)>) {
    match cell {
        Some((number, html)) => {
            let _ = write!(
                page,
                "<td class=\"diff_header\">{number}</td><td>{html}</td>"
            );
        }
        None => page.push_str("<td class=\"diff_header\"></td><td>&nbsp;</td>"),
    }
}

fn diff_rows(a: &[String], b: &[String]) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut deletes: Vec<usize> = Vec::new();
    let mut inserts: Vec<usize> = Vec::new();

    for step in diff_steps(a, b) {
        match step {
            Step::Equal(i, j) => {
                flush_changes(&mut rows, a, b, &mut deletes, &mut inserts);
                rows.push(Row {
                    left: Some((i + 1, escape(&a[i]))),
                    right: Some((j + 1, escape(&b[j]))),
                });
            }
            Step::Delete(i) => deletes.push(i),
            Step::Insert(j) => inserts.push(j),
        }
    }
    flush_changes(&mut rows, a, b, &mut deletes, &mut inserts);
    rows
}

// A run of deletes and inserts between two equal lines becomes paired
// changed rows (with inline highlighting) plus leftover one-sided rows.
fn flush_changes(
    rows: &mut Vec<Row>,
    a: &[String],
    b: &[String],
    deletes: &mut Vec<usize>,
    inserts: &mut Vec<usize>,
) {
    let paired = deletes.len().min(inserts.len());
    for k in 0..paired {
        let i = deletes[k];
        let j = inserts[k];
        let (left, right) = inline_markup(&a[i], &b[j]);
        rows.push(Row {
            left: Some((i + 1, left)),
            right: Some((j + 1, right)),
        });
    }
    for &i in &deletes[paired..] {
        rows.push(Row {
            left: Some((i + 1, format!("<span class=\"diff_sub\">{}</span>", escape(&a[i])))),
            right: None,
        });
    }
    for &j in &inserts[paired..] {
        rows.push(Row {
            left: None,
            right: Some((j + 1, format!("<span class=\"diff_add\">{}</span>", escape(&b[j])))),
        });
    }
    deletes.clear();
    inserts.clear();
}

enum Step {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

fn diff_steps(a: &[String], b: &[String]) -> Vec<Step> {
    let m = a.len();
    let n = b.len();
    let mut lcs = vec![vec![0usize; n + 1]; m + 1];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut steps = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < m && j < n {
        if a[i] == b[j] {
            steps.push(Step::Equal(i, j));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            steps.push(Step::Delete(i));
            i += 1;
        } else {
            steps.push(Step::Insert(j));
            j += 1;
        }
    }
    while i < m {
        steps.push(Step::Delete(i));
        i += 1;
    }
    while j < n {
        steps.push(Step::Insert(j));
        j += 1;
    }
    steps
}

// Highlight the changed middle of a paired line: common prefix and suffix
// stay plain, the differing span gets diff_chg on both sides.
fn inline_markup(a: &str, b: &str) -> (String, String) {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let mut prefix = 0;
    while prefix < a_chars.len()
        && prefix < b_chars.len()
        && a_chars[prefix] == b_chars[prefix]
    {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < a_chars.len() - prefix
        && suffix < b_chars.len() - prefix
        && a_chars[a_chars.len() - 1 - suffix] == b_chars[b_chars.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let markup = |chars: &[char]| {
        let head: String = chars[..prefix].iter().collect();
        let mid: String = chars[prefix..chars.len() - suffix].iter().collect();
        let tail: String = chars[chars.len() - suffix..].iter().collect();
        if mid.is_empty() {
            escape(&chars.iter().collect::<String>())
        } else {
            format!(
                "{}<span class=\"diff_chg\">{}</span>{}",
                escape(&head),
                escape(&mid),
                escape(&tail)
            )
        }
    };
    (markup(&a_chars), markup(&b_chars))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
