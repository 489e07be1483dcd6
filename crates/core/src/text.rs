//! Transcript text handling: normalization for scoring, speaker-marker
//! stripping and sentence re-segmentation for diff rendering.

/// Normalize transcript lines into a single comparable string.
///
/// Lines are joined with a space, runs of spaces collapsed, ASCII
/// punctuation stripped, the result lower-cased and trimmed. Punctuation
/// stripping is deliberately byte-wise ASCII only; Unicode punctuation
/// passes through (known limitation, kept for comparability with earlier
/// report runs).
pub fn normalize_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let text = lines
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\n', " ");

    let mut collapsed = String::with_capacity(text.len());
    let mut prev_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !prev_space {
                collapsed.push(c);
            }
            prev_space = true;
        } else {
            collapsed.push(c);
            prev_space = false;
        }
    }

    let stripped: String = collapsed
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();

    stripped.to_lowercase().trim().to_owned()
}

/// Remove a leading `- ` marker and optional `[speaker] ` diarization tag.
///
/// `- [Interviewer] And how far did you fall?` becomes
/// `And how far did you fall?`. Lines without the marker pass through
/// unchanged.
pub fn strip_speaker_markers<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            match line.strip_prefix("- ") {
                None => line.to_owned(),
                Some(rest) => {
                    if rest.starts_with('[') {
                        if let Some(pos) = rest.find("] ") {
                            rest[pos + 2..].to_owned()
                        } else {
                            rest.to_owned()
                        }
                    } else {
                        rest.to_owned()
                    }
                }
            }
        })
        .collect()
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// Heuristic guard against splitting after "U.S."-style and "Mr."-style
// abbreviations. Not a sentence tokenizer.
fn split_suppressed(chars: &[char], i: usize) -> bool {
    if i >= 4 && is_word(chars[i - 4]) && chars[i - 3] == '.' && is_word(chars[i - 2]) {
        return true;
    }
    if i >= 3
        && chars[i - 3].is_ascii_uppercase()
        && chars[i - 2].is_ascii_lowercase()
        && chars[i - 1] == '.'
    {
        return true;
    }
    false
}

/// Re-segment lines into sentences, splitting at `.` or `?` followed by
/// whitespace unless the preceding token looks like an abbreviation.
pub fn split_sentences<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let text = lines
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\n', " ");

    let mut collapsed = String::with_capacity(text.len());
    let mut prev_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !prev_space {
                collapsed.push(c);
            }
            prev_space = true;
        } else {
            collapsed.push(c);
            prev_space = false;
        }
    }

    let chars: Vec<char> = collapsed.trim().chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        let at_boundary = c.is_whitespace()
            && i > 0
            && (chars[i - 1] == '.' || chars[i - 1] == '?')
            && !split_suppressed(&chars, i);
        if at_boundary {
            sentences.push(current.trim().to_owned());
            current.clear();
        } else {
            current.push(c);
        }
    }
    sentences.push(current.trim().to_owned());
    sentences
}
