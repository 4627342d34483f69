use serde_json::Value;

/// Best-effort extraction of one JSON value from free-form AI reply text.
///
/// Generative services wrap JSON in markdown fences, surround it with prose,
/// or cut it off mid-object when generation hits a length limit. This
/// routine trades completeness for availability: it returns `Some` with
/// whatever valid value it can recover and `None` otherwise, and it never
/// errors. A garbled reply must not abort the pipeline.
pub fn extract_json(raw: &str) -> Option<Value> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    // The reply may bury the JSON in surrounding prose
    let start = text.find(['[', '{'])?;
    let tail = &text[start..];

    if let Some(end) = matching_close(tail) {
        if let Ok(value) = serde_json::from_str(&tail[..end]) {
            return Some(value);
        }
    }

    // Typically generation was cut off mid-object; arrays can be salvaged
    // by dropping the incomplete trailing element.
    if tail.starts_with('[') {
        repair_truncated_array(tail)
    } else {
        None
    }
}

/// Removes a surrounding markdown code fence, language tag included.
fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest,
        };
    }
    if let Some(stripped) = text.trim_end().strip_suffix("```") {
        text = stripped;
    }
    text.trim()
}

/// Byte offset one past the bracket closing the value that starts at byte 0,
/// or `None` if the text ends before the bracket depth returns to zero.
fn matching_close(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Salvages the fully-formed leading elements of a truncated array.
///
/// Walks the bracket depth (string- and escape-aware) recording where each
/// top-level element last completed, truncates there and closes the array.
fn repair_truncated_array(text: &str) -> Option<Value> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut last_complete: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                if depth == 1 {
                    // A bare string element just ended
                    last_complete = Some(i + 1);
                }
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 1 {
                    // A nested element just closed at the top level
                    last_complete = Some(i + 1);
                }
            }
            _ => {}
        }
    }

    let end = last_complete?;
    let candidate = format!("{}]", &text[..end]);
    serde_json::from_str(&candidate).ok()
}
