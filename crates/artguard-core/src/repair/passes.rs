//! Text-level repair passes.
//!
//! Each pass is a named, idempotent transformation of a document's text.
//! A pass returns `None` when it has nothing to change; running it again on
//! its own output is always a no-op.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{FileType, ParseLocation};

/// Largest indentation difference treated as a typo rather than a
/// deliberate change of nesting level.
const MAX_INDENT_DRIFT: usize = 2;

/// What a pass knows about the document it is repairing.
#[derive(Debug, Clone, Copy)]
pub struct RepairContext<'a> {
    pub file_type: FileType,
    /// First validation error of the current candidate text.
    pub diagnostic: Option<&'a str>,
    pub location: Option<ParseLocation>,
}

impl RepairContext<'_> {
    /// True when the current diagnostic is a grammar parse error.
    pub fn is_parse_error(&self) -> bool {
        self.diagnostic
            .map(|d| d.starts_with(self.file_type.parse_error_prefix()))
            .unwrap_or(false)
    }
}

/// Output of a pass that changed something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairEdit {
    pub content: String,
    pub description: String,
}

/// One repair heuristic.
pub trait RepairPass: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, content: &str, ctx: &RepairContext<'_>) -> Option<RepairEdit>;
}

/// The passes in the order the repairer tries them.
pub fn default_passes() -> Vec<Box<dyn RepairPass>> {
    vec![
        Box::new(IndentationNormalization),
        Box::new(QuoteBalancing),
        Box::new(StructuralCompletion),
    ]
}

// ---------------------------------------------------------------------------
// Line analysis
// ---------------------------------------------------------------------------

fn key_pattern() -> &'static Regex {
    static KEY: OnceLock<Regex> = OnceLock::new();
    KEY.get_or_init(|| {
        Regex::new(r#"^(?:"[^"]*"|'[^']*'|[A-Za-z0-9_$<][^:#]*?)\s*:(?:\s|$)"#)
            .expect("key pattern compiles")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Key,
    ListItem,
}

#[derive(Debug, Clone, Copy)]
struct YamlLine {
    indent: usize,
    kind: LineKind,
    /// Column where a list item's content starts.
    content_col: usize,
    /// List item whose content begins with a mapping key.
    inline_key: bool,
    /// Following lines are expected to be this line's children.
    opens_block: bool,
}

fn leading_spaces(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b' ').count()
}

fn is_blank_or_comment(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with('#')
}

/// Cut a YAML line at its comment, respecting quotes.
fn strip_comment(line: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;
    let mut prev_ws = true;
    for (i, ch) in line.char_indices() {
        if in_double {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_double = false;
            }
        } else if in_single {
            if ch == '\'' {
                in_single = false;
            }
        } else {
            match ch {
                '"' => in_double = true,
                '\'' => in_single = true,
                '#' if prev_ws => return &line[..i],
                _ => {}
            }
        }
        prev_ws = ch.is_whitespace();
    }
    line
}

fn value_opens_block(value: &str) -> bool {
    value.is_empty()
        || value.starts_with('|')
        || value.starts_with('>')
        || ((value.starts_with('&') || value.starts_with('!')) && !value.contains(' '))
}

fn key_value(code: &str) -> &str {
    key_pattern()
        .find(code)
        .map(|m| code[m.end()..].trim())
        .unwrap_or("")
}

fn analyze(line: &str) -> Option<YamlLine> {
    if is_blank_or_comment(line) {
        return None;
    }
    let indent = leading_spaces(line);
    let body = &line[indent..];
    if body.starts_with('\t') {
        return None;
    }
    let code = strip_comment(body).trim_end();

    if code == "-" || code.starts_with("- ") {
        let rest_raw = &code[1..];
        let rest = rest_raw.trim_start();
        let inline_key = key_pattern().is_match(rest);
        return Some(YamlLine {
            indent,
            kind: LineKind::ListItem,
            content_col: indent + 1 + (rest_raw.len() - rest.len()),
            inline_key,
            opens_block: rest.is_empty() || (inline_key && value_opens_block(key_value(rest))),
        });
    }

    if key_pattern().is_match(code) {
        return Some(YamlLine {
            indent,
            kind: LineKind::Key,
            content_col: indent,
            inline_key: true,
            opens_block: value_opens_block(key_value(code)),
        });
    }

    None
}

/// Column a line of kind `kind` must use to be a sibling of `q`.
fn sibling_column(q: &YamlLine, kind: LineKind) -> Option<usize> {
    match (q.kind, kind) {
        (LineKind::ListItem, LineKind::ListItem) => Some(q.indent),
        (LineKind::ListItem, LineKind::Key) if q.inline_key => Some(q.content_col),
        (LineKind::Key, LineKind::Key) => Some(q.indent),
        (LineKind::Key, LineKind::ListItem) if q.opens_block => Some(q.indent),
        _ => None,
    }
}

/// Indentation line `idx` should have, when it is a near-miss sibling of an
/// earlier line and matches no existing nesting level.
fn misaligned_target(lines: &[&str], idx: usize) -> Option<(usize, LineKind)> {
    let c = analyze(lines[idx])?;
    let mut candidate = None;
    let mut nearest = true;

    for q in lines[..idx].iter().rev().filter_map(|l| analyze(l)) {
        if nearest {
            nearest = false;
            if q.opens_block && c.indent > q.indent {
                return None;
            }
        }
        if let Some(col) = sibling_column(&q, c.kind) {
            if col == c.indent {
                return None;
            }
            if candidate.is_none() && col.abs_diff(c.indent) <= MAX_INDENT_DRIFT {
                candidate = Some(col);
            }
        }
        if q.indent < c.indent && q.opens_block {
            break;
        }
    }

    candidate.map(|target| (target, c.kind))
}

fn reindent(line: &str, width: usize) -> String {
    format!("{}{}", " ".repeat(width), line.trim_start_matches(' '))
}

// ---------------------------------------------------------------------------
// Indentation normalization
// ---------------------------------------------------------------------------

/// Re-aligns YAML siblings near the reported failure line with the nearest
/// correctly indented sibling. Never touches lines outside that run.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndentationNormalization;

impl RepairPass for IndentationNormalization {
    fn name(&self) -> &'static str {
        "indentation_normalization"
    }

    fn apply(&self, content: &str, ctx: &RepairContext<'_>) -> Option<RepairEdit> {
        if ctx.file_type != FileType::Yaml || !ctx.is_parse_error() {
            return None;
        }
        let reported = ctx.location?.line.checked_sub(1)?;
        let lines: Vec<&str> = content.split('\n').collect();

        let window = [Some(reported), reported.checked_sub(1), Some(reported + 1)];
        for idx in window.into_iter().flatten().filter(|i| *i < lines.len()) {
            let Some((target, kind)) = misaligned_target(&lines, idx) else {
                continue;
            };
            let from = leading_spaces(lines[idx]);
            let (text, realigned) = realign_run(&lines, idx, from, target, kind);
            let mut description = format!(
                "Normalized indentation on line {} from {} to {} spaces",
                idx + 1,
                from,
                target
            );
            if realigned > 1 {
                description.push_str(&format!(" ({realigned} sibling lines)"));
            }
            return Some(RepairEdit {
                content: text,
                description,
            });
        }
        None
    }
}

/// Move the run of same-kind siblings starting at `start` from `from` to
/// `target` columns, carrying block children along.
fn realign_run(
    lines: &[&str],
    start: usize,
    from: usize,
    target: usize,
    kind: LineKind,
) -> (String, usize) {
    let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    let mut realigned = 0usize;
    let mut carrying_children = false;

    for (i, line) in lines.iter().enumerate().skip(start) {
        if is_blank_or_comment(line) {
            continue;
        }
        let indent = leading_spaces(line);
        let analysed = analyze(line);
        if indent == from && analysed.map(|a| a.kind) == Some(kind) {
            out[i] = reindent(line, target);
            realigned += 1;
            carrying_children = analysed.map(|a| a.opens_block).unwrap_or(false);
        } else if indent > from && carrying_children {
            out[i] = reindent(line, indent - from + target);
        } else {
            break;
        }
    }

    (out.join("\n"), realigned)
}

// ---------------------------------------------------------------------------
// Quote balancing
// ---------------------------------------------------------------------------

/// Closes a quoted scalar left open on its line, using the quote style the
/// scalar was opened with.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteBalancing;

impl RepairPass for QuoteBalancing {
    fn name(&self) -> &'static str {
        "quote_balancing"
    }

    fn apply(&self, content: &str, ctx: &RepairContext<'_>) -> Option<RepairEdit> {
        if !matches!(ctx.file_type, FileType::Yaml | FileType::Json) || !ctx.is_parse_error() {
            return None;
        }
        let lines: Vec<&str> = content.split('\n').collect();
        let mut out = Vec::with_capacity(lines.len());
        let mut fixed: Vec<(usize, char)> = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            match close_quote(line, ctx.file_type) {
                Some((closed, quote))
                    if !closes_on_continuation(&lines, i, quote, ctx.file_type) =>
                {
                    out.push(closed);
                    fixed.push((i + 1, quote));
                }
                _ => out.push(line.to_string()),
            }
        }

        let description = match fixed.as_slice() {
            [] => return None,
            [(line, quote)] => format!(
                "Closed unbalanced {} quote on line {}",
                quote_style(*quote),
                line
            ),
            many => format!(
                "Closed unbalanced quotes on lines {}",
                many.iter()
                    .map(|(l, _)| l.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        Some(RepairEdit {
            content: out.join("\n"),
            description,
        })
    }
}

fn quote_style(quote: char) -> &'static str {
    if quote == '"' {
        "double"
    } else {
        "single"
    }
}

/// Quote character opening a scalar at a key or value position.
fn opening_quote(line: &str, file_type: FileType) -> Option<char> {
    let is_quote = |c: &char| *c == '"' || (*c == '\'' && file_type == FileType::Yaml);
    let mut rest = line.trim_start();
    if let Some(item) = rest.strip_prefix("- ") {
        rest = item.trim_start();
    }
    if let Some(q) = rest.chars().next().filter(is_quote) {
        return Some(q);
    }
    let sep = rest.find(": ")?;
    rest[sep + 1..].trim_start().chars().next().filter(is_quote)
}

fn count_quote(line: &str, quote: char) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for ch in line.chars() {
        if quote == '"' && escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            count += 1;
        }
    }
    count
}

fn close_quote(line: &str, file_type: FileType) -> Option<(String, char)> {
    if file_type == FileType::Yaml && line.trim_start().starts_with('#') {
        return None;
    }
    let quote = opening_quote(line, file_type)?;
    if count_quote(line, quote) % 2 == 0 {
        return None;
    }
    let body = line.trim_end();
    let trailing = &line[body.len()..];
    let closed = match body.strip_suffix(',') {
        Some(head) if file_type == FileType::Json => format!("{head}{quote},{trailing}"),
        _ => format!("{body}{quote}{trailing}"),
    };
    Some((closed, quote))
}

/// YAML quoted scalars may continue on more-indented lines; leave those alone
/// when the continuation closes the quote.
fn closes_on_continuation(lines: &[&str], idx: usize, quote: char, file_type: FileType) -> bool {
    if file_type != FileType::Yaml {
        return false;
    }
    let base = leading_spaces(lines[idx]);
    let mut total = 0;
    for next in &lines[idx + 1..] {
        if next.trim().is_empty() {
            continue;
        }
        if leading_spaces(next) <= base || analyze(next).is_some() {
            break;
        }
        total += count_quote(next, quote);
        if total % 2 == 1 {
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Structural completion
// ---------------------------------------------------------------------------

/// Appends the closing tokens of collection literals left open at end of
/// file (JSON, YAML flow) or at an enclosing dedent (YAML flow).
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralCompletion;

impl RepairPass for StructuralCompletion {
    fn name(&self) -> &'static str {
        "structural_completion"
    }

    fn apply(&self, content: &str, ctx: &RepairContext<'_>) -> Option<RepairEdit> {
        if !ctx.is_parse_error() {
            return None;
        }
        match ctx.file_type {
            FileType::Json => complete_json(content),
            FileType::Yaml => complete_yaml_flow(content),
            FileType::Markdown | FileType::Unknown => None,
        }
    }
}

fn closer_for(opener: char) -> char {
    if opener == '{' {
        '}'
    } else {
        ']'
    }
}

fn opener_for(closer: char) -> char {
    if closer == '}' {
        '{'
    } else {
        '['
    }
}

fn complete_json(content: &str) -> Option<RepairEdit> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in content.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => stack.push(ch),
            '}' | ']' => {
                if stack.pop() != Some(opener_for(ch)) {
                    return None;
                }
            }
            _ => {}
        }
    }
    if in_string || stack.is_empty() {
        return None;
    }

    let closers: String = stack.iter().rev().map(|c| closer_for(*c)).collect();
    let body = content.trim_end();
    let body = body.strip_suffix(',').unwrap_or(body);
    let newline = if content.ends_with('\n') { "\n" } else { "" };

    Some(RepairEdit {
        content: format!("{body}{closers}{newline}"),
        description: format!(
            "Appended '{}' to close {} unterminated collection(s)",
            closers,
            stack.len()
        ),
    })
}

#[derive(Debug, Clone, Copy)]
struct OpenFlow {
    ch: char,
    indent: usize,
}

fn at_value_start(code: &str, pos: usize) -> bool {
    let before = &code[..pos];
    let trimmed = before.trim_end();
    if trimmed.is_empty() {
        return true;
    }
    if trimmed.len() == before.len() {
        return false;
    }
    trimmed.ends_with(':') || trimmed.rsplit(' ').next() == Some("-")
}

/// Track flow collections opened and closed on one line. `None` means a
/// mismatched closer, which this pass does not try to fix.
fn scan_flow_line(code: &str, indent: usize, stack: &mut Vec<OpenFlow>) -> Option<()> {
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;

    for (pos, ch) in code.char_indices() {
        if in_double {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_double = false;
            }
            continue;
        }
        if in_single {
            if ch == '\'' {
                in_single = false;
            }
            continue;
        }
        let opens_here = !stack.is_empty() || at_value_start(code, pos);
        match ch {
            '"' if opens_here => in_double = true,
            '\'' if opens_here => in_single = true,
            '[' | '{' if opens_here => stack.push(OpenFlow { ch, indent }),
            ']' | '}' => match stack.last() {
                Some(open) if open.ch == opener_for(ch) => {
                    stack.pop();
                }
                Some(_) => return None,
                None => {}
            },
            _ => {}
        }
    }
    Some(())
}

fn close_line(line: &str, closers: &str) -> String {
    let (core, cr) = match line.strip_suffix('\r') {
        Some(core) => (core, "\r"),
        None => (line, ""),
    };
    let code = strip_comment(core);
    let comment = &core[code.len()..];
    let body = code.trim_end();
    let body = body.strip_suffix(',').unwrap_or(body);
    if comment.is_empty() {
        format!("{body}{closers}{cr}")
    } else {
        format!("{body}{closers} {comment}{cr}")
    }
}

fn complete_yaml_flow(content: &str) -> Option<RepairEdit> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut stack: Vec<OpenFlow> = Vec::new();
    let mut last_code_line: Option<usize> = None;
    let mut closures: Vec<(usize, String)> = Vec::new();

    let pending = |stack: &[OpenFlow]| -> String {
        stack.iter().rev().map(|o| closer_for(o.ch)).collect()
    };

    for (i, line) in lines.iter().enumerate() {
        if is_blank_or_comment(line) {
            continue;
        }
        let indent = leading_spaces(line);
        let code = strip_comment(line).trim_end();

        if let (Some(outer), Some(prev)) = (stack.first(), last_code_line) {
            let continues = code.trim_start().starts_with([']', '}']);
            if indent <= outer.indent && !continues {
                closures.push((prev, pending(&stack)));
                stack.clear();
            }
        }

        scan_flow_line(code, indent, &mut stack)?;
        last_code_line = Some(i);
    }
    if let (false, Some(prev)) = (stack.is_empty(), last_code_line) {
        closures.push((prev, pending(&stack)));
    }
    if closures.is_empty() {
        return None;
    }

    let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    for (idx, closers) in &closures {
        out[*idx] = close_line(lines[*idx], closers);
    }

    let description = match closures.as_slice() {
        [(idx, closers)] => format!(
            "Closed unterminated flow collection on line {} with '{}'",
            idx + 1,
            closers
        ),
        many => format!(
            "Closed {} unterminated flow collections (lines {})",
            many.len(),
            many.iter()
                .map(|(i, _)| (i + 1).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };

    Some(RepairEdit {
        content: out.join("\n"),
        description,
    })
}
