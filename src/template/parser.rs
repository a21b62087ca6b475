//! Template tokenizer and parser.
//!
//! Turns a template string into a small AST of text runs, loop blocks,
//! conditional blocks and duplicate-line-erase blocks. Expression macros
//! (`#Eq`, `#Not`, ...) stay textual; they are resolved during rendering.
//!
//! Line handling is decided here: a tag that sits on its own line (only
//! indentation before it) takes its whole line with it, while an inline tag
//! consumes nothing around it. A construct whose close tag is missing is
//! abandoned and the remaining text kept verbatim, so no template can make
//! the parser loop forever.

/// The three loop constructs, structurally identical, distinct tag pairs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopKind {
    /// `#ForAllSubClasses`: every non-root schema node
    SubClasses,
    /// `#ForAllSubClassProperties`: a node's scalar properties and child refs
    SubClassProperties,
    /// `#ForAllData`: every data row
    Data,
}

impl LoopKind {
    pub fn start_tag(self) -> &'static str {
        match self {
            LoopKind::SubClasses => "#ForAllSubClasses",
            LoopKind::SubClassProperties => "#ForAllSubClassProperties",
            LoopKind::Data => "#ForAllData",
        }
    }

    pub fn end_tag(self) -> &'static str {
        match self {
            LoopKind::SubClasses => "#EndForAllSubClasses",
            LoopKind::SubClassProperties => "#EndForAllSubClassProperties",
            LoopKind::Data => "#EndForAllData",
        }
    }
}

/// One `#If`/`#Elif`/`#Else` arm; `condition` is raw text evaluated at render
/// time (it may contain placeholders and expression macros), `None` for else.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Option<String>,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Loop { kind: LoopKind, body: Vec<Node> },
    Cond { branches: Vec<Branch> },
    Erase { body: Vec<Node> },
}

#[derive(Debug, Clone, Copy)]
enum Construct {
    Loop(LoopKind),
    Erase,
    If,
}

const ERASE_START: &str = "#EraseDuplicatedLine";
const ERASE_END: &str = "#EndErase";
const IF_TAG: &str = "#If";
const ELIF_TAG: &str = "#Elif";
const ELSE_TAG: &str = "#Else";
const ENDIF_TAG: &str = "#Endif";

/// Parse a template (or a block body) into AST nodes.
pub fn parse(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let Some((tag_start, construct)) = next_construct(text, pos) else {
            push_text(&mut nodes, &text[pos..]);
            break;
        };

        let parsed = match construct {
            Construct::Loop(kind) => parse_loop(text, pos, tag_start, kind, &mut nodes),
            Construct::Erase => parse_erase(text, pos, tag_start, &mut nodes),
            Construct::If => parse_cond(text, pos, tag_start, &mut nodes),
        };

        match parsed {
            Some(next) => pos = next,
            None => {
                // Unmatched close tag: leave the rest of the text untouched
                push_text(&mut nodes, &text[pos..]);
                break;
            }
        }
    }

    nodes
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

/// Earliest construct start at or after `from`. `#If` counts only when
/// followed by a parenthesized condition.
fn next_construct(text: &str, from: usize) -> Option<(usize, Construct)> {
    let mut best: Option<(usize, Construct)> = None;

    let fixed = [
        (LoopKind::SubClassProperties.start_tag(), Construct::Loop(LoopKind::SubClassProperties)),
        (LoopKind::SubClasses.start_tag(), Construct::Loop(LoopKind::SubClasses)),
        (LoopKind::Data.start_tag(), Construct::Loop(LoopKind::Data)),
        (ERASE_START, Construct::Erase),
    ];
    for (tag, construct) in fixed {
        if let Some(i) = text[from..].find(tag) {
            let i = from + i;
            if best.map_or(true, |(b, _)| i < b) {
                best = Some((i, construct));
            }
        }
    }

    let mut search = from;
    while let Some(i) = text[search..].find(IF_TAG) {
        let i = search + i;
        if condition_follows(text, i + IF_TAG.len()) {
            if best.map_or(true, |(b, _)| i < b) {
                best = Some((i, Construct::If));
            }
            break;
        }
        search = i + IF_TAG.len();
    }

    best
}

/// True when optional spaces and then `(` follow the given position
fn condition_follows(text: &str, mut i: usize) -> bool {
    let bytes = text.as_bytes();
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i < bytes.len() && bytes[i] == b'('
}

/// When only indentation sits between the tag and the start of its line,
/// returns where that indentation begins; `None` for an inline tag. The
/// segment start counts as a line start only when it actually follows a
/// line break (or is the start of the template).
fn line_prefix_start(text: &str, seg_start: usize, tag_start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = tag_start;
    while i > seg_start {
        match bytes[i - 1] {
            b' ' | b'\t' => i -= 1,
            b'\n' | b'\r' => return Some(i),
            _ => return None,
        }
    }
    if seg_start == 0 || matches!(bytes[seg_start - 1], b'\n' | b'\r') {
        Some(i)
    } else {
        None
    }
}

/// Skip one line break (`\r\n`, `\n` or `\r`) at the given position
fn consume_newline(text: &str, mut i: usize) -> usize {
    let bytes = text.as_bytes();
    if i < bytes.len() && bytes[i] == b'\r' {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'\n' {
        i += 1;
    }
    i
}

fn strip_leading_newline(text: &str) -> &str {
    if let Some(rest) = text.strip_prefix("\r\n") {
        rest
    } else if let Some(rest) = text.strip_prefix('\n') {
        rest
    } else {
        text
    }
}

/// Parse one loop block. Returns the position right after the construct, or
/// `None` when the end tag is missing.
fn parse_loop(
    text: &str,
    seg_start: usize,
    tag_start: usize,
    kind: LoopKind,
    nodes: &mut Vec<Node>,
) -> Option<usize> {
    let body_start = tag_start + kind.start_tag().len();
    let rel = text[body_start..].find(kind.end_tag())?;
    let end_tag_start = body_start + rel;

    let prefix_end = line_prefix_start(text, seg_start, tag_start).unwrap_or(tag_start);
    push_text(nodes, &text[seg_start..prefix_end]);

    // The end tag's own indentation belongs to its (removed) line
    let body_end = line_prefix_start(text, body_start, end_tag_start).unwrap_or(end_tag_start);
    let body = strip_leading_newline(&text[body_start..body_end]);
    nodes.push(Node::Loop { kind, body: parse(body) });

    Some(consume_newline(text, end_tag_start + kind.end_tag().len()))
}

/// Parse one `#EraseDuplicatedLine ... #EndErase` block.
fn parse_erase(
    text: &str,
    seg_start: usize,
    tag_start: usize,
    nodes: &mut Vec<Node>,
) -> Option<usize> {
    let after_start_tag = tag_start + ERASE_START.len();
    let start_prefix = line_prefix_start(text, seg_start, tag_start);

    let mut body_start = after_start_tag;
    if start_prefix.is_some() {
        body_start = consume_newline(text, body_start);
    }

    let rel = text[body_start..].find(ERASE_END)?;
    let end_tag_start = body_start + rel;
    let end_prefix = line_prefix_start(text, body_start, end_tag_start);

    push_text(nodes, &text[seg_start..start_prefix.unwrap_or(tag_start)]);

    let body_end = end_prefix.unwrap_or(end_tag_start);
    nodes.push(Node::Erase { body: parse(&text[body_start..body_end]) });

    let mut next = end_tag_start + ERASE_END.len();
    if end_prefix.is_some() {
        next = consume_newline(text, next);
    }
    Some(next)
}

/// Extract a parenthesized condition starting at `i` (after the tag name).
/// Paren depth is tracked so nested expression macros survive; the condition
/// must close on the same line.
fn parse_condition(text: &str, mut i: usize) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b'(' {
        return None;
    }
    let inner_start = i + 1;
    let mut depth = 1usize;
    let mut j = inner_start;
    while j < bytes.len() {
        match bytes[j] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    let condition = text[inner_start..j].trim().to_string();
                    return Some((condition, j + 1));
                }
            }
            b'\n' => return None,
            _ => {}
        }
        j += 1;
    }
    None
}

enum CondToken {
    If,
    Elif,
    Else,
    Endif,
}

/// Earliest conditional-structure token at or after `from`
fn next_cond_token(text: &str, from: usize) -> Option<(usize, CondToken)> {
    let mut best: Option<(usize, CondToken)> = None;

    for (tag, make) in [
        (ELIF_TAG, CondToken::Elif),
        (ELSE_TAG, CondToken::Else),
        (ENDIF_TAG, CondToken::Endif),
    ] {
        if let Some(i) = text[from..].find(tag) {
            let i = from + i;
            if best.as_ref().map_or(true, |(b, _)| i < *b) {
                best = Some((i, make));
            }
        }
    }

    // "#Elif" and "#Endif" never contain "#If", so a plain search suffices;
    // only occurrences followed by a condition open a nested block.
    let mut search = from;
    while let Some(i) = text[search..].find(IF_TAG) {
        let i = search + i;
        if condition_follows(text, i + IF_TAG.len()) {
            if best.as_ref().map_or(true, |(b, _)| i < *b) {
                best = Some((i, CondToken::If));
            }
            break;
        }
        search = i + IF_TAG.len();
    }

    best
}

/// Parse one `#If ... #Endif` construct with depth-aware matching.
fn parse_cond(
    text: &str,
    seg_start: usize,
    tag_start: usize,
    nodes: &mut Vec<Node>,
) -> Option<usize> {
    let (first_condition, after_cond) = parse_condition(text, tag_start + IF_TAG.len())?;

    struct OpenBranch {
        condition: Option<String>,
        body_start: usize,
    }

    let mut branches: Vec<Branch> = Vec::new();
    let mut open = OpenBranch { condition: Some(first_condition), body_start: after_cond };
    let mut depth = 1usize;
    let mut scan = after_cond;
    let endif_start;

    let close_branch = |open: &OpenBranch, tag_at: usize, branches: &mut Vec<Branch>| {
        let body_end = line_prefix_start(text, open.body_start, tag_at).unwrap_or(tag_at);
        let body = strip_leading_newline(&text[open.body_start..body_end]);
        branches.push(Branch { condition: open.condition.clone(), body: parse(body) });
    };

    loop {
        let (i, token) = next_cond_token(text, scan)?;
        match token {
            CondToken::If => {
                depth += 1;
                scan = i + IF_TAG.len();
            }
            CondToken::Endif => {
                depth -= 1;
                if depth == 0 {
                    close_branch(&open, i, &mut branches);
                    endif_start = i;
                    break;
                }
                scan = i + ENDIF_TAG.len();
            }
            CondToken::Elif if depth == 1 => {
                match parse_condition(text, i + ELIF_TAG.len()) {
                    Some((condition, after)) => {
                        close_branch(&open, i, &mut branches);
                        open = OpenBranch { condition: Some(condition), body_start: after };
                        scan = after;
                    }
                    // Malformed condition: not a branch boundary
                    None => scan = i + ELIF_TAG.len(),
                }
            }
            CondToken::Else if depth == 1 => {
                close_branch(&open, i, &mut branches);
                let after = i + ELSE_TAG.len();
                open = OpenBranch { condition: None, body_start: after };
                scan = after;
            }
            CondToken::Elif => scan = i + ELIF_TAG.len(),
            CondToken::Else => scan = i + ELSE_TAG.len(),
        }
    }

    // Own-line constructs take their indentation and the break after #Endif;
    // inline constructs consume only the tags.
    let prefix = line_prefix_start(text, seg_start, tag_start);
    push_text(nodes, &text[seg_start..prefix.unwrap_or(tag_start)]);
    nodes.push(Node::Cond { branches });

    let after_endif = endif_start + ENDIF_TAG.len();
    if prefix.is_some() {
        Some(consume_newline(text, after_endif))
    } else {
        Some(after_endif)
    }
}
