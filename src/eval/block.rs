//! Block resolution over raw script lines.
//!
//! A block starts at an opening keyword line (`if`, `while`, `for`,
//! `function`, `try`) and ends at its terminator. Nested blocks of any kind are
//! skipped by tracking depth: openers increment it, terminators decrement it,
//! and the requested end keywords are only recognized at depth 1.

pub const OPENING_KEYWORDS: [&str; 5] = ["if", "while", "for", "function", "try"];
pub const TERMINATORS: [&str; 5] = ["endif", "endwhile", "endfor", "endfunction", "endtry"];

fn starts_with_keyword(line: &str, keyword: &str) -> bool {
    line.strip_prefix(keyword)
        .is_some_and(|rest| rest.starts_with(' '))
}

/// `if x`, `while x`, `for ...`, `function f`, `try ...` or a bare `try`.
pub fn is_block_opener(line: &str) -> bool {
    line == "try" || OPENING_KEYWORDS.iter().any(|kw| starts_with_keyword(line, kw))
}

pub fn is_block_terminator(line: &str) -> bool {
    TERMINATORS.contains(&line)
}

/// A line matches an end keyword when it is the keyword itself or the keyword
/// followed by a space (`elif COND`).
fn matches_end_keyword(line: &str, end_keywords: &[&str]) -> bool {
    end_keywords
        .iter()
        .any(|kw| line == *kw || starts_with_keyword(line, kw))
}

/// Index of the line closing the block opened at `start`.
///
/// Returns `lines.len()` when the block is never closed; callers treat the
/// remainder of the script as the block body.
pub fn find_block_end<S: AsRef<str>>(start: usize, lines: &[S], end_keywords: &[&str]) -> usize {
    let mut depth = 1usize;

    for (index, line) in lines.iter().enumerate().skip(start + 1) {
        let line = line.as_ref().trim();
        if depth == 1 && matches_end_keyword(line, end_keywords) {
            return index;
        }
        if is_block_opener(line) {
            depth += 1;
        } else if is_block_terminator(line) {
            depth -= 1;
            if depth == 0 {
                return index;
            }
        }
    }

    lines.len()
}
