//! Splits translated transcript text into bounded chunks
//!
//! Clauses end at a run of `. , ! ? ; :` or newlines, and the run stays
//! with the clause it closes. Clauses are packed greedily into chunks of at
//! most `max_bytes` UTF-8 bytes. A clause that cannot fit on its own falls
//! back to word boundaries, and a single word longer than the limit becomes
//! a chunk by itself.

const fn is_delimiter(c: char) -> bool {
    matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '\n')
}

/// Split `text` into ordered chunks of at most `max_bytes` bytes
///
/// Whitespace runs collapse to single spaces. Chunks are never empty, and
/// the same input always yields the same output.
pub fn chunk(text: &str, max_bytes: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for clause in clauses(text) {
        // Punctuation-only clauses glue onto the chunk they follow
        let glue = !current.is_empty() && clause.starts_with(is_delimiter);
        let joined_len = if current.is_empty() {
            clause.len()
        } else if glue {
            current.len() + clause.len()
        } else {
            current.len() + 1 + clause.len()
        };

        if joined_len <= max_bytes {
            if !current.is_empty() && !glue {
                current.push(' ');
            }
            current.push_str(&clause);
            continue;
        }

        flush(&mut chunks, &mut current);

        if clause.len() <= max_bytes {
            current = clause;
        } else {
            split_words(&clause, max_bytes, &mut chunks);
        }
    }

    flush(&mut chunks, &mut current);
    chunks
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
    }
}

/// Clauses with normalized whitespace, each carrying its delimiter run
fn clauses(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let body_end = rest.find(is_delimiter).unwrap_or(rest.len());
        let (body, tail) = rest.split_at(body_end);
        let run_end = tail.find(|c| !is_delimiter(c)).unwrap_or(tail.len());
        let (run, next) = tail.split_at(run_end);

        let mut clause = body.split_whitespace().collect::<Vec<_>>().join(" ");
        clause.extend(run.chars().filter(|c| !c.is_whitespace()));
        if !clause.is_empty() {
            out.push(clause);
        }

        rest = next;
    }

    out
}

fn split_words(clause: &str, max_bytes: usize, chunks: &mut Vec<String>) {
    let mut current = String::new();

    for word in clause.split_whitespace() {
        let joined_len = if current.is_empty() {
            word.len()
        } else {
            current.len() + 1 + word.len()
        };

        if joined_len > max_bytes {
            flush(chunks, &mut current);
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    flush(chunks, &mut current);
}
