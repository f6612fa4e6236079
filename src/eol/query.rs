//! Subscription scoping for the classification query

use std::collections::BTreeSet;

/// Normalize subscription ids: trim, lowercase, drop blanks, dedup, sort.
pub fn scope_subscriptions<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .map(|id| id.as_ref().trim().to_ascii_lowercase())
        .filter(|id| !id.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The `where` clause that limits a query to `subscriptions`
pub fn subscription_filter(subscriptions: &[String]) -> String {
    let quoted: Vec<String> = subscriptions
        .iter()
        .map(|s| format!("'{}'", s.replace(['\'', '"', '\\'], "")))
        .collect();
    format!("| where subscriptionId in~ ({})", quoted.join(", "))
}

/// Insert the subscription filter directly after the query's source table.
///
/// Leading `let` statements are left alone; the filter goes after the first
/// tabular source of the final statement. Pipes inside string literals and
/// `//` comments are not treated as operators.
pub fn scoped_query(template: &str, subscriptions: &[String]) -> String {
    let template = template.trim();
    let filter = subscription_filter(subscriptions);

    let body_start = last_statement_start(template);
    match first_pipe_from(template, body_start) {
        Some(pipe) => {
            let (head, tail) = template.split_at(pipe);
            format!("{}\n{}\n{}", head.trim_end(), filter, tail)
        }
        None => format!("{}\n{}", template, filter),
    }
}

/// Byte offsets of characters that are outside string literals and comments
fn code_positions(text: &str) -> Vec<(usize, char)> {
    let mut positions = Vec::new();
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            continue;
        }
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '/' if matches!(chars.peek(), Some((_, '/'))) => in_comment = true,
            _ => positions.push((i, c)),
        }
    }
    positions
}

fn last_statement_start(text: &str) -> usize {
    code_positions(text)
        .into_iter()
        .filter(|(_, c)| *c == ';')
        .filter(|(i, _)| !text[i + 1..].trim().is_empty())
        .map(|(i, _)| i + 1)
        .last()
        .unwrap_or(0)
}

fn first_pipe_from(text: &str, start: usize) -> Option<usize> {
    code_positions(text)
        .into_iter()
        .find(|(i, c)| *i >= start && *c == '|')
        .map(|(i, _)| i)
}
