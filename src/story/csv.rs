//! Minimal CSV tokenizer for story sheets
//!
//! Handles quoted fields with doubled quotes, embedded commas and newlines.
//! Carriage returns are dropped. Never fails: malformed input degrades to
//! whatever rows could be read.

/// Split CSV text into rows of fields
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\r' {
            continue;
        }
        if quoted {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => quoted = false,
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' => quoted = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_rows() {
        let rows = parse_rows("id,title\nstart,Hello\n");
        assert_eq!(rows, vec![vec!["id", "title"], vec!["start", "Hello"]]);
    }

    #[test]
    fn test_quotes_and_crlf() {
        let rows = parse_rows("a,b\r\n\"x, y\",\"say \"\"hi\"\"\"\r\n\"multi\nline\",z");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["x, y", "say \"hi\""]);
        assert_eq!(rows[2], vec!["multi\nline", "z"]);
    }

    #[test]
    fn test_trailing_empty_field() {
        let rows = parse_rows("a,b,\n");
        assert_eq!(rows, vec![vec!["a", "b", ""]]);
    }

    #[test]
    fn test_unterminated_quote_is_tolerated() {
        let rows = parse_rows("a,\"open");
        assert_eq!(rows, vec![vec!["a", "open"]]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_rows("").is_empty());
    }
}
