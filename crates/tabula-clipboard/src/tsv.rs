/// Parse `text/plain` clipboard content as a TSV matrix.
///
/// `\r` is stripped (so `\r\n` terminators collapse to `\n`), one trailing
/// empty record is tolerated, and rows may be ragged; the paste engine pads
/// by growing the grid to the widest row.
pub fn parse_tsv(text: &str) -> Vec<Vec<String>> {
    let cleaned = text.replace('\r', "");
    let mut lines: Vec<&str> = cleaned.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
        .iter()
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::parse_tsv;

    #[test]
    fn splits_rows_and_fields() {
        assert_eq!(
            parse_tsv("a\tb\nc\td"),
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string(), "d".to_string()],
            ]
        );
    }

    #[test]
    fn tolerates_crlf_and_trailing_newline() {
        assert_eq!(
            parse_tsv("a\tb\r\nc\td\r\n"),
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string(), "d".to_string()],
            ]
        );
    }

    #[test]
    fn keeps_ragged_rows_and_empty_fields() {
        assert_eq!(
            parse_tsv("a\t\tb\nc"),
            vec![
                vec!["a".to_string(), String::new(), "b".to_string()],
                vec!["c".to_string()],
            ]
        );
    }

    #[test]
    fn empty_input_is_an_empty_matrix() {
        assert_eq!(parse_tsv(""), Vec::<Vec<String>>::new());
    }

    #[test]
    fn interior_empty_lines_are_preserved() {
        assert_eq!(
            parse_tsv("a\n\nb\n"),
            vec![
                vec!["a".to_string()],
                vec![String::new()],
                vec!["b".to_string()],
            ]
        );
    }
}
