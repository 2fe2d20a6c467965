//! Text normalization shared by the infobox extractors.

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercase the first letter of each alphabetic run, lowercase the rest.
/// "directed by" -> "Directed By", "co-director" -> "Co-Director".
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Normalize a raw label cell text into its record key form.
pub fn normalize_label(s: &str) -> String {
    title_case(&collapse_ws(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_and_trims() {
        assert_eq!(collapse_ws("  Directed \n by  "), "Directed by");
        assert_eq!(collapse_ws("one"), "one");
        assert_eq!(collapse_ws("   "), "");
    }

    #[test]
    fn title_cases_each_word() {
        assert_eq!(title_case("directed by"), "Directed By");
        assert_eq!(title_case("MUSIC BY"), "Music By");
        assert_eq!(title_case("co-director"), "Co-Director");
        assert_eq!(title_case("box office (est.)"), "Box Office (Est.)");
    }

    #[test]
    fn label_normalization_combines_both() {
        assert_eq!(normalize_label(" directed\u{a0}by "), "Directed By");
        assert_eq!(normalize_label("running  time"), "Running Time");
    }
}
