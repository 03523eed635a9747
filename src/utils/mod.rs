//! Project-specific utilities live here.

/// Trimmed input, or `None` when it is missing or blank.
pub fn non_blank(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_inputs_are_dropped() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(Some(" Ana ")), Some("Ana"));
    }
}
