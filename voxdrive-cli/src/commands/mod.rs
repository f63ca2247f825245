pub mod devices;
pub mod features;
pub mod listen;
pub mod record;

/// Filesystem-safe form of a vocabulary label ("ileri git" → "ileri_git").
pub fn label_slug(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::label_slug;

    #[test]
    fn slugs_replace_whitespace_only() {
        assert_eq!(label_slug("ileri git"), "ileri_git");
        assert_eq!(label_slug("dur"), "dur");
        assert_eq!(label_slug("saga dön"), "saga_dön");
    }
}
