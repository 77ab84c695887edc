//! Public post identifiers.
//!
//! A slug is the readable part of the title followed by a random suffix.
//! Nothing here checks uniqueness; the `posts_slug_key` constraint rejects
//! a collision at insert time.

use rand::Rng;

/// Length of the random suffix appended to every slug
pub const SUFFIX_LEN: usize = 21;

const URL_SAFE_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Keep ASCII letters, digits and whitespace, join the words with `-` and
/// lowercase the result.
pub fn slugify(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| URL_SAFE_ALPHABET[rng.gen_range(0..URL_SAFE_ALPHABET.len())] as char)
        .collect()
}

/// Slug for a post being created with `title`
pub fn assign_slug(title: &str) -> String {
    let mut rng = rand::thread_rng();
    format!("{}{}", slugify(title), random_suffix(&mut rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn is_url_safe(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_' || c == '-'
    }

    #[test]
    fn punctuation_is_stripped_and_spaces_become_hyphens() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust   in  2024 "), "rust-in-2024");
        assert_eq!(slugify("?!"), "");
    }

    #[test]
    fn assigned_slug_keeps_readable_prefix() {
        let slug = assign_slug("Hello, World!");
        let suffix = slug
            .strip_prefix("hello-world")
            .expect("slug starts with the slugified title");
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(is_url_safe));
    }

    #[test]
    fn suffixes_differ_between_draws() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = random_suffix(&mut rng);
        let b = random_suffix(&mut rng);
        assert_ne!(a, b);
        assert!(a.chars().chain(b.chars()).all(is_url_safe));
    }
}
