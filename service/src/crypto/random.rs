//! Random values generation backed by the operating system CSPRNG.

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng as _};

/// Generates a random string of `len` ASCII letters and digits.
#[must_use]
pub fn alphanumeric(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod spec {
    use std::collections::HashSet;

    use super::alphanumeric;

    #[test]
    fn generates_requested_length() {
        assert_eq!(alphanumeric(0), "");
        assert_eq!(alphanumeric(64).len(), 64);
    }

    #[test]
    fn uses_only_letters_and_digits() {
        assert!(alphanumeric(256).chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn does_not_repeat() {
        let generated =
            (0..100).map(|_| alphanumeric(64)).collect::<HashSet<_>>();

        assert_eq!(generated.len(), 100);
    }
}
