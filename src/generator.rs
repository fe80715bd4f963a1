//! One-time code generation.

/// Strategy for producing one-time codes.
///
/// Implementations must be safe for unsynchronized concurrent use; the
/// default [`SixDigitCodeGenerator`] is stateless.
pub trait CodeGenerator: Send + Sync {
    /// Produce a fresh one-time code.
    fn generate_code(&self) -> String;
}

/// Generates fixed-length numeric codes, each digit drawn independently and
/// uniformly from 0–9 using the operating system's CSPRNG.
#[derive(Debug, Clone)]
pub struct SixDigitCodeGenerator {
    length: usize,
}

impl Default for SixDigitCodeGenerator {
    fn default() -> Self {
        Self { length: 6 }
    }
}

impl SixDigitCodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the code length (default: 6).
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }
}

impl CodeGenerator for SixDigitCodeGenerator {
    fn generate_code(&self) -> String {
        use rand::Rng;

        let mut rng = rand::rngs::OsRng;
        (0..self.length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_six_digits() {
        let code = SixDigitCodeGenerator::new().generate_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_custom_length() {
        let code = SixDigitCodeGenerator::new().with_length(8).generate_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_codes_vary() {
        let generator = SixDigitCodeGenerator::new();
        let codes: std::collections::HashSet<String> =
            (0..100).map(|_| generator.generate_code()).collect();
        assert!(codes.len() > 1);
    }
}
