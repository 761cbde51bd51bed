//! # Kernel Options
//!
//! `key=value` pairs and bare flags from the boot command line.
//!
//! ```text
//! /boot/ember.elf log_level=debug root=/dev/hdd0p1 quiet
//! └── image path  └──────── options ───────────────────┘
//! ```
//!
//! A leading token that looks like a path is the kernel image and is not
//! an option.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

/// Parsed kernel command-line options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelOptions {
    options: BTreeMap<String, String>,
}

impl KernelOptions {
    /// Parse a command line
    pub fn parse(command_line: &str) -> Self {
        let mut tokens = command_line.split_whitespace().peekable();
        if tokens.peek().is_some_and(|token| token.starts_with('/')) {
            tokens.next();
        }

        let mut options = BTreeMap::new();
        for token in tokens {
            let (key, value) = match token.split_once('=') {
                Some((key, value)) => (key, value),
                None => (token, ""),
            };
            if !key.is_empty() {
                options.insert(key.to_string(), value.to_string());
            }
        }

        Self { options }
    }

    /// Value of `key`; an empty string for a bare flag
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Whether `key` was given
    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// Number of options
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Whether no option was given
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// All options in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let options = KernelOptions::parse("/boot/ember.elf log_level=debug root=/dev/hdd0p1 quiet");
        assert_eq!(options.len(), 3);
        assert_eq!(options.get("log_level"), Some("debug"));
        assert_eq!(options.get("root"), Some("/dev/hdd0p1"));
        assert_eq!(options.get("quiet"), Some(""));
        assert!(options.contains("quiet"));
        assert!(!options.contains("/boot/ember.elf"));
    }

    #[test]
    fn test_later_value_wins_and_empty_keys_skipped() {
        let options = KernelOptions::parse("a=1 =x a=2");
        assert_eq!(options.get("a"), Some("2"));
        assert_eq!(options.len(), 1);
        assert!(KernelOptions::parse("   ").is_empty());
    }
}
