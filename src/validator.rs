use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;

/// Decides whether a returned code exists in some reference code set.
pub trait CodeValidator: Send + Sync {
    fn is_valid(&self, code: &str) -> bool;
}

/// Reference codes loaded from a plain text file.
///
/// One code per line; only the first comma-separated field is used, so a
/// `code,description` CSV works as-is. Blank lines and lines starting with
/// `#` are skipped. Lookups ignore ASCII case, surrounding whitespace and the
/// `.` separator, so `j44.9` matches `J449`.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCodeSet {
    codes: HashSet<String>,
}

impl ReferenceCodeSet {
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = codes
            .into_iter()
            .filter_map(|c| normalize_code(c.as_ref()))
            .collect();
        Self { codes }
    }

    pub fn parse(text: &str) -> Self {
        Self::from_codes(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .filter_map(|l| l.split(',').next()),
        )
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read reference codes from {}", path.display()))?;
        let set = Self::parse(&text);
        if set.is_empty() {
            tracing::warn!(
                "No reference codes found in {}; every code will be unverified",
                path.display()
            );
        }
        tracing::info!(
            "Loaded {} reference codes from {}",
            set.len(),
            path.display()
        );
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl CodeValidator for ReferenceCodeSet {
    fn is_valid(&self, code: &str) -> bool {
        normalize_code(code).is_some_and(|c| self.codes.contains(&c))
    }
}

fn normalize_code(raw: &str) -> Option<String> {
    let code: String = raw
        .trim()
        .trim_matches('"')
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if code.is_empty() { None } else { Some(code) }
}
