use std::collections::BTreeMap;

use serde::Serialize;

/// Design-token variables injected into every preprocessor stage.
///
/// Built once per build and then only read. Names are stored without the Less
/// `@` sigil so `@primary` and `primary` address the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VariableTable {
    entries: BTreeMap<String, String>,
}

impl VariableTable {
    pub fn builder() -> VariableTableBuilder {
        VariableTableBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(canonical_name(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the table as Less declarations, the form a preprocessor
    /// prepends ahead of the file being compiled.
    pub fn to_less_prelude(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.entries {
            out.push('@');
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str(";\n");
        }
        out
    }
}

/// Accumulates layers of variables; later layers override earlier ones.
#[derive(Debug, Default)]
pub struct VariableTableBuilder {
    entries: BTreeMap<String, String>,
}

impl VariableTableBuilder {
    pub fn set(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        let name = canonical_name(name.as_ref());
        if !name.is_empty() {
            self.entries.insert(name.to_string(), value.into());
        }
        self
    }

    pub fn layer<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in entries {
            self = self.set(name, value);
        }
        self
    }

    pub fn build(self) -> VariableTable {
        VariableTable {
            entries: self.entries,
        }
    }
}

fn canonical_name(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed)
}
