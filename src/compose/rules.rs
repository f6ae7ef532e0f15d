use serde::Serialize;

use crate::compose::StyleLanguage;

/// One entry in a host build engine's ordered rule list: which file
/// extensions it matches and the named steps it applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostRule {
    pub name: String,
    pub test: Vec<String>,
    pub uses: Vec<String>,
}

impl HostRule {
    pub fn new<I, S>(name: &str, test: I, uses: &[&str]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            test: test.into_iter().map(Into::into).collect(),
            uses: uses.iter().map(|u| u.to_string()).collect(),
        }
    }

    fn overlaps(&self, other: &HostRule) -> bool {
        self.test
            .iter()
            .any(|ext| other.test.iter().any(|o| o.eq_ignore_ascii_case(ext)))
    }
}

/// Rules this crate installs, one per stylesheet family.
pub fn style_rules() -> Vec<HostRule> {
    [StyleLanguage::Css, StyleLanguage::Less]
        .into_iter()
        .map(|lang| {
            let uses: Vec<&str> = lang.stage_kinds().iter().map(|k| k.as_str()).collect();
            HostRule::new(lang.as_str(), [lang.as_str()], &uses)
        })
        .collect()
}

/// Build a new rule list: the style rules first, then every existing rule
/// that does not handle the same extensions, in its original order.
///
/// Host rules for `.css`/`.less` are replaced rather than chained, so a file
/// never passes through two style chains.
pub fn compose_rules(existing: &[HostRule]) -> Vec<HostRule> {
    let own = style_rules();
    let kept = existing
        .iter()
        .filter(|rule| !own.iter().any(|o| o.overlaps(rule)))
        .cloned();
    own.iter().cloned().chain(kept).collect()
}
