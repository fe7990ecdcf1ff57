use std::{fmt, str::FromStr};

use crate::error::DomainError;

const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 253;

/// A zone name as typed by a user, normalized for walking.
///
/// Normalized names are lowercase, carry no URL scheme, no leading `www.`
/// label, no path and no trailing root dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Domain(String);

impl Domain {
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let lowered = input.trim().to_ascii_lowercase();
        let mut name = lowered.as_str();
        name = name
            .strip_prefix("http://")
            .or_else(|| name.strip_prefix("https://"))
            .unwrap_or(name);
        name = name.strip_prefix("www.").unwrap_or(name);
        if let Some(idx) = name.find('/') {
            name = &name[..idx];
        }
        let name = name.trim_end_matches('.');

        if name.is_empty() {
            return Err(DomainError::Empty);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(DomainError::TooLong(name.to_owned()));
        }
        for label in name.split('.') {
            if label.is_empty() {
                return Err(DomainError::EmptyLabel(name.to_owned()));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(DomainError::LabelTooLong(label.to_owned()));
            }
        }

        Ok(Self(name.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Domain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Domain {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Normalizes a name returned by a nameserver so it compares equal to a
/// [`Domain`] naming the same owner.
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}
