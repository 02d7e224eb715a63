use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;
use thiserror::Error;

/// Error type for version and constraint parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("Malformed version constraint '{constraint}': {reason}")]
    MalformedConstraint { constraint: String, reason: String },

    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },
}

/// Parses a plugin version string such as `"1.2.3"`, `"1.2"` or `"2"`.
///
/// Missing components are treated as zero. Pre-release and build metadata
/// (`"1.0.0-beta+build.5"`) are accepted but dropped: they take no part in
/// ordering, so `1.0.0-beta` and `1.0.0` compare equal.
pub fn parse_version(text: &str) -> Result<Version, VersionError> {
    let invalid = |reason: String| VersionError::InvalidVersion {
        version: text.to_string(),
        reason,
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty version".to_string()));
    }

    let core = trimmed.split(['-', '+']).next().unwrap_or(trimmed);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 {
        return Err(invalid("expected at most major.minor.patch".to_string()));
    }

    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(format!("'{}' is not a numeric component", part)));
        }
        *slot = part
            .parse::<u64>()
            .map_err(|e| invalid(format!("component '{}': {}", part, e)))?;
    }

    Ok(Version::new(numbers[0], numbers[1], numbers[2]))
}

/// Ordering key that ignores pre-release and build metadata.
fn ordering_key(version: &Version) -> (u64, u64, u64) {
    (version.major, version.minor, version.patch)
}

/// Compares two versions on major.minor.patch only.
pub fn compare_versions(a: &Version, b: &Version) -> Ordering {
    ordering_key(a).cmp(&ordering_key(b))
}

/// One end of a version interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBound {
    pub version: Version,
    pub inclusive: bool,
}

impl VersionBound {
    pub fn inclusive(version: Version) -> Self {
        Self { version, inclusive: true }
    }

    pub fn exclusive(version: Version) -> Self {
        Self { version, inclusive: false }
    }

    /// True if `actual` is on the permitted side of this bound used as a lower bound.
    fn admits_from_below(&self, actual: &Version) -> bool {
        match compare_versions(actual, &self.version) {
            Ordering::Greater => true,
            Ordering::Equal => self.inclusive,
            Ordering::Less => false,
        }
    }

    /// True if `actual` is on the permitted side of this bound used as an upper bound.
    fn admits_from_above(&self, actual: &Version) -> bool {
        match compare_versions(actual, &self.version) {
            Ordering::Less => true,
            Ordering::Equal => self.inclusive,
            Ordering::Greater => false,
        }
    }
}

/// Parsed form of a dependency's version requirement.
///
/// Grammar:
/// - `"*"` is [`VersionConstraint::Any`]
/// - a bare version (`"1.2.3"`) is [`VersionConstraint::Exact`]
/// - `"[1.0,2.0)"` is a [`VersionConstraint::Range`]; `[`/`]` are inclusive,
///   `(`/`)` exclusive, and either bound may be left empty for "unbounded"
/// - `"[1.2.3]"` is shorthand for `Exact(1.2.3)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    Any,
    Exact(Version),
    Range {
        lower: Option<VersionBound>,
        upper: Option<VersionBound>,
    },
}

impl VersionConstraint {
    /// Parses a requirement string.
    pub fn parse(constraint: &str) -> Result<Self, VersionError> {
        let malformed = |reason: String| VersionError::MalformedConstraint {
            constraint: constraint.to_string(),
            reason,
        };

        let text = constraint.trim();
        if text == "*" {
            return Ok(VersionConstraint::Any);
        }

        match text.chars().next() {
            None => Err(malformed("empty constraint".to_string())),
            Some('[') | Some('(') => Self::parse_interval(text).map_err(malformed),
            Some(_) => {
                if text.ends_with(']') || text.ends_with(')') {
                    return Err(malformed("interval is missing its opening bracket".to_string()));
                }
                parse_version(text)
                    .map(VersionConstraint::Exact)
                    .map_err(|e| malformed(e.to_string()))
            }
        }
    }

    fn parse_interval(text: &str) -> Result<Self, String> {
        let lower_inclusive = text.starts_with('[');
        let upper_inclusive = match text.chars().last() {
            Some(']') if text.len() > 1 => true,
            Some(')') if text.len() > 1 => false,
            _ => return Err("interval must end with ']' or ')'".to_string()),
        };
        // Both brackets are single ASCII bytes.
        let body = &text[1..text.len() - 1];

        let Some((lower_text, upper_text)) = body.split_once(',') else {
            if !(lower_inclusive && upper_inclusive) {
                return Err("a single-version interval must use '[' and ']'".to_string());
            }
            let version = Self::parse_bound(body)?
                .ok_or_else(|| "interval is empty".to_string())?;
            return Ok(VersionConstraint::Exact(version));
        };

        if upper_text.contains(',') {
            return Err("interval has more than two bounds".to_string());
        }

        let lower = Self::parse_bound(lower_text)?.map(|version| VersionBound {
            version,
            inclusive: lower_inclusive,
        });
        let upper = Self::parse_bound(upper_text)?.map(|version| VersionBound {
            version,
            inclusive: upper_inclusive,
        });

        if let (Some(lo), Some(hi)) = (&lower, &upper) {
            if compare_versions(&lo.version, &hi.version) == Ordering::Greater {
                return Err(format!(
                    "lower bound {} is greater than upper bound {}",
                    lo.version, hi.version
                ));
            }
        }

        Ok(VersionConstraint::Range { lower, upper })
    }

    fn parse_bound(text: &str) -> Result<Option<Version>, String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        parse_version(trimmed).map(Some).map_err(|e| e.to_string())
    }

    /// Checks whether `actual` satisfies this constraint.
    pub fn satisfies(&self, actual: &Version) -> bool {
        match self {
            VersionConstraint::Any => true,
            VersionConstraint::Exact(required) => compare_versions(required, actual) == Ordering::Equal,
            VersionConstraint::Range { lower, upper } => {
                lower.as_ref().is_none_or(|bound| bound.admits_from_below(actual))
                    && upper.as_ref().is_none_or(|bound| bound.admits_from_above(actual))
            }
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Any => write!(f, "*"),
            VersionConstraint::Exact(version) => write!(f, "{}", version),
            VersionConstraint::Range { lower, upper } => {
                match lower {
                    Some(bound) if bound.inclusive => write!(f, "[{}", bound.version)?,
                    Some(bound) => write!(f, "({}", bound.version)?,
                    None => write!(f, "(")?,
                }
                write!(f, ",")?;
                match upper {
                    Some(bound) if bound.inclusive => write!(f, "{}]", bound.version),
                    Some(bound) => write!(f, "{})", bound.version),
                    None => write!(f, ")"),
                }
            }
        }
    }
}

/// Allow parsing directly from a string slice.
impl FromStr for VersionConstraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionConstraint::parse(s)
    }
}
