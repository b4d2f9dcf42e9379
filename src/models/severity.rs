use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Audit entry severity, stored as its index in the `level` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal = 1,
    Error = 2,
    Warning = 3,
    Information = 4,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Fatal,
        Severity::Error,
        Severity::Warning,
        Severity::Information,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Severity::Fatal => "FATAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Information => "INFORMATION",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Matches names case-insensitively; the error carries the rejected input
impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|severity| severity.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

/// One row of the `/audit/severity` lookup table
#[derive(Debug, Clone, Serialize)]
pub struct SeverityEntry {
    pub index: u8,
    pub name: &'static str,
}

impl From<Severity> for SeverityEntry {
    fn from(severity: Severity) -> Self {
        Self {
            index: severity.index(),
            name: severity.name(),
        }
    }
}
