use std::fmt;

use crate::error::BuildError;

/// One structural problem found in a specification document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub location: String,
    pub kind: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            location: location.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

pub fn print_issues(issues: &[ValidationIssue]) {
    eprintln!("\n❌ Swagger spec validation failed. {} issue(s) found:\n", issues.len());
    for issue in issues {
        eprintln!("{issue}");
    }
    eprintln!("\nPlease fix the issues in your Swagger spec before starting the server.\n");
}

/// Turn collected issues into a fatal [`BuildError::InvalidSpec`].
pub fn fail_if_issues(issues: Vec<ValidationIssue>) -> Result<(), BuildError> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(BuildError::InvalidSpec(issues))
    }
}
