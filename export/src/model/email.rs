// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! The `EmailAddress` data type.

use pubexport_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Maximum length of email addresses per the schema.
const MAX_EMAIL_LENGTH: usize = 90;

/// Represents a correctly-formatted email address, such as the contact of a server or the
/// depositor address sent along Crossref deposits.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(into = "String", try_from = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a new email address from an untrusted string `s`, making sure it is valid.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();

        if s.trim().is_empty() {
            return Err(ModelError("Email address cannot be empty".to_owned()));
        }
        if s.len() > MAX_EMAIL_LENGTH {
            return Err(ModelError("Email address is too long".to_owned()));
        }

        // Email addresses can have many formats and validating them is futile.  Registrars
        // validate them again anyway, so only reject what cannot possibly work.
        match s.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !s.contains(char::is_whitespace) => {}
            _ => {
                return Err(ModelError(format!("Email does not look like a valid address '{}'", s)));
            }
        }

        Ok(Self(s))
    }

    /// Returns a string view of the email address.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = ModelError;

    fn try_from(s: String) -> ModelResult<Self> {
        EmailAddress::new(s)
    }
}

impl From<EmailAddress> for String {
    fn from(email: EmailAddress) -> Self {
        email.0
    }
}

#[cfg(test)]
impl From<&'static str> for EmailAddress {
    fn from(raw_email: &'static str) -> Self {
        Self::new(raw_email).expect("Hardcoded email addresses for testing must be valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emailaddress_ok() {
        assert_eq!("editor@example.org", EmailAddress::new("editor@example.org").unwrap().as_str());
    }

    #[test]
    fn test_emailaddress_errors() {
        assert!(EmailAddress::new("").unwrap_err().0.contains("cannot be empty"));
        assert!(EmailAddress::new("  ").unwrap_err().0.contains("cannot be empty"));
        assert!(EmailAddress::new("no-at-sign").unwrap_err().0.contains("valid address"));
        assert!(EmailAddress::new("@example.org").unwrap_err().0.contains("valid address"));
        assert!(EmailAddress::new("editor@").unwrap_err().0.contains("valid address"));
        assert!(EmailAddress::new("a b@example.org").unwrap_err().0.contains("valid address"));

        let long = format!("{}@example.org", "x".repeat(MAX_EMAIL_LENGTH));
        assert!(EmailAddress::new(long).unwrap_err().0.contains("too long"));
    }

    #[test]
    fn test_emailaddress_deserialize() {
        assert_eq!(
            EmailAddress::from("a@example.org"),
            serde_json::from_str::<EmailAddress>("\"a@example.org\"").unwrap()
        );
        serde_json::from_str::<EmailAddress>("\"bad\"").unwrap_err();
    }
}
