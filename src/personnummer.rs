use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Validated Swedish personal identity number (12-digit `YYYYMMDDNNNN`).
///
/// Guaranteed well-formed by construction: holding a `Personnummer` proves the
/// format is correct. Use `"198001011234".parse::<Personnummer>()` or
/// `Personnummer::try_from(string)` to create one.
///
/// The full number is sensitive. `Display` renders the masked form
/// (`19800101****`); use [`as_str`](Personnummer::as_str) when the complete
/// number must go on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Personnummer(String);

impl Personnummer {
    /// The complete 12-digit number. Do not log this.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Birth date retained, serial and check digits masked.
    #[must_use]
    pub fn masked(&self) -> String {
        format!("{}****", &self.0[..8])
    }
}

impl std::fmt::Display for Personnummer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.masked())
    }
}

impl std::str::FromStr for Personnummer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for Personnummer {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.len() != 12 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidPersonnummer(s));
        }
        let month: u32 = s[4..6].parse().expect("digits parse as u32");
        let day: u32 = s[6..8].parse().expect("digits parse as u32");
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(Error::InvalidPersonnummer(s));
        }
        Ok(Self(s))
    }
}

impl From<Personnummer> for String {
    fn from(p: Personnummer) -> Self {
        p.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_personnummer() {
        assert!("198001011234".parse::<Personnummer>().is_ok());
        assert!("200012319876".parse::<Personnummer>().is_ok());
        assert!("191001015555".parse::<Personnummer>().is_ok());
    }

    #[test]
    fn invalid_length() {
        assert!("8001011234".parse::<Personnummer>().is_err());
        assert!("1980010112345".parse::<Personnummer>().is_err());
        assert!("".parse::<Personnummer>().is_err());
    }

    #[test]
    fn invalid_non_digits() {
        assert!("19800101123a".parse::<Personnummer>().is_err());
        assert!("1980-01-0112".parse::<Personnummer>().is_err());
    }

    #[test]
    fn invalid_date_parts() {
        assert!("198013011234".parse::<Personnummer>().is_err());
        assert!("198000011234".parse::<Personnummer>().is_err());
        assert!("198001001234".parse::<Personnummer>().is_err());
        assert!("198001321234".parse::<Personnummer>().is_err());
    }

    #[test]
    fn display_is_masked() {
        let pnr: Personnummer = "198001011234".parse().unwrap();
        assert_eq!(pnr.to_string(), "19800101****");
        assert_eq!(pnr.masked(), "19800101****");
        assert_eq!(pnr.as_str(), "198001011234");
    }

    #[test]
    fn serde_roundtrip() {
        let pnr: Personnummer = "198001011234".parse().unwrap();
        let json = serde_json::to_string(&pnr).unwrap();
        assert_eq!(json, "\"198001011234\"");
        let parsed: Personnummer = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, pnr);
    }

    #[test]
    fn serde_rejects_invalid() {
        assert!(serde_json::from_str::<Personnummer>("\"not-a-number\"").is_err());
    }
}
