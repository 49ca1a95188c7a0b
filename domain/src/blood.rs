//! ABO/Rh blood groups and red-cell donation compatibility

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APos,
    #[serde(rename = "A-")]
    ANeg,
    #[serde(rename = "B+")]
    BPos,
    #[serde(rename = "B-")]
    BNeg,
    #[serde(rename = "AB+")]
    AbPos,
    #[serde(rename = "AB-")]
    AbNeg,
    #[serde(rename = "O+")]
    OPos,
    #[serde(rename = "O-")]
    ONeg,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::ONeg,
        BloodGroup::OPos,
        BloodGroup::ANeg,
        BloodGroup::APos,
        BloodGroup::BNeg,
        BloodGroup::BPos,
        BloodGroup::AbNeg,
        BloodGroup::AbPos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APos => "A+",
            BloodGroup::ANeg => "A-",
            BloodGroup::BPos => "B+",
            BloodGroup::BNeg => "B-",
            BloodGroup::AbPos => "AB+",
            BloodGroup::AbNeg => "AB-",
            BloodGroup::OPos => "O+",
            BloodGroup::ONeg => "O-",
        }
    }

    fn antigens(&self) -> (bool, bool, bool) {
        // (A, B, Rh)
        match self {
            BloodGroup::APos => (true, false, true),
            BloodGroup::ANeg => (true, false, false),
            BloodGroup::BPos => (false, true, true),
            BloodGroup::BNeg => (false, true, false),
            BloodGroup::AbPos => (true, true, true),
            BloodGroup::AbNeg => (true, true, false),
            BloodGroup::OPos => (false, false, true),
            BloodGroup::ONeg => (false, false, false),
        }
    }

    /// Whether red cells from `self` can be given to `recipient`.
    ///
    /// A donor is compatible when every antigen it carries is also carried by
    /// the recipient.
    pub fn can_donate_to(&self, recipient: BloodGroup) -> bool {
        let (da, db, drh) = self.antigens();
        let (ra, rb, rrh) = recipient.antigens();
        (!da || ra) && (!db || rb) && (!drh || rrh)
    }

    pub fn recipients(&self) -> Vec<BloodGroup> {
        BloodGroup::ALL
            .into_iter()
            .filter(|recipient| self.can_donate_to(*recipient))
            .collect()
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Typographic minus shows up in pasted values.
        let normalized = s.trim().to_ascii_uppercase().replace('\u{2212}', "-");
        BloodGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == normalized)
            .ok_or_else(|| format!("unknown blood group: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universal_donor_and_recipient() {
        assert_eq!(BloodGroup::ONeg.recipients().len(), 8);
        assert_eq!(BloodGroup::AbPos.recipients(), vec![BloodGroup::AbPos]);
        for group in BloodGroup::ALL {
            assert!(group.can_donate_to(BloodGroup::AbPos));
        }
    }

    #[test]
    fn test_rh_positive_cannot_give_to_negative() {
        assert!(!BloodGroup::OPos.can_donate_to(BloodGroup::ONeg));
        assert_eq!(
            BloodGroup::OPos.recipients(),
            vec![BloodGroup::OPos, BloodGroup::APos, BloodGroup::BPos, BloodGroup::AbPos]
        );
        assert_eq!(
            BloodGroup::BNeg.recipients(),
            vec![BloodGroup::BNeg, BloodGroup::BPos, BloodGroup::AbNeg, BloodGroup::AbPos]
        );
    }

    #[test]
    fn test_parse_accepts_typographic_minus() {
        assert_eq!("ab\u{2212}".parse::<BloodGroup>().unwrap(), BloodGroup::AbNeg);
        assert_eq!("O+".parse::<BloodGroup>().unwrap(), BloodGroup::OPos);
        assert!("C+".parse::<BloodGroup>().is_err());
    }
}
