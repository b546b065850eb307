//! # Roster
//!
//! Closed lookup table from tracker device ids to starter names.
//!
//! Tracker ids are the IMEI-style numbers the Racemap API reports for each
//! starter. Ids missing from the table still get logged, keyed by their
//! decimal form.

use std::fmt;

/// Known tracker ids and the names their logs are filed under
pub const ROSTER: &[(u64, &str)] = &[
    (860201061315183, "Flavio"),
    (860201061324110, "Clarissa"),
    (860201061337625, "Ivo"),
    (860201061320068, "Takashi"),
    (860201061320308, "Louis"),
    (860201061230630, "Marc"),
    (860201061159557, "Luca"),
    (860201062330074, "Safety-Car"),
    (860201062373355, "Reserve"),
];

/// Resolved identity of a starter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// Id found in [`ROSTER`]
    Known(&'static str),
    /// Id not in the roster
    Unknown(u64),
}

impl Identity {
    /// Look up a tracker id
    ///
    /// # Examples
    ///
    /// ```
    /// use racemap_logger::roster::Identity;
    ///
    /// assert_eq!(Identity::resolve(860201061315183), Identity::Known("Flavio"));
    /// assert_eq!(Identity::resolve(42).to_string(), "42");
    /// ```
    pub fn resolve(id: u64) -> Self {
        ROSTER
            .iter()
            .find(|(known, _)| *known == id)
            .map(|&(_, name)| Identity::Known(name))
            .unwrap_or(Identity::Unknown(id))
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Identity::Known(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Known(name) => f.write_str(name),
            Identity::Unknown(id) => write!(f, "{}", id),
        }
    }
}
