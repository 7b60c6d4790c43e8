use std::fmt;

use serde::{Deserialize, Serialize};

/// The sixteen federal states protocols and examiners are scoped to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    BadenWuerttemberg,
    Bayern,
    Berlin,
    Brandenburg,
    Bremen,
    Hamburg,
    Hessen,
    MecklenburgVorpommern,
    Niedersachsen,
    NordrheinWestfalen,
    RheinlandPfalz,
    Saarland,
    Sachsen,
    SachsenAnhalt,
    SchleswigHolstein,
    Thueringen,
}

impl Region {
    pub const ALL: [Region; 16] = [
        Region::BadenWuerttemberg,
        Region::Bayern,
        Region::Berlin,
        Region::Brandenburg,
        Region::Bremen,
        Region::Hamburg,
        Region::Hessen,
        Region::MecklenburgVorpommern,
        Region::Niedersachsen,
        Region::NordrheinWestfalen,
        Region::RheinlandPfalz,
        Region::Saarland,
        Region::Sachsen,
        Region::SachsenAnhalt,
        Region::SchleswigHolstein,
        Region::Thueringen,
    ];

    /// Name as stored in the database and shown to users.
    pub fn name(self) -> &'static str {
        match self {
            Region::BadenWuerttemberg => "Baden-Württemberg",
            Region::Bayern => "Bayern",
            Region::Berlin => "Berlin",
            Region::Brandenburg => "Brandenburg",
            Region::Bremen => "Bremen",
            Region::Hamburg => "Hamburg",
            Region::Hessen => "Hessen",
            Region::MecklenburgVorpommern => "Mecklenburg-Vorpommern",
            Region::Niedersachsen => "Niedersachsen",
            Region::NordrheinWestfalen => "Nordrhein-Westfalen",
            Region::RheinlandPfalz => "Rheinland-Pfalz",
            Region::Saarland => "Saarland",
            Region::Sachsen => "Sachsen",
            Region::SachsenAnhalt => "Sachsen-Anhalt",
            Region::SchleswigHolstein => "Schleswig-Holstein",
            Region::Thueringen => "Thüringen",
        }
    }

    pub fn from_name(name: &str) -> Option<Region> {
        Region::ALL.into_iter().find(|region| region.name() == name.trim())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Topic tags suggested in the protocol forms.
pub const PREDEFINED_HASHTAGS: &[&str] = &[
    "#Andrologie", "#Onkologie", "#Kinderurologie", "#Steinleiden", "#Harninkontinenz",
    "#Neurourologie", "#Transplantation", "#Endourologie", "#Infektiologie", "#Traumatologie",
    "#rekonstruktive-Urologie", "#Labordiagnostik", "#Bildgebung", "#Notfälle",
    "#Prostata", "#Hoden", "#Niere", "#Blase", "#Urethra", "#Anatomie", "#Physiologie",
    "#Prostatakarzinom", "#Nierenzellkarzinom", "#Urothelkarzinom", "#Hodentumor", "#Peniskarzinom",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_for_every_region() {
        for region in Region::ALL {
            assert_eq!(Region::from_name(region.name()), Some(region));
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(Region::from_name("Bavaria"), None);
        assert_eq!(Region::from_name(""), None);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(Region::from_name(" Thüringen "), Some(Region::Thueringen));
    }
}
