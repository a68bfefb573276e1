//! Static catalog of occupant-comfort profiles.
//!
//! Profiles and their per-sensor preferences are a closed set, so they are
//! compiled in as tables rather than loaded at runtime.

use serde::Serialize;
use utoipa::ToSchema;

use crate::db::models::SensorKind;

/// Preferred interval and importance weight for one sensor.
///
/// An absent bound leaves that side unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct SensorPreference {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub weight: f64,
}

impl SensorPreference {
    const fn range(min: f64, max: f64, weight: f64) -> Self {
        Self { min: Some(min), max: Some(max), weight }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    YoungProfessionals,
    FamiliesWithBabies,
    ElderlyResidents,
    AllergyAsthma,
}

/// Free-text names accepted in place of a canonical profile name.
const ALIASES: &[(&str, Profile)] = &[
    ("Working Adult", Profile::YoungProfessionals),
    ("Young Professionals", Profile::YoungProfessionals),
    ("Young Professional", Profile::YoungProfessionals),
    ("Work from Home Adult", Profile::YoungProfessionals),
    ("Stay-home Elderly", Profile::ElderlyResidents),
    ("Elderly", Profile::ElderlyResidents),
    ("Elderly People", Profile::ElderlyResidents),
    ("Families with Babies", Profile::FamiliesWithBabies),
    ("Asthma/Allergic People", Profile::AllergyAsthma),
];

type PreferenceTable = [(SensorKind, SensorPreference); 5];

const YOUNG_PROFESSIONALS: PreferenceTable = [
    (SensorKind::Temperature, SensorPreference::range(21.0, 23.0, 1.2)),
    (SensorKind::Humidity, SensorPreference::range(40.0, 50.0, 1.0)),
    (SensorKind::AirQuality, SensorPreference::range(0.0, 15.0, 1.1)),
    (SensorKind::Light, SensorPreference::range(500.0, 1000.0, 1.3)),
    (SensorKind::Sound, SensorPreference::range(25.0, 45.0, 0.9)),
];

const FAMILIES_WITH_BABIES: PreferenceTable = [
    (SensorKind::Temperature, SensorPreference::range(20.0, 22.0, 1.2)),
    (SensorKind::Humidity, SensorPreference::range(45.0, 55.0, 1.1)),
    (SensorKind::AirQuality, SensorPreference::range(0.0, 10.0, 1.4)),
    (SensorKind::Light, SensorPreference::range(200.0, 400.0, 0.8)),
    (SensorKind::Sound, SensorPreference::range(20.0, 35.0, 1.3)),
];

const ELDERLY_RESIDENTS: PreferenceTable = [
    (SensorKind::Temperature, SensorPreference::range(22.0, 24.0, 1.3)),
    (SensorKind::Humidity, SensorPreference::range(40.0, 50.0, 1.0)),
    (SensorKind::AirQuality, SensorPreference::range(0.0, 12.0, 1.3)),
    (SensorKind::Light, SensorPreference::range(300.0, 500.0, 0.9)),
    (SensorKind::Sound, SensorPreference::range(25.0, 40.0, 1.2)),
];

const ALLERGY_ASTHMA: PreferenceTable = [
    (SensorKind::Temperature, SensorPreference::range(20.0, 22.0, 1.0)),
    (SensorKind::Humidity, SensorPreference::range(35.0, 45.0, 1.4)),
    (SensorKind::AirQuality, SensorPreference::range(0.0, 8.0, 1.6)),
    (SensorKind::Light, SensorPreference::range(400.0, 600.0, 0.7)),
    (SensorKind::Sound, SensorPreference::range(25.0, 40.0, 1.1)),
];

impl Profile {
    pub const ALL: [Profile; 4] = [
        Profile::YoungProfessionals,
        Profile::FamiliesWithBabies,
        Profile::ElderlyResidents,
        Profile::AllergyAsthma,
    ];

    pub const DEFAULT: Profile = Profile::YoungProfessionals;

    /// Canonical display name.
    pub fn name(self) -> &'static str {
        match self {
            Profile::YoungProfessionals => "Young Professionals (Working from Home)",
            Profile::FamiliesWithBabies => "Families with Babies/Toddlers",
            Profile::ElderlyResidents => "Elderly Residents",
            Profile::AllergyAsthma => "Allergy/Asthma Sufferers",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Profile::YoungProfessionals => {
                "Bright, focused environment for long working hours at home."
            }
            Profile::FamiliesWithBabies => {
                "Stable and gentle environment for infants and toddlers."
            }
            Profile::ElderlyResidents => {
                "Warm, safe environment with clean air and balanced lighting."
            }
            Profile::AllergyAsthma => {
                "Very low particulate levels and drier air to reduce triggers."
            }
        }
    }

    /// One entry per supported sensor, in declared sensor order.
    pub fn preferences(self) -> &'static [(SensorKind, SensorPreference)] {
        match self {
            Profile::YoungProfessionals => &YOUNG_PROFESSIONALS,
            Profile::FamiliesWithBabies => &FAMILIES_WITH_BABIES,
            Profile::ElderlyResidents => &ELDERLY_RESIDENTS,
            Profile::AllergyAsthma => &ALLERGY_ASTHMA,
        }
    }

    /// Exact canonical-name lookup.
    pub fn from_name(name: &str) -> Option<Profile> {
        Profile::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Resolve any requested profile name to a canonical profile.
///
/// Trims, applies the alias table, then falls back to [`Profile::DEFAULT`]
/// for empty or unknown names. Never fails.
pub fn normalize_profile(requested: Option<&str>) -> Profile {
    let Some(requested) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return Profile::DEFAULT;
    };

    ALIASES
        .iter()
        .find(|(alias, _)| *alias == requested)
        .map(|(_, profile)| *profile)
        .or_else(|| Profile::from_name(requested))
        .unwrap_or(Profile::DEFAULT)
}
