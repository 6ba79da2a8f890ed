//! Effect and weather categories.

use crate::WeatherError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Effect categories ──────────────────────────────────────────────────────

/// Role of an effect instance, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EffectCategory {
    Rain,
    Snow,
    Dust,
    Leaves,
    Fog,
}

impl EffectCategory {
    pub const ALL: [EffectCategory; 5] = [
        EffectCategory::Rain,
        EffectCategory::Snow,
        EffectCategory::Dust,
        EffectCategory::Leaves,
        EffectCategory::Fog,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EffectCategory::Rain => "rain",
            EffectCategory::Snow => "snow",
            EffectCategory::Dust => "dust",
            EffectCategory::Leaves => "leaves",
            EffectCategory::Fog => "fog",
        }
    }
}

impl fmt::Display for EffectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Name keywords per category. Checked top to bottom, so the specific
/// precipitation keywords win over the generic ones.
pub const CATEGORY_KEYWORDS: [(EffectCategory, &[&str]); 5] = [
    (EffectCategory::Snow, &["snow", "nevando", "neve_", "_neve"]),
    (EffectCategory::Rain, &["rain", "chuvando", "chuva_", "_chuva"]),
    (EffectCategory::Fog, &["fog", "mist", "nevoa", "nevoeiro"]),
    (EffectCategory::Dust, &["dust", "poeira"]),
    (EffectCategory::Leaves, &["leaves", "leaf", "folhas"]),
];

/// Category of an instance by name, with the keyword that matched.
pub fn classify_with_keyword(name: &str) -> Option<(EffectCategory, &'static str)> {
    let name = name.trim().to_lowercase();
    CATEGORY_KEYWORDS.iter().find_map(|(category, keywords)| {
        keywords
            .iter()
            .find(|k| name.contains(*k))
            .map(|k| (*category, *k))
    })
}

/// Category of an instance by name; `None` means unclassified.
pub fn classify(name: &str) -> Option<EffectCategory> {
    classify_with_keyword(name).map(|(category, _)| category)
}

// ── Weather categories ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCategory {
    #[default]
    #[serde(alias = "ensolarado")]
    Clear,
    #[serde(alias = "chuvoso")]
    Rainy,
    #[serde(alias = "nevando")]
    Snowy,
    #[serde(alias = "seco")]
    Dry,
    #[serde(alias = "nublado")]
    Overcast,
}

impl WeatherCategory {
    /// Display order of the probability table.
    pub const ALL: [WeatherCategory; 5] = [
        WeatherCategory::Rainy,
        WeatherCategory::Snowy,
        WeatherCategory::Clear,
        WeatherCategory::Dry,
        WeatherCategory::Overcast,
    ];

    pub const NON_PRECIPITATION: [WeatherCategory; 3] = [
        WeatherCategory::Clear,
        WeatherCategory::Dry,
        WeatherCategory::Overcast,
    ];

    /// Effect categories that run while this weather holds.
    pub fn required_effects(self) -> &'static [EffectCategory] {
        match self {
            WeatherCategory::Rainy => &[EffectCategory::Rain],
            WeatherCategory::Snowy => &[EffectCategory::Snow],
            WeatherCategory::Dry => &[EffectCategory::Dust, EffectCategory::Leaves],
            WeatherCategory::Overcast => &[EffectCategory::Fog],
            WeatherCategory::Clear => &[EffectCategory::Leaves],
        }
    }

    pub fn requires(self, effect: EffectCategory) -> bool {
        self.required_effects().contains(&effect)
    }

    pub fn is_precipitation(self) -> bool {
        matches!(self, WeatherCategory::Rainy | WeatherCategory::Snowy)
    }

    /// Tag written to the owning object.
    pub fn tag(self) -> &'static str {
        match self {
            WeatherCategory::Clear => "clear",
            WeatherCategory::Rainy => "rainy",
            WeatherCategory::Snowy => "snowy",
            WeatherCategory::Dry => "dry",
            WeatherCategory::Overcast => "overcast",
        }
    }
}

impl fmt::Display for WeatherCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for WeatherCategory {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clear" | "ensolarado" => Ok(WeatherCategory::Clear),
            "rainy" | "chuvoso" => Ok(WeatherCategory::Rainy),
            "snowy" | "nevando" => Ok(WeatherCategory::Snowy),
            "dry" | "seco" => Ok(WeatherCategory::Dry),
            "overcast" | "nublado" => Ok(WeatherCategory::Overcast),
            _ => Err(WeatherError::UnknownWeather(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_name() {
        assert_eq!(classify("rain_heavy_01"), Some(EffectCategory::Rain));
        assert_eq!(classify("snow_field"), Some(EffectCategory::Snow));
        assert_eq!(classify("ambient_mist"), Some(EffectCategory::Fog));
        assert_eq!(classify("leaf_pile"), Some(EffectCategory::Leaves));
        assert_eq!(classify("unnamed_box"), None);
    }

    #[test]
    fn classification_ignores_case_and_padding() {
        assert_eq!(classify("  DUST_Storm "), Some(EffectCategory::Dust));
        assert_eq!(classify("Folhas.001"), Some(EffectCategory::Leaves));
        assert_eq!(classify("chuva_forte"), Some(EffectCategory::Rain));
    }

    #[test]
    fn snow_is_checked_before_rain() {
        // Both keywords present: the earlier table entry wins.
        assert_eq!(
            classify_with_keyword("rain_to_snow"),
            Some((EffectCategory::Snow, "snow"))
        );
        assert_eq!(classify("foggy_rain"), Some(EffectCategory::Rain));
    }

    #[test]
    fn weather_tags_parse_with_aliases() {
        assert_eq!("rainy".parse::<WeatherCategory>().unwrap(), WeatherCategory::Rainy);
        assert_eq!("Ensolarado".parse::<WeatherCategory>().unwrap(), WeatherCategory::Clear);
        assert_eq!("seco".parse::<WeatherCategory>().unwrap(), WeatherCategory::Dry);
        assert!(matches!(
            "hail".parse::<WeatherCategory>(),
            Err(WeatherError::UnknownWeather(_))
        ));
        for w in WeatherCategory::ALL {
            assert_eq!(w.tag().parse::<WeatherCategory>().unwrap(), w);
        }
    }

    #[test]
    fn required_effect_table() {
        assert_eq!(WeatherCategory::Dry.required_effects(), &[EffectCategory::Dust, EffectCategory::Leaves]);
        assert!(WeatherCategory::Clear.requires(EffectCategory::Leaves));
        assert!(!WeatherCategory::Overcast.requires(EffectCategory::Rain));
        assert!(WeatherCategory::Snowy.is_precipitation());
        assert!(!WeatherCategory::Dry.is_precipitation());
    }
}
