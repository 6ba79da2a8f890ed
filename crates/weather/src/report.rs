use crate::{EffectCategory, WeatherCategory};
use std::fmt;

/// Snapshot of the weather controller for the periodic debug log.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub current: WeatherCategory,
    pub next: WeatherCategory,
    pub timer: f32,
    pub duration: f32,
    pub remaining: f32,
    /// Display probabilities in percent, summing to 100.
    pub probabilities: [(WeatherCategory, f32); 5],
    /// Each effect category the current weather needs, with its instance count.
    pub required: Vec<(EffectCategory, usize)>,
}

impl WeatherReport {
    /// Required categories with no registered instance.
    pub fn missing(&self) -> impl Iterator<Item = EffectCategory> + '_ {
        self.required
            .iter()
            .filter(|(_, count)| *count == 0)
            .map(|(c, _)| *c)
    }
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Weather: {} (next: {})", self.current, self.next)?;
        writeln!(f, "  Timer: {:.1}s / {:.1}s", self.timer, self.duration)?;
        writeln!(
            f,
            "  Remaining: {:.1}min ({:.0}s)",
            self.remaining / 60.0,
            self.remaining
        )?;
        writeln!(f, "  Probabilities:")?;
        for (weather, p) in &self.probabilities {
            let marker = if *weather == self.next { " <- next" } else { "" };
            writeln!(f, "    {:<9}{:>5.1}%{}", weather.tag(), p, marker)?;
        }
        write!(f, "  Effects:")?;
        for (category, count) in &self.required {
            if *count > 0 {
                write!(f, "\n    {:<7}found ({} systems)", category.label(), count)?;
            } else {
                write!(f, "\n    {:<7}not found", category.label())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_marks_next_and_missing() {
        let report = WeatherReport {
            current: WeatherCategory::Dry,
            next: WeatherCategory::Rainy,
            timer: 3.0,
            duration: 9.0,
            remaining: 6.0,
            probabilities: [
                (WeatherCategory::Rainy, 15.0),
                (WeatherCategory::Snowy, 30.0),
                (WeatherCategory::Clear, 18.3),
                (WeatherCategory::Dry, 18.3),
                (WeatherCategory::Overcast, 18.3),
            ],
            required: vec![(EffectCategory::Dust, 2), (EffectCategory::Leaves, 0)],
        };
        let text = report.to_string();
        assert!(text.contains("rainy     15.0% <- next"));
        assert!(text.contains("dust   found (2 systems)"));
        assert!(text.contains("leaves not found"));
        assert_eq!(report.missing().collect::<Vec<_>>(), vec![EffectCategory::Leaves]);
    }
}
