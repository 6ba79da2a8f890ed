//! Weather state machine.
//!
//! Holds the current and pre-drawn next weather plus a countdown. When the
//! countdown runs out the machine switches to the next weather, turning off
//! the effect categories the old weather needed and the new one does not,
//! then turning on the new weather's categories.

use crate::{EffectCategory, EffectRegistry, WeatherCategory, WeatherConfig, WeatherReport};
use fx::FrameContext;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Percent chances of the precipitation weathers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chances {
    pub rain: f32,
    pub snow: f32,
}

impl From<&WeatherConfig> for Chances {
    fn from(c: &WeatherConfig) -> Self {
        Self {
            rain: c.chance_rain,
            snow: c.chance_snow,
        }
    }
}

/// Draw the next weather: precipitation by its chance, otherwise one of the
/// three dry-sky weathers with equal odds.
pub fn choose_next<R: Rng + ?Sized>(chances: Chances, rng: &mut R) -> WeatherCategory {
    let precipitation = chances.rain + chances.snow;
    let r = rng.gen::<f32>() * 100.0;
    if r < precipitation {
        if r < chances.rain {
            WeatherCategory::Rainy
        } else {
            WeatherCategory::Snowy
        }
    } else {
        let options = WeatherCategory::NON_PRECIPITATION;
        options[rng.gen_range(0..options.len())]
    }
}

/// Display probabilities (percent) in [`WeatherCategory::ALL`] order.
/// Whatever precipitation leaves is split evenly over the other three, and
/// any shortfall from 100 is spread evenly over all five.
pub fn probabilities(chances: Chances) -> [(WeatherCategory, f32); 5] {
    let rest = (100.0 - (chances.rain + chances.snow)).max(0.0) / 3.0;
    let mut table = WeatherCategory::ALL.map(|w| {
        let p = match w {
            WeatherCategory::Rainy => chances.rain,
            WeatherCategory::Snowy => chances.snow,
            _ => rest,
        };
        (w, p)
    });
    let total: f32 = table.iter().map(|(_, p)| p).sum();
    let adjust = (100.0 - total) / table.len() as f32;
    for (_, p) in &mut table {
        *p += adjust;
    }
    table
}

/// State the controller keeps on its owning object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedWeather {
    pub weather: WeatherCategory,
    pub active: bool,
}

pub struct WeatherStateMachine {
    registry: EffectRegistry,
    config: WeatherConfig,
    rng: StdRng,
    current: WeatherCategory,
    next: WeatherCategory,
    timer: f32,
    duration: f32,
    active: bool,
    since_report: f32,
    transitions: u32,
}

impl WeatherStateMachine {
    pub fn new(registry: EffectRegistry, config: WeatherConfig) -> Self {
        Self::with_rng(registry, config, StdRng::from_entropy())
    }

    /// Machine with a caller-supplied random source, for reproducible runs.
    pub fn with_rng(registry: EffectRegistry, config: WeatherConfig, mut rng: StdRng) -> Self {
        let config = config.sanitized();
        let duration = draw_duration(&config, &mut rng);
        let current = config.initial_weather;
        let next = choose_next(Chances::from(&config), &mut rng);
        Self {
            registry,
            active: config.active,
            config,
            rng,
            current,
            next,
            timer: 0.0,
            duration,
            since_report: 0.0,
            transitions: 0,
        }
    }

    /// Apply `initial` to the registry and draw the first successor.
    pub fn start(&mut self, initial: WeatherCategory, ctx: &mut FrameContext<'_>) {
        let (min, max) = self.config.duration_range_secs();
        log::info!(
            "Weather starting: {} (duration {:.1}-{:.1} min, active: {})",
            initial,
            min / 60.0,
            max / 60.0,
            self.active
        );
        self.set_initial(initial, ctx);
        self.next = self.draw_next();
        self.since_report = 0.0;
        if self.config.debug_report {
            log::info!("{}", self.report());
        }
    }

    /// Make exactly the categories `weather` needs active. Does not touch the timer.
    pub fn set_initial(&mut self, weather: WeatherCategory, ctx: &mut FrameContext<'_>) {
        let registered: Vec<EffectCategory> = self.registry.categories().collect();
        for category in registered.iter().filter(|c| !weather.requires(**c)) {
            self.registry.deactivate_category(*category, ctx);
        }
        for category in weather.required_effects() {
            self.registry.activate_category(*category, ctx);
        }
        self.current = weather;
        log::info!("Initial weather: {}", weather);
    }

    /// Switch to `weather`. Returns false (and does nothing) if it is already current.
    pub fn transition_to(&mut self, weather: WeatherCategory, ctx: &mut FrameContext<'_>) -> bool {
        if weather == self.current {
            return false;
        }
        let previous = self.current;

        for category in previous.required_effects() {
            if !weather.requires(*category) {
                self.registry.deactivate_category(*category, ctx);
            }
        }
        for category in weather.required_effects() {
            self.registry.activate_category(*category, ctx);
        }

        self.current = weather;
        self.timer = 0.0;
        self.duration = self.draw_duration();
        self.next = self.draw_next();
        self.transitions += 1;
        log::info!(
            "Weather changed: {} -> {} (holds {:.1}s, next {})",
            previous,
            weather,
            self.duration,
            self.next
        );
        true
    }

    /// Advance the countdown. Returns true if the weather changed.
    pub fn tick(&mut self, dt: f32, ctx: &mut FrameContext<'_>) -> bool {
        if !self.active {
            return false;
        }
        let dt = dt.max(0.0);
        self.timer += dt;

        if self.config.debug_report {
            self.since_report += dt;
            if self.since_report >= self.config.report_interval {
                self.since_report = 0.0;
                log::info!("{}", self.report());
            }
        }

        if self.timer < self.duration {
            return false;
        }

        log::debug!("Weather timer expired ({:.1}s / {:.1}s)", self.timer, self.duration);
        self.timer = 0.0;
        let next = self.next;
        if next == self.current {
            // Drew the same weather again: hold it for another period.
            self.duration = self.draw_duration();
            self.next = self.draw_next();
            log::info!("Weather holds: {} (next {})", self.current, self.next);
            return false;
        }
        self.transition_to(next, ctx)
    }

    /// One frame: weather first, then every effect instance.
    pub fn frame(&mut self, dt: f32, ctx: &mut FrameContext<'_>) -> bool {
        let changed = self.tick(dt, ctx);
        self.registry.update_all(ctx);
        changed
    }

    pub fn current(&self) -> WeatherCategory {
        self.current
    }

    pub fn next(&self) -> WeatherCategory {
        self.next
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn remaining(&self) -> f32 {
        (self.duration - self.timer).max(0.0)
    }

    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            log::info!("Weather controller {}", if active { "active" } else { "inactive" });
        }
        self.active = active;
    }

    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }

    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EffectRegistry {
        &mut self.registry
    }

    pub fn persisted(&self) -> PersistedWeather {
        PersistedWeather {
            weather: self.current,
            active: self.active,
        }
    }

    pub fn report(&self) -> WeatherReport {
        WeatherReport {
            current: self.current,
            next: self.next,
            timer: self.timer,
            duration: self.duration,
            remaining: self.remaining(),
            probabilities: probabilities(Chances::from(&self.config)),
            required: self
                .current
                .required_effects()
                .iter()
                .map(|c| (*c, self.registry.count(*c)))
                .collect(),
        }
    }

    fn draw_duration(&mut self) -> f32 {
        draw_duration(&self.config, &mut self.rng)
    }

    fn draw_next(&mut self) -> WeatherCategory {
        choose_next(Chances::from(&self.config), &mut self.rng)
    }
}

fn draw_duration(config: &WeatherConfig, rng: &mut StdRng) -> f32 {
    let (min, max) = config.duration_range_secs();
    if max > min {
        rng.gen_range(min..=max)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audio::RecordingAudio;
    use engine_core::Scene;
    use fx::{uniforms, EffectInstance, EffectParameters, HeadlessRenderer, LifecycleStats, ParamValue};

    fn emitter(name: &str) -> EffectInstance {
        EffectInstance::new(name, EffectParameters::default(), Box::new(HeadlessRenderer::new()))
    }

    fn machine(config: WeatherConfig, ctx: &mut FrameContext<'_>) -> WeatherStateMachine {
        let mut registry = EffectRegistry::new();
        registry.scan(
            ["rain_a", "rain_b", "snow_a", "dust_a", "leaves_a", "fog_a", "crate_01"].map(emitter),
            ctx,
        );
        WeatherStateMachine::with_rng(registry, config, StdRng::seed_from_u64(7))
    }

    fn stats(m: &WeatherStateMachine, name: &str) -> LifecycleStats {
        let reg = m.registry();
        reg.get(reg.find(name).unwrap()).unwrap().stats()
    }

    fn total_calls(m: &WeatherStateMachine) -> (u32, u32) {
        m.registry().iter().fold((0, 0), |(a, d), (_, i)| {
            (a + i.stats().activations, d + i.stats().deactivations)
        })
    }

    #[test]
    fn set_initial_activates_exactly_required() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let mut m = machine(WeatherConfig::default(), &mut ctx);

        m.set_initial(WeatherCategory::Rainy, &mut ctx);
        assert_eq!(m.registry().active_names(), vec!["rain_a", "rain_b"]);
        let before = total_calls(&m);

        m.set_initial(WeatherCategory::Rainy, &mut ctx);
        assert_eq!(total_calls(&m), before);
        assert_eq!(m.registry().active_names(), vec!["rain_a", "rain_b"]);
    }

    #[test]
    fn set_initial_turns_off_other_categories() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let mut m = machine(WeatherConfig::default(), &mut ctx);

        m.set_initial(WeatherCategory::Dry, &mut ctx);
        m.set_initial(WeatherCategory::Overcast, &mut ctx);
        assert_eq!(m.registry().active_names(), vec!["fog_a"]);
        assert_eq!(m.current(), WeatherCategory::Overcast);
    }

    #[test]
    fn choose_next_matches_configured_chances() {
        let mut rng = StdRng::seed_from_u64(42);
        let chances = Chances { rain: 15.0, snow: 30.0 };
        let draws = 100_000;
        let mut counts = std::collections::HashMap::new();
        for _ in 0..draws {
            *counts.entry(choose_next(chances, &mut rng)).or_insert(0u32) += 1;
        }
        let freq = |w: WeatherCategory| counts.get(&w).copied().unwrap_or(0) as f64 / draws as f64 * 100.0;
        assert!((freq(WeatherCategory::Rainy) - 15.0).abs() < 0.5);
        assert!((freq(WeatherCategory::Snowy) - 30.0).abs() < 0.5);
        for w in WeatherCategory::NON_PRECIPITATION {
            assert!((freq(w) - 18.333).abs() < 0.5, "{} at {}", w, freq(w));
        }
    }

    #[test]
    fn display_probabilities_sum_to_100() {
        let table = probabilities(Chances { rain: 15.0, snow: 30.0 });
        assert_eq!(table[0], (WeatherCategory::Rainy, 15.0));
        assert_eq!(table[1], (WeatherCategory::Snowy, 30.0));
        assert!((table[2].1 - 18.333).abs() < 1e-3);
        let total: f32 = table.iter().map(|(_, p)| p).sum();
        assert!((total - 100.0).abs() < 1e-3);

        // Over-subscribed precipitation is scaled back evenly across all five.
        let table = probabilities(Chances { rain: 70.0, snow: 40.0 });
        let total: f32 = table.iter().map(|(_, p)| p).sum();
        assert!((total - 100.0).abs() < 1e-3);
        assert!((table[0].1 - 68.0).abs() < 1e-3);
        assert!((table[2].1 + 2.0).abs() < 1e-3);
    }

    #[test]
    fn dry_to_clear_leaves_shared_category_alone() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let mut m = machine(WeatherConfig::default(), &mut ctx);

        m.set_initial(WeatherCategory::Dry, &mut ctx);
        let leaves_before = stats(&m, "leaves_a");
        assert!(m.transition_to(WeatherCategory::Clear, &mut ctx));

        let leaves_after = stats(&m, "leaves_a");
        assert_eq!(leaves_after.activations, leaves_before.activations);
        assert_eq!(leaves_after.deactivations, leaves_before.deactivations);
        assert_eq!(m.registry().active_names(), vec!["leaves_a"]);
        assert_eq!(stats(&m, "dust_a").deactivations, 1);
    }

    #[test]
    fn transition_to_current_is_noop() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let mut m = machine(WeatherConfig::default(), &mut ctx);
        m.set_initial(WeatherCategory::Snowy, &mut ctx);
        let before = total_calls(&m);
        assert!(!m.transition_to(WeatherCategory::Snowy, &mut ctx));
        assert_eq!(total_calls(&m), before);
        assert_eq!(m.transitions(), 0);
    }

    #[test]
    fn timer_crossing_triggers_one_transition() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        // 30 s per weather, and the next weather is always rain.
        let config = WeatherConfig {
            min_duration_minutes: 0.5,
            max_duration_minutes: 0.5,
            chance_rain: 100.0,
            chance_snow: 0.0,
            active: true,
            debug_report: false,
            ..Default::default()
        };
        let mut m = machine(config, &mut ctx);
        m.start(WeatherCategory::Clear, &mut ctx);
        assert_eq!(m.next(), WeatherCategory::Rainy);

        let mut changes = 0;
        for step in 1..=60 {
            if m.tick(0.5, &mut ctx) {
                changes += 1;
                assert_eq!(step, 60);
                assert_eq!(m.timer(), 0.0);
            }
        }
        assert_eq!(changes, 1);
        assert_eq!(m.current(), WeatherCategory::Rainy);
        assert_eq!(m.registry().active_names(), vec!["rain_a", "rain_b"]);

        for _ in 0..20 {
            assert!(!m.tick(0.5, &mut ctx));
        }
        assert_eq!(m.timer(), 10.0);
        assert_eq!(m.remaining(), 20.0);
    }

    #[test]
    fn same_weather_drawn_again_holds() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let config = WeatherConfig {
            min_duration_minutes: 0.5,
            max_duration_minutes: 0.5,
            chance_rain: 100.0,
            chance_snow: 0.0,
            active: true,
            ..Default::default()
        };
        let mut m = machine(config, &mut ctx);
        m.start(WeatherCategory::Rainy, &mut ctx);
        let before = total_calls(&m);

        for _ in 0..60 {
            assert!(!m.tick(0.5, &mut ctx));
        }
        assert_eq!(m.timer(), 0.0);
        assert_eq!(m.transitions(), 0);
        assert_eq!(total_calls(&m), before);
    }

    #[test]
    fn inactive_controller_does_not_tick() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let mut m = machine(WeatherConfig::default(), &mut ctx);
        m.start(WeatherCategory::Clear, &mut ctx);
        for _ in 0..100 {
            m.tick(1.0, &mut ctx);
        }
        assert_eq!(m.timer(), 0.0);
        assert_eq!(m.current(), WeatherCategory::Clear);

        m.set_active(true);
        m.tick(1.0, &mut ctx);
        assert_eq!(m.timer(), 1.0);
        assert_eq!(
            m.persisted(),
            PersistedWeather { weather: WeatherCategory::Clear, active: true }
        );
    }

    #[test]
    fn durations_fall_in_configured_range() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let mut m = machine(WeatherConfig::default(), &mut ctx);
        m.set_initial(WeatherCategory::Clear, &mut ctx);
        for w in [WeatherCategory::Rainy, WeatherCategory::Dry, WeatherCategory::Snowy] {
            m.transition_to(w, &mut ctx);
            assert!((6.0..=12.0).contains(&m.duration()), "{}", m.duration());
            assert_eq!(m.timer(), 0.0);
        }
        assert_eq!(m.transitions(), 3);
    }

    #[test]
    fn report_counts_required_effects() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let mut m = machine(WeatherConfig::default(), &mut ctx);
        m.set_initial(WeatherCategory::Dry, &mut ctx);
        let report = m.report();
        assert_eq!(report.current, WeatherCategory::Dry);
        assert_eq!(report.required, vec![(EffectCategory::Dust, 1), (EffectCategory::Leaves, 1)]);
        assert_eq!(report.remaining, m.duration());
    }

    #[test]
    fn frame_updates_after_transition() {
        let mut scene = Scene::new();
        let _ = scene.spawn_object("marker", engine_core::Transform::default());
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let config = WeatherConfig {
            min_duration_minutes: 0.0,
            max_duration_minutes: 0.0,
            chance_rain: 0.0,
            chance_snow: 100.0,
            active: true,
            debug_report: false,
            ..Default::default()
        };

        let rain_renderer = HeadlessRenderer::new();
        let rain_probe = rain_renderer.probe();
        let snow_renderer = HeadlessRenderer::new();
        let snow_probe = snow_renderer.probe();
        let mut registry = EffectRegistry::new();
        registry.scan(
            vec![
                EffectInstance::new("rain_a", EffectParameters::default(), Box::new(rain_renderer)),
                EffectInstance::new("snow_a", EffectParameters::default(), Box::new(snow_renderer)),
            ],
            &mut ctx,
        );
        let mut m = WeatherStateMachine::with_rng(registry, config, StdRng::seed_from_u64(7));
        m.start(WeatherCategory::Rainy, &mut ctx);
        assert!(rain_probe.borrow().visible);

        // Zero duration: the first frame switches to snow before the update pass.
        ctx.time = 1.0;
        assert!(m.frame(0.016, &mut ctx));
        assert_eq!(m.registry().active_names(), vec!["snow_a"]);
        let rain = m.registry().get(m.registry().find("rain_a").unwrap()).unwrap();
        assert!(!rain.is_active());

        // Rain was switched off before the update pass, so it never saw this frame.
        assert!(!rain_probe.borrow().visible);
        assert!(rain_probe.borrow().parameters.get(uniforms::TIME).is_none());
        assert_eq!(
            snow_probe.borrow().parameters.get(uniforms::TIME),
            Some(&ParamValue::Float(1.0))
        );
    }
}
