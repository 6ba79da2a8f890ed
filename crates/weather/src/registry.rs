//! Effect registry: owns every effect instance and groups them by category.

use crate::{classify_with_keyword, EffectCategory};
use engine_core::SceneLookup;
use fx::{EffectInstance, FrameContext};
use std::collections::BTreeMap;

/// Index of an instance inside its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub usize);

/// What one scan pass found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub classified: usize,
    pub unclassified: usize,
    /// Classified instances whose start-active request was overridden.
    pub overridden: usize,
}

/// Registered instances and the category → instance map.
///
/// Classified instances are started inactive; from then on the weather
/// controller is the only thing that activates them. Unclassified instances
/// are kept (and updated) but follow their own start-active request.
#[derive(Default)]
pub struct EffectRegistry {
    instances: Vec<EffectInstance>,
    categories: Vec<Option<EffectCategory>>,
    by_category: BTreeMap<EffectCategory, Vec<InstanceId>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register and initialize `instances`. Additive: earlier entries keep their ids.
    pub fn scan(
        &mut self,
        instances: impl IntoIterator<Item = EffectInstance>,
        ctx: &mut FrameContext<'_>,
    ) -> ScanSummary {
        let mut summary = ScanSummary::default();

        for mut instance in instances {
            let id = InstanceId(self.instances.len());
            let classification = classify_with_keyword(instance.name());

            match classification {
                Some((category, keyword)) => {
                    log::debug!("{} -> {} (keyword '{}')", instance.name(), category, keyword);
                    instance.initialize(ctx);
                    if instance.take_auto_activate() {
                        log::debug!("{}: start-active request overridden by weather", instance.name());
                        summary.overridden += 1;
                    }
                    instance.deactivate_system(ctx);
                    self.by_category.entry(category).or_default().push(id);
                    summary.classified += 1;
                }
                None => {
                    log::debug!("{} -> not classified, left to its own settings", instance.name());
                    if let Err(e) = instance.awake(ctx) {
                        log::warn!("{}", e);
                    }
                    summary.unclassified += 1;
                }
            }

            self.instances.push(instance);
            self.categories.push(classification.map(|(c, _)| c));
        }

        log::info!(
            "Effect scan: {} classified, {} unclassified, categories {:?}",
            summary.classified,
            summary.unclassified,
            self.by_category.keys().map(|c| c.label()).collect::<Vec<_>>()
        );
        summary
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, id: InstanceId) -> Option<&EffectInstance> {
        self.instances.get(id.0)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut EffectInstance> {
        self.instances.get_mut(id.0)
    }

    pub fn find(&self, name: &str) -> Option<InstanceId> {
        self.instances
            .iter()
            .position(|i| i.name() == name)
            .map(InstanceId)
    }

    pub fn category_of(&self, id: InstanceId) -> Option<EffectCategory> {
        self.categories.get(id.0).copied().flatten()
    }

    /// Instances registered under `category`, in scan order.
    pub fn instances_of(&self, category: EffectCategory) -> &[InstanceId] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count(&self, category: EffectCategory) -> usize {
        self.instances_of(category).len()
    }

    /// Categories with at least one instance.
    pub fn categories(&self) -> impl Iterator<Item = EffectCategory> + '_ {
        self.by_category.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &EffectInstance)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, inst)| (InstanceId(i), inst))
    }

    /// Activate every instance of `category`. Failures stay local to the
    /// failing instance. Returns how many instances changed state.
    pub fn activate_category(&mut self, category: EffectCategory, ctx: &mut FrameContext<'_>) -> usize {
        let Some(ids) = self.by_category.get(&category) else {
            return 0;
        };
        let mut changed = 0;
        for id in ids {
            let Some(instance) = self.instances.get_mut(id.0) else {
                continue;
            };
            if instance.is_active() {
                continue;
            }
            match instance.activate_system(ctx) {
                Ok(()) => {
                    log::debug!("Activated {} ({})", instance.name(), category);
                    changed += 1;
                }
                Err(e) => log::warn!("Could not activate {}: {}", instance.name(), e),
            }
        }
        changed
    }

    /// Deactivate every instance of `category`. Returns how many changed state.
    pub fn deactivate_category(&mut self, category: EffectCategory, ctx: &mut FrameContext<'_>) -> usize {
        let Some(ids) = self.by_category.get(&category) else {
            return 0;
        };
        let mut changed = 0;
        for id in ids {
            let Some(instance) = self.instances.get_mut(id.0) else {
                continue;
            };
            if instance.is_active() {
                instance.deactivate_system(ctx);
                log::debug!("Deactivated {} ({})", instance.name(), category);
                changed += 1;
            }
        }
        changed
    }

    /// Per-frame update of every instance, classified or not.
    pub fn update_all(&mut self, ctx: &mut FrameContext<'_>) {
        for instance in &mut self.instances {
            instance.update(ctx);
        }
    }

    /// Push this frame's particle vertices to each active instance's renderer.
    pub fn submit_all(&mut self, time: f32, scene: &dyn SceneLookup) {
        for instance in &mut self.instances {
            instance.submit_vertices(time, scene);
        }
    }

    /// Names of the active instances.
    pub fn active_names(&self) -> Vec<&str> {
        self.instances
            .iter()
            .filter(|i| i.is_active())
            .map(|i| i.name())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audio::RecordingAudio;
    use engine_core::Scene;
    use fx::{EffectParameters, HeadlessRenderer, LifecycleState};

    fn emitter(name: &str, start_active: bool) -> EffectInstance {
        let params = EffectParameters {
            activate_on_start: start_active,
            ..Default::default()
        };
        EffectInstance::new(name, params, Box::new(HeadlessRenderer::new()))
    }

    #[test]
    fn scan_groups_by_category() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let mut reg = EffectRegistry::new();

        let summary = reg.scan(
            vec![
                emitter("rain_heavy_01", false),
                emitter("snow_field", false),
                emitter("ambient_mist", false),
                emitter("leaf_pile", false),
                emitter("unnamed_box", false),
                emitter("rain_light_02", false),
            ],
            &mut ctx,
        );

        assert_eq!(summary.classified, 5);
        assert_eq!(summary.unclassified, 1);
        assert_eq!(reg.len(), 6);
        assert_eq!(reg.instances_of(EffectCategory::Rain), &[InstanceId(0), InstanceId(5)]);
        assert_eq!(reg.count(EffectCategory::Snow), 1);
        assert_eq!(reg.count(EffectCategory::Fog), 1);
        assert_eq!(reg.count(EffectCategory::Leaves), 1);
        assert_eq!(reg.count(EffectCategory::Dust), 0);
        let box_id = reg.find("unnamed_box").unwrap();
        assert_eq!(reg.category_of(box_id), None);
        assert!(!reg.categories().any(|c| reg.instances_of(c).contains(&box_id)));
    }

    #[test]
    fn scan_overrides_start_active_for_classified_only() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let mut reg = EffectRegistry::new();

        let summary = reg.scan(vec![emitter("dust_devil", true), emitter("campfire", true)], &mut ctx);
        assert_eq!(summary.overridden, 1);

        let dust = reg.get(reg.find("dust_devil").unwrap()).unwrap();
        assert_eq!(dust.state(), LifecycleState::Inactive);
        assert!(!dust.auto_activate());

        let campfire = reg.get(reg.find("campfire").unwrap()).unwrap();
        assert!(campfire.is_active());
    }

    #[test]
    fn rescan_is_additive() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let mut reg = EffectRegistry::new();

        reg.scan(vec![emitter("fog_a", false)], &mut ctx);
        reg.scan(vec![emitter("fog_b", false)], &mut ctx);
        assert_eq!(reg.instances_of(EffectCategory::Fog), &[InstanceId(0), InstanceId(1)]);
    }

    #[test]
    fn category_toggles_report_changes() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let mut reg = EffectRegistry::new();
        reg.scan(vec![emitter("rain_a", false), emitter("rain_b", false)], &mut ctx);

        assert_eq!(reg.activate_category(EffectCategory::Rain, &mut ctx), 2);
        assert_eq!(reg.activate_category(EffectCategory::Rain, &mut ctx), 0);
        assert_eq!(reg.active_names(), vec!["rain_a", "rain_b"]);
        assert_eq!(reg.deactivate_category(EffectCategory::Rain, &mut ctx), 2);
        assert_eq!(reg.deactivate_category(EffectCategory::Snow, &mut ctx), 0);
        assert!(reg.active_names().is_empty());
    }

    #[test]
    fn failed_activation_does_not_block_siblings() {
        let scene = Scene::new();
        let mut audio = RecordingAudio::new();
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: &mut audio };
        let mut reg = EffectRegistry::new();
        let broken = EffectInstance::new(
            "rain_broken",
            EffectParameters::default(),
            Box::new(HeadlessRenderer::failing()),
        );
        reg.scan(vec![broken, emitter("rain_ok", false)], &mut ctx);

        assert_eq!(reg.activate_category(EffectCategory::Rain, &mut ctx), 1);
        assert_eq!(reg.active_names(), vec!["rain_ok"]);
    }
}
