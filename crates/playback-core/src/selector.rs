//! Output selection and fallback.
//!
//! Every call runs a fresh discovery+resolve cycle; the selector caches
//! nothing, so callers needing a long-lived active output hold the returned
//! handle themselves. An empty discovery is never an error: every path
//! degrades to [`NullOutput`], so playback logic never null-checks an
//! output.
//!
//! Resolution order for [`OutputSelector::selected`]: persisted preference
//! name, then the platform default output name, then the first candidate in
//! case-insensitive sorted order.

use std::sync::Arc;

use crate::discovery::{OutputDiscovery, OwnedOutput, SharedOutput};
use crate::null::NullOutput;
use crate::prefs::{OUTPUT_PLUGIN_KEY, PLAYBACK_SCOPE, PreferenceStore};

#[cfg(target_os = "windows")]
pub const DEFAULT_OUTPUT_NAME: &str = "WASAPI";
#[cfg(target_os = "macos")]
pub const DEFAULT_OUTPUT_NAME: &str = "CoreAudio";
#[cfg(any(
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
pub const DEFAULT_OUTPUT_NAME: &str = "sndio";
#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
pub const DEFAULT_OUTPUT_NAME: &str = "PulseAudio";

/// Resolves which output implementation gets the buffers.
pub struct OutputSelector {
    discovery: Arc<dyn OutputDiscovery>,
    prefs: Arc<dyn PreferenceStore>,
}

impl OutputSelector {
    pub fn new(discovery: Arc<dyn OutputDiscovery>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { discovery, prefs }
    }

    /// All discovered outputs as shared handles, sorted by case-insensitive
    /// name ascending. Ordering is deterministic for reproducible listings.
    pub fn all(&self) -> Vec<SharedOutput> {
        let mut outputs = self.discovery.query_shared();
        outputs.sort_by_key(|output| output.name().to_lowercase());
        outputs
    }

    pub fn count(&self) -> usize {
        self.all().len()
    }

    /// Take exclusive ownership of the output at `index` in sorted order.
    ///
    /// Every sibling discovered alongside it is dropped before this returns.
    /// An empty discovery (or an out-of-range index) degrades to
    /// [`NullOutput`], which the caller owns like any other result.
    pub fn owned_by_index(&self, index: usize) -> OwnedOutput {
        let mut outputs = self.sorted_owned();
        if index >= outputs.len() {
            return Box::new(NullOutput::default());
        }
        let selected = outputs.swap_remove(index);
        drop(outputs);
        selected
    }

    /// Take exclusive ownership of the output with exactly this name.
    /// Siblings are dropped before returning; no match degrades to
    /// [`NullOutput`].
    pub fn owned_by_name(&self, name: &str) -> OwnedOutput {
        let mut outputs = self.sorted_owned();
        match outputs.iter().position(|output| output.name() == name) {
            Some(index) => {
                let selected = outputs.swap_remove(index);
                drop(outputs);
                selected
            }
            None => Box::new(NullOutput::default()),
        }
    }

    /// Take exclusive ownership of the preferred output, falling back to the
    /// first candidate in sorted order when the preference is missing or
    /// unmatched. [`NullOutput`] only when discovery yields nothing.
    pub fn owned_selected(&self) -> OwnedOutput {
        let mut outputs = self.sorted_owned();
        if outputs.is_empty() {
            return Box::new(NullOutput::default());
        }
        let preferred = self.preferred_name();
        let index = if preferred.is_empty() {
            0
        } else {
            outputs
                .iter()
                .position(|output| output.name() == preferred)
                .unwrap_or(0)
        };
        let selected = outputs.swap_remove(index);
        drop(outputs);
        selected
    }

    /// Resolve the active output as a shared handle: persisted preference,
    /// then platform default, then first in sorted order. [`NullOutput`]
    /// only when discovery yields nothing.
    pub fn selected(&self) -> SharedOutput {
        let outputs = self.all();
        if outputs.is_empty() {
            return Arc::new(NullOutput::default());
        }

        let preferred = self.preferred_name();
        if let Some(output) = find_by_name(&outputs, &preferred) {
            return output;
        }

        if let Some(output) = find_by_name(&outputs, DEFAULT_OUTPUT_NAME) {
            tracing::debug!(
                preferred = %preferred,
                default = DEFAULT_OUTPUT_NAME,
                "preferred output unmatched, using platform default"
            );
            return output;
        }

        tracing::debug!(output = %outputs[0].name(), "using first discovered output");
        outputs[0].clone()
    }

    /// Persist `name` as the preferred output. Idempotent; last-write-wins.
    /// Selecting a name no discovery ever yields is not an error; later
    /// resolution falls through to the default tiers.
    pub fn select(&self, name: &str) {
        self.prefs.set_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY, name);
        tracing::info!(output = %name, "output preference saved");
    }

    fn sorted_owned(&self) -> Vec<OwnedOutput> {
        let mut outputs = self.discovery.query_owned();
        outputs.sort_by_key(|output| output.name().to_lowercase());
        outputs
    }

    fn preferred_name(&self) -> String {
        self.prefs
            .get_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY)
            .unwrap_or_default()
    }
}

/// Exact-name lookup; an empty name never matches.
fn find_by_name(outputs: &[SharedOutput], name: &str) -> Option<SharedOutput> {
    if name.is_empty() {
        return None;
    }
    outputs.iter().find(|output| output.name() == name).cloned()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::buffer::SampleBuffer;
    use crate::output::{AudioOutput, BufferProvider, Device, OutputState};
    use crate::prefs::MemoryPreferences;

    struct FakeOutput {
        name: &'static str,
        dropped: Arc<AtomicUsize>,
    }

    impl Drop for FakeOutput {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl AudioOutput for FakeOutput {
        fn name(&self) -> &str {
            self.name
        }

        fn play(&self, _b: &SampleBuffer<'_>, _p: &dyn BufferProvider) -> OutputState {
            OutputState::BufferWritten
        }

        fn pause(&self) {}
        fn resume(&self) {}
        fn stop(&self) {}
        fn drain(&self) {}
        fn set_volume(&self, _volume: f64) {}

        fn volume(&self) -> f64 {
            1.0
        }

        fn latency(&self) -> f64 {
            0.0
        }

        fn default_sample_rate(&self) -> i32 {
            48_000
        }

        fn device_list(&self) -> Option<Vec<Device>> {
            None
        }

        fn default_device(&self) -> Option<Device> {
            None
        }

        fn set_default_device(&self, _device_id: &str) -> bool {
            false
        }
    }

    /// Yields a fresh set of instances per query; every drop is counted so
    /// tests can verify unselected siblings were released.
    struct FakeDiscovery {
        names: Vec<&'static str>,
        dropped: Arc<AtomicUsize>,
    }

    impl OutputDiscovery for FakeDiscovery {
        fn query_shared(&self) -> Vec<SharedOutput> {
            self.names
                .iter()
                .copied()
                .map(|name| {
                    Arc::new(FakeOutput {
                        name,
                        dropped: self.dropped.clone(),
                    }) as SharedOutput
                })
                .collect()
        }

        fn query_owned(&self) -> Vec<OwnedOutput> {
            self.names
                .iter()
                .copied()
                .map(|name| {
                    Box::new(FakeOutput {
                        name,
                        dropped: self.dropped.clone(),
                    }) as OwnedOutput
                })
                .collect()
        }
    }

    fn selector_for(
        names: &[&'static str],
    ) -> (OutputSelector, Arc<AtomicUsize>, Arc<MemoryPreferences>) {
        let dropped = Arc::new(AtomicUsize::new(0));
        let prefs = Arc::new(MemoryPreferences::default());
        let selector = OutputSelector::new(
            Arc::new(FakeDiscovery {
                names: names.to_vec(),
                dropped: dropped.clone(),
            }),
            prefs.clone(),
        );
        (selector, dropped, prefs)
    }

    #[test]
    fn all_sorts_case_insensitively() {
        let (selector, _, _) = selector_for(&["gamma", "Alpha", "beta"]);
        let outputs = selector.all();
        let names: Vec<&str> = outputs.iter().map(|o| o.name()).collect();
        assert_eq!(names, ["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn count_matches_discovery() {
        let (selector, _, _) = selector_for(&["a", "b", "c"]);
        assert_eq!(selector.count(), 3);
        let (empty, _, _) = selector_for(&[]);
        assert_eq!(empty.count(), 0);
    }

    #[test]
    fn shared_handles_release_on_drop() {
        let (selector, dropped, _) = selector_for(&["a", "b"]);
        let outputs = selector.all();
        assert_eq!(dropped.load(Ordering::SeqCst), 0);
        drop(outputs);
        assert_eq!(dropped.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn owned_by_index_releases_siblings() {
        let (selector, dropped, _) = selector_for(&["gamma", "Alpha", "beta"]);
        let selected = selector.owned_by_index(1);
        assert_eq!(selected.name(), "beta");
        assert_eq!(dropped.load(Ordering::SeqCst), 2);
        drop(selected);
        assert_eq!(dropped.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn owned_by_index_empty_degrades_to_null() {
        let (selector, _, _) = selector_for(&[]);
        assert_eq!(selector.owned_by_index(0).name(), "NoOutput");
    }

    #[test]
    fn owned_by_index_out_of_range_degrades_to_null() {
        let (selector, dropped, _) = selector_for(&["a", "b"]);
        assert_eq!(selector.owned_by_index(5).name(), "NoOutput");
        assert_eq!(dropped.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn owned_by_name_takes_exact_match() {
        let (selector, dropped, _) = selector_for(&["Alpha", "beta"]);
        let selected = selector.owned_by_name("beta");
        assert_eq!(selected.name(), "beta");
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn owned_by_name_is_case_sensitive() {
        let (selector, dropped, _) = selector_for(&["Alpha"]);
        assert_eq!(selector.owned_by_name("alpha").name(), "NoOutput");
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn owned_selected_prefers_saved_name() {
        let (selector, dropped, prefs) = selector_for(&["X", "Y"]);
        prefs.set_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY, "Y");
        let selected = selector.owned_selected();
        assert_eq!(selected.name(), "Y");
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn owned_selected_falls_back_to_first_sorted() {
        let (selector, _, prefs) = selector_for(&["B", "A"]);
        prefs.set_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY, "missing");
        assert_eq!(selector.owned_selected().name(), "A");
    }

    #[test]
    fn owned_selected_empty_degrades_to_null() {
        let (selector, _, _) = selector_for(&[]);
        assert_eq!(selector.owned_selected().name(), "NoOutput");
    }

    #[test]
    fn selected_prefers_saved_name() {
        let (selector, _, prefs) = selector_for(&["X", "Y"]);
        prefs.set_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY, "X");
        assert_eq!(selector.selected().name(), "X");
    }

    #[test]
    fn selected_falls_back_to_platform_default() {
        let (selector, _, prefs) = selector_for(&["Y", DEFAULT_OUTPUT_NAME]);
        prefs.set_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY, "Z");
        assert_eq!(selector.selected().name(), DEFAULT_OUTPUT_NAME);
    }

    #[test]
    fn selected_falls_back_to_first_sorted() {
        let (selector, _, _) = selector_for(&["B", "A"]);
        assert_eq!(selector.selected().name(), "A");
    }

    #[test]
    fn selected_empty_degrades_to_null() {
        let (selector, _, _) = selector_for(&[]);
        assert_eq!(selector.selected().name(), "NoOutput");
    }

    #[test]
    fn select_persists_name() {
        let (selector, _, prefs) = selector_for(&["A"]);
        selector.select("A");
        assert_eq!(
            prefs.get_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY).as_deref(),
            Some("A")
        );
        selector.select("A");
        assert_eq!(
            prefs.get_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY).as_deref(),
            Some("A")
        );
    }
}
