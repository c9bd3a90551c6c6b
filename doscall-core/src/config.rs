//! Emulator configuration assembly and patch merging.
//!
//! Configuration is an ordered section -> key -> value mapping mirroring the
//! emulator's own descriptor format. Known sections get typed accessors
//! (mount table, timeout); unknown sections pass through to the descriptor
//! verbatim, which is what lets callers tune emulator settings this crate
//! has no opinion about.

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::locale;
use crate::mount::{DriveMount, MountTable};
use crate::CallContext;

/// Nested section -> key -> value patch.
pub type ConfigPatch = IndexMap<String, IndexMap<String, String>>;

/// Section holding the drive mounts.
pub const MOUNT_SECTION: &str = "mount";
/// Section holding guest environment variables.
pub const ENVIRONMENT_SECTION: &str = "environment";
/// Section holding execution limits.
pub const EXECUTION_SECTION: &str = "execution";
/// Startup section synthesized by the executor, never stored here.
pub const AUTOEXEC_SECTION: &str = "autoexec";

/// Wall-clock timeout applied when `execution.timeout` is absent or invalid.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Ordered emulator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmConfig {
    sections: IndexMap<String, IndexMap<String, String>>,
}

impl VmConfig {
    /// Empty configuration with no sections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic default configuration for one call: headless display,
    /// fixed machine/CPU profile, locale-derived country/keyboard/codepage,
    /// primary drive on the context cwd and secondary drive on the tool
    /// root (explicit override > `TOOL_ROOT_DIR` > cwd).
    pub fn defaults(ctx: &CallContext) -> Self {
        let mut config = Self::new();

        config.set("sdl", "fullscreen", "false");
        config.set("sdl", "vsync", "false");
        config.set("render", "aspect", "false");

        let locale = locale::dos_locale_for(ctx.locale.as_deref());
        config.set("dosbox", "machine", "svga_s3");
        config.set("dosbox", "country", locale.country);
        config.set("dosbox", "keyboardlayout", locale.keyboard);
        config.set("dosbox", "codepage", locale.codepage);

        config.set("cpu", "cycles", "20000");

        let primary = ctx.cwd.display().to_string();
        let tools = ctx
            .tool_root
            .as_ref()
            .map(|root| root.display().to_string())
            .unwrap_or_else(|| primary.clone());
        config.set(MOUNT_SECTION, "c", primary);
        config.set(MOUNT_SECTION, "d", tools);

        config.set("output", "capture_stdout", "true");
        config.set("output", "output_directory", ".");

        config.set(EXECUTION_SECTION, "timeout", DEFAULT_TIMEOUT_SECS.to_string());

        config
    }

    /// Set one value, creating the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    /// Shallow-merge a nested patch: missing sections are created, existing
    /// keys are overwritten (last write wins per leaf key), untouched keys
    /// are kept. No semantic validation happens here; applying the same
    /// patch twice is a no-op the second time.
    pub fn apply_patch(&mut self, patch: &ConfigPatch) {
        for (section, entries) in patch {
            tracing::debug!(section = %section, keys = entries.len(), "applying config patch");
            for (key, value) in entries {
                self.set(section, key, value.clone());
            }
        }
    }

    /// Sections in declaration order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &IndexMap<String, String>)> {
        self.sections
            .iter()
            .map(|(name, entries)| (name.as_str(), entries))
    }

    /// Typed view of the `[mount]` section in declaration order. Keys that
    /// are not a single ASCII letter are skipped with a warning.
    pub fn mount_table(&self) -> MountTable {
        let mut mounts = Vec::new();
        if let Some(entries) = self.sections.get(MOUNT_SECTION) {
            for (key, dir) in entries {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) if letter.is_ascii_alphabetic() => {
                        mounts.push(DriveMount {
                            letter,
                            host_dir: PathBuf::from(dir),
                        });
                    }
                    _ => tracing::warn!(key = %key, "ignoring non-letter mount key"),
                }
            }
        }
        MountTable::new(mounts)
    }

    /// Guest environment variables from `[environment]`, if any.
    pub fn environment(&self) -> IndexMap<String, String> {
        self.sections
            .get(ENVIRONMENT_SECTION)
            .cloned()
            .unwrap_or_default()
    }

    /// Wall-clock timeout from `execution.timeout`; must be a positive
    /// integer number of seconds, otherwise the fixed default applies.
    pub fn timeout_secs(&self) -> u64 {
        self.get(EXECUTION_SECTION, "timeout")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context() -> CallContext {
        CallContext {
            cwd: PathBuf::from("/work"),
            tool_root: Some(PathBuf::from("/tools")),
            locale: Some("en_US".to_string()),
            emulator_path: PathBuf::from("dosbox"),
        }
    }

    fn patch(section: &str, key: &str, value: &str) -> ConfigPatch {
        let mut entries = IndexMap::new();
        entries.insert(key.to_string(), value.to_string());
        let mut patch = ConfigPatch::new();
        patch.insert(section.to_string(), entries);
        patch
    }

    #[test]
    fn test_default_config_sections() {
        let config = VmConfig::defaults(&test_context());

        assert_eq!(config.get("sdl", "fullscreen"), Some("false"));
        assert_eq!(config.get("dosbox", "machine"), Some("svga_s3"));
        assert_eq!(config.get("dosbox", "codepage"), Some("437"));
        assert_eq!(config.get("cpu", "cycles"), Some("20000"));
        assert_eq!(config.get(MOUNT_SECTION, "c"), Some("/work"));
        assert_eq!(config.get(MOUNT_SECTION, "d"), Some("/tools"));
        assert_eq!(config.timeout_secs(), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_tool_root_falls_back_to_cwd() {
        let mut ctx = test_context();
        ctx.tool_root = None;
        let config = VmConfig::defaults(&ctx);
        assert_eq!(config.get(MOUNT_SECTION, "d"), Some("/work"));
    }

    #[test]
    fn test_patch_creates_sections_and_overwrites() {
        let mut config = VmConfig::defaults(&test_context());
        config.apply_patch(&patch("dosbox", "memsize", "32"));
        config.apply_patch(&patch("cpu", "cycles", "30000"));

        assert_eq!(config.get("dosbox", "memsize"), Some("32"));
        assert_eq!(config.get("cpu", "cycles"), Some("30000"));
        // Untouched keys survive the merge.
        assert_eq!(config.get("dosbox", "machine"), Some("svga_s3"));
    }

    #[test]
    fn test_patch_is_idempotent() {
        let mut once = VmConfig::defaults(&test_context());
        let p = patch("execution", "timeout", "60");
        once.apply_patch(&p);
        let mut twice = once.clone();
        twice.apply_patch(&p);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_independent_writes_commute() {
        let a = patch("dosbox", "memsize", "32");
        let b = patch("cpu", "cycles", "30000");

        let mut ab = VmConfig::defaults(&test_context());
        ab.apply_patch(&a);
        ab.apply_patch(&b);

        let mut ba = VmConfig::defaults(&test_context());
        ba.apply_patch(&b);
        ba.apply_patch(&a);

        assert_eq!(ab.get("dosbox", "memsize"), ba.get("dosbox", "memsize"));
        assert_eq!(ab.get("cpu", "cycles"), ba.get("cpu", "cycles"));
    }

    #[test]
    fn test_timeout_parsing() {
        let mut config = VmConfig::defaults(&test_context());
        config.set(EXECUTION_SECTION, "timeout", "42");
        assert_eq!(config.timeout_secs(), 42);

        config.set(EXECUTION_SECTION, "timeout", "0");
        assert_eq!(config.timeout_secs(), DEFAULT_TIMEOUT_SECS);

        config.set(EXECUTION_SECTION, "timeout", "soon");
        assert_eq!(config.timeout_secs(), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_mount_table_order_and_filtering() {
        let mut config = VmConfig::defaults(&test_context());
        config.set(MOUNT_SECTION, "cd", "/bogus");
        let table = config.mount_table();
        let letters: Vec<char> = table.mounts().iter().map(|m| m.letter).collect();
        assert_eq!(letters, vec!['c', 'd']);
    }
}
