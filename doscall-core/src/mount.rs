//! Drive mounts and host<->guest path translation.
//!
//! A mount binds a guest drive letter to a host directory and defines the
//! translation scope for paths crossing the boundary in either direction.
//! Translation fails closed: a token that cannot be mapped is returned
//! unchanged so flag-like and already-guest tokens pass through.

use std::path::{Path, PathBuf};

/// One guest drive letter bound to a host directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveMount {
    pub letter: char,
    pub host_dir: PathBuf,
}

/// Ordered mount declarations for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountTable {
    mounts: Vec<DriveMount>,
}

impl MountTable {
    pub fn new(mounts: Vec<DriveMount>) -> Self {
        Self { mounts }
    }

    pub fn mounts(&self) -> &[DriveMount] {
        &self.mounts
    }

    /// The drive the guest switches to at startup: the first declared mount.
    pub fn primary(&self) -> Option<&DriveMount> {
        self.mounts.first()
    }

    /// Translate a host path token to guest syntax.
    ///
    /// Absolute paths are canonicalized and matched against each mount root
    /// on path-segment boundaries; when several roots match (nested mounts)
    /// the longest prefix wins. Relative paths are probed against each mount
    /// root in declaration order and bound to the first one where they
    /// exist. Anything unmappable keeps its text, with separators flipped
    /// for relative tokens (a bare command name is already guest syntax).
    pub fn to_guest(&self, token: &str) -> String {
        let path = Path::new(token);

        if path.is_absolute() {
            let Ok(canonical) = path.canonicalize() else {
                return token.to_string();
            };

            let mut best: Option<(usize, String)> = None;
            for mount in &self.mounts {
                let Ok(root) = mount.host_dir.canonicalize() else {
                    continue;
                };
                if let Ok(rel) = canonical.strip_prefix(&root) {
                    let depth = root.components().count();
                    if best.as_ref().is_none_or(|(d, _)| depth > *d) {
                        best = Some((depth, guest_path(mount.letter, rel)));
                    }
                }
            }
            return match best {
                Some((_, guest)) => guest,
                None => token.to_string(),
            };
        }

        for mount in &self.mounts {
            if mount.host_dir.join(path).exists() {
                return guest_path(mount.letter, path);
            }
        }

        token.replace('/', "\\")
    }

    /// Translate a guest path such as `C:\SRC\MAIN.C` back to the host path
    /// under the matching mount. Returns None when no mount covers the
    /// drive letter or the token has no drive prefix.
    pub fn to_host(&self, guest: &str) -> Option<PathBuf> {
        let mut chars = guest.chars();
        let letter = chars.next()?;
        if chars.next() != Some(':') {
            return None;
        }

        let mount = self
            .mounts
            .iter()
            .find(|m| m.letter.eq_ignore_ascii_case(&letter))?;

        let rest = chars.as_str().trim_start_matches(['\\', '/']);
        let mut host = mount.host_dir.clone();
        for part in rest.split(['\\', '/']).filter(|p| !p.is_empty()) {
            host.push(part);
        }
        Some(host)
    }

    /// Translate a search-path style environment value. The value is split
    /// on `;`/`:` keeping the delimiters; only path-looking fragments (ones
    /// containing a slash) are translated, the rest pass through.
    pub fn translate_env_value(&self, value: &str) -> String {
        if !value.contains('/') && !value.contains('\\') {
            return value.to_string();
        }

        let mut out = String::with_capacity(value.len());
        let mut fragment = String::new();
        for ch in value.chars() {
            if ch == ';' || ch == ':' {
                out.push_str(&self.translate_fragment(&fragment));
                out.push(ch);
                fragment.clear();
            } else {
                fragment.push(ch);
            }
        }
        out.push_str(&self.translate_fragment(&fragment));
        out
    }

    fn translate_fragment(&self, fragment: &str) -> String {
        if fragment.contains('/') || fragment.contains('\\') {
            self.to_guest(fragment)
        } else {
            fragment.to_string()
        }
    }
}

fn guest_path(letter: char, rel: &Path) -> String {
    let rel = rel.to_string_lossy().replace('/', "\\");
    format!("{}:\\{}", letter.to_ascii_uppercase(), rel)
}
