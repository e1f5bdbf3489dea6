//! Writing the final artifact set to disk.
//!
//! Public artifacts land under `{out}/{deploy}`. Private ones land under
//! `{extra}/{deploy}` or, without an extra root, in the legacy auxiliary
//! directory next to the public one.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use log::{debug, info, warn};
use weft_types::{is_valid_deploy_path, ModuleDef};

use crate::artifact::{ArtifactSet, EmittedArtifact};
use crate::error::{LinkError, Result};

const LEGACY_AUX_SUFFIX: &str = "-aux";

/// Name of the legacy private directory for a deploy path: the deploy path
/// without its trailing separator, plus `-aux`.
pub fn legacy_aux_dir_name(deploy_to: &str) -> String {
    let trimmed = deploy_to
        .strip_suffix('/')
        .or_else(|| deploy_to.strip_suffix('\\'))
        .unwrap_or(deploy_to);
    format!("{}{}", trimmed, LEGACY_AUX_SUFFIX)
}

/// Where the two artifact visibilities are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub public_dir: PathBuf,
    pub private_dir: PathBuf,
    /// `private_dir` is the legacy auxiliary directory
    pub legacy_aux: bool,
}

impl OutputLayout {
    /// Both directories for `module`.
    ///
    /// The deploy path must stay below its root, and the two directories
    /// must either coincide or be disjoint.
    pub fn resolve(module: &ModuleDef, out_dir: &Path, extra_dir: Option<&Path>) -> Result<Self> {
        if !is_valid_deploy_path(module.deploy_to()) {
            return Err(LinkError::InvalidDeployPath(module.deploy_to().to_string()));
        }
        let deploy = module.deploy_to().trim_end_matches('/');
        let public_dir = out_dir.join(deploy);
        let layout = match extra_dir {
            Some(extra) => Self {
                public_dir,
                private_dir: extra.join(deploy),
                legacy_aux: false,
            },
            None => Self {
                public_dir,
                private_dir: out_dir.join(legacy_aux_dir_name(module.deploy_to())),
                legacy_aux: true,
            },
        };

        let nested = layout.public_dir != layout.private_dir
            && (layout.private_dir.starts_with(&layout.public_dir)
                || layout.public_dir.starts_with(&layout.private_dir));
        if nested {
            return Err(LinkError::NestedOutputDirectories {
                public_dir: layout.public_dir,
                private_dir: layout.private_dir,
            });
        }
        Ok(layout)
    }
}

/// What a materialization did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputReport {
    pub layout: OutputLayout,
    pub public_files: usize,
    pub private_files: usize,
    /// Non-fatal notices for the user
    pub advisories: Vec<String>,
}

/// Replace the module's output directories with the emitted artifacts.
///
/// Every file is written into hidden staging directories first; the targets
/// are only cleared and swapped in once all writes succeeded.
pub fn produce_output(
    artifacts: &ArtifactSet,
    module: &ModuleDef,
    out_dir: &Path,
    extra_dir: Option<&Path>,
) -> Result<OutputReport> {
    let layout = OutputLayout::resolve(module, out_dir, extra_dir)?;
    let aux_existed = layout.private_dir.exists();

    let mut public = Vec::new();
    let mut private = Vec::new();
    for artifact in artifacts.emitted() {
        check_partial_path(artifact.partial_path())?;
        if artifact.is_public() {
            public.push(artifact);
        } else {
            private.push(artifact);
        }
    }

    let shared = layout.public_dir == layout.private_dir;
    let public_stage = Staging::create(&layout.public_dir)?;
    public_stage.write_all(&public)?;
    if shared {
        public_stage.write_all(&private)?;
    }
    let private_stage = if private.is_empty() || shared {
        None
    } else {
        let stage = Staging::create(&layout.private_dir)?;
        stage.write_all(&private)?;
        Some(stage)
    };

    public_stage.commit()?;
    match private_stage {
        Some(stage) => stage.commit()?,
        None if !shared => clear_dir(&layout.private_dir)?,
        None => {}
    }

    let mut advisories = Vec::new();
    if layout.legacy_aux && !aux_existed && layout.private_dir.exists() {
        let advisory = format!(
            "Non-public artifacts were written to '{}' inside the output directory; \
             use --extra to put them elsewhere",
            layout.private_dir.display()
        );
        warn!("{}", advisory);
        advisories.push(advisory);
    }

    info!(
        "Wrote {} public and {} private file(s) for module {}",
        public.len(),
        private.len(),
        module.name()
    );
    Ok(OutputReport {
        layout,
        public_files: public.len(),
        private_files: private.len(),
        advisories,
    })
}

fn check_partial_path(partial: &str) -> Result<()> {
    let path = Path::new(partial);
    let inside = !partial.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)));
    if inside {
        Ok(())
    } else {
        Err(LinkError::InvalidArtifactPath(partial.to_string()))
    }
}

/// Remove `dir` and everything below it; a missing directory is fine.
fn clear_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LinkError::io(dir, e)),
    }
}

/// A hidden sibling of `target` that collects writes until committed.
///
/// Dropping an uncommitted staging directory deletes it.
struct Staging {
    dir: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl Staging {
    fn create(target: &Path) -> Result<Self> {
        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = parent.join(format!(".{}.staging", name));

        clear_dir(&dir)?;
        fs::create_dir_all(&dir).map_err(|e| LinkError::io(&dir, e))?;
        Ok(Self {
            dir,
            target: target.to_path_buf(),
            committed: false,
        })
    }

    fn write_all(&self, artifacts: &[&EmittedArtifact]) -> Result<()> {
        for artifact in artifacts {
            let path = self.dir.join(artifact.partial_path());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| LinkError::io(parent, e))?;
            }
            fs::write(&path, artifact.contents()).map_err(|e| LinkError::io(&path, e))?;
            debug!("Staged {} from {}", artifact.partial_path(), artifact.producer());
        }
        Ok(())
    }

    fn commit(mut self) -> Result<()> {
        clear_dir(&self.target)?;
        fs::rename(&self.dir, &self.target).map_err(|e| LinkError::io(&self.target, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::PropertyModel;

    fn module(deploy_to: &str) -> ModuleDef {
        ModuleDef::new("com.example.Hello", PropertyModel::new()).with_deploy_to(deploy_to)
    }

    #[test]
    fn test_legacy_aux_dir_name() {
        assert_eq!(legacy_aux_dir_name("hello/"), "hello-aux");
        assert_eq!(legacy_aux_dir_name("hello\\"), "hello-aux");
        assert_eq!(legacy_aux_dir_name("hello"), "hello-aux");
        assert_eq!(legacy_aux_dir_name("apps/hello/"), "apps/hello-aux");
    }

    #[test]
    fn test_layout() {
        let out = Path::new("out");
        let legacy = OutputLayout::resolve(&module("hello/"), out, None).unwrap();
        assert_eq!(legacy.public_dir, out.join("hello"));
        assert_eq!(legacy.private_dir, out.join("hello-aux"));
        assert!(legacy.legacy_aux);

        let extra = OutputLayout::resolve(&module("hello/"), out, Some(Path::new("extra"))).unwrap();
        assert_eq!(extra.private_dir, Path::new("extra").join("hello"));
        assert!(!extra.legacy_aux);

        let shared = OutputLayout::resolve(&module("hello/"), out, Some(out)).unwrap();
        assert_eq!(shared.public_dir, shared.private_dir);
    }

    #[test]
    fn test_deploy_path_must_stay_below_the_root() {
        for deploy in ["/", "../escaped", "./"] {
            let err = OutputLayout::resolve(&module(deploy), Path::new("out"), None).unwrap_err();
            assert!(matches!(err, LinkError::InvalidDeployPath(_)), "{:?} should be rejected", deploy);
        }
    }

    #[test]
    fn test_root_deploy_leaves_sibling_modules_alone() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("other-module/keep.js");
        fs::create_dir_all(keep.parent().unwrap()).unwrap();
        fs::write(&keep, "keep").unwrap();

        let mut set = ArtifactSet::new();
        set.add_or_replace(EmittedArtifact::new("t", "app.js", "1"));
        let err = produce_output(&set, &module("/"), dir.path(), None).unwrap_err();
        assert!(matches!(err, LinkError::InvalidDeployPath(_)));
        assert_eq!(fs::read_to_string(&keep).unwrap(), "keep");
    }

    #[test]
    fn test_escaping_deploy_writes_nothing_outside() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("inner");
        fs::create_dir_all(&out).unwrap();

        let mut set = ArtifactSet::new();
        set.add_or_replace(EmittedArtifact::new("t", "app.js", "1"));
        let err = produce_output(&set, &module("../escaped"), &out, None).unwrap_err();
        assert!(matches!(err, LinkError::InvalidDeployPath(_)));
        assert!(!dir.path().join("escaped").exists());
    }

    #[test]
    fn test_extra_inside_public_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("hello");
        fs::create_dir_all(&public).unwrap();
        fs::write(public.join("index.html"), "old").unwrap();

        let mut set = ArtifactSet::new();
        set.add_or_replace(EmittedArtifact::new("t", "app.js", "1"));
        set.add_or_replace(EmittedArtifact::new("t", "notes.txt", "2").private());
        let extra = public.join("private");
        let err = produce_output(&set, &module("hello/"), dir.path(), Some(extra.as_path())).unwrap_err();

        assert!(matches!(err, LinkError::NestedOutputDirectories { .. }));
        assert_eq!(fs::read_to_string(public.join("index.html")).unwrap(), "old");
        assert!(!public.join("app.js").exists());

        // and the other way round: public output below the private one
        let root = dir.path().join("x");
        let err = OutputLayout::resolve(&module("hello/"), &root.join("hello"), Some(root.as_path())).unwrap_err();
        assert!(matches!(err, LinkError::NestedOutputDirectories { .. }));
    }

    #[test]
    fn test_escaping_paths_rejected() {
        for bad in ["", "../x.js", "/etc/passwd", "a/../../b"] {
            assert!(check_partial_path(bad).is_err(), "{:?} should be rejected", bad);
        }
        assert!(check_partial_path("img/logo.png").is_ok());
    }

    #[test]
    fn test_invalid_path_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = ArtifactSet::new();
        set.add_or_replace(EmittedArtifact::new("t", "ok.js", "1"));
        set.add_or_replace(EmittedArtifact::new("t", "../escape.js", "2"));

        let err = produce_output(&set, &module("hello/"), dir.path(), None).unwrap_err();
        assert!(matches!(err, LinkError::InvalidArtifactPath(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("hello").join("stale.js");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old").unwrap();

        let mut set = ArtifactSet::new();
        set.add_or_replace(EmittedArtifact::new("t", "js/app.js", "new"));
        let report = produce_output(&set, &module("hello/"), dir.path(), None).unwrap();

        assert!(!stale.exists());
        assert_eq!(fs::read_to_string(dir.path().join("hello/js/app.js")).unwrap(), "new");
        assert_eq!(report.public_files, 1);
        assert!(report.advisories.is_empty());
        assert!(!dir.path().join(".hello.staging").exists());
    }
}
