//! Artifacts and the ordered, deduplicating set that carries them through a link.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::compilation::CompiledResult;

/// Whether an emitted file is deployed or kept next to the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Written under the public output directory
    Public,
    /// Written under the extra (auxiliary) directory
    Private,
}

/// A file to be written relative to the module's output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedArtifact {
    partial_path: String,
    #[serde(with = "base64_bytes")]
    contents: Vec<u8>,
    visibility: Visibility,
    producer: String,
}

impl EmittedArtifact {
    /// A public file produced by `producer` (a linker or generator name).
    pub fn new(
        producer: impl Into<String>,
        partial_path: impl Into<String>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            partial_path: partial_path.into(),
            contents: contents.into(),
            visibility: Visibility::Public,
            producer: producer.into(),
        }
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn partial_path(&self) -> &str {
        &self.partial_path
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn producer(&self) -> &str {
        &self.producer
    }
}

/// Artifact categories; the set is partitioned by these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactKind {
    Emitted,
    Compilation,
}

/// Identity of an artifact: its category plus a key unique within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId {
    pub kind: ArtifactKind,
    pub key: String,
}

impl ArtifactId {
    pub fn emitted(partial_path: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Emitted,
            key: partial_path.into(),
        }
    }

    pub fn compilation(strong_name: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Compilation,
            key: strong_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    /// A file destined for one of the output directories
    Emitted(EmittedArtifact),
    /// A compiled permutation result
    Compilation(CompiledResult),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Emitted(_) => ArtifactKind::Emitted,
            Artifact::Compilation(_) => ArtifactKind::Compilation,
        }
    }

    /// Key unique within the artifact's kind.
    pub fn key(&self) -> &str {
        match self {
            Artifact::Emitted(e) => e.partial_path(),
            Artifact::Compilation(c) => c.strong_name(),
        }
    }

    pub fn id(&self) -> ArtifactId {
        ArtifactId {
            kind: self.kind(),
            key: self.key().to_string(),
        }
    }

    pub fn as_emitted(&self) -> Option<&EmittedArtifact> {
        match self {
            Artifact::Emitted(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_compilation(&self) -> Option<&CompiledResult> {
        match self {
            Artifact::Compilation(c) => Some(c),
            _ => None,
        }
    }
}

impl From<EmittedArtifact> for Artifact {
    fn from(artifact: EmittedArtifact) -> Self {
        Artifact::Emitted(artifact)
    }
}

impl From<CompiledResult> for Artifact {
    fn from(result: CompiledResult) -> Self {
        Artifact::Compilation(result)
    }
}

/// Insertion-ordered artifacts, unique by [`ArtifactId`].
///
/// Replacing an artifact keeps the slot of the one it supersedes, so the
/// iteration order depends only on when an identity was first seen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Artifact>", into = "Vec<Artifact>")]
pub struct ArtifactSet {
    entries: IndexMap<ArtifactId, Artifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `artifact`, returning the artifact it superseded, if any.
    pub fn add_or_replace(&mut self, artifact: impl Into<Artifact>) -> Option<Artifact> {
        let artifact = artifact.into();
        self.entries.insert(artifact.id(), artifact)
    }

    pub fn add_all_or_replace(&mut self, artifacts: impl IntoIterator<Item = Artifact>) {
        for artifact in artifacts {
            self.add_or_replace(artifact);
        }
    }

    /// Remove an artifact, preserving the order of the rest.
    pub fn remove(&mut self, id: &ArtifactId) -> Option<Artifact> {
        self.entries.shift_remove(id)
    }

    pub fn get(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.entries.values()
    }

    /// Artifacts of one kind, in insertion order.
    pub fn of_kind(&self, kind: ArtifactKind) -> impl Iterator<Item = &Artifact> {
        self.iter().filter(move |a| a.kind() == kind)
    }

    pub fn emitted(&self) -> impl Iterator<Item = &EmittedArtifact> {
        self.iter().filter_map(Artifact::as_emitted)
    }

    pub fn compilations(&self) -> impl Iterator<Item = &CompiledResult> {
        self.iter().filter_map(Artifact::as_compilation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Order-sensitive: two sets are equal only if they iterate identically.
impl PartialEq for ArtifactSet {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.iter().eq(other.iter())
    }
}

impl Eq for ArtifactSet {}

impl FromIterator<Artifact> for ArtifactSet {
    fn from_iter<I: IntoIterator<Item = Artifact>>(iter: I) -> Self {
        let mut set = ArtifactSet::new();
        set.add_all_or_replace(iter);
        set
    }
}

impl From<Vec<Artifact>> for ArtifactSet {
    fn from(artifacts: Vec<Artifact>) -> Self {
        artifacts.into_iter().collect()
    }
}

impl From<ArtifactSet> for Vec<Artifact> {
    fn from(set: ArtifactSet) -> Self {
        set.entries.into_values().collect()
    }
}

impl IntoIterator for ArtifactSet {
    type Item = Artifact;
    type IntoIter = indexmap::map::IntoValues<ArtifactId, Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl<'a> IntoIterator for &'a ArtifactSet {
    type Item = &'a Artifact;
    type IntoIter = indexmap::map::Values<'a, ArtifactId, Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, body: &str) -> EmittedArtifact {
        EmittedArtifact::new("test", path, body)
    }

    #[test]
    fn test_insertion_order_and_replace_in_place() {
        let mut set = ArtifactSet::new();
        set.add_or_replace(file("b.txt", "1"));
        set.add_or_replace(file("a.txt", "2"));
        let old = set.add_or_replace(file("b.txt", "3"));

        assert_eq!(old.unwrap().as_emitted().unwrap().contents(), b"1");
        let paths: Vec<&str> = set.emitted().map(|e| e.partial_path()).collect();
        assert_eq!(paths, ["b.txt", "a.txt"]);
        assert_eq!(set.emitted().next().unwrap().contents(), b"3");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_partitioned_by_kind() {
        let mut set = ArtifactSet::new();
        let result = CompiledResult::from_code("code");
        set.add_or_replace(file("x.js", "x"));
        set.add_or_replace(result.clone());
        // same key text in another kind is a different identity
        set.add_or_replace(file(result.strong_name(), "y"));

        assert_eq!(set.len(), 3);
        assert_eq!(set.compilations().count(), 1);
        assert_eq!(set.of_kind(ArtifactKind::Emitted).count(), 2);
        assert!(set.contains(&ArtifactId::compilation(result.strong_name())));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut set: ArtifactSet = vec![
            Artifact::from(file("1", "")),
            Artifact::from(file("2", "")),
            Artifact::from(file("3", "")),
        ]
        .into();
        set.remove(&ArtifactId::emitted("2"));
        let keys: Vec<&str> = set.iter().map(Artifact::key).collect();
        assert_eq!(keys, ["1", "3"]);
    }

    #[test]
    fn test_serde_keeps_order_and_bytes() {
        let mut set = ArtifactSet::new();
        set.add_or_replace(EmittedArtifact::new("gen", "img/logo.bin", vec![0u8, 159, 255]).private());
        set.add_or_replace(file("index.html", "<html></html>"));

        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains("\"kind\":\"emitted\""));
        let back: ArtifactSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
        assert_eq!(back.emitted().next().unwrap().visibility(), Visibility::Private);
    }
}
