// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline index builder.
//!
//! corpus -> embedding provider -> vector index + identifier map -> artifacts.
//! Any failure aborts the whole build and leaves no artifacts behind.

use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

use crate::corpus::{load_corpus, CorpusEntry};
use crate::embedding::EmbeddingProvider;
use crate::errors::BuildError;
use crate::index::{save_artifacts, ArtifactPaths, FlatIndex, IdentifierMap};

/// Summary of a completed build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub vectors: usize,
    pub dimension: usize,
    pub model_id: String,
    pub index_path: PathBuf,
    pub id_map_path: PathBuf,
}

/// Builds the vector index and identifier map from a corpus.
pub struct IndexBuilder<'a> {
    provider: &'a mut dyn EmbeddingProvider,
    show_progress: bool,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(provider: &'a mut dyn EmbeddingProvider) -> Self {
        Self {
            provider,
            show_progress: false,
        }
    }

    /// Show a progress bar while embedding.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run the full pipeline and persist both artifacts.
    pub fn build(
        &mut self,
        corpus_path: &Path,
        paths: &ArtifactPaths,
    ) -> Result<BuildReport, BuildError> {
        preflight(corpus_path, paths)?;

        tracing::info!("loading corpus from {}", corpus_path.display());
        let corpus = load_corpus(corpus_path)?;
        if corpus.rows_dropped > 0 {
            tracing::warn!(
                "dropped {} of {} corpus rows with missing fields",
                corpus.rows_dropped,
                corpus.rows_read
            );
        }

        let (index, ids) = self.index_entries(&corpus.entries)?;

        tracing::info!(
            "saving {} vectors to {} and {}",
            index.len(),
            paths.index.display(),
            paths.id_map.display()
        );
        save_artifacts(paths, &index, &ids, self.provider.model_id())?;

        Ok(BuildReport {
            rows_read: corpus.rows_read,
            rows_dropped: corpus.rows_dropped,
            vectors: index.len(),
            dimension: index.dimension(),
            model_id: self.provider.model_id().to_string(),
            index_path: paths.index.clone(),
            id_map_path: paths.id_map.clone(),
        })
    }

    /// Embed entries and add them to a fresh index and identifier map in lockstep.
    pub fn index_entries(
        &mut self,
        entries: &[CorpusEntry],
    ) -> Result<(FlatIndex, IdentifierMap), BuildError> {
        if entries.is_empty() {
            return Err(BuildError::EmptyCorpus);
        }

        tracing::info!(
            "embedding {} questions with {}",
            entries.len(),
            self.provider.model_id()
        );

        let pb = if self.show_progress {
            let pb = ProgressBar::new(entries.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{bar:40.cyan/blue}] {pos}/{len} questions | Embedding {msg}")
                    .expect("valid progress bar template")
                    .progress_chars("##."),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let batch_size = self.provider.batch_size().max(1);
        let mut index: Option<FlatIndex> = None;
        let mut ids = IdentifierMap::new();

        for batch in entries.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|e| e.text.clone()).collect();
            let vectors = self
                .provider
                .embed_texts(&texts)
                .map_err(BuildError::Embedding)?;
            if vectors.len() != batch.len() {
                return Err(BuildError::EmbeddingCount {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }

            if index.is_none() {
                let dimension = vectors[0].len();
                tracing::debug!("vector dimension {}", dimension);
                index = Some(FlatIndex::new(dimension)?);
            }
            if let Some(index) = index.as_mut() {
                index.add(&vectors)?;
                ids.append(batch.iter().map(|e| e.id.clone()));
            }

            pb.inc(batch.len() as u64);
        }

        pb.finish_and_clear();

        let index = index.ok_or(BuildError::EmptyCorpus)?;
        Ok((index, ids))
    }
}

/// Cheap checks that must pass before any embedding work starts: the corpus
/// exists and both artifact directories can be written.
pub fn preflight(corpus_path: &Path, paths: &ArtifactPaths) -> Result<(), BuildError> {
    if !corpus_path.is_file() {
        return Err(BuildError::CorpusNotFound(corpus_path.to_path_buf()));
    }

    for target in [&paths.index, &paths.id_map] {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_writable(&dir)?;
    }
    Ok(())
}

fn ensure_writable(dir: &Path) -> Result<(), BuildError> {
    let not_writable = |source| BuildError::OutputNotWritable {
        path: dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(not_writable)?;
    let marker = dir.join(".stackguardian-write-check");
    fs::write(&marker, b"").map_err(not_writable)?;
    let _ = fs::remove_file(&marker);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::index::load_artifacts;
    use anyhow::Result;
    use tempfile::tempdir;

    /// Counts calls and returns `[position, 1.0]` vectors.
    struct CountingProvider {
        calls: usize,
        next: f32,
        batch_size: usize,
    }

    impl CountingProvider {
        fn new(batch_size: usize) -> Self {
            Self {
                calls: 0,
                next: 0.0,
                batch_size,
            }
        }
    }

    impl EmbeddingProvider for CountingProvider {
        fn model_id(&self) -> &str {
            "counting"
        }

        fn batch_size(&self) -> usize {
            self.batch_size
        }

        fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls += 1;
            Ok(texts
                .iter()
                .map(|_| {
                    let v = vec![self.next, 1.0];
                    self.next += 1.0;
                    v
                })
                .collect())
        }
    }

    struct ShortProvider;

    impl EmbeddingProvider for ShortProvider {
        fn model_id(&self) -> &str {
            "short"
        }

        fn batch_size(&self) -> usize {
            8
        }

        fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0]; texts.len().saturating_sub(1)])
        }
    }

    fn paths(dir: &Path) -> ArtifactPaths {
        ArtifactPaths::in_dir(dir.join("models"), "vector_index.bin", "id_map.json")
    }

    #[test]
    fn drops_invalid_rows_and_keeps_order() {
        let dir = tempdir().unwrap();
        let corpus = dir.path().join("corpus.jsonl");
        fs::write(
            &corpus,
            r#"{"Id": 10, "Title": "a", "Body": "alpha"}
{"Id": 20, "Title": "b"}
{"Id": 30, "Title": "c", "Body": "gamma"}
{"Id": 40, "Title": "d", "Body": "delta"}
"#,
        )
        .unwrap();
        let paths = paths(dir.path());

        let mut provider = HashEmbedder::new(32);
        let report = IndexBuilder::new(&mut provider).build(&corpus, &paths).unwrap();
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.rows_dropped, 1);
        assert_eq!(report.vectors, 3);
        assert_eq!(report.dimension, 32);

        let artifacts = load_artifacts(&paths).unwrap();
        assert_eq!(artifacts.index.len(), 3);
        assert_eq!(artifacts.ids.ids(), &["10", "30", "40"]);
        assert_eq!(artifacts.model_id, "hash-32");
    }

    #[test]
    fn batches_stay_in_lockstep() {
        let entries: Vec<CorpusEntry> = (0..7)
            .map(|i| CorpusEntry::new(format!("q{}", i), format!("text {}", i)))
            .collect();
        let mut provider = CountingProvider::new(3);
        let (index, ids) = IndexBuilder::new(&mut provider)
            .index_entries(&entries)
            .unwrap();

        assert_eq!(provider.calls, 3);
        assert_eq!(index.len(), 7);
        assert_eq!(ids.len(), 7);
        for position in 0..7 {
            let vector = index.vector(position).unwrap();
            assert_eq!(vector[0], position as f32);
            assert_eq!(ids.resolve(position).unwrap(), format!("q{}", position));
        }
    }

    #[test]
    fn empty_corpus_fails_before_embedding() {
        let dir = tempdir().unwrap();
        let corpus = dir.path().join("corpus.jsonl");
        fs::write(&corpus, "{\"Id\": 1, \"Title\": \"only title\"}\n").unwrap();
        let paths = paths(dir.path());

        let mut provider = CountingProvider::new(4);
        let err = IndexBuilder::new(&mut provider)
            .build(&corpus, &paths)
            .unwrap_err();
        assert!(matches!(err, BuildError::EmptyCorpus));
        assert_eq!(provider.calls, 0);
        assert!(!paths.index.exists());
        assert!(!paths.id_map.exists());
    }

    #[test]
    fn missing_corpus_fails_fast() {
        let dir = tempdir().unwrap();
        let paths = paths(dir.path());

        let mut provider = CountingProvider::new(4);
        let err = IndexBuilder::new(&mut provider)
            .build(&dir.path().join("nope.jsonl"), &paths)
            .unwrap_err();
        assert!(matches!(err, BuildError::CorpusNotFound(_)));
        assert_eq!(provider.calls, 0);
    }

    #[test]
    fn unwritable_output_fails_before_embedding() {
        let dir = tempdir().unwrap();
        let corpus = dir.path().join("corpus.jsonl");
        fs::write(&corpus, "{\"id\": 1, \"title\": \"a\", \"body\": \"b\"}\n").unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let paths =
            ArtifactPaths::in_dir(blocker.join("models"), "vector_index.bin", "id_map.json");

        assert!(matches!(
            preflight(&corpus, &paths),
            Err(BuildError::OutputNotWritable { .. })
        ));

        let mut provider = CountingProvider::new(4);
        let err = IndexBuilder::new(&mut provider)
            .build(&corpus, &paths)
            .unwrap_err();
        assert!(matches!(err, BuildError::OutputNotWritable { .. }));
        assert_eq!(provider.calls, 0);
    }

    #[test]
    fn short_provider_output_aborts_build() {
        let dir = tempdir().unwrap();
        let corpus = dir.path().join("corpus.jsonl");
        fs::write(
            &corpus,
            concat!(
                "{\"id\": 1, \"title\": \"a\", \"body\": \"b\"}\n",
                "{\"id\": 2, \"title\": \"c\", \"body\": \"d\"}\n",
            ),
        )
        .unwrap();
        let paths = paths(dir.path());

        let err = IndexBuilder::new(&mut ShortProvider)
            .build(&corpus, &paths)
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::EmbeddingCount {
                expected: 2,
                actual: 1
            }
        ));
        assert!(!paths.index.exists());
    }

    #[test]
    fn write_check_file_is_removed() {
        let dir = tempdir().unwrap();
        let corpus = dir.path().join("corpus.json");
        fs::write(&corpus, r#"[{"id": 1, "title": "a", "body": "b"}]"#).unwrap();
        let paths = paths(dir.path());

        let mut provider = HashEmbedder::new(8);
        IndexBuilder::new(&mut provider).build(&corpus, &paths).unwrap();

        let mut leftovers: Vec<_> = fs::read_dir(dir.path().join("models"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        leftovers.sort();
        assert_eq!(leftovers, vec!["id_map.json", "vector_index.bin"]);
    }
}
