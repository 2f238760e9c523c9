//! Persistent storage layer for the attack knowledge graph, backed by
//! `sled`. Six trees play the role the node and index tables of a property
//! graph would:
//!
//! | Tree | Key | Value | Purpose |
//! |------|-----|-------|---------|
//! | `samples` | sample_id | `AttackSample` | node storage |
//! | `keywords` | keyword | `AttackKeyword` | node storage |
//! | `techniques` | technique_id | `AttackTechnique` | node storage |
//! | `signatures` | signature_id | `AttackSignature` | node storage |
//! | `keyword_to_samples` | keyword | `Vec<String>` of sample ids | inverted index |
//! | `category_to_samples` | category | `Vec<String>` of sample ids | inverted index |
//!
//! Inserts are idempotent MERGE-style upserts keyed by the node's natural
//! key (`sample_id`, `keyword`, `technique_id`), so re-ingesting the same
//! attack sample twice updates it in place instead of duplicating it.

use std::path::Path;

use crate::models::{AttackKeyword, AttackSample, AttackSignature, AttackTechnique, KnowledgeError, Result};

const SAMPLES: &str = "samples";
const KEYWORDS: &str = "keywords";
const TECHNIQUES: &str = "techniques";
const SIGNATURES: &str = "signatures";
const KEYWORD_TO_SAMPLES: &str = "keyword_to_samples";
const CATEGORY_TO_SAMPLES: &str = "category_to_samples";

pub struct Storage {
    db: sled::Db,
    samples: sled::Tree,
    keywords: sled::Tree,
    techniques: sled::Tree,
    signatures: sled::Tree,
    keyword_to_samples: sled::Tree,
    category_to_samples: sled::Tree,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            samples: db.open_tree(SAMPLES)?,
            keywords: db.open_tree(KEYWORDS)?,
            techniques: db.open_tree(TECHNIQUES)?,
            signatures: db.open_tree(SIGNATURES)?,
            keyword_to_samples: db.open_tree(KEYWORD_TO_SAMPLES)?,
            category_to_samples: db.open_tree(CATEGORY_TO_SAMPLES)?,
            db,
        })
    }

    pub fn upsert_sample(&self, sample: &AttackSample) -> Result<()> {
        let bytes = serde_json::to_vec(sample)?;
        self.samples.insert(sample.sample_id.as_bytes(), bytes)?;

        for keyword in &sample.keywords {
            self.upsert_keyword(&AttackKeyword { keyword: keyword.clone() })?;
            self.add_to_index(&self.keyword_to_samples, keyword, &sample.sample_id)?;
        }
        self.add_to_index(&self.category_to_samples, &sample.category, &sample.sample_id)?;
        Ok(())
    }

    pub fn upsert_keyword(&self, keyword: &AttackKeyword) -> Result<()> {
        let bytes = serde_json::to_vec(keyword)?;
        self.keywords.insert(keyword.keyword.as_bytes(), bytes)?;
        Ok(())
    }

    pub fn upsert_technique(&self, technique: &AttackTechnique) -> Result<()> {
        let bytes = serde_json::to_vec(technique)?;
        self.techniques.insert(technique.technique_id.as_bytes(), bytes)?;
        Ok(())
    }

    pub fn upsert_signature(&self, signature: &AttackSignature) -> Result<()> {
        let bytes = serde_json::to_vec(signature)?;
        self.signatures.insert(signature.signature_id.as_bytes(), bytes)?;
        Ok(())
    }

    fn add_to_index(&self, tree: &sled::Tree, key: &str, sample_id: &str) -> Result<()> {
        let mut ids: Vec<String> = match tree.get(key.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Vec::new(),
        };
        if !ids.iter().any(|id| id == sample_id) {
            ids.push(sample_id.to_string());
            tree.insert(key.as_bytes(), serde_json::to_vec(&ids)?)?;
        }
        Ok(())
    }

    pub fn load_sample(&self, sample_id: &str) -> Result<Option<AttackSample>> {
        match self.samples.get(sample_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn samples_for_keyword(&self, keyword: &str) -> Result<Vec<AttackSample>> {
        let ids: Vec<String> = match self.keyword_to_samples.get(keyword.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => return Ok(Vec::new()),
        };
        ids.into_iter()
            .filter_map(|id| self.load_sample(&id).transpose())
            .collect()
    }

    pub fn all_samples(&self) -> Result<Vec<AttackSample>> {
        self.samples
            .iter()
            .map(|entry| {
                let (_, bytes) = entry?;
                Ok(serde_json::from_slice(&bytes)?)
            })
            .collect()
    }

    pub fn contains_sample(&self, sample_id: &str) -> Result<bool> {
        Ok(self.samples.contains_key(sample_id.as_bytes())?)
    }

    pub fn remove_sample(&self, sample_id: &str) -> Result<()> {
        self.samples
            .remove(sample_id.as_bytes())?
            .ok_or_else(|| KnowledgeError::NotFound(sample_id.to_string()))?;
        Ok(())
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    pub fn technique_count(&self) -> usize {
        self.techniques.len()
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("samples", &self.samples.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, category: &str, keywords: &[&str]) -> AttackSample {
        AttackSample {
            sample_id: id.into(),
            text: "sample text".into(),
            category: category.into(),
            risk_score: 0.8,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            techniques: vec![],
        }
    }

    #[test]
    fn upsert_is_idempotent() {
        let storage = Storage::temporary().unwrap();
        let s = sample("abc", "injection", &["ignore", "instructions"]);
        storage.upsert_sample(&s).unwrap();
        storage.upsert_sample(&s).unwrap();
        assert_eq!(storage.sample_count(), 1);
        assert_eq!(storage.samples_for_keyword("ignore").unwrap().len(), 1);
    }

    #[test]
    fn keyword_index_finds_samples() {
        let storage = Storage::temporary().unwrap();
        storage.upsert_sample(&sample("a", "injection", &["ignore"])).unwrap();
        storage.upsert_sample(&sample("b", "injection", &["ignore", "disregard"])).unwrap();
        let hits = storage.samples_for_keyword("ignore").unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn remove_missing_sample_errors() {
        let storage = Storage::temporary().unwrap();
        assert!(storage.remove_sample("nope").is_err());
    }
}
