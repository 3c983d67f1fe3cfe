use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

const BAITY_FILE: &str = "baity_captions.txt";
const OPINION_FILE: &str = "opinion_topics.txt";
const REFERENCES_FILE: &str = "baity_references.txt";
const OPENERS_FILE: &str = "girlfriend_openers.txt";

const DEFAULT_BAITY: &[&str] = &[
    "Not me dressing for the weather app instead of the actual weather",
    "Tell me you live here without telling me you live here",
    "Plot twist: I actually left the house today",
    "Main character energy, supporting character budget",
    "If you know the spot, you know the spot",
    "The forecast said one thing and my hair said another",
    "Current mood: overdressed and underinformed",
    "Low-key obsessed with this city again",
];

const DEFAULT_OPINION: &[&str] = &[
    "brunch lines that are longer than the meal",
    "people who clap when the plane lands",
    "pineapple on pizza",
    "rooftop bars in the off-season",
    "new apartments with no parking",
    "coffee shops without outlets",
    "live music on a weeknight",
    "farmers markets that close at noon",
];

const DEFAULT_OPENERS: &[&str] = &[
    "Omg, did you hear",
    "Can't believe",
    "So, guess what",
    "Yikes,",
    "Wait, no way",
    "Hot take:",
    "No shade, but",
    "Okay, real talk",
    "Just read",
    "PSA:",
];

/// Read-only candidate material for prompt construction.
#[derive(Debug, Clone)]
pub struct SeedPool {
    baity: Vec<String>,
    opinion: Vec<String>,
    references: Vec<String>,
    openers: Vec<String>,
}

impl SeedPool {
    /// Builds a pool from explicit lists. Empty lists are replaced by the
    /// built-in defaults so every sequence stays non-empty.
    pub fn new(
        baity: Vec<String>,
        opinion: Vec<String>,
        references: Vec<String>,
        openers: Vec<String>,
    ) -> Self {
        let baity = non_empty_or(baity, DEFAULT_BAITY);
        let references = if references.is_empty() {
            baity.clone()
        } else {
            references
        };

        Self {
            opinion: non_empty_or(opinion, DEFAULT_OPINION),
            openers: non_empty_or(openers, DEFAULT_OPENERS),
            baity,
            references,
        }
    }

    pub fn load(data_dir: &Path) -> Self {
        let (baity, opinion) = load_caption_pools(data_dir);
        let references = load_lines(&data_dir.join(REFERENCES_FILE), &baity);
        let openers = load_lines(&data_dir.join(OPENERS_FILE), &owned(DEFAULT_OPENERS));

        info!(
            baity = baity.len(),
            opinion = opinion.len(),
            references = references.len(),
            openers = openers.len(),
            "Loaded seed pools from {:?}",
            data_dir
        );

        Self::new(baity, opinion, references, openers)
    }

    pub fn baity(&self) -> &[String] {
        &self.baity
    }

    /// Topics shared by the opinion and event strategies.
    pub fn opinion(&self) -> &[String] {
        &self.opinion
    }

    pub fn references(&self) -> &[String] {
        &self.references
    }

    pub fn openers(&self) -> &[String] {
        &self.openers
    }
}

impl Default for SeedPool {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }
}

/// Returns `(baity, opinion)` seed lists, each falling back to its defaults.
pub fn load_caption_pools(data_dir: &Path) -> (Vec<String>, Vec<String>) {
    let baity = load_lines(&data_dir.join(BAITY_FILE), &owned(DEFAULT_BAITY));
    let opinion = load_lines(&data_dir.join(OPINION_FILE), &owned(DEFAULT_OPINION));
    (baity, opinion)
}

/// Trimmed, non-empty lines of `path`, or `default` when the file is missing,
/// unreadable or blank.
pub fn load_lines(path: &Path, default: &[String]) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let lines: Vec<String> = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            if lines.is_empty() {
                warn!("Seed file {:?} is empty; using built-in defaults", path);
                default.to_vec()
            } else {
                lines
            }
        }
        Err(err) => {
            debug!("Seed file {:?} unavailable ({}); using built-in defaults", path, err);
            default.to_vec()
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn non_empty_or(items: Vec<String>, fallback: &[&str]) -> Vec<String> {
    if items.is_empty() {
        owned(fallback)
    } else {
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_lines_trims_and_skips_blank_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lines.txt");
        fs::write(&path, "  first  \n\n\tsecond\n   \n").expect("write");

        let lines = load_lines(&path, &owned(&["fallback"]));
        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn load_lines_falls_back_when_missing_or_blank() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fallback = owned(&["a", "b"]);

        let missing = load_lines(&dir.path().join("nope.txt"), &fallback);
        assert_eq!(missing, fallback);

        let blank = dir.path().join("blank.txt");
        fs::write(&blank, "\n  \n").expect("write");
        assert_eq!(load_lines(&blank, &fallback), fallback);
    }

    #[test]
    fn references_default_to_baity_seeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(BAITY_FILE), "hook one\nhook two\n").expect("write");

        let pool = SeedPool::load(dir.path());
        assert_eq!(pool.baity(), ["hook one".to_string(), "hook two".to_string()]);
        assert_eq!(pool.references(), pool.baity());
        assert_eq!(pool.openers().len(), DEFAULT_OPENERS.len());
        assert!(!pool.opinion().is_empty());
    }

    #[test]
    fn empty_lists_never_survive_construction() {
        let pool = SeedPool::default();
        assert!(!pool.baity().is_empty());
        assert!(!pool.opinion().is_empty());
        assert!(!pool.references().is_empty());
        assert!(!pool.openers().is_empty());
    }
}
