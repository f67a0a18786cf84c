//! Relevance ranking of sections against a "job to be done"
//!
//! A section's score is the sum of
//! - `floor(ratio * keyword_weight)` for every job keyword whose similarity to
//!   the lowercased title exceeds `similarity_threshold`
//! - `domain_bonus` when the title mentions one of [`DOMAIN_KEYWORDS`]
//! - `level_weight * level`
//!
//! Sections scoring zero or less are dropped; the rest are ordered by score,
//! keeping input order between equal scores.

use crate::sections::Section;
use once_cell::sync::Lazy;
use regex::Regex;

/// Title fragments that earn the domain bonus
pub const DOMAIN_KEYWORDS: [&str; 5] = [
    "guide",
    "activities",
    "restaurants",
    "hotels",
    "things to do",
];

static KEYWORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w{4,}\b").unwrap());

/// Options for section ranking
#[derive(Debug, Clone)]
pub struct RankingOptions {
    /// Number of sections kept
    pub max_results: usize,
    /// Similarity a keyword must exceed to count
    pub similarity_threshold: f64,
    /// Multiplier applied to a counted similarity before flooring
    pub keyword_weight: f64,
    /// Flat bonus for a domain keyword in the title
    pub domain_bonus: f64,
    /// Multiplier applied to the heading size
    pub level_weight: f64,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            similarity_threshold: 0.7,
            keyword_weight: 15.0,
            domain_bonus: 10.0,
            level_weight: 0.5,
        }
    }
}

/// A section with its relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSection {
    pub section: Section,
    pub relevance_score: f64,
}

/// Lowercase words of at least four word characters, in order of appearance
pub fn extract_keywords(job: &str) -> Vec<String> {
    let lower = job.to_lowercase();
    KEYWORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Gestalt (Ratcliff/Obershelp) similarity of two strings, in `[0, 1]`.
///
/// Matching characters are counted by taking the longest common substring,
/// then recursing on the pieces left and right of it. The ratio is
/// `2 * matches / (len(a) + len(b))`, and `1.0` for two empty strings.
/// Comparison is case-insensitive.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, size) = longest_match(a, b);
    if size == 0 {
        return 0;
    }
    size + matching_chars(&a[..i], &b[..j])
        + matching_chars(&a[i + size..], &b[j + size..])
}

/// Longest common substring as `(start_a, start_b, len)`.
///
/// Ties keep the match starting earliest in `a`, then earliest in `b`.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // lengths[j + 1] = length of the common suffix ending at a[i], b[j]
    let mut lengths = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        let mut next = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let len = lengths[j] + 1;
                next[j + 1] = len;
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            }
        }
        lengths = next;
    }

    best
}

/// Score one section against pre-extracted job keywords
pub fn score_section(section: &Section, keywords: &[String], options: &RankingOptions) -> f64 {
    let title = section.title.to_lowercase();
    let mut score = 0.0;

    for keyword in keywords {
        let ratio = similarity(keyword, &title);
        if ratio > options.similarity_threshold {
            score += (ratio * options.keyword_weight).floor();
        }
    }

    if DOMAIN_KEYWORDS.iter().any(|k| title.contains(k)) {
        score += options.domain_bonus;
    }

    score + options.level_weight * f64::from(section.level)
}

/// Score, filter and order sections, keeping at most `max_results`
pub fn rank_sections(
    sections: Vec<Section>,
    job: &str,
    options: &RankingOptions,
) -> Vec<RankedSection> {
    let keywords = extract_keywords(job);
    log::debug!("ranking {} sections against {:?}", sections.len(), keywords);

    let mut ranked: Vec<RankedSection> = sections
        .into_iter()
        .map(|section| RankedSection {
            relevance_score: score_section(&section, &keywords, options),
            section,
        })
        .filter(|r| r.relevance_score > 0.0)
        .collect();

    ranked.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(options.max_results);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::BBox;

    fn section(title: &str, level: i32) -> Section {
        Section {
            document: "doc.pdf".into(),
            title: title.into(),
            page: 0,
            bbox: BBox::default(),
            level,
            content: "content".into(),
        }
    }

    #[test]
    fn test_extract_keywords() {
        assert_eq!(
            extract_keywords("Plan a trip of 4 days for a group of 10 college friends."),
            vec!["plan", "trip", "days", "group", "college", "friends"]
        );
        assert!(extract_keywords("a to be").is_empty());
    }

    #[test]
    fn test_similarity_known_values() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert_eq!(similarity("hotels", "Hotels"), 1.0);
        // "abcd" vs "bcde": one block "bcd"
        assert!((similarity("abcd", "bcde") - 0.75).abs() < 1e-9);
        // only the leading "t" of "tide" pairs up; the rest lies left of it in "diet"
        assert!((similarity("tide", "diet") - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_counts_blocks_on_both_sides() {
        // "ab" then "de" around the unmatched middle
        assert!((similarity("abXde", "abYde") - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_longest_match_prefers_earliest() {
        let a: Vec<char> = "abab".chars().collect();
        let b: Vec<char> = "ab".chars().collect();
        assert_eq!(longest_match(&a, &b), (0, 0, 2));
    }

    #[test]
    fn test_score_components() {
        let options = RankingOptions::default();
        let keywords = vec!["hotels".to_string()];
        // keyword exact match: floor(1.0 * 15) + domain bonus + 0.5 * 12
        let score = score_section(&section("Hotels", 12), &keywords, &options);
        assert_eq!(score, 15.0 + 10.0 + 6.0);

        let score = score_section(&section("Appendix", 12), &keywords, &options);
        assert_eq!(score, 6.0);
    }

    #[test]
    fn test_zero_score_sections_excluded() {
        let ranked = rank_sections(
            vec![section("Appendix", 0), section("City Guide", 14)],
            "Plan a trip",
            &RankingOptions::default(),
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].section.title, "City Guide");
        assert_eq!(ranked[0].relevance_score, 17.0);
    }

    #[test]
    fn test_stable_order_and_cap() {
        let sections = (0..8).map(|i| section(&format!("Part {}", i), 12)).collect();
        let options = RankingOptions {
            max_results: 3,
            ..Default::default()
        };
        let ranked = rank_sections(sections, "nothing relevant", &options);
        let titles: Vec<_> = ranked.iter().map(|r| r.section.title.as_str()).collect();
        assert_eq!(titles, vec!["Part 0", "Part 1", "Part 2"]);
    }

    #[test]
    fn test_family_activities_example() {
        let job = "Plan a trip with activities and restaurants for families";
        let ranked = rank_sections(
            vec![
                section("Appendix", 0),
                section("Family-Friendly Activities Guide", 16),
            ],
            job,
            &RankingOptions::default(),
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].section.title, "Family-Friendly Activities Guide");
        assert!(ranked[0].relevance_score >= 18.0);
    }
}
