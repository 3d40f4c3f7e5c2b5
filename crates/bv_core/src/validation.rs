use std::collections::HashSet;
use url::Url;
use crate::types::{is_valid_article_id, Article};
use crate::{Error, Result};

/// Quality gate applied to generated articles before they are written.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    pub max_title_chars: usize,
    pub max_summary_chars: usize,
    pub min_words: usize,
    pub min_reading_minutes: u32,
    pub max_reading_minutes: u32,
    pub min_citations: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_title_chars: 200,
            max_summary_chars: 1000,
            min_words: 300,
            min_reading_minutes: 5,
            max_reading_minutes: 30,
            min_citations: 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArticleValidator {
    rules: ValidationRules,
}

impl ArticleValidator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Collects every problem instead of stopping at the first one.
    pub fn problems(&self, article: &Article) -> Vec<String> {
        let rules = &self.rules;
        let mut problems = Vec::new();

        if !is_valid_article_id(&article.id) {
            problems.push(format!("id '{}' is not of the form art_YYYYMMDD_NNN", article.id));
        }

        let title = article.title.trim();
        if title.is_empty() {
            problems.push("title is empty".to_string());
        } else if title.chars().count() > rules.max_title_chars {
            problems.push(format!("title exceeds {} characters", rules.max_title_chars));
        }

        let summary = article.summary.trim();
        if summary.is_empty() {
            problems.push("summary is empty".to_string());
        } else if summary.chars().count() > rules.max_summary_chars {
            problems.push(format!("summary exceeds {} characters", rules.max_summary_chars));
        }

        let words = article.word_count();
        if words < rules.min_words {
            problems.push(format!("content has {} words, need at least {}", words, rules.min_words));
        }

        let minutes = article.reading_time_minutes;
        if minutes < rules.min_reading_minutes || minutes > rules.max_reading_minutes {
            problems.push(format!(
                "reading time {} min outside {}..={}",
                minutes, rules.min_reading_minutes, rules.max_reading_minutes
            ));
        }

        if article.citations.len() < rules.min_citations {
            problems.push(format!(
                "{} citation(s), need at least {}",
                article.citations.len(),
                rules.min_citations
            ));
        }
        for citation in &article.citations {
            match Url::parse(&citation.source_url) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                _ => problems.push(format!("citation URL '{}' is not http(s)", citation.source_url)),
            }
        }

        if article.tags.is_empty() {
            problems.push("no tags".to_string());
        }
        for tag in &article.tags {
            if !is_kebab_case(tag) {
                problems.push(format!("tag '{}' is not lowercase kebab-case", tag));
            }
        }

        let mut orders = HashSet::new();
        for section in &article.sections {
            if !orders.insert(section.order) {
                problems.push(format!("section order {} appears more than once", section.order));
            }
        }

        problems
    }

    pub fn validate(&self, article: &Article) -> Result<()> {
        let problems = self.problems(article);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(problems))
        }
    }
}

fn is_kebab_case(tag: &str) -> bool {
    !tag.is_empty()
        && !tag.starts_with('-')
        && !tag.ends_with('-')
        && !tag.contains("--")
        && tag.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Normalizes free-form keywords into tags: "Mauryan Empire" -> "mauryan-empire".
pub fn to_tag(keyword: &str) -> String {
    keyword
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Citation, Section};
    use chrono::{NaiveDate, Utc};

    fn valid_article() -> Article {
        let content = "word ".repeat(2000);
        Article {
            id: "art_20260215_001".to_string(),
            title: "The Mauryan Empire".to_string(),
            summary: "The first pan-Indian empire.".to_string(),
            content,
            sections: vec![
                Section { heading: "Origins".into(), content: "..".into(), order: 1 },
                Section { heading: "Ashoka".into(), content: "..".into(), order: 2 },
            ],
            citations: vec![Citation {
                text: "Maurya Empire".into(),
                source_url: "https://en.wikipedia.org/wiki/Maurya_Empire".into(),
                source_name: "wikipedia".into(),
                accessed_date: Utc::now(),
            }],
            publication_date: NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(),
            reading_time_minutes: 10,
            author: "BharatVerse AI".into(),
            tags: vec!["ancient-india".into(), "mauryan-empire".into()],
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_article_passes() {
        let validator = ArticleValidator::default();
        assert!(validator.validate(&valid_article()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut article = valid_article();
        article.title = "  ".into();
        article.citations.clear();
        article.tags = vec!["Ancient India".into()];
        article.sections[1].order = 1;

        let problems = ArticleValidator::default().problems(&article);
        assert_eq!(problems.len(), 4, "{:?}", problems);
        assert!(problems.iter().any(|p| p.contains("title is empty")));
        assert!(problems.iter().any(|p| p.contains("citation")));
        assert!(problems.iter().any(|p| p.contains("kebab-case")));
        assert!(problems.iter().any(|p| p.contains("section order 1")));
    }

    #[test]
    fn test_rejects_short_content_and_bad_urls() {
        let mut article = valid_article();
        article.content = "too short".into();
        article.citations[0].source_url = "ftp://example.com/file".into();
        match ArticleValidator::default().validate(&article) {
            Err(Error::Validation(problems)) => {
                assert!(problems.iter().any(|p| p.contains("2 words")));
                assert!(problems.iter().any(|p| p.contains("not http(s)")));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_reading_time_bounds_are_configurable() {
        let mut article = valid_article();
        article.reading_time_minutes = 45;
        assert!(ArticleValidator::default().validate(&article).is_err());

        let lenient = ArticleValidator::new(ValidationRules {
            max_reading_minutes: 60,
            ..ValidationRules::default()
        });
        assert!(lenient.validate(&article).is_ok());
    }

    #[test]
    fn test_to_tag() {
        assert_eq!(to_tag("Mauryan Empire"), "mauryan-empire");
        assert_eq!(to_tag("  Gupta  period (320 CE) "), "gupta-period-320-ce");
        assert!(is_kebab_case(&to_tag("Chola / Navy")));
    }
}
