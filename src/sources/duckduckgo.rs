//! Web search through the `DuckDuckGo` instant-answer API (no key required)
//!
//! The instant-answer endpoint matches topics, not sentences, so a question
//! like "What are the symptoms of anemia?" is reduced to "symptoms anemia"
//! before it is sent.

use super::{within, KnowledgeSource, SourceError};
use crate::state_machine::Passage;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.duckduckgo.com/";
const MAX_RELATED: usize = 5;

/// Interrogatives, auxiliaries, pronouns and fillers dropped from questions
const QUESTION_WORDS: &[&str] = &[
    "a", "am", "an", "and", "are", "be", "can", "could", "do", "does", "for", "how", "i",
    "if", "in", "is", "it", "me", "my", "of", "on", "or", "please", "should", "tell", "the",
    "to", "was", "what", "when", "where", "which", "who", "why", "will", "with", "would",
    "you",
];

pub struct DuckDuckGo {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl DuckDuckGo {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl KnowledgeSource for DuckDuckGo {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Passage>, SourceError> {
        let topic = topic_query(query);
        tracing::debug!(%topic, "Web lookup");

        within(self.timeout, async {
            let answer: InstantAnswer = self
                .client
                .get(&self.endpoint)
                .query(&[
                    ("q", topic.as_str()),
                    ("format", "json"),
                    ("no_html", "1"),
                    ("skip_disambig", "1"),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            combine(&answer)
                .map(|text| vec![Passage::new(text)])
                .ok_or(SourceError::Empty)
        })
        .await
    }
}

/// Content words of `question`, or the trimmed question when nothing else remains
fn topic_query(question: &str) -> String {
    let words: Vec<&str> = question
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .filter(|word| !QUESTION_WORDS.contains(&word.to_lowercase().as_str()))
        .collect();

    if words.is_empty() {
        question.trim().to_string()
    } else {
        words.join(" ")
    }
}

/// Abstract followed by related-topic snippets, as one passage
fn combine(answer: &InstantAnswer) -> Option<String> {
    let mut parts = Vec::new();
    if !answer.abstract_text.trim().is_empty() {
        parts.push(answer.abstract_text.trim());
    }
    parts.extend(
        answer
            .related_topics
            .iter()
            .flat_map(RelatedTopic::texts)
            .take(MAX_RELATED),
    );

    (!parts.is_empty()).then(|| parts.join("\n"))
}

#[derive(Debug, Default, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

/// Either a single topic or a named group of topics
#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: Option<String>,
    #[serde(rename = "Topics", default)]
    topics: Vec<RelatedTopic>,
}

impl RelatedTopic {
    fn texts(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .into_iter()
            .collect();
        out.extend(self.topics.iter().flat_map(RelatedTopic::texts));
        out
    }
}
