use async_trait::async_trait;
use bv_core::{InferenceModel, Result};
use serde_json::json;
use std::fmt;

pub const DIMENSIONS: usize = 64;
const SECTIONS: [&str; 5] = ["Origins", "Rise", "Society and Culture", "Legacy", "Sources"];
const SENTENCES_PER_SECTION: usize = 15;

/// Offline model: echoes a well-formed article draft and hashes words into
/// a fixed-size embedding. Same input, same output.
#[derive(Default)]
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }

    fn topic(prompt: &str) -> &str {
        prompt
            .lines()
            .find_map(|line| line.strip_prefix("Topic:"))
            .map(str::trim)
            .filter(|topic| !topic.is_empty())
            .unwrap_or("Indian history")
    }

    fn section_body(topic: &str, heading: &str) -> String {
        let sentences = [
            format!("The {} of {} is recorded in inscriptions, coins and travellers' accounts.", heading.to_lowercase(), topic),
            format!("Historians compare these sources to separate legend from the likely course of events around {}.", topic),
            format!("Each generation of scholars has revisited {} with new evidence from archaeology and texts.", topic),
        ];
        sentences
            .iter()
            .cycle()
            .take(SENTENCES_PER_SECTION)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn bucket(token: &str) -> usize {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % DIMENSIONS as u64) as usize
}

#[async_trait]
impl InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn generate_text(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
        let topic = Self::topic(prompt);
        let sections: Vec<_> = SECTIONS
            .iter()
            .map(|heading| json!({ "heading": heading, "content": Self::section_body(topic, heading) }))
            .collect();
        let draft = json!({
            "title": topic,
            "summary": format!("An overview of {} drawn from the collected sources.", topic),
            "sections": sections,
            "tags": ["indian-history", topic],
        });
        Ok(serde_json::to_string_pretty(&draft)?)
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; DIMENSIONS];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            embedding[bucket(token)] += 1.0;
        }
        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(embedding)
    }
}
