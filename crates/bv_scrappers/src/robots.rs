use bv_core::Result;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use crate::scrapers::html::parse_url;

#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    /// (allow, pattern)
    rules: Vec<(bool, String)>,
}

/// Parsed robots.txt. An empty file allows everything.
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    groups: Vec<Group>,
}

impl RobotsRules {
    pub fn parse(body: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut current: Option<Group> = None;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after rules starts a new group.
                    if current.as_ref().map(|g| !g.rules.is_empty()).unwrap_or(false) {
                        groups.extend(current.take());
                    }
                    current
                        .get_or_insert_with(Group::default)
                        .agents
                        .push(value.to_lowercase());
                }
                "allow" | "disallow" => {
                    if let Some(group) = current.as_mut() {
                        if !value.is_empty() {
                            group.rules.push((key == "allow", value.to_string()));
                        }
                    }
                }
                _ => {}
            }
        }
        groups.extend(current);
        Self { groups }
    }

    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        let agent = user_agent.to_lowercase();
        let specific: Vec<&Group> = self
            .groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| a != "*" && agent.contains(a.as_str())))
            .collect();
        let groups = if specific.is_empty() {
            self.groups
                .iter()
                .filter(|g| g.agents.iter().any(|a| a == "*"))
                .collect()
        } else {
            specific
        };

        // Longest match wins; allow wins ties.
        let mut best: Option<(usize, bool)> = None;
        for (allow, pattern) in groups.iter().flat_map(|g| g.rules.iter()) {
            if !pattern_matches(pattern, path) {
                continue;
            }
            let len = pattern.len();
            best = match best {
                Some((best_len, best_allow))
                    if best_len > len || (best_len == len && best_allow) =>
                {
                    Some((best_len, best_allow))
                }
                _ => Some((len, *allow)),
            };
        }
        best.map(|(_, allow)| allow).unwrap_or(true)
    }
}

/// Prefix match with `*` wildcards and an optional `$` end anchor.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };
    let mut pieces = pattern.split('*');
    let first = pieces.next().unwrap_or("");
    let Some(mut rest) = path.strip_prefix(first) else {
        return false;
    };
    let pieces: Vec<&str> = pieces.collect();
    for (i, piece) in pieces.iter().enumerate() {
        if anchored && i == pieces.len() - 1 {
            return rest.ends_with(piece);
        }
        match rest.find(piece) {
            Some(at) => rest = &rest[at + piece.len()..],
            None => return false,
        }
    }
    !anchored || rest.is_empty()
}

/// Per-origin robots.txt cache. Unreachable robots files allow everything
/// and are not cached, so they are retried on the next check.
pub struct RobotsCache {
    client: Client,
    user_agent: String,
    cache: RwLock<HashMap<String, Arc<RobotsRules>>>,
}

impl RobotsCache {
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn is_allowed(&self, url: &str) -> Result<bool> {
        let url = parse_url(url)?;
        let origin = url.origin().ascii_serialization();
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        if let Some(rules) = self.cache.read().await.get(&origin).cloned() {
            return Ok(rules.is_allowed(&self.user_agent, &path));
        }

        let robots_url = format!("{}/robots.txt", origin);
        let rules = match self.client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => {
                RobotsRules::parse(&response.text().await.unwrap_or_default())
            }
            Ok(response) if response.status().is_client_error() => RobotsRules::default(),
            Ok(response) => {
                warn!("Could not fetch {}: {}", robots_url, response.status());
                return Ok(true);
            }
            Err(e) => {
                warn!("Could not fetch {}: {}", robots_url, e);
                return Ok(true);
            }
        };

        let allowed = rules.is_allowed(&self.user_agent, &path);
        debug!("robots.txt for {}: {} allowed = {}", origin, path, allowed);
        self.cache.write().await.insert(origin, Arc::new(rules));
        Ok(allowed)
    }

    pub async fn cached_origins(&self) -> usize {
        self.cache.read().await.len()
    }
}
