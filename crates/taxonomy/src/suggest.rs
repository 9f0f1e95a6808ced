//! Heuristic ranking of existing categories for a product.

use serde::{Deserialize, Serialize};

use spm_core::NodeId;

use crate::export::PATH_SEPARATOR;
use crate::hierarchy::HierarchyNode;
use crate::node::NodeType;

/// Technology families and the terms that signal them.
const KEYWORD_FAMILIES: &[(&str, &[&str])] = &[
    ("database", &["database", "db", "sql", "nosql", "mongodb", "postgres", "mysql", "oracle", "redis", "data"]),
    ("web", &["web", "website", "portal", "frontend", "backend", "api", "rest", "http", "browser"]),
    ("mobile", &["mobile", "ios", "android", "app", "smartphone", "tablet", "react native", "flutter"]),
    ("analytics", &["analytics", "reporting", "dashboard", "metrics", "kpi", "bi", "intelligence", "visualization"]),
    ("security", &["security", "auth", "authentication", "authorization", "firewall", "encryption", "ssl", "cert"]),
    ("cloud", &["cloud", "aws", "azure", "gcp", "saas", "paas", "iaas", "serverless", "container", "kubernetes"]),
    ("integration", &["integration", "api", "middleware", "etl", "connector", "sync", "webhook", "message"]),
    ("development", &["development", "dev", "code", "git", "ci", "cd", "build", "deploy", "testing", "framework"]),
    ("monitoring", &["monitoring", "logging", "alerting", "performance", "uptime", "health", "metrics", "observability"]),
    ("collaboration", &["collaboration", "team", "communication", "chat", "meeting", "document", "share", "workflow"]),
    ("crm", &["crm", "customer", "sales", "lead", "contact", "opportunity", "pipeline", "relationship"]),
    ("erp", &["erp", "finance", "accounting", "inventory", "supply", "procurement", "hr", "payroll"]),
    ("content", &["content", "cms", "document", "file", "media", "asset", "publish", "editorial"]),
    ("ecommerce", &["ecommerce", "commerce", "shop", "cart", "payment", "checkout", "product", "order"]),
    ("network", &["network", "router", "switch", "firewall", "vpn", "lan", "wan", "dns", "ip"]),
];

const MAX_CONFIDENCE: f64 = 0.95;
const MIN_CONFIDENCE: f64 = 0.1;
const FUZZY_THRESHOLD: f64 = 0.3;
const FUZZY_WEIGHT: f64 = 0.7;

/// A category together with the names of its line and portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCandidate {
    pub node_id: NodeId,
    pub name: String,
    pub description: String,
    pub portfolio_name: String,
    pub line_name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub taxonomy_node_id: NodeId,
    pub portfolio: String,
    pub line: String,
    pub category: String,
    pub confidence: f64,
    pub reasoning: String,
    pub path: String,
}

impl CategorySuggestion {
    fn new(candidate: &CategoryCandidate, confidence: f64, reasoning: String) -> Self {
        Self {
            taxonomy_node_id: candidate.node_id,
            portfolio: candidate.portfolio_name.clone(),
            line: candidate.line_name.clone(),
            category: candidate.name.clone(),
            confidence,
            reasoning,
            path: candidate.path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResult {
    pub suggestions: Vec<CategorySuggestion>,
    pub total_categories: usize,
    pub processing_time_ms: u64,
}

/// Every category reachable from the forest, with its portfolio/line context.
pub fn category_candidates(forest: &[HierarchyNode]) -> Vec<CategoryCandidate> {
    let mut out = Vec::new();
    for portfolio in forest {
        for line in &portfolio.children {
            for category in &line.children {
                if category.node.node_type() != NodeType::Category {
                    continue;
                }
                out.push(CategoryCandidate {
                    node_id: category.node.id,
                    name: category.node.name.clone(),
                    description: category.node.description.clone(),
                    portfolio_name: portfolio.node.name.clone(),
                    line_name: line.node.name.clone(),
                    path: [
                        portfolio.node.name.as_str(),
                        line.node.name.as_str(),
                        category.node.name.as_str(),
                    ]
                    .join(PATH_SEPARATOR),
                });
            }
        }
    }
    out
}

/// Similarity of two strings in `[0, 1]`, case-insensitive.
///
/// Equal strings score 1.0, containment 0.8, otherwise the shared-word ratio
/// scaled to 0.6.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (a.trim().to_lowercase(), b.trim().to_lowercase());
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.8;
    }
    let words_a: Vec<&str> = a.split_whitespace().collect();
    let words_b: Vec<&str> = b.split_whitespace().collect();
    let common = words_a.iter().filter(|w| words_b.contains(w)).count();
    if common == 0 {
        return 0.0;
    }
    common as f64 / words_a.len().max(words_b.len()) as f64 * 0.6
}

/// Rank `candidates` for a product, best first, at most `limit` entries.
///
/// Keyword scoring runs first; when it yields nothing, plain name and
/// description similarity is used at a reduced weight.
pub fn suggest_categories(
    product_name: &str,
    product_description: Option<&str>,
    candidates: &[CategoryCandidate],
    limit: usize,
) -> Vec<CategorySuggestion> {
    let mut suggestions: Vec<CategorySuggestion> = candidates
        .iter()
        .filter_map(|c| keyword_score(product_name, product_description, c))
        .collect();

    if suggestions.is_empty() {
        suggestions = candidates
            .iter()
            .filter_map(|c| fuzzy_score(product_name, product_description, c))
            .collect();
    }

    suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    suggestions.truncate(limit);
    suggestions
}

fn keyword_score(
    product_name: &str,
    product_description: Option<&str>,
    candidate: &CategoryCandidate,
) -> Option<CategorySuggestion> {
    let product_name_lc = product_name.trim().to_lowercase();
    let search_text = format!("{product_name} {}", product_description.unwrap_or_default()).to_lowercase();
    let category_name = candidate.name.to_lowercase();
    let category_description = candidate.description.to_lowercase();

    let mut confidence = 0.0;
    let mut reasons = Vec::new();

    let name_hit = (!category_name.is_empty() && search_text.contains(&category_name))
        || (!product_name_lc.is_empty() && category_name.contains(&product_name_lc));
    if name_hit {
        confidence += 0.4;
        reasons.push(format!("Product name matches category \"{}\"", candidate.name));
    }

    if let Some(description) = product_description {
        let category_words: Vec<&str> = category_description.split_whitespace().collect();
        let description_lc = description.to_lowercase();
        let matching: Vec<&str> = description_lc
            .split_whitespace()
            .filter(|word| word.chars().count() > 3)
            .filter(|word| category_words.iter().any(|c| c.contains(word) || word.contains(c)))
            .collect();
        if !matching.is_empty() {
            confidence += f64::min(0.3, matching.len() as f64 * 0.1);
            reasons.push(format!(
                "Description contains related terms: {}",
                matching.iter().take(3).copied().collect::<Vec<_>>().join(", ")
            ));
        }
    }

    for (family, keywords) in KEYWORD_FAMILIES {
        let matching: Vec<&str> = keywords
            .iter()
            .copied()
            .filter(|k| {
                search_text.contains(k)
                    && (category_name.contains(family) || category_description.contains(k))
            })
            .collect();
        if !matching.is_empty() {
            confidence += f64::min(0.25, matching.len() as f64 * 0.08);
            reasons.push(format!(
                "Technology keywords match: {}",
                matching.iter().take(2).copied().collect::<Vec<_>>().join(", ")
            ));
        }
    }

    let portfolio = candidate.portfolio_name.to_lowercase();
    let line = candidate.line_name.to_lowercase();
    if (!portfolio.is_empty() && search_text.contains(&portfolio))
        || (!line.is_empty() && search_text.contains(&line))
    {
        confidence += 0.15;
        reasons.push(format!(
            "Context matches portfolio/line: {}{PATH_SEPARATOR}{}",
            candidate.portfolio_name, candidate.line_name
        ));
    }

    if category_description.chars().count() > 20 {
        confidence += 0.05;
    }

    if confidence <= MIN_CONFIDENCE {
        return None;
    }
    let reasoning = if reasons.is_empty() {
        "Basic keyword matching".to_string()
    } else {
        reasons.join("; ")
    };
    Some(CategorySuggestion::new(candidate, confidence.min(MAX_CONFIDENCE), reasoning))
}

fn fuzzy_score(
    product_name: &str,
    product_description: Option<&str>,
    candidate: &CategoryCandidate,
) -> Option<CategorySuggestion> {
    let by_name = name_similarity(product_name, &candidate.name);
    let by_description = product_description
        .map(|d| name_similarity(d, &candidate.description))
        .unwrap_or(0.0);
    let best = by_name.max(by_description);
    if best <= FUZZY_THRESHOLD {
        return None;
    }
    Some(CategorySuggestion::new(
        candidate,
        best * FUZZY_WEIGHT,
        format!("Name/description similarity with {}", candidate.name),
    ))
}
