//! Naming conventions shared by schemas, references and accessors

/// Lower-case the first character: `SiteTopPage` -> `siteTopPage`
pub fn camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Upper-case the first character: `opportunityId` -> `OpportunityId`
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Id attribute of an entity: `Opportunity` -> `opportunityId`
pub fn id_name(entity: &str) -> String {
    format!("{}Id", camel(entity))
}

/// English plural for entity names
pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.ends_with('y')
        && !matches!(
            lower.chars().rev().nth(1),
            Some('a' | 'e' | 'i' | 'o' | 'u')
        )
    {
        format!("{}ies", &word[..word.len() - 1])
    } else if lower.ends_with('s') || lower.ends_with('x') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}

/// Name of the secondary index partitioned on the given attributes
pub fn index_name(partition_keys: &[String]) -> String {
    let parts: Vec<String> = partition_keys.iter().map(|key| capitalize(key)).collect();
    format!("by{}", parts.join("And"))
}
