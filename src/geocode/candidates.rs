use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]+)\)").unwrap());

// Campus localities that show up inside institution names. When one does, a
// query with the alias as locality hint is appended; the value replaces the
// key so multi-campus systems land on the right city (e.g. Zhejiang's main
// campus is in Hangzhou).
const CITY_ALIASES: &[(&str, &str)] = &[
    ("New York", "New York"),
    ("California", "California"),
    ("Paris", "Paris"),
    ("Madrid", "Madrid"),
    ("Barcelona", "Barcelona"),
    ("Berlin", "Berlin"),
    ("Munich", "Munich"),
    ("Auckland", "Auckland"),
    ("Lyon", "Lyon"),
    ("Bordeaux", "Bordeaux"),
    ("Orleans", "Orleans"),
    ("Rennes", "Rennes"),
    ("Darmstadt", "Darmstadt"),
    ("Freiburg", "Freiburg"),
    ("Erlangen", "Erlangen"),
    ("Linz", "Linz"),
    ("Mons", "Mons"),
    ("Scranton", "Scranton"),
    ("Albany", "Albany"),
    ("Nagoya", "Nagoya"),
    ("Sunchon", "Sunchon"),
    ("Zhejiang", "Hangzhou"),
    ("Nottingham", "Nottingham"),
];

/// First-pass queries, strongest first. Empty parts are dropped and
/// duplicates pruned while keeping order.
pub fn base_queries(name: &str, city: Option<&str>, country: Option<&str>) -> Vec<String> {
    let mut queries = vec![joined(&[Some(name), city, country])];
    push_name_variants(&mut queries, name, country);
    if let (Some(city), Some(country)) = (city, country) {
        queries.push(joined(&[Some(city), Some(country)]));
    }
    dedup(queries)
}

/// Expanded queries for the retry pass over still-unresolved records.
pub fn retry_queries(name: &str, country: Option<&str>) -> Vec<String> {
    let mut queries = vec![joined(&[Some(name), country])];
    push_name_variants(&mut queries, name, country);

    if name.contains("The ") {
        queries.push(name.replace("The ", ""));
    }
    if name.contains("University") {
        if let Some(prefix) = name.split(',').next() {
            queries.push(prefix.trim().to_string());
        }
    }
    if let Some((_, alias)) = CITY_ALIASES.iter().find(|(key, _)| name.contains(key)) {
        queries.push(format!("{}, {}", name, alias));
    }

    dedup(queries)
}

/// Shared degradations: the parenthetical short form, and for universities the
/// part before the parenthesis.
fn push_name_variants(queries: &mut Vec<String>, name: &str, country: Option<&str>) {
    if let Some(caps) = PAREN_RE.captures(name) {
        queries.push(joined(&[Some(caps[1].trim()), country]));
    }
    if name.contains("University") {
        let main = name.split('(').next().unwrap_or(name).trim();
        queries.push(joined(&[Some(main), country]));
    }
}

fn joined(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .filter_map(|p| *p)
        .filter(|p| !p.is_empty())
        .join(", ")
}

fn dedup(queries: Vec<String>) -> Vec<String> {
    queries
        .into_iter()
        .filter(|q| !q.is_empty())
        .unique()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_full() {
        let q = base_queries("Heidelberg University", Some("Heidelberg"), Some("Germany"));
        assert_eq!(
            q,
            vec![
                "Heidelberg University, Heidelberg, Germany",
                "Heidelberg University, Germany",
                "Heidelberg, Germany",
            ]
        );
    }

    #[test]
    fn base_without_city_dedups() {
        let q = base_queries("Heidelberg University", None, Some("Germany"));
        assert_eq!(q, vec!["Heidelberg University, Germany"]);
    }

    #[test]
    fn base_parenthetical_short_form() {
        let q = base_queries("Seoul National University (SNU)", None, Some("South Korea"));
        assert_eq!(
            q,
            vec![
                "Seoul National University (SNU), South Korea",
                "SNU, South Korea",
                "Seoul National University, South Korea",
            ]
        );
    }

    #[test]
    fn base_skips_empty_parts() {
        let q = base_queries("東京藝術大学", Some(""), None);
        assert_eq!(q, vec!["東京藝術大学"]);
    }

    #[test]
    fn retry_article_and_alias() {
        let q = retry_queries("The University of Auckland", Some("New Zealand"));
        assert_eq!(
            q,
            vec![
                "The University of Auckland, New Zealand",
                "University of Auckland",
                "The University of Auckland",
                "The University of Auckland, Auckland",
            ]
        );
    }

    #[test]
    fn retry_comma_truncation() {
        let q = retry_queries("University of California, Davis", Some("United States"));
        assert!(q.contains(&"University of California".to_string()));
    }

    #[test]
    fn retry_alias_substitution() {
        let q = retry_queries("Zhejiang University", Some("China"));
        assert_eq!(q.last().unwrap(), "Zhejiang University, Hangzhou");
    }

    #[test]
    fn retry_plain_name_single_query() {
        let q = retry_queries("Universität Wien", Some("Austria"));
        assert_eq!(q, vec!["Universität Wien, Austria"]);
    }
}
