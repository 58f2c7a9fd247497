//! Topic tags for constitutional provisions.

/// Tag applied when no table entry matches.
pub const FALLBACK_TOPIC: &str = "constitutional_provision";

/// Article-level topics of the 1987 Constitution.
fn article_topics(article: u32) -> &'static [&'static str] {
    match article {
        1 => &["national_territory"],
        2 => &["state_policies", "principles"],
        3 => &["bill_of_rights", "civil_liberties"],
        4 => &["citizenship"],
        5 => &["suffrage", "elections"],
        6 => &["legislative_department", "congress"],
        7 => &["executive_department", "president"],
        8 => &["judicial_department", "judiciary"],
        9 => &["constitutional_commissions"],
        10 => &["local_government"],
        11 => &["accountability_of_public_officers", "impeachment"],
        12 => &["national_economy", "patrimony"],
        13 => &["social_justice", "human_rights"],
        14 => &["education", "science_and_technology", "arts_and_culture", "sports"],
        15 => &["family"],
        16 => &["general_provisions", "armed_forces"],
        17 => &["amendments_and_revisions"],
        18 => &["transitory_provisions"],
        _ => &[],
    }
}

/// Section-level topics of the Bill of Rights (Article III).
fn bill_of_rights_topics(section: u32) -> &'static [&'static str] {
    match section {
        1 => &["due_process", "equal_protection"],
        2 => &["search_and_seizure", "privacy"],
        3 => &["privacy_of_communication"],
        4 => &["freedom_of_expression", "freedom_of_speech", "freedom_of_assembly"],
        5 => &["freedom_of_religion"],
        6 => &["liberty_of_abode", "right_to_travel"],
        7 => &["right_to_information"],
        8 => &["right_to_association"],
        9 => &["eminent_domain", "just_compensation"],
        10 => &["non_impairment_of_contracts"],
        11 => &["access_to_courts", "free_legal_assistance"],
        12 => &["rights_of_the_accused", "custodial_investigation"],
        13 => &["right_to_bail"],
        14 => &["rights_of_the_accused", "presumption_of_innocence"],
        15 => &["writ_of_habeas_corpus"],
        16 => &["speedy_disposition_of_cases"],
        17 => &["self_incrimination"],
        18 => &["political_beliefs", "involuntary_servitude"],
        19 => &["cruel_and_unusual_punishment", "death_penalty"],
        20 => &["imprisonment_for_debt"],
        21 => &["double_jeopardy"],
        22 => &["ex_post_facto", "bill_of_attainder"],
        _ => &[],
    }
}

/// Topics of a provision, deduplicated in table order.
///
/// # Examples
/// ```
/// use lawph_harvester::parsers::topics::infer_topics;
///
/// let topics = infer_topics(Some(3), Some("1"));
/// assert!(topics.contains(&"bill_of_rights".to_string()));
/// assert!(topics.contains(&"due_process".to_string()));
/// assert_eq!(infer_topics(None, None), vec!["constitutional_provision"]);
/// ```
pub fn infer_topics(article: Option<u32>, section: Option<&str>) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    let mut push = |topic: &str| {
        if !topics.iter().any(|t| t == topic) {
            topics.push(topic.to_string());
        }
    };

    if let Some(article) = article {
        article_topics(article).iter().for_each(|t| push(t));

        if article == 3 {
            let section = section.and_then(|s| s.trim().parse::<u32>().ok());
            if let Some(section) = section {
                bill_of_rights_topics(section).iter().for_each(|t| push(t));
            }
        }
    }

    if topics.is_empty() {
        topics.push(FALLBACK_TOPIC.to_string());
    }
    topics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_article_has_topics() {
        for article in 1..=18 {
            assert!(!article_topics(article).is_empty(), "article {article}");
        }
    }

    #[test]
    fn test_bill_of_rights_sections() {
        assert_eq!(
            infer_topics(Some(3), Some("22")),
            vec!["bill_of_rights", "civil_liberties", "ex_post_facto", "bill_of_attainder"]
        );
    }

    #[test]
    fn test_topics_are_deduplicated() {
        let topics = infer_topics(Some(3), Some("14"));
        let unique: std::collections::HashSet<_> = topics.iter().collect();
        assert_eq!(unique.len(), topics.len());
    }

    #[test]
    fn test_unknown_article_falls_back() {
        assert_eq!(infer_topics(Some(42), Some("1")), vec![FALLBACK_TOPIC]);
    }

    #[test]
    fn test_section_topics_only_for_article_three() {
        assert_eq!(infer_topics(Some(4), Some("1")), vec!["citizenship"]);
    }
}
