//! Result aggregation.
//!
//! Turns raw answers into per-question summaries without exposing any
//! individual response. Every request recomputes from scratch.

use std::collections::{BTreeMap, HashMap};

use askanai_db::{
    entities::{answer, question::QuestionType},
    repositories::QuestionWithOptions,
};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Rating scale used when a question does not configure one.
pub const DEFAULT_RATING_SCALE: u32 = 5;

/// Emoji set used when a question does not configure one.
pub const DEFAULT_EMOJIS: [&str; 5] = ["😍", "😊", "😐", "😕", "😢"];

/// Count and share for one choice label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
    pub percent: i64,
}

/// Count and share for one emoji.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmojiCount {
    pub emoji: String,
    pub count: u64,
    pub percent: i64,
}

/// Summary of one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuestionSummary {
    Choice(Vec<LabelCount>),
    #[serde(rename_all = "camelCase")]
    Rating {
        /// Mean formatted with one decimal.
        average: String,
        scale: u32,
        /// Percent of answers per bucket `1..=scale`.
        distribution: Vec<i64>,
    },
    #[serde(rename_all = "camelCase")]
    Nps {
        nps_score: i64,
        detractors: i64,
        passives: i64,
        promoters: i64,
    },
    Emoji(Vec<EmojiCount>),
}

/// Round half up, as browsers do for display percentages.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn percent(count: u64, total: u64) -> i64 {
    round_half_up(count as f64 / total.max(1) as f64 * 100.0)
}

/// Rating scale configured in `settings_json.scale`.
#[must_use]
pub fn rating_scale(settings: Option<&JsonValue>) -> u32 {
    settings
        .and_then(|s| s.get("scale"))
        .and_then(JsonValue::as_u64)
        .filter(|&scale| scale > 0)
        .map_or(DEFAULT_RATING_SCALE, |scale| scale.min(100) as u32)
}

/// Emoji set configured in `settings_json.emojis`.
#[must_use]
pub fn emoji_set(settings: Option<&JsonValue>) -> Vec<String> {
    let configured: Vec<String> = settings
        .and_then(|s| s.get("emojis"))
        .and_then(JsonValue::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|v| match v {
                    JsonValue::String(s) => Some(s.clone()),
                    JsonValue::Null => None,
                    other => Some(other.to_string()),
                })
                .collect()
        })
        .unwrap_or_default();

    if configured.is_empty() {
        DEFAULT_EMOJIS.iter().map(|e| (*e).to_string()).collect()
    } else {
        configured
    }
}

/// Count answers per key. Duplicate keys share one counter; the total counts
/// each matched value once.
fn tally(keys: &[String], answers: &[&answer::Model], include_lists: bool) -> (HashMap<String, u64>, u64) {
    let mut counts: HashMap<String, u64> = keys.iter().map(|k| (k.clone(), 0)).collect();
    let mut total = 0u64;

    let mut bump = |value: &str| {
        if let Some(count) = counts.get_mut(value) {
            *count += 1;
            total += 1;
        }
    };

    for answer in answers {
        if let Some(text) = answer.value_text.as_deref() {
            bump(text);
        }
        if include_lists && let Some(JsonValue::Array(items)) = &answer.value_json {
            for item in items {
                match item {
                    JsonValue::String(s) => bump(s),
                    other => bump(&other.to_string()),
                }
            }
        }
    }

    (counts, total)
}

fn summarize_choice(question: &QuestionWithOptions, answers: &[&answer::Model]) -> QuestionSummary {
    let labels: Vec<String> = question.options.iter().map(|o| o.label.clone()).collect();
    let (counts, total) = tally(&labels, answers, true);

    QuestionSummary::Choice(
        labels
            .into_iter()
            .map(|label| {
                let count = counts.get(&label).copied().unwrap_or(0);
                LabelCount {
                    percent: percent(count, total),
                    label,
                    count,
                }
            })
            .collect(),
    )
}

fn numbers<'a>(answers: &'a [&'a answer::Model]) -> impl Iterator<Item = f64> + 'a {
    answers
        .iter()
        .filter_map(|a| a.value_number)
        .filter(|v| v.is_finite())
}

fn summarize_rating(question: &QuestionWithOptions, answers: &[&answer::Model]) -> QuestionSummary {
    let scale = rating_scale(question.question.settings_json.as_ref());
    let values: Vec<f64> = numbers(answers).collect();

    let average = if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    };

    let mut buckets = vec![0u64; scale as usize];
    for v in &values {
        if v.fract() == 0.0 && *v >= 1.0 && *v <= f64::from(scale) {
            buckets[*v as usize - 1] += 1;
        }
    }
    let total = values.len() as u64;

    QuestionSummary::Rating {
        average: format!("{average:.1}"),
        scale,
        distribution: buckets.into_iter().map(|c| percent(c, total)).collect(),
    }
}

fn summarize_nps(answers: &[&answer::Model]) -> QuestionSummary {
    let (mut detractors, mut passives, mut promoters) = (0u64, 0u64, 0u64);
    for v in numbers(answers) {
        if v <= 6.0 {
            detractors += 1;
        } else if v >= 9.0 {
            promoters += 1;
        } else if (7.0..=8.0).contains(&v) {
            passives += 1;
        }
    }
    let total = numbers(answers).count().max(1) as f64;

    QuestionSummary::Nps {
        nps_score: round_half_up((promoters as f64 - detractors as f64) / total * 100.0),
        detractors: round_half_up(detractors as f64 / total * 100.0),
        passives: round_half_up(passives as f64 / total * 100.0),
        promoters: round_half_up(promoters as f64 / total * 100.0),
    }
}

fn summarize_emoji(question: &QuestionWithOptions, answers: &[&answer::Model]) -> QuestionSummary {
    let emojis = emoji_set(question.question.settings_json.as_ref());
    let (counts, total) = tally(&emojis, answers, false);

    QuestionSummary::Emoji(
        emojis
            .into_iter()
            .map(|emoji| {
                let count = counts.get(&emoji).copied().unwrap_or(0);
                EmojiCount {
                    percent: percent(count, total),
                    emoji,
                    count,
                }
            })
            .collect(),
    )
}

/// Summarize one question. Free text and ranking questions have no summary.
#[must_use]
pub fn summarize(question: &QuestionWithOptions, answers: &[&answer::Model]) -> Option<QuestionSummary> {
    match question.question.question_type {
        QuestionType::SingleChoice | QuestionType::MultipleChoice => {
            Some(summarize_choice(question, answers))
        }
        QuestionType::Rating => Some(summarize_rating(question, answers)),
        QuestionType::Nps => Some(summarize_nps(answers)),
        QuestionType::Emoji => Some(summarize_emoji(question, answers)),
        QuestionType::ShortText | QuestionType::Ranking => None,
    }
}

/// Summaries keyed by question id. Answers to unknown questions are ignored.
#[must_use]
pub fn aggregate(
    questions: &[QuestionWithOptions],
    answers: &[answer::Model],
) -> BTreeMap<String, Option<QuestionSummary>> {
    let mut by_question: HashMap<&str, Vec<&answer::Model>> = HashMap::new();
    for answer in answers {
        by_question
            .entry(answer.question_id.as_str())
            .or_default()
            .push(answer);
    }

    questions
        .iter()
        .map(|q| {
            let answers = by_question
                .get(q.question.id.as_str())
                .map_or(&[][..], Vec::as_slice);
            (q.question.id.clone(), summarize(q, answers))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use askanai_db::entities::{poll_option, question};
    use chrono::Utc;
    use serde_json::json;

    fn question(id: &str, kind: QuestionType, labels: &[&str], settings: Option<JsonValue>) -> QuestionWithOptions {
        let now = Utc::now().fixed_offset();
        QuestionWithOptions {
            question: question::Model {
                id: id.to_string(),
                poll_id: "p1".to_string(),
                position: 0,
                question_type: kind,
                prompt: "?".to_string(),
                is_required: false,
                settings_json: settings,
                created_at: now,
            },
            options: labels
                .iter()
                .enumerate()
                .map(|(i, label)| poll_option::Model {
                    id: format!("{id}-o{i}"),
                    question_id: id.to_string(),
                    position: i as i32,
                    label: (*label).to_string(),
                    created_at: now,
                })
                .collect(),
        }
    }

    fn answer(qid: &str, text: Option<&str>, number: Option<f64>, list: Option<JsonValue>) -> answer::Model {
        answer::Model {
            id: ulid_like(),
            response_id: "r".to_string(),
            question_id: qid.to_string(),
            value_text: text.map(str::to_string),
            value_number: number,
            value_json: list,
            created_at: Utc::now().fixed_offset(),
        }
    }

    fn ulid_like() -> String {
        askanai_common::IdGenerator::new().generate()
    }

    fn text(qid: &str, v: &str) -> answer::Model {
        answer(qid, Some(v), None, None)
    }

    fn num(qid: &str, v: f64) -> answer::Model {
        answer(qid, None, Some(v), None)
    }

    #[test]
    fn test_single_choice_two_to_one() {
        let q = question("q1", QuestionType::SingleChoice, &["A", "B"], None);
        let answers = vec![text("q1", "A"), text("q1", "A"), text("q1", "B")];

        let results = aggregate(&[q], &answers);

        assert_eq!(
            results["q1"],
            Some(QuestionSummary::Choice(vec![
                LabelCount { label: "A".to_string(), count: 2, percent: 67 },
                LabelCount { label: "B".to_string(), count: 1, percent: 33 },
            ]))
        );
    }

    #[test]
    fn test_choice_without_answers_is_all_zero() {
        let q = question("q1", QuestionType::MultipleChoice, &["A", "B", "C"], None);
        let Some(QuestionSummary::Choice(counts)) = summarize(&q, &[]) else {
            panic!("expected choice summary");
        };
        assert!(counts.iter().all(|c| c.count == 0 && c.percent == 0));
    }

    #[test]
    fn test_multiple_choice_counts_selections() {
        let q = question("q1", QuestionType::MultipleChoice, &["A", "B"], None);
        let answers = vec![
            answer("q1", None, None, Some(json!(["A", "B"]))),
            answer("q1", None, None, Some(json!(["A", "Z"]))),
        ];

        let results = aggregate(&[q], &answers);
        let Some(QuestionSummary::Choice(counts)) = &results["q1"] else {
            panic!("expected choice summary");
        };

        // Denominator is selections (3), not respondents (2).
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[0].percent, 67);
        assert_eq!(counts[1].count, 1);
        assert_eq!(counts.iter().map(|c| c.count).sum::<u64>(), 3);
    }

    #[test]
    fn test_rating_average_and_distribution() {
        let q = question("q1", QuestionType::Rating, &[], Some(json!({ "scale": 5 })));
        let answers = vec![num("q1", 5.0), num("q1", 4.0), num("q1", 4.0), num("q1", 2.0)];

        assert_eq!(
            summarize(&q, &answers.iter().collect::<Vec<_>>()),
            Some(QuestionSummary::Rating {
                average: "3.8".to_string(),
                scale: 5,
                distribution: vec![0, 25, 0, 50, 25],
            })
        );
    }

    #[test]
    fn test_rating_empty_defaults() {
        let q = question("q1", QuestionType::Rating, &[], None);
        assert_eq!(
            summarize(&q, &[]),
            Some(QuestionSummary::Rating {
                average: "0.0".to_string(),
                scale: 5,
                distribution: vec![0; 5],
            })
        );
    }

    #[test]
    fn test_nps_buckets() {
        let q = question("q1", QuestionType::Nps, &[], None);
        let answers = vec![num("q1", 10.0), num("q1", 9.0), num("q1", 8.0), num("q1", 3.0)];

        assert_eq!(
            summarize(&q, &answers.iter().collect::<Vec<_>>()),
            Some(QuestionSummary::Nps {
                nps_score: 25,
                detractors: 25,
                passives: 25,
                promoters: 50,
            })
        );
    }

    #[test]
    fn test_emoji_default_set_ignores_lists() {
        let q = question("q1", QuestionType::Emoji, &[], None);
        let answers = vec![
            text("q1", "😍"),
            text("q1", "😢"),
            answer("q1", None, None, Some(json!(["😍"]))),
        ];

        let Some(QuestionSummary::Emoji(counts)) = summarize(&q, &answers.iter().collect::<Vec<_>>())
        else {
            panic!("expected emoji summary");
        };
        assert_eq!(counts.len(), 5);
        assert_eq!(counts[0].count, 1);
        assert_eq!(counts[0].percent, 50);
        assert_eq!(counts[4].count, 1);
    }

    #[test]
    fn test_text_and_ranking_have_no_summary() {
        let text_q = question("q1", QuestionType::ShortText, &[], None);
        let rank_q = question("q2", QuestionType::Ranking, &["A", "B"], None);

        let results = aggregate(&[text_q, rank_q], &[text("q1", "hello")]);

        assert_eq!(results["q1"], None);
        assert_eq!(results["q2"], None);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let q = question("q1", QuestionType::SingleChoice, &["A", "B"], None);
        let answers = vec![text("q1", "A"), text("q1", "B")];

        assert_eq!(aggregate(&[q.clone()], &answers), aggregate(&[q], &answers));
    }

    #[test]
    fn test_wire_shape() {
        let q = question("q1", QuestionType::Nps, &[], None);
        let value = serde_json::to_value(summarize(&q, &[])).unwrap();
        assert_eq!(
            value,
            json!({ "npsScore": 0, "detractors": 0, "passives": 0, "promoters": 0 })
        );
    }
}
