//! Rating statistics derived from the comments themselves, independent of
//! any model call. Used to override the numbers a model reports when
//! summarizing.

use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use strum::Display;

use crate::models::comment::Comment;

/// A number only counts as a rating in free text when a rating marker follows
/// it ("4/5", "4 de 5", "4 estrellas", "4 stars"). Bare numbers such as
/// "llegó en 5 días" are ignored. Decimals ("3,5 estrellas", "4.5 stars") are
/// captured whole so the fraction is rejected rather than read as its last digit.
fn text_rating_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(?:^|[^\d.,])(\d+(?:[.,]\d+)?)\s*(?:/\s*5\b|de\s*5\b|estrellas?\b|stars?\b)",
        )
        .expect("static regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
    Mixed,
}

/// Counts of ratings per star value, always holding keys 1 through 5.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingDistribution([usize; 5]);

impl RatingDistribution {
    fn record(&mut self, rating: u8) {
        self.0[usize::from(rating - 1)] += 1;
    }

    pub fn count(&self, stars: u8) -> usize {
        match stars {
            1..=5 => self.0[usize::from(stars - 1)],
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Ratings of 4 or 5.
    pub fn positive(&self) -> usize {
        self.count(4) + self.count(5)
    }

    /// Ratings of 1 or 2.
    pub fn negative(&self) -> usize {
        self.count(1) + self.count(2)
    }
}

impl Serialize for RatingDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<String, usize> = (1..=5u8)
            .map(|stars| (stars.to_string(), self.count(stars)))
            .collect();
        map.serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentStats {
    /// Mean of accepted ratings, 2 decimals. `None` when nothing was rated.
    pub average_rating: Option<f64>,
    pub total_ratings: usize,
    pub rating_distribution: RatingDistribution,
    pub total_helpful_votes: u64,
    /// Derived from the average; `None` when there is no average.
    pub sentiment: Option<SentimentLabel>,
}

impl CommentStats {
    /// Share of comments carrying a usable rating, as a rounded percentage.
    pub fn rated_percentage(&self, total_comments: usize) -> u32 {
        if total_comments == 0 || self.total_ratings == 0 {
            return 0;
        }
        ((self.total_ratings as f64 / total_comments as f64) * 100.0).round() as u32
    }
}

/// Accept only whole numbers in 1..=5.
fn accept_rating(value: f64) -> Option<u8> {
    if value.fract() == 0.0 && (1.0..=5.0).contains(&value) {
        Some(value as u8)
    } else {
        None
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn rating_from_text(text: &str) -> Option<u8> {
    let captures = text_rating_pattern().captures(text)?;
    let number = captures.get(1)?.as_str().replace(',', ".").parse::<f64>().ok()?;
    accept_rating(number)
}

fn helpful_votes(value: &Value) -> Option<u64> {
    numeric(value)
        .filter(|v| *v > 0.0 && v.fract() == 0.0 && v.is_finite())
        .map(|v| v as u64)
}

fn comment_rating(comment: &Comment) -> Option<u8> {
    match comment {
        Comment::Structured(c) => c.rating().and_then(numeric).and_then(accept_rating),
        Comment::Text(text) => rating_from_text(text),
    }
}

fn derive_sentiment(average: f64, distribution: &RatingDistribution) -> SentimentLabel {
    let base = if average >= 4.0 {
        SentimentLabel::Positive
    } else if average >= 3.0 {
        SentimentLabel::Neutral
    } else {
        SentimentLabel::Negative
    };

    let positive = distribution.positive();
    let negative = distribution.negative();
    if positive > 0 && negative > 0 && positive.abs_diff(negative) <= 1 {
        SentimentLabel::Mixed
    } else {
        base
    }
}

/// Aggregate ratings, helpfulness and a coarse sentiment. Never fails.
pub fn compute_stats(comments: &[Comment]) -> CommentStats {
    let mut distribution = RatingDistribution::default();
    let mut rating_sum: u32 = 0;
    let mut total_helpful_votes: u64 = 0;

    for comment in comments {
        if let Some(rating) = comment_rating(comment) {
            distribution.record(rating);
            rating_sum += u32::from(rating);
        }

        if let Comment::Structured(c) = comment {
            if let Some(votes) = c.helpful_votes().and_then(helpful_votes) {
                total_helpful_votes = total_helpful_votes.saturating_add(votes);
            }
        }
    }

    let total_ratings = distribution.total();
    let average_rating = (total_ratings > 0)
        .then(|| (f64::from(rating_sum) / total_ratings as f64 * 100.0).round() / 100.0);
    let sentiment = average_rating.map(|avg| derive_sentiment(avg, &distribution));

    CommentStats {
        average_rating,
        total_ratings,
        rating_distribution: distribution,
        total_helpful_votes,
        sentiment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structured(value: Value) -> Comment {
        serde_json::from_value(value).unwrap()
    }

    fn rated(ratings: &[u8]) -> Vec<Comment> {
        ratings
            .iter()
            .map(|r| structured(json!({"calificacion": r})))
            .collect()
    }

    #[test]
    fn test_polarized_ratings_are_mixed() {
        let stats = compute_stats(&rated(&[5, 5, 4, 1, 1]));
        assert_eq!(stats.average_rating, Some(3.2));
        assert_eq!(stats.total_ratings, 5);
        assert_eq!(
            serde_json::to_value(&stats.rating_distribution).unwrap(),
            json!({"1": 2, "2": 0, "3": 0, "4": 1, "5": 2})
        );
        assert_eq!(stats.sentiment, Some(SentimentLabel::Mixed));
    }

    #[test]
    fn test_no_ratings_means_null_average() {
        let comments = vec![
            Comment::Text("Me encantó el color".to_string()),
            structured(json!({"comentario": "sin nota"})),
        ];
        let stats = compute_stats(&comments);
        assert_eq!(stats.average_rating, None);
        assert_eq!(stats.sentiment, None);
        assert_eq!(stats.total_ratings, 0);
        assert_eq!(serde_json::to_value(&stats).unwrap()["average_rating"], Value::Null);
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(compute_stats(&rated(&[4, 4, 5])).sentiment, Some(SentimentLabel::Positive));
        assert_eq!(compute_stats(&rated(&[3, 3, 4])).sentiment, Some(SentimentLabel::Neutral));
        assert_eq!(compute_stats(&rated(&[1, 2, 3])).sentiment, Some(SentimentLabel::Negative));
    }

    #[test]
    fn test_out_of_range_and_fractional_ratings_are_discarded() {
        let comments = vec![
            structured(json!({"rating": 0})),
            structured(json!({"rating": 6})),
            structured(json!({"rating": 4.5})),
            structured(json!({"rating": "abc"})),
            structured(json!({"rating": " 3 "})),
        ];
        let stats = compute_stats(&comments);
        assert_eq!(stats.total_ratings, 1);
        assert_eq!(stats.average_rating, Some(3.0));
    }

    #[test]
    fn test_text_ratings_need_a_marker() {
        let comments = vec![
            Comment::Text("Le doy 4/5".to_string()),
            Comment::Text("3 estrellas, cumple".to_string()),
            Comment::Text("Solid, 5 stars".to_string()),
            Comment::Text("Llegó en 5 días".to_string()),
            Comment::Text("9 de 5, exagerado".to_string()),
            Comment::Text("Le doy 3,5 estrellas".to_string()),
            Comment::Text("Unos 4.5 stars".to_string()),
        ];
        let stats = compute_stats(&comments);
        assert_eq!(stats.total_ratings, 3);
        assert_eq!(stats.rating_distribution.count(4), 1);
        assert_eq!(stats.rating_distribution.count(3), 1);
        assert_eq!(stats.rating_distribution.count(5), 1);
    }

    #[test]
    fn test_decimal_text_ratings_are_discarded() {
        let comments = vec![
            Comment::Text("Le doy 3,5 estrellas".to_string()),
            Comment::Text("Unos 4.5 stars".to_string()),
        ];
        let stats = compute_stats(&comments);
        assert_eq!(stats.total_ratings, 0);
        assert_eq!(stats.average_rating, None);
        assert_eq!(stats.rating_distribution.count(5), 0);

        let whole = compute_stats(&[Comment::Text("4.0 stars, bien".to_string())]);
        assert_eq!(whole.average_rating, Some(4.0));
    }

    #[test]
    fn test_helpful_votes_only_positive_numbers() {
        let comments = vec![
            structured(json!({"util": 3})),
            structured(json!({"helpful": "2"})),
            structured(json!({"votes": -4})),
            structured(json!({"util": "muchos"})),
        ];
        assert_eq!(compute_stats(&comments).total_helpful_votes, 5);
    }

    #[test]
    fn test_histogram_sums_to_rated_count() {
        let stats = compute_stats(&rated(&[1, 2, 2, 3, 5, 5, 5]));
        assert_eq!(stats.rating_distribution.total(), stats.total_ratings);
    }

    #[test]
    fn test_idempotent() {
        let comments = rated(&[5, 3, 1]);
        assert_eq!(compute_stats(&comments), compute_stats(&comments));
    }

    #[test]
    fn test_rated_percentage() {
        let mut comments = rated(&[5, 4]);
        comments.push(Comment::Text("bien".to_string()));
        let stats = compute_stats(&comments);
        assert_eq!(stats.rated_percentage(comments.len()), 67);
        assert_eq!(compute_stats(&[]).rated_percentage(0), 0);
    }
}
