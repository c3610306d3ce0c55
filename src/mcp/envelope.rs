//! Result shaping: JSON envelopes for the graph tools and human-readable
//! summaries for the movie tools.

use serde::Serialize;
use serde_json::{json, Value};

use crate::graph::movies::{LikedMovie, MovieDetails, MovieSummary, Recommendation};
use crate::graph::mutation::SaveOutcome;
use crate::types::{GraphNode, Record, Relationship};

// ---------------------------------------------------------------------------
// Tool response
// ---------------------------------------------------------------------------

/// The single text block returned for a tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub text: String,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn json(value: &Value) -> Self {
        Self::text(json_text(value))
    }

    /// `{error, status: "error"}` plus any context fields.
    pub fn error(message: impl Into<String>, context: Option<(&str, Value)>) -> Self {
        let mut envelope = serde_json::Map::new();
        if let Some((key, value)) = context {
            envelope.insert(key.to_string(), value);
        }
        envelope.insert("error".into(), Value::String(message.into()));
        envelope.insert("status".into(), Value::String("error".into()));
        Self {
            text: json_text(&Value::Object(envelope)),
            is_error: true,
        }
    }
}

fn json_text<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data)
        .unwrap_or_else(|e| json!({"error": e.to_string(), "status": "error"}).to_string())
}

// ---------------------------------------------------------------------------
// JSON envelopes
// ---------------------------------------------------------------------------

pub fn context_search_envelope(query: &str, nodes: &[GraphNode]) -> Value {
    json!({
        "query": query,
        "found": nodes.len(),
        "results": nodes,
        "status": "success",
    })
}

pub fn relationships_envelope(node_id: &str, relationships: &[Relationship]) -> Value {
    json!({
        "node_id": node_id,
        "relationships": relationships,
        "count": relationships.len(),
        "status": "success",
    })
}

pub fn save_envelope(outcome: &SaveOutcome) -> Value {
    json!({
        "node_id": outcome.node_id,
        "status": "success",
        "message": format!("Node {} created successfully", outcome.node_type),
        "relations_created": outcome.relations_created(),
        "relations": outcome.relations,
    })
}

// ---------------------------------------------------------------------------
// Text summaries
// ---------------------------------------------------------------------------

/// Render a scalar for display: strings bare, `null` as `N/A`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn join_or_na(items: &[String]) -> String {
    if items.is_empty() {
        "N/A".to_string()
    } else {
        items.join(", ")
    }
}

/// `Found N movies:` with at most `max_entries` entries listed. N is the
/// full match count.
pub fn movie_search_text(movies: &[MovieSummary], max_entries: usize) -> String {
    let entries: Vec<String> = movies
        .iter()
        .take(max_entries)
        .map(|m| {
            format!(
                "• {} ({}) - Rating: {}/10\n  Description: {}\n  Actors: {}\n  Directors: {}\n  Genres: {}",
                display_value(&m.title),
                display_value(&m.year),
                display_value(&m.rating),
                display_value(&m.description),
                join_or_na(&m.actors),
                join_or_na(&m.directors),
                join_or_na(&m.genres),
            )
        })
        .collect();
    format!("Found {} movies:\n\n{}", movies.len(), entries.join("\n"))
}

/// Every liked movie is listed; the summary cap does not apply here.
pub fn preferences_text(user_name: &str, liked: &[LikedMovie]) -> String {
    if liked.is_empty() {
        return format!("User '{user_name}' not found or has no preferences.");
    }
    let entries: Vec<String> = liked
        .iter()
        .map(|p| {
            format!(
                "• {} ({}) - User Rating: {}/5\n  Genres: {}\n  Description: {}",
                display_value(&p.title),
                display_value(&p.year),
                display_value(&p.user_rating),
                join_or_na(&p.genres),
                display_value(&p.description),
            )
        })
        .collect();
    format!("{user_name}'s favorite movies:\n\n{}", entries.join("\n"))
}

pub fn recommendations_text(
    user_name: &str,
    recommendations: &[Recommendation],
    max_entries: usize,
) -> String {
    if recommendations.is_empty() {
        return format!("No recommendations found for {user_name}.");
    }
    let entries: Vec<String> = recommendations
        .iter()
        .take(max_entries)
        .map(|r| {
            format!(
                "• {} ({}) - Rating: {}/10\n  Why: Shares {} genre(s) with your favorites ({})\n  Description: {}\n  Actors: {}\n  Directors: {}",
                display_value(&r.movie.title),
                display_value(&r.movie.year),
                display_value(&r.movie.rating),
                r.genre_match_count,
                r.shared_genres.join(", "),
                display_value(&r.movie.description),
                join_or_na(&r.movie.actors),
                join_or_na(&r.movie.directors),
            )
        })
        .collect();
    format!("Recommendations for {user_name}:\n\n{}", entries.join("\n"))
}

pub fn movie_details_text(title: &str, details: Option<&MovieDetails>) -> String {
    let Some(details) = details else {
        return format!("Movie '{title}' not found.");
    };
    let movie = &details.movie;
    let ratings = if details.user_ratings.is_empty() {
        "No user ratings yet".to_string()
    } else {
        details
            .user_ratings
            .iter()
            .map(|ur| format!("{}: {}/5", ur.user, display_value(&ur.rating)))
            .collect::<Vec<_>>()
            .join("\n  ")
    };
    format!(
        "**{}** ({})\n\nRating: {}/10\nDescription: {}\n\nActors: {}\nDirectors: {}\nGenres: {}\n\nUser Ratings:\n  {}",
        display_value(&movie.title),
        display_value(&movie.year),
        display_value(&movie.rating),
        display_value(&movie.description),
        join_or_na(&movie.actors),
        join_or_na(&movie.directors),
        join_or_na(&movie.genres),
        ratings,
    )
}

pub fn query_results_text(rows: &[Record]) -> String {
    format!("Query results ({} rows):\n\n{}", rows.len(), json_text(&rows))
}
