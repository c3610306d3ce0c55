//! Movie-shaped records and the row folding shared by every movie query.
//!
//! Movie queries return one row per attached actor, director, genre or
//! rating, ordered so that rows for the same movie are adjacent. Folding
//! them here yields ordered, duplicate-free name lists.

use rusqlite::Row;
use serde::Serialize;
use serde_json::Value;

use crate::db::converters::{column_json, column_opt_text, value_to_name};
use crate::types::NodeId;

// ---------------------------------------------------------------------------
// Public records
// ---------------------------------------------------------------------------

/// A movie with its linked people and genres.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieSummary {
    pub id: NodeId,
    pub title: Value,
    pub year: Value,
    pub rating: Value,
    pub description: Value,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
    pub genres: Vec<String>,
}

/// A recommended movie and why it was picked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub movie: MovieSummary,
    pub shared_genres: Vec<String>,
    pub genre_match_count: i64,
}

/// A movie a user likes, with the rating they gave it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikedMovie {
    pub id: NodeId,
    pub title: Value,
    pub year: Value,
    pub description: Value,
    pub user_rating: Value,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRating {
    pub user: String,
    pub rating: Value,
}

/// Everything known about a single movie.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: MovieSummary,
    pub user_ratings: Vec<UserRating>,
}

// ---------------------------------------------------------------------------
// Row shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkKind {
    Actor,
    Director,
    Genre,
    SharedGenre,
    Rating,
}

impl LinkKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "actor" => Some(Self::Actor),
            "director" => Some(Self::Director),
            "genre" => Some(Self::Genre),
            "shared_genre" => Some(Self::SharedGenre),
            "rating" => Some(Self::Rating),
            _ => None,
        }
    }
}

/// One joined row: movie columns plus at most one link.
#[derive(Debug, Clone)]
pub(crate) struct MovieRow {
    pub id: i64,
    pub title: Value,
    pub year: Value,
    pub rating: Value,
    pub description: Value,
    pub link: Option<LinkKind>,
    pub linked_name: Option<String>,
    pub link_value: Value,
}

pub(crate) fn row_to_movie_row(row: &Row<'_>) -> rusqlite::Result<MovieRow> {
    let link = column_opt_text(row, "link")?;
    Ok(MovieRow {
        id: row.get("id")?,
        title: column_json(row, "title")?,
        year: column_json(row, "year")?,
        rating: column_json(row, "rating")?,
        description: column_json(row, "description")?,
        link: link.as_deref().and_then(LinkKind::parse),
        linked_name: value_to_name(&column_json(row, "linked_name")?),
        link_value: column_json(row, "link_value")?,
    })
}

// ---------------------------------------------------------------------------
// Folding
// ---------------------------------------------------------------------------

pub(crate) fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|existing| existing == name) {
        list.push(name.to_string());
    }
}

/// Fold adjacent items sharing a key into one output value each.
pub(crate) fn fold_adjacent<I, K, T>(
    items: impl IntoIterator<Item = I>,
    key: impl Fn(&I) -> K,
    start: impl Fn(&I) -> T,
    mut absorb: impl FnMut(&mut T, &I),
) -> Vec<T>
where
    K: PartialEq,
{
    let mut out: Vec<(K, T)> = Vec::new();
    for item in items {
        let k = key(&item);
        let continues = matches!(out.last(), Some((last, _)) if *last == k);
        if continues {
            if let Some((_, acc)) = out.last_mut() {
                absorb(acc, &item);
            }
        } else {
            let mut acc = start(&item);
            absorb(&mut acc, &item);
            out.push((k, acc));
        }
    }
    out.into_iter().map(|(_, acc)| acc).collect()
}

impl MovieSummary {
    pub(crate) fn from_row(row: &MovieRow) -> Self {
        Self {
            id: NodeId(row.id),
            title: row.title.clone(),
            year: row.year.clone(),
            rating: row.rating.clone(),
            description: row.description.clone(),
            actors: Vec::new(),
            directors: Vec::new(),
            genres: Vec::new(),
        }
    }

    /// Record the row's actor, director or genre link, if any.
    pub(crate) fn absorb(&mut self, row: &MovieRow) {
        let Some(name) = row.linked_name.as_deref() else {
            return;
        };
        match row.link {
            Some(LinkKind::Actor) => push_unique(&mut self.actors, name),
            Some(LinkKind::Director) => push_unique(&mut self.directors, name),
            Some(LinkKind::Genre) => push_unique(&mut self.genres, name),
            _ => {}
        }
    }
}

/// Fold movie rows into one summary per movie, preserving row order.
pub(crate) fn fold_summaries(rows: Vec<MovieRow>) -> Vec<MovieSummary> {
    fold_adjacent(rows, |r| r.id, MovieSummary::from_row, MovieSummary::absorb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn row(id: i64, link: Option<LinkKind>, name: Option<&str>) -> MovieRow {
        MovieRow {
            id,
            title: json!(format!("Movie {id}")),
            year: json!(2000 + id),
            rating: json!(8.0),
            description: Value::Null,
            link,
            linked_name: name.map(String::from),
            link_value: Value::Null,
        }
    }

    #[test]
    fn folds_adjacent_rows_without_duplicates() {
        let rows = vec![
            row(2, Some(LinkKind::Actor), Some("Keanu Reeves")),
            row(2, Some(LinkKind::Genre), Some("Action")),
            row(2, Some(LinkKind::Actor), Some("Keanu Reeves")),
            row(2, Some(LinkKind::Genre), Some("Sci-Fi")),
            row(1, None, None),
        ];

        let summaries = fold_summaries(rows);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, NodeId(2));
        assert_eq!(summaries[0].actors, vec!["Keanu Reeves".to_string()]);
        assert_eq!(
            summaries[0].genres,
            vec!["Action".to_string(), "Sci-Fi".to_string()]
        );
        assert!(summaries[1].actors.is_empty());
        assert!(summaries[1].directors.is_empty());
    }

    #[test]
    fn unnamed_links_are_ignored() {
        let summaries = fold_summaries(vec![row(1, Some(LinkKind::Director), None)]);
        assert!(summaries[0].directors.is_empty());
    }

    #[test]
    fn recommendation_serializes_flat() {
        let movie = MovieSummary::from_row(&row(5, None, None));
        let rec = Recommendation {
            movie,
            shared_genres: vec!["Sci-Fi".into()],
            genre_match_count: 1,
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["id"], json!("5"));
        assert_eq!(value["genre_match_count"], json!(1));
        assert_eq!(value["shared_genres"], json!(["Sci-Fi"]));
    }
}
