//! Direct lookups: a user's liked movies and a single movie's details.

use crate::db::converters::column_json;
use crate::error::Result;
use crate::graph::movies::{
    fold_adjacent, push_unique, row_to_movie_row, LikedMovie, LinkKind, MovieDetails,
    MovieSummary, UserRating,
};
use crate::graph::query;
use crate::graph::store::GraphStore;
use crate::types::NodeId;

pub struct MovieLookup<'a> {
    store: &'a GraphStore,
}

impl<'a> MovieLookup<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Movies liked by `user_name`, highest user rating first, each with
    /// its genres. Empty when the user is unknown or likes nothing.
    pub fn user_preferences(&self, user_name: &str) -> Result<Vec<LikedMovie>> {
        let statement = query::user_preferences(user_name);
        let rows = self.store.query(&statement, |row| {
            let like_id: i64 = row.get("like_id")?;
            let user_rating = column_json(row, "user_rating")?;
            Ok((like_id, user_rating, row_to_movie_row(row)?))
        })?;

        Ok(fold_adjacent(
            rows,
            |(like_id, _, _)| *like_id,
            |(_, user_rating, r)| LikedMovie {
                id: NodeId(r.id),
                title: r.title.clone(),
                year: r.year.clone(),
                description: r.description.clone(),
                user_rating: user_rating.clone(),
                genres: Vec::new(),
            },
            |liked, (_, _, r)| {
                if let (Some(LinkKind::Genre), Some(name)) = (r.link, r.linked_name.as_deref()) {
                    push_unique(&mut liked.genres, name);
                }
            },
        ))
    }

    /// The first movie titled exactly `title`, or `None`.
    pub fn movie_details(&self, title: &str) -> Result<Option<MovieDetails>> {
        let statement = query::movie_details(title);
        let rows = self.store.query(&statement, row_to_movie_row)?;
        let Some(first) = rows.first() else {
            return Ok(None);
        };

        let mut details = MovieDetails {
            movie: MovieSummary::from_row(first),
            user_ratings: Vec::new(),
        };
        for row in &rows {
            match (row.link, row.linked_name.as_deref()) {
                (Some(LinkKind::Rating), Some(user)) => {
                    let rating = UserRating {
                        user: user.to_string(),
                        rating: row.link_value.clone(),
                    };
                    if !details.user_ratings.contains(&rating) {
                        details.user_ratings.push(rating);
                    }
                }
                _ => details.movie.absorb(row),
            }
        }
        Ok(Some(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Properties;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap_or_default()
    }

    fn setup() -> GraphStore {
        let store = GraphStore::new(":memory:");
        let node = |label: &str, p: Value| store.create_node(&[label.to_string()], &props(p)).unwrap();

        let inception = node("Movie", json!({"title": "Inception", "year": 2010, "rating": 8.8, "description": "Dreams"}));
        let matrix = node("Movie", json!({"title": "The Matrix", "year": 1999, "rating": 8.7}));
        let sci_fi = node("Genre", json!({"name": "Sci-Fi"}));
        let leo = node("Actor", json!({"name": "Leonardo DiCaprio"}));
        let alice = node("User", json!({"name": "Alice"}));
        let bob = node("User", json!({"name": "Bob"}));

        let rel = |a, b, t: &str, p: Value| {
            store.create_relationship(a, b, t, &props(p)).unwrap();
        };
        rel(inception, sci_fi, "HAS_GENRE", json!({}));
        rel(matrix, sci_fi, "HAS_GENRE", json!({}));
        rel(leo, inception, "ACTED_IN", json!({"role": "Dom Cobb"}));
        rel(alice, matrix, "LIKES", json!({"rating": 4}));
        rel(alice, inception, "LIKES", json!({"rating": 5}));
        rel(bob, inception, "LIKES", json!({"rating": 3}));
        store
    }

    #[test]
    fn preferences_sorted_by_user_rating() {
        let store = setup();
        let liked = MovieLookup::new(&store).user_preferences("Alice").unwrap();
        assert_eq!(liked.len(), 2);
        assert_eq!(liked[0].title, json!("Inception"));
        assert_eq!(liked[0].user_rating, json!(5));
        assert_eq!(liked[0].genres, vec!["Sci-Fi".to_string()]);
        assert_eq!(liked[1].title, json!("The Matrix"));
    }

    #[test]
    fn preferences_for_unknown_user_are_empty() {
        let store = setup();
        assert!(MovieLookup::new(&store).user_preferences("Zed").unwrap().is_empty());
    }

    #[test]
    fn details_include_people_genres_and_ratings() {
        let store = setup();
        let details = MovieLookup::new(&store)
            .movie_details("Inception")
            .unwrap()
            .expect("movie exists");

        assert_eq!(details.movie.year, json!(2010));
        assert_eq!(details.movie.actors, vec!["Leonardo DiCaprio".to_string()]);
        assert!(details.movie.directors.is_empty());
        assert_eq!(details.movie.genres, vec!["Sci-Fi".to_string()]);
        assert_eq!(
            details.user_ratings,
            vec![
                UserRating { user: "Alice".into(), rating: json!(5) },
                UserRating { user: "Bob".into(), rating: json!(3) },
            ]
        );
    }

    #[test]
    fn details_title_match_is_exact() {
        let store = setup();
        let lookup = MovieLookup::new(&store);
        assert!(lookup.movie_details("inception").unwrap().is_none());
        assert!(lookup.movie_details("Tenet").unwrap().is_none());
    }
}
