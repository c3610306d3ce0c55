//! Retrieval by content: free-text context search over every node, and
//! constrained search over movies.

use tracing::debug;

use crate::db::converters::row_to_graph_node;
use crate::error::Result;
use crate::graph::movies::{fold_summaries, row_to_movie_row, MovieSummary};
use crate::graph::query::{self, MovieFilter};
use crate::graph::store::GraphStore;
use crate::types::GraphNode;

// ---------------------------------------------------------------------------
// Context search
// ---------------------------------------------------------------------------

/// Case-insensitive substring search across all node properties.
pub struct ContextSearch<'a> {
    store: &'a GraphStore,
}

impl<'a> ContextSearch<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Up to `limit` nodes with any property containing `text`, in id
    /// order. An empty `text` matches every node that has a non-null
    /// property.
    pub fn search(&self, text: &str, limit: usize) -> Result<Vec<GraphNode>> {
        let statement = query::free_text_search(text, limit);
        let nodes = self.store.query(&statement, row_to_graph_node)?;
        debug!(query = text, limit, found = nodes.len(), "context search");
        Ok(nodes)
    }
}

// ---------------------------------------------------------------------------
// Movie search
// ---------------------------------------------------------------------------

pub struct MovieSearch<'a> {
    store: &'a GraphStore,
}

impl<'a> MovieSearch<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Every movie matching all supplied constraints, highest rated first.
    /// Each summary lists all of the movie's genres, not only the one that
    /// matched.
    pub fn search(&self, filter: &MovieFilter) -> Result<Vec<MovieSummary>> {
        let statement = query::filtered_movies(filter);
        let rows = self.store.query(&statement, row_to_movie_row)?;
        let movies = fold_summaries(rows);
        debug!(?filter, found = movies.len(), "movie search");
        Ok(movies)
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

    fn node(store: &GraphStore, label: &str, properties: Value) -> crate::types::NodeId {
        store.create_node(&[label.to_string()], &props(properties)).unwrap()
    }

    fn link(store: &GraphStore, from: crate::types::NodeId, to: crate::types::NodeId, rel: &str) {
        assert!(store.create_relationship(from, to, rel, &Properties::new()).unwrap());
    }

    /// Two movies, one actor and director, three genres.
    fn setup() -> GraphStore {
        let store = GraphStore::new(":memory:");
        let inception = node(&store, "Movie", json!({"title": "Inception", "year": 2010, "rating": 8.8}));
        let matrix = node(&store, "Movie", json!({"title": "The Matrix", "year": 1999, "rating": 8.7}));
        let leo = node(&store, "Actor", json!({"name": "Leonardo DiCaprio"}));
        let keanu = node(&store, "Actor", json!({"name": "Keanu Reeves"}));
        let nolan = node(&store, "Director", json!({"name": "Christopher Nolan"}));
        let sci_fi = node(&store, "Genre", json!({"name": "Sci-Fi"}));
        let action = node(&store, "Genre", json!({"name": "Action"}));
        let thriller = node(&store, "Genre", json!({"name": "Thriller"}));

        link(&store, leo, inception, "ACTED_IN");
        link(&store, keanu, matrix, "ACTED_IN");
        link(&store, nolan, inception, "DIRECTED");
        link(&store, inception, sci_fi, "HAS_GENRE");
        link(&store, inception, action, "HAS_GENRE");
        link(&store, inception, thriller, "HAS_GENRE");
        link(&store, matrix, sci_fi, "HAS_GENRE");
        link(&store, matrix, action, "HAS_GENRE");
        store
    }

    fn titles(movies: &[MovieSummary]) -> Vec<String> {
        movies
            .iter()
            .map(|m| m.title.as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn context_search_is_case_insensitive() {
        let store = setup();
        let found = ContextSearch::new(&store).search("matrix", 5).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].properties.get("title"), Some(&json!("The Matrix")));
    }

    #[test]
    fn context_search_matches_numbers_and_respects_limit() {
        let store = setup();
        let found = ContextSearch::new(&store).search("1999", 5).unwrap();
        assert_eq!(found.len(), 1);

        let everything = ContextSearch::new(&store).search("e", 3).unwrap();
        assert_eq!(everything.len(), 3);
        assert!(everything.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn context_search_matches_booleans() {
        let store = GraphStore::new(":memory:");
        node(&store, "Flag", json!({"active": true}));
        let found = ContextSearch::new(&store).search("TRUE", 5).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn no_filters_returns_all_movies_by_rating() {
        let store = setup();
        let movies = MovieSearch::new(&store).search(&MovieFilter::default()).unwrap();
        assert_eq!(titles(&movies), vec!["Inception", "The Matrix"]);
        assert_eq!(movies[0].actors, vec!["Leonardo DiCaprio".to_string()]);
        assert_eq!(movies[0].directors, vec!["Christopher Nolan".to_string()]);
        assert_eq!(movies[0].genres, vec!["Sci-Fi", "Action", "Thriller"]);
    }

    #[test]
    fn genre_filter_is_exact_and_keeps_all_genres() {
        let store = setup();
        let filter = MovieFilter {
            genre: Some("Thriller".into()),
            ..Default::default()
        };
        let movies = MovieSearch::new(&store).search(&filter).unwrap();
        assert_eq!(titles(&movies), vec!["Inception"]);
        assert_eq!(movies[0].genres.len(), 3);

        let lowercase = MovieFilter {
            genre: Some("thriller".into()),
            ..Default::default()
        };
        assert!(MovieSearch::new(&store).search(&lowercase).unwrap().is_empty());
    }

    #[test]
    fn actor_and_director_filters_match_substrings() {
        let store = setup();
        let by_actor = MovieFilter {
            actor: Some("keanu".into()),
            ..Default::default()
        };
        assert_eq!(
            titles(&MovieSearch::new(&store).search(&by_actor).unwrap()),
            vec!["The Matrix"]
        );

        let by_director = MovieFilter {
            director: Some("Nolan".into()),
            ..Default::default()
        };
        assert_eq!(
            titles(&MovieSearch::new(&store).search(&by_director).unwrap()),
            vec!["Inception"]
        );
    }

    #[test]
    fn filters_combine_conjunctively() {
        let store = setup();
        let filter = MovieFilter {
            genre: Some("Sci-Fi".into()),
            min_rating: Some(8.75),
            ..Default::default()
        };
        assert_eq!(
            titles(&MovieSearch::new(&store).search(&filter).unwrap()),
            vec!["Inception"]
        );

        let impossible = MovieFilter {
            actor: Some("Keanu".into()),
            director: Some("Nolan".into()),
            ..Default::default()
        };
        assert!(MovieSearch::new(&store).search(&impossible).unwrap().is_empty());
    }

    #[test]
    fn min_rating_is_inclusive() {
        let store = setup();
        let filter = MovieFilter {
            min_rating: Some(8.7),
            ..Default::default()
        };
        assert_eq!(MovieSearch::new(&store).search(&filter).unwrap().len(), 2);
    }
}
