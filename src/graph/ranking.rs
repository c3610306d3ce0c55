//! Genre-overlap recommendations.
//!
//! A candidate is any movie sharing at least one genre with a movie the
//! user likes, minus the movies already liked. Candidates rank by the
//! number of distinct shared genres, then by rating, then by id so the
//! order is total.

use tracing::debug;

use crate::error::Result;
use crate::graph::movies::{
    fold_adjacent, push_unique, row_to_movie_row, LinkKind, MovieRow, MovieSummary,
    Recommendation,
};
use crate::graph::query;
use crate::graph::store::GraphStore;

pub struct GraphRanking<'a> {
    store: &'a GraphStore,
}

impl<'a> GraphRanking<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Top `limit` recommendations for the user named `user_name`. Unknown
    /// users and users without likes get an empty list.
    pub fn recommend_for_user(&self, user_name: &str, limit: usize) -> Result<Vec<Recommendation>> {
        let statement = query::shared_genre_recommendations(user_name, limit);
        let rows = self.store.query(&statement, |row| {
            let count: i64 = row.get("genre_match_count")?;
            Ok((count, row_to_movie_row(row)?))
        })?;

        let recommendations = fold_adjacent(
            rows,
            |(_, r)| r.id,
            |(count, r)| Recommendation {
                movie: MovieSummary::from_row(r),
                shared_genres: Vec::new(),
                genre_match_count: *count,
            },
            |rec, (_, r)| absorb(rec, r),
        );
        debug!(user = user_name, found = recommendations.len(), "recommendations ranked");
        Ok(recommendations)
    }
}

fn absorb(rec: &mut Recommendation, row: &MovieRow) {
    match (row.link, row.linked_name.as_deref()) {
        (Some(LinkKind::SharedGenre), Some(name)) => push_unique(&mut rec.shared_genres, name),
        _ => rec.movie.absorb(row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeId, Properties};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap_or_default()
    }

    struct Fixture {
        store: GraphStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: GraphStore::new(":memory:"),
            }
        }

        fn node(&self, label: &str, properties: Value) -> NodeId {
            self.store.create_node(&[label.to_string()], &props(properties)).unwrap()
        }

        fn movie(&self, title: &str, rating: f64) -> NodeId {
            self.node("Movie", json!({"title": title, "rating": rating}))
        }

        fn link(&self, from: NodeId, to: NodeId, rel: &str) {
            self.store.create_relationship(from, to, rel, &Properties::new()).unwrap();
        }

        fn like(&self, user: NodeId, movie: NodeId, rating: i64) {
            self.store
                .create_relationship(user, movie, "LIKES", &props(json!({"rating": rating})))
                .unwrap();
        }
    }

    fn titles(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().filter_map(|r| r.movie.title.as_str()).collect()
    }

    #[test]
    fn recommends_unliked_movie_sharing_a_genre() {
        let f = Fixture::new();
        let sci_fi = f.node("Genre", json!({"name": "Sci-Fi"}));
        let a = f.movie("Alpha", 8.0);
        let b = f.movie("Beta", 7.0);
        let c = f.movie("Gamma", 6.0);
        for m in [a, b, c] {
            f.link(m, sci_fi, "HAS_GENRE");
        }
        let user = f.node("User", json!({"name": "Dana"}));
        f.like(user, a, 5);
        f.like(user, b, 4);

        let recs = GraphRanking::new(&f.store).recommend_for_user("Dana", 5).unwrap();
        assert_eq!(titles(&recs), vec!["Gamma"]);
        assert_eq!(recs[0].genre_match_count, 1);
        assert_eq!(recs[0].shared_genres, vec!["Sci-Fi".to_string()]);
    }

    #[test]
    fn ranks_by_shared_genres_then_rating_then_id() {
        let f = Fixture::new();
        let sci_fi = f.node("Genre", json!({"name": "Sci-Fi"}));
        let action = f.node("Genre", json!({"name": "Action"}));
        let liked = f.movie("Liked", 9.0);
        f.link(liked, sci_fi, "HAS_GENRE");
        f.link(liked, action, "HAS_GENRE");

        let both = f.movie("Both", 5.0);
        f.link(both, sci_fi, "HAS_GENRE");
        f.link(both, action, "HAS_GENRE");
        let high = f.movie("High", 8.0);
        f.link(high, sci_fi, "HAS_GENRE");
        let tie_first = f.movie("TieFirst", 7.0);
        f.link(tie_first, action, "HAS_GENRE");
        let tie_second = f.movie("TieSecond", 7.0);
        f.link(tie_second, action, "HAS_GENRE");

        let user = f.node("User", json!({"name": "Eve"}));
        f.like(user, liked, 5);

        let recs = GraphRanking::new(&f.store).recommend_for_user("Eve", 5).unwrap();
        assert_eq!(titles(&recs), vec!["Both", "High", "TieFirst", "TieSecond"]);
        assert_eq!(recs[0].genre_match_count, 2);
        assert_eq!(recs[0].shared_genres, vec!["Sci-Fi".to_string(), "Action".to_string()]);
    }

    #[test]
    fn limit_caps_results() {
        let f = Fixture::new();
        let genre = f.node("Genre", json!({"name": "Drama"}));
        let liked = f.movie("Seed", 5.0);
        f.link(liked, genre, "HAS_GENRE");
        for i in 0..8 {
            let m = f.movie(&format!("M{i}"), 6.0);
            f.link(m, genre, "HAS_GENRE");
        }
        let user = f.node("User", json!({"name": "Finn"}));
        f.like(user, liked, 3);

        let recs = GraphRanking::new(&f.store).recommend_for_user("Finn", 5).unwrap();
        assert_eq!(recs.len(), 5);
    }

    #[test]
    fn unknown_user_gets_nothing() {
        let f = Fixture::new();
        f.movie("Lonely", 7.0);
        let recs = GraphRanking::new(&f.store).recommend_for_user("Nobody", 5).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn carries_people_of_recommended_movie() {
        let f = Fixture::new();
        let genre = f.node("Genre", json!({"name": "Thriller"}));
        let liked = f.movie("Seen", 8.0);
        let fresh = f.movie("Fresh", 8.5);
        f.link(liked, genre, "HAS_GENRE");
        f.link(fresh, genre, "HAS_GENRE");
        let actor = f.node("Actor", json!({"name": "Christian Bale"}));
        let director = f.node("Director", json!({"name": "Christopher Nolan"}));
        f.link(actor, fresh, "ACTED_IN");
        f.link(director, fresh, "DIRECTED");
        let user = f.node("User", json!({"name": "Gil"}));
        f.like(user, liked, 4);

        let recs = GraphRanking::new(&f.store).recommend_for_user("Gil", 5).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].movie.actors, vec!["Christian Bale".to_string()]);
        assert_eq!(recs[0].movie.directors, vec!["Christopher Nolan".to_string()]);
    }
}
