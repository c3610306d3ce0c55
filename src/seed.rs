//! Sample datasets: a small movie catalog and a GraphRAG concept graph.
//!
//! Each dataset is written in a single transaction, so a failed seed leaves
//! the graph untouched.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{GraphRagError, Result};
use crate::graph::query::{MovieLabel, MovieRelation};
use crate::graph::store::{insert_node, insert_relationship, GraphStore};
use crate::types::{NodeId, Properties};

/// Counts of what a seed wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub nodes: usize,
    pub edges: usize,
}

impl std::ops::Add for SeedSummary {
    type Output = SeedSummary;

    fn add(self, other: SeedSummary) -> SeedSummary {
        SeedSummary {
            nodes: self.nodes + other.nodes,
            edges: self.edges + other.edges,
        }
    }
}

// ---------------------------------------------------------------------------
// Movie catalog
// ---------------------------------------------------------------------------

/// (title, year, rating, description)
const MOVIES: &[(&str, i64, f64, &str)] = &[
    ("Inception", 2010, 8.8, "A thief who enters people's dreams to steal secrets"),
    ("The Matrix", 1999, 8.7, "A hacker discovers the true nature of reality"),
    ("Interstellar", 2014, 8.6, "Explorers travel through a wormhole in space"),
    ("Blade Runner 2049", 2017, 8.0, "A blade runner uncovers a secret"),
    ("Arrival", 2016, 7.9, "A linguist communicates with aliens"),
    ("The Dark Knight", 2008, 9.0, "Batman faces the Joker"),
    ("John Wick", 2014, 7.4, "An assassin comes out of retirement"),
    ("Mad Max: Fury Road", 2015, 8.1, "Post-apocalyptic chase through the desert"),
    ("The Prestige", 2006, 8.5, "Rivalry between two magicians"),
    ("Shutter Island", 2010, 8.2, "A marshal investigates a disappearance"),
    ("Fight Club", 1999, 8.8, "An insomniac office worker creates a fight club"),
    ("The Grand Budapest Hotel", 2014, 8.1, "Adventures of a legendary concierge"),
    ("The Wolf of Wall Street", 2013, 8.2, "Rise and fall of a stockbroker"),
];

/// (name, nationality)
const ACTORS: &[(&str, &str)] = &[
    ("Leonardo DiCaprio", "American"),
    ("Keanu Reeves", "Canadian"),
    ("Matthew McConaughey", "American"),
    ("Christian Bale", "British"),
    ("Ryan Gosling", "Canadian"),
    ("Amy Adams", "American"),
    ("Tom Hardy", "British"),
    ("Charlize Theron", "South African"),
    ("Hugh Jackman", "Australian"),
    ("Brad Pitt", "American"),
    ("Ralph Fiennes", "British"),
];

const DIRECTORS: &[&str] = &[
    "Christopher Nolan",
    "Lana & Lilly Wachowski",
    "Denis Villeneuve",
    "David Fincher",
    "Martin Scorsese",
    "Wes Anderson",
];

const GENRES: &[&str] = &["Sci-Fi", "Action", "Thriller", "Drama", "Comedy", "Mystery"];

/// (name, age, preferences)
const USERS: &[(&str, i64, &str)] = &[
    ("Alice", 28, "Sci-Fi lover"),
    ("Bob", 35, "Action fan"),
    ("Charlie", 25, "Nolan enthusiast"),
];

/// (actor, movie, role)
const ROLES: &[(&str, &str, &str)] = &[
    ("Leonardo DiCaprio", "Inception", "Dom Cobb"),
    ("Leonardo DiCaprio", "The Wolf of Wall Street", "Jordan Belfort"),
    ("Keanu Reeves", "The Matrix", "Neo"),
    ("Keanu Reeves", "John Wick", "John Wick"),
    ("Matthew McConaughey", "Interstellar", "Cooper"),
    ("Christian Bale", "The Dark Knight", "Batman"),
    ("Christian Bale", "The Prestige", "Alfred Borden"),
];

/// (director, movie)
const DIRECTED: &[(&str, &str)] = &[
    ("Christopher Nolan", "Inception"),
    ("Christopher Nolan", "The Dark Knight"),
    ("Christopher Nolan", "The Prestige"),
    ("Christopher Nolan", "Interstellar"),
];

/// (movie, genre)
const MOVIE_GENRES: &[(&str, &str)] = &[
    ("Inception", "Sci-Fi"),
    ("Inception", "Action"),
    ("Inception", "Thriller"),
    ("The Matrix", "Sci-Fi"),
    ("The Matrix", "Action"),
    ("The Dark Knight", "Action"),
    ("The Dark Knight", "Thriller"),
];

/// (user, movie, rating out of 5)
const LIKES: &[(&str, &str, i64)] = &[
    ("Alice", "Inception", 5),
    ("Alice", "The Matrix", 5),
    ("Alice", "Interstellar", 4),
    ("Bob", "The Dark Knight", 5),
    ("Bob", "John Wick", 4),
];

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Writes nodes and links them by (label, key).
struct Loader<'c> {
    conn: &'c Connection,
    ids: HashMap<(&'static str, String), NodeId>,
    summary: SeedSummary,
}

impl<'c> Loader<'c> {
    fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            ids: HashMap::new(),
            summary: SeedSummary::default(),
        }
    }

    fn node(&mut self, label: &'static str, key: &str, properties: Value) -> Result<NodeId> {
        let id = insert_node(self.conn, &[label.to_string()], &object(properties))?;
        self.ids.insert((label, key.to_string()), id);
        self.summary.nodes += 1;
        Ok(id)
    }

    fn id(&self, label: &'static str, key: &str) -> Result<NodeId> {
        self.ids
            .get(&(label, key.to_string()))
            .copied()
            .ok_or_else(|| GraphRagError::Other(format!("seed data references unknown {label} '{key}'")))
    }

    fn edge(
        &mut self,
        from: (&'static str, &str),
        to: (&'static str, &str),
        rel_type: &str,
        properties: Value,
    ) -> Result<()> {
        let source = self.id(from.0, from.1)?;
        let target = self.id(to.0, to.1)?;
        if insert_relationship(self.conn, source, target, rel_type, &object(properties))? {
            self.summary.edges += 1;
        }
        Ok(())
    }
}

fn object(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        _ => Properties::new(),
    }
}

/// Load the movie catalog: 13 movies, 11 actors, 6 directors, 6 genres and
/// 3 users with their likes.
pub fn seed_movies(store: &GraphStore) -> Result<SeedSummary> {
    let movie = MovieLabel::Movie.as_str();
    let actor = MovieLabel::Actor.as_str();
    let director = MovieLabel::Director.as_str();
    let genre = MovieLabel::Genre.as_str();
    let user = MovieLabel::User.as_str();

    let summary = store.transaction(|conn| {
        let mut loader = Loader::new(conn);

        for &(title, year, rating, description) in MOVIES {
            loader.node(
                movie,
                title,
                json!({"title": title, "year": year, "rating": rating, "description": description}),
            )?;
        }
        for &(name, nationality) in ACTORS {
            loader.node(actor, name, json!({"name": name, "nationality": nationality}))?;
        }
        for &name in DIRECTORS {
            loader.node(director, name, json!({"name": name}))?;
        }
        for &name in GENRES {
            loader.node(genre, name, json!({"name": name}))?;
        }
        for &(name, age, preferences) in USERS {
            loader.node(user, name, json!({"name": name, "age": age, "preferences": preferences}))?;
        }

        for &(name, title, role) in ROLES {
            loader.edge(
                (actor, name),
                (movie, title),
                MovieRelation::ActedIn.as_str(),
                json!({"role": role}),
            )?;
        }
        for &(name, title) in DIRECTED {
            loader.edge((director, name), (movie, title), MovieRelation::Directed.as_str(), json!({}))?;
        }
        for &(title, name) in MOVIE_GENRES {
            loader.edge((movie, title), (genre, name), MovieRelation::HasGenre.as_str(), json!({}))?;
        }
        for &(name, title, rating) in LIKES {
            loader.edge(
                (user, name),
                (movie, title),
                MovieRelation::Likes.as_str(),
                json!({"rating": rating}),
            )?;
        }

        Ok(loader.summary)
    })?;

    info!(nodes = summary.nodes, edges = summary.edges, "movie catalog seeded");
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Concept graph
// ---------------------------------------------------------------------------

/// Load the four-node GraphRAG concept graph.
pub fn seed_concepts(store: &GraphStore) -> Result<SeedSummary> {
    const CONCEPT: &str = "Concept";
    const TECHNOLOGY: &str = "Technology";

    let summary = store.transaction(|conn| {
        let mut loader = Loader::new(conn);

        loader.node(
            CONCEPT,
            "GraphRAG",
            json!({"name": "GraphRAG", "description": "Graph-based Retrieval Augmented Generation"}),
        )?;
        loader.node(CONCEPT, "MCP", json!({"name": "MCP", "description": "Model Context Protocol"}))?;
        loader.node(CONCEPT, "Neo4j", json!({"name": "Neo4j", "description": "Graph Database"}))?;
        loader.node(
            TECHNOLOGY,
            "Python",
            json!({"name": "Python", "type": "Programming Language"}),
        )?;

        loader.edge((CONCEPT, "GraphRAG"), (CONCEPT, "Neo4j"), "USES", json!({}))?;
        loader.edge((CONCEPT, "GraphRAG"), (CONCEPT, "MCP"), "IMPLEMENTS", json!({}))?;
        loader.edge((CONCEPT, "MCP"), (TECHNOLOGY, "Python"), "CODED_IN", json!({}))?;

        Ok(loader.summary)
    })?;

    info!(nodes = summary.nodes, edges = summary.edges, "concept graph seeded");
    Ok(summary)
}
