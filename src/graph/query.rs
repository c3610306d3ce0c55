//! Parameterised statement builders for every graph operation.
//!
//! Each builder returns a [`Statement`]: SQL text plus positional
//! parameters. Caller-supplied values only ever travel as parameters. The
//! few names spliced into SQL text (labels, relationship types, property
//! keys) come from the closed vocabularies below, never from input.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::types::{NodeId, Properties};

// ---------------------------------------------------------------------------
// Statement
// ---------------------------------------------------------------------------

/// A ready-to-run query: SQL text and its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Map a scalar JSON value onto a SQLite parameter.
///
/// Lists and objects bind as their JSON text, which matches how they are
/// stored inside property objects.
pub fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn text_or_null(value: Option<&str>) -> SqlValue {
    value.map_or(SqlValue::Null, |s| SqlValue::Text(s.to_string()))
}

fn limit_param(limit: usize) -> SqlValue {
    SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX))
}

// ---------------------------------------------------------------------------
// Movie vocabulary
// ---------------------------------------------------------------------------

/// Node labels used by the movie tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieLabel {
    Movie,
    Actor,
    Director,
    Genre,
    User,
}

impl MovieLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Actor => "Actor",
            Self::Director => "Director",
            Self::Genre => "Genre",
            Self::User => "User",
        }
    }
}

/// Relationship types used by the movie tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieRelation {
    ActedIn,
    Directed,
    HasGenre,
    Likes,
}

impl MovieRelation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActedIn => "ACTED_IN",
            Self::Directed => "DIRECTED",
            Self::HasGenre => "HAS_GENRE",
            Self::Likes => "LIKES",
        }
    }
}

/// `EXISTS` predicate testing that `alias` carries `label`.
fn has_label(alias: &str, label: MovieLabel) -> String {
    format!(
        "EXISTS (SELECT 1 FROM json_each({alias}.labels) WHERE value = '{}')",
        label.as_str()
    )
}

fn prop(alias: &str, key: &str) -> String {
    format!("json_extract({alias}.properties, '$.{key}')")
}

/// Columns shared by every movie-shaped result row. `id_column` names
/// the movie id column on `alias`.
fn movie_columns(alias: &str, id_column: &str) -> String {
    format!(
        "{alias}.{id_column} AS id, {title} AS title, {year} AS year, {rating} AS rating, {description} AS description",
        title = prop(alias, "title"),
        year = prop(alias, "year"),
        rating = prop(alias, "rating"),
        description = prop(alias, "description"),
    )
}

/// CTE `movie_links(movie_id, link, linked_name, link_value, edge_id)`:
/// one row per actor, director and genre attached to a movie, and per
/// user rating when `with_ratings` is set.
fn movie_links_cte(with_ratings: bool) -> String {
    let mut cte = format!(
        "movie_links AS (
    SELECT e.target_id AS movie_id, 'actor' AS link, {actor_name} AS linked_name, NULL AS link_value, e.id AS edge_id
    FROM edges e JOIN nodes a ON a.id = e.source_id
    WHERE e.type = '{acted_in}' AND {is_actor}
    UNION ALL
    SELECT e.target_id, 'director', {director_name}, NULL, e.id
    FROM edges e JOIN nodes d ON d.id = e.source_id
    WHERE e.type = '{directed}' AND {is_director}
    UNION ALL
    SELECT e.source_id, 'genre', {genre_name}, NULL, e.id
    FROM edges e JOIN nodes g ON g.id = e.target_id
    WHERE e.type = '{has_genre}' AND {is_genre}",
        actor_name = prop("a", "name"),
        acted_in = MovieRelation::ActedIn.as_str(),
        is_actor = has_label("a", MovieLabel::Actor),
        director_name = prop("d", "name"),
        directed = MovieRelation::Directed.as_str(),
        is_director = has_label("d", MovieLabel::Director),
        genre_name = prop("g", "name"),
        has_genre = MovieRelation::HasGenre.as_str(),
        is_genre = has_label("g", MovieLabel::Genre),
    );
    if with_ratings {
        cte.push_str(&format!(
            "
    UNION ALL
    SELECT l.target_id, 'rating', {user_name}, {like_rating}, l.id
    FROM edges l JOIN nodes u ON u.id = l.source_id
    WHERE l.type = '{likes}' AND {is_user}",
            user_name = prop("u", "name"),
            like_rating = prop("l", "rating"),
            likes = MovieRelation::Likes.as_str(),
            is_user = has_label("u", MovieLabel::User),
        ));
    }
    cte.push_str("\n)");
    cte
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

/// Nodes with any property whose text form contains `query`,
/// case-insensitively. Booleans match as `true`/`false`.
pub fn free_text_search(query: &str, limit: usize) -> Statement {
    Statement::new(
        "\
SELECT n.id, n.labels, n.properties
FROM nodes n
WHERE EXISTS (
    SELECT 1
    FROM json_each(n.properties) p
    WHERE instr(
        fold_case(CASE p.type WHEN 'true' THEN 'true' WHEN 'false' THEN 'false' ELSE CAST(p.value AS TEXT) END),
        fold_case(?1)
    ) > 0
)
ORDER BY n.id ASC
LIMIT ?2",
        vec![SqlValue::Text(query.to_string()), limit_param(limit)],
    )
}

/// Edges incident to `node_id` in either direction, each paired with the
/// node at the other end.
pub fn neighborhood(node_id: NodeId, limit: usize) -> Statement {
    Statement::new(
        "\
SELECT e.type AS relation_type, c.labels, c.properties
FROM edges e
JOIN nodes c ON c.id = CASE WHEN e.source_id = ?1 THEN e.target_id ELSE e.source_id END
WHERE e.source_id = ?1 OR e.target_id = ?1
ORDER BY e.id ASC
LIMIT ?2",
        vec![SqlValue::Integer(node_id.0), limit_param(limit)],
    )
}

/// Optional constraints for [`filtered_movies`]. Absent fields impose
/// nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieFilter {
    /// Exact genre name.
    pub genre: Option<String>,
    /// Case-insensitive substring of an actor's name.
    pub actor: Option<String>,
    /// Case-insensitive substring of a director's name.
    pub director: Option<String>,
    /// Inclusive lower bound on the movie rating.
    pub min_rating: Option<f64>,
}

/// Movies satisfying every supplied constraint, best rated first, one row
/// per attached actor/director/genre.
pub fn filtered_movies(filter: &MovieFilter) -> Statement {
    let sql = format!(
        "\
WITH {links},
matched AS (
    SELECT m.id, m.properties
    FROM nodes m
    WHERE {is_movie}
      AND (?1 IS NULL OR EXISTS (
            SELECT 1 FROM movie_links l
            WHERE l.movie_id = m.id AND l.link = 'genre' AND l.linked_name = ?1))
      AND (?2 IS NULL OR EXISTS (
            SELECT 1 FROM movie_links l
            WHERE l.movie_id = m.id AND l.link = 'actor'
              AND instr(fold_case(l.linked_name), fold_case(?2)) > 0))
      AND (?3 IS NULL OR EXISTS (
            SELECT 1 FROM movie_links l
            WHERE l.movie_id = m.id AND l.link = 'director'
              AND instr(fold_case(l.linked_name), fold_case(?3)) > 0))
      AND (?4 IS NULL OR {rating} >= ?4)
)
SELECT {columns}, l.link, l.linked_name, l.link_value
FROM matched m
LEFT JOIN movie_links l ON l.movie_id = m.id
ORDER BY {rating} DESC, m.id ASC, l.edge_id ASC",
        links = movie_links_cte(false),
        is_movie = has_label("m", MovieLabel::Movie),
        rating = prop("m", "rating"),
        columns = movie_columns("m", "id"),
    );

    Statement::new(
        sql,
        vec![
            text_or_null(filter.genre.as_deref()),
            text_or_null(filter.actor.as_deref()),
            text_or_null(filter.director.as_deref()),
            filter.min_rating.map_or(SqlValue::Null, SqlValue::Real),
        ],
    )
}

/// Movies that share at least one genre with a movie `user_name` likes,
/// excluding those already liked. Ranked by number of shared genres, then
/// rating, then id.
pub fn shared_genre_recommendations(user_name: &str, limit: usize) -> Statement {
    let sql = format!(
        "\
WITH liked AS (
    SELECT DISTINCT m.id
    FROM nodes u
    JOIN edges l ON l.source_id = u.id AND l.type = '{likes}'
    JOIN nodes m ON m.id = l.target_id
    WHERE {is_user} AND {user_name} = ?1 AND {is_movie}
),
liked_genres AS (
    SELECT DISTINCT g.id AS genre_id
    FROM liked
    JOIN edges lg ON lg.source_id = liked.id AND lg.type = '{has_genre}'
    JOIN nodes g ON g.id = lg.target_id
    WHERE {is_genre}
),
candidates AS (
    SELECT e.source_id AS movie_id, COUNT(DISTINCT e.target_id) AS genre_match_count
    FROM edges e
    JOIN nodes rec ON rec.id = e.source_id
    WHERE e.type = '{has_genre}'
      AND e.target_id IN (SELECT genre_id FROM liked_genres)
      AND e.source_id NOT IN (SELECT id FROM liked)
      AND {rec_is_movie}
    GROUP BY e.source_id
),
ranked AS (
    SELECT c.movie_id, c.genre_match_count, r.properties
    FROM candidates c
    JOIN nodes r ON r.id = c.movie_id
    ORDER BY c.genre_match_count DESC, {rec_rating} DESC, c.movie_id ASC
    LIMIT ?2
),
{links},
rec_links AS (
    SELECT movie_id, link, linked_name, link_value, edge_id
    FROM movie_links
    WHERE link <> 'genre'
    UNION ALL
    SELECT e.source_id, 'shared_genre', {genre_name}, NULL, e.id
    FROM edges e
    JOIN nodes g ON g.id = e.target_id
    WHERE e.type = '{has_genre}' AND e.target_id IN (SELECT genre_id FROM liked_genres)
)
SELECT {columns}, r.genre_match_count, l.link, l.linked_name, l.link_value
FROM ranked r
LEFT JOIN rec_links l ON l.movie_id = r.movie_id
ORDER BY r.genre_match_count DESC, {rec_rating} DESC, r.movie_id ASC, l.edge_id ASC",
        likes = MovieRelation::Likes.as_str(),
        has_genre = MovieRelation::HasGenre.as_str(),
        is_user = has_label("u", MovieLabel::User),
        user_name = prop("u", "name"),
        is_movie = has_label("m", MovieLabel::Movie),
        is_genre = has_label("g", MovieLabel::Genre),
        rec_is_movie = has_label("rec", MovieLabel::Movie),
        rec_rating = prop("r", "rating"),
        genre_name = prop("g", "name"),
        links = movie_links_cte(false),
        columns = movie_columns("r", "movie_id"),
    );

    Statement::new(
        sql,
        vec![SqlValue::Text(user_name.to_string()), limit_param(limit)],
    )
}

/// Movies `user_name` likes with the rating they gave, highest first, one
/// row per genre of each liked movie.
pub fn user_preferences(user_name: &str) -> Statement {
    let sql = format!(
        "\
WITH {links},
prefs AS (
    SELECT m.id, m.properties, {like_rating} AS user_rating, l.id AS like_id
    FROM nodes u
    JOIN edges l ON l.source_id = u.id AND l.type = '{likes}'
    JOIN nodes m ON m.id = l.target_id
    WHERE {is_user} AND {user_name} = ?1 AND {is_movie}
)
SELECT {columns}, p.user_rating, p.like_id, ml.link, ml.linked_name, ml.link_value
FROM prefs p
LEFT JOIN movie_links ml ON ml.movie_id = p.id AND ml.link = 'genre'
ORDER BY p.user_rating DESC, p.like_id ASC, ml.edge_id ASC",
        links = movie_links_cte(false),
        like_rating = prop("l", "rating"),
        likes = MovieRelation::Likes.as_str(),
        is_user = has_label("u", MovieLabel::User),
        user_name = prop("u", "name"),
        is_movie = has_label("m", MovieLabel::Movie),
        columns = movie_columns("p", "id"),
    );

    Statement::new(sql, vec![SqlValue::Text(user_name.to_string())])
}

/// The first movie titled exactly `title`, one row per actor, director,
/// genre and user rating attached to it.
pub fn movie_details(title: &str) -> Statement {
    let sql = format!(
        "\
WITH {links},
movie AS (
    SELECT m.id, m.properties
    FROM nodes m
    WHERE {is_movie} AND {title_expr} = ?1
    ORDER BY m.id ASC
    LIMIT 1
)
SELECT {columns}, l.link, l.linked_name, l.link_value
FROM movie m
LEFT JOIN movie_links l ON l.movie_id = m.id
ORDER BY l.edge_id ASC",
        links = movie_links_cte(true),
        is_movie = has_label("m", MovieLabel::Movie),
        title_expr = prop("m", "title"),
        columns = movie_columns("m", "id"),
    );

    Statement::new(sql, vec![SqlValue::Text(title.to_string())])
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

/// Insert a node. `labels` must already be validated identifiers.
pub fn create_node(labels: &[String], properties: &Properties) -> Statement {
    Statement::new(
        "INSERT INTO nodes (labels, properties) VALUES (?1, ?2)",
        vec![
            SqlValue::Text(Value::from(labels.to_vec()).to_string()),
            SqlValue::Text(Value::Object(properties.clone()).to_string()),
        ],
    )
}

/// Insert an edge only when both endpoints exist; affects zero rows
/// otherwise.
pub fn create_relationship(
    from: NodeId,
    to: NodeId,
    rel_type: &str,
    properties: &Properties,
) -> Statement {
    Statement::new(
        "\
INSERT INTO edges (source_id, target_id, type, properties)
SELECT a.id, b.id, ?3, ?4
FROM nodes a, nodes b
WHERE a.id = ?1 AND b.id = ?2",
        vec![
            SqlValue::Integer(from.0),
            SqlValue::Integer(to.0),
            SqlValue::Text(rel_type.to_string()),
            SqlValue::Text(Value::Object(properties.clone()).to_string()),
        ],
    )
}

/// First node carrying `label` whose property `key` equals `value`.
pub fn find_node(label: &str, key: &str, value: &Value) -> Statement {
    Statement::new(
        "\
SELECT n.id
FROM nodes n
WHERE EXISTS (SELECT 1 FROM json_each(n.labels) WHERE value = ?1)
  AND json_extract(n.properties, ?2) = ?3
ORDER BY n.id ASC
LIMIT 1",
        vec![
            SqlValue::Text(label.to_string()),
            SqlValue::Text(format!("$.\"{key}\"")),
            json_to_sql(value),
        ],
    )
}
