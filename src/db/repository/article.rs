use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::ArticleStatus;
use crate::models::Article;

use super::parse_uuid;

pub fn insert_article(conn: &Connection, article: &Article) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO articles (id, title, file_path, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            article.id.to_string(),
            article.title,
            article.file_path,
            article.status.as_str(),
            article.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_article(conn: &Connection, id: Uuid) -> Result<Article, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, title, file_path, status, created_at
             FROM articles WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, DateTime<Utc>>(4)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "article".into(),
            id: id.to_string(),
        })?;

    Ok(Article {
        id: parse_uuid("articles.id", &row.0)?,
        title: row.1,
        file_path: row.2,
        status: ArticleStatus::from_str(&row.3)?,
        created_at: row.4,
    })
}

pub fn update_article_status(
    conn: &Connection,
    id: Uuid,
    status: ArticleStatus,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE articles SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "article".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let article = Article::new("Aspirin for primary prevention", Some("aspirin.pdf".into()));
        insert_article(&conn, &article).unwrap();

        let loaded = get_article(&conn, article.id).unwrap();
        assert_eq!(loaded.title, article.title);
        assert_eq!(loaded.status, ArticleStatus::Pending);
    }

    #[test]
    fn status_transition_persists() {
        let conn = open_memory_database().unwrap();
        let article = Article::new("Trial report", None);
        insert_article(&conn, &article).unwrap();

        update_article_status(&conn, article.id, ArticleStatus::Extracted).unwrap();
        let loaded = get_article(&conn, article.id).unwrap();
        assert_eq!(loaded.status, ArticleStatus::Extracted);
    }

    #[test]
    fn missing_article_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = get_article(&conn, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
