use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use super::{MessageStore, UserDirectory};
use crate::error::StoreError;
use crate::models::{ChatMessage, ChatMessageView, ChatScope, NewChatMessage, UserIdentity};
use crate::schema::{chat_messages, users};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Postgres-backed store over an r2d2 pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn connect(database_url: &str) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder().build(manager)?;
        Ok(Self::new(pool))
    }

    pub fn run_migrations(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let conn = &mut self.conn()?;
        let applied = conn.run_pending_migrations(MIGRATIONS)?;
        tracing::info!(count = applied.len(), "database migrations applied");
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, StoreError> {
        self.pool.get().map_err(|e| {
            tracing::error!("db pool get: {:?}", e);
            StoreError::from(e)
        })
    }
}

impl UserDirectory for PgStore {
    fn find_user(&self, id: i32) -> Result<Option<UserIdentity>, StoreError> {
        let conn = &mut self.conn()?;
        users::table
            .find(id)
            .select(UserIdentity::as_select())
            .first(conn)
            .optional()
            .map_err(|e| {
                tracing::error!("find user: {:?}", e);
                StoreError::from(e)
            })
    }
}

impl MessageStore for PgStore {
    fn insert_global_message(&self, author_id: i32, body: &str) -> Result<ChatMessage, StoreError> {
        let conn = &mut self.conn()?;
        diesel::insert_into(chat_messages::table)
            .values(&NewChatMessage::new(author_id, body, ChatScope::Global))
            .returning(ChatMessage::as_returning())
            .get_result(conn)
            .map_err(|e| {
                tracing::error!("insert chat message: {:?}", e);
                StoreError::from(e)
            })
    }

    fn fetch_recent_global(&self, limit: i64) -> Result<Vec<ChatMessageView>, StoreError> {
        let conn = &mut self.conn()?;
        use crate::schema::chat_messages::dsl;
        let rows: Vec<(ChatMessage, UserIdentity)> = chat_messages::table
            .inner_join(users::table)
            .filter(dsl::is_global.eq(true))
            .order((dsl::created_at.desc(), dsl::id.desc()))
            .limit(limit)
            .select((ChatMessage::as_select(), UserIdentity::as_select()))
            .load(conn)
            .map_err(|e| {
                tracing::error!("list global messages: {:?}", e);
                StoreError::from(e)
            })?;
        Ok(rows
            .into_iter()
            .map(|(message, author)| ChatMessageView::new(message, &author))
            .collect())
    }

    fn fetch_direct_history(&self, a: i32, b: i32) -> Result<Vec<ChatMessageView>, StoreError> {
        let conn = &mut self.conn()?;
        use crate::schema::chat_messages::dsl;
        let rows: Vec<(ChatMessage, UserIdentity)> = chat_messages::table
            .inner_join(users::table)
            .filter(dsl::is_global.eq(false))
            .filter(
                dsl::user_id
                    .eq(a)
                    .and(dsl::recipient_id.eq(b))
                    .or(dsl::user_id.eq(b).and(dsl::recipient_id.eq(a))),
            )
            .order((dsl::created_at.asc(), dsl::id.asc()))
            .select((ChatMessage::as_select(), UserIdentity::as_select()))
            .load(conn)
            .map_err(|e| {
                tracing::error!("list direct messages: {:?}", e);
                StoreError::from(e)
            })?;
        Ok(rows
            .into_iter()
            .map(|(message, author)| ChatMessageView::new(message, &author))
            .collect())
    }
}
