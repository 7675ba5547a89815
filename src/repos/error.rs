/*
 * Responsibility
 * - the meaning a repo hands upward (db failure / uniqueness race / rejected input)
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict")]
    Conflict,
    #[error("invalid input: {0}")]
    Invalid(&'static str),
}

impl RepoError {
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(dbe) = &e
            && dbe.is_unique_violation()
        {
            return RepoError::Conflict;
        }
        RepoError::Db(e)
    }

    /// Infrastructure failures the caller may retry.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            RepoError::Db(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            )
        )
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
