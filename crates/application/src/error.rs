use domain::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl ApplicationError {
    /// 取回底层仓储错误，便于接口层做状态码映射
    pub fn as_repository(&self) -> &RepositoryError {
        match self {
            ApplicationError::Repository(err) => err,
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}
