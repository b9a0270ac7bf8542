pub mod db;
pub mod error;
pub mod history;
pub mod users;

#[cfg(test)]
mod tests {
    use super::error::AppError;

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("DB_TEST", "db failed").with_retryable(true);
        assert_eq!(err.code, "DB_TEST");
        assert_eq!(err.message, "db failed");
        assert!(err.retryable);
    }
}
