use common::{AppError, AppResult};

#[derive(Debug, Default)]
pub struct HelloActivities;

impl HelloActivities {
    pub fn new() -> Self {
        Self
    }

    pub async fn say_hello(&self, name: String) -> AppResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        tracing::info!(name, "Saying hello");
        Ok(format!("Hello, {}!", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn greets_trimmed_name() {
        let hello = HelloActivities::new();
        assert_eq!(hello.say_hello(" Ada ".into()).await.unwrap(), "Hello, Ada!");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let err = HelloActivities::new()
            .say_hello("   ".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
