use std::sync::Arc;

use crate::application::error::AppError;
use crate::application::repos::LanguagesRepo;
use crate::domain::entities::LanguageRecord;

#[derive(Clone)]
pub struct LanguageService {
    reader: Arc<dyn LanguagesRepo>,
}

impl LanguageService {
    pub fn new(reader: Arc<dyn LanguagesRepo>) -> Self {
        Self { reader }
    }

    pub async fn list(&self) -> Result<Vec<LanguageRecord>, AppError> {
        Ok(self.reader.list_languages().await?)
    }
}
