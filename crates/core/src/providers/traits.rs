use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::advisory::{CareTips, CareTipsRequest, Diagnosis, ImageDataUri};

/// Trait abstraction for generative advisory backends.
///
/// Every call is a single request/response; implementations keep no
/// conversation state between calls. Inputs arrive already validated.
#[async_trait]
pub trait AdvisoryProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Personalized pond-maintenance and disease-prevention tips from farm data.
    async fn generate_care_tips(&self, request: &CareTipsRequest) -> Result<CareTips, CoreError>;

    /// Tips answering a farmer's free-form question.
    async fn answer_question(&self, question: &str) -> Result<CareTips, CoreError>;

    /// Preliminary health diagnosis from a photo.
    async fn diagnose(&self, image: &ImageDataUri) -> Result<Diagnosis, CoreError>;
}
