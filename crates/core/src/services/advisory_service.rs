use log::info;

use crate::errors::CoreError;
use crate::models::advisory::{CareTips, CareTipsRequest, Diagnosis, FarmProfile, ImageDataUri};
use crate::models::farm::FarmSnapshot;
use crate::models::pond::PondStatus;
use crate::providers::traits::AdvisoryProvider;

/// Validates advisory inputs and delegates to a provider.
///
/// Invalid input never reaches the provider. Provider errors are returned
/// unchanged.
pub struct AdvisoryService {
    provider: Box<dyn AdvisoryProvider>,
}

impl AdvisoryService {
    pub fn new(provider: Box<dyn AdvisoryProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Personalized care tips from structured farm data.
    pub async fn care_tips(&self, request: &CareTipsRequest) -> Result<CareTips, CoreError> {
        request.validate()?;
        info!(
            "event=advisory module=advisory status=start op=care_tips provider={}",
            self.provider.name()
        );
        self.provider.generate_care_tips(request).await
    }

    /// Tips answering a free-form question.
    pub async fn answer_question(&self, question: &str) -> Result<CareTips, CoreError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(CoreError::ValidationError("Question must not be empty".into()));
        }
        info!(
            "event=advisory module=advisory status=start op=question provider={}",
            self.provider.name()
        );
        self.provider.answer_question(question).await
    }

    /// Preliminary diagnosis from a `data:image/...;base64,...` URI.
    pub async fn diagnose(&self, image_data_uri: &str) -> Result<Diagnosis, CoreError> {
        let image = ImageDataUri::parse(image_data_uri)?;
        info!(
            "event=advisory module=advisory status=start op=diagnose provider={} mime={}",
            self.provider.name(),
            image.mime_type
        );
        self.provider.diagnose(&image).await
    }
}

/// Prefill a care-tips request: pond count and total area come from the
/// active ponds of `snapshot`, everything else from `profile`.
pub fn care_request_from_snapshot(snapshot: &FarmSnapshot, profile: &FarmProfile) -> CareTipsRequest {
    let active = snapshot
        .ponds
        .iter()
        .filter(|p| p.status == PondStatus::Active);
    let (pond_count, pond_area) = active.fold((0u32, 0.0f64), |(count, area), p| {
        (count.saturating_add(1), area + p.area)
    });

    CareTipsRequest {
        pond_count,
        pond_area,
        catfish_type: profile.catfish_type.clone(),
        stocking_density: profile.stocking_density,
        feed_type: profile.feed_type.clone(),
        water_source: profile.water_source.clone(),
        disease_history: profile.disease_history.clone(),
        current_health_status: profile.current_health_status.clone(),
    }
}
