use crate::models::{AnalysisPayload, SymptomsRequest};
use crate::services::referral;
use crate::startup::AppState;
use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use service_core::error::AppError;
use service_core::response::Envelope;
use validator::{Validate, ValidationError, ValidationErrors};

pub async fn check_symptoms(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    payload: Result<Json<SymptomsRequest>, JsonRejection>,
) -> Result<Envelope<AnalysisPayload>, AppError> {
    let Json(request) = payload?;
    request.validate()?;

    let symptoms = request.symptoms.trim();
    if symptoms.is_empty() {
        let mut errors = ValidationErrors::new();
        errors.add("symptoms", ValidationError::new("blank"));
        return Err(AppError::ValidationError(errors));
    }

    let analysis = state.symptoms.analyze(symptoms).await?;
    let specialty_id =
        referral::specialty_for_symptoms(symptoms, &analysis.assessment.possible_diagnosis);
    let mut payload = AnalysisPayload::from(analysis);

    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        let referral = state
            .referrals
            .referral_for(specialty_id, bearer.token())
            .await;
        payload.set_referral(referral);
    }

    Ok(Envelope::success(
        "Symptom analysis completed successfully",
        payload,
    ))
}
