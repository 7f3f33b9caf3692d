use crate::models::AnalysisPayload;
use crate::services::referral;
use crate::startup::AppState;
use axum::extract::{
    multipart::{Multipart, MultipartRejection},
    State,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use service_core::error::AppError;
use service_core::response::Envelope;

const FILE_FIELD: &str = "file";

pub async fn check_skin(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Envelope<AnalysisPayload>, AppError> {
    let mut multipart = multipart?;
    let image = read_file_field(&mut multipart).await?;

    let analysis = state.skin.analyze(image).await?;
    let diagnosis = analysis.additional_info.diagnosis_code;
    let mut payload = AnalysisPayload::from(analysis);

    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        let specialty_id = referral::specialty_for_lesion(diagnosis);
        let referral = state
            .referrals
            .referral_for(specialty_id, bearer.token())
            .await;
        payload.set_referral(referral);
    }

    Ok(Envelope::success(
        "Skin lesion analysis completed successfully",
        payload,
    ))
}

/// Bytes of the `file` part. Other parts are skipped.
async fn read_file_field(multipart: &mut Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        tracing::debug!(
            file_name = field.file_name().unwrap_or("unnamed"),
            content_type = field.content_type().unwrap_or("application/octet-stream"),
            "Received skin image"
        );

        return Ok(field.bytes().await?.to_vec());
    }

    Err(AppError::BadRequest(anyhow::anyhow!("No file uploaded")))
}
