use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::render::{RenderedAvatar, CACHE_CONTROL};

/// Successful image reply: bytes, MIME type, long-lived cache directive.
#[derive(Debug)]
pub struct AvatarResponse(pub RenderedAvatar);

impl IntoResponse for AvatarResponse {
    fn into_response(self) -> Response {
        let RenderedAvatar { bytes, content_type } = self.0;

        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
                (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL)),
            ],
            bytes,
        )
            .into_response()
    }
}
