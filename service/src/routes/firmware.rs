//! Firmware streaming route.

use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::firmware::{ArtifactLayout, FirmwareError, chunk_stream};
use crate::routes::{AppState, GatewayError, OCTET_STREAM};

/// Stream the firmware artifact in preferred-size blocks.
///
/// Fetch and stat happen before the response head is built, so their
/// failures still map to an error status. Once streaming starts, a read
/// error aborts the connection instead.
pub async fn stream_artifact(State(state): State<AppState>) -> Result<Response, GatewayError> {
    let file = state.artifacts.fetch().await?;
    let meta = file.metadata().await.map_err(FirmwareError::Io)?;
    let layout = ArtifactLayout::from_metadata(&meta);

    tracing::debug!(
        file_size = layout.file_size,
        io_block_size = layout.io_block_size,
        allocated_blocks = layout.allocated_blocks,
        chunks = layout.io_block_count(),
        "streaming firmware artifact"
    );

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, OCTET_STREAM)],
        Body::from_stream(chunk_stream(file, layout)),
    )
        .into_response())
}
