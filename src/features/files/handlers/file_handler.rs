use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::{MaybePrincipal, Principal};
use crate::features::files::dtos::{
    CreateUploadSlotDto, DownloadResponseDto, FileListQuery, FileSummaryDto,
    UploadSlotResponseDto,
};
use crate::features::files::models::DownloadToken;
use crate::features::files::services::TransferService;
use crate::shared::types::{ApiResponse, Meta};

/// Request an upload slot
///
/// Returns a presigned URL the client PUTs the file bytes to, and the
/// download token to share. Anonymous callers are accepted only when
/// anonymous uploads are enabled.
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body = CreateUploadSlotDto,
    responses(
        (status = 201, description = "Upload slot issued", body = ApiResponse<UploadSlotResponseDto>),
        (status = 400, description = "Invalid filename, content type, size or extension"),
        (status = 401, description = "Authentication required"),
        (status = 503, description = "Storage or database unavailable, retry")
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn create_upload_slot(
    principal: MaybePrincipal,
    State(service): State<Arc<TransferService>>,
    AppJson(dto): AppJson<CreateUploadSlotDto>,
) -> Result<(StatusCode, Json<ApiResponse<UploadSlotResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    service
        .upload_rules()
        .check(&dto)
        .map_err(AppError::Validation)?;

    let slot = service
        .create_upload_slot(principal.owner_id(), dto)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(slot), None, None)),
    ))
}

/// Resolve a download token
///
/// Public: possession of the token is the only requirement. Unknown,
/// expired and deleted tokens all answer 404.
#[utoipa::path(
    get,
    path = "/api/files/download/{token}",
    tag = "files",
    params(
        ("token" = String, Path, description = "Download token")
    ),
    responses(
        (status = 200, description = "Presigned download URL", body = ApiResponse<DownloadResponseDto>),
        (status = 404, description = "File not found"),
        (status = 503, description = "Storage or database unavailable, retry")
    )
)]
pub async fn resolve_download(
    State(service): State<Arc<TransferService>>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<DownloadResponseDto>>> {
    let download = service
        .resolve_download(&DownloadToken::new(token))
        .await?;

    Ok(Json(ApiResponse::success(Some(download), None, None)))
}

/// List my files (paginated)
#[utoipa::path(
    get,
    path = "/api/files/my",
    tag = "files",
    params(FileListQuery),
    responses(
        (status = 200, description = "Caller's files, newest first", body = ApiResponse<Vec<FileSummaryDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_my_files(
    principal: Principal,
    State(service): State<Arc<TransferService>>,
    AppQuery(query): AppQuery<FileListQuery>,
) -> Result<Json<ApiResponse<Vec<FileSummaryDto>>>> {
    let page = service
        .list_owned(&principal.owner_id, query.filter, query.page_request())
        .await?;
    let total = page.total;

    Ok(Json(ApiResponse::success(
        Some(page.items),
        None,
        Some(Meta { total }),
    )))
}

/// Delete one of my files
///
/// Idempotent for the owner. The link stops working immediately.
#[utoipa::path(
    delete,
    path = "/api/files/my/{token}",
    tag = "files",
    params(
        ("token" = String, Path, description = "Download token")
    ),
    responses(
        (status = 204, description = "File deleted"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_my_file(
    principal: Principal,
    State(service): State<Arc<TransferService>>,
    Path(token): Path<String>,
) -> Result<StatusCode> {
    service
        .delete_owned(&principal.owner_id, &DownloadToken::new(token))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::routes;
    use crate::features::files::services::{ExpiryPolicy, TransferOptions, UploadRules};
    use crate::features::files::store::InMemoryFileRecordStore;
    use crate::shared::test_helpers::{FakeStorageGateway, ManualClock, StaticIdentityProvider};
    use axum::http::{header, HeaderValue};
    use axum_test::TestServer;
    use chrono::Utc;
    use serde_json::{json, Value};

    fn server_with(allow_anonymous_upload: bool) -> TestServer {
        let service = Arc::new(TransferService::new(
            Arc::new(InMemoryFileRecordStore::new()),
            Arc::new(FakeStorageGateway::new()),
            ExpiryPolicy::new(1, 30, 7).unwrap(),
            Arc::new(ManualClock::new(Utc::now())),
            TransferOptions {
                upload_prefix: "uploads".to_string(),
                allow_anonymous_upload,
                upstream_timeout: std::time::Duration::from_secs(5),
                upload_rules: UploadRules {
                    max_upload_size: 1_000_000,
                    forbidden_extensions: vec!["exe".to_string(), "sh".to_string()],
                },
            },
        ));
        let identity = StaticIdentityProvider::with_owners(&["alice", "bob"]);
        TestServer::new(routes::routes(service, identity)).unwrap()
    }

    fn server() -> TestServer {
        server_with(false)
    }

    fn bearer(owner: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", owner)).unwrap()
    }

    async fn upload(server: &TestServer, owner: &str, filename: &str) -> String {
        let response = server
            .post("/api/files/upload")
            .add_header(header::AUTHORIZATION, bearer(owner))
            .json(&json!({
                "filename": filename,
                "contentType": "application/pdf",
                "size": 1024,
                "requestedDays": 7
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_upload_returns_slot() {
        let server = server();
        let response = server
            .post("/api/files/upload")
            .add_header(header::AUTHORIZATION, bearer("alice"))
            .json(&json!({
                "filename": "doc.pdf",
                "contentType": "application/pdf",
                "size": 1024
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert!(body["data"]["uploadUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://storage.test/put/uploads/"));
        assert_eq!(body["data"]["token"].as_str().unwrap().len(), 43);
        assert!(body["data"]["expiresAt"].is_string());
    }

    #[tokio::test]
    async fn test_upload_requires_auth_unless_anonymous_allowed() {
        let request = json!({
            "filename": "doc.pdf",
            "contentType": "application/pdf",
            "size": 1
        });

        let response = server().post("/api/files/upload").json(&request).await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let response = server_with(true)
            .post("/api/files/upload")
            .json(&request)
            .await;
        response.assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_upload_with_bad_token_is_rejected_even_when_anonymous_allowed() {
        let response = server_with(true)
            .post("/api/files/upload")
            .add_header(header::AUTHORIZATION, bearer("mallory"))
            .json(&json!({
                "filename": "doc.pdf",
                "contentType": "application/pdf",
                "size": 1
            }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_upload_validation_errors() {
        let server = server();
        for request in [
            json!({"filename": "../etc/passwd", "contentType": "text/plain", "size": 1}),
            json!({"filename": "doc.pdf", "contentType": "not a mime", "size": 1}),
            json!({"filename": "doc.pdf", "contentType": "application/pdf", "size": -1}),
            json!({"filename": "doc.pdf", "contentType": "application/pdf", "size": 2_000_000}),
            json!({"filename": "install.SH", "contentType": "text/x-sh", "size": 1}),
        ] {
            let response = server
                .post("/api/files/upload")
                .add_header(header::AUTHORIZATION, bearer("alice"))
                .json(&request)
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_download_is_public() {
        let server = server();
        let token = upload(&server, "alice", "doc.pdf").await;

        let response = server.get(&format!("/api/files/download/{}", token)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["filename"], "doc.pdf");
        assert_eq!(body["data"]["contentType"], "application/pdf");
        assert_eq!(body["data"]["size"], 1024);
        assert!(body["data"]["downloadUrl"]
            .as_str()
            .unwrap()
            .contains(&token));
    }

    #[tokio::test]
    async fn test_download_unknown_token_is_404() {
        let response = server().get("/api/files/download/does-not-exist").await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_list_my_files() {
        let server = server();
        upload(&server, "alice", "a.pdf").await;
        upload(&server, "alice", "b.pdf").await;
        upload(&server, "bob", "c.pdf").await;

        let response = server
            .get("/api/files/my")
            .add_header(header::AUTHORIZATION, bearer("alice"))
            .add_query_param("page_size", 1)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["meta"]["total"], 2);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["status"], "active");

        let response = server.get("/api/files/my").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_my_files_rejects_unknown_filter() {
        let response = server()
            .get("/api/files/my")
            .add_header(header::AUTHORIZATION, bearer("alice"))
            .add_query_param("filter", "bogus")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid query"));
    }

    #[tokio::test]
    async fn test_delete_my_file() {
        let server = server();
        let token = upload(&server, "alice", "doc.pdf").await;
        let path = format!("/api/files/my/{}", token);

        // Someone else's token looks like an unknown one
        server
            .delete(&path)
            .add_header(header::AUTHORIZATION, bearer("bob"))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        for _ in 0..2 {
            server
                .delete(&path)
                .add_header(header::AUTHORIZATION, bearer("alice"))
                .await
                .assert_status(StatusCode::NO_CONTENT);
        }

        server
            .get(&format!("/api/files/download/{}", token))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let body: Value = server
            .get("/api/files/my")
            .add_header(header::AUTHORIZATION, bearer("alice"))
            .await
            .json();
        assert_eq!(body["meta"]["total"], 0);
    }
}
