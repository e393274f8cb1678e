use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::files::{dtos as files_dtos, handlers as files_handlers, models as files_models};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        files_handlers::create_upload_slot,
        files_handlers::resolve_download,
        files_handlers::list_my_files,
        files_handlers::delete_my_file,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Files
            files_models::FileStatus,
            files_models::FileFilter,
            files_dtos::CreateUploadSlotDto,
            files_dtos::UploadSlotResponseDto,
            files_dtos::DownloadResponseDto,
            files_dtos::FileSummaryDto,
            ApiResponse<files_dtos::UploadSlotResponseDto>,
            ApiResponse<files_dtos::DownloadResponseDto>,
            ApiResponse<Vec<files_dtos::FileSummaryDto>>,
        )
    ),
    tags(
        (name = "files", description = "Presigned uploads, token downloads and owner file management"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Datashare API",
        version = "0.1.0",
        description = "Token-based file sharing with presigned transfers",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
