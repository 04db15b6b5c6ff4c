/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

//! Backend contracts the editor talks to. Calls are made once; failures are
//! surfaced to the user and the operation is dropped.

#![allow(async_fn_in_trait)]

use lectern_core::{ElementStyles, Page};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server rejected the request: {0}")]
    Remote(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// A converted deck: its pages with their components and saved styles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub pages: Vec<Page>,
}

pub trait PersistenceService {
    async fn load_conversion(&self, conversion_id: &str) -> Result<Conversion, ServiceError>;

    async fn update_component_code(
        &self,
        component_id: &str,
        source_text: &str,
        data_blob: &str,
    ) -> Result<(), ServiceError>;

    async fn update_slide_styles(&self, slide_id: &str, styles: &ElementStyles) -> Result<(), ServiceError>;

    async fn update_conversion_metadata(
        &self,
        conversion_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModificationRequest {
    pub source_text: String,
    pub styles: Option<ElementStyles>,
    pub attachment: Option<Attachment>,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modification {
    pub source_text: String,
    pub summary: String,
}

/// Rewrites a component from a natural-language instruction.
pub trait CodeModificationService {
    async fn modify(&self, request: ModificationRequest) -> Result<Modification, ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub name: String,
    pub url: String,
}

pub trait ImageAssetService {
    async fn list_images(&self) -> Result<Vec<ImageAsset>, ServiceError>;

    /// Returns the public URL of the stored image.
    async fn upload_image(&self, name: &str, bytes: &[u8]) -> Result<String, ServiceError>;
}

/// Everything the editor host talks to.
pub trait EditorBackend: PersistenceService + CodeModificationService + ImageAssetService {}

impl<T> EditorBackend for T where T: PersistenceService + CodeModificationService + ImageAssetService {}

/// Writes a page's component code and slide styles, whichever it is linked to.
pub async fn persist_page<P: PersistenceService>(service: &P, page: &Page) -> Result<(), ServiceError> {
    if let Some(component_id) = &page.component_id {
        service
            .update_component_code(component_id, page.model.source(), page.model.data_text())
            .await?;
    }
    if let Some(slide_id) = &page.slide_id {
        service.update_slide_styles(slide_id, &page.element_styles).await?;
    }
    info!("Persisted page {} ({})", page.id, page.name);
    Ok(())
}

pub async fn request_modification<C: CodeModificationService>(
    service: &C,
    page: &Page,
    instruction: &str,
    attachment: Option<Attachment>,
) -> Result<Modification, ServiceError> {
    let request = ModificationRequest {
        source_text: page.model.source().to_string(),
        styles: (!page.element_styles.is_empty()).then(|| page.element_styles.clone()),
        attachment,
        instruction: instruction.to_string(),
    };
    service.modify(request).await
}

/// Rewrites the page from `instruction` and persists the result right away.
/// Returns the modification together with the page as it was written.
pub async fn modify_and_persist<C, P>(
    modifier: &C,
    store: &P,
    page: &Page,
    instruction: &str,
    attachment: Option<Attachment>,
) -> Result<(Modification, Page), ServiceError>
where
    C: CodeModificationService,
    P: PersistenceService,
{
    let modification = request_modification(modifier, page, instruction, attachment).await?;
    let mut updated = page.clone();
    updated.model.set_source(modification.source_text.clone());
    persist_page(store, &updated).await?;
    Ok((modification, updated))
}
