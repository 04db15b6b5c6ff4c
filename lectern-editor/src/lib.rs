/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

#![allow(non_snake_case)]

pub mod app;
pub mod batch;
pub mod config;
pub mod handshake;
pub mod history;
pub mod protocol;
pub mod selection;
pub mod services;
pub mod session;
pub mod shortcuts;
pub mod timer;

pub use app::SlideEditor;
pub use config::{ConfigError, EditorConfig};
pub use history::{History, HistoryEntry};
pub use protocol::{HostMessage, StyleUpdate, SurfaceMessage};
pub use selection::{EditingBuffer, EditorState};
pub use services::{
    modify_and_persist, persist_page, request_modification, CodeModificationService, EditorBackend,
    ImageAssetService, PersistenceService, ServiceError,
};
pub use session::{DeckInfo, EditorSession, Notice, NoticeLevel};
pub use shortcuts::{command_for, Command};
