use std::cell::RefCell;

use futures::executor::block_on;
use lectern_core::{ElementStyles, ElementTarget, Page, StyleField, StyleSnapshot, DEFAULT_DATA, DEFAULT_TEMPLATE};
use lectern_editor::handshake::HandshakeState;
use lectern_editor::services::{modify_and_persist, Conversion, ImageAsset, Modification, ModificationRequest};
use lectern_editor::{
    persist_page, CodeModificationService, Command, EditorConfig, EditorSession, EditorState, HostMessage,
    ImageAssetService, NoticeLevel, PersistenceService, ServiceError, SurfaceMessage,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const PLAIN: &str = "export default function App() {\n  return <div style={{left:'10px', top:'20px'}}>Hi</div>;\n}\n";

fn editing(pages: Vec<Page>) -> EditorSession {
    let mut session = EditorSession::new(EditorConfig::default(), pages);
    session.set_edit_mode(true, 0);
    session.handle_surface_message(SurfaceMessage::ModeConfirmed { edit_mode: true }, 0);
    session.take_outbox();
    session
}

fn title() -> ElementTarget {
    ElementTarget::Key("title".into())
}

#[test]
fn drag_rewrites_inline_style() {
    let mut session = editing(vec![Page::new(1, "Plain", PLAIN, "{}")]);
    session.handle_raw_message(
        json!({ "type": "element-moved", "elementId": 0, "left": 50, "top": 20 }),
        10,
    );
    assert_eq!(
        session.model().source(),
        "export default function App() {\n  return <div style={{left: '50px', top: '20px'}}>Hi</div>;\n}\n"
    );

    let revision = session.revision();
    session.handle_raw_message(
        json!({ "type": "element-moved", "elementId": 0, "left": 50, "top": 20 }),
        20,
    );
    assert_eq!(session.revision(), revision, "same geometry must not rebuild");
}

#[test]
fn resize_writes_size() {
    let mut session = editing(vec![Page::new(1, "Plain", PLAIN, "{}")]);
    session.handle_surface_message(
        SurfaceMessage::ElementResized {
            target: ElementTarget::Index(0),
            left: 10.0,
            top: 20.0,
            width: 300.5,
            height: 120.0,
        },
        10,
    );
    assert!(session
        .model()
        .source()
        .contains("style={{left: '10px', top: '20px', width: '300.5px', height: '120px'}}"));
}

#[test]
fn bound_text_edit_updates_data_blob() {
    let mut session = editing(Vec::new());
    let snapshot = StyleSnapshot {
        text_content: Some("New slide".into()),
        ..StyleSnapshot::default()
    };
    session.handle_surface_message(SurfaceMessage::ElementSelected { target: title(), style: snapshot }, 5);
    assert!(session.edit_field(StyleField::TextContent, "Photosynthesis", 10));
    assert!(session.save(20));

    assert_eq!(session.model().source(), DEFAULT_TEMPLATE);
    assert_eq!(session.model().data()["title"], json!("Photosynthesis"));
    assert_eq!(session.state(), EditorState::Idle);
}

#[test]
fn undo_and_redo_restore_exact_text() {
    let mut session = editing(Vec::new());
    session.handle_surface_message(SurfaceMessage::ElementSelected { target: title(), style: StyleSnapshot::default() }, 0);
    session.edit_field(StyleField::TextContent, "Cells", 10);
    session.save(20);
    session.poll(600);
    let edited_data = session.model().data_text().to_string();
    assert_eq!(session.history().len(), 2);

    assert!(session.undo(700));
    assert_eq!(session.model().source(), DEFAULT_TEMPLATE);
    assert_eq!(session.model().data_text(), DEFAULT_DATA);
    assert!(!session.undo(710));

    assert!(session.redo(720));
    assert_eq!(session.model().data_text(), edited_data);
    assert!(!session.redo(730));

    let infos: Vec<&str> = session
        .notices()
        .iter()
        .filter(|n| n.level == NoticeLevel::Info)
        .map(|n| n.message.as_str())
        .collect();
    assert_eq!(infos, vec!["Nothing to undo", "Nothing to redo"]);
}

#[test]
fn undo_does_not_record_itself() {
    let mut session = editing(vec![Page::new(1, "Plain", PLAIN, "{}")]);
    session.handle_raw_message(json!({ "type": "element-moved", "elementId": 0, "left": 1, "top": 2 }), 0);
    session.poll(500);
    session.undo(600);
    session.poll(5000);
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history().cursor(), 0);
    assert!(session.history().can_redo());
}

#[test]
fn rapid_style_changes_flush_once() {
    let mut session = editing(Vec::new());
    for n in 0..10u64 {
        session.set_element_style("title", "fontSize", &format!("{}px", 30 + n), n * 100);
        session.poll(n * 100 + 50);
    }
    assert!(session.take_outbox().is_empty());
    assert_eq!(session.active_page().element_styles["title"].style["fontSize"], "39px");

    session.poll(2399);
    assert!(session.take_outbox().is_empty());
    session.poll(2400);
    match session.take_outbox().as_slice() {
        [HostMessage::ApplyStyles { updates }] => {
            assert_eq!(updates.len(), 1);
            assert_eq!(updates[0].value, "39px");
        }
        other => panic!("expected one style pass, got {:?}", other),
    }
    assert_eq!(session.revision(), 1, "style overrides must not rebuild the surface");
}

#[test]
fn keyed_font_size_goes_through_the_style_batch() {
    let mut session = editing(Vec::new());
    session.handle_surface_message(
        SurfaceMessage::ElementSelected {
            target: title(),
            style: StyleSnapshot {
                font_size: Some("36px".into()),
                ..StyleSnapshot::default()
            },
        },
        0,
    );
    for (n, size) in ["40px", "44px", "48px"].into_iter().enumerate() {
        assert!(session.edit_field(StyleField::FontSize, size, n as u64 * 100));
    }
    assert_eq!(session.active_page().element_styles["title"].style["fontSize"], "48px");
    assert!(session.take_outbox().is_empty());

    session.poll(1700);
    assert_eq!(
        session.take_outbox(),
        vec![HostMessage::ApplyStyles {
            updates: vec![lectern_editor::StyleUpdate {
                element_key: "title".into(),
                property: "fontSize".into(),
                value: "48px".into(),
            }]
        }]
    );
    assert!(!session.save(1800));
    assert_eq!(session.model().source(), DEFAULT_TEMPLATE);
    assert_eq!(session.revision(), 1);
}

#[test]
fn delete_removes_one_element() {
    let mut session = editing(Vec::new());
    let before = session.model().element_count();
    session.handle_surface_message(
        SurfaceMessage::ElementSelected {
            target: ElementTarget::Key("body".into()),
            style: StyleSnapshot::default(),
        },
        0,
    );
    assert!(session.execute(Command::Delete, 10));

    assert_eq!(session.model().element_count(), before - 1);
    assert!(!session.model().source().contains("data-shape-key=\"body\""));
    assert!(!session.model().source().contains("{/* Body */}"));
    assert!(session.model().source().contains("data-shape-key=\"title\""));
    assert_eq!(
        session.take_outbox(),
        vec![HostMessage::RemoveElement {
            target: ElementTarget::Key("body".into())
        }]
    );
}

#[test]
fn unsaved_edits_are_dropped_on_page_switch() {
    let mut session = editing(vec![Page::new(1, "Plain", PLAIN, "{}"), Page::from_template(2, "Second")]);
    session.handle_raw_message(json!({ "type": "element-moved", "elementId": 0, "left": 40, "top": 20 }), 0);
    let saved = session.model().source().to_string();

    session.handle_surface_message(
        SurfaceMessage::ElementSelected {
            target: ElementTarget::Index(0),
            style: StyleSnapshot::default(),
        },
        10,
    );
    session.edit_field(StyleField::Color, "purple", 20);
    assert_eq!(session.state(), EditorState::Editing);

    assert!(session.switch_page(1, 30));
    assert!(session.selection().is_none());
    assert!(session.switch_page(0, 40));
    assert!(session.selection().is_none());
    assert_eq!(session.model().source(), saved);
    assert!(!session.history().can_undo());
}

#[test]
fn unknown_targets_are_ignored() {
    let mut session = editing(Vec::new());
    session.handle_raw_message(json!({ "type": "element-selected", "elementId": 42 }), 0);
    session.handle_raw_message(json!({ "type": "element-selected", "shapeKey": "nope" }), 0);
    session.handle_raw_message(json!({ "type": "element-moved", "shapeKey": "nope", "left": 1, "top": 1 }), 0);
    session.handle_raw_message(json!({ "type": "mystery" }), 0);
    assert!(session.selection().is_none());
    assert_eq!(session.model().source(), DEFAULT_TEMPLATE);
    assert_eq!(session.revision(), 1);
}

#[test]
fn mode_handshake_gives_up_quietly() {
    let mut session = EditorSession::new(EditorConfig::default(), Vec::new());
    session.set_edit_mode(true, 0);
    for now in (100..=1000).step_by(100) {
        session.poll(now);
    }
    let sent = session
        .take_outbox()
        .into_iter()
        .filter(|m| *m == HostMessage::SetMode { edit_mode: true })
        .count();
    assert_eq!(sent, 5);
    assert_eq!(session.handshake().state(), HandshakeState::Assumed);
    assert!(session.notices().is_empty());
}

#[derive(Default)]
struct MemoryStore {
    components: RefCell<Vec<(String, String)>>,
    styles: RefCell<Vec<(String, ElementStyles)>>,
}

impl PersistenceService for MemoryStore {
    async fn load_conversion(&self, conversion_id: &str) -> Result<Conversion, ServiceError> {
        let mut page = Page::new(1, "Loaded", PLAIN, "{}");
        page.component_id = Some("component-7".into());
        page.slide_id = Some("slide-7".into());
        Ok(Conversion {
            id: conversion_id.to_string(),
            name: "Biology".into(),
            description: None,
            pages: vec![page],
        })
    }

    async fn update_component_code(&self, component_id: &str, source_text: &str, _: &str) -> Result<(), ServiceError> {
        self.components
            .borrow_mut()
            .push((component_id.to_string(), source_text.to_string()));
        Ok(())
    }

    async fn update_slide_styles(&self, slide_id: &str, styles: &ElementStyles) -> Result<(), ServiceError> {
        self.styles.borrow_mut().push((slide_id.to_string(), styles.clone()));
        Ok(())
    }

    async fn update_conversion_metadata(&self, _: &str, _: &str, _: Option<&str>) -> Result<(), ServiceError> {
        Err(ServiceError::Remote("read only".into()))
    }
}

#[test]
fn loads_edits_and_persists_a_conversion() {
    let store = MemoryStore::default();
    let conversion = block_on(store.load_conversion("conv-1")).unwrap();
    let mut session = EditorSession::from_conversion(EditorConfig::default(), conversion);
    session.set_edit_mode(true, 0);

    session.handle_raw_message(json!({ "type": "element-moved", "elementId": 0, "left": 50, "top": 20 }), 10);
    session.set_element_style("intro", "color", "red", 20);

    let result = block_on(persist_page(&store, session.active_page()));
    assert!(session.report(result, "Saved").is_some());

    let components = store.components.borrow();
    assert_eq!(components[0].0, "component-7");
    assert!(components[0].1.contains("left: '50px'"));
    assert_eq!(store.styles.borrow()[0].1["intro"].style["color"], "red");

    let failed = block_on(store.update_conversion_metadata("conv-1", "Biology", None));
    assert!(session.report(failed, "").is_none());
    let levels: Vec<NoticeLevel> = session.notices().iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![NoticeLevel::Success, NoticeLevel::Error]);
}

impl CodeModificationService for MemoryStore {
    async fn modify(&self, request: ModificationRequest) -> Result<Modification, ServiceError> {
        Ok(Modification {
            source_text: request.source_text.replace("Hi", "Hello there"),
            summary: format!("Applied: {}", request.instruction),
        })
    }
}

impl ImageAssetService for MemoryStore {
    async fn list_images(&self) -> Result<Vec<ImageAsset>, ServiceError> {
        Ok(vec![ImageAsset {
            name: "leaf.png".into(),
            url: "https://cdn.test/leaf.png".into(),
        }])
    }

    async fn upload_image(&self, name: &str, _: &[u8]) -> Result<String, ServiceError> {
        Ok(format!("https://cdn.test/uploads/{}", name))
    }
}

#[test]
fn rewrite_is_applied_and_persisted() {
    let store = MemoryStore::default();
    let conversion = block_on(store.load_conversion("conv-1")).unwrap();
    let mut session = EditorSession::from_conversion(EditorConfig::default(), conversion);

    let page = session.active_page().clone();
    let result = block_on(modify_and_persist(&store, &store, &page, "friendlier greeting", None));
    assert!(session.modification_finished(result, 100));

    assert!(session.model().source().contains("Hello there"));
    assert!(!session.has_unsaved_changes());
    assert_eq!(store.components.borrow()[0].1, session.model().source());
    assert_eq!(
        session.notices().last().map(|n| n.message.as_str()),
        Some("Applied: friendlier greeting")
    );
}

#[test]
fn uploaded_image_becomes_the_element_source() {
    let store = MemoryStore::default();
    let page = Page::new(1, "Figure", "const Figure = () => <img src=\"old.png\" />;\n", "{}");
    let mut session = editing(vec![page]);
    session.handle_raw_message(json!({ "type": "element-selected", "elementId": 0 }), 0);

    let listed = block_on(store.list_images()).unwrap();
    assert_eq!(listed[0].name, "leaf.png");
    let url = block_on(store.upload_image("cell.png", b"png")).unwrap();
    assert!(session.edit_field(StyleField::ImageSrc, url, 10));
    assert!(session.save(20));

    assert_eq!(
        session.model().source(),
        "const Figure = () => <img src=\"https://cdn.test/uploads/cell.png\" />;\n"
    );
    assert!(session.has_unsaved_changes());
}
