/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

use dioxus::prelude::*;
use lectern_core::{ElementTarget, Page, StyleField};
use serde::Deserialize;
use tracing::warn;

use crate::config::EditorConfig;
use crate::services::{
    modify_and_persist, persist_page, Conversion, EditorBackend, ImageAsset, ImageAssetService, PersistenceService,
};
use crate::session::{EditorSession, NoticeLevel};
use crate::shortcuts::{command_for, Command};

const MAIN_CSS: Asset = asset!("/assets/editor.css");

/// Forwards surface messages and clock ticks to the host and relays host
/// messages into the surface frame.
const BRIDGE_JS: &str = r#"
const surfaceWindow = () => {
  const frame = document.getElementById('lectern-surface');
  return frame ? frame.contentWindow : null;
};
window.addEventListener('message', (event) => {
  if (event.source && event.source === surfaceWindow()) {
    dioxus.send({ kind: 'surface', now: performance.now(), message: event.data });
  }
});
setInterval(() => dioxus.send({ kind: 'tick', now: performance.now() }), 50);
while (true) {
  const message = await dioxus.recv();
  const target = surfaceWindow();
  if (target) {
    target.postMessage(message, '*');
  }
}
"#;

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum BridgeEvent {
    Surface { now: f64, message: serde_json::Value },
    Tick { now: f64 },
}

fn notice_class(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "toast info",
        NoticeLevel::Success => "toast success",
        NoticeLevel::Warning => "toast warning",
        NoticeLevel::Error => "toast error",
    }
}

/// Slide editor bound to `backend`. Opens `conversion` when given, otherwise
/// `pages`.
#[component]
pub fn SlideEditor<B: EditorBackend + Clone + PartialEq + 'static>(
    backend: B,
    #[props(default)] pages: Vec<Page>,
    conversion: Option<Conversion>,
    #[props(default)] config: EditorConfig,
) -> Element {
    let mut session = use_signal(move || match conversion {
        Some(conversion) => EditorSession::from_conversion(config, conversion),
        None => EditorSession::new(config, pages),
    });
    let backend = use_signal(move || backend);
    let mut images = use_signal(Vec::<ImageAsset>::new);
    let mut instruction = use_signal(String::new);
    let mut rewriting = use_signal(|| false);
    let bridge = use_hook(|| document::eval(BRIDGE_JS));

    use_future(move || async move {
        let mut bridge = bridge;
        loop {
            let event = match bridge.recv::<BridgeEvent>().await {
                Ok(event) => event,
                Err(e) => {
                    warn!("Surface bridge closed: {:?}", e);
                    break;
                }
            };
            let outgoing = {
                let mut s = session.write();
                match event {
                    BridgeEvent::Tick { now } => s.poll(now as u64),
                    BridgeEvent::Surface { now, message } => s.handle_raw_message(message, now as u64),
                }
                s.take_outbox()
            };
            for message in outgoing {
                if let Err(e) = bridge.send(message) {
                    warn!("Could not post to surface: {:?}", e);
                }
            }
        }
    });

    let mut run = move |command: Command| {
        let outgoing = {
            let mut s = session.write();
            let now = s.now();
            s.execute(command, now);
            if command == Command::Save { s.page_to_persist() } else { None }
        };
        if let Some(page) = outgoing {
            let backend = (*backend.peek()).clone();
            spawn(async move {
                let result = persist_page(&backend, &page).await;
                session.write().persist_finished(&page, result);
            });
        }
    };

    let rewrite = move |_: MouseEvent| {
        let text = instruction.peek().trim().to_string();
        if text.is_empty() || *rewriting.peek() {
            return;
        }
        let page = session.peek().active_page().clone();
        let backend = (*backend.peek()).clone();
        rewriting.set(true);
        spawn(async move {
            let result = modify_and_persist(&backend, &backend, &page, &text, None).await;
            let mut s = session.write();
            let now = s.now();
            if s.modification_finished(result, now) {
                instruction.set(String::new());
            }
            rewriting.set(false);
        });
    };

    let load_images = move |_: MouseEvent| {
        let backend = (*backend.peek()).clone();
        spawn(async move {
            let result = backend.list_images().await;
            if let Some(list) = session.write().report(result, "") {
                images.set(list);
            }
        });
    };

    let s = session.read();
    let edit_mode = s.edit_mode();
    let active = s.active_index();
    let page_items: Vec<(usize, u32, String)> = s
        .pages()
        .iter()
        .enumerate()
        .map(|(idx, page)| (idx, page.id, page.name.clone()))
        .collect();
    let active_name = s.active_page().name.clone();
    let (html, sandbox) = s
        .document()
        .map(|d| (d.html.clone(), d.sandbox.clone()))
        .unwrap_or_default();
    let source = s.model().source().to_string();
    let selection = s.selection().map(|b| (b.target().clone(), b.snapshot().clone(), b.is_dirty()));
    let fields: Vec<(StyleField, String)> = selection
        .as_ref()
        .map(|(_, snapshot, _)| {
            StyleField::ALL
                .into_iter()
                .map(|field| (field, snapshot.get(field).unwrap_or_default().to_string()))
                .collect()
        })
        .unwrap_or_default();
    let style_key = selection.as_ref().and_then(|(target, _, _)| match target {
        ElementTarget::Key(key) => Some(key.clone()),
        ElementTarget::Index(_) => None,
    });
    let class_value = style_key
        .as_ref()
        .and_then(|key| s.active_page().element_styles.get(key))
        .and_then(|record| record.class_name.clone())
        .or_else(|| {
            let (target, _, _) = selection.as_ref()?;
            s.model().element_attribute(target, "className")
        })
        .unwrap_or_default();
    let selection_label = selection.as_ref().map(|(target, _, dirty)| {
        if *dirty {
            format!("{} (edited)", target)
        } else {
            target.to_string()
        }
    });
    let has_selection = selection.is_some();
    let pending = s.pending_styles();
    let unsaved = s.has_unsaved_changes();
    let deck = s.deck().map(|d| (d.name.clone(), d.description.clone().unwrap_or_default()));
    let can_undo = s.history().can_undo();
    let can_redo = s.history().can_redo();
    let notices: Vec<(u64, &'static str, String)> = s
        .notices()
        .iter()
        .map(|n| (n.id, notice_class(n.level), n.message.clone()))
        .collect();
    drop(s);

    rsx! {
        document::Stylesheet { href: MAIN_CSS }
        div {
            class: "editor-container",
            tabindex: "0",
            onkeydown: move |evt| {
                let modifiers = evt.modifiers();
                let command_key = modifiers.contains(Modifiers::CONTROL) || modifiers.contains(Modifiers::META);
                let has_selection = session.read().selection().is_some();
                if let Some(command) = command_for(
                    &evt.key().to_string(),
                    command_key,
                    modifiers.contains(Modifiers::SHIFT),
                    has_selection,
                ) {
                    evt.prevent_default();
                    evt.stop_propagation();
                    run(command);
                }
            },

            div {
                class: "left-panel",

                div {
                    class: "header-actions",
                    h2 { "Lectern" }
                    button {
                        class: if edit_mode { "primary-btn active" } else { "primary-btn" },
                        onclick: move |_| {
                            let mut s = session.write();
                            let now = s.now();
                            s.set_edit_mode(!edit_mode, now);
                        },
                        if edit_mode { "Editing" } else { "Edit" }
                    }
                }

                if let Some((deck_name, deck_description)) = deck {
                    div {
                        class: "control-group",
                        label { "Deck" }
                        input {
                            r#type: "text",
                            value: "{deck_name}",
                            onkeydown: move |evt| evt.stop_propagation(),
                            onchange: move |evt| {
                                let renamed = session.write().rename_deck(&evt.value(), Some(deck_description.as_str()));
                                if let Some(info) = renamed {
                                    let backend = (*backend.peek()).clone();
                                    spawn(async move {
                                        let result = backend
                                            .update_conversion_metadata(&info.id, &info.name, info.description.as_deref())
                                            .await;
                                        session.write().report(result, "Deck renamed");
                                    });
                                }
                            }
                        }
                    }
                }

                div {
                    class: "control-group",
                    label { "Page name" }
                    input {
                        r#type: "text",
                        value: "{active_name}",
                        onkeydown: move |evt| evt.stop_propagation(),
                        onchange: move |evt| {
                            session.write().rename_page(active, &evt.value());
                        }
                    }
                }

                div {
                    class: "layers-list",
                    for (idx, id, name) in page_items {
                        div {
                            key: "{id}",
                            class: if idx == active { "layer-item selected" } else { "layer-item" },
                            onclick: move |_| {
                                let mut s = session.write();
                                let now = s.now();
                                s.switch_page(idx, now);
                            },
                            div { class: "layer-info", strong { "{name}" } }
                            button {
                                class: "icon-btn",
                                title: "Remove page",
                                onclick: move |evt| {
                                    evt.stop_propagation();
                                    let mut s = session.write();
                                    let now = s.now();
                                    s.remove_page(idx, now);
                                },
                                "×"
                            }
                        }
                    }
                }
                button {
                    class: "action-btn",
                    onclick: move |_| {
                        let mut s = session.write();
                        let now = s.now();
                        let name = format!("Page {}", s.pages().len() + 1);
                        s.add_page(name, now);
                    },
                    "Add page"
                }

                div {
                    class: "layer-actions",
                    button { class: "action-btn", disabled: !can_undo, onclick: move |_| run(Command::Undo), "Undo" }
                    button { class: "action-btn", disabled: !can_redo, onclick: move |_| run(Command::Redo), "Redo" }
                    button {
                        class: if unsaved { "action-btn unsaved" } else { "action-btn" },
                        disabled: !has_selection && !unsaved,
                        onclick: move |_| run(Command::Save),
                        "Save"
                    }
                    button { class: "action-btn danger", disabled: !has_selection, onclick: move |_| run(Command::Delete), "Delete" }
                }

                div {
                    class: "inspector-panel",
                    h3 { "Properties" }
                    if let Some(label) = selection_label {
                        div { class: "selection-label", "{label}" }
                        for (field, value) in fields {
                            div {
                                key: "{field.label()}",
                                class: "control-group",
                                label { "{field.label()}" }
                                input {
                                    r#type: "text",
                                    value: "{value}",
                                    onkeydown: move |evt| evt.stop_propagation(),
                                    oninput: move |evt| {
                                        let mut s = session.write();
                                        let now = s.now();
                                        s.edit_field(field, evt.value(), now);
                                    }
                                }
                            }
                        }
                        if let Some(key) = style_key {
                            div {
                                class: "control-group",
                                label { "Classes" }
                                input {
                                    r#type: "text",
                                    value: "{class_value}",
                                    onkeydown: move |evt| evt.stop_propagation(),
                                    oninput: move |evt| {
                                        let mut s = session.write();
                                        let now = s.now();
                                        s.set_element_style(&key, "className", &evt.value(), now);
                                    }
                                }
                            }
                        }
                    } else {
                        div { class: "empty-state", "Select an element to edit its properties" }
                    }
                }

                div {
                    class: "inspector-panel",
                    h3 { "Images" }
                    button { class: "action-btn", onclick: load_images, "Load images" }
                    div {
                        class: "image-grid",
                        for image in images() {
                            button {
                                key: "{image.url}",
                                class: "image-choice",
                                title: "{image.name}",
                                disabled: !has_selection,
                                onclick: {
                                    let url = image.url.clone();
                                    move |_| {
                                        let mut s = session.write();
                                        let now = s.now();
                                        s.edit_field(StyleField::ImageSrc, url.clone(), now);
                                    }
                                },
                                img { src: "{image.url}", alt: "{image.name}" }
                            }
                        }
                    }
                }

                div {
                    class: "inspector-panel",
                    h3 { "Rewrite" }
                    textarea {
                        value: "{instruction}",
                        placeholder: "Describe the change",
                        onkeydown: move |evt| evt.stop_propagation(),
                        oninput: move |evt| instruction.set(evt.value()),
                    }
                    button {
                        class: "primary-btn",
                        disabled: rewriting(),
                        onclick: rewrite,
                        if rewriting() { "Rewriting..." } else { "Rewrite page" }
                    }
                }
            }

            div {
                class: "right-panel",
                div {
                    class: "header-actions",
                    h2 { if edit_mode { "Preview (click to select, drag to move)" } else { "Preview" } }
                    if pending > 0 {
                        span { class: "pending", "{pending} style updates pending" }
                    }
                }
                iframe {
                    id: "lectern-surface",
                    class: "surface-frame",
                    "sandbox": "{sandbox}",
                    "srcdoc": "{html}",
                }
                div {
                    class: "json-output",
                    pre { "{source}" }
                }
            }

            div {
                class: "toasts",
                for (id, class, message) in notices {
                    div {
                        key: "{id}",
                        class: "{class}",
                        onclick: move |_| session.write().dismiss_notice(id),
                        "{message}"
                    }
                }
            }
        }
    }
}
